use std::fmt;

use serde::Serialize;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionState {
    Idle,
    Pending,
    Rendering,
    Failed,
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionState::Idle => "idle",
            ActionState::Pending => "pending",
            ActionState::Rendering => "rendering",
            ActionState::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub action: &'static str,
    pub from: ActionState,
    pub to: ActionState,
}

/// Current state of a controller's actions plus every transition taken.
#[derive(Clone, Debug, Serialize)]
pub struct ActionTracker {
    current: ActionState,
    history: Vec<Transition>,
}

impl Default for ActionTracker {
    fn default() -> Self {
        Self {
            current: ActionState::Idle,
            history: Vec::new(),
        }
    }
}

impl ActionTracker {
    pub fn current(&self) -> ActionState {
        self.current
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn enter(&mut self, action: &'static str, to: ActionState) {
        let from = self.current;
        debug!(action, %from, %to, "action state");
        self.history.push(Transition { action, from, to });
        self.current = to;
    }

    /// The states visited, in order, starting from the initial idle state.
    pub fn path(&self) -> Vec<ActionState> {
        std::iter::once(ActionState::Idle)
            .chain(self.history.iter().map(|transition| transition.to))
            .collect()
    }
}

/// How a triggered action ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Rendered,
    Warned { message: String },
    Failed { kind: String, message: String },
    AwaitingConfirmation { modal: &'static str },
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Rendered => f.write_str("done"),
            Outcome::Warned { message } => write!(f, "Warning!: {}", message),
            Outcome::Failed { kind, message } => write!(f, "{}: {}", kind, message),
            Outcome::AwaitingConfirmation { modal } => {
                write!(f, "confirmation required ({})", modal)
            }
        }
    }
}
