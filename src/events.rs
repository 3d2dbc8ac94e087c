use std::collections::BTreeMap;

use crate::controller::ActionKind;
use crate::error::{Error, Result};
use crate::page::Selector;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Binding {
    pub controller: usize,
    pub action: ActionKind,
}

/// Explicit control → handler routing. A control binds at most once.
#[derive(Clone, Debug, Default)]
pub struct EventRouter {
    bindings: BTreeMap<Selector, Binding>,
}

impl EventRouter {
    pub fn bind(&mut self, control: Selector, binding: Binding) -> Result<()> {
        if self.bindings.contains_key(control) {
            return Err(Error::AlreadyBound(control.to_string()));
        }
        self.bindings.insert(control, binding);
        Ok(())
    }

    pub fn resolve(&self, control: &str) -> Result<Binding> {
        self.bindings
            .get(control)
            .copied()
            .ok_or_else(|| Error::UnboundControl(control.to_string()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
