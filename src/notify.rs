use std::fmt;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::page::{Page, Selector};
use crate::templates::{Slot, TemplateName, Templates};

pub const DEFAULT_FLASH_TTL_SECS: u64 = 30;
pub const DEFAULT_FLASH_FADE_MS: u64 = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStyle {
    Success,
    Warning,
    Danger,
}

impl AlertStyle {
    pub fn css_class(self) -> &'static str {
        match self {
            AlertStyle::Success => "alert-success",
            AlertStyle::Warning => "alert-warning",
            AlertStyle::Danger => "alert-danger",
        }
    }
}

impl fmt::Display for AlertStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_class().trim_start_matches("alert-"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashPhase {
    Visible,
    Fading,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlashMessage {
    pub id: u64,
    pub kind: String,
    pub message: String,
    pub style: AlertStyle,
    pub html: String,
    pub phase: FlashPhase,
    #[serde(skip)]
    pub shown_at: DateTime<Utc>,
}

impl FlashMessage {
    pub fn text(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }
}

/// The flash container. Messages stack in arrival order and each one
/// expires on its own clock: visible for `ttl`, fading for `fade`, gone.
#[derive(Clone, Debug, Serialize)]
pub struct FlashBoard {
    #[serde(skip)]
    ttl: TimeDelta,
    /// `ttl + fade`, checked at construction.
    #[serde(skip)]
    lifetime: TimeDelta,
    #[serde(skip)]
    next_id: u64,
    messages: Vec<FlashMessage>,
}

impl Default for FlashBoard {
    fn default() -> Self {
        let ttl = TimeDelta::seconds(DEFAULT_FLASH_TTL_SECS as i64);
        let fade = TimeDelta::milliseconds(DEFAULT_FLASH_FADE_MS as i64);
        Self {
            ttl,
            lifetime: ttl + fade,
            next_id: 0,
            messages: Vec::new(),
        }
    }
}

impl FlashBoard {
    pub fn new(ttl_secs: u64, fade_ms: u64) -> Result<Self> {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(TimeDelta::try_seconds)
            .ok_or(Error::InvalidFlashTtl(ttl_secs))?;
        let lifetime = i64::try_from(fade_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|fade| ttl.checked_add(&fade))
            .ok_or(Error::InvalidFlashFade(fade_ms))?;
        Ok(Self {
            ttl,
            lifetime,
            next_id: 0,
            messages: Vec::new(),
        })
    }

    pub fn show(
        &mut self,
        templates: &Templates,
        kind: &str,
        message: &str,
        style: AlertStyle,
        now: DateTime<Utc>,
    ) -> u64 {
        let html = templates.get(TemplateName::FlashMessage).fill(&[
            ("alert_type", Slot::Text(kind)),
            ("message", Slot::Text(message)),
        ]);
        let id = self.next_id;
        self.next_id += 1;
        debug!(id, kind, style = %style, "flash shown");
        self.messages.push(FlashMessage {
            id,
            kind: kind.to_string(),
            message: message.to_string(),
            style,
            html: add_class(&html, style.css_class()),
            phase: FlashPhase::Visible,
            shown_at: now,
        });
        id
    }

    /// Advances every message to its phase at `now`; returns how many were
    /// removed.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.messages.len();
        let (ttl, lifetime) = (self.ttl, self.lifetime);
        self.messages.retain(|message| now - message.shown_at < lifetime);
        for message in &mut self.messages {
            if now - message.shown_at >= ttl {
                message.phase = FlashPhase::Fading;
            }
        }
        before - self.messages.len()
    }

    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&FlashMessage> {
        self.messages.last()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// Appends to the first `class` attribute, or adds one to the first tag.
fn add_class(html: &str, class: &str) -> String {
    if let Some(start) = html.find("class=\"") {
        let value_start = start + "class=\"".len();
        if let Some(len) = html[value_start..].find('"') {
            let end = value_start + len;
            let sep = if len == 0 { "" } else { " " };
            return format!("{}{}{}{}", &html[..end], sep, class, &html[end..]);
        }
    }
    match html.find('>') {
        Some(end) => format!("{} class=\"{}\"{}", &html[..end], class, &html[end..]),
        None => html.to_string(),
    }
}

pub fn toggle_loading_spinner(page: &mut Page, control: Selector, show: bool) {
    let state = page.control_mut(control);
    state.spinner_visible = show;
    if show {
        state.shown += 1;
    } else {
        state.hidden += 1;
    }
}

/// Shows the spinner of `control` for as long as the guard lives. The page
/// stays reachable through the guard, and dropping it hides the spinner on
/// every exit path.
pub struct SpinnerGuard<'a> {
    page: &'a mut Page,
    control: Selector,
}

impl<'a> SpinnerGuard<'a> {
    pub fn show(page: &'a mut Page, control: Selector) -> Self {
        toggle_loading_spinner(page, control, true);
        Self { page, control }
    }
}

impl Deref for SpinnerGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        &*self.page
    }
}

impl DerefMut for SpinnerGuard<'_> {
    fn deref_mut(&mut self) -> &mut Page {
        &mut *self.page
    }
}

impl Drop for SpinnerGuard<'_> {
    fn drop(&mut self) {
        toggle_loading_spinner(self.page, self.control, false);
    }
}

/// Each section is visible iff its table has at least one row.
pub fn update_section_visibility(page: &mut Page) {
    let Page {
        tables, sections, ..
    } = page;
    for section in sections.values_mut() {
        section.visible = tables
            .get(section.table)
            .map(|table| !table.is_empty())
            .unwrap_or(false);
    }
}
