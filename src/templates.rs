//! Named HTML fragment templates, fetched once at startup.
//!
//! A `Templates` value is complete by construction (every `TemplateName` is
//! present and validated) and never changes afterwards; it is shared as
//! `Arc<Templates>` by everything that renders.

use std::fmt;

use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;

use crate::dispatch::{Dispatcher, RequestOptions};
use crate::error::{Error, Result};

pub const TEMPLATE_ROOT: &str = "/static/templates";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TemplateName {
    CustomerRow,
    EventRow,
    ServiceItem,
    ArrivalRow,
    ServerRow,
    ServersRow,
    FlashMessage,
}

impl TemplateName {
    pub const ALL: [TemplateName; 7] = [
        TemplateName::CustomerRow,
        TemplateName::EventRow,
        TemplateName::ServiceItem,
        TemplateName::ArrivalRow,
        TemplateName::ServerRow,
        TemplateName::ServersRow,
        TemplateName::FlashMessage,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            TemplateName::CustomerRow => "customerRowTemplate.html",
            TemplateName::EventRow => "eventRowTemplate.html",
            TemplateName::ServiceItem => "serviceItemTemplate.html",
            TemplateName::ArrivalRow => "arrivalRowTemplate.html",
            TemplateName::ServerRow => "serverRowTemplate.html",
            TemplateName::ServersRow => "serversRowTemplate.html",
            TemplateName::FlashMessage => "flash-messages.html",
        }
    }

    pub fn path(self) -> String {
        format!("{}/{}", TEMPLATE_ROOT, self.file_name())
    }

    fn index(self) -> usize {
        self as usize
    }

    fn required_placeholders(self) -> &'static [&'static str] {
        match self {
            TemplateName::FlashMessage => &["alert_type", "message"],
            TemplateName::ServiceItem => &["code", "title", "duration"],
            _ => &["cells"],
        }
    }

    pub(crate) fn builtin_source(self) -> &'static str {
        match self {
            TemplateName::CustomerRow => include_str!("../templates/customerRowTemplate.html"),
            TemplateName::EventRow => include_str!("../templates/eventRowTemplate.html"),
            TemplateName::ServiceItem => include_str!("../templates/serviceItemTemplate.html"),
            TemplateName::ArrivalRow => include_str!("../templates/arrivalRowTemplate.html"),
            TemplateName::ServerRow => include_str!("../templates/serverRowTemplate.html"),
            TemplateName::ServersRow => include_str!("../templates/serversRowTemplate.html"),
            TemplateName::FlashMessage => include_str!("../templates/flash-messages.html"),
        }
    }
}

impl fmt::Display for TemplateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name().trim_end_matches(".html"))
    }
}

/// A value substituted into a placeholder.
#[derive(Clone, Copy, Debug)]
pub enum Slot<'a> {
    /// Plain text, HTML-escaped on insertion.
    Text(&'a str),
    /// Already-built markup, inserted verbatim.
    Markup(&'a str),
}

#[derive(Clone, Debug)]
pub struct Template {
    name: TemplateName,
    source: String,
}

impl Template {
    pub fn parse(name: TemplateName, source: &str) -> Result<Self> {
        let template = Self {
            name,
            source: source.trim().to_string(),
        };
        let found = template.placeholders();
        for required in name.required_placeholders() {
            if !found.contains(required) {
                return Err(Error::TemplateMissingPlaceholder {
                    name: name.to_string(),
                    placeholder: required.to_string(),
                });
            }
        }
        Ok(template)
    }

    pub fn name(&self) -> TemplateName {
        self.name
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholders(&self) -> Vec<&str> {
        tokens(&self.source).map(|(_, key)| key).collect()
    }

    /// Substitutes every `{{ key }}` occurrence; unknown keys are left as-is.
    pub fn fill(&self, values: &[(&str, Slot<'_>)]) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for (range, key) in tokens(&self.source) {
            out.push_str(&self.source[cursor..range.start]);
            match values.iter().find(|(name, _)| *name == key) {
                Some((_, Slot::Text(text))) => {
                    out.push_str(&html_escape::encode_text(text));
                }
                Some((_, Slot::Markup(markup))) => out.push_str(markup),
                None => out.push_str(&self.source[range.clone()]),
            }
            cursor = range.end;
        }
        out.push_str(&self.source[cursor..]);
        out
    }
}

fn tokens(source: &str) -> impl Iterator<Item = (std::ops::Range<usize>, &str)> {
    let mut offset = 0;
    std::iter::from_fn(move || {
        let start = offset + source[offset..].find("{{")?;
        let close = start + 2 + source[start + 2..].find("}}")?;
        let end = close + 2;
        offset = end;
        Some((start..end, source[start + 2..close].trim()))
    })
}

/// The template cache. Immutable once built.
#[derive(Clone, Debug)]
pub struct Templates {
    entries: Vec<Template>,
}

impl Templates {
    /// Copies compiled into the binary, for running without the server's
    /// static assets.
    pub fn builtin() -> Result<Self> {
        let entries = TemplateName::ALL
            .iter()
            .map(|name| Template::parse(*name, name.builtin_source()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Fetches every template concurrently; resolves only when all are in.
    pub async fn load(dispatcher: &Dispatcher) -> Result<Self> {
        let fetches = TemplateName::ALL
            .iter()
            .map(|name| fetch_template(dispatcher, *name));
        let entries = try_join_all(fetches).await?;
        info!(count = entries.len(), "templates loaded");
        Ok(Self { entries })
    }

    pub fn get(&self, name: TemplateName) -> &Template {
        &self.entries[name.index()]
    }
}

async fn fetch_template(dispatcher: &Dispatcher, name: TemplateName) -> Result<Template> {
    let load_error = |detail: String| Error::TemplateLoad {
        name: name.to_string(),
        detail,
    };
    let reply = dispatcher
        .send(&RequestOptions::get(&name.path()))
        .await
        .map_err(|err| load_error(err.to_string()))?;
    let source = String::from_utf8(reply.body).map_err(|err| load_error(err.to_string()))?;
    Template::parse(name, &source)
}
