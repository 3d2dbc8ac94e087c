use std::fmt::Write;

use serde::Serialize;

use crate::app::controller_specs;
use crate::config::OutputFormat;
use crate::page::Page;
use crate::state::Outcome;
use crate::templates::TemplateName;

/// What gets printed after a command: the page and, if a control was
/// pressed, how that ended.
#[derive(Serialize)]
pub struct Report<'a> {
    pub outcome: Option<&'a Outcome>,
    pub page: &'a Page,
}

pub trait Formatter {
    fn write(&self, report: &Report<'_>) -> String;
}

pub struct HumanFormatter;
pub struct JsonFormatter;
pub struct HtmlFormatter;

pub fn formatter_for(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Human => Box::new(HumanFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Html => Box::new(HtmlFormatter),
    }
}

impl Formatter for HumanFormatter {
    fn write(&self, report: &Report<'_>) -> String {
        let mut output = String::new();
        let page = report.page;

        if let Some(outcome) = report.outcome {
            let _ = writeln!(output, "Outcome: {}", outcome);
        }
        for message in page.flash.messages() {
            let _ = writeln!(output, "Flash [{}] {}", message.style, message.text());
        }
        for (selector, table) in &page.tables {
            if table.is_empty() {
                continue;
            }
            let _ = writeln!(output, "Table {} ({} rows):", selector, table.len());
            let labels = table
                .visible_columns()
                .map(|column| column.label)
                .collect::<Vec<_>>();
            let _ = writeln!(output, "  {}", labels.join(" | "));
            for row in &table.rows {
                let cells = row
                    .cells
                    .iter()
                    .map(|cell| cell.text.as_str())
                    .collect::<Vec<_>>();
                let _ = writeln!(output, "  {}", cells.join(" | "));
            }
        }
        for (slot, text) in &page.texts {
            let _ = writeln!(output, "{}: {}", slot, text);
        }
        for (selector, src) in &page.images {
            if src.contains('?') {
                let _ = writeln!(output, "Plot {} -> {}", selector, src);
            }
        }
        for download in &page.downloads {
            let _ = writeln!(
                output,
                "Saved {} -> {}",
                download.url,
                download.path.display()
            );
        }
        output
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, report: &Report<'_>) -> String {
        match serde_json::to_string_pretty(report) {
            Ok(json) => format!("{}\n", json),
            Err(err) => format!("{{\"error\": \"{}\"}}\n", err),
        }
    }
}

impl Formatter for HtmlFormatter {
    fn write(&self, report: &Report<'_>) -> String {
        let mut output = String::new();
        let page = report.page;
        for message in page.flash.messages() {
            let _ = writeln!(output, "{}", message.html);
        }
        for (selector, table) in &page.tables {
            if table.is_empty() {
                continue;
            }
            let _ = writeln!(output, "<!-- {} -->", selector);
            for row in &table.rows {
                let _ = writeln!(output, "{}", row.html);
            }
        }
        output
    }
}

pub fn endpoints() -> String {
    let mut output = String::new();
    for spec in controller_specs() {
        let _ = writeln!(output, "{}:", spec.name);
        for (method, endpoint) in spec.endpoints() {
            let _ = writeln!(output, "  {} {}", method, endpoint);
        }
    }
    output
}

pub fn templates() -> String {
    TemplateName::ALL
        .iter()
        .map(|name| format!("{}\n", name.path()))
        .collect()
}
