//! Typed row rendering.
//!
//! A record type states which template draws it and the ordered cells it
//! contributes; `render_row` produces the row (cells plus filled markup) and
//! tables only ever append rows or get cleared wholesale.

use serde::Serialize;

use crate::models::{
    cell_text, ArrivalDistributionRow, Scalar, ServerAssignmentEvent, ServerDistributionRow,
    ServiceDefinition, SimulationEvent,
};
use crate::templates::{Slot, TemplateName, Templates};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Cell {
    pub column: &'static str,
    pub text: String,
}

impl Cell {
    fn of(column: &'static str, value: &Option<Scalar>) -> Self {
        Self {
            column,
            text: cell_text(value),
        }
    }
}

/// Batch-level facts that change the cell layout of individual rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowContext {
    pub arrival_probability: bool,
    pub completion_probability: bool,
}

impl RowContext {
    pub fn for_events(events: &[SimulationEvent]) -> Self {
        Self {
            arrival_probability: events.iter().any(|e| e.arrival_probability.is_some()),
            completion_probability: events.iter().any(|e| e.completion_probability.is_some()),
        }
    }
}

pub trait RenderRow {
    const TEMPLATE: TemplateName;

    fn cells(&self, ctx: &RowContext) -> Vec<Cell>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Row {
    pub cells: Vec<Cell>,
    pub html: String,
}

impl Row {
    pub fn text(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|cell| cell.column == column)
            .map(|cell| cell.text.as_str())
    }
}

pub fn render_row<R: RenderRow>(templates: &Templates, record: &R, ctx: &RowContext) -> Row {
    let cells = record.cells(ctx);
    let markup = cells
        .iter()
        .map(|cell| {
            format!(
                "<td data-column=\"{}\">{}</td>",
                cell.column,
                html_escape::encode_text(&cell.text)
            )
        })
        .collect::<String>();

    let mut slots = vec![("cells", Slot::Markup(&markup))];
    slots.extend(cells.iter().map(|cell| (cell.column, Slot::Text(&cell.text))));
    let html = templates.get(R::TEMPLATE).fill(&slots);

    Row { cells, html }
}

#[derive(Clone, Copy, Debug)]
pub struct ColumnSpec {
    pub key: &'static str,
    pub label: &'static str,
    /// Optional columns start hidden and are shown per batch.
    pub optional: bool,
}

impl ColumnSpec {
    pub const fn required(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            optional: false,
        }
    }

    pub const fn optional(key: &'static str, label: &'static str) -> Self {
        Self {
            key,
            label,
            optional: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub hidden: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: &[ColumnSpec]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|spec| Column {
                    key: spec.key,
                    label: spec.label,
                    hidden: spec.optional,
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn append(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn set_column_hidden(&mut self, key: &str, hidden: bool) {
        if let Some(column) = self.columns.iter_mut().find(|column| column.key == key) {
            column.hidden = hidden;
        }
    }

    pub fn is_column_hidden(&self, key: &str) -> bool {
        self.columns
            .iter()
            .find(|column| column.key == key)
            .map(|column| column.hidden)
            .unwrap_or(true)
    }

    pub fn visible_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| !column.hidden)
    }
}

pub const ARRIVAL_PROBABILITY: &str = "arrival_probability";
pub const COMPLETION_PROBABILITY: &str = "completion_probability";

impl RenderRow for ServiceDefinition {
    const TEMPLATE: TemplateName = TemplateName::ServiceItem;

    fn cells(&self, _ctx: &RowContext) -> Vec<Cell> {
        vec![
            Cell::of("code", &self.code),
            Cell::of("title", &self.title),
            Cell::of("duration", &self.duration),
        ]
    }
}

impl RenderRow for ArrivalDistributionRow {
    const TEMPLATE: TemplateName = TemplateName::ArrivalRow;

    fn cells(&self, _ctx: &RowContext) -> Vec<Cell> {
        vec![
            Cell::of("time_between_arrival", &self.time_between_arrival),
            Cell::of("probability", &self.probability),
            Cell::of("cumulative_probability", &self.cumulative_probability),
            Cell::of("digit_from", &self.digit_from),
            Cell::of("digit_to", &self.digit_to),
        ]
    }
}

impl RenderRow for ServerDistributionRow {
    const TEMPLATE: TemplateName = TemplateName::ServerRow;

    fn cells(&self, _ctx: &RowContext) -> Vec<Cell> {
        vec![
            Cell::of("server_no", &self.server_no),
            Cell::of("probability", &self.probability),
            Cell::of("cumulative_probability", &self.cumulative_probability),
            Cell::of("digit_from", &self.digit_from),
            Cell::of("digit_to", &self.digit_to),
        ]
    }
}

impl RenderRow for ServerAssignmentEvent {
    const TEMPLATE: TemplateName = TemplateName::ServersRow;

    fn cells(&self, _ctx: &RowContext) -> Vec<Cell> {
        vec![
            Cell::of("customer_id", &self.customer_id),
            Cell::of("server", &self.server),
            Cell::of("clock_time", &self.clock_time),
            Cell::of("wait_time", &self.wait_time),
            Cell::of("service_start", &self.service_start()),
            Cell::of("service_duration", &self.service_duration),
            Cell::of("end_time", &self.end_time),
            Cell::of("time_in_system", &self.time_in_system()),
        ]
    }
}

/// The customer-table view of an arrival event.
pub struct CustomerRow<'a>(pub &'a SimulationEvent);

/// The event-table view of any simulation event.
pub struct EventRow<'a>(pub &'a SimulationEvent);

// A probability cell exists only if its column is shown for the batch and
// this event carries a value; otherwise the cell is dropped, not blanked.
fn probability_cells(event: &SimulationEvent, ctx: &RowContext, cells: &mut Vec<Cell>) {
    if ctx.arrival_probability && event.arrival_probability.is_some() {
        cells.push(Cell::of(ARRIVAL_PROBABILITY, &event.arrival_probability));
    }
    if ctx.completion_probability && event.completion_probability.is_some() {
        cells.push(Cell::of(COMPLETION_PROBABILITY, &event.completion_probability));
    }
}

impl RenderRow for CustomerRow<'_> {
    const TEMPLATE: TemplateName = TemplateName::CustomerRow;

    fn cells(&self, ctx: &RowContext) -> Vec<Cell> {
        let event = self.0;
        let mut cells = vec![
            Cell::of("customer_id", &event.customer_id),
            Cell::of("interval_time", &event.interval_time),
            Cell::of("clock_time", &event.clock_time),
            Cell::of("service_code", &event.service_code),
            Cell::of("service_title", &event.service_title),
            Cell::of("start_time", &event.start_time),
            Cell::of("service_duration", &event.service_duration),
            Cell::of("end_time", &event.end_time),
        ];
        probability_cells(event, ctx, &mut cells);
        cells
    }
}

impl RenderRow for EventRow<'_> {
    const TEMPLATE: TemplateName = TemplateName::EventRow;

    fn cells(&self, ctx: &RowContext) -> Vec<Cell> {
        let event = self.0;
        let mut cells = vec![
            Cell::of("clock_time", &event.clock_time),
            Cell::of("event_type", &event.event_type),
            Cell::of("customer_id", &event.customer_id),
            Cell::of("service_title", &event.service_title),
        ];
        probability_cells(event, ctx, &mut cells);
        cells
    }
}
