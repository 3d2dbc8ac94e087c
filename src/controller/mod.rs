//! One parameterized feature controller.
//!
//! A `ControllerSpec` table says which elements a feature owns, which
//! endpoint each action calls, what shape the reply has and where its rows
//! go. `single` and `parallel` hold the two tables the page uses.

pub mod parallel;
pub mod single;

pub use parallel::PARALLEL_SERVER;
pub use single::SINGLE_SERVER;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::dispatch::{Dispatcher, Method, Reply, RequestOptions};
use crate::error::{Error, Result};
use crate::events::{Binding, EventRouter};
use crate::models::{
    cell_text, reply_status, ArrivalDistributionRow, Metrics, ReplyStatus, ServerAssignmentEvent,
    ServerDistributionRow, ServiceAdded, ServiceDefinition, SimulationEvent,
};
use crate::notify::{update_section_visibility, AlertStyle, SpinnerGuard};
use crate::page::{Download, Page, Selector};
use crate::render::{
    render_row, CustomerRow, EventRow, RenderRow, RowContext, ARRIVAL_PROBABILITY,
    COMPLETION_PROBABILITY,
};
use crate::state::{ActionState, ActionTracker, Outcome};
use crate::templates::Templates;

pub const NO_DATA_MESSAGE: &str = "No data received from the server.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Upload,
    AddService,
    AddArrival,
    AddServer,
    Simulate,
    Download,
    RequestClear,
    ConfirmClear,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActionKind::Upload => "upload",
            ActionKind::AddService => "add-service",
            ActionKind::AddArrival => "add-arrival",
            ActionKind::AddServer => "add-server",
            ActionKind::Simulate => "simulate",
            ActionKind::Download => "download",
            ActionKind::RequestClear => "clear",
            ActionKind::ConfirmClear => "confirm-clear",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
pub struct TableSpec {
    pub selector: Selector,
    /// Container shown only while the table has rows.
    pub section: Option<Selector>,
    pub columns: &'static [crate::render::ColumnSpec],
}

#[derive(Debug)]
pub struct PlotSpec {
    pub image: Selector,
    pub endpoint: &'static str,
}

#[derive(Debug)]
pub enum BodySpec {
    None,
    /// Multipart upload of a page form.
    Form(Selector),
    /// JSON object with one boolean read from a checkbox.
    Flag {
        key: &'static str,
        checkbox: Selector,
    },
}

#[derive(Debug)]
pub struct RequestSpec {
    pub endpoint: &'static str,
    pub method: Method,
    pub body: BodySpec,
}

/// What the reply carries and which tables it fills.
#[derive(Debug)]
pub enum ReplyShape {
    /// `{data: [ServiceDefinition]}` replacing the list.
    Services { list: Selector },
    /// One `ServiceAdded` object appended to the list.
    ServiceAdded { list: Selector },
    /// `{arrivals, servers}`; clears `results` as well.
    Distributions {
        arrivals: Selector,
        servers: Selector,
        results: Selector,
    },
    ArrivalRows { table: Selector },
    ServerRows { table: Selector },
    CustomerEvents {
        customers: Selector,
        events: Selector,
    },
    /// `{events, metrics}` of the parallel model.
    ServerAssignments { table: Selector },
    Download { file_name: &'static str },
    Cleared,
    OpenModal,
}

impl ReplyShape {
    /// Tables emptied when the reply lacks its expected array.
    fn targets(&self) -> Vec<Selector> {
        match self {
            ReplyShape::Services { list } => vec![*list],
            ReplyShape::Distributions {
                arrivals,
                servers,
                results,
            } => vec![*arrivals, *servers, *results],
            ReplyShape::ArrivalRows { table }
            | ReplyShape::ServerRows { table }
            | ReplyShape::ServerAssignments { table } => vec![*table],
            ReplyShape::CustomerEvents { customers, events } => vec![*customers, *events],
            ReplyShape::ServiceAdded { .. }
            | ReplyShape::Download { .. }
            | ReplyShape::Cleared
            | ReplyShape::OpenModal => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct ActionSpec {
    pub kind: ActionKind,
    pub control: Selector,
    /// Names the action in failure flashes.
    pub label: &'static str,
    /// `None` for actions that only open the confirmation modal.
    pub request: Option<RequestSpec>,
    pub reply: ReplyShape,
    pub reset_form: Option<Selector>,
    pub success_flash: bool,
    pub refresh_plots: bool,
}

#[derive(Debug)]
pub struct ControllerSpec {
    pub name: &'static str,
    pub tables: &'static [TableSpec],
    pub plots: &'static [PlotSpec],
    pub forms: &'static [Selector],
    pub checkboxes: &'static [Selector],
    pub modal: Selector,
    pub actions: &'static [ActionSpec],
}

impl ControllerSpec {
    pub fn action(&self, kind: ActionKind) -> Option<&ActionSpec> {
        self.actions.iter().find(|action| action.kind == kind)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = (Method, &'static str)> + '_ {
        let actions = self
            .actions
            .iter()
            .filter_map(|action| action.request.as_ref())
            .map(|request| (request.method, request.endpoint));
        let plots = self.plots.iter().map(|plot| (Method::Get, plot.endpoint));
        actions.chain(plots)
    }
}

/// A reply decoded into the records it carries, before any page mutation.
enum Decoded {
    Services(Vec<ServiceDefinition>),
    ServiceAdded(ServiceDefinition),
    Distributions(Vec<ArrivalDistributionRow>, Vec<ServerDistributionRow>),
    ArrivalRows(Vec<ArrivalDistributionRow>),
    ServerRows(Vec<ServerDistributionRow>),
    Events(Vec<SimulationEvent>),
    Assignments(Vec<ServerAssignmentEvent>, Option<Metrics>),
    FileUrl(String),
    Saved(Download),
    Cleared,
    Missing,
}

struct Failure {
    kind: &'static str,
    message: String,
}

impl Failure {
    fn error(label: &str, detail: &dyn fmt::Display) -> Self {
        Self {
            kind: "Error!",
            message: format!("{}: {}", label, detail),
        }
    }

    fn rejected(label: &str, message: Option<String>, error: Option<String>) -> Self {
        match (message, error) {
            (Some(message), _) => Self {
                kind: "Error",
                message,
            },
            (None, Some(error)) => Self::error(label, &error),
            (None, None) => Self::error(label, &"request was not successful"),
        }
    }
}

fn array<T: DeserializeOwned>(
    body: &Value,
    key: &str,
    label: &str,
) -> std::result::Result<Option<Vec<T>>, Failure> {
    match body.get(key) {
        Some(items @ Value::Array(_)) => serde_json::from_value(items.clone())
            .map(Some)
            .map_err(|err| Failure::error(label, &format!("parsererror: {}", err))),
        _ => Ok(None),
    }
}

fn object<T: DeserializeOwned>(body: &Value, label: &str) -> std::result::Result<T, Failure> {
    serde_json::from_value(body.clone())
        .map_err(|err| Failure::error(label, &format!("parsererror: {}", err)))
}

fn decode(shape: &ReplyShape, label: &str, reply: &Reply) -> std::result::Result<Decoded, Failure> {
    if matches!(shape, ReplyShape::Cleared | ReplyShape::OpenModal) {
        return Ok(Decoded::Cleared);
    }

    let body = reply
        .json_value()
        .map_err(|err| Failure::error(label, &err))?;
    if let ReplyStatus::Failed { message, error } = reply_status(&body) {
        return Err(Failure::rejected(label, message, error));
    }

    let decoded = match shape {
        ReplyShape::Services { .. } => array(&body, "data", label)?.map(Decoded::Services),
        ReplyShape::ServiceAdded { .. } => {
            let added: ServiceAdded = object(&body, label)?;
            Some(Decoded::ServiceAdded(added.into()))
        }
        ReplyShape::Distributions { .. } => {
            match (array(&body, "arrivals", label)?, array(&body, "servers", label)?) {
                (Some(arrivals), Some(servers)) => Some(Decoded::Distributions(arrivals, servers)),
                _ => None,
            }
        }
        ReplyShape::ArrivalRows { .. } => array(&body, "events", label)?.map(Decoded::ArrivalRows),
        ReplyShape::ServerRows { .. } => array(&body, "events", label)?.map(Decoded::ServerRows),
        ReplyShape::CustomerEvents { .. } => array(&body, "events", label)?.map(Decoded::Events),
        ReplyShape::ServerAssignments { .. } => {
            let metrics = match body.get("metrics") {
                Some(metrics @ Value::Object(_)) => Some(object::<Metrics>(metrics, label)?),
                _ => None,
            };
            array(&body, "events", label)?.map(|events| Decoded::Assignments(events, metrics))
        }
        ReplyShape::Download { .. } => body
            .get("file_url")
            .and_then(Value::as_str)
            .map(|url| Decoded::FileUrl(url.to_string())),
        ReplyShape::Cleared | ReplyShape::OpenModal => Some(Decoded::Cleared),
    };
    Ok(decoded.unwrap_or(Decoded::Missing))
}

pub struct Controller {
    spec: &'static ControllerSpec,
    dispatcher: Dispatcher,
    templates: Arc<Templates>,
    download_dir: PathBuf,
    fetch_plots: bool,
    tracker: ActionTracker,
}

impl Controller {
    pub fn new(
        spec: &'static ControllerSpec,
        dispatcher: Dispatcher,
        templates: Arc<Templates>,
        download_dir: PathBuf,
        fetch_plots: bool,
    ) -> Self {
        Self {
            spec,
            dispatcher,
            templates,
            download_dir,
            fetch_plots,
            tracker: ActionTracker::default(),
        }
    }

    pub fn spec(&self) -> &'static ControllerSpec {
        self.spec
    }

    pub fn tracker(&self) -> &ActionTracker {
        &self.tracker
    }

    /// Mounts the elements this feature owns and binds one trigger per
    /// action control. A second call fails with `AlreadyBound`.
    pub fn init(&self, index: usize, page: &mut Page, router: &mut EventRouter) -> Result<()> {
        for table in self.spec.tables {
            page.mount_table(table.selector, table.columns);
            if let Some(section) = table.section {
                page.mount_section(section, table.selector);
            }
        }
        for plot in self.spec.plots {
            page.mount_image(plot.image, plot.endpoint);
        }
        for form in self.spec.forms {
            page.mount_form(form);
        }
        for checkbox in self.spec.checkboxes {
            page.mount_checkbox(checkbox);
        }
        page.mount_modal(self.spec.modal);

        for action in self.spec.actions {
            page.mount_control(action.control);
            router.bind(
                action.control,
                Binding {
                    controller: index,
                    action: action.kind,
                },
            )?;
        }
        update_section_visibility(page);
        info!(
            controller = self.spec.name,
            actions = self.spec.actions.len(),
            "controller initialized"
        );
        Ok(())
    }

    pub async fn handle(&mut self, kind: ActionKind, page: &mut Page) -> Result<Outcome> {
        let spec = self.spec;
        let action = spec
            .action(kind)
            .ok_or_else(|| Error::UnboundControl(format!("{}:{}", spec.name, kind)))?;

        let Some(request) = &action.request else {
            page.open_modal(spec.modal);
            return Ok(Outcome::AwaitingConfirmation { modal: spec.modal });
        };
        if action.kind == ActionKind::ConfirmClear && !page.is_modal_open(spec.modal) {
            return Err(Error::ConfirmationNotRequested);
        }
        let options = request_options(request, page)?;

        let mut page = SpinnerGuard::show(page, action.control);
        self.tracker.enter(action.label, ActionState::Pending);

        let decoded = match self.dispatcher.send(&options).await {
            Ok(reply) => decode(&action.reply, action.label, &reply),
            Err(err) => Err(Failure::error(action.label, &err)),
        };
        let decoded = match (decoded, &action.reply) {
            (Ok(Decoded::FileUrl(url)), ReplyShape::Download { file_name }) => {
                self.save_download(action.label, &url, file_name).await
            }
            (decoded, _) => decoded,
        };

        let outcome = match decoded {
            Ok(decoded) => {
                self.tracker.enter(action.label, ActionState::Rendering);
                self.render(action, decoded, &mut page)
            }
            Err(failure) => {
                self.tracker.enter(action.label, ActionState::Failed);
                self.flash(&mut page, failure.kind, &failure.message, AlertStyle::Danger);
                Outcome::Failed {
                    kind: failure.kind.to_string(),
                    message: failure.message,
                }
            }
        };

        if self.fetch_plots && action.refresh_plots && outcome == Outcome::Rendered {
            self.fetch_plot_images(&mut page).await;
        }

        drop(page);
        self.tracker.enter(action.label, ActionState::Idle);
        Ok(outcome)
    }

    fn flash(&self, page: &mut Page, kind: &str, message: &str, style: AlertStyle) {
        page.flash
            .show(&self.templates, kind, message, style, Utc::now());
    }

    fn append<R: RenderRow>(&self, page: &mut Page, table: &str, record: &R, ctx: &RowContext) {
        let row = render_row(&self.templates, record, ctx);
        if let Some(table) = page.table_mut(table) {
            table.append(row);
        }
    }

    fn render(&self, action: &ActionSpec, decoded: Decoded, page: &mut Page) -> Outcome {
        let none = RowContext::default();
        match (&action.reply, decoded) {
            (ReplyShape::Services { list }, Decoded::Services(services)) => {
                page.clear_table(list);
                for service in &services {
                    self.append(page, list, service, &none);
                }
            }
            (ReplyShape::ServiceAdded { list }, Decoded::ServiceAdded(service)) => {
                self.append(page, list, &service, &none);
            }
            (
                ReplyShape::Distributions {
                    arrivals,
                    servers,
                    results,
                },
                Decoded::Distributions(arrival_rows, server_rows),
            ) => {
                for table in [arrivals, servers, results] {
                    page.clear_table(table);
                }
                for row in &arrival_rows {
                    self.append(page, arrivals, row, &none);
                }
                for row in &server_rows {
                    self.append(page, servers, row, &none);
                }
            }
            (ReplyShape::ArrivalRows { table }, Decoded::ArrivalRows(rows)) => {
                page.clear_table(table);
                for row in &rows {
                    self.append(page, table, row, &none);
                }
            }
            (ReplyShape::ServerRows { table }, Decoded::ServerRows(rows)) => {
                page.clear_table(table);
                for row in &rows {
                    self.append(page, table, row, &none);
                }
            }
            (ReplyShape::CustomerEvents { customers, events }, Decoded::Events(batch)) => {
                let ctx = RowContext::for_events(&batch);
                for table in [customers, events] {
                    page.clear_table(table);
                    if let Some(table) = page.table_mut(table) {
                        table.set_column_hidden(ARRIVAL_PROBABILITY, !ctx.arrival_probability);
                        table.set_column_hidden(COMPLETION_PROBABILITY, !ctx.completion_probability);
                    }
                }
                for event in &batch {
                    if event.is_arrival() {
                        self.append(page, customers, &CustomerRow(event), &ctx);
                    }
                    self.append(page, events, &EventRow(event), &ctx);
                }
            }
            (ReplyShape::ServerAssignments { table }, Decoded::Assignments(events, metrics)) => {
                page.clear_table(table);
                for event in &events {
                    self.append(page, table, event, &none);
                }
                if let Some(metrics) = metrics {
                    show_metrics(page, &metrics);
                }
            }
            (_, Decoded::Saved(download)) => {
                info!(path = %download.path.display(), "download saved");
                page.downloads.push(download);
            }
            (_, Decoded::Cleared) => {
                page.close_modal(self.spec.modal);
                for table in self.spec.tables {
                    page.clear_table(table.selector);
                }
            }
            (shape, Decoded::Missing) => {
                warn!(action = action.label, "reply carried no data");
                for table in shape.targets() {
                    page.clear_table(table);
                }
                update_section_visibility(page);
                self.flash(page, "Warning!", NO_DATA_MESSAGE, AlertStyle::Warning);
                return Outcome::Warned {
                    message: NO_DATA_MESSAGE.to_string(),
                };
            }
            (shape, _) => {
                warn!(action = action.label, ?shape, "reply does not match action");
                return Outcome::Warned {
                    message: NO_DATA_MESSAGE.to_string(),
                };
            }
        }

        if let Some(form) = action.reset_form {
            if let Ok(form) = page.form_mut(form) {
                form.reset();
            }
        }
        if action.refresh_plots {
            self.refresh_plots(page);
        }
        update_section_visibility(page);
        if action.success_flash {
            self.flash(page, "Success!", "File uploaded successfully.", AlertStyle::Success);
        }
        Outcome::Rendered
    }

    /// Re-points every plot image at its endpoint with a fresh cache-buster.
    fn refresh_plots(&self, page: &mut Page) {
        let buster = page.next_cache_buster(Utc::now().timestamp_millis());
        for plot in self.spec.plots {
            page.set_image_src(plot.image, format!("{}?{}", plot.endpoint, buster));
        }
    }

    async fn save_download(
        &self,
        label: &str,
        url: &str,
        file_name: &str,
    ) -> std::result::Result<Decoded, Failure> {
        let reply = self
            .dispatcher
            .send(&RequestOptions::get(url))
            .await
            .map_err(|err| Failure::error(label, &err))?;
        let path = write_file(&self.download_dir, file_name, &reply.body)
            .await
            .map_err(|err| Failure::error(label, &err))?;
        Ok(Decoded::Saved(Download {
            url: url.to_string(),
            path,
        }))
    }

    async fn fetch_plot_images(&self, page: &mut Page) {
        for plot in self.spec.plots {
            let Some(src) = page.image_src(plot.image).map(str::to_string) else {
                continue;
            };
            let file_name = plot.endpoint.trim_start_matches('/');
            let saved = match self.dispatcher.send(&RequestOptions::get(&src)).await {
                Ok(reply) => write_file(&self.download_dir, file_name, &reply.body).await,
                Err(err) => Err(Error::Dispatch(err)),
            };
            match saved {
                Ok(path) => page.downloads.push(Download { url: src, path }),
                Err(err) => warn!(image = plot.image, error = %err, "plot fetch failed"),
            }
        }
    }
}

fn request_options(request: &RequestSpec, page: &Page) -> Result<RequestOptions> {
    let options = match request.method {
        Method::Get => RequestOptions::get(request.endpoint),
        Method::Post => RequestOptions::new(request.endpoint),
    };
    let options = match &request.body {
        BodySpec::None => options,
        BodySpec::Form(selector) => {
            let form = page
                .form(selector)
                .ok_or_else(|| Error::UnknownForm(selector.to_string()))?;
            options.multipart(form.to_form_data())
        }
        BodySpec::Flag { key, checkbox } => {
            let mut body = Map::new();
            body.insert(key.to_string(), Value::Bool(page.is_checked(checkbox)));
            options.json(Value::Object(body))
        }
    };
    Ok(options)
}

fn show_metrics(page: &mut Page, metrics: &Metrics) {
    page.set_text(
        parallel::TOTAL_CUSTOMERS,
        cell_text(&metrics.total_customers),
    );
    page.set_text(
        parallel::AVERAGE_WAIT_TIME,
        cell_text(&metrics.average_waiting_time),
    );
    for (server, rate) in metrics.utilization() {
        page.set_text(
            &format!("#{}-utilization", server.to_lowercase()),
            rate.to_string(),
        );
    }
}

async fn write_file(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let io_error = |err: std::io::Error| Error::Io(format!("failed to write '{}': {}", file_name, err));
    tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, bytes).await.map_err(io_error)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Body;
    use crate::notify::FlashPhase;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        controller: Controller,
        page: Page,
    }

    fn harness(spec: &'static ControllerSpec, download_dir: PathBuf) -> Harness {
        let transport = ScriptedTransport::new();
        let controller = Controller::new(
            spec,
            Dispatcher::new(transport.clone()),
            Arc::new(Templates::builtin().unwrap()),
            download_dir,
            false,
        );
        let mut page = Page::default();
        let mut router = EventRouter::default();
        controller.init(0, &mut page, &mut router).unwrap();
        Harness {
            transport,
            controller,
            page,
        }
    }

    fn single() -> Harness {
        harness(&SINGLE_SERVER, std::env::temp_dir())
    }

    fn parallel() -> Harness {
        harness(&PARALLEL_SERVER, std::env::temp_dir())
    }

    impl Harness {
        async fn run(&mut self, kind: ActionKind) -> Outcome {
            self.controller.handle(kind, &mut self.page).await.unwrap()
        }
    }

    #[tokio::test]
    async fn simulate_single_arrival_fills_both_tables() {
        let mut h = single();
        h.transport.push_json(
            "/simulate",
            json!({"success": true, "events": [{
                "Customer ID": 1, "Event Type": "Arrival", "Clock Time": 0,
                "Service Code": "A", "Service Title": "Basic",
                "Service Duration": 5, "End Time": 5
            }]}),
        );

        assert_eq!(h.run(ActionKind::Simulate).await, Outcome::Rendered);

        assert_eq!(h.page.table_len(single::CUSTOMER_TABLE), 1);
        assert_eq!(h.page.table_len(single::EVENT_TABLE), 1);
        for table in [single::CUSTOMER_TABLE, single::EVENT_TABLE] {
            let table = h.page.table(table).unwrap();
            assert!(table.is_column_hidden(ARRIVAL_PROBABILITY));
            assert!(table.is_column_hidden(COMPLETION_PROBABILITY));
        }
        let src = h.page.image_src(single::ARRIVAL_PLOT).unwrap();
        assert!(src.starts_with("/arrival_plot.png?"));

        let requests = h.transport.requests();
        assert_eq!(requests[0].path, "/simulate");
        assert_eq!(
            requests[0].body,
            Body::Json(r#"{"probability_simulation":false}"#.to_string())
        );
        assert_eq!(
            h.controller.tracker().path(),
            vec![
                ActionState::Idle,
                ActionState::Pending,
                ActionState::Rendering,
                ActionState::Idle,
            ]
        );
    }

    #[tokio::test]
    async fn simulate_shows_probability_columns_and_drops_missing_cells() {
        let mut h = single();
        h.page.set_checked(single::PROBABILITY_CHECKBOX, true);
        h.transport.push_json(
            "/simulate",
            json!({"success": true, "events": [
                {"Customer ID": 1, "Event Type": "Arrival", "Clock Time": 0, "Arrival Probability": 0.25},
                {"Customer ID": 1, "Event Type": "Departure", "Clock Time": 4}
            ]}),
        );

        h.run(ActionKind::Simulate).await;

        let events = h.page.table(single::EVENT_TABLE).unwrap();
        assert!(!events.is_column_hidden(ARRIVAL_PROBABILITY));
        assert!(events.is_column_hidden(COMPLETION_PROBABILITY));
        assert_eq!(events.rows[0].text(ARRIVAL_PROBABILITY), Some("0.25"));
        assert_eq!(events.rows[1].cells.len(), 4);
        assert_eq!(h.page.table_len(single::CUSTOMER_TABLE), 1);
        assert_eq!(
            h.transport.requests()[0].body,
            Body::Json(r#"{"probability_simulation":true}"#.to_string())
        );
    }

    #[tokio::test]
    async fn every_refresh_gets_a_new_cache_buster() {
        let mut h = single();
        let reply = json!({"success": true, "events": []});
        h.transport.push_json("/simulate", reply.clone());
        h.transport.push_json("/simulate", reply);

        h.run(ActionKind::Simulate).await;
        let first = h.page.image_src(single::SYSTEM_STATE_PLOT).unwrap().to_string();
        h.run(ActionKind::Simulate).await;
        let second = h.page.image_src(single::SYSTEM_STATE_PLOT).unwrap().to_string();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn repeated_uploads_replace_the_service_list() {
        let mut h = single();
        let reply = json!({"data": [
            {"code": "A", "title": "Basic", "duration": 5},
            {"code": "B", "title": "Premium", "duration": 8}
        ]});
        h.transport.push_json("/upload_file", reply.clone());
        h.transport.push_json("/upload_file", reply);
        h.page
            .form_mut(single::UPLOAD_FORM)
            .unwrap()
            .attach("file", "services.xlsx", b"sheet".to_vec());

        h.run(ActionKind::Upload).await;
        h.run(ActionKind::Upload).await;

        assert_eq!(h.page.table_len(single::SERVICE_LIST), 2);
        assert!(h.page.is_section_visible(single::SERVICES_SECTION));
        assert!(h.page.form(single::UPLOAD_FORM).unwrap().is_empty());
        let flash = h.page.flash.last().unwrap();
        assert_eq!(flash.text(), "Success!: File uploaded successfully.");
        assert_eq!(flash.style, AlertStyle::Success);
        assert_eq!(flash.phase, FlashPhase::Visible);

        match &h.transport.requests()[0].body {
            Body::Multipart(form) => assert_eq!(form.files[0].file_name, "services.xlsx"),
            other => panic!("expected multipart body, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn upload_without_data_array_warns_and_clears() {
        let mut h = single();
        h.transport
            .push_json("/upload_file", json!({"data": [{"code": "A"}]}));
        h.transport.push_json("/upload_file", json!({"rows": 3}));

        h.run(ActionKind::Upload).await;
        assert!(h.page.is_section_visible(single::SERVICES_SECTION));

        let outcome = h.run(ActionKind::Upload).await;
        assert_eq!(
            outcome,
            Outcome::Warned {
                message: NO_DATA_MESSAGE.to_string()
            }
        );
        assert_eq!(h.page.table_len(single::SERVICE_LIST), 0);
        assert!(!h.page.is_section_visible(single::SERVICES_SECTION));
        assert_eq!(
            h.page.flash.last().unwrap().text(),
            "Warning!: No data received from the server."
        );
    }

    #[tokio::test]
    async fn add_service_appends_and_resets_form() {
        let mut h = single();
        h.transport.push_json(
            "/add_service",
            json!({"service_code": "C", "service_title": "Express", "service_duration": 2}),
        );
        let form = h.page.form_mut(single::ADD_SERVICE_FORM).unwrap();
        form.set("service_code", "C");
        form.set("service_title", "Express");
        form.set("service_duration", "2");

        h.run(ActionKind::AddService).await;

        let list = h.page.table(single::SERVICE_LIST).unwrap();
        assert_eq!(list.rows[0].text("title"), Some("Express"));
        assert!(h.page.form(single::ADD_SERVICE_FORM).unwrap().is_empty());
        assert!(h.page.is_section_visible(single::SERVICES_SECTION));
    }

    #[tokio::test]
    async fn failed_clear_keeps_tables_and_modal() {
        let mut h = single();
        h.transport
            .push_json("/upload_file", json!({"data": [{"code": "A", "title": "Basic", "duration": 5}]}));
        h.transport.push_status("/clear_data", 500);
        h.run(ActionKind::Upload).await;

        assert_eq!(
            h.run(ActionKind::RequestClear).await,
            Outcome::AwaitingConfirmation {
                modal: single::CLEAR_MODAL
            }
        );
        let outcome = h.run(ActionKind::ConfirmClear).await;

        assert_eq!(
            outcome,
            Outcome::Failed {
                kind: "Error!".to_string(),
                message: "clearing data: Internal Server Error".to_string(),
            }
        );
        let flash = h.page.flash.last().unwrap();
        assert_eq!(flash.text(), "Error!: clearing data: Internal Server Error");
        assert_eq!(flash.style, AlertStyle::Danger);
        assert_eq!(h.page.table_len(single::SERVICE_LIST), 1);
        assert!(h.page.is_modal_open(single::CLEAR_MODAL));

        let control = h.page.control(single::CONFIRM_CLEAR_BUTTON).unwrap();
        assert!(!control.spinner_visible);
        assert_eq!((control.shown, control.hidden), (1, 1));
    }

    #[tokio::test]
    async fn confirm_without_open_modal_sends_nothing() {
        let mut h = single();
        let err = h
            .controller
            .handle(ActionKind::ConfirmClear, &mut h.page)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ConfirmationNotRequested));
        assert!(h.transport.requests().is_empty());
    }

    #[tokio::test]
    async fn confirmed_clear_empties_every_table() {
        let mut h = parallel();
        h.transport.push_json(
            "/upload_file_parallel",
            json!({"success": true,
                   "arrivals": [{"Time Between Arrival": 1, "Probability": 0.5}],
                   "servers": [{"Server No.": 1, "Server Probability": 0.4}]}),
        );
        h.transport.push_status("/clear_data_parallel", 200);
        h.run(ActionKind::Upload).await;
        assert!(h.page.is_section_visible(parallel::ARRIVAL_SECTION));
        assert!(h.page.is_section_visible(parallel::SERVER_SECTION));

        h.run(ActionKind::RequestClear).await;
        assert_eq!(h.run(ActionKind::ConfirmClear).await, Outcome::Rendered);

        for table in [
            parallel::ARRIVAL_TABLE,
            parallel::SERVER_TABLE,
            parallel::SERVERS_TABLE,
        ] {
            assert_eq!(h.page.table_len(table), 0);
        }
        assert!(!h.page.is_section_visible(parallel::ARRIVAL_SECTION));
        assert!(!h.page.is_section_visible(parallel::SERVER_SECTION));
        assert!(!h.page.is_modal_open(parallel::CLEAR_MODAL));
        assert!(h
            .page
            .image_src(parallel::SERVERS_PLOT)
            .unwrap()
            .starts_with("/parallel_servers_plot.png?"));
    }

    #[tokio::test]
    async fn confirmed_single_server_clear_empties_every_table() {
        let mut h = single();
        h.transport.push_json(
            "/upload_file",
            json!({"data": [{"code": "A", "title": "Basic", "duration": 5}]}),
        );
        h.transport.push_json(
            "/simulate",
            json!({"success": true, "events": [
                {"Customer ID": 1, "Event Type": "Arrival", "Clock Time": 0},
                {"Customer ID": 1, "Event Type": "Departure", "Clock Time": 5}
            ]}),
        );
        h.transport.push_status("/clear_data", 200);
        h.run(ActionKind::Upload).await;
        h.run(ActionKind::Simulate).await;
        assert!(h.page.is_section_visible(single::SERVICES_SECTION));
        assert_eq!(h.page.table_len(single::EVENT_TABLE), 2);
        let before = h.page.image_src(single::ARRIVAL_PLOT).unwrap().to_string();

        h.run(ActionKind::RequestClear).await;
        assert_eq!(h.run(ActionKind::ConfirmClear).await, Outcome::Rendered);

        for table in [
            single::CUSTOMER_TABLE,
            single::EVENT_TABLE,
            single::SERVICE_LIST,
        ] {
            assert_eq!(h.page.table_len(table), 0);
        }
        assert!(!h.page.is_section_visible(single::SERVICES_SECTION));
        assert!(!h.page.is_modal_open(single::CLEAR_MODAL));
        assert_ne!(h.page.image_src(single::ARRIVAL_PLOT).unwrap(), before);
        assert_eq!(
            h.transport.paths(),
            vec!["/upload_file", "/simulate", "/clear_data"]
        );
    }

    #[tokio::test]
    async fn add_rows_refresh_plots() {
        let cases = [
            (
                &SINGLE_SERVER,
                ActionKind::AddService,
                "/add_service",
                json!({"service_code": "C", "service_title": "Express", "service_duration": 2}),
            ),
            (
                &PARALLEL_SERVER,
                ActionKind::AddArrival,
                "/add_arrival",
                json!({"success": true, "events": [{"Time Between Arrival": 1, "Probability": 0.5}]}),
            ),
            (
                &PARALLEL_SERVER,
                ActionKind::AddServer,
                "/add_server",
                json!({"success": true, "events": [{"Server No.": 1, "Service Time": 4}]}),
            ),
        ];

        for (spec, kind, endpoint, reply) in cases {
            let mut h = harness(spec, std::env::temp_dir());
            h.transport.push_json(endpoint, reply.clone());
            h.transport.push_json(endpoint, reply);

            let mounted = plot_sources(&h);
            assert_eq!(h.run(kind).await, Outcome::Rendered, "{}", kind);
            let first = plot_sources(&h);
            h.run(kind).await;
            let second = plot_sources(&h);

            for (index, plot) in spec.plots.iter().enumerate() {
                assert_eq!(mounted[index], plot.endpoint);
                assert!(first[index].starts_with(&format!("{}?", plot.endpoint)), "{}", kind);
                assert_ne!(first[index], second[index], "{}", kind);
            }
        }
    }

    fn plot_sources(h: &Harness) -> Vec<String> {
        h.controller
            .spec()
            .plots
            .iter()
            .map(|plot| h.page.image_src(plot.image).unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn server_assignments_derive_columns_and_metrics() {
        let mut h = parallel();
        h.transport.push_json(
            "/simulate_servers",
            json!({"success": true,
                   "events": [{"Customer ID": 1, "Server": "Able", "Clock Time": 2,
                               "Wait Time": 1, "Service Duration": 3, "End Time": 6}],
                   "metrics": {"Total Customers": 1, "Average Waiting Time": 1.0,
                               "Able Utilization Rate": "75.00%",
                               "Baker Utilization Rate": "0.00%"}}),
        );

        h.run(ActionKind::Simulate).await;

        let row = &h.page.table(parallel::SERVERS_TABLE).unwrap().rows[0];
        assert_eq!(row.text("service_start"), Some("3"));
        assert_eq!(row.text("time_in_system"), Some("4"));
        assert_eq!(h.page.text(parallel::TOTAL_CUSTOMERS), Some("1"));
        assert_eq!(h.page.text(parallel::AVERAGE_WAIT_TIME), Some("1"));
        assert_eq!(h.page.text("#able-utilization"), Some("75.00%"));
        assert_eq!(h.page.text("#baker-utilization"), Some("0.00%"));
        assert_eq!(h.transport.requests()[0].body, Body::Empty);
    }

    #[tokio::test]
    async fn success_false_with_error_names_the_action() {
        let mut h = parallel();
        h.transport.push_json(
            "/add_arrival",
            json!({"success": false, "error": "Probabilities exceed 1"}),
        );
        h.page
            .form_mut(parallel::ADD_ARRIVAL_FORM)
            .unwrap()
            .set("arrival_time", "3");

        let outcome = h.run(ActionKind::AddArrival).await;

        assert_eq!(
            outcome.to_string(),
            "Error!: adding arrival data: Probabilities exceed 1"
        );
        assert_eq!(h.page.table_len(parallel::ARRIVAL_TABLE), 0);
        assert_eq!(
            h.page.image_src(parallel::SERVERS_PLOT),
            Some("/parallel_servers_plot.png")
        );
    }

    #[tokio::test]
    async fn download_failure_message_is_shown_verbatim() {
        let mut h = single();
        h.transport.push_json(
            "/download_data",
            json!({"success": false, "message": "No data available to download"}),
        );

        h.run(ActionKind::Download).await;

        let flash = h.page.flash.last().unwrap();
        assert_eq!(flash.kind, "Error");
        assert_eq!(flash.message, "No data available to download");
        assert_eq!(flash.style, AlertStyle::Danger);
    }

    #[tokio::test]
    async fn download_success_saves_the_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = harness(&SINGLE_SERVER, dir.path().join("out"));
        h.transport.push_json(
            "/download_data",
            json!({"success": true, "file_url": "/static/files/queue_data.xlsx"}),
        );
        h.transport
            .push_bytes("/static/files/queue_data.xlsx", b"workbook");

        assert_eq!(h.run(ActionKind::Download).await, Outcome::Rendered);

        let saved = &h.page.downloads[0];
        assert_eq!(saved.path, dir.path().join("out").join("queue_data.xlsx"));
        assert_eq!(std::fs::read(&saved.path).unwrap(), b"workbook");
        assert!(h.page.flash.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_becomes_danger_flash() {
        let mut h = parallel();
        h.transport.push_error("/add_server", "connection refused");

        let outcome = h.run(ActionKind::AddServer).await;

        assert!(outcome.is_failure());
        assert_eq!(
            h.page.flash.last().unwrap().text(),
            "Error!: adding server: connection refused"
        );
        assert!(!h.page.control(parallel::ADD_SERVER_BUTTON).unwrap().spinner_visible);
    }

    #[tokio::test]
    async fn undecodable_reply_is_a_parse_failure() {
        let mut h = single();
        h.transport.push_bytes("/simulate", b"<html>oops</html>");

        let outcome = h.run(ActionKind::Simulate).await;

        match outcome {
            Outcome::Failed { kind, message } => {
                assert_eq!(kind, "Error!");
                assert!(message.starts_with("simulating customers: parsererror: "));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn init_twice_is_rejected() {
        let h = single();
        let mut page = Page::default();
        let mut router = EventRouter::default();
        h.controller.init(0, &mut page, &mut router).unwrap();
        let err = h.controller.init(0, &mut page, &mut router).unwrap_err();
        assert!(matches!(err, Error::AlreadyBound(_)));
    }
}
