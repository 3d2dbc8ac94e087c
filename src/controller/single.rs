use crate::dispatch::Method;
use crate::render::{ColumnSpec, ARRIVAL_PROBABILITY, COMPLETION_PROBABILITY};

use super::{
    ActionKind, ActionSpec, BodySpec, ControllerSpec, PlotSpec, ReplyShape, RequestSpec, TableSpec,
};

pub const CUSTOMER_TABLE: &str = ".customer-data-table tbody";
pub const EVENT_TABLE: &str = ".event-data-table tbody";
pub const SERVICE_LIST: &str = ".service-list ul";
pub const SERVICES_SECTION: &str = ".current-services";

pub const UPLOAD_FORM: &str = "#uploadFileForm";
pub const ADD_SERVICE_FORM: &str = "#addServiceForm";
pub const PROBABILITY_CHECKBOX: &str = "#probabilityCheckbox";
pub const CLEAR_MODAL: &str = "#clearDataModal";

pub const UPLOAD_BUTTON: &str = "#uploadFileButton";
pub const DOWNLOAD_BUTTON: &str = "#downloadDataButton";
pub const CLEAR_BUTTON: &str = "#clearDataButton";
pub const CONFIRM_CLEAR_BUTTON: &str = "#confirmClearDataButton";
pub const ADD_SERVICE_BUTTON: &str = "#addServiceButton";
pub const SIMULATE_BUTTON: &str = "#simulateButton";

pub const ARRIVAL_PLOT: &str = "#arrival_plot";
pub const SYSTEM_STATE_PLOT: &str = "#system_state_plot";

const PROBABILITY_COLUMNS: [ColumnSpec; 2] = [
    ColumnSpec::optional(ARRIVAL_PROBABILITY, "Arrival Probability"),
    ColumnSpec::optional(COMPLETION_PROBABILITY, "Completion Probability"),
];

const CUSTOMER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("customer_id", "Customer ID"),
    ColumnSpec::required("interval_time", "Interval Time"),
    ColumnSpec::required("clock_time", "Clock Time"),
    ColumnSpec::required("service_code", "Service Code"),
    ColumnSpec::required("service_title", "Service Title"),
    ColumnSpec::required("start_time", "Start Time"),
    ColumnSpec::required("service_duration", "Service Duration"),
    ColumnSpec::required("end_time", "End Time"),
    PROBABILITY_COLUMNS[0],
    PROBABILITY_COLUMNS[1],
];

const EVENT_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("clock_time", "Clock Time"),
    ColumnSpec::required("event_type", "Event Type"),
    ColumnSpec::required("customer_id", "Customer ID"),
    ColumnSpec::required("service_title", "Service Title"),
    PROBABILITY_COLUMNS[0],
    PROBABILITY_COLUMNS[1],
];

const SERVICE_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("code", "Code"),
    ColumnSpec::required("title", "Title"),
    ColumnSpec::required("duration", "Duration"),
];

pub static SINGLE_SERVER: ControllerSpec = ControllerSpec {
    name: "single-server",
    tables: &[
        TableSpec {
            selector: CUSTOMER_TABLE,
            section: None,
            columns: CUSTOMER_COLUMNS,
        },
        TableSpec {
            selector: EVENT_TABLE,
            section: None,
            columns: EVENT_COLUMNS,
        },
        TableSpec {
            selector: SERVICE_LIST,
            section: Some(SERVICES_SECTION),
            columns: SERVICE_COLUMNS,
        },
    ],
    plots: &[
        PlotSpec {
            image: ARRIVAL_PLOT,
            endpoint: "/arrival_plot.png",
        },
        PlotSpec {
            image: SYSTEM_STATE_PLOT,
            endpoint: "/customers_system_plot.png",
        },
    ],
    forms: &[UPLOAD_FORM, ADD_SERVICE_FORM],
    checkboxes: &[PROBABILITY_CHECKBOX],
    modal: CLEAR_MODAL,
    actions: &[
        ActionSpec {
            kind: ActionKind::Upload,
            control: UPLOAD_BUTTON,
            label: "uploading file",
            request: Some(RequestSpec {
                endpoint: "/upload_file",
                method: Method::Post,
                body: BodySpec::Form(UPLOAD_FORM),
            }),
            reply: ReplyShape::Services { list: SERVICE_LIST },
            reset_form: Some(UPLOAD_FORM),
            success_flash: true,
            refresh_plots: false,
        },
        ActionSpec {
            kind: ActionKind::Download,
            control: DOWNLOAD_BUTTON,
            label: "downloading data",
            request: Some(RequestSpec {
                endpoint: "/download_data",
                method: Method::Get,
                body: BodySpec::None,
            }),
            reply: ReplyShape::Download {
                file_name: "queue_data.xlsx",
            },
            reset_form: None,
            success_flash: false,
            refresh_plots: false,
        },
        ActionSpec {
            kind: ActionKind::RequestClear,
            control: CLEAR_BUTTON,
            label: "clearing data",
            request: None,
            reply: ReplyShape::OpenModal,
            reset_form: None,
            success_flash: false,
            refresh_plots: false,
        },
        ActionSpec {
            kind: ActionKind::ConfirmClear,
            control: CONFIRM_CLEAR_BUTTON,
            label: "clearing data",
            request: Some(RequestSpec {
                endpoint: "/clear_data",
                method: Method::Get,
                body: BodySpec::None,
            }),
            reply: ReplyShape::Cleared,
            reset_form: None,
            success_flash: false,
            refresh_plots: true,
        },
        ActionSpec {
            kind: ActionKind::AddService,
            control: ADD_SERVICE_BUTTON,
            label: "adding service",
            request: Some(RequestSpec {
                endpoint: "/add_service",
                method: Method::Post,
                body: BodySpec::Form(ADD_SERVICE_FORM),
            }),
            reply: ReplyShape::ServiceAdded { list: SERVICE_LIST },
            reset_form: Some(ADD_SERVICE_FORM),
            success_flash: false,
            refresh_plots: true,
        },
        ActionSpec {
            kind: ActionKind::Simulate,
            control: SIMULATE_BUTTON,
            label: "simulating customers",
            request: Some(RequestSpec {
                endpoint: "/simulate",
                method: Method::Post,
                body: BodySpec::Flag {
                    key: "probability_simulation",
                    checkbox: PROBABILITY_CHECKBOX,
                },
            }),
            reply: ReplyShape::CustomerEvents {
                customers: CUSTOMER_TABLE,
                events: EVENT_TABLE,
            },
            reset_form: None,
            success_flash: false,
            refresh_plots: true,
        },
    ],
};
