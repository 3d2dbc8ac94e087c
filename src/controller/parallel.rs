use crate::dispatch::Method;
use crate::render::ColumnSpec;

use super::{
    ActionKind, ActionSpec, BodySpec, ControllerSpec, PlotSpec, ReplyShape, RequestSpec, TableSpec,
};

pub const ARRIVAL_TABLE: &str = ".arrival-data-table tbody";
pub const SERVER_TABLE: &str = ".server-data-table tbody";
pub const SERVERS_TABLE: &str = ".servers-data-table tbody";
pub const ARRIVAL_SECTION: &str = ".arrival-data";
pub const SERVER_SECTION: &str = ".server-data";

pub const UPLOAD_FORM: &str = "#parallelUploadFileForm";
pub const ADD_ARRIVAL_FORM: &str = "#addArrivalForm";
pub const ADD_SERVER_FORM: &str = "#addServerForm";
pub const CLEAR_MODAL: &str = "#parallelClearDataModal";

pub const UPLOAD_BUTTON: &str = "#parallelUploadFileButton";
pub const DOWNLOAD_BUTTON: &str = "#parallelDownloadDataButton";
pub const CLEAR_BUTTON: &str = "#parallelClearDataButton";
pub const CONFIRM_CLEAR_BUTTON: &str = "#ConfirmClearDataButton";
pub const ADD_ARRIVAL_BUTTON: &str = "#addArrivalButton";
pub const ADD_SERVER_BUTTON: &str = "#addServerButton";
pub const SIMULATE_BUTTON: &str = "#parallelSimulateButton";

pub const SERVERS_PLOT: &str = "#servers_plot";

pub const TOTAL_CUSTOMERS: &str = "#total-customers";
pub const AVERAGE_WAIT_TIME: &str = "#average-wait-time";

const ARRIVAL_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("time_between_arrival", "Time Between Arrival"),
    ColumnSpec::required("probability", "Probability"),
    ColumnSpec::required("cumulative_probability", "Accumulative Probability"),
    ColumnSpec::required("digit_from", "Digit Assignment From"),
    ColumnSpec::required("digit_to", "Digit Assignment To"),
];

const SERVER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("server_no", "Server No."),
    ColumnSpec::required("probability", "Probability"),
    ColumnSpec::required("cumulative_probability", "Accumulative Probability"),
    ColumnSpec::required("digit_from", "Digit Assignment From"),
    ColumnSpec::required("digit_to", "Digit Assignment To"),
];

const SERVERS_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::required("customer_id", "Customer ID"),
    ColumnSpec::required("server", "Server"),
    ColumnSpec::required("clock_time", "Clock Time"),
    ColumnSpec::required("wait_time", "Wait Time"),
    ColumnSpec::required("service_start", "Service Start"),
    ColumnSpec::required("service_duration", "Service Duration"),
    ColumnSpec::required("end_time", "End Time"),
    ColumnSpec::required("time_in_system", "Time in System"),
];

pub static PARALLEL_SERVER: ControllerSpec = ControllerSpec {
    name: "parallel-server",
    tables: &[
        TableSpec {
            selector: ARRIVAL_TABLE,
            section: Some(ARRIVAL_SECTION),
            columns: ARRIVAL_COLUMNS,
        },
        TableSpec {
            selector: SERVER_TABLE,
            section: Some(SERVER_SECTION),
            columns: SERVER_COLUMNS,
        },
        TableSpec {
            selector: SERVERS_TABLE,
            section: None,
            columns: SERVERS_COLUMNS,
        },
    ],
    plots: &[PlotSpec {
        image: SERVERS_PLOT,
        endpoint: "/parallel_servers_plot.png",
    }],
    forms: &[UPLOAD_FORM, ADD_ARRIVAL_FORM, ADD_SERVER_FORM],
    checkboxes: &[],
    modal: CLEAR_MODAL,
    actions: &[
        ActionSpec {
            kind: ActionKind::Upload,
            control: UPLOAD_BUTTON,
            label: "uploading file",
            request: Some(RequestSpec {
                endpoint: "/upload_file_parallel",
                method: Method::Post,
                body: BodySpec::Form(UPLOAD_FORM),
            }),
            reply: ReplyShape::Distributions {
                arrivals: ARRIVAL_TABLE,
                servers: SERVER_TABLE,
                results: SERVERS_TABLE,
            },
            reset_form: Some(UPLOAD_FORM),
            success_flash: true,
            refresh_plots: false,
        },
        ActionSpec {
            kind: ActionKind::Download,
            control: DOWNLOAD_BUTTON,
            label: "downloading data",
            request: Some(RequestSpec {
                endpoint: "/download_parallel_data",
                method: Method::Get,
                body: BodySpec::None,
            }),
            reply: ReplyShape::Download {
                file_name: "parallel_queue_data.xlsx",
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
                endpoint: "/clear_data_parallel",
                method: Method::Get,
                body: BodySpec::None,
            }),
            reply: ReplyShape::Cleared,
            reset_form: None,
            success_flash: false,
            refresh_plots: true,
        },
        ActionSpec {
            kind: ActionKind::AddArrival,
            control: ADD_ARRIVAL_BUTTON,
            label: "adding arrival data",
            request: Some(RequestSpec {
                endpoint: "/add_arrival",
                method: Method::Post,
                body: BodySpec::Form(ADD_ARRIVAL_FORM),
            }),
            reply: ReplyShape::ArrivalRows {
                table: ARRIVAL_TABLE,
            },
            reset_form: None,
            success_flash: false,
            refresh_plots: true,
        },
        ActionSpec {
            kind: ActionKind::AddServer,
            control: ADD_SERVER_BUTTON,
            label: "adding server",
            request: Some(RequestSpec {
                endpoint: "/add_server",
                method: Method::Post,
                body: BodySpec::Form(ADD_SERVER_FORM),
            }),
            reply: ReplyShape::ServerRows {
                table: SERVER_TABLE,
            },
            reset_form: None,
            success_flash: false,
            refresh_plots: true,
        },
        ActionSpec {
            kind: ActionKind::Simulate,
            control: SIMULATE_BUTTON,
            label: "simulating customers",
            request: Some(RequestSpec {
                endpoint: "/simulate_servers",
                method: Method::Post,
                body: BodySpec::None,
            }),
            reply: ReplyShape::ServerAssignments {
                table: SERVERS_TABLE,
            },
            reset_form: None,
            success_flash: false,
            refresh_plots: true,
        },
    ],
};
