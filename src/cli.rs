use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::Step;
use crate::config::OutputFormat;
use crate::controller::{parallel, single};
use crate::error::{Error, Result};

#[derive(Parser, Debug)]
#[command(
    name = "qsim",
    version,
    about = "Headless client for the queueing simulation server"
)]
pub struct Args {
    /// TOML or JSON client config.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(long, global = true)]
    pub base_url: Option<String>,
    /// Use the compiled-in templates instead of fetching them.
    #[arg(long, global = true)]
    pub builtin_templates: bool,
    #[arg(long, global = true)]
    pub download_dir: Option<PathBuf>,
    #[arg(long, value_enum, global = true)]
    pub format: Option<OutputFormat>,
    /// Save every refreshed plot image into the download dir.
    #[arg(long, global = true)]
    pub fetch_plots: bool,
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(flatten)]
    Action(ActionCommand),
    /// Read commands from stdin against a single page.
    Shell,
    /// List the server endpoints each feature calls.
    Endpoints,
    /// List the template fragments loaded at startup.
    Templates,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum ActionCommand {
    /// Upload a service sheet (single server).
    Upload { file: PathBuf },
    /// Add one service definition.
    AddService {
        #[arg(long)]
        code: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        duration: String,
    },
    /// Run the single-server simulation.
    Simulate {
        /// Draw arrivals and completions from probabilities.
        #[arg(long)]
        probability: bool,
    },
    /// Download the single-server results workbook.
    Download,
    /// Clear single-server data; asks for confirmation unless --yes.
    Clear {
        #[arg(long)]
        yes: bool,
    },
    /// Upload an arrival/server distribution sheet (parallel servers).
    ParallelUpload { file: PathBuf },
    /// Add one arrival distribution row.
    AddArrival {
        #[arg(long)]
        time: String,
    },
    /// Add one server distribution row.
    AddServer {
        #[arg(long)]
        server_no: String,
        #[arg(long)]
        service_time: String,
    },
    /// Run the parallel-server simulation.
    SimulateServers,
    /// Download the parallel-server results workbook.
    ParallelDownload,
    /// Clear parallel-server data; asks for confirmation unless --yes.
    ParallelClear {
        #[arg(long)]
        yes: bool,
    },
}

impl ActionCommand {
    /// The page interactions this command stands for.
    pub fn steps(&self) -> Vec<Step> {
        match self {
            ActionCommand::Upload { file } => vec![
                Step::Attach {
                    form: single::UPLOAD_FORM,
                    path: file.clone(),
                },
                Step::Trigger(single::UPLOAD_BUTTON),
            ],
            ActionCommand::AddService {
                code,
                title,
                duration,
            } => vec![
                fill(single::ADD_SERVICE_FORM, "service_code", code),
                fill(single::ADD_SERVICE_FORM, "service_title", title),
                fill(single::ADD_SERVICE_FORM, "service_duration", duration),
                Step::Trigger(single::ADD_SERVICE_BUTTON),
            ],
            ActionCommand::Simulate { probability } => vec![
                Step::Check {
                    checkbox: single::PROBABILITY_CHECKBOX,
                    checked: *probability,
                },
                Step::Trigger(single::SIMULATE_BUTTON),
            ],
            ActionCommand::Download => vec![Step::Trigger(single::DOWNLOAD_BUTTON)],
            ActionCommand::Clear { yes } => clear(single::CLEAR_BUTTON, *yes),
            ActionCommand::ParallelUpload { file } => vec![
                Step::Attach {
                    form: parallel::UPLOAD_FORM,
                    path: file.clone(),
                },
                Step::Trigger(parallel::UPLOAD_BUTTON),
            ],
            ActionCommand::AddArrival { time } => vec![
                fill(parallel::ADD_ARRIVAL_FORM, "arrival_time", time),
                Step::Trigger(parallel::ADD_ARRIVAL_BUTTON),
            ],
            ActionCommand::AddServer {
                server_no,
                service_time,
            } => vec![
                fill(parallel::ADD_SERVER_FORM, "server_no", server_no),
                fill(parallel::ADD_SERVER_FORM, "service_time", service_time),
                Step::Trigger(parallel::ADD_SERVER_BUTTON),
            ],
            ActionCommand::SimulateServers => vec![Step::Trigger(parallel::SIMULATE_BUTTON)],
            ActionCommand::ParallelDownload => vec![Step::Trigger(parallel::DOWNLOAD_BUTTON)],
            ActionCommand::ParallelClear { yes } => clear(parallel::CLEAR_BUTTON, *yes),
        }
    }
}

fn fill(form: &'static str, field: &'static str, value: &str) -> Step {
    Step::Fill {
        form,
        field,
        value: value.to_string(),
    }
}

fn clear(control: &'static str, confirmed: bool) -> Vec<Step> {
    let mut steps = vec![Step::Trigger(control)];
    if confirmed {
        steps.push(Step::Confirm);
    }
    steps
}

/// One line typed into `qsim shell`.
#[derive(Parser, Debug)]
#[command(name = "qsim>", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum ShellCommand {
    #[command(flatten)]
    Action(ActionCommand),
    /// Press a control by selector, e.g. `press #simulateButton`.
    Press { control: String },
    /// Confirm the open clear-data dialog.
    Confirm,
    /// Dismiss the open clear-data dialog.
    Cancel,
    /// Print the current page.
    Show,
    #[command(alias = "exit")]
    Quit,
}

pub fn parse_args() -> Result<Args> {
    Args::try_parse().map_err(|e| match e.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
        _ => Error::Cli(e.to_string()),
    })
}

pub fn parse_shell_line(line: &str) -> Result<Option<ShellCommand>> {
    let words = split_words(line)?;
    if words.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(words)
        .map(|parsed| Some(parsed.command))
        .map_err(|e| Error::Cli(e.to_string()))
}

// Whitespace-separated words; single or double quotes group.
fn split_words(line: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match (quote, ch) {
            (Some(open), ch) if ch == open => quote = None,
            (Some(_), ch) => current.push(ch),
            (None, '"' | '\'') => {
                quote = Some(ch);
                in_word = true;
            }
            (None, ch) if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, ch) => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err(Error::Cli(format!("unterminated quote in '{}'", line)));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}
