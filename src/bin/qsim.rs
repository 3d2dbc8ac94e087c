use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use queue_sim_client::app::App;
use queue_sim_client::cli::{self, Command, ShellCommand};
use queue_sim_client::config::{self, ClientConfig};
use queue_sim_client::dispatch::HttpTransport;
use queue_sim_client::error::{Error, Result};
use queue_sim_client::output::{self, formatter_for, Report};
use queue_sim_client::state::Outcome;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = cli::parse_args()?;
    init_tracing(args.verbose);
    let config = config::build_config(&args)?;

    match &args.command {
        Command::Endpoints => print!("{}", output::endpoints()),
        Command::Templates => print!("{}", output::templates()),
        Command::Action(action) => {
            let mut app = bootstrap(&config).await?;
            let outcome = app.perform(&action.steps()).await?;
            print_report(&config, &app, outcome.as_ref());
            if let Some(outcome) = outcome.filter(Outcome::is_failure) {
                return Err(Error::ActionFailed(outcome.to_string()));
            }
        }
        Command::Shell => shell(&config).await?,
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn bootstrap(config: &ClientConfig) -> Result<App> {
    let transport = HttpTransport::new(&config.base_url)?;
    App::bootstrap(config, Arc::new(transport)).await
}

fn print_report(config: &ClientConfig, app: &App, outcome: Option<&Outcome>) {
    let report = Report {
        outcome,
        page: app.page(),
    };
    print!("{}", formatter_for(config.format).write(&report));
}

async fn shell(config: &ClientConfig) -> Result<()> {
    let mut app = bootstrap(config).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("qsim> ");
        std::io::stdout()
            .flush()
            .map_err(|err| Error::Io(format!("failed to flush stdout: {}", err)))?;
        let Some(line) = lines
            .next_line()
            .await
            .map_err(|err| Error::Io(format!("failed to read stdin: {}", err)))?
        else {
            break;
        };

        let command = match cli::parse_shell_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                eprintln!("{}", err);
                continue;
            }
        };

        let result = match command {
            ShellCommand::Quit => break,
            ShellCommand::Show => {
                print_report(config, &app, None);
                continue;
            }
            ShellCommand::Cancel => {
                app.cancel_modals();
                continue;
            }
            ShellCommand::Confirm => app.confirm_open_modal().await.map(Some),
            ShellCommand::Press { control } => app.trigger(&control).await.map(Some),
            ShellCommand::Action(action) => app.perform(&action.steps()).await,
        };

        match result {
            Ok(Some(outcome)) => println!("{}", outcome),
            Ok(None) => {}
            Err(err) => eprintln!("Error: {}", err),
        }
    }

    Ok(())
}
