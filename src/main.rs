//! cardscan - scan business cards and manage the extracted contacts.
//!
//! Uploads card images to an extraction backend, lets you review and correct
//! the extracted fields, and keeps the saved contacts in sync with the
//! backend. Contacts can be searched, sorted, edited, deleted and exported
//! as vCard or spreadsheet files.
//!
//! QUICK START:
//!   cardscan config set-backend http://localhost:8000
//!   cardscan extract card.jpg            # Review, then confirm to save
//!   cardscan list -q acme -s company     # Search and sort
//!   cardscan export sheet -d ~/Desktop   # .xlsx (or .csv) of all contacts
//!   cardscan shell                       # Interactive session

mod application;
mod cli;
mod domain;
mod infrastructure;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{Session, SpreadsheetCapability};
use cli::commands::{
    cmd_config, cmd_delete, cmd_edit, cmd_export, cmd_extract, cmd_list, cmd_ping, cmd_show,
    cmd_vcard, print_last_request,
};
use cli::{shell::run_shell, Cli, Commands};
use infrastructure::{load_config, ApiClient};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    let format = cli
        .output_format()
        .map_err(|e| domain::AppError::Config { message: e })?;

    let mut config = load_config()?;

    // Config commands never touch the backend.
    if let Commands::Config { action } = &cli.command {
        return cmd_config(&mut config, action);
    }

    if let Some(base) = &cli.backend {
        config.set_api_base(base);
    }
    if let Commands::Extract {
        api_key: Some(key), ..
    } = &cli.command
    {
        config.backend.api_key = Some(key.clone());
    }

    let api = ApiClient::from_config(&config)?;
    tracing::info!(base = %api.base(), "Using backend");
    let mut session = Session::new(config, api, SpreadsheetCapability::detect());

    let in_shell = matches!(cli.command, Commands::Shell);
    let result = dispatch(&mut session, cli.command, format, cli.show_request).await;
    if cli.show_request && !in_shell {
        print_last_request(&session);
    }
    result
}

async fn dispatch(
    session: &mut Session<ApiClient>,
    command: Commands,
    format: application::OutputFormat,
    show_request: bool,
) -> domain::Result<()> {
    let needs_list = !matches!(
        command,
        Commands::Ping | Commands::Shell | Commands::Extract { .. } | Commands::Config { .. }
    );
    if needs_list {
        session.refresh().await?;
    }

    match command {
        Commands::List(args) => cmd_list(session, &args, format),
        Commands::Show { id } => cmd_show(session, &id, format),
        Commands::Extract {
            image, edits, yes, ..
        } => cmd_extract(session, image.as_deref(), &edits, yes).await,
        Commands::Edit { id, edits } => cmd_edit(session, &id, &edits).await,
        Commands::Delete { id, yes } => cmd_delete(session, &id, yes).await,
        Commands::Vcard { id, dir } => cmd_vcard(session, &id, &dir).await,
        Commands::Export { kind, dir, csv } => cmd_export(session, kind, &dir, csv),
        Commands::Ping => cmd_ping(session).await,
        Commands::Shell => run_shell(session, format, show_request).await,
        Commands::Config { .. } => Ok(()),
    }
}

/// Setup logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time())
        .with(filter)
        .init();
}
