mod commands;
mod render;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use coach_core::{CoachConfig, DateRange, GptClient, Orchestrator};
use coach_provider_google::GoogleCalendar;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coach")]
#[command(about = "Plan next week with your expert assistants and write it to Google Calendar")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in to Google Calendar
    Auth,
    /// List the calendars of the signed-in account
    Calendars,
    /// Ask the experts and print the integrated weekly plan
    Plan,
    /// Print next week's existing events as formatted text
    Formatted,
    /// Plan next week and replace the target calendar's events with it
    Generate,
    /// Delete next week's events from the target calendar
    Delete {
        /// Only delete events whose title starts with this prefix
        #[arg(short, long)]
        prefix: Option<String>,

        /// Delete without asking for confirmation
        #[arg(short, long)]
        yes: bool,

        /// Calendar to delete from (defaults to target_calendar from config)
        #[arg(short, long)]
        calendar: Option<String>,
    },
    /// Extract planned events from a schedule text file ("-" for stdin)
    Extract { file: PathBuf },
    /// Print an assistant's prompt template
    Prompt { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Auth => commands::auth::run().await,
        Commands::Calendars => commands::calendars::run().await,
        Commands::Plan => commands::plan::run(&orchestrator()?).await,
        Commands::Formatted => commands::formatted::run(&orchestrator()?, next_week()).await,
        Commands::Generate => commands::generate::run(&orchestrator()?, next_week()).await,
        Commands::Delete {
            prefix,
            yes,
            calendar,
        } => {
            let mut config = CoachConfig::load()?;
            if let Some(calendar) = calendar {
                config.target_calendar = calendar;
            }
            let orchestrator = orchestrator_with(config)?;
            commands::delete::run(&orchestrator, next_week(), prefix.as_deref(), yes).await
        }
        Commands::Extract { file } => commands::extract::run(&file),
        Commands::Prompt { name } => commands::prompt::run(&name),
    }
}

fn next_week() -> DateRange {
    DateRange::next_week(Local::now().date_naive())
}

fn orchestrator() -> Result<Orchestrator> {
    orchestrator_with(CoachConfig::load()?)
}

fn orchestrator_with(config: CoachConfig) -> Result<Orchestrator> {
    let generator = GptClient::from_config(&config)?;
    let calendar = GoogleCalendar::connect()?;
    Ok(Orchestrator::new(Arc::new(generator), Arc::new(calendar), config))
}
