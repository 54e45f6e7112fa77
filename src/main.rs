//! CLI entry point for the GA4 deep-dive tool.
//!
//! Provides subcommands for running a scored report on one property and for
//! listing the configured properties.

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use ga_deep_dive::analyzers::analyzer::run_deep_dive;
use ga_deep_dive::config::ReportConfig;
use ga_deep_dive::fetch::{BasicClient, auth::ApiKey};
use ga_deep_dive::infra::ga4::Ga4Client;
use ga_deep_dive::infra::keys::{
    TOKEN_ENV, TOKEN_PATH_ENV, default_token_path, resolve_access_token,
};
use ga_deep_dive::output::{append_record, print_json, render_text};
use ga_deep_dive::period::MAX_DAYS;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const USER_AGENT: &str = concat!("ga_deep_dive/", env!("CARGO_PKG_VERSION"));

#[derive(Parser)]
#[command(name = "ga_deep_dive")]
#[command(about = "Score a GA4 property's health and suggest what to fix", long_about = None)]
struct Cli {
    /// JSON config with property names, content rules and thresholds
    #[arg(long, global = true, env = "GA_DEEP_DIVE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every report section for a property and print the scored result
    Report {
        /// Configured property name or numeric GA4 property id
        #[arg(value_name = "PROPERTY")]
        property: String,

        /// Length of the report window in days
        #[arg(
            short,
            long,
            default_value_t = 30,
            value_parser = clap::value_parser!(u32).range(1..=MAX_DAYS as i64)
        )]
        days: u32,

        #[arg(short, long, value_enum, default_value_t = Format::Text)]
        format: Format,

        /// CSV file to append the score history row to
        #[arg(long)]
        history: Option<String>,
    },
    /// List configured properties
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ga_deep_dive.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ga_deep_dive.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = ReportConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Report {
            property,
            days,
            format,
            history,
        } => {
            let property_id = config.resolve_property(&property)?;

            let token_path = default_token_path(
                std::env::var(TOKEN_PATH_ENV).ok(),
                std::env::var_os("HOME").map(PathBuf::from),
            );
            let token = resolve_access_token(std::env::var(TOKEN_ENV).ok(), &token_path)?;
            let base = BasicClient::with_user_agent(USER_AGENT)?;
            let http = ApiKey::bearer(base, &token)?;
            let client = Ga4Client::new(
                http,
                &config.api_base_url,
                &property_id,
                config.fetch_timeout(),
            );

            let today = Utc::now().date_naive();
            let report =
                run_deep_dive(&client, &config, &property, &property_id, days, today).await;

            match format {
                Format::Text => print!("{}", render_text(&report)?),
                Format::Json => print_json(&report)?,
            }

            if let Some(path) = history {
                append_record(&path, &report.history_row())?;
                info!(path = %path, overall = report.overall, "Score history updated");
            }
        }
        Commands::List => {
            if config.properties.is_empty() {
                info!("No properties configured; pass a numeric property id to `report`");
            }
            for (name, id) in config.properties() {
                println!("{name:<15} {id}");
            }
        }
    }

    Ok(())
}
