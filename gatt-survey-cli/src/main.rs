//! BLE GATT survey tool
//!
//! Scans for devices advertising a given name, connects to each one and
//! prints its services and characteristics.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use gatt_survey::{AdapterConfig, BtleRadio, NameMatch, Progress, SurveyConfig, report};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "gatt-survey")]
#[command(about = "List the GATT services of nearby BLE devices with a given name")]
struct Cli {
    /// Advertised device name to look for
    #[arg(short, long, default_value = gatt_survey::DEFAULT_IDENTIFIER)]
    identifier: String,
    /// Scan duration in seconds
    #[arg(short, long, default_value_t = gatt_survey::DEFAULT_SCAN_DURATION.as_secs())]
    scan_secs: u64,
    /// How device names are compared with the identifier
    #[arg(short = 'm', long = "match", value_enum, default_value_t = MatchArg::Exact)]
    name_match: MatchArg,
    /// Give up on a connect attempt after this many seconds
    #[arg(long, default_value = "10")]
    connect_timeout_secs: u64,
    /// Only scan for devices advertising this service UUID (repeatable)
    #[arg(long = "service")]
    services: Vec<Uuid>,
    /// Print one JSON document per device instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchArg {
    Exact,
    IgnoreCase,
    Prefix,
}

impl From<MatchArg> for NameMatch {
    fn from(arg: MatchArg) -> Self {
        match arg {
            MatchArg::Exact => NameMatch::Exact,
            MatchArg::IgnoreCase => NameMatch::IgnoreCase,
            MatchArg::Prefix => NameMatch::Prefix,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let adapter_config = AdapterConfig::default()
        .with_connect_timeout(Duration::from_secs(cli.connect_timeout_secs))
        .with_service_filter(cli.services);
    let config = SurveyConfig::new()
        .with_identifier(cli.identifier)
        .with_scan_duration(Duration::from_secs(cli.scan_secs))
        .with_name_match(cli.name_match.into());

    let radio = match BtleRadio::new(adapter_config).await {
        Ok(radio) => radio,
        Err(e) => {
            eprintln!("Failed to open Bluetooth: {e}");
            return ExitCode::FAILURE;
        }
    };

    let json = cli.json;
    let result = gatt_survey::survey(&radio, &config, |progress| match progress {
        Progress::TargetsFound(count) => {
            if !json {
                println!("\n{}\n", report::targets_found(count, &config.identifier));
            }
        }
        Progress::Inspected(inspection) if json => match report::render_json(inspection) {
            Ok(doc) => println!("{doc}"),
            Err(e) => eprintln!("Failed to encode {}: {e}", inspection.address),
        },
        Progress::Inspected(inspection) => print!("{}", report::render(inspection)),
    })
    .await;

    match result {
        Ok(summary) => {
            tracing::info!(
                "inspected {} device(s), {} with errors",
                summary.inspections.len(),
                summary.devices_with_errors()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
