use std::process::ExitCode;

use clap::{Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use tvplan_data::api::{TvPlanClient, TvPlanHttpClient};
use tvplan_data::app::{App, FetchChannelsResult, GenerateOptionsResult, StubDataResult};
use tvplan_data::config::Config;
use tvplan_data::error::TvPlanError;
use tvplan_data::output::{ConsoleOutput, JsonOutput, OutputMode};
use tvplan_data::store::Store;

#[derive(Parser)]
#[command(name = "tvplan-data")]
#[command(about = "Fetch TV-Plan data and generate the TV-guide plugin settings")]
#[command(version, author)]
struct Cli {
    /// Print a JSON summary instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Fetch countries and per-country channel lists into the data directory")]
    Fetch,
    #[command(about = "Generate data/options.yml from the cached countries and channels")]
    Options,
    #[command(about = "Fetch program stub data for the channels in TEST_CHANNEL_IDS")]
    Stub,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<TvPlanError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TvPlanError) -> u8 {
    match error {
        TvPlanError::MissingApiKey
        | TvPlanError::MissingTestChannelIds
        | TvPlanError::EmptyTestChannelIds
        | TvPlanError::DataNotFound(_) => 2,
        TvPlanError::ApiHttp(_) | TvPlanError::ApiStatus { .. } => 3,
        TvPlanError::RateLimited => 4,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let config = Config::from_env();
    let store = Store::new(&config).into_diagnostic()?;

    match cli.command {
        Commands::Fetch => {
            let client = TvPlanHttpClient::new(&config).into_diagnostic()?;
            let app = App::new(store, client, config);
            match output_mode {
                OutputMode::Json => {
                    let result = app.fetch_channels(&JsonOutput).into_diagnostic()?;
                    JsonOutput::print_fetch(&result).into_diagnostic()?;
                }
                OutputMode::Human => {
                    banner("TV Plan Data Fetcher");
                    let result = app.fetch_channels(&ConsoleOutput).into_diagnostic()?;
                    print_fetch_summary(&result);
                }
            }
            Ok(())
        }
        Commands::Options => {
            let app = App::new(store, NopClient, config);
            match output_mode {
                OutputMode::Json => {
                    let result = app.generate_options(&JsonOutput).into_diagnostic()?;
                    JsonOutput::print_options(&result).into_diagnostic()?;
                }
                OutputMode::Human => {
                    banner("TV Plan Options Generator");
                    let result = app.generate_options(&ConsoleOutput).into_diagnostic()?;
                    print_options_summary(&result);
                }
            }
            Ok(())
        }
        Commands::Stub => {
            let client = TvPlanHttpClient::new(&config).into_diagnostic()?;
            let app = App::new(store, client, config);
            match output_mode {
                OutputMode::Json => {
                    let result = app.fetch_stub_data(&JsonOutput).into_diagnostic()?;
                    JsonOutput::print_stub(&result).into_diagnostic()?;
                }
                OutputMode::Human => {
                    banner("TV Plan Test Channels Fetcher");
                    let result = app.fetch_stub_data(&ConsoleOutput).into_diagnostic()?;
                    print_stub_summary(&result);
                }
            }
            Ok(())
        }
    }
}

/// Placeholder client for the local-only `options` command; it never makes
/// a network call.
struct NopClient;

impl TvPlanClient for NopClient {
    fn fetch_countries(&self) -> Result<Vec<tvplan_data::domain::Country>, TvPlanError> {
        Err(TvPlanError::ApiHttp("client not configured".to_string()))
    }

    fn fetch_channels(
        &self,
        _country_id: &str,
    ) -> Result<Vec<tvplan_data::domain::Channel>, TvPlanError> {
        Err(TvPlanError::ApiHttp("client not configured".to_string()))
    }

    fn fetch_programs(&self, _channel_id: &str) -> Result<serde_json::Value, TvPlanError> {
        Err(TvPlanError::ApiHttp("client not configured".to_string()))
    }
}

fn banner(title: &str) {
    println!("{}", "=".repeat(50));
    println!("{title}");
    println!("{}", "=".repeat(50));
}

fn print_fetch_summary(result: &FetchChannelsResult) {
    let fetched = result
        .items
        .iter()
        .filter(|item| item.action == "fetched")
        .count();
    let skipped = result.items.len() - fetched;

    banner("Fetch complete!");
    println!("Countries: {} ({})", result.countries, result.countries_source);
    println!("Fetched: {fetched}");
    println!("Skipped: {skipped}");
    if result.rate_limited {
        println!("Rate limit reached. Run the command again later to continue.");
    }
}

fn print_options_summary(result: &GenerateOptionsResult) {
    banner("SUMMARY");
    println!("Total countries: {}", result.countries);
    println!("Countries with channels: {}", result.countries_with_channels);
    println!("Total channels: {}", result.channel_count);
    if !result.unknown_country_ids.is_empty() {
        println!(
            "Unknown country ids skipped: {}",
            result.unknown_country_ids.join(", ")
        );
    }
    println!("Output: {}", result.output_path);

    if !result.sample.is_empty() {
        println!("\nSample channels (first {}):", result.sample.len());
        for (index, label) in result.sample.iter().enumerate() {
            println!("  {}. {label}", index + 1);
        }
    }
}

fn print_stub_summary(result: &StubDataResult) {
    banner("SUMMARY");
    println!("Total channels: {}", result.requested);
    println!("Successfully fetched: {}", result.fetched.len());
    println!("Failed: {}", result.failed.len());
    if result.rate_limited {
        println!("Rate limit reached. Run the command again later to continue.");
    }
}
