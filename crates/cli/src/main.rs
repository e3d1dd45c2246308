use crate::error::CliError;
use crate::output::PreviewTable;
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Parser;
use commands::Commands;
use connectors::directory::client::DirectoryClient;
use connectors::metrics::client::{MetricsApi, parse_target_date};
use connectors::metrics::fixture::FixtureMetrics;
use connectors::metrics::provider::MetricsProvider;
use model::metric::DailyMetrics;
use model::participant::{Participant, ParticipantError, Watermark};
use std::sync::Arc;
use sync_engine::archive::FsPayloadArchive;
use sync_engine::config::{SourceMode, SyncConfig, directory_from_env, vendor_from_env};
use sync_engine::deadletter::JsonlDeadLetter;
use sync_engine::executor::{PARTICIPANT_COLUMN, SyncExecutor, SyncExecutorParams};
use sync_engine::report::SyncReport;
use sync_engine::sink::parquet::ParquetDataset;
use sync_engine::transform::flatten::{FlattenOptions, flatten};
use sync_engine::transform::normalize::normalize_record;
use sync_engine::watermark::{MemoryWatermarkStore, WatermarkStore};
use tracing::{Level, info, warn};

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "wearsync", version = "0.1.0", about = "Wearable metrics sync engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            participant,
            email,
            timezone,
            start_date,
            target_date,
            dry_run,
            fixture,
            data_root,
            output,
        } => {
            let mut config = engine_config()?;
            if let Some(root) = data_root {
                config = config.with_data_root(root);
            }
            if fixture {
                config = config.with_source(SourceMode::Fixture);
            }
            config = config.with_dry_run(dry_run);

            let target = resolve_target_date(target_date)?;
            let directory = directory_client()?;
            let subject = resolve_participant(
                &config,
                directory.as_deref(),
                &participant,
                email,
                timezone,
                start_date,
            )
            .await?;

            info!(
                participant_id = %subject.id,
                target = %target,
                dry_run,
                "Starting participant sync"
            );
            let report = run_sync(&config, directory, &subject, target).await?;

            match output {
                Some(path) => output::write_report(&report, path).await?,
                None => output::print_report(&report).await?,
            }
        }
        Commands::Fetch {
            email,
            date,
            fixture,
            output,
        } => {
            let date = parse_target_date(&date)?;
            let source = if fixture {
                SourceMode::Fixture
            } else {
                SourceMode::Api
            };
            let payload = build_provider(source)?.fetch(&email, date).await?;
            let payload_json =
                serde_json::to_string_pretty(&payload).map_err(CliError::JsonSerialize)?;

            match output {
                Some(path) => tokio::fs::write(path, payload_json).await?,
                None => println!("{payload_json}"),
            }
        }
        Commands::Preview {
            file,
            timezone,
            participant,
        } => {
            preview_payload(&file, timezone, participant).await?;
        }
        Commands::Watermark { participant, json } => {
            show_watermark(&participant, json).await?;
        }
    }

    Ok(())
}

/// Engine settings come from `SYNC_*` environment variables when set and
/// fall back to defaults otherwise; command flags override afterwards.
fn engine_config() -> Result<SyncConfig, CliError> {
    if std::env::var("SYNC_DATA_ROOT").is_ok() {
        Ok(SyncConfig::from_env()?)
    } else {
        Ok(SyncConfig::default())
    }
}

fn resolve_target_date(raw: Option<String>) -> Result<NaiveDate, CliError> {
    match raw {
        Some(raw) => Ok(parse_target_date(&raw)?),
        None => Ok(Utc::now().date_naive()),
    }
}

fn directory_client() -> Result<Option<Arc<DirectoryClient>>, CliError> {
    Ok(directory_from_env()?.map(|config| Arc::new(DirectoryClient::new(config))))
}

fn build_provider(source: SourceMode) -> Result<Arc<dyn MetricsProvider>, CliError> {
    match source {
        SourceMode::Fixture => Ok(Arc::new(FixtureMetrics::new())),
        SourceMode::Api => Ok(Arc::new(MetricsApi::new(vendor_from_env()?))),
    }
}

/// Loads the participant from the directory when one is configured,
/// otherwise builds it from command flags. Explicit flags win over
/// directory values either way.
async fn resolve_participant(
    config: &SyncConfig,
    directory: Option<&DirectoryClient>,
    participant_id: &str,
    email: Option<String>,
    timezone: Option<String>,
    start_date: Option<String>,
) -> Result<Participant, CliError> {
    let default_timezone = config.default_timezone.name();

    if let Some(client) = directory {
        let record = client.get_participant(participant_id).await?;
        let mut subject = record.to_participant(default_timezone)?;
        if let Some(email) = email {
            subject.email = email;
        }
        if let Some(raw) = timezone {
            subject.timezone = parse_timezone(&raw)?;
        }
        if let Some(raw) = start_date {
            subject.watermark.start_date = parse_target_date(&raw)?;
        }
        return Ok(subject);
    }

    let email = email.ok_or(CliError::MissingFlag("--email"))?;
    let start = start_date.ok_or(CliError::MissingFlag("--start-date"))?;
    let timezone = timezone.unwrap_or_else(|| default_timezone.to_string());
    let watermark = Watermark::new(parse_target_date(&start)?);
    Ok(Participant::new(participant_id, email, &timezone, watermark)?)
}

fn parse_timezone(raw: &str) -> Result<Tz, CliError> {
    raw.parse().map_err(|_| {
        CliError::Participant(ParticipantError::InvalidTimezone(raw.to_string()))
    })
}

async fn run_sync(
    config: &SyncConfig,
    directory: Option<Arc<DirectoryClient>>,
    subject: &Participant,
    target: NaiveDate,
) -> Result<SyncReport, CliError> {
    let provider = build_provider(config.source)?;
    let watermarks: Arc<dyn WatermarkStore> = match directory {
        Some(client) => client,
        None => {
            warn!("No participant directory configured, watermark updates stay in memory");
            Arc::new(MemoryWatermarkStore::new())
        }
    };

    let executor = SyncExecutor::new(SyncExecutorParams {
        provider,
        sink: Arc::new(ParquetDataset::new(
            config.data_root.clone(),
            config.database.clone(),
        )),
        archive: Arc::new(FsPayloadArchive::new(
            config.data_root.clone(),
            config.database.clone(),
        )),
        watermarks,
        dead_letters: Arc::new(JsonlDeadLetter::new(config.dead_letter_path.clone())),
        config: config.clone(),
    });

    Ok(executor.sync_participant(subject, target).await?)
}

/// Runs a local payload file through the flatten and normalize pipeline
/// and prints the shape of every table it would produce.
async fn preview_payload(
    path: &str,
    timezone: Option<String>,
    participant: Option<String>,
) -> Result<(), CliError> {
    let source = tokio::fs::read_to_string(path).await?;
    let payload: DailyMetrics = serde_json::from_str(&source)?;
    let timezone = timezone.map(|raw| parse_timezone(&raw)).transpose()?;

    let mut tables = Vec::new();
    for entry in &payload.metric_data {
        if entry.metric_kind().is_none() {
            info!(metric = %entry.kind, "Metric type not whitelisted, skipping");
            continue;
        }
        for piece in entry.explode() {
            let Some(kind) = piece.metric_kind() else {
                continue;
            };
            let value = serde_json::to_value(&piece).map_err(CliError::JsonSerialize)?;
            let mut options = FlattenOptions::new().with_fill(true);
            if let Some(id) = &participant {
                options =
                    options.with_inject(PARTICIPANT_COLUMN, serde_json::Value::String(id.clone()));
            }
            let mut records = flatten(&value, &options);
            records = normalize_record(&records, timezone.as_ref());
            records.drop_empty_columns();
            tables.push(PreviewTable {
                table: kind.name().to_string(),
                rows: records.row_count(),
                columns: records.column_names().cloned().collect(),
            });
        }
    }

    output::print_preview(&tables);
    Ok(())
}

async fn show_watermark(participant_id: &str, as_json: bool) -> Result<(), CliError> {
    let Some(client) = directory_client()? else {
        return Err(CliError::MissingDirectory);
    };
    let record = client.get_participant(participant_id).await?;
    let watermark = record.watermark()?;

    if as_json {
        let json = serde_json::to_string_pretty(&watermark).map_err(CliError::JsonSerialize)?;
        println!("{json}");
    } else {
        output::print_watermark_table(participant_id, &watermark);
    }

    Ok(())
}
