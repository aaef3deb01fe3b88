use std::sync::Arc;

use clap::Parser;

use aduan_core::config::Config;
use aduan_core::provider::TextModel;
use aduan_llm::{FailoverClient, FileQuotaStore, GeminiProvider, QuotaLedger};
use aduan_server::{AppState, ServerConfig};
use aduan_store::{Database, EmergencyRepo, ReportRepo, SessionHasher};
use aduan_telemetry::{init_telemetry, TelemetryConfig};
use aduan_triage::{EngineConfig, TriageEngine};

/// Conversational triage server for the campus incident-reporting portal.
#[derive(Parser, Debug)]
#[command(name = "aduan", about = "PPKS conversational triage server")]
struct Cli {
    /// Port to bind (0 for auto-assign). Overrides ADUAN_PORT.
    #[arg(long)]
    port: Option<u16>,

    /// Directory for the database, quota snapshot, and salt file.
    /// Overrides ADUAN_DATA_DIR.
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    std::fs::create_dir_all(&config.data_dir).expect("Failed to create data directory");

    let _telemetry = init_telemetry(TelemetryConfig {
        log_db_path: config.data_dir.join("logs.db"),
        ..TelemetryConfig::default()
    });

    tracing::info!("Starting aduan triage server");

    let db = Database::open(&config.db_path()).expect("Failed to open database");
    tracing::info!(path = %config.db_path().display(), "Database opened");

    let hasher = Arc::new(
        SessionHasher::open(&config.salt_path()).expect("Failed to open emergency salt file"),
    );

    if !config.has_any_credential() {
        tracing::warn!("No LLM credential configured; replies will use canned fallbacks");
    }

    let ledger = Arc::new(QuotaLedger::new(
        config.primary.as_ref().map(|c| c.daily_limit),
        config.secondary.as_ref().map(|c| c.daily_limit),
        Box::new(FileQuotaStore::new(config.quota_path())),
    ));

    let primary = config
        .primary
        .as_ref()
        .map(|c| Arc::new(GeminiProvider::from_credential(c)) as Arc<dyn TextModel>);
    let secondary = config
        .secondary
        .as_ref()
        .map(|c| Arc::new(GeminiProvider::from_credential(c)) as Arc<dyn TextModel>);

    let client = Arc::new(FailoverClient::new(primary, secondary, ledger));

    let retention = chrono::Duration::hours(config.emergency_retention_hours);
    let engine = Arc::new(TriageEngine::new(
        Arc::clone(&client),
        db.clone(),
        Arc::clone(&hasher),
        EngineConfig {
            emergency_retention: retention,
            ..EngineConfig::default()
        },
    ));

    let state = AppState {
        engine,
        client,
        reports: ReportRepo::new(db.clone()),
        emergencies: EmergencyRepo::new(db.clone(), hasher, retention),
        db,
    };

    let server_config = ServerConfig {
        port: config.port,
        ..ServerConfig::default()
    };
    let handle = aduan_server::start(server_config, state)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "Aduan server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}
