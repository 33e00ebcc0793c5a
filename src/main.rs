use std::path::PathBuf;

use clap::Parser;
use pulse_server::ServerConfig;
use pulse_store::Database;
use pulse_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser)]
#[command(name = "pulse", about = "Status record server with live aggregate streaming")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Record database path. Defaults to ~/.pulse/database/records.db.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Disable persisting warn+ logs to SQLite.
    #[arg(long)]
    no_log_db: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let telemetry = init_telemetry(TelemetryConfig {
        log_to_sqlite: !cli.no_log_db,
        ..Default::default()
    });

    tracing::info!("starting pulse");

    let db_path = cli
        .db_path
        .unwrap_or_else(|| pulse_home().join("database").join("records.db"));
    let db = Database::open(&db_path).expect("failed to open database");

    let config = ServerConfig {
        port: cli.port,
        ..Default::default()
    };
    let handle = pulse_server::start(config, db, telemetry.log_sink())
        .await
        .expect("failed to start server");

    tracing::info!(port = handle.port, "pulse ready");

    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");

    tracing::info!("shutting down");
}

fn pulse_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
        .join(".pulse")
}
