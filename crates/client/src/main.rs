//! Encounter tracker client binary.
//!
//! Hosts an authoritative encounter in-process and plays a short scripted
//! fight through it: a game master opens combat, a player drives their hero
//! both directly and through the relay, and every event is printed as it
//! arrives.
//!
//! ```bash
//! RUST_LOG=runtime=debug cargo run -p encounter-client
//! ```

mod script;

use anyhow::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use encounter_runtime::RuntimeConfig;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = RuntimeConfig::from_env();
    setup_logging()?;

    tracing::info!(
        skip_defeated = config.settings.skip_defeated,
        turn_time = config.settings.turn_time,
        "Starting encounter client"
    );

    script::run(config).await?;

    tracing::info!("Client shutdown complete");
    Ok(())
}

/// Logs to a file under the platform cache directory, keeping stdout for the
/// tracker output.
fn setup_logging() -> Result<()> {
    let log_dir = directories::ProjectDirs::from("", "", "encounter")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("encounter").join("logs"));
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "client.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    // Keep the file writer alive for the whole process.
    std::mem::forget(guard);

    tracing::info!("Log file: {}/client.log", log_dir.display());
    Ok(())
}
