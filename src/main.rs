use color_eyre::{eyre::WrapErr, Result};
use opensprinkler2mqtt::shutdown::spawn_signal_handler;
use opensprinkler2mqtt::{BridgeConfig, BridgeServer};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = BridgeConfig::load()
        .await
        .wrap_err("Failed to load configuration")?;
    info!(
        opensprinkler = %config.opensprinkler_url,
        mqtt = %config.mqtt_url,
        prefix = %config.mqtt_prefix,
        interval = ?config.poll_interval,
        "Running..."
    );

    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    BridgeServer::new(config)
        .run(cancel)
        .await
        .wrap_err("Bridge failed")
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}
