use time::UtcOffset;

mod app;
mod config;
mod error;
mod estimator;
mod images;
mod ledger;
mod meals;
mod state;
mod storage;
mod summary;

use crate::config::AppConfig;
use crate::state::AppState;

fn main() -> anyhow::Result<()> {
    // the local offset can only be read while the process is single-threaded
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(local_offset))
}

async fn run(local_offset: UtcOffset) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "meal_tracker=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env(local_offset)?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        utc_offset = %config.utc_offset,
        "starting meal tracker"
    );
    let (host, port) = (config.host.clone(), config.port);

    let app_state = AppState::init(config)?;
    app::serve(app::build_app(app_state), &host, port).await
}
