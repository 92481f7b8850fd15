use voting_api::{build_rocket, config::Config, routes::AppState, store, utils::init_tracing};
use tracing::info;

#[rocket::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load()?;
    info!(
        backend = %config.backend,
        table = ?config.table_name,
        policy = ?config.unknown_option,
        timeout_secs = config.store_timeout_secs,
        "🚀 Starting voting API"
    );

    let store = store::open(&config).await?;
    let state = AppState::new(store, config.unknown_option, config.store_timeout());

    let _rocket = build_rocket(state).launch().await?;
    Ok(())
}
