use tracing::info;
use tracing_subscriber::EnvFilter;

use bomber_arena::config::SimConfig;
use bomber_arena::game::session;

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging (RUST_LOG overrides the default level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Bomber Arena v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = SimConfig::load_or_default();
    config.validate()?;
    info!("Configuration loaded: {}", serde_json::to_string(&config)?);

    let result = session::run_match(&config)?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
