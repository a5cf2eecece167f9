use anyhow::Result;
use kii_bridge::{
    app::BridgeApp,
    config,
    infrastructure::{directories, logging},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config.logging, &paths.logs_dir)?;

    let app = BridgeApp::initialize(config, paths)?;
    app.run().await
}
