/// TaskFlow server entry point
///
/// Loads `.env` when present, starts logging, reads `TASKFLOW_*`
/// configuration from the environment and serves the API.

use taskflow::{
    config::Config,
    server::{init_tracing, start_server},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` may set RUST_LOG, so load it before the subscriber reads it
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env();

    start_server(config).await
}
