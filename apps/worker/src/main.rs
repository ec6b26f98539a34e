mod cli;
mod config;
mod main_lib;
mod scheduler;

use config::Config;
use main_lib::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing(config.log_format);
    cli::run(config).await
}
