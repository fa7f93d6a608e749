mod error;
mod handlers;
mod setup;
mod state;

use repurposer_core::PipelineConfig;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = PipelineConfig::from_env()?;

    let (services, router) = setup::initialize_app(config.clone()).await?;

    setup::server::start_server(&config, router, services.recovery).await?;

    Ok(())
}
