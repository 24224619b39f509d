use anyhow::Context;
use newsletter_api::{config::AppConfig, App};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // We have a different logging mechanism for production
    #[cfg(not(debug_assertions))]
    {
        newsletter_api::init_production_tracing()
    }
    #[cfg(debug_assertions)]
    {
        newsletter_api::init_dbg_tracing();
    }

    let config = AppConfig::load().context("failed to load the configuration")?;
    let app = App::build_from_config(config)
        .await
        .context("failed to start the application")?;
    info!("Health check: http://{}/health", app.local_addr()?);

    newsletter_api::serve(app, newsletter_api::shutdown_signal()).await?;

    Ok(())
}
