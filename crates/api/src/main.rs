use recordkeep_api::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    recordkeep_observability::init();

    let config = AppConfig::from_env()?;
    let (app, services) = recordkeep_api::app::build(&config).await?;

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await?;

    services.shutdown().await;
    tracing::info!("stopped");
    Ok(())
}
