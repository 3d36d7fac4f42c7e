use anyhow::Context;
use deployment::Deployment;
use server::{DeploymentImpl, routes};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,server=info,services=info,db=info,local_deployment=info")
    });
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let deployment = DeploymentImpl::new()
        .await
        .context("failed to initialise deployment")?;
    let addr = deployment.config().bind_addr();
    let app = routes::router(deployment);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
