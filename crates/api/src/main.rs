use std::sync::Arc;

use anyhow::Context;

use stocktrack_api::config::AppConfig;
use stocktrack_auth::SessionStore;
use stocktrack_infra::{InMemoryGateway, InventoryGateway, InventoryService, PostgresGateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stocktrack_observability::init();

    let config = AppConfig::from_env();

    let gateway: Arc<dyn InventoryGateway> = match config.service.database_url.as_deref() {
        Some(url) => {
            let pg = PostgresGateway::connect(url, config.service.gateway_timeout)
                .await
                .context("failed to connect to postgres")?;
            pg.migrate().await.context("failed to apply schema")?;
            tracing::info!("using postgres gateway");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory only");
            Arc::new(InMemoryGateway::new())
        }
    };

    let service = Arc::new(InventoryService::new(gateway, config.service.clone()));
    let sessions = Arc::new(SessionStore::new(config.login.clone()));
    let app = stocktrack_api::app::build_app(service, sessions);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
