use std::sync::Arc;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use cycle_tracker_backend::{
    app,
    config::Config,
    service::CycleService,
    store::{MemoryStore, PgStore, RecordStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url, config.max_connections)
                .await
                .context("connecting to database")?;
            store.migrate().await.context("running migrations")?;
            tracing::info!("🗄️ Using Postgres store");
            Arc::new(store)
        }
        None => {
            tracing::warn!("⚠️ DATABASE_URL not set, records are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let app = app(Arc::new(CycleService::new(store)));

    tracing::info!("🧠 Server running at {}", config.bind_addr);

    axum::serve(
        tokio::net::TcpListener::bind(config.bind_addr).await?,
        app.into_make_service(),
    )
    .await?;

    Ok(())
}
