use std::error::Error;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use teamdate_api::api::{self, AppState};
use teamdate_api::config::Config;
use teamdate_api::domain::repositories::Store;
use teamdate_api::infrastructure::repositories::{InMemoryStore, PostgresStore};
use teamdate_api::services::TeamCoordinator;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(database_url)
                .await?;

            let store = PostgresStore::new(pool);
            store.migrate().await?;
            tracing::info!("Database connected and migrated");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using an empty in-memory store");
            Arc::new(InMemoryStore::new())
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = AppState::new(TeamCoordinator::new(store), config.jwt_secret.as_str());
    let app = api::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
