use std::path::Path;
use todo_api::{routes, AppState, Config, Database};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    // Initialize database
    if let Some(parent) = Path::new(&config.database_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::new(&config.database_path)?;
    tracing::info!("Database ready at {}", config.database_path);

    let app = routes::router(AppState::new(db, &config));

    // Start server
    tracing::info!(
        "Starting server on {} (api key limit {}, expiration {} min)",
        config.server_address,
        config.api_keys.api_key_limit,
        config.api_keys.expiration_minutes
    );

    let listener = tokio::net::TcpListener::bind(config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
