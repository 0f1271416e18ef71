use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use blog_writer::{AppState, Config, Database, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blog_writer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let db = Database::new(&config.database_path).await?;

    let addr = config.bind_addr();
    let state = AppState::from_config(config, db)?;
    let app = routes::app(state);

    tracing::info!("Server running on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
