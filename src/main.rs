use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sellout_hub::config::AppConfig;
use sellout_hub::create_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "sellout_hub=info,tower_http=info,sqlx=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    sqlx::migrate!().run(&config.database_pool).await?;

    let addr = config.server_address();
    tracing::info!("Starting sellout-hub server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, create_app(config)?).await?;

    Ok(())
}
