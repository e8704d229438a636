use std::path::Path;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gimnasia_admin::config::AppConfig;
use gimnasia_admin::db::{create_pool, Repository};
use gimnasia_admin::error::Result;
use gimnasia_admin::web;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gimnasia_admin=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    tracing::info!("Starting gimnasia admin server on port {}", config.port);
    tracing::info!("Database at {}", config.database_path);

    let pool = create_pool(Path::new(&config.database_path)).await?;
    let repo = Repository::new(pool);

    println!("Access the site at http://localhost:{}", config.port);

    web::start_server(config, repo).await?;
    Ok(())
}
