use std::sync::Arc;

use link_feed::{api, config::Config, database, schema};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> link_feed::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        database = %config.database.display(),
        variant = ?config.variant,
        ownership = ?config.ownership,
        "starting"
    );

    let issuer = config.issuer();

    let server = Arc::new(api::ServerInner {
        db :     Arc::new(database::Db::new(&config.database)?),
        schema : schema::build(config.variant, config.ownership, issuer.clone()),
        issuer,
    });

    api::serve(server, &config.addr).await
}
