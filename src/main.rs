mod admin;
mod app;
mod auth;
mod catalog;
mod config;
mod error;
mod memory;
mod orders;
mod state;

use crate::{catalog::seed::seed_if_empty, config::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "grocery_delivery=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let (app_state, pool) = AppState::init(config).await?;

    if let Some(db) = &pool {
        if let Err(e) = sqlx::migrate!("./migrations").run(db).await {
            tracing::warn!(error = %e, "migration failed; continuing");
        }
    }

    if app_state.config.seed_catalog {
        seed_if_empty(app_state.products.as_ref()).await?;
    }

    app::serve(app::build_app(app_state)).await?;

    if let Some(db) = pool {
        db.close().await;
    }
    Ok(())
}
