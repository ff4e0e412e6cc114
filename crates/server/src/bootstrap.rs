use axum::routing::{get, post};
use axum::Router;
use thiserror::Error;
use tracing::info;

use tradepost_core::config::{AppConfig, ConfigError, LoadOptions};
use tradepost_db::{connect_with_settings, migrations, DbPool};

use crate::state::AppState;
use crate::{auth, offers, orders, profiles, reviews, stats};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    Ok(Application { config, db_pool })
}

/// The full API surface. Trailing slashes are part of the route contract.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .route("/api/registration/", post(auth::registration))
        .route("/api/login/", post(auth::login))
        .route("/api/offers/", get(offers::list).post(offers::create))
        .route(
            "/api/offers/{id}/",
            get(offers::detail).patch(offers::update).delete(offers::destroy),
        )
        .route("/api/offerdetails/{id}/", get(offers::variant_detail))
        .route("/api/orders/", get(orders::list).post(orders::create))
        .route(
            "/api/orders/{order_id}/",
            get(orders::detail).patch(orders::update_status).delete(orders::destroy),
        )
        .route("/api/order-count/{business_user_id}/", get(orders::in_progress_count))
        .route("/api/completed-order-count/{business_user_id}/", get(orders::completed_count))
        .route("/api/reviews/", get(reviews::list).post(reviews::create))
        .route(
            "/api/reviews/{id}/",
            get(reviews::detail).patch(reviews::update).delete(reviews::destroy),
        )
        .route("/api/base-info/", get(stats::base_info))
        .route("/api/profile/{pk}/", get(profiles::detail).patch(profiles::update))
        .route("/api/profiles/business/", get(profiles::business_list))
        .route("/api/profiles/business/{pk}/", get(profiles::detail).patch(profiles::update))
        .route("/api/profiles/customer/", get(profiles::customer_list))
        .route("/api/profiles/customer/{pk}/", get(profiles::detail).patch(profiles::update))
        .with_state(state)
}
