use tradepost_core::config::PaginationConfig;
use tradepost_db::DbPool;

/// Shared handler state: the connection pool plus the immutable pagination
/// defaults handed to list endpoints.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
    pub pagination: PaginationConfig,
}
