use rover_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};
use thiserror::Error;
use uuid::Uuid;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_MIN_CONNECTIONS: u32 = 1;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

// Path relative to crates/rover-db/Cargo.toml; resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            min_connections: DEFAULT_MIN_CONNECTIONS,
            acquire_timeout_secs: DEFAULT_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_connections: read_u32("ROVER_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            min_connections: read_u32("ROVER_DB_MIN_CONNECTIONS", DEFAULT_MIN_CONNECTIONS),
            acquire_timeout_secs: read_u64(
                "ROVER_DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            ),
        }
    }

    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
    #[error("record not found")]
    NotFound,
    #[error("bug report {id}: status cannot move from '{from}' to '{to}'")]
    InvalidBugTransition { id: Uuid, from: String, to: String },
    #[error("product {0} is not a palette")]
    NotAPalette(Uuid),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connect to a Postgres pool using explicit URL and config.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the connection cannot be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await
}

/// Connect to a Postgres pool, reading `DATABASE_URL` and pool settings from env.
///
/// # Errors
///
/// Returns [`DbError::MissingDatabaseUrl`] if `DATABASE_URL` is unset, or
/// [`DbError::Sqlx`] if the connection cannot be established.
pub async fn connect_pool_from_env() -> Result<PgPool, DbError> {
    let database_url = env::var("DATABASE_URL").map_err(|_| DbError::MissingDatabaseUrl)?;
    let config = PoolConfig::from_env();
    connect_pool(&database_url, config)
        .await
        .map_err(DbError::from)
}

/// Run all pending migrations against the pool.
///
/// Returns the number of migrations that were applied.
///
/// # Errors
///
/// Returns [`sqlx::migrate::MigrateError`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, sqlx::migrate::MigrateError> {
    // Count applied migrations before running. The _sqlx_migrations table may not
    // exist yet on a fresh database; treat absence as zero applied.
    let applied_before: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    MIGRATOR.run(pool).await?;

    let applied_after: i64 =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = true")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let delta = (applied_after - applied_before).max(0);
    Ok(usize::try_from(delta).unwrap_or(0))
}

/// Send a `SELECT 1` to verify the pool has a live connection.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}

/// Run a full health check: ping the pool and return a typed error on failure.
///
/// # Errors
///
/// Returns [`DbError`] if the ping fails.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    ping(pool).await?;
    Ok(())
}

fn read_u32(var: &str, default: u32) -> u32 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

fn read_u64(var: &str, default: u64) -> u64 {
    env::var(var)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}


pub mod action_history;
pub mod auth;
pub mod bug_reports;
pub mod gebietsleiter;
pub mod markets;
pub mod preorders;
pub mod products;
pub mod seed;
pub mod sessions;
pub mod waves;

pub use action_history::{
    delete_action_entry, list_action_history, record_action, ActionHistoryFilters,
    ActionHistoryRow, NewActionEntry,
};
pub use auth::{hash_password, token_digest, verify_password};
pub use bug_reports::{
    create_bug_report, get_bug_report, list_bug_reports, transition_bug_status, BugReportRow,
    NewBugReport,
};
pub use gebietsleiter::{
    create_gebietsleiter, delete_gebietsleiter, get_credentials_by_username, get_gebietsleiter,
    list_gebietsleiter, update_gebietsleiter, update_password, CredentialRow, GebietsleiterRow,
    GebietsleiterUpdate, NewGebietsleiter,
};
pub use markets::{
    create_market, delete_market, get_market, list_markets, record_visit, update_market,
    upsert_markets, MarketFilters, MarketRow, MarketUpdate, MarketUpsert, NewMarket,
};
pub use preorders::{
    create_preorder, delete_preorder, list_preorders, NewPreorder, PreorderFilters, PreorderRow,
};
pub use products::{
    create_product, delete_product, get_palette_entries, get_product, list_products,
    replace_department_products, replace_palette_entries, update_product, ImportedProduct,
    NewPaletteEntry, NewProduct, PaletteEntryRow, ProductFilters, ProductRow, ProductUpdate,
};
pub use seed::{seed_reference_data, SeedSummary};
pub use sessions::{
    create_session, delete_expired_sessions, delete_session, resolve_session, SessionRow,
};
pub use waves::{
    create_wave, delete_wave, get_wave, list_chain_averages, list_wave_dashboard,
    list_wave_participants, list_waves, record_wave_entry, update_wave, ChainAverageFilters,
    ChainAverageRow, NewWave, NewWaveParticipant, WaveDashboardFilters, WaveDashboardRow,
    WaveEntryRow, WaveParticipantRow, WaveRow, WaveUpdate,
};
