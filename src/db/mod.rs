pub mod models;
pub mod pool;
pub mod queries;

use sqlx::migrate::Migrator;

/// Schema migrations under `migrations/`, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!();
