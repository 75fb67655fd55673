//! Database layer
//!
//! Database abstraction for serptrack. Supported backends:
//! - SQLite (default, for single-binary deployment)
//! - MySQL (for larger deployments)
//!
//! The driver is selected from configuration; the `DatabasePool` trait hides
//! the difference from the rest of the application, and each repository
//! dispatches on `pool.driver()` for backend-specific SQL.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
