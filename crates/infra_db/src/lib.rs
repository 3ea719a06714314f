//! PostgreSQL persistence for the purchase ledger
//!
//! This crate implements the domain's store ports over PostgreSQL using
//! SQLx: [`PgLedgerStore`] for purchases, payments, transitions, and
//! vouchers, and [`PgProductCatalog`] for the read-only product slice.
//!
//! # Concurrency
//!
//! Statuses are derived data. The settlement critical section lives in
//! `PgLedgerStore::commit_settlement`, which locks the purchase and payment
//! rows `FOR UPDATE` inside one transaction; all other writes are
//! single-statement compare-and-sets.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, PgLedgerStore, create_pool, run_migrations};
//!
//! let pool = create_pool(DatabaseConfig::new(url)).await?;
//! run_migrations(&pool).await?;
//! let store = PgLedgerStore::new(pool);
//! ```

pub mod catalog;
pub mod codec;
pub mod error;
pub mod pool;
pub mod store;

pub use catalog::PgProductCatalog;
pub use error::DatabaseError;
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
pub use store::PgLedgerStore;
