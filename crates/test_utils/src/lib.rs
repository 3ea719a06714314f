//! Test Utilities Crate
//!
//! Provides shared test infrastructure for the turnstile test suite.
//!
//! # Modules
//!
//! - `memory_store`: In-memory `LedgerStore` and `ProductCatalog` adapters
//! - `builders`: Builder patterns for test data construction
//! - `fixtures`: Pre-built test data for common entities
//! - `generators`: Property-based test data generators

pub mod builders;
pub mod fixtures;
pub mod generators;
pub mod memory_store;

pub use builders::*;
pub use fixtures::*;
pub use generators::*;
pub use memory_store::*;
