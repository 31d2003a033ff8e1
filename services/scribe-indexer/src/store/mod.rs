//! Data persistence layer (adapters for the [`crate::ports::EventStore`] port).
//!
//! The primary implementation uses PostgreSQL, with a confirmed table set and
//! a parallel "at head" table set. `mocks` provides an in-memory
//! implementation for unit tests that don't need a real database.
//!
//! # Usage
//!
//! ```ignore
//! use scribe_indexer::store::PostgresStore;
//! use sqlx::postgres::PgPoolOptions;
//!
//! let pool = PgPoolOptions::new()
//!     .max_connections(10)
//!     .connect("postgres://localhost/bridge")
//!     .await?;
//!
//! let store = PostgresStore::new(pool);
//! store.run_migrations().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations are located in `migrations/` and run via [`PostgresStore::run_migrations`].

pub mod postgres;

pub use postgres::PostgresStore;

// Re-export commonly used types for convenience
pub use sqlx::postgres::PgPool;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;
