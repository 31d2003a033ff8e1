//! Storage adapters implementing the [`crate::ports`] traits.

pub mod postgres;

pub use postgres::PostgresStore;
