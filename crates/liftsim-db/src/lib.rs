//! Storage layer for the Liftsim elevator simulation.
//!
//! The simulation engine and the call services depend only on the
//! [`EntityStore`] trait. Two implementations are provided:
//!
//! ```text
//! EntityStore
//!     |
//!     +-- InMemoryStore   (tests, runs without a database)
//!     |
//!     +-- PgStore         (PostgreSQL via PostgresPool)
//!         |-- buildings / elevators
//!         |-- calls
//!         +-- call_assignments (write-once audit trail)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- the [`EntityStore`] trait and [`StepCommit`]
//! - [`memory`] -- in-memory implementation with failure injection
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`pg_store`] -- `PostgreSQL` implementation
//! - [`error`] -- shared error type

pub mod error;
pub mod memory;
pub mod pg_store;
pub mod postgres;
pub mod store;

pub use error::DbError;
pub use memory::InMemoryStore;
pub use pg_store::PgStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use store::{EntityStore, StepCommit};
