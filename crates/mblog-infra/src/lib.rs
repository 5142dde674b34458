//! # mblog Infrastructure
//!
//! Concrete implementations of the ports defined in `mblog-core`, plus the
//! JSON dump facility.
//!
//! ## Feature Flags
//!
//! - `postgres` (default) - PostgreSQL storage via SeaORM. Without it only
//!   the in-memory repository is available.

pub mod database;
pub mod dump;
pub mod memory;

pub use database::DatabaseConfig;
pub use memory::InMemoryPostRepository;

#[cfg(feature = "postgres")]
pub use database::{PostgresPostRepository, connect};
