//! # mblog Core
//!
//! The domain layer of mblog.
//! Posts, slug rules and the post store live here, with no infrastructure
//! dependencies. Storage is reached through the [`ports::PostRepository`] port.

pub mod domain;
pub mod error;
pub mod ports;
pub mod store;

pub use error::{DomainError, RepoError};
pub use store::PostStore;
