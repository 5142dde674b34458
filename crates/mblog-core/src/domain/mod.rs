//! Domain entities and the rules attached to them.

mod post;
pub mod slug;

pub(crate) use post::validate_fields;
pub use post::{NewPost, Post, TITLE_MAX_CHARS};
