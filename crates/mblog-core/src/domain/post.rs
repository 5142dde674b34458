use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Maximum length of a post title, in characters.
pub const TITLE_MAX_CHARS: usize = 200;

/// Post entity - a published blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub publish_date: DateTime<Utc>,
}

impl Post {
    /// Create a new post stamped with the current time.
    ///
    /// The timestamp is truncated to microseconds so it survives a round
    /// trip through `timestamptz` unchanged.
    pub fn new(title: String, slug: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            title,
            slug,
            body,
            publish_date: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Input for creating a post. `slug` is derived from `title` when absent.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub body: String,
    pub slug: Option<String>,
}

impl NewPost {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            slug: None,
        }
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Check the required fields. Slug rules are applied separately.
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_fields(&self.title, &self.body)
    }
}

pub(crate) fn validate_fields(title: &str, body: &str) -> Result<(), DomainError> {
    if title.trim().is_empty() {
        return Err(DomainError::Validation("title is required".to_string()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    if body.trim().is_empty() {
        return Err(DomainError::Validation("body is required".to_string()));
    }
    Ok(())
}
