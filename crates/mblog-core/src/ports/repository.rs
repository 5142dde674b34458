use async_trait::async_trait;

use crate::domain::Post;
use crate::error::RepoError;

/// Post storage.
///
/// Implementations must enforce slug uniqueness themselves: `insert` fails
/// with [`RepoError::Constraint`] when the slug is already taken, even if
/// `slug_exists` answered `false` a moment earlier. An id clash is
/// [`RepoError::DuplicateKey`].
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Whether any stored post uses `slug`.
    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError>;

    /// Persist a new post.
    async fn insert(&self, post: Post) -> Result<Post, RepoError>;

    /// Persist several posts atomically: either all are stored or none.
    async fn insert_all(&self, posts: Vec<Post>) -> Result<Vec<Post>, RepoError>;

    /// Find the post with the given slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError>;

    /// All posts, newest `publish_date` first.
    async fn list_all(&self) -> Result<Vec<Post>, RepoError>;
}
