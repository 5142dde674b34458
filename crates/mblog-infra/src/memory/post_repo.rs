//! In-memory post repository.

use async_trait::async_trait;
use tokio::sync::RwLock;

use mblog_core::domain::Post;
use mblog_core::error::RepoError;
use mblog_core::ports::PostRepository;

/// Post repository backed by a `Vec` behind an async `RwLock`.
///
/// The slug check and the push happen under one write lock, which gives the
/// same guarantee as a unique index.
/// Note: Data is lost on process restart.
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<Vec<Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn check_unique(posts: &[Post], post: &Post) -> Result<(), RepoError> {
    if posts.iter().any(|p| p.id == post.id) {
        return Err(RepoError::DuplicateKey(format!("id {} already exists", post.id)));
    }
    if posts.iter().any(|p| p.slug == post.slug) {
        return Err(RepoError::Constraint(format!(
            "slug `{}` already exists",
            post.slug
        )));
    }
    Ok(())
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().any(|p| p.slug == slug))
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        check_unique(&posts, &post)?;

        posts.push(post.clone());
        Ok(post)
    }

    async fn insert_all(&self, batch: Vec<Post>) -> Result<Vec<Post>, RepoError> {
        let mut posts = self.posts.write().await;

        // Checked against stored rows and earlier rows of the same batch.
        let mut staged: Vec<Post> = Vec::with_capacity(batch.len());
        for post in &batch {
            check_unique(&posts, post)?;
            check_unique(&staged, post)?;
            staged.push(post.clone());
        }

        posts.extend(staged);
        Ok(batch)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let posts = self.posts.read().await;
        Ok(posts.iter().find(|p| p.slug == slug).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        let mut posts = self.posts.read().await.clone();
        posts.sort_by(|a, b| {
            b.publish_date
                .cmp(&a.publish_date)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(posts)
    }
}
