//! The post store: creation with unique slugs, and the two read paths.

use std::collections::HashSet;
use std::sync::Arc;

use crate::domain::{NewPost, Post, slug, validate_fields};
use crate::error::{DomainError, RepoError};
use crate::ports::PostRepository;

/// How many times a derived-slug insert is attempted when concurrent writers
/// keep claiming the probed slug first.
pub const MAX_INSERT_ATTEMPTS: usize = 3;

/// Owns every post record. Handlers and tools go through this type rather
/// than the repository.
#[derive(Clone)]
pub struct PostStore {
    repo: Arc<dyn PostRepository>,
}

impl PostStore {
    pub fn new(repo: Arc<dyn PostRepository>) -> Self {
        Self { repo }
    }

    /// Create and persist a post.
    ///
    /// Without an explicit slug, the title is normalized and suffixed
    /// (`-1`, `-2`, ...) until an unused slug is found. An explicit slug is
    /// taken as-is and rejected when already in use.
    pub async fn create(&self, new_post: NewPost) -> Result<Post, DomainError> {
        new_post.validate()?;

        let NewPost { title, body, slug } = new_post;
        match slug {
            Some(slug) => self.create_with_slug(title, body, slug).await,
            None => self.create_with_derived_slug(title, body).await,
        }
    }

    /// All posts, newest first.
    pub async fn list_all(&self) -> Result<Vec<Post>, DomainError> {
        Ok(self.repo.list_all().await?)
    }

    /// The post with the given slug, or [`DomainError::NotFound`].
    pub async fn get_by_slug(&self, slug: &str) -> Result<Post, DomainError> {
        self.repo
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::post_not_found(slug))
    }

    /// Store a complete post as-is, keeping its id, slug and publish date.
    pub async fn import(&self, post: Post) -> Result<Post, DomainError> {
        let mut stored = self.import_all(vec![post]).await?;
        stored
            .pop()
            .ok_or_else(|| DomainError::Internal("import stored no post".to_string()))
    }

    /// Store complete posts in one atomic write.
    ///
    /// Every post is validated and every slug looked up before anything is
    /// written; a conflict found by the write itself rolls the batch back.
    pub async fn import_all(&self, posts: Vec<Post>) -> Result<Vec<Post>, DomainError> {
        let mut seen = HashSet::new();
        for post in &posts {
            validate_fields(&post.title, &post.body)?;
            slug::validate(&post.slug)?;

            if !seen.insert(post.slug.clone()) {
                return Err(DomainError::Validation(format!(
                    "slug `{}` appears more than once in the batch",
                    post.slug
                )));
            }
            if self.repo.slug_exists(&post.slug).await? {
                return Err(slug_taken(&post.slug));
            }
        }

        self.repo.insert_all(posts).await.map_err(|err| match err {
            RepoError::Constraint(detail) => {
                DomainError::Validation(format!("slug conflicts with a stored post: {detail}"))
            }
            RepoError::DuplicateKey(detail) => {
                DomainError::Validation(format!("post id conflicts with a stored post: {detail}"))
            }
            other => other.into(),
        })
    }

    async fn create_with_slug(
        &self,
        title: String,
        body: String,
        slug: String,
    ) -> Result<Post, DomainError> {
        slug::validate(&slug)?;

        if self.repo.slug_exists(&slug).await? {
            return Err(slug_taken(&slug));
        }

        let post = Post::new(title, slug.clone(), body);
        match self.repo.insert(post).await {
            Ok(saved) => {
                tracing::info!(slug = %saved.slug, "Post created");
                Ok(saved)
            }
            Err(RepoError::Constraint(_)) => Err(slug_taken(&slug)),
            Err(err) => Err(err.into()),
        }
    }

    async fn create_with_derived_slug(
        &self,
        title: String,
        body: String,
    ) -> Result<Post, DomainError> {
        let base = slug::normalize(&title)?;

        for attempt in 1..=MAX_INSERT_ATTEMPTS {
            let slug = self.free_slug(&base).await?;
            let post = Post::new(title.clone(), slug, body.clone());

            match self.repo.insert(post).await {
                Ok(saved) => {
                    tracing::info!(slug = %saved.slug, "Post created");
                    return Ok(saved);
                }
                Err(RepoError::Constraint(reason)) => {
                    tracing::warn!(
                        base = %base,
                        attempt,
                        reason = %reason,
                        "Slug claimed by a concurrent write, probing again"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(DomainError::Duplicate(format!(
            "could not claim a unique slug for `{base}` after {MAX_INSERT_ATTEMPTS} attempts"
        )))
    }

    /// First unused candidate for `base`. Unbounded: the store is finite, so
    /// some suffix is always free.
    async fn free_slug(&self, base: &str) -> Result<String, DomainError> {
        let mut attempt = 0;
        loop {
            let candidate = slug::candidate(base, attempt);
            if !self.repo.slug_exists(&candidate).await? {
                tracing::debug!(base = %base, slug = %candidate, probes = attempt + 1, "Found free slug");
                return Ok(candidate);
            }
            attempt += 1;
        }
    }
}

fn slug_taken(slug: &str) -> DomainError {
    DomainError::Validation(format!("slug `{slug}` is already in use"))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use super::*;

    /// Vec-backed repository. `stale_probes` makes the next N existence
    /// checks answer "free" regardless, like a reader racing a writer.
    #[derive(Default)]
    struct FakeRepo {
        posts: Mutex<Vec<Post>>,
        stale_probes: AtomicUsize,
        inserts: AtomicUsize,
        always_conflict: bool,
    }

    #[async_trait]
    impl PostRepository for FakeRepo {
        async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
            let stale = self
                .stale_probes
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if stale {
                return Ok(false);
            }
            Ok(self.posts.lock().unwrap().iter().any(|p| p.slug == slug))
        }

        async fn insert(&self, post: Post) -> Result<Post, RepoError> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            let mut posts = self.posts.lock().unwrap();
            if self.always_conflict || posts.iter().any(|p| p.slug == post.slug) {
                return Err(RepoError::Constraint("posts_slug_key".to_string()));
            }
            posts.push(post.clone());
            Ok(post)
        }

        async fn insert_all(&self, batch: Vec<Post>) -> Result<Vec<Post>, RepoError> {
            self.inserts.fetch_add(batch.len(), Ordering::SeqCst);
            let mut posts = self.posts.lock().unwrap();
            for post in &batch {
                if posts.iter().any(|p| p.id == post.id) {
                    return Err(RepoError::DuplicateKey(post.id.to_string()));
                }
                if self.always_conflict || posts.iter().any(|p| p.slug == post.slug) {
                    return Err(RepoError::Constraint("posts_slug_key".to_string()));
                }
            }
            posts.extend(batch.iter().cloned());
            Ok(batch)
        }

        async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
            Ok(self.posts.lock().unwrap().iter().find(|p| p.slug == slug).cloned())
        }

        async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
            let mut posts = self.posts.lock().unwrap().clone();
            posts.sort_by(|a, b| b.publish_date.cmp(&a.publish_date));
            Ok(posts)
        }
    }

    fn store_with(repo: Arc<FakeRepo>) -> PostStore {
        PostStore::new(repo)
    }

    #[tokio::test]
    async fn test_create_derives_slug_from_title() {
        let store = store_with(Arc::new(FakeRepo::default()));

        let post = store.create(NewPost::new("Hello World", "first post")).await.unwrap();

        assert_eq!(post.slug, "hello-world");
        assert_eq!(post.title, "Hello World");
        assert_eq!(post.body, "first post");
    }

    #[tokio::test]
    async fn test_same_title_gets_increasing_suffixes() {
        let store = store_with(Arc::new(FakeRepo::default()));

        let mut slugs = Vec::new();
        for i in 0..4 {
            let post = store
                .create(NewPost::new("Hello World", format!("post {i}")))
                .await
                .unwrap();
            slugs.push(post.slug);
        }

        assert_eq!(
            slugs,
            vec!["hello-world", "hello-world-1", "hello-world-2", "hello-world-3"]
        );
    }

    #[tokio::test]
    async fn test_get_by_slug_returns_created_post() {
        let store = store_with(Arc::new(FakeRepo::default()));
        store.create(NewPost::new("Hello World", "first post")).await.unwrap();
        let second = store.create(NewPost::new("Hello World", "second post")).await.unwrap();

        let found = store.get_by_slug("hello-world-1").await.unwrap();

        assert_eq!(found, second);
        assert_eq!(found.body, "second post");
    }

    #[tokio::test]
    async fn test_get_by_unknown_slug_is_not_found() {
        let store = store_with(Arc::new(FakeRepo::default()));

        let err = store.get_by_slug("nonexistent").await.unwrap_err();

        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_explicit_slug_collision_is_rejected_not_suffixed() {
        let repo = Arc::new(FakeRepo::default());
        let store = store_with(repo.clone());
        store
            .create(NewPost::new("First", "body").with_slug("taken"))
            .await
            .unwrap();

        let err = store
            .create(NewPost::new("Second", "body").with_slug("taken"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("taken")));
        assert_eq!(repo.posts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_explicit_slug_is_rejected() {
        let store = store_with(Arc::new(FakeRepo::default()));

        let err = store
            .create(NewPost::new("Title", "body").with_slug("Not A Slug"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_fields_never_reach_the_repository() {
        let repo = Arc::new(FakeRepo::default());
        let store = store_with(repo.clone());

        assert!(store.create(NewPost::new("", "body")).await.is_err());
        assert!(store.create(NewPost::new("Title", "  ")).await.is_err());
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_lost_race_is_retried_with_fresh_probe() {
        let repo = Arc::new(FakeRepo::default());
        let store = store_with(repo.clone());
        store.create(NewPost::new("Hello World", "winner")).await.unwrap();

        // The next probe misses the existing row, so the first insert conflicts.
        repo.stale_probes.store(1, Ordering::SeqCst);
        let post = store.create(NewPost::new("Hello World", "loser")).await.unwrap();

        assert_eq!(post.slug, "hello-world-1");
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_persistent_conflict_gives_up() {
        let repo = Arc::new(FakeRepo {
            always_conflict: true,
            ..FakeRepo::default()
        });
        let store = store_with(repo.clone());

        let err = store.create(NewPost::new("Hello", "body")).await.unwrap_err();

        assert!(matches!(err, DomainError::Duplicate(_)));
        assert_eq!(repo.inserts.load(Ordering::SeqCst), MAX_INSERT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_import_keeps_fields_and_list_is_newest_first() {
        let store = store_with(Arc::new(FakeRepo::default()));
        let now = Utc::now();

        for (slug, age) in [("middle", 2), ("newest", 1), ("oldest", 3)] {
            let mut post = Post::new(slug.to_string(), slug.to_string(), "body".to_string());
            post.publish_date = now - Duration::days(age);
            let stored = store.import(post.clone()).await.unwrap();
            assert_eq!(stored, post);
        }

        let posts = store.list_all().await.unwrap();
        let slugs: Vec<_> = posts.iter().map(|p| p.slug.as_str()).collect();
        assert_eq!(slugs, vec!["newest", "middle", "oldest"]);
        assert!(posts.windows(2).all(|w| w[0].publish_date >= w[1].publish_date));
    }

    #[tokio::test]
    async fn test_import_duplicate_slug_is_validation_error() {
        let store = store_with(Arc::new(FakeRepo::default()));
        let post = Post::new("A".into(), "a".into(), "body".into());
        store.import(post.clone()).await.unwrap();

        let err = store.import(post).await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_import_id_clash_is_reported_as_id_conflict() {
        let store = store_with(Arc::new(FakeRepo::default()));
        let original = Post::new("A".into(), "a".into(), "body".into());
        store.import(original.clone()).await.unwrap();

        let mut reloaded = original.clone();
        reloaded.slug = "renamed".to_string();
        let err = store.import(reloaded).await.unwrap_err();

        assert!(
            matches!(&err, DomainError::Validation(msg) if msg.contains("post id") && msg.contains(&original.id.to_string())),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_import_all_rejected_batch_writes_nothing() {
        let repo = Arc::new(FakeRepo::default());
        let store = store_with(repo.clone());
        store
            .import(Post::new("Taken".into(), "taken".into(), "body".into()))
            .await
            .unwrap();

        let batch = vec![
            Post::new("Fresh".into(), "fresh".into(), "body".into()),
            Post::new("Taken again".into(), "taken".into(), "body".into()),
        ];
        let err = store.import_all(batch).await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(msg) if msg.contains("taken")));
        let slugs: Vec<_> = repo.posts.lock().unwrap().iter().map(|p| p.slug.clone()).collect();
        assert_eq!(slugs, vec!["taken"]);
    }

    #[tokio::test]
    async fn test_import_all_rejects_repeated_slug_in_batch() {
        let repo = Arc::new(FakeRepo::default());
        let store = store_with(repo.clone());

        let batch = vec![
            Post::new("One".into(), "same".into(), "body".into()),
            Post::new("Two".into(), "same".into(), "body".into()),
        ];
        let err = store.import_all(batch).await.unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(repo.inserts.load(Ordering::SeqCst), 0);
    }
}
