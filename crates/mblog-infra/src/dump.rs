//! Dump facility: export every post to a single JSON file and load it back.
//!
//! The file is a JSON array of fixture records, oldest post first:
//!
//! ```json
//! [{"model": "blog.post", "pk": "…uuid…",
//!   "fields": {"title": "…", "slug": "…", "body": "…", "pub_date": "2025-01-01T10:00:00Z"}}]
//! ```
//!
//! Output is UTF-8 without a byte-order mark. A leading BOM is tolerated on
//! input.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use mblog_core::domain::Post;
use mblog_core::error::DomainError;
use mblog_core::store::PostStore;

/// Model label written into every record.
pub const POST_MODEL: &str = "blog.post";

/// Default output file name.
pub const DEFAULT_DUMP_FILE: &str = "data.json";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed dump: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported model `{0}` in dump")]
    UnknownModel(String),

    #[error("Slug `{0}` appears more than once in dump")]
    DuplicateSlug(String),

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// One fixture record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpRecord {
    pub model: String,
    pub pk: Uuid,
    pub fields: PostFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostFields {
    pub title: String,
    pub slug: String,
    pub body: String,
    pub pub_date: DateTime<Utc>,
}

impl From<Post> for DumpRecord {
    fn from(post: Post) -> Self {
        Self {
            model: POST_MODEL.to_string(),
            pk: post.id,
            fields: PostFields {
                title: post.title,
                slug: post.slug,
                body: post.body,
                pub_date: post.publish_date,
            },
        }
    }
}

impl From<DumpRecord> for Post {
    fn from(record: DumpRecord) -> Self {
        Self {
            id: record.pk,
            title: record.fields.title,
            slug: record.fields.slug,
            body: record.fields.body,
            publish_date: record.fields.pub_date,
        }
    }
}

/// Serialize posts, oldest first. `indent` of `None` writes compact JSON.
pub fn encode(mut posts: Vec<Post>, indent: Option<usize>) -> Result<Vec<u8>, DumpError> {
    posts.sort_by(|a, b| a.publish_date.cmp(&b.publish_date).then_with(|| a.id.cmp(&b.id)));
    let records: Vec<DumpRecord> = posts.into_iter().map(Into::into).collect();

    let bytes = match indent {
        None => serde_json::to_vec(&records)?,
        Some(width) => {
            let pad = vec![b' '; width];
            let mut out = Vec::new();
            let formatter = serde_json::ser::PrettyFormatter::with_indent(&pad);
            let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
            records.serialize(&mut serializer)?;
            out
        }
    };

    Ok(bytes)
}

/// Parse a dump, checking models and in-file slug uniqueness.
pub fn decode(bytes: &[u8]) -> Result<Vec<Post>, DumpError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let records: Vec<DumpRecord> = serde_json::from_slice(bytes)?;

    let mut seen = HashSet::new();
    let mut posts = Vec::with_capacity(records.len());
    for record in records {
        if record.model != POST_MODEL {
            return Err(DumpError::UnknownModel(record.model));
        }
        if !seen.insert(record.fields.slug.clone()) {
            return Err(DumpError::DuplicateSlug(record.fields.slug));
        }
        posts.push(record.into());
    }

    Ok(posts)
}

/// Write every stored post to `path`. Returns the number of records.
pub async fn export_to_path(
    store: &PostStore,
    path: &Path,
    indent: Option<usize>,
) -> Result<usize, DumpError> {
    let posts = store.list_all().await?;
    let count = posts.len();
    let bytes = encode(posts, indent)?;

    tokio::fs::write(path, bytes).await.map_err(|source| DumpError::Io {
        path: path.display().to_string(),
        source,
    })?;

    tracing::info!(path = %path.display(), records = count, "Dump written");
    Ok(count)
}

/// Load a dump from `path` into the store. Returns the number of records.
///
/// The whole file is parsed and checked before anything is written, then
/// stored as one batch: a record that clashes with a stored post leaves the
/// store untouched.
pub async fn import_from_path(store: &PostStore, path: &Path) -> Result<usize, DumpError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| DumpError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let posts = decode(&bytes)?;
    tracing::debug!(path = %path.display(), records = posts.len(), "Loading dump");

    let count = store.import_all(posts).await?.len();

    tracing::info!(path = %path.display(), records = count, "Dump loaded");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mblog_core::domain::NewPost;

    use super::*;
    use crate::memory::InMemoryPostRepository;

    fn memory_store() -> PostStore {
        PostStore::new(Arc::new(InMemoryPostRepository::new()))
    }

    fn slugs(posts: Vec<Post>) -> Vec<String> {
        posts.into_iter().map(|p| p.slug).collect()
    }

    #[tokio::test]
    async fn test_export_then_import_preserves_every_field() {
        let source = memory_store();
        source.create(NewPost::new("Hello World", "first post")).await.unwrap();
        source.create(NewPost::new("Hello World", "second post")).await.unwrap();
        source
            .create(NewPost::new("Crème brûlée", "ünïcödé body\nline two"))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_DUMP_FILE);
        let written = export_to_path(&source, &path, Some(2)).await.unwrap();
        assert_eq!(written, 3);

        let target = memory_store();
        let loaded = import_from_path(&target, &path).await.unwrap();
        assert_eq!(loaded, 3);

        let mut before = source.list_all().await.unwrap();
        let mut after = target.list_all().await.unwrap();
        before.sort_by(|a, b| a.slug.cmp(&b.slug));
        after.sort_by(|a, b| a.slug.cmp(&b.slug));
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_dump_is_utf8_without_bom() {
        let store = memory_store();
        store.create(NewPost::new("Grüße", "body")).await.unwrap();

        let file = tempfile::NamedTempFile::new().unwrap();
        export_to_path(&store, file.path(), None).await.unwrap();
        let bytes = std::fs::read(file.path()).unwrap();

        assert!(!bytes.starts_with(UTF8_BOM));
        assert!(String::from_utf8(bytes).unwrap().contains("Grüße"));
    }

    #[test]
    fn test_encode_orders_oldest_first() {
        let mut old = Post::new("Old".into(), "old".into(), "b".into());
        old.publish_date -= chrono::Duration::days(1);
        let new = Post::new("New".into(), "new".into(), "b".into());

        let bytes = encode(vec![new, old], None).unwrap();
        let records: Vec<DumpRecord> = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(records[0].fields.slug, "old");
        assert_eq!(records[1].fields.slug, "new");
        assert!(records.iter().all(|r| r.model == POST_MODEL));
    }

    #[test]
    fn test_decode_accepts_leading_bom() {
        let json = format!(
            r#"[{{"model":"{POST_MODEL}","pk":"{}","fields":{{"title":"T","slug":"t","body":"b","pub_date":"2025-01-01T10:00:00Z"}}}}]"#,
            Uuid::new_v4()
        );
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(json.as_bytes());

        let posts = decode(&bytes).unwrap();

        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].publish_date.to_rfc3339(), "2025-01-01T10:00:00+00:00");
    }

    #[test]
    fn test_decode_rejects_foreign_models_and_duplicate_slugs() {
        let record = |model: &str, slug: &str| {
            format!(
                r#"{{"model":"{model}","pk":"{}","fields":{{"title":"T","slug":"{slug}","body":"b","pub_date":"2025-01-01T10:00:00Z"}}}}"#,
                Uuid::new_v4()
            )
        };

        let foreign = format!("[{}]", record("auth.user", "a"));
        assert!(matches!(
            decode(foreign.as_bytes()),
            Err(DumpError::UnknownModel(model)) if model == "auth.user"
        ));

        let duplicated = format!("[{},{}]", record(POST_MODEL, "a"), record(POST_MODEL, "a"));
        assert!(matches!(
            decode(duplicated.as_bytes()),
            Err(DumpError::DuplicateSlug(slug)) if slug == "a"
        ));
    }

    #[tokio::test]
    async fn test_import_into_store_with_conflicting_slug_fails() {
        let store = memory_store();
        store.create(NewPost::new("Taken", "body")).await.unwrap();

        let mut clash = Post::new("Other".into(), "taken".into(), "b".into());
        clash.publish_date -= chrono::Duration::days(1);
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), encode(vec![clash], None).unwrap()).unwrap();

        let err = import_from_path(&store, file.path()).await.unwrap_err();

        assert!(matches!(err, DumpError::Store(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rejected_load_leaves_store_unchanged() {
        let store = memory_store();
        store.create(NewPost::new("Taken", "body")).await.unwrap();

        let mut fresh = Post::new("Fresh".into(), "fresh".into(), "b".into());
        fresh.publish_date -= chrono::Duration::days(2);
        let mut clash = Post::new("Other".into(), "taken".into(), "b".into());
        clash.publish_date -= chrono::Duration::days(1);
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), encode(vec![fresh, clash], None).unwrap()).unwrap();

        let err = import_from_path(&store, file.path()).await.unwrap_err();

        assert!(matches!(err, DumpError::Store(DomainError::Validation(_))));
        assert_eq!(slugs(store.list_all().await.unwrap()), vec!["taken"]);
    }
}
