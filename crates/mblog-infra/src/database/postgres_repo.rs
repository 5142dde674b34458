//! PostgreSQL post repository.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, QueryOrder, SqlErr,
    TransactionTrait,
};

use mblog_core::domain::Post;
use mblog_core::error::RepoError;
use mblog_core::ports::PostRepository;

use super::entity::post::{self, Entity as PostEntity};

/// PostgreSQL post repository.
///
/// Slug uniqueness rests on the `UNIQUE` constraint on `posts.slug`; a
/// violation surfaces as [`RepoError::Constraint`]. A clash on the primary
/// key surfaces as [`RepoError::DuplicateKey`].
pub struct PostgresPostRepository {
    db: DbConn,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self { db }
    }
}

fn query_error(err: DbErr) -> RepoError {
    match err {
        DbErr::Conn(e) => RepoError::Connection(e.to_string()),
        DbErr::ConnectionAcquire(e) => RepoError::Connection(e.to_string()),
        other => RepoError::Query(other.to_string()),
    }
}

const PRIMARY_KEY_CONSTRAINT: &str = "posts_pkey";

pub(super) fn unique_violation(detail: String) -> RepoError {
    if detail.contains(PRIMARY_KEY_CONSTRAINT) {
        RepoError::DuplicateKey(detail)
    } else {
        RepoError::Constraint(detail)
    }
}

fn insert_error(err: DbErr) -> RepoError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => unique_violation(detail),
        _ => query_error(err),
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn slug_exists(&self, slug: &str) -> Result<bool, RepoError> {
        let found = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(query_error)?;

        Ok(found.is_some())
    }

    async fn insert(&self, post: Post) -> Result<Post, RepoError> {
        tracing::debug!(slug = %post.slug, "Inserting post");

        let active_model: post::ActiveModel = post.into();
        let model = active_model.insert(&self.db).await.map_err(insert_error)?;

        Ok(model.into())
    }

    async fn insert_all(&self, posts: Vec<Post>) -> Result<Vec<Post>, RepoError> {
        tracing::debug!(count = posts.len(), "Inserting posts in one transaction");

        let txn = self.db.begin().await.map_err(query_error)?;
        let mut stored = Vec::with_capacity(posts.len());
        for record in posts {
            let active_model: post::ActiveModel = record.into();
            // Dropping `txn` on error rolls the batch back.
            let model = active_model.insert(&txn).await.map_err(insert_error)?;
            stored.push(model.into());
        }
        txn.commit().await.map_err(query_error)?;

        Ok(stored)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Post>, RepoError> {
        let result = PostEntity::find()
            .filter(post::Column::Slug.eq(slug))
            .one(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.map(Into::into))
    }

    async fn list_all(&self) -> Result<Vec<Post>, RepoError> {
        let result = PostEntity::find()
            .order_by_desc(post::Column::PubDate)
            .order_by_desc(post::Column::Id)
            .all(&self.db)
            .await
            .map_err(query_error)?;

        Ok(result.into_iter().map(Into::into).collect())
    }
}
