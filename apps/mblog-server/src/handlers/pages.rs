//! The two pages: post listing and post detail.

use actix_web::http::header;
use actix_web::{HttpResponse, web};
use chrono::Utc;

use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::views::{HomepageView, PostView, render};

/// GET / - every post, newest first.
pub async fn homepage(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let posts = state.posts.list_all().await?;
    let view = HomepageView::build(posts, &state.site, Utc::now());

    render(&view)
}

/// GET /post/{slug}/ - one post.
///
/// An unknown slug redirects to the homepage. Store faults are not
/// redirected; they become a 500.
pub async fn show_post(
    state: web::Data<AppState>,
    slug: web::Path<String>,
) -> AppResult<HttpResponse> {
    let slug = slug.into_inner();

    match state.posts.get_by_slug(&slug).await {
        Ok(post) => render(&PostView::build(post, &state.site, Utc::now())),
        Err(err) if err.is_not_found() => {
            tracing::debug!(slug = %slug, "Unknown slug, redirecting to homepage");
            Ok(redirect_home())
        }
        Err(err) => Err(err.into()),
    }
}

fn redirect_home() -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .finish()
}
