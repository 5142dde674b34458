//! View models for the two pages, and the rendering helper.
//!
//! Each page is an askama template struct; handlers build the struct from
//! domain data and hand it to [`render`].

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use askama::Template;
use chrono::{DateTime, Utc};

use mblog_core::domain::Post;

use crate::config::SiteConfig;
use crate::middleware::error::AppError;

/// Display format for publish times (UTC).
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// One homepage entry.
#[derive(Debug, Clone)]
pub struct PostSummary {
    /// Zero-based position in the listing.
    pub index: usize,
    pub title: String,
    pub url: String,
    pub published: String,
    pub excerpt: String,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct HomepageView {
    pub site_title: String,
    pub posts: Vec<PostSummary>,
    pub rendered_at: String,
}

impl HomepageView {
    /// Number the posts in the order given and cut each body to an excerpt.
    pub fn build(posts: Vec<Post>, site: &SiteConfig, now: DateTime<Utc>) -> Self {
        let posts = posts
            .into_iter()
            .enumerate()
            .map(|(index, post)| PostSummary {
                index,
                url: post_url(&post.slug),
                published: post.publish_date.format(TIME_FORMAT).to_string(),
                excerpt: excerpt(&post.body, site.excerpt_chars),
                title: post.title,
            })
            .collect();

        Self {
            site_title: site.title.clone(),
            posts,
            rendered_at: now.format(TIME_FORMAT).to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostView {
    pub site_title: String,
    pub title: String,
    pub published: String,
    pub body: String,
    pub rendered_at: String,
}

impl PostView {
    pub fn build(post: Post, site: &SiteConfig, now: DateTime<Utc>) -> Self {
        Self {
            site_title: site.title.clone(),
            published: post.publish_date.format(TIME_FORMAT).to_string(),
            title: post.title,
            body: post.body,
            rendered_at: now.format(TIME_FORMAT).to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorView {
    pub status: u16,
    pub reason: String,
    pub detail: Option<String>,
}

/// Canonical path of a post page.
pub fn post_url(slug: &str) -> String {
    format!("/post/{slug}/")
}

/// Plain-text excerpt of at most `max_chars` characters, marked with `…`
/// when cut.
pub fn excerpt(body: &str, max_chars: usize) -> String {
    let body = body.trim();
    match body.char_indices().nth(max_chars) {
        None => body.to_string(),
        Some((cut, _)) => format!("{}…", body[..cut].trim_end()),
    }
}

/// Render a template into a `200 OK` HTML response.
pub fn render<T: Template>(view: &T) -> Result<HttpResponse, AppError> {
    render_with_status(view, StatusCode::OK)
}

pub fn render_with_status<T: Template>(
    view: &T,
    status: StatusCode,
) -> Result<HttpResponse, AppError> {
    let html = view
        .render()
        .map_err(|e| AppError::Internal(format!("Template rendering failed: {e}")))?;

    Ok(HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(html))
}
