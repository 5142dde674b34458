//! HTTP handlers and the route table.

mod health;
mod pages;

use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};

use crate::middleware::error::{AppError, AppResult};
use crate::observability::RequestId;

/// One entry of the route table.
pub struct RouteEntry {
    pub name: &'static str,
    pub path: &'static str,
    register: fn(&mut web::ServiceConfig, &'static str),
}

/// Every route the server answers, registered in this order at startup.
pub const ROUTES: &[RouteEntry] = &[
    RouteEntry {
        name: "homepage",
        path: "/",
        register: homepage_route,
    },
    RouteEntry {
        name: "show_post",
        path: "/post/{slug}/",
        register: show_post_route,
    },
    RouteEntry {
        name: "health",
        path: "/health/",
        register: health_route,
    },
];

fn homepage_route(cfg: &mut web::ServiceConfig, path: &'static str) {
    cfg.route(path, web::get().to(pages::homepage));
}

fn show_post_route(cfg: &mut web::ServiceConfig, path: &'static str) {
    cfg.route(path, web::get().to(pages::show_post));
}

fn health_route(cfg: &mut web::ServiceConfig, path: &'static str) {
    cfg.route(path, web::get().to(health::health_check));
}

/// Configure all application routes from [`ROUTES`].
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    for route in ROUTES {
        tracing::debug!(name = route.name, path = route.path, "Registering route");
        (route.register)(cfg, route.path);
    }
}

/// Fallback for paths outside the route table.
pub async fn not_found(req: HttpRequest) -> AppResult<HttpResponse> {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();
    tracing::debug!(path = %req.path(), request_id = %request_id, "No route matched");

    Err(AppError::NotFound(format!("No page at {}", req.path())))
}
