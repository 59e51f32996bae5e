//! HTTP handlers and route configuration.

mod auth;
mod health;
mod pages;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use actix_web::web;

use quill_core::ports::RateLimiter;

use crate::middleware::rate_limit::RateLimitMiddleware;

/// Configure all application routes.
///
/// The auth scope sits behind the rate limiter; everything else is
/// plain routes mirroring the page URLs.
pub fn configure_routes(cfg: &mut web::ServiceConfig, limiter: Arc<dyn RateLimiter>) {
    cfg.route("/health", web::get().to(health::health_check))
        .service(
            web::scope("/auth")
                .wrap(RateLimitMiddleware::new(limiter))
                .route("/signup/", web::get().to(auth::signup_form))
                .route("/signup/", web::post().to(auth::signup))
                .route("/login/", web::get().to(auth::login_form))
                .route("/login/", web::post().to(auth::login))
                .route("/logout/", web::get().to(auth::logout)),
        )
        .route("/", web::get().to(pages::index))
        .route("/follow/", web::get().to(pages::follow_index))
        .route("/group/{slug}/", web::get().to(pages::group_posts))
        .route("/profile/{username}/", web::get().to(pages::profile))
        .route(
            "/profile/{username}/follow/",
            web::get().to(pages::profile_follow),
        )
        .route(
            "/profile/{username}/unfollow/",
            web::get().to(pages::profile_unfollow),
        )
        .route("/create/", web::get().to(pages::post_create_form))
        .route("/create/", web::post().to(pages::post_create))
        .route("/posts/{id}/", web::get().to(pages::post_detail))
        .route("/posts/{id}/edit/", web::get().to(pages::post_edit_form))
        .route("/posts/{id}/edit/", web::post().to(pages::post_edit))
        .route("/posts/{id}/comment/", web::post().to(pages::add_comment));
}
