//! Handler-level tests against in-memory state.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use chrono::{Duration, Utc};
use uuid::Uuid;

use quill_core::domain::{Follow, Group, Post, User};
use quill_core::ports::{
    BaseRepository, Cache, FollowRepository, PasswordService, PostRepository, RateLimiter,
    TokenService, UserRepository,
};
use quill_infra::auth::{Argon2PasswordService, JwtConfig, JwtTokenService};
use quill_infra::rate_limit::{InMemoryRateLimiter, RateLimitConfig};

use crate::handlers::configure_routes;
use crate::middleware::auth::SESSION_COOKIE;
use crate::state::AppState;

fn token_service() -> Arc<dyn TokenService> {
    Arc::new(JwtTokenService::new(JwtConfig {
        secret: "test-secret-key".to_string(),
        expiration_hours: 1,
        issuer: "quill-test".to_string(),
    }))
}

async fn test_app(
    state: AppState,
    tokens: Arc<dyn TokenService>,
) -> impl Service<
    actix_http::Request,
    Response = ServiceResponse<impl actix_web::body::MessageBody>,
    Error = actix_web::Error,
> {
    let passwords: Arc<dyn PasswordService> = Arc::new(Argon2PasswordService::new());
    let limiter: Arc<dyn RateLimiter> = Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
        max_requests: 10_000,
        window: std::time::Duration::from_secs(60),
    }));

    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .app_data(web::Data::new(tokens))
            .app_data(web::Data::new(passwords))
            .configure(move |cfg| configure_routes(cfg, limiter)),
    )
    .await
}

async fn seeded_user(state: &AppState, username: &str) -> User {
    let user = User::new(
        username.to_string(),
        format!("{username}@quill.test"),
        "unused-hash".to_string(),
    );
    state.users.save(user).await.unwrap()
}

fn session_for(tokens: &Arc<dyn TokenService>, user: &User) -> Cookie<'static> {
    let token = tokens.generate_token(user.id, &user.username).unwrap();
    Cookie::new(SESSION_COOKIE, token)
}

async fn seeded_post(state: &AppState, author: &User, text: &str, minutes_ago: i64) -> Post {
    let mut post = Post::new(author.id, text.to_string(), None, None);
    post.published_at = Utc::now() - Duration::minutes(minutes_ago);
    state.posts.save(post).await.unwrap()
}

fn location_of<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn count_posts(body: &str) -> usize {
    body.matches("<article class=\"post\">").count()
}

#[actix_web::test]
async fn test_anonymous_create_redirects_to_login_with_next() {
    let app = test_app(AppState::in_memory(), token_service()).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/create/").to_request()).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), "/auth/login/?next=%2Fcreate%2F");
}

#[actix_web::test]
async fn test_anonymous_comment_redirects_to_login() {
    let state = AppState::in_memory();
    let author = seeded_user(&state, "ada").await;
    let post = seeded_post(&state, &author, "hello", 0).await;

    let app = test_app(state, token_service()).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .set_form([("text", "nice post")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location_of(&resp).starts_with("/auth/login/?next="));
}

#[actix_web::test]
async fn test_authenticated_user_can_create_post() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let user = seeded_user(&state, "ada").await;
    let cookie = session_for(&tokens, &user);

    let app = test_app(state.clone(), tokens).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(cookie)
            .set_form([("text", "my first post"), ("group", ""), ("image_url", "")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), "/profile/ada/");

    let page = state.posts.list_recent(1).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].text, "my first post");
}

#[actix_web::test]
async fn test_blank_post_text_rerenders_form() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let user = seeded_user(&state, "ada").await;
    let cookie = session_for(&tokens, &user);

    let app = test_app(state.clone(), tokens).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create/")
            .cookie(cookie)
            .set_form([("text", "   ")])
            .to_request(),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("The post text cannot be empty."));
    assert_eq!(state.posts.list_recent(1).await.unwrap().items.len(), 0);
}

#[actix_web::test]
async fn test_only_author_may_edit_post() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let author = seeded_user(&state, "ada").await;
    let intruder = seeded_user(&state, "eve").await;
    let post = seeded_post(&state, &author, "original text", 0).await;
    let cookie = session_for(&tokens, &intruder);

    let app = test_app(state.clone(), tokens).await;

    // The edit form bounces non-authors to the detail page
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), format!("/posts/{}/", post.id));

    // So does the submission, leaving the post untouched
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(cookie)
            .set_form([("text", "defaced")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), format!("/posts/{}/", post.id));

    let unchanged = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(unchanged.text, "original text");
}

#[actix_web::test]
async fn test_edit_preserves_publication_timestamp() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let author = seeded_user(&state, "ada").await;
    let post = seeded_post(&state, &author, "original text", 90).await;
    let cookie = session_for(&tokens, &author);

    let app = test_app(state.clone(), tokens).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/edit/", post.id))
            .cookie(cookie)
            .set_form([("text", "revised text")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let edited = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(edited.text, "revised text");
    assert_eq!(edited.published_at, post.published_at);
}

#[actix_web::test]
async fn test_sixteen_posts_split_across_two_pages() {
    let state = AppState::in_memory();
    let author = seeded_user(&state, "ada").await;
    for i in 0..16 {
        seeded_post(&state, &author, &format!("post number {i}"), i).await;
    }

    let app = test_app(state, token_service()).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(count_posts(&body), 10);
    assert!(body.contains("Page 1 of 2"));

    let resp =
        test::call_service(&app, test::TestRequest::get().uri("/?page=2").to_request()).await;
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(count_posts(&body), 6);
}

#[actix_web::test]
async fn test_home_feed_served_from_cache_until_cleared() {
    let state = AppState::in_memory();
    let author = seeded_user(&state, "ada").await;
    seeded_post(&state, &author, "the first post", 5).await;

    let app = test_app(state.clone(), token_service()).await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let first_body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(first_body.contains("the first post"));

    // A new post does not appear while the cached page is live
    seeded_post(&state, &author, "a newer post", 0).await;
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let cached_body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(cached_body, first_body);

    // Clearing the key makes the next render fresh
    state.cache.delete("page:index:1").await.unwrap();
    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    let fresh_body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(fresh_body.contains("a newer post"));
}

#[actix_web::test]
async fn test_follow_feed_contains_only_followed_authors() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let reader = seeded_user(&state, "reader").await;
    let followed = seeded_user(&state, "followed").await;
    let stranger = seeded_user(&state, "stranger").await;
    seeded_post(&state, &followed, "from a followed author", 1).await;
    seeded_post(&state, &stranger, "from a stranger", 0).await;
    state
        .follows
        .save(Follow::new(reader.id, followed.id))
        .await
        .unwrap();
    let cookie = session_for(&tokens, &reader);

    let app = test_app(state, tokens).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/follow/")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("from a followed author"));
    assert!(!body.contains("from a stranger"));
}

#[actix_web::test]
async fn test_follow_and_unfollow_round_trip() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let reader = seeded_user(&state, "reader").await;
    let author = seeded_user(&state, "author").await;
    let cookie = session_for(&tokens, &reader);

    let app = test_app(state.clone(), tokens).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/follow/")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), "/profile/author/");
    assert!(state.follows.exists(reader.id, author.id).await.unwrap());

    // Following again is a no-op, not a second edge
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/follow/")
            .cookie(cookie.clone())
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(
        state.follows.authors_for(reader.id).await.unwrap().len(),
        1
    );

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/author/unfollow/")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(!state.follows.exists(reader.id, author.id).await.unwrap());
}

#[actix_web::test]
async fn test_self_follow_is_ignored() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let user = seeded_user(&state, "narcissus").await;
    let cookie = session_for(&tokens, &user);

    let app = test_app(state.clone(), tokens).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/narcissus/follow/")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(!state.follows.exists(user.id, user.id).await.unwrap());
}

#[actix_web::test]
async fn test_unknown_pages_return_404() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let user = seeded_user(&state, "ada").await;
    let cookie = session_for(&tokens, &user);

    let app = test_app(state, tokens).await;

    let missing_post = format!("/posts/{}/", Uuid::new_v4());
    for uri in [
        "/group/no-such-group/",
        "/profile/nobody/",
        missing_post.as_str(),
    ] {
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(uri)
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "expected 404 for {uri}");
    }

    // Unfollowing someone you never followed is a 404 too
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/profile/ada/unfollow/")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_group_page_lists_only_group_posts() {
    let state = AppState::in_memory();
    let author = seeded_user(&state, "ada").await;
    let group = state
        .groups
        .save(Group::new(
            "Rustaceans".to_string(),
            "rustaceans".to_string(),
            "Crab talk".to_string(),
        ))
        .await
        .unwrap();

    let mut grouped = Post::new(author.id, "a grouped post".to_string(), Some(group.id), None);
    grouped.published_at = Utc::now() - Duration::minutes(1);
    state.posts.save(grouped).await.unwrap();
    seeded_post(&state, &author, "an ungrouped post", 0).await;

    let app = test_app(state, token_service()).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/group/rustaceans/").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Rustaceans"));
    assert!(body.contains("a grouped post"));
    assert!(!body.contains("an ungrouped post"));
}

#[actix_web::test]
async fn test_comment_appears_on_post_detail() {
    let state = AppState::in_memory();
    let tokens = token_service();
    let author = seeded_user(&state, "ada").await;
    let commenter = seeded_user(&state, "bob").await;
    let post = seeded_post(&state, &author, "hello world", 0).await;
    let cookie = session_for(&tokens, &commenter);

    let app = test_app(state, tokens).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri(&format!("/posts/{}/comment/", post.id))
            .cookie(cookie)
            .set_form([("text", "great write-up")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), format!("/posts/{}/", post.id));

    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/posts/{}/", post.id))
            .to_request(),
    )
    .await;
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("great write-up"));
    assert!(body.contains("bob"));
}

#[actix_web::test]
async fn test_signup_then_login_flow() {
    let state = AppState::in_memory();
    let app = test_app(state.clone(), token_service()).await;

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/signup/")
            .set_form([
                ("username", "ada"),
                ("email", "ada@quill.test"),
                ("password", "correct horse battery"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), "/");
    assert!(
        resp.response()
            .cookies()
            .any(|c| c.name() == SESSION_COOKIE)
    );
    assert!(
        state
            .users
            .find_by_username("ada")
            .await
            .unwrap()
            .is_some()
    );

    // Wrong password re-renders the form
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([("username", "ada"), ("password", "wrong"), ("next", "/create/")])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert!(body.contains("Invalid username or password."));

    // The right password lands on the requested page
    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/auth/login/")
            .set_form([
                ("username", "ada"),
                ("password", "correct horse battery"),
                ("next", "/create/"),
            ])
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location_of(&resp), "/create/");
}
