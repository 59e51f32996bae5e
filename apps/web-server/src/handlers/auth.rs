//! Signup, login and logout pages.

use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpResponse, http::header, web};
use askama::Template;
use serde::Deserialize;
use std::sync::Arc;

use quill_core::domain::User;
use quill_core::ports::{BaseRepository, PasswordService, TokenService, UserRepository};
use quill_shared::{LoginForm, SignupForm};

use crate::middleware::auth::SESSION_COOKIE;
use crate::middleware::error::{AppError, AppResult, html, redirect};
use crate::state::AppState;
use crate::templates::{LoginTemplate, Nav, SignupTemplate};

/// Query string of the login page - the return target set by the
/// login redirect.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

/// Only same-site paths may be used as a post-login target.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

fn session_cookie(token: String, max_age_seconds: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_seconds))
        .finish()
}

/// GET /auth/signup/
pub async fn signup_form() -> AppResult<HttpResponse> {
    let body = SignupTemplate {
        nav: Nav::anonymous(),
        username: String::new(),
        email: String::new(),
        error: None,
    }
    .render()?;

    Ok(html(body))
}

/// POST /auth/signup/ - register, log the new user in, land on the feed.
pub async fn signup(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    form: web::Form<SignupForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();

    let error = validate_signup(&state, &username, &email, &form.password).await?;
    if let Some(error) = error {
        let body = SignupTemplate {
            nav: Nav::anonymous(),
            username,
            email,
            error: Some(error),
        }
        .render()?;
        return Ok(html(body));
    }

    let password_hash = password_service
        .hash(&form.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let user = User::new(username, email, password_hash);
    let user = state.users.save(user).await?;
    tracing::info!(username = %user.username, "New user registered");

    let token = token_service
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, "/"))
        .cookie(session_cookie(token, token_service.expiration_seconds()))
        .finish())
}

async fn validate_signup(
    state: &AppState,
    username: &str,
    email: &str,
    password: &str,
) -> AppResult<Option<String>> {
    if username.is_empty() || username.contains(char::is_whitespace) {
        return Ok(Some(
            "Pick a username without spaces.".to_string(),
        ));
    }
    if email.is_empty() || !email.contains('@') {
        return Ok(Some("Enter a valid email address.".to_string()));
    }
    if password.len() < 8 {
        return Ok(Some(
            "The password must be at least 8 characters.".to_string(),
        ));
    }

    if state.users.find_by_username(username).await?.is_some() {
        return Ok(Some("That username is taken.".to_string()));
    }
    if state.users.find_by_email(email).await?.is_some() {
        return Ok(Some("That email is already registered.".to_string()));
    }

    Ok(None)
}

/// GET /auth/login/
pub async fn login_form(query: web::Query<NextQuery>) -> AppResult<HttpResponse> {
    let body = LoginTemplate {
        nav: Nav::anonymous(),
        username: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
        error: None,
    }
    .render()?;

    Ok(html(body))
}

/// POST /auth/login/ - set the session cookie and return to `next`.
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();
    let next = safe_next(form.next.as_deref()).to_string();

    let found = state.users.find_by_username(form.username.trim()).await?;

    let user = match found {
        Some(user)
            if password_service
                .verify(&form.password, &user.password_hash)
                .map_err(|e| AppError::Internal(e.to_string()))? =>
        {
            user
        }
        _ => {
            tracing::debug!(username = %form.username, "Login rejected");
            let body = LoginTemplate {
                nav: Nav::anonymous(),
                username: form.username,
                next,
                error: Some("Invalid username or password.".to_string()),
            }
            .render()?;
            return Ok(html(body));
        }
    };

    let token = token_service
        .generate_token(user.id, &user.username)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, next))
        .cookie(session_cookie(token, token_service.expiration_seconds()))
        .finish())
}

/// GET /auth/logout/ - clear the session cookie.
pub async fn logout() -> HttpResponse {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookie.make_removal();

    let mut response = redirect("/");
    if let Err(e) = response.add_cookie(&cookie) {
        tracing::warn!("Failed to attach removal cookie: {}", e);
    }
    response
}
