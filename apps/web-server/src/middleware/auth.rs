//! Authentication extractors - session cookie based.

use actix_web::{FromRequest, HttpRequest, HttpResponse, ResponseError, dev::Payload};
use std::future::{Ready, ready};
use std::sync::Arc;

use quill_core::ports::TokenService;

use super::error::redirect;

/// Name of the session cookie carrying the token.
pub const SESSION_COOKIE: &str = "quill_session";

/// Authenticated viewer identity extractor.
///
/// Use this in handlers to require a logged-in user; anonymous requests
/// are bounced to the login page with the original path as the return
/// target:
/// ```ignore
/// async fn post_create(identity: Identity) -> impl Responder {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: uuid::Uuid,
    pub username: String,
}

/// Failure to authenticate a protected page - renders as the login
/// redirect rather than an error status.
#[derive(Debug)]
pub struct LoginRequired {
    next: String,
}

impl LoginRequired {
    fn for_path(path: &str) -> Self {
        Self {
            next: path.to_string(),
        }
    }

    /// Where the anonymous viewer is sent.
    pub fn location(&self) -> String {
        let query = serde_urlencoded::to_string([("next", self.next.as_str())])
            .unwrap_or_else(|_| String::new());
        format!("/auth/login/?{}", query)
    }
}

impl std::fmt::Display for LoginRequired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "login required for {}", self.next)
    }
}

impl ResponseError for LoginRequired {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::FOUND
    }

    fn error_response(&self) -> HttpResponse {
        redirect(self.location())
    }
}

impl FromRequest for Identity {
    type Error = LoginRequired;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let token_service = match req.app_data::<actix_web::web::Data<Arc<dyn TokenService>>>() {
            Some(service) => service,
            None => {
                tracing::error!("TokenService not found in app data");
                return ready(Err(LoginRequired::for_path(req.path())));
            }
        };

        let cookie = match req.cookie(SESSION_COOKIE) {
            Some(cookie) => cookie,
            None => return ready(Err(LoginRequired::for_path(req.path()))),
        };

        match token_service.validate_token(cookie.value()) {
            Ok(claims) => ready(Ok(Identity {
                user_id: claims.user_id,
                username: claims.username,
            })),
            Err(e) => {
                tracing::debug!("Session cookie rejected: {}", e);
                ready(Err(LoginRequired::for_path(req.path())))
            }
        }
    }
}

/// Optional identity extractor - never fails; anonymous viewers yield
/// `None`. Feeds the logged-in/logged-out state of every page header.
pub struct OptionalIdentity(pub Option<Identity>);

impl FromRequest for OptionalIdentity {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        match Identity::from_request(req, payload).into_inner() {
            Ok(identity) => ready(Ok(OptionalIdentity(Some(identity)))),
            Err(_) => ready(Ok(OptionalIdentity(None))),
        }
    }
}
