//! Acting-user identity extraction.
//!
//! Authentication itself happens upstream (SSO gateway); by the time a
//! request reaches this service the gateway has verified the caller and
//! forwards the account name in `X-Auth-User`. This middleware turns that
//! header into a `UserIdentity` extension so handlers and the wizard store
//! can key session state by caller. Requests without the header are rejected.

use axum::{
    extract::Request,
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};

use crate::middleware::error_handling::{AppError, Result};

pub const AUTH_USER_HEADER: &str = "x-auth-user";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserIdentity {
    pub username: String,
}

pub async fn identity_middleware(request: Request, next: Next) -> Result<Response> {
    let username = request
        .headers()
        .get(AUTH_USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match username {
        Some(username) => {
            let identity = UserIdentity {
                username: username.to_string(),
            };
            let mut request = request;
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        None => {
            tracing::warn!("Request without {} header rejected", AUTH_USER_HEADER);
            Err(AppError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request as HttpRequest, middleware, routing::get, Extension, Router};
    use tower::ServiceExt;

    async fn whoami(Extension(identity): Extension<UserIdentity>) -> String {
        identity.username
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(identity_middleware))
    }

    #[tokio::test]
    async fn test_identity_header_accepted() {
        let response = app()
            .oneshot(
                HttpRequest::builder()
                    .uri("/whoami")
                    .header("X-Auth-User", "mrodriguez")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_identity_rejected() {
        let response = app()
            .oneshot(HttpRequest::builder().uri("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    }
}
