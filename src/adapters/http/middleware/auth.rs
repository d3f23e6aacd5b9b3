//! Bearer-token authentication middleware for the billing routes.
//!
//! `auth_middleware` resolves the `Authorization: Bearer` header through
//! the `TokenVerifier` port and stores the resulting `AuthenticatedUser`
//! in request extensions. Requests without a token pass through untouched
//! so the webhook and health routes stay reachable; handlers that need a
//! caller pull one out with the `RequireAuth` extractor, which rejects
//! with 401 when nothing was injected.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::domain::foundation::{AuthError, AuthenticatedUser};
use crate::ports::TokenVerifier;

/// State handed to the middleware layer.
pub type AuthState = Arc<dyn TokenVerifier>;

/// Verifies the Bearer token, if one was sent, and injects the caller.
///
/// Invalid or expired tokens are rejected here with 401 rather than being
/// passed through anonymously; a present-but-bad token is a client error,
/// not an anonymous request.
pub async fn auth_middleware(
    State(verifier): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    let Some(token) = bearer else {
        // Anonymous request; RequireAuth rejects it later if the route
        // needs a caller.
        return next.run(request).await;
    };

    match verifier.verify(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(error) => auth_error_response(error),
    }
}

fn auth_error_response(error: AuthError) -> Response {
    let (status, message) = match &error {
        AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
        AuthError::ServiceUnavailable(detail) => {
            tracing::error!(%detail, "token verifier unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "Authentication service unavailable",
            )
        }
    };

    (
        status,
        Json(serde_json::json!({
            "error": message,
            "code": "AUTH_ERROR"
        })),
    )
        .into_response()
}

/// Extractor for handlers that require an authenticated caller.
///
/// Reads the `AuthenticatedUser` the middleware injected; rejects with
/// 401 when the request arrived without a valid token.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[async_trait::async_trait]
impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Unauthenticated)
    }
}

/// Rejection emitted when a protected route is hit without a caller.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    Unauthenticated,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "Authentication required",
                "code": "UNAUTHENTICATED"
            })),
        )
            .into_response()
    }
}
