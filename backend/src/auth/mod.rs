//! Bearer-token authentication for protected routes.

use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::error::ApiError;
use crate::models::user;
use crate::store::DocRef;
use crate::AppState;

/// Identity of an authenticated caller, built once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    /// Subject of the verified token.
    pub user_id: String,
    /// The caller's own user record.
    pub user_ref: DocRef,
}

impl AuthContext {
    pub fn new(user_id: String) -> Self {
        let user_ref = user::doc_ref(&user_id);
        Self { user_id, user_ref }
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token)
}

/// Verify the caller's bearer token against the identity provider.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthContext, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| ApiError::Unauthorized {
        message: "Missing or invalid token".to_string(),
        details: None,
    })?;

    let user_id = state.identity.verify_token(token).await.map_err(|e| {
        tracing::warn!("Rejected bearer token: {}", e);
        ApiError::Unauthorized {
            message: "Invalid token".to_string(),
            details: Some(e.to_string()),
        }
    })?;

    Ok(AuthContext::new(user_id))
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        authenticate(state, &parts.headers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with_auth(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn test_bearer_token_extraction_valid() {
        let headers = headers_with_auth("Bearer eyJhbGciOiJIUzI1NiJ9.test");
        assert_eq!(bearer_token(&headers), Some("eyJhbGciOiJIUzI1NiJ9.test"));
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        let headers = headers_with_auth("Basic dXNlcjpwYXNz");
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_bearer_token_rejects_empty_token() {
        let headers = headers_with_auth("Bearer ");
        assert!(bearer_token(&headers).is_none());
    }

    #[test]
    fn test_empty_headers_has_no_token() {
        assert!(bearer_token(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_context_points_at_own_user_record() {
        let ctx = AuthContext::new("uid-1".to_string());
        assert_eq!(ctx.user_ref, DocRef::new("users", "uid-1"));
    }
}
