//! JSON request bodies whose rejections use the API's error replies.
//!
//! `axum::Json` answers a body it cannot parse with 415/422 and plain text.
//! Clients of this API expect a 400 carrying the same JSON key the endpoint
//! uses for its other validation failures.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use recipe_box_common::{
    AddRecipeRequest, CheckSessionRequest, LoginRequest, SaveFavoritesRequest, SignoutRequest,
    SignupRequest, TokenRequest,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// A request body type and the reply sent when it fails to parse.
pub trait RequestBody: DeserializeOwned {
    /// 400 with an `error` body unless overridden.
    fn rejected(message: String) -> ApiError {
        ApiError::Validation(message)
    }
}

impl RequestBody for SignupRequest {}
impl RequestBody for TokenRequest {}
impl RequestBody for SaveFavoritesRequest {}
impl RequestBody for AddRecipeRequest {}

impl RequestBody for LoginRequest {
    fn rejected(message: String) -> ApiError {
        ApiError::bad_request(message)
    }
}

impl RequestBody for SignoutRequest {
    fn rejected(message: String) -> ApiError {
        ApiError::bad_request(message)
    }
}

impl RequestBody for CheckSessionRequest {
    fn rejected(message: String) -> ApiError {
        ApiError::bad_request(message)
    }
}

/// Extractor for a JSON request body of type `T`.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: RequestBody,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(body)) => Ok(JsonBody(body)),
            Err(rejection) => {
                let message = rejection.body_text();
                tracing::debug!("Rejected request body: {}", message);
                Err(T::rejected(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    async fn extract<T: RequestBody>(content_type: Option<&str>, body: &str) -> Result<T, ApiError> {
        let mut builder = axum::http::Request::builder().method("POST").uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header("Content-Type", content_type);
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();
        JsonBody::<T>::from_request(request, &()).await.map(|JsonBody(body)| body)
    }

    async fn reply(error: ApiError) -> (StatusCode, serde_json::Value) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_well_formed_body_is_extracted() {
        let request: LoginRequest =
            extract(Some("application/json"), r#"{"email":"a@b.c","token_id":"t"}"#)
                .await
                .unwrap();
        assert_eq!(request.email.as_deref(), Some("a@b.c"));
    }

    #[tokio::test]
    async fn test_type_mismatch_uses_error_key_by_default() {
        let error = extract::<SignupRequest>(Some("application/json"), r#"{"firstName":1}"#)
            .await
            .unwrap_err();
        let (status, body) = reply(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("firstName"));
    }

    #[tokio::test]
    async fn test_session_bodies_use_message_key() {
        let error = extract::<CheckSessionRequest>(Some("application/json"), r#"{"sessionId":5}"#)
            .await
            .unwrap_err();
        let (status, body) = reply(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let error = extract::<TokenRequest>(None, r#"{"email":"a@b.c"}"#).await.unwrap_err();
        let (status, body) = reply(error).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}
