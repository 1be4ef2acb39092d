//! Connect-style unary JSON RPC over HTTP.
//!
//! Each method is `POST /<package>.<Service>/<Method>` with a camelCase JSON
//! body. Errors come back as `{"code": ..., "message": ...}` with the HTTP
//! status Connect assigns to the code.

use crate::auth::{AuthRequest, AuthResponse, AuthService, CreateUserRequest};
use crate::crypto::challenge::Challenge;
use crate::directory::UserRecord;
use crate::error::{AuthError, Code};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const AUTHENTICATE_PATH: &str = "/shreddr.v1.AuthService/Authenticate";
pub const ISSUE_CHALLENGE_PATH: &str = "/shreddr.v1.AuthService/IssueChallenge";
pub const CREATE_USER_PATH: &str = "/shreddr.v1.UserService/CreateUser";
pub const GET_USER_PATH: &str = "/shreddr.v1.UserService/GetUser";
pub const GET_USER_BY_WALLET_PATH: &str = "/shreddr.v1.UserService/GetUserByWallet";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthService>,
}

/// Token carried in the body of protected requests.
#[derive(Debug, Deserialize)]
pub struct AuthHeader {
    pub jwt: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserRequest {
    #[serde(default)]
    pub auth_header: Option<AuthHeader>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserByWalletRequest {
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserRecord,
}

/// Build the RPC router with all endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route(AUTHENTICATE_PATH, post(authenticate))
        .route(ISSUE_CHALLENGE_PATH, post(issue_challenge))
        .route(CREATE_USER_PATH, post(create_user))
        .route(GET_USER_PATH, post(get_user))
        .route(GET_USER_BY_WALLET_PATH, post(get_user_by_wallet))
        .with_state(state)
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = match code {
            Code::InvalidArgument => StatusCode::BAD_REQUEST,
            Code::Unauthenticated => StatusCode::UNAUTHORIZED,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
            Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "code": code.as_str(),
            "message": self.public_message(),
        }));

        (status, body).into_response()
    }
}

async fn health() -> &'static str {
    "howdy!"
}

/// POST /shreddr.v1.AuthService/Authenticate
async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, AuthError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let response = state.auth.authenticate(request).await?;
    Ok(Json(response))
}

/// POST /shreddr.v1.AuthService/IssueChallenge
async fn issue_challenge(State(state): State<AppState>) -> Result<Json<Challenge>, AuthError> {
    Ok(Json(state.auth.issue_challenge()?))
}

/// POST /shreddr.v1.UserService/CreateUser
async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Json<CreateUserResponse>, AuthError> {
    let Json(request) = payload.map_err(invalid_body)?;
    state.auth.create_user(request).await?;
    Ok(Json(CreateUserResponse { success: true }))
}

/// POST /shreddr.v1.UserService/GetUser
///
/// The token is read from `authHeader.jwt`, falling back to an
/// `Authorization: Bearer` header when the body carries none.
async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<GetUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AuthError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let token = request
        .auth_header
        .map(|h| h.jwt)
        .filter(|jwt| !jwt.trim().is_empty())
        .or_else(|| bearer_token(&headers).map(str::to_string))
        .unwrap_or_default();

    let user = state.auth.get_user(&token).await?;
    Ok(Json(UserResponse { user }))
}

/// POST /shreddr.v1.UserService/GetUserByWallet
async fn get_user_by_wallet(
    State(state): State<AppState>,
    payload: Result<Json<GetUserByWalletRequest>, JsonRejection>,
) -> Result<Json<UserResponse>, AuthError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let user = state.auth.get_user_by_wallet(&request.wallet_address).await?;
    Ok(Json(UserResponse { user }))
}

/// Credentials of an `Authorization` header using the `Bearer` scheme.
///
/// The scheme name is matched case-insensitively.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn invalid_body(rejection: JsonRejection) -> AuthError {
    AuthError::InvalidArgument(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    /// Extract status code and JSON body from an AuthError response.
    async fn error_response(err: AuthError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_internal_hides_details() {
        let (status, body) = error_response(AuthError::Internal(
            "connection refused at 10.0.0.5:5432".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "internal");
        assert_eq!(body["message"], "internal error");
    }

    #[tokio::test]
    async fn test_invalid_argument() {
        let (status, body) =
            error_response(AuthError::InvalidArgument("invalid public key".to_string())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_argument");
        assert_eq!(body["message"], "invalid public key");
    }

    #[tokio::test]
    async fn test_unauthenticated() {
        let (status, body) =
            error_response(AuthError::Unauthenticated("invalid signature".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "unauthenticated");
    }

    #[tokio::test]
    async fn test_not_found() {
        let (status, body) = error_response(AuthError::NotFound("user x".to_string())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[test]
    fn test_bearer_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        for value in ["bearer abc.def.ghi", "BEARER abc.def.ghi", "Bearer  abc.def.ghi"] {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
            assert_eq!(bearer_token(&headers), Some("abc.def.ghi"), "header {}", value);
        }

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearerabc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn test_resource_exhausted() {
        let (status, body) = error_response(AuthError::ResourceExhausted(
            "too many outstanding challenges".to_string(),
        ))
        .await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["code"], "resource_exhausted");
    }
}
