use std::collections::HashMap;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::Query,
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRequest {
    pub grant_type: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub issued_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

/// Everything the server saw of an `/echo` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    /// Header names are lowercase.
    pub headers: HashMap<String, String>,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SlowParams {
    pub ms: Option<u64>,
}

pub fn app() -> Router {
    Router::new()
        .route("/token", post(token))
        .route("/echo", any(echo))
        .route("/slow", get(slow))
        .route("/broken", get(broken))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn oauth_error(error: &str, description: &str) -> (StatusCode, Json<serde_json::Value>) {
    let body = OAuthError {
        error: error.to_string(),
        error_description: Some(description.to_string()),
    };
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::to_value(body).unwrap_or_default()),
    )
}

async fn token(Json(input): Json<TokenRequest>) -> (StatusCode, Json<serde_json::Value>) {
    if input.grant_type != "password" {
        return oauth_error("unsupported_grant_type", "only the password grant is supported");
    }
    if input.username.as_deref() != Some(USERNAME) || input.password.as_deref() != Some(PASSWORD) {
        return oauth_error("invalid_grant", "bad username or password");
    }
    let token = Token {
        access_token: Uuid::new_v4().to_string(),
        token_type: "Bearer".to_string(),
        expires_in: 3600,
        issued_at: "2024-03-01T12:30:45.123+0000".to_string(),
    };
    (
        StatusCode::OK,
        Json(serde_json::to_value(token).unwrap_or_default()),
    )
}

async fn echo(
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    let body = if body.is_empty() {
        None
    } else {
        serde_json::from_slice(&body).ok()
    };
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query,
        headers,
        body,
    })
}

async fn slow(Query(params): Query<SlowParams>) -> Json<serde_json::Value> {
    let ms = params.ms.unwrap_or(500);
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "slept_ms": ms }))
}

async fn broken() -> &'static str {
    "this is not json"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_request_accepts_missing_credentials() {
        let input: TokenRequest = serde_json::from_str(r#"{"grant_type":"password"}"#).unwrap();
        assert_eq!(input.grant_type, "password");
        assert!(input.username.is_none());
    }

    #[test]
    fn token_request_rejects_missing_grant_type() {
        let result: Result<TokenRequest, _> = serde_json::from_str(r#"{"username":"alice"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn oauth_error_serializes_description() {
        let (status, Json(body)) = oauth_error("invalid_grant", "nope");
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_grant");
        assert_eq!(body["error_description"], "nope");
    }

    #[test]
    fn echo_roundtrips_through_json() {
        let echo = Echo {
            method: "GET".to_string(),
            path: "/echo".to_string(),
            query: HashMap::from([("q".to_string(), "1".to_string())]),
            headers: HashMap::new(),
            body: None,
        };
        let back: Echo = serde_json::from_str(&serde_json::to_string(&echo).unwrap()).unwrap();
        assert_eq!(back.query["q"], "1");
        assert!(back.body.is_none());
    }
}
