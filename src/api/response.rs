use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{generate_jwt, Claims};
use crate::config;
use crate::error::ApiError;

/// Success envelope helpers: { status, data, results?, message?, token? }

pub fn ok_one(key: &str, record: Value) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "data": { key: record } })),
    )
        .into_response()
}

pub fn created(key: &str, record: Value) -> Response {
    (
        StatusCode::CREATED,
        Json(json!({ "status": "success", "data": { key: record } })),
    )
        .into_response()
}

pub fn ok_list(key: &str, records: Vec<Value>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "results": records.len(),
            "data": { key: records },
        })),
    )
        .into_response()
}

pub fn ok_message(message: &str) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "message": message })),
    )
        .into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Issue a session token for the identity and respond with it twice: as an
/// HTTP-only cookie and as a `token` field next to the serialized user.
pub fn send_token(user: Value, status: StatusCode) -> Result<Response, ApiError> {
    let user_id = user
        .get("id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| ApiError::internal("identity record is missing an id"))?;

    let token = generate_jwt(Claims::new(user_id))?;
    let cookie = build_cookie(&token);

    let body = json!({
        "status": "success",
        "token": token,
        "data": { "user": user },
    });

    let mut response = (status, Json(body)).into_response();
    let cookie_value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::internal(format!("invalid cookie header: {}", e)))?;
    response.headers_mut().insert(header::SET_COOKIE, cookie_value);
    Ok(response)
}

fn build_cookie(token: &str) -> String {
    let security = &config::config().security;
    let expires = Utc::now() + Duration::days(security.cookie_expires_days);
    let mut cookie = format!(
        "jwt={}; Path=/; HttpOnly; Expires={}",
        token,
        expires.format("%a, %d %b %Y %H:%M:%S GMT")
    );
    if security.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_is_http_only_with_expiry() {
        let cookie = build_cookie("token-value");
        assert!(cookie.starts_with("jwt=token-value"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Expires="));
    }

    #[test]
    fn send_token_requires_an_id() {
        let result = send_token(json!({ "name": "no id" }), StatusCode::OK);
        assert!(result.is_err());
    }

    #[test]
    fn send_token_sets_cookie_header() {
        let user = json!({ "id": Uuid::new_v4().to_string(), "name": "Alice" });
        let response = send_token(user, StatusCode::CREATED).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        assert!(cookie.starts_with("jwt="));
    }
}
