use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use uuid::Uuid;

use crate::auth::Claims;
use crate::config;
use crate::database::models::user::{Role, User};
use crate::database::DatabaseManager;
use crate::error::ApiError;

/// Authenticated identity attached to the request after `protect` succeeds
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role(),
        }
    }
}

/// Session-gate middleware: bearer token -> verified claims -> live identity.
/// Tokens issued before the identity's last credential rotation are rejected.
pub async fn protect(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers).map_err(ApiError::unauthorized)?;
    let claims = validate_jwt(&token)?;

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND active")
        .bind(claims.sub)
        .fetch_optional(&pool)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::unauthorized("This user no longer exists! Please log back in.")
        })?;

    if user.password_changed_after(claims.iat) {
        return Err(ApiError::unauthorized(
            "Your password recently changed! Please log back in.",
        ));
    }

    request.extensions_mut().insert(CurrentUser::from(&user));
    Ok(next.run(request).await)
}

/// Role predicate evaluated explicitly at the top of each gated operation
pub fn restrict_to(user: &CurrentUser, allowed: &[Role]) -> Result<(), ApiError> {
    if allowed.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::forbidden(
            "You do not have access to this resource!",
        ))
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))
        .ok_or_else(|| {
            "You are not logged in! Please log in before you can access this resource.".to_string()
        })?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty bearer token".to_string());
        }
        Ok(token.to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

/// Validate the session token and extract its claims
fn validate_jwt(token: &str) -> Result<Claims, ApiError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(ApiError::internal("JWT secret not configured"));
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)?;
    Ok(token_data.claims)
}
