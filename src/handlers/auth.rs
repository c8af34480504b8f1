use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Extension, Json};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::api::response;
use crate::auth::{password, reset};
use crate::database::models::user::{
    ForgotPasswordBody, LoginUser, ResetPasswordBody, SignupRole, SignupUser, UpdatePasswordBody,
    User,
};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::mailer::Mailer;
use crate::middleware::CurrentUser;

/// POST /api/v1/users/signup
pub async fn signup(Json(body): Json<Value>) -> Result<Response, ApiError> {
    let input: SignupUser = parse_body(body)?;
    input.validate()?;

    let password_hash = password::hash_password(&input.password)?;

    // Sellers start with the baseline rating aggregate
    let (rating, ratings_quantity) = match input.role {
        SignupRole::Seller => (Some(4.5_f64), Some(0_i32)),
        SignupRole::User => (None, None),
    };

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, name, role, email, photo, password_hash, rating, ratings_quantity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&input.name)
    .bind(input.role.as_role().as_str())
    .bind(input.email.to_lowercase())
    .bind(&input.photo)
    .bind(&password_hash)
    .bind(rating)
    .bind(ratings_quantity)
    .fetch_one(&pool)
    .await
    .map_err(ApiError::from)?;

    response::send_token(to_json(&user)?, StatusCode::CREATED)
}

/// POST /api/v1/users/login
pub async fn login(Json(body): Json<Value>) -> Result<Response, ApiError> {
    let input: LoginUser = parse_body(body)?;
    let (Some(email), Some(candidate)) = (input.email, input.password) else {
        return Err(ApiError::bad_request("Email and password are required!"));
    };

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND active")
        .bind(email.to_lowercase())
        .fetch_optional(&pool)
        .await
        .map_err(ApiError::from)?;

    // Unknown email and wrong password must be indistinguishable
    let Some(user) = user else {
        return Err(invalid_credentials());
    };
    if !password::verify_password(&candidate, &user.password_hash)? {
        return Err(invalid_credentials());
    }

    response::send_token(to_json(&user)?, StatusCode::OK)
}

/// POST /api/v1/users/forgot-password
pub async fn forgot_password(Json(body): Json<Value>) -> Result<Response, ApiError> {
    let input: ForgotPasswordBody = parse_body(body)?;
    let Some(email) = input.email else {
        return Err(ApiError::bad_request("Email is required to reset password!"));
    };

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1 AND active")
        .bind(email.to_lowercase())
        .fetch_optional(&pool)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| {
            ApiError::not_found("No user was found with this email! Try again later.")
        })?;

    let token = reset::generate();
    sqlx::query(
        "UPDATE users SET password_reset_token = $1, password_reset_expires_at = $2 WHERE id = $3",
    )
    .bind(&token.hashed)
    .bind(token.expires_at)
    .bind(user.id)
    .execute(&pool)
    .await
    .map_err(ApiError::from)?;

    let reset_url = format!("/api/v1/users/reset-password/{}", token.plaintext);
    let message = format!(
        "Forgot your password? Submit your new password to the following link\n{}\n\
         Your reset token is only valid for 10 minutes!",
        reset_url
    );

    let mailer = Mailer::from_config()?;
    match mailer.send(&user.email, "Forgot Your Password?", &message).await {
        Ok(()) => Ok(response::ok_message(
            "A reset token was sent to your email on file!",
        )),
        Err(_) => {
            // Roll back the issued token before surfacing the failure
            sqlx::query(
                "UPDATE users SET password_reset_token = NULL, password_reset_expires_at = NULL \
                 WHERE id = $1",
            )
            .bind(user.id)
            .execute(&pool)
            .await
            .map_err(ApiError::from)?;
            Err(ApiError::internal(
                "We are unable to send email at this time! Try again later.",
            ))
        }
    }
}

/// GET /api/v1/users/reset-password/:token
pub async fn reset_password(
    Path(token): Path<String>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let input: ResetPasswordBody = parse_body(body)?;
    input.validate()?;

    let hashed = reset::hash_token(&token);
    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users \
         WHERE password_reset_token = $1 AND password_reset_expires_at > now() AND active",
    )
    .bind(&hashed)
    .fetch_optional(&pool)
    .await
    .map_err(ApiError::from)?
    .ok_or_else(|| ApiError::bad_request("Invalid or Expired token!"))?;

    let password_hash = password::hash_password(&input.password)?;

    // Single use: clear the token; back-date the rotation stamp by a second
    // so the session token issued below stays valid
    sqlx::query(
        "UPDATE users SET password_hash = $1, \
         password_reset_token = NULL, password_reset_expires_at = NULL, \
         password_changed_at = now() - interval '1 second' \
         WHERE id = $2",
    )
    .bind(&password_hash)
    .bind(user.id)
    .execute(&pool)
    .await
    .map_err(ApiError::from)?;

    response::send_token(to_json(&user)?, StatusCode::OK)
}

/// PATCH /api/v1/users/update-password (protected)
pub async fn update_password(
    Extension(actor): Extension<CurrentUser>,
    Json(body): Json<Value>,
) -> Result<Response, ApiError> {
    let input: UpdatePasswordBody = parse_body(body)?;
    let Some(current) = input.current_password.as_deref() else {
        return Err(ApiError::bad_request("Current password is required!"));
    };
    input.validate()?;

    let pool = DatabaseManager::pool().await?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND active")
        .bind(actor.id)
        .fetch_one(&pool)
        .await
        .map_err(ApiError::from)?;

    if !password::verify_password(current, &user.password_hash)? {
        return Err(ApiError::not_found("Incorrect password! Try again."));
    }

    let password_hash = password::hash_password(&input.password)?;
    sqlx::query(
        "UPDATE users SET password_hash = $1, \
         password_changed_at = now() - interval '1 second' \
         WHERE id = $2",
    )
    .bind(&password_hash)
    .bind(user.id)
    .execute(&pool)
    .await
    .map_err(ApiError::from)?;

    response::send_token(to_json(&user)?, StatusCode::OK)
}

pub(crate) fn parse_body<T: serde::de::DeserializeOwned>(body: Value) -> Result<T, ApiError> {
    serde_json::from_value(body).map_err(|e| ApiError::Validation(vec![e.to_string()]))
}

pub(crate) fn to_json(user: &User) -> Result<Value, ApiError> {
    serde_json::to_value(user)
        .map_err(|e| ApiError::internal(format!("failed to serialize user: {}", e)))
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Incorrect email or password!")
}
