use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Identity roles. Admin accounts are provisioned out of band; signup only
/// accepts user and seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Seller,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Seller => "seller",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "seller" => Ok(Role::Seller),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub role: String,
    pub email: String,
    pub photo: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub rating: Option<f64>,
    pub ratings_quantity: Option<i32>,
    #[serde(skip_serializing)]
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::from_str(&self.role).unwrap_or(Role::User)
    }

    /// True when the stored credential was rotated after the token was issued
    pub fn password_changed_after(&self, token_issued_at: i64) -> bool {
        match self.password_changed_at {
            Some(changed_at) => token_issued_at < changed_at.timestamp(),
            None => false,
        }
    }
}

/// Roles self-registration may claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignupRole {
    User,
    Seller,
}

impl SignupRole {
    pub fn as_role(&self) -> Role {
        match self {
            SignupRole::User => Role::User,
            SignupRole::Seller => Role::Seller,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupUser {
    #[validate(length(min = 1, message = "Each user must have a name!"))]
    pub name: String,
    pub role: SignupRole,
    #[validate(email(message = "Please provide a valid email address!"))]
    pub email: String,
    pub photo: Option<String>,
    #[validate(length(min = 8, message = "Your password must be at least 8 characters long!"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match! Please try again."))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginUser {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordBody {
    #[validate(length(min = 8, message = "Your password must be at least 8 characters long!"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match! Please try again."))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordBody {
    pub current_password: Option<String>,
    #[validate(length(min = 8, message = "Your password must be at least 8 characters long!"))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords must match! Please try again."))]
    pub password_confirm: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateMyAccountBody {
    pub current_password: Option<String>,
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email address!"))]
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteMyAccountBody {
    pub current_password: Option<String>,
}

/// Admin-side partial update accepted by the generic update operation
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct AdminUpdateUser {
    #[validate(length(min = 1, message = "Each user must have a name!"))]
    pub name: Option<String>,
    #[validate(email(message = "Please provide a valid email address!"))]
    pub email: Option<String>,
    pub photo: Option<String>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}
