pub mod auth;

pub use auth::{protect, restrict_to, CurrentUser};
