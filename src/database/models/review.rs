use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateReview {
    #[validate(range(min = 1.0, max = 5.0, message = "Each review requires a rating between 1 and 5."))]
    pub rating: f64,
    #[validate(length(min = 1, message = "Each review must have some text"))]
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateReview {
    #[validate(range(min = 1.0, max = 5.0, message = "Each review requires a rating between 1 and 5."))]
    pub rating: Option<f64>,
    #[validate(length(min = 1, message = "Each review must have some text"))]
    pub body: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rating_must_stay_in_range() {
        let review: CreateReview =
            serde_json::from_value(json!({ "rating": 6.0, "body": "too good" })).unwrap();
        assert!(review.validate().is_err());

        let review: CreateReview =
            serde_json::from_value(json!({ "rating": 4.5, "body": "great" })).unwrap();
        assert!(review.validate().is_ok());
    }

    #[test]
    fn body_must_be_non_empty() {
        let review: CreateReview =
            serde_json::from_value(json!({ "rating": 3.0, "body": "" })).unwrap();
        assert!(review.validate().is_err());
    }
}
