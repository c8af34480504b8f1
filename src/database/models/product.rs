use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Boy,
    Girl,
    Unisex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Toys,
    Clothes,
    Accessories,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quality {
    New,
    Used,
    BarelyUsed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    CNY,
}

/// 2D point with optional place labels, stored as JSONB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lng: f64,
    pub lat: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProduct {
    #[validate(length(min = 10, message = "Each product must be at least 10 characters long."))]
    pub name: String,
    pub gender: Gender,
    pub category: Option<Category>,
    #[validate(length(min = 1, message = "Each product must have a size."))]
    pub size: String,
    #[validate(range(min = 0.0, max = 5.0, message = "Products cannot be more than $5.00!"))]
    pub price: f64,
    pub price_currency: Currency,
    pub price_discount: Option<f64>,
    #[validate(length(min = 1, message = "Each product must have a cover image."))]
    pub image_cover: String,
    pub images: Option<Vec<String>>,
    pub location: Option<GeoPoint>,
    #[validate(range(min = 0, message = "Quantity cannot be less than 0."))]
    pub quantity: i32,
    pub quality: Quality,
    #[validate(length(min = 1, message = "Each product must have a brand."))]
    pub brand: String,
    #[validate(length(min = 1, message = "Each product must have a color."))]
    pub color: String,
    #[validate(length(min = 1, message = "Each product must have a summary."))]
    pub summary: String,
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct UpdateProduct {
    #[validate(length(min = 10, message = "Each product must be at least 10 characters long."))]
    pub name: Option<String>,
    pub gender: Option<Gender>,
    pub category: Option<Category>,
    #[validate(length(min = 1, message = "Each product must have a size."))]
    pub size: Option<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "Products cannot be more than $5.00!"))]
    pub price: Option<f64>,
    pub price_currency: Option<Currency>,
    pub price_discount: Option<f64>,
    #[validate(length(min = 1, message = "Each product must have a cover image."))]
    pub image_cover: Option<String>,
    pub images: Option<Vec<String>>,
    pub location: Option<GeoPoint>,
    #[validate(range(min = 0, message = "Quantity cannot be less than 0."))]
    pub quantity: Option<i32>,
    pub quality: Option<Quality>,
    #[validate(length(min = 1, message = "Each product must have a brand."))]
    pub brand: Option<String>,
    #[validate(length(min = 1, message = "Each product must have a color."))]
    pub color: Option<String>,
    #[validate(length(min = 1, message = "Each product must have a summary."))]
    pub summary: Option<String>,
    pub description: Option<String>,
}

/// Lowercase URL slug derived from the product name on every save
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut previous_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            previous_dash = false;
        } else if !previous_dash {
            slug.push('-');
            previous_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Wooden Train Set Deluxe"), "wooden-train-set-deluxe");
        assert_eq!(slugify("Rain Boots (Size 4)"), "rain-boots-size-4");
        assert_eq!(slugify("  Dotted  Dress  "), "dotted-dress");
    }

    #[test]
    fn create_product_enforces_name_and_price_limits() {
        let body: CreateProduct = serde_json::from_value(json!({
            "name": "short",
            "gender": "boy",
            "size": "4T",
            "price": 9.5,
            "price_currency": "USD",
            "image_cover": "cover.jpg",
            "quantity": 3,
            "quality": "used",
            "brand": "Acme",
            "color": "red",
            "summary": "A perfectly fine toy for small children, gently used."
        }))
        .unwrap();

        let errors = crate::error::ApiError::from(body.validate().unwrap_err());
        let message = errors.message();
        assert!(message.contains("at least 10 characters"));
        assert!(message.contains("$5.00"));
    }

    #[test]
    fn unknown_enum_values_are_rejected() {
        let result = serde_json::from_value::<CreateProduct>(json!({
            "name": "A very long product name",
            "gender": "robot",
            "size": "4T",
            "price": 3.0,
            "price_currency": "USD",
            "image_cover": "cover.jpg",
            "quantity": 3,
            "quality": "used",
            "brand": "Acme",
            "color": "red",
            "summary": "Summary text."
        }));
        assert!(result.is_err());
    }

    #[test]
    fn quality_uses_kebab_case() {
        let quality: Quality = serde_json::from_value(json!("barely-used")).unwrap();
        assert_eq!(quality, Quality::BarelyUsed);
    }
}
