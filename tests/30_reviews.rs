mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

// Nested review CRUD, the uniqueness invariant, and the rating aggregates.

#[tokio::test]
async fn review_create_then_delete_restores_product_aggregates() -> Result<()> {
    if !common::database_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (seller, _, _, _) = common::signup(&client, &server.base_url, "seller").await?;
    let (reviewer, _, _, _) = common::signup(&client, &server.base_url, "user").await?;
    let product = common::create_product(&client, &server.base_url, &seller, json!({})).await?;
    let product_id = product["id"].as_str().unwrap_or_default().to_string();

    // Pre-review baseline
    assert!(product["best_rating"].is_null());
    assert_eq!(product["ratings_quantity"].as_i64(), Some(0));

    let res = client
        .post(format!(
            "{}/api/v1/products/{}/reviews",
            server.base_url, product_id
        ))
        .bearer_auth(&reviewer)
        .json(&json!({ "rating": 4.0, "body": "Solid toy, arrived quickly." }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let review = res.json::<serde_json::Value>().await?["data"]["review"].clone();
    let review_id = review["id"].as_str().unwrap_or_default().to_string();

    // Aggregates follow the review
    let res = client
        .get(format!("{}/api/v1/products/{}", server.base_url, product_id))
        .send()
        .await?;
    let fetched = res.json::<serde_json::Value>().await?["data"]["product"].clone();
    assert_eq!(fetched["best_rating"].as_f64(), Some(4.0));
    assert_eq!(fetched["ratings_quantity"].as_i64(), Some(1));

    // Deleting the review restores the pre-creation aggregate
    let res = client
        .delete(format!("{}/api/v1/reviews/{}", server.base_url, review_id))
        .bearer_auth(&reviewer)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(format!("{}/api/v1/products/{}", server.base_url, product_id))
        .send()
        .await?;
    let fetched = res.json::<serde_json::Value>().await?["data"]["product"].clone();
    assert!(fetched["best_rating"].is_null());
    assert_eq!(fetched["ratings_quantity"].as_i64(), Some(0));
    Ok(())
}

#[tokio::test]
async fn one_review_per_identity_and_product() -> Result<()> {
    if !common::database_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (seller, _, _, _) = common::signup(&client, &server.base_url, "seller").await?;
    let (reviewer, _, _, _) = common::signup(&client, &server.base_url, "user").await?;
    let product = common::create_product(&client, &server.base_url, &seller, json!({})).await?;
    let product_id = product["id"].as_str().unwrap_or_default();

    let url = format!("{}/api/v1/products/{}/reviews", server.base_url, product_id);
    let res = client
        .post(&url)
        .bearer_auth(&reviewer)
        .json(&json!({ "rating": 5.0, "body": "First impressions are great." }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);

    let res = client
        .post(&url)
        .bearer_auth(&reviewer)
        .json(&json!({ "rating": 1.0, "body": "Changed my mind." }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let payload = res.json::<serde_json::Value>().await?;
    assert!(payload["message"]
        .as_str()
        .unwrap_or_default()
        .contains("Duplicate value"));
    Ok(())
}

#[tokio::test]
async fn sellers_cannot_review_and_strangers_cannot_edit() -> Result<()> {
    if !common::database_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (seller, _, _, _) = common::signup(&client, &server.base_url, "seller").await?;
    let (reviewer, _, _, _) = common::signup(&client, &server.base_url, "user").await?;
    let (other_user, _, _, _) = common::signup(&client, &server.base_url, "user").await?;
    let product = common::create_product(&client, &server.base_url, &seller, json!({})).await?;
    let product_id = product["id"].as_str().unwrap_or_default();

    // Review creation is restricted to the user role
    let res = client
        .post(format!(
            "{}/api/v1/products/{}/reviews",
            server.base_url, product_id
        ))
        .bearer_auth(&seller)
        .json(&json!({ "rating": 5.0, "body": "Reviewing my own product." }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!(
            "{}/api/v1/products/{}/reviews",
            server.base_url, product_id
        ))
        .bearer_auth(&reviewer)
        .json(&json!({ "rating": 3.0, "body": "It is fine." }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let review_id = res.json::<serde_json::Value>().await?["data"]["review"]["id"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    // Only the author (or an admin) may mutate the review
    let res = client
        .patch(format!("{}/api/v1/reviews/{}", server.base_url, review_id))
        .bearer_auth(&other_user)
        .json(&json!({ "rating": 1.0 }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn nested_listing_is_scoped_to_the_product() -> Result<()> {
    if !common::database_available() {
        eprintln!("skipping: DATABASE_URL not set");
        return Ok(());
    }
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let (seller, _, _, _) = common::signup(&client, &server.base_url, "seller").await?;
    let (reviewer, _, _, _) = common::signup(&client, &server.base_url, "user").await?;
    let first = common::create_product(&client, &server.base_url, &seller, json!({})).await?;
    let second = common::create_product(&client, &server.base_url, &seller, json!({})).await?;

    for (product, rating) in [(&first, 5.0), (&second, 2.0)] {
        let res = client
            .post(format!(
                "{}/api/v1/products/{}/reviews",
                server.base_url,
                product["id"].as_str().unwrap_or_default()
            ))
            .bearer_auth(&reviewer)
            .json(&json!({ "rating": rating, "body": "Scoped listing test." }))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::CREATED);
    }

    let res = client
        .get(format!(
            "{}/api/v1/products/{}/reviews",
            server.base_url,
            first["id"].as_str().unwrap_or_default()
        ))
        .bearer_auth(&reviewer)
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let payload = res.json::<serde_json::Value>().await?;
    assert_eq!(payload["results"].as_u64(), Some(1));
    let reviews = payload["data"]["reviews"].as_array().cloned().unwrap_or_default();
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0]["rating"].as_f64(), Some(5.0));
    Ok(())
}
