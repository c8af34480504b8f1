use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::auth::password;
use crate::database::query_builder::QueryBuilder;
use crate::database::DatabaseManager;
use crate::services::ratings;

const SCHEMA_SQL: &str = include_str!("../../../sql/schema.sql");

#[derive(Subcommand)]
pub enum FixtureCommands {
    #[command(about = "Apply the schema and load the seed data set")]
    Import {
        #[arg(
            long,
            help = "Directory holding the seed JSON files",
            default_value = "fixtures"
        )]
        fixtures_dir: PathBuf,
    },

    #[command(about = "Delete all seeded data")]
    Delete,
}

pub async fn handle(cmd: FixtureCommands) -> Result<()> {
    match cmd {
        FixtureCommands::Import { fixtures_dir } => import(&fixtures_dir).await,
        FixtureCommands::Delete => delete().await,
    }
}

async fn import(fixtures_dir: &Path) -> Result<()> {
    let pool = DatabaseManager::pool().await?;

    // Schema statements are IF NOT EXISTS, so re-import is safe
    for statement in SCHEMA_SQL.split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement).execute(&pool).await?;
        }
    }

    let users = read_records(&fixtures_dir.join("users.json"))?;
    let user_count = users.len();
    for mut user in users {
        // Seed files carry plaintext passwords; store only the hash
        let plaintext = user
            .remove("password")
            .and_then(|v| v.as_str().map(str::to_string))
            .context("seed user is missing a password")?;
        let hash = password::hash_password(&plaintext)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
        user.insert("password_hash".to_string(), Value::String(hash));
        QueryBuilder::insert_json(&pool, "users", &user).await?;
    }

    let products = read_records(&fixtures_dir.join("products.json"))?;
    let product_count = products.len();
    for product in &products {
        QueryBuilder::insert_json(&pool, "products", product).await?;
    }

    let reviews = read_records(&fixtures_dir.join("reviews.json"))?;
    let review_count = reviews.len();
    for review in &reviews {
        QueryBuilder::insert_json(&pool, "reviews", review).await?;
    }

    // Bring the rating aggregates in line with the seeded reviews
    for product in &products {
        let id = product
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .context("seed product is missing an id")?;
        ratings::recompute_review_aggregates(&pool, id)
            .await
            .map_err(|e| anyhow::anyhow!("aggregate recompute failed: {}", e))?;
    }

    println!(
        "Imported {} users, {} products, {} reviews",
        user_count, product_count, review_count
    );
    Ok(())
}

async fn delete() -> Result<()> {
    let pool = DatabaseManager::pool().await?;

    sqlx::query("DELETE FROM reviews").execute(&pool).await?;
    sqlx::query("DELETE FROM products").execute(&pool).await?;
    sqlx::query("DELETE FROM users").execute(&pool).await?;

    println!("Database deleted!");
    Ok(())
}

fn read_records(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records: Vec<Map<String, Value>> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(records)
}
