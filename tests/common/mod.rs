use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Integration tests need a live Postgres; without one they skip cleanly.
pub fn database_available() -> bool {
    std::env::var("DATABASE_URL").is_ok()
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        // Assumes debug profile; adjust if you run tests with --release
        let mut cmd = Command::new("target/debug/bazaar-api");
        cmd.env("BAZAAR_API_PORT", port.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL and JWT_SECRET
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self {
            port,
            base_url,
            child,
        })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK
                    || resp.status() == StatusCode::SERVICE_UNAVAILABLE
                {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!(
            "server did not become ready on {} within {:?}",
            self.base_url,
            timeout
        )
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    ensure_schema().await?;
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Apply the idempotent schema so a fresh database works out of the box
async fn ensure_schema() -> Result<()> {
    let pool = bazaar_api::database::DatabaseManager::pool().await?;
    for statement in include_str!("../../sql/schema.sql").split(';') {
        let statement = statement.trim();
        if !statement.is_empty() {
            sqlx::query(statement).execute(&pool).await?;
        }
    }
    Ok(())
}

/// Register a fresh account and return (token, user payload, email, password)
pub async fn signup(
    client: &reqwest::Client,
    base_url: &str,
    role: &str,
) -> Result<(String, Value, String, String)> {
    let marker = uuid::Uuid::new_v4().simple().to_string();
    let email = format!("{}@test.local", marker);
    let password = format!("pw-{}", marker);

    let res = client
        .post(format!("{}/api/v1/users/signup", base_url))
        .json(&json!({
            "name": format!("Test {}", marker),
            "role": role,
            "email": email,
            "password": password,
            "password_confirm": password,
        }))
        .send()
        .await?;

    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "signup failed: {}",
        res.text().await?
    );

    let payload = res.json::<Value>().await?;
    let token = payload["token"]
        .as_str()
        .context("signup response missing token")?
        .to_string();
    let user = payload["data"]["user"].clone();
    Ok((token, user, email, password))
}

/// Create a product as the given seller and return its JSON record
pub async fn create_product(
    client: &reqwest::Client,
    base_url: &str,
    token: &str,
    overrides: Value,
) -> Result<Value> {
    let marker = uuid::Uuid::new_v4().simple().to_string();
    let mut body = json!({
        "name": format!("Integration test item {}", marker),
        "gender": "unisex",
        "category": "toys",
        "size": "one-size",
        "price": 3.0,
        "price_currency": "USD",
        "image_cover": "cover.jpg",
        "quantity": 1,
        "quality": "used",
        "brand": format!("brand-{}", marker),
        "color": "red",
        "summary": "Integration test product in good condition."
    });
    if let (Some(base), Some(extra)) = (body.as_object_mut(), overrides.as_object()) {
        for (k, v) in extra {
            base.insert(k.clone(), v.clone());
        }
    }

    let res = client
        .post(format!("{}/api/v1/products", base_url))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await?;

    anyhow::ensure!(
        res.status() == StatusCode::CREATED,
        "product create failed: {}",
        res.text().await?
    );

    let payload = res.json::<Value>().await?;
    Ok(payload["data"]["product"].clone())
}
