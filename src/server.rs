use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, patch, post};
use axum::Router;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::auth::protect;

pub async fn run() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt::init();

    // Programming faults are process-fatal: log, then leave the restart to
    // the external supervisor
    install_panic_exit_hook();

    let config = crate::config::config();
    tracing::info!("Starting Bazaar API in {:?} mode", config.environment);

    let app = app();

    // Allow tests or deployments to override port via env
    let port = std::env::var("BAZAAR_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(8000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Bazaar API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close_all().await;
    Ok(())
}

fn install_panic_exit_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_hook(info);
        tracing::error!("Fatal fault, shutting down: {}", info);
        std::process::exit(1);
    }));
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

pub fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(user_routes())
        .merge(product_routes())
        .merge(review_routes())
        .fallback(unknown_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn user_routes() -> Router {
    use crate::handlers::{auth, users};

    let public = Router::new()
        .route("/api/v1/users/signup", post(auth::signup))
        .route("/api/v1/users/login", post(auth::login))
        .route("/api/v1/users/forgot-password", post(auth::forgot_password))
        .route(
            "/api/v1/users/reset-password/:token",
            get(auth::reset_password),
        );

    let protected = Router::new()
        .route("/api/v1/users/update-password", patch(auth::update_password))
        .route(
            "/api/v1/users/my-account",
            get(users::my_account)
                .patch(users::update_my_account)
                .delete(users::delete_my_account),
        )
        // Legacy aliases for the account mutations
        .route(
            "/api/v1/users/update-my-account",
            patch(users::update_my_account),
        )
        .route(
            "/api/v1/users/delete-my-account",
            axum::routing::delete(users::delete_my_account),
        )
        // Admin-only from here down; the handlers enforce the role predicate
        .route(
            "/api/v1/users",
            get(users::get_all_users).post(users::create_user),
        )
        .route(
            "/api/v1/users/:id",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        .route_layer(axum::middleware::from_fn(protect));

    public.merge(protected)
}

fn product_routes() -> Router {
    use crate::handlers::{products, reviews};

    let public = Router::new()
        .route("/api/v1/products", get(products::get_all_products))
        .route("/api/v1/products/product-stats", get(products::product_stats))
        .route(
            "/api/v1/products/products-within/:distance/center/:latlng/unit/:unit",
            get(products::products_within),
        )
        .route(
            "/api/v1/products/products-near/:latlng/unit/:unit",
            get(products::products_near),
        )
        .route("/api/v1/products/:id", get(products::get_product));

    let protected = Router::new()
        .route("/api/v1/products", post(products::create_product))
        .route(
            "/api/v1/products/monthly-plan/:year",
            get(products::monthly_plan),
        )
        .route(
            "/api/v1/products/:id",
            patch(products::update_product).delete(products::delete_product),
        )
        // Nested reviews scoped to one product
        .route(
            "/api/v1/products/:id/reviews",
            get(reviews::get_product_reviews).post(reviews::create_review),
        )
        .route_layer(axum::middleware::from_fn(protect));

    public.merge(protected)
}

fn review_routes() -> Router {
    use crate::handlers::reviews;

    Router::new()
        .route(
            "/api/v1/reviews/:id",
            get(reviews::get_review)
                .patch(reviews::update_review)
                .delete(reviews::delete_review),
        )
        .route_layer(axum::middleware::from_fn(protect))
}

async fn unknown_route(uri: axum::http::Uri) -> ApiError {
    ApiError::not_found(format!(
        "Cannot find this route: {} on our servers!",
        uri.path()
    ))
}

async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "message": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
