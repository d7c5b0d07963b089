use axum::{
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware;

pub fn app() -> Router {
    let protected_routes = Router::new()
        .route("/api/auth/whoami", get(protected::auth::whoami))
        .route(
            "/api/employees",
            get(protected::employees::list).post(protected::employees::create),
        )
        .route("/api/employees/find", post(protected::employees::find))
        .route(
            "/api/employees/:id",
            get(protected::employees::get)
                .put(protected::employees::update)
                .delete(protected::employees::remove),
        )
        .route("/api/leads", get(protected::leads::list).post(protected::leads::create))
        .route("/api/leads/find", post(protected::leads::find))
        .route("/api/leads/stats", post(protected::leads::stats))
        .route(
            "/api/leads/:id",
            get(protected::leads::get)
                .put(protected::leads::update)
                .delete(protected::leads::remove),
        )
        // The request-boundary interceptor: everything below runs inside a
        // tenant scope or not at all.
        .layer(axum::middleware::from_fn(middleware::auth::require_auth));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", post(public::auth::login))
        .merge(protected_routes)
        .layer(axum::middleware::from_fn(middleware::telemetry::track_requests))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    if crate::config::config().security.enable_cors {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    }
}

pub async fn serve(port: Option<u16>) -> anyhow::Result<()> {
    let port = port
        .or_else(|| std::env::var("CREWDESK_API_PORT").ok().and_then(|s| s.parse().ok()))
        .or_else(|| std::env::var("PORT").ok().and_then(|s| s.parse().ok()))
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("crewdesk api listening on http://{}", bind_addr);

    axum::serve(listener, app()).await?;
    Ok(())
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "CrewDesk API",
            "version": version,
            "description": "Multi-tenant HR/CRM backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "login": "/auth/login (public - token acquisition)",
                "auth": "/api/auth/whoami (protected)",
                "employees": "/api/employees[/:id], /api/employees/find (protected)",
                "leads": "/api/leads[/:id], /api/leads/find, /api/leads/stats (protected)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::Database::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": { "status": "ok", "timestamp": now, "database": "ok" }
            })),
        ),
        Err(e) => (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            axum::response::Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": { "status": "degraded", "timestamp": now, "database_error": e.to_string() }
            })),
        ),
    }
}
