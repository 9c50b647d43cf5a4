use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use sheet_optimizer::EngineError;
use sheet_optimizer::catalog::SheetCatalog;
use sheet_optimizer::request::{
    BatchRequest, BatchResponse, CircularRequest, CircularResponse, RectangularRequest,
    RectangularResponse, optimize_batch, optimize_circular, optimize_rectangular,
};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

type ApiError = (StatusCode, String);

fn error_response(e: EngineError) -> ApiError {
    let status = match e {
        EngineError::InvalidDimension { .. } | EngineError::ThicknessMismatch { .. } => {
            StatusCode::BAD_REQUEST
        }
        EngineError::DivisionByZero | EngineError::NonFiniteResult { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        EngineError::Catalog(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    tracing::warn!(status = status.as_u16(), error = %e, "request rejected");
    (status, e.to_string())
}

async fn optimize_rect(
    State(catalog): State<Arc<SheetCatalog>>,
    Json(req): Json<RectangularRequest>,
) -> Result<Json<RectangularResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize/rectangular"
    );
    optimize_rectangular(&req, &catalog)
        .map(Json)
        .map_err(error_response)
}

async fn optimize_circle(
    State(catalog): State<Arc<SheetCatalog>>,
    Json(req): Json<CircularRequest>,
) -> Result<Json<CircularResponse>, ApiError> {
    tracing::info!(
        body = serde_json::to_string(&req).unwrap_or_default(),
        "POST /optimize/circular"
    );
    optimize_circular(&req, &catalog)
        .map(Json)
        .map_err(error_response)
}

async fn optimize_many(
    State(catalog): State<Arc<SheetCatalog>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, ApiError> {
    tracing::info!(items = req.items.len(), "POST /optimize/batch");
    // rayon work must not block the async workers
    tokio::task::spawn_blocking(move || optimize_batch(&req, &catalog))
        .await
        .map(Json)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

#[tokio::main]
async fn main() {
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open("development.log")
        .expect("failed to open development.log");

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_target(false)
        .with_ansi(false)
        .with_max_level(Level::INFO)
        .init();

    let _sentry = std::env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let catalog = match std::env::var("SHEET_CATALOG") {
        Ok(path) => SheetCatalog::load(std::path::Path::new(&path))
            .expect("failed to load SHEET_CATALOG"),
        Err(_) => SheetCatalog::default(),
    };
    tracing::info!(sizes = catalog.sizes.len(), "sheet catalog loaded");

    let port = std::env::var("PORT").unwrap_or_else(|_| "3001".to_string());
    let addr = format!("0.0.0.0:{port}");

    let app = Router::new()
        .route("/up", get(|| async { "ok" }))
        .route("/optimize/rectangular", post(optimize_rect))
        .route("/optimize/circular", post(optimize_circle))
        .route("/optimize/batch", post(optimize_many))
        .with_state(Arc::new(catalog))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        );

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    eprintln!("Listening on {addr}");
    axum::serve(listener, app).await.unwrap();
}
