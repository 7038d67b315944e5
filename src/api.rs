//! HTTP surface - a thin JSON wrapper over the verdict pipeline
//!
//! Two routes: `POST /query` runs the pipeline, `GET /health` answers
//! liveness probes. An empty query is the caller's fault (400); every
//! other pipeline failure comes back as 500 with the same response shape
//! as a success, so clients can always read `answer` and the two
//! reference arrays.

use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use serde::Deserialize;

use crate::verdict::{RulingResponse, VerdictError, VerdictOrchestrator};

/// Shared server state.
pub struct AppState {
    pub orchestrator: Arc<VerdictOrchestrator>,
}

/// Query request payload.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

/// Run the server until shutdown.
pub async fn serve(orchestrator: Arc<VerdictOrchestrator>, host: &str, port: u16) -> Result<()> {
    let state = web::Data::new(AppState { orchestrator });
    let bind_addr = format!("{}:{}", host, port);

    tracing::info!("Starting server on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .route("/query", web::post().to(query_handler))
            .route("/health", web::get().to(health_handler))
    })
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind to {}", bind_addr))?
    .run()
    .await
    .context("Server error")
}

async fn query_handler(
    state: web::Data<AppState>,
    request: web::Json<QueryRequest>,
) -> HttpResponse {
    match state.orchestrator.handle(&request.query).await {
        Ok(response) => HttpResponse::Ok().json(response),
        Err(VerdictError::EmptyQuery) => HttpResponse::BadRequest().json(serde_json::json!({
            "error": VerdictError::EmptyQuery.to_string(),
        })),
        Err(e) => {
            tracing::error!("Query pipeline failed: {}", e);
            HttpResponse::InternalServerError().json(RulingResponse {
                answer: e.to_string(),
                references: vec![],
                precedent_references: vec![],
            })
        }
    }
}

async fn health_handler() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// Tests
// ============================================================================
