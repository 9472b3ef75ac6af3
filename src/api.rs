//! HTTP API for the pension engine.
//!
//! This module exposes a minimal REST API around [`crate::engine`]
//! using the [`axum`](https://crates.io/crates/axum) framework.  Clients
//! submit one subject (or a batch) and receive the analysis report as
//! JSON.  Every request shares the same read-only [`EngineConfig`].

use crate::config::EngineConfig;
use crate::engine::{analyze, analyze_batch};
use crate::error::CalcError;
use crate::models::{AnalysisReport, SubjectInput};
use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

/// Application state shared across requests.
pub struct AppState {
    pub config: EngineConfig,
}

/// Errors surfaced by the handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The subject could not be analysed at all.
    Unprocessable(CalcError),
    Internal(String),
}

impl From<CalcError> for ApiError {
    fn from(err: CalcError) -> Self {
        Self::Unprocessable(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            Self::Unprocessable(err) => (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE_INPUT", err.to_string()),
            Self::Internal(message) => {
                tracing::error!(error = %message, "internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
            }
        };
        let body = Json(serde_json::json!({"error": {"code": code, "message": message}}));
        (status, body).into_response()
    }
}

/// One entry of a batch response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Report(Box<AnalysisReport>),
    Error { subject_id: Option<String>, error: String },
}

/// Build the API router around the given configuration.  Returns the
/// router and a handle to the state.
pub fn build_router(config: EngineConfig) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState { config });
    let router = Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route("/api/analyze/batch", post(batch_handler))
        .with_state(state.clone());
    (router, state)
}

/// Handler for POST /api/analyze
async fn analyze_handler(
    State(app_state): State<Arc<AppState>>,
    Json(input): Json<SubjectInput>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let report = analyze(&input, &app_state.config)?;
    Ok(Json(report))
}

/// Handler for POST /api/analyze/batch
async fn batch_handler(
    State(app_state): State<Arc<AppState>>,
    Json(inputs): Json<Vec<SubjectInput>>,
) -> Result<Json<Vec<BatchEntry>>, ApiError> {
    // The batch runs on the rayon pool; keep it off the async workers.
    let entries = tokio::task::spawn_blocking(move || {
        let results = analyze_batch(&inputs, &app_state.config);
        inputs
            .iter()
            .zip(results)
            .map(|(input, result)| match result {
                Ok(report) => BatchEntry::Report(Box::new(report)),
                Err(err) => BatchEntry::Error {
                    subject_id: input.subject_id.clone(),
                    error: err.to_string(),
                },
            })
            .collect::<Vec<_>>()
    })
    .await
    .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(Json(entries))
}

/// Launch the API server on `addr`.  It blocks until the server
/// terminates.
pub async fn serve(addr: &str, config: EngineConfig) -> Result<()> {
    let (router, _state) = build_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "server listening");
    axum::serve(listener, router).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> Arc<AppState> {
        build_router(EngineConfig::default()).1
    }

    fn input(issued_on: &str) -> SubjectInput {
        serde_json::from_value(serde_json::json!({
            "subject_id": "S1",
            "issued_on": issued_on,
            "first_registration": "01/02/1990",
            "reported_total_weeks": 1200,
            "periods": [
                {"employer": "ACME", "start": "01/01/2020", "end": "31/12/2020", "daily_wage": 400.0}
            ]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_analyze_ok() {
        let Json(report) = analyze_handler(State(state()), Json(input("2025-01-29"))).await.unwrap();
        assert_eq!(report.subject_id.as_deref(), Some("S1"));
        let conservation = report.conservation.unwrap();
        assert_eq!(conservation.recognized_weeks, 1200);
        assert_eq!(conservation.duration.weeks, 300);
    }

    #[tokio::test]
    async fn test_malformed_issuance_is_unprocessable() {
        let err = analyze_handler(State(state()), Json(input("someday"))).await.unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_batch_mixes_reports_and_errors() {
        let Json(entries) = batch_handler(State(state()), Json(vec![input("2025-01-29"), input("bad")]))
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(matches!(entries[0], BatchEntry::Report(_)));
        assert!(matches!(&entries[1], BatchEntry::Error { subject_id: Some(id), .. } if id == "S1"));
    }
}
