use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde::Deserialize;

use sembed_core::{EmbeddingOutput, GateOutcome};

use crate::auth::require_api_key;
use crate::state::AppState;

pub const EMBED_PARAGRAPH_PATH: &str = "/embedParagraph/";

#[derive(Debug, Deserialize)]
pub struct EmbedParams {
    pub text: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(EMBED_PARAGRAPH_PATH, get(embed_paragraph))
        .route("/embedParagraph", get(embed_paragraph))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ))
        .with_state(state)
}

/// Every gate outcome answers 200; failures travel in `errorMessage`.
async fn embed_paragraph(
    State(state): State<AppState>,
    Query(params): Query<EmbedParams>,
) -> Json<EmbeddingOutput> {
    let outcome = state.gate.embed(&params.text).await;
    Json(to_output(outcome, state.expose_inference_errors))
}

pub fn to_output(outcome: GateOutcome, expose_inference_errors: bool) -> EmbeddingOutput {
    match outcome {
        GateOutcome::Success(vector) => EmbeddingOutput::success(vector),
        GateOutcome::CapacityExceeded { limit } => {
            EmbeddingOutput::failure(GateOutcome::capacity_exceeded_message(limit))
        }
        GateOutcome::InferenceError(err) if expose_inference_errors => {
            EmbeddingOutput::failure(err.to_string())
        }
        GateOutcome::InferenceError(err) => EmbeddingOutput::failure(err.category()),
    }
}
