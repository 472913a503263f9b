use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};
use utoipa::ToSchema;

use crate::{responses, AppState};

pub(crate) const CODE_REQUIRED: &str = "Code is required";
pub(crate) const GENERATION_EMPTY: &str = "Failed to generate content";
pub(crate) const GENERATION_FAILED: &str = "Unexpected error";

#[allow(dead_code)]
#[derive(Deserialize, ToSchema)]
pub struct ReviewRequest {
    /// Source code to review, passed to the provider untouched.
    pub code: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub suggestion: String,
}

/// Ask the generation provider to review a snippet of code.
#[utoipa::path(
    post,
    path = "/ai/get-review",
    tag = "Review",
    request_body = ReviewRequest,
    responses(
        (status = 200, description = "Review text", body = ReviewResponse),
        (status = 400, description = "Missing or blank code", body = crate::responses::ErrorBody),
        (status = 413, description = "Body exceeds the request size limit"),
        (status = 500, description = "Generation failed", body = crate::responses::ErrorBody)
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    // Unparseable bodies and non-string `code` count as absent; body read
    // failures (size limit, aborted stream) keep axum's own status.
    let code = match body {
        Ok(Json(value)) => value
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string),
        Err(rejection @ JsonRejection::BytesRejection(_)) => {
            warn!(target: "codereview::review", %rejection, "review body unreadable");
            return rejection.into_response();
        }
        Err(rejection) => {
            warn!(target: "codereview::review", %rejection, "review body rejected");
            None
        }
    };
    let Some(code) = code.filter(|c| !c.trim().is_empty()) else {
        return responses::error(StatusCode::BAD_REQUEST, CODE_REQUIRED);
    };

    let generator = state.generator();
    info!(
        target: "codereview::review",
        backend = generator.backend(),
        instruction = state.instruction().as_str(),
        input_len = code.len(),
        "requesting review from generation provider"
    );
    let started = Instant::now();
    let result = generator.generate(state.instruction(), &code).await;
    let latency_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(outcome) => match outcome.into_text() {
            Some(suggestion) => {
                info!(
                    target: "codereview::review",
                    latency_ms,
                    output_len = suggestion.len(),
                    "review generated"
                );
                Json(ReviewResponse { suggestion }).into_response()
            }
            None => {
                warn!(target: "codereview::review", latency_ms, "provider returned no text");
                responses::error(StatusCode::INTERNAL_SERVER_ERROR, GENERATION_EMPTY)
            }
        },
        Err(err) => {
            error!(
                target: "codereview::review",
                latency_ms,
                provider_status = err.provider_status(),
                error = %err,
                "review generation failed"
            );
            responses::error_with_details(
                StatusCode::INTERNAL_SERVER_ERROR,
                GENERATION_FAILED,
                err.to_string(),
            )
        }
    }
}
