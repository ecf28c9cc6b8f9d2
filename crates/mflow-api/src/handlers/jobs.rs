//! Job submission handlers.
//!
//! Each handler parses its request body and hands it to the scheduler. The
//! response status is the submission's code: the work's own code when it ran
//! inline, 202 when queued, 429 when the queue is full.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use mflow_models::{CaptionRequest, ComposeRequest, ImageToVideoRequest, JobRequest};
use mflow_queue::Submission;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitParams {
    /// Run inline even when a webhook target is given
    #[serde(default)]
    pub bypass_queue: bool,
}

pub async fn submit_compose(
    State(state): State<AppState>,
    params: Result<Query<SubmitParams>, QueryRejection>,
    body: Result<Json<ComposeRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    let Query(params) = params?;
    submit(&state, JobRequest::Compose(request), params.bypass_queue).await
}

pub async fn submit_caption(
    State(state): State<AppState>,
    params: Result<Query<SubmitParams>, QueryRejection>,
    body: Result<Json<CaptionRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    let Query(params) = params?;
    submit(&state, JobRequest::Caption(request), params.bypass_queue).await
}

pub async fn submit_image_to_video(
    State(state): State<AppState>,
    params: Result<Query<SubmitParams>, QueryRejection>,
    body: Result<Json<ImageToVideoRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = body?;
    let Query(params) = params?;
    submit(&state, JobRequest::ImageToVideo(request), params.bypass_queue).await
}

async fn submit(state: &AppState, request: JobRequest, bypass: bool) -> ApiResult<Response> {
    let endpoint = request.endpoint();
    let submission = state.scheduler.submit(request, bypass).await;
    info!(
        endpoint = endpoint,
        job_id = %submission.job_id(),
        code = submission.status_code(),
        "Job submitted"
    );
    Ok(into_response(submission))
}

fn into_response(submission: Submission) -> Response {
    let status = StatusCode::from_u16(submission.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(submission)).into_response()
}
