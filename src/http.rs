//! HTTP surface: routing, body extraction, and response assembly.

use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::artifact;
use crate::error::{RenderError, Result};
use crate::pipeline::{RenderMode, RenderOutcome, RenderRequest, RenderService};

/// Correlation header accepted from clients and echoed on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Clone)]
pub struct AppState {
    pub service: RenderService,
}

pub fn build_router(service: RenderService, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/pdf", post(render_isolated))
        .route("/pdf/shared", post(render_shared))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(AppState { service })
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Default, Deserialize)]
struct RenderParams {
    filename: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonPayload {
    html: String,
    filename: Option<String>,
}

async fn render_isolated(
    State(state): State<AppState>,
    Query(params): Query<RenderParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_render(state, RenderMode::Isolated, params, headers, body).await
}

async fn render_shared(
    State(state): State<AppState>,
    Query(params): Query<RenderParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle_render(state, RenderMode::Shared, params, headers, body).await
}

async fn handle_render(
    state: AppState,
    mode: RenderMode,
    params: RenderParams,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let correlation_id = correlation_id_from(&headers);

    let request = match parse_request(&headers, params, body, &correlation_id) {
        Ok(request) => request,
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "rejected render request");
            return error_response(err, &correlation_id);
        }
    };

    match state.service.render(mode, request).await {
        Ok(outcome) => {
            info!(
                correlation_id = %correlation_id,
                bytes = outcome.pdf.len(),
                filename = %outcome.filename,
                "pdf rendered"
            );
            success_response(outcome)
        }
        Err(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "render request failed");
            error_response(err, &correlation_id)
        }
    }
}

fn correlation_id_from(headers: &HeaderMap) -> String {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(|value| value.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

fn parse_request(
    headers: &HeaderMap,
    params: RenderParams,
    body: Bytes,
    correlation_id: &str,
) -> Result<RenderRequest> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let (html, body_filename) = if content_type.starts_with("application/json") {
        let payload: JsonPayload = serde_json::from_slice(&body).map_err(|err| {
            RenderError::invalid_input(format!(
                "body is not valid JSON with an `html` string field: {err}"
            ))
        })?;
        (payload.html, payload.filename)
    } else {
        // Anything that is not JSON is treated as raw HTML text.
        let text = std::str::from_utf8(&body)
            .map_err(|_| RenderError::invalid_input("body must be UTF-8 text"))?;
        (text.to_string(), None)
    };

    Ok(RenderRequest {
        html,
        filename: params.filename.or(body_filename),
        correlation_id: Some(correlation_id.to_string()),
    })
}

fn success_response(outcome: RenderOutcome) -> Response {
    let RenderOutcome {
        pdf,
        filename,
        correlation_id,
        teardown,
    } = outcome;

    let content_length = pdf.len();
    let bytes = pdf.into_bytes();

    // The teardown guard rides inside the body stream: it runs after the
    // final frame has been consumed, and its drop impl covers a connection
    // that goes away mid-transfer.
    let body = Body::from_stream(async_stream::stream! {
        yield Ok::<_, std::convert::Infallible>(bytes);
        teardown.run().await;
    });

    let mut response = artifact::frame_response(&filename, content_length, body);
    append_request_id(&mut response, &correlation_id);
    response
}

fn error_response(err: RenderError, correlation_id: &str) -> Response {
    let mut response = err.into_response();
    append_request_id(&mut response, correlation_id);
    response
}

fn append_request_id(response: &mut Response, correlation_id: &str) {
    if let Ok(value) = HeaderValue::from_str(correlation_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
}
