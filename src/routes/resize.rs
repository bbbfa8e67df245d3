use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::routes::AppState;
use crate::services::key_parser::parse_variant_key;
use crate::services::policy;

#[derive(Debug, Deserialize)]
pub struct ResizeQuery {
    pub key: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(resize_image))
}

async fn resize_image(
    State(state): State<AppState>,
    query: Result<Query<ResizeQuery>, QueryRejection>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let request = parse_variant_key(query.key.as_deref())?;
    policy::check(
        &request,
        &state.config.allowed_dimensions,
        &state.config.allowed_extensions,
    )?;

    let accepts_webp = accepts_webp(&headers);
    let work = state.materializer.materialize(&request, accepts_webp);

    let redirect = match state.config.request_timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .map_err(|_| AppError::Internal("Request deadline exceeded".to_string()))??,
        None => work.await?,
    };

    tracing::info!("Redirecting {} to {}", request.variant_key, redirect.location);

    Ok(redirect.into_response())
}

fn accepts_webp(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|h| h.to_str().ok())
        .is_some_and(|accept| accept.contains("webp"))
}
