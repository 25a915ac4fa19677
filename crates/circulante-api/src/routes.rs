use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use circulante_core::{aggregate_totals, prepare_chart, render_chart, AggregatedRow, CirculanteError};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::params::{GraphicParams, TotalsParams};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct TotalsResponse {
    pub docs: Vec<AggregatedRow>,
}

pub async fn root() -> Json<Value> {
    Json(json!({ "message": "I'm alive!" }))
}

pub async fn totals(
    State(state): State<AppState>,
    Query(params): Query<TotalsParams>,
) -> Result<Json<TotalsResponse>, ApiError> {
    let settings = state.settings();
    let request = params.into_request(settings, Local::now().date_naive())?;

    let docs = aggregate_totals(state.source(), &request, settings.denomination_count).await?;
    info!(rows = docs.len(), "totals served");
    Ok(Json(TotalsResponse { docs }))
}

pub async fn graphic(
    State(state): State<AppState>,
    Query(params): Query<GraphicParams>,
) -> Result<Response, ApiError> {
    let settings = state.settings();
    let request = params.into_request(settings, Local::now().date_naive())?;

    let data = prepare_chart(state.source(), &request, settings.denomination_count).await?;
    let dir = settings.chart_dir.clone();
    let path = tokio::task::spawn_blocking(move || render_chart(&data, &dir)).await??;

    let body = tokio::fs::read(&path).await.map_err(CirculanteError::from)?;
    info!(path = %path.display(), bytes = body.len(), "chart served");
    Ok(([(header::CONTENT_TYPE, "image/svg+xml")], body).into_response())
}
