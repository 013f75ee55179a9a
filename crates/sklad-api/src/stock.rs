//! `GET /stock`: figures for every item, in item insertion order.

use std::sync::Arc;

use axum::{Json, extract::State};
use sklad_core::{costing::StockFigures, store::Costing};

use crate::error::ApiError;

pub async fn overview<S: Costing>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<StockFigures>>, ApiError> {
  let overview = store.stock_overview().await.map_err(ApiError::store)?;
  Ok(Json(overview))
}
