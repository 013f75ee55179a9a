//! Handlers for `/items` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/items` | Insertion order |
//! | `POST`   | `/items` | 409 if the EAN is taken |
//! | `GET`    | `/items/{ean}` | 404 if not found |
//! | `PATCH`  | `/items/{ean}` | Returns the updated item |
//! | `DELETE` | `/items/{ean}` | 409 while movements reference it |
//! | `GET`    | `/items/{ean}/stock` | Stock figures |
//! | `GET`    | `/items/{ean}/movements` | Ledger lines, insertion order |
//! | `GET`    | `/items/{ean}/history` | Ledger lines with running stock |
//!
//! The read-model endpoints answer 404 for an unknown EAN, so a typo is not
//! mistaken for an item that simply has no stock.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use sklad_core::{
  costing::{HistoryLine, StockFigures},
  item::Item,
  movement::StockMovement,
  patch::Patch,
  store::{Costing, ItemStore, StockLedger},
};

use crate::error::ApiError;

// ─── CRUD ────────────────────────────────────────────────────────────────────

/// `GET /items`
pub async fn list<S: ItemStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Item>>, ApiError> {
  let items = store.list_items().await.map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `POST /items`
pub async fn create<S: ItemStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<Item>,
) -> Result<impl IntoResponse, ApiError> {
  let item = store.create_item(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(item)))
}

async fn fetch<S: ItemStore>(store: &S, ean: String) -> Result<Item, ApiError> {
  store
    .get_item(ean.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("item {ean} not found")))
}

/// `GET /items/{ean}`
pub async fn get_one<S: ItemStore>(
  State(store): State<Arc<S>>,
  Path(ean): Path<String>,
) -> Result<Json<Item>, ApiError> {
  Ok(Json(fetch(&*store, ean).await?))
}

/// `PATCH /items/{ean}`
pub async fn update<S: ItemStore>(
  State(store): State<Arc<S>>,
  Path(ean): Path<String>,
  Json(patch): Json<Patch>,
) -> Result<Json<Item>, ApiError> {
  store
    .update_item(ean.clone(), patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(fetch(&*store, ean).await?))
}

/// `DELETE /items/{ean}`
pub async fn delete<S: ItemStore>(
  State(store): State<Arc<S>>,
  Path(ean): Path<String>,
) -> Result<StatusCode, ApiError> {
  store.delete_item(ean).await.map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// `GET /items/{ean}/stock`
pub async fn stock<S: Costing>(
  State(store): State<Arc<S>>,
  Path(ean): Path<String>,
) -> Result<Json<StockFigures>, ApiError> {
  fetch(&*store, ean.clone()).await?;
  let figures = store.stock_figures(ean).await.map_err(ApiError::store)?;
  Ok(Json(figures))
}

/// `GET /items/{ean}/movements`
pub async fn movements<S: ItemStore + StockLedger>(
  State(store): State<Arc<S>>,
  Path(ean): Path<String>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
  fetch(&*store, ean.clone()).await?;
  let movements = store.movements_by_item(ean).await.map_err(ApiError::store)?;
  Ok(Json(movements))
}

/// `GET /items/{ean}/history`
pub async fn history<S: Costing>(
  State(store): State<Arc<S>>,
  Path(ean): Path<String>,
) -> Result<Json<Vec<HistoryLine>>, ApiError> {
  fetch(&*store, ean.clone()).await?;
  let history = store.item_history(ean).await.map_err(ApiError::store)?;
  Ok(Json(history))
}
