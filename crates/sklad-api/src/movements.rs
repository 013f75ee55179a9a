//! Handlers for `/movements` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/movements` | 404 for a missing invoice or item, 409 for a repeat |
//! | `GET`    | `/movements/{prefix}/{number}/{ean}` | 404 if not found |
//! | `PATCH`  | `/movements/{prefix}/{number}/{ean}` | Quantity, price, reset flag |
//! | `DELETE` | `/movements/{prefix}/{number}/{ean}` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use sklad_core::{
  invoice::InvoiceKey,
  movement::{MovementKey, NewStockMovement, StockMovement},
  patch::Patch,
  store::StockLedger,
};

use crate::error::ApiError;

type KeyPath = Path<(String, i64, String)>;

fn movement_key(Path((prefix, number, ean)): KeyPath) -> MovementKey {
  MovementKey::new(InvoiceKey::new(prefix, number), ean)
}

/// `POST /movements`
pub async fn create<S: StockLedger>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewStockMovement>,
) -> Result<impl IntoResponse, ApiError> {
  let movement = store.create_movement(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(movement)))
}

async fn fetch<S: StockLedger>(
  store: &S,
  key: MovementKey,
) -> Result<StockMovement, ApiError> {
  store
    .get_movement(key.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("movement {key} not found")))
}

/// `GET /movements/{prefix}/{number}/{ean}`
pub async fn get_one<S: StockLedger>(
  State(store): State<Arc<S>>,
  path: KeyPath,
) -> Result<Json<StockMovement>, ApiError> {
  Ok(Json(fetch(&*store, movement_key(path)).await?))
}

/// `PATCH /movements/{prefix}/{number}/{ean}`
pub async fn update<S: StockLedger>(
  State(store): State<Arc<S>>,
  path: KeyPath,
  Json(patch): Json<Patch>,
) -> Result<Json<StockMovement>, ApiError> {
  let key = movement_key(path);
  store
    .update_movement(key.clone(), patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(fetch(&*store, key).await?))
}

/// `DELETE /movements/{prefix}/{number}/{ean}`
pub async fn delete<S: StockLedger>(
  State(store): State<Arc<S>>,
  path: KeyPath,
) -> Result<StatusCode, ApiError> {
  store
    .delete_movement(movement_key(path))
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
