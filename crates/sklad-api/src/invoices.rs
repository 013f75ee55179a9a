//! Handlers for `/invoices` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/invoices` | Insertion order |
//! | `POST`   | `/invoices` | 409 if `(prefix, number)` is taken |
//! | `GET`    | `/invoices/{prefix}/{number}` | 404 if not found |
//! | `PATCH`  | `/invoices/{prefix}/{number}` | Returns the updated invoice |
//! | `DELETE` | `/invoices/{prefix}/{number}` | Removes its movements too |
//! | `GET`    | `/invoices/{prefix}/{number}/movements` | Insertion order |
//! | `DELETE` | `/invoices/{prefix}/{number}/movements` | Returns `{"deleted": n}` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde_json::{Value, json};
use sklad_core::{
  invoice::{Invoice, InvoiceKey},
  movement::StockMovement,
  patch::Patch,
  store::{InvoiceStore, StockLedger},
};

use crate::error::ApiError;

/// `GET /invoices`
pub async fn list<S: InvoiceStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
  let invoices = store.list_invoices().await.map_err(ApiError::store)?;
  Ok(Json(invoices))
}

/// `POST /invoices`
pub async fn create<S: InvoiceStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<Invoice>,
) -> Result<impl IntoResponse, ApiError> {
  let invoice = store.create_invoice(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(invoice)))
}

async fn fetch<S: InvoiceStore>(store: &S, key: InvoiceKey) -> Result<Invoice, ApiError> {
  store
    .get_invoice(key.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("invoice {key} not found")))
}

/// `GET /invoices/{prefix}/{number}`
pub async fn get_one<S: InvoiceStore>(
  State(store): State<Arc<S>>,
  Path((prefix, number)): Path<(String, i64)>,
) -> Result<Json<Invoice>, ApiError> {
  Ok(Json(fetch(&*store, InvoiceKey::new(prefix, number)).await?))
}

/// `PATCH /invoices/{prefix}/{number}`
pub async fn update<S: InvoiceStore>(
  State(store): State<Arc<S>>,
  Path((prefix, number)): Path<(String, i64)>,
  Json(patch): Json<Patch>,
) -> Result<Json<Invoice>, ApiError> {
  let key = InvoiceKey::new(prefix, number);
  store
    .update_invoice(key.clone(), patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(fetch(&*store, key).await?))
}

/// `DELETE /invoices/{prefix}/{number}`
pub async fn delete<S: InvoiceStore>(
  State(store): State<Arc<S>>,
  Path((prefix, number)): Path<(String, i64)>,
) -> Result<StatusCode, ApiError> {
  store
    .delete_invoice(InvoiceKey::new(prefix, number))
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Lines ───────────────────────────────────────────────────────────────────

/// `GET /invoices/{prefix}/{number}/movements`
pub async fn movements<S: InvoiceStore + StockLedger>(
  State(store): State<Arc<S>>,
  Path((prefix, number)): Path<(String, i64)>,
) -> Result<Json<Vec<StockMovement>>, ApiError> {
  let key = InvoiceKey::new(prefix, number);
  fetch(&*store, key.clone()).await?;
  let movements = store
    .movements_by_invoice(key)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(movements))
}

/// `DELETE /invoices/{prefix}/{number}/movements`
///
/// Empties the invoice but keeps its header.
pub async fn delete_movements<S: StockLedger>(
  State(store): State<Arc<S>>,
  Path((prefix, number)): Path<(String, i64)>,
) -> Result<Json<Value>, ApiError> {
  let deleted = store
    .delete_movements_by_invoice(InvoiceKey::new(prefix, number))
    .await
    .map_err(ApiError::store)?;
  Ok(Json(json!({ "deleted": deleted })))
}
