//! Handlers for `/contacts` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/contacts` | Insertion order |
//! | `POST`   | `/contacts` | 409 if `(ico, modifier)` is taken |
//! | `GET`    | `/contacts/{ico}/{modifier}` | 404 if not found |
//! | `PATCH`  | `/contacts/{ico}/{modifier}` | Returns the updated contact |
//! | `DELETE` | `/contacts/{ico}/{modifier}` | 204 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use sklad_core::{
  contact::{Contact, ContactKey},
  patch::Patch,
  store::ContactStore,
};

use crate::error::ApiError;

/// `GET /contacts`
pub async fn list<S: ContactStore>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Contact>>, ApiError> {
  let contacts = store.list_contacts().await.map_err(ApiError::store)?;
  Ok(Json(contacts))
}

/// `POST /contacts`
pub async fn create<S: ContactStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<Contact>,
) -> Result<impl IntoResponse, ApiError> {
  let contact = store.create_contact(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(contact)))
}

async fn fetch<S: ContactStore>(store: &S, key: ContactKey) -> Result<Contact, ApiError> {
  store
    .get_contact(key.clone())
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("contact {key} not found")))
}

/// `GET /contacts/{ico}/{modifier}`
pub async fn get_one<S: ContactStore>(
  State(store): State<Arc<S>>,
  Path((ico, modifier)): Path<(String, u8)>,
) -> Result<Json<Contact>, ApiError> {
  Ok(Json(fetch(&*store, ContactKey::new(ico, modifier)).await?))
}

/// `PATCH /contacts/{ico}/{modifier}`
pub async fn update<S: ContactStore>(
  State(store): State<Arc<S>>,
  Path((ico, modifier)): Path<(String, u8)>,
  Json(patch): Json<Patch>,
) -> Result<Json<Contact>, ApiError> {
  let key = ContactKey::new(ico, modifier);
  store
    .update_contact(key.clone(), patch)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(fetch(&*store, key).await?))
}

/// `DELETE /contacts/{ico}/{modifier}`
pub async fn delete<S: ContactStore>(
  State(store): State<Arc<S>>,
  Path((ico, modifier)): Path<(String, u8)>,
) -> Result<StatusCode, ApiError> {
  store
    .delete_contact(ContactKey::new(ico, modifier))
    .await
    .map_err(ApiError::store)?;
  Ok(StatusCode::NO_CONTENT)
}
