//! JSON REST API for Sklad.
//!
//! Exposes an axum [`Router`] backed by any
//! [`sklad_core::store::InventoryStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", sklad_api::api_router(store.clone()))
//! ```

pub mod config;
pub mod contacts;
pub mod error;
pub mod invoices;
pub mod items;
pub mod movements;
pub mod stock;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use sklad_core::store::InventoryStore;

pub use config::ServerConfig;
pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: InventoryStore + 'static,
{
  Router::new()
    // Contacts
    .route("/contacts", get(contacts::list::<S>).post(contacts::create::<S>))
    .route(
      "/contacts/{ico}/{modifier}",
      get(contacts::get_one::<S>)
        .patch(contacts::update::<S>)
        .delete(contacts::delete::<S>),
    )
    // Items
    .route("/items", get(items::list::<S>).post(items::create::<S>))
    .route(
      "/items/{ean}",
      get(items::get_one::<S>)
        .patch(items::update::<S>)
        .delete(items::delete::<S>),
    )
    .route("/items/{ean}/stock", get(items::stock::<S>))
    .route("/items/{ean}/movements", get(items::movements::<S>))
    .route("/items/{ean}/history", get(items::history::<S>))
    // Invoices
    .route("/invoices", get(invoices::list::<S>).post(invoices::create::<S>))
    .route(
      "/invoices/{prefix}/{number}",
      get(invoices::get_one::<S>)
        .patch(invoices::update::<S>)
        .delete(invoices::delete::<S>),
    )
    .route(
      "/invoices/{prefix}/{number}/movements",
      get(invoices::movements::<S>).delete(invoices::delete_movements::<S>),
    )
    // Ledger
    .route("/movements", post(movements::create::<S>))
    .route(
      "/movements/{prefix}/{number}/{ean}",
      get(movements::get_one::<S>)
        .patch(movements::update::<S>)
        .delete(movements::delete::<S>),
    )
    .route("/stock", get(stock::overview::<S>))
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────
