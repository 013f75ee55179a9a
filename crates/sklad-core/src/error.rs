//! Error types for `sklad-core`.

use std::fmt;

use thiserror::Error;

use crate::{invoice::InvoiceKey, movement::MovementKey};

/// The entity a keyed failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
  Contact,
  Item,
  Invoice,
  StockMovement,
}

impl fmt::Display for Entity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Contact => "contact",
      Self::Item => "item",
      Self::Invoice => "invoice",
      Self::StockMovement => "stock movement",
    })
  }
}

/// Deterministic business failures. None of these are retryable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("{entity} not found: {key}")]
  NotFound { entity: Entity, key: String },

  #[error("{entity} already exists: {key}")]
  DuplicateKey { entity: Entity, key: String },

  #[error("invoice not found: {0}")]
  InvoiceNotFound(InvoiceKey),

  #[error("item not found: {0}")]
  ItemNotFound(String),

  #[error("stock movement already exists: {0}")]
  DuplicateMovement(MovementKey),

  #[error("item {0} is still referenced by stock movements")]
  ItemInUse(String),

  #[error("field {field:?} cannot be updated on {entity}")]
  InvalidField { entity: Entity, field: String },

  #[error("no fields to update")]
  NoFieldsToUpdate,

  #[error("invalid value for {field:?}: {reason}")]
  InvalidValue { field: String, reason: String },

  #[error("invalid decimal: {0:?}")]
  InvalidDecimal(String),

  /// A ledger figure would leave the range of a 96-bit decimal.
  #[error("{0} overflows the decimal range")]
  Overflow(&'static str),

  #[error("unknown invoice type: {0}")]
  UnknownInvoiceType(i64),

  #[error("unknown vat rate: {0}")]
  UnknownVatRate(i64),
}

impl Error {
  pub fn not_found(entity: Entity, key: impl fmt::Display) -> Self {
    Self::NotFound { entity, key: key.to_string() }
  }

  pub fn duplicate(entity: Entity, key: impl fmt::Display) -> Self {
    Self::DuplicateKey { entity, key: key.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
