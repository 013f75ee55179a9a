//! Stock movements: the ledger entries.
//!
//! A movement ties one quantity and unit price to exactly one invoice and one
//! item. At most one movement exists per `(invoice, item)` pair. Quantities
//! and prices are kept as the exact decimal strings the caller submitted;
//! they are only parsed when aggregated.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  Entity,
  invoice::InvoiceKey,
  item::VatRate,
  patch::{Field, FieldKind, PatchTarget},
};

/// Composite key of a movement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MovementKey {
  pub invoice_prefix: String,
  pub invoice_number: i64,
  pub item_ean:       String,
}

impl MovementKey {
  pub fn new(invoice: InvoiceKey, item_ean: impl Into<String>) -> Self {
    Self {
      invoice_prefix: invoice.prefix,
      invoice_number: invoice.number,
      item_ean:       item_ean.into(),
    }
  }

  pub fn invoice(&self) -> InvoiceKey {
    InvoiceKey::new(self.invoice_prefix.clone(), self.invoice_number)
  }
}

impl fmt::Display for MovementKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}/{}", self.invoice_prefix, self.invoice_number, self.item_ean)
  }
}

/// How a movement affects stock, derived from its invoice's type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
  /// Adds the entered amount and contributes to the cost basis.
  Purchase,
  /// Removes the entered amount.
  Sale,
  /// Applies the entered amount verbatim; negative amounts reduce stock.
  Correction,
}

impl MovementKind {
  /// The effect on quantity on hand of a movement of `amount` units.
  pub fn signed(self, amount: Decimal) -> Decimal {
    match self {
      Self::Purchase | Self::Correction => amount,
      Self::Sale => -amount,
    }
  }

  pub fn is_purchase(self) -> bool { matches!(self, Self::Purchase) }
}

/// Input to [`crate::store::StockLedger::create_movement`].
/// `reset_point` is always computed by the ledger; it is not accepted from
/// callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStockMovement {
  pub invoice_prefix: String,
  pub invoice_number: i64,
  pub item_ean:       String,
  pub amount:         String,
  pub price_per_unit: String,
  pub vat_rate:       VatRate,
}

impl NewStockMovement {
  pub fn key(&self) -> MovementKey {
    MovementKey {
      invoice_prefix: self.invoice_prefix.clone(),
      invoice_number: self.invoice_number,
      item_ean:       self.item_ean.clone(),
    }
  }
}

/// A persisted ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
  pub invoice_prefix: String,
  pub invoice_number: i64,
  pub item_ean:       String,
  pub amount:         String,
  pub price_per_unit: String,
  pub vat_rate:       VatRate,
  /// Set when this movement took the item's stock from positive to zero or
  /// below at the time it was recorded.
  pub reset_point:    bool,
}

impl StockMovement {
  pub fn from_new(input: NewStockMovement, reset_point: bool) -> Self {
    Self {
      invoice_prefix: input.invoice_prefix,
      invoice_number: input.invoice_number,
      item_ean: input.item_ean,
      amount: input.amount,
      price_per_unit: input.price_per_unit,
      vat_rate: input.vat_rate,
      reset_point,
    }
  }

  pub fn key(&self) -> MovementKey {
    MovementKey {
      invoice_prefix: self.invoice_prefix.clone(),
      invoice_number: self.invoice_number,
      item_ean:       self.item_ean.clone(),
    }
  }
}

/// Only quantity and price corrections are allowed after creation; the
/// invoice and item linkage is fixed.
pub static STOCK_MOVEMENT_PATCH: PatchTarget = PatchTarget {
  entity: Entity::StockMovement,
  table:  "stock_movements",
  key:    &["invoice_prefix", "invoice_number", "item_ean"],
  fields: &[
    Field::required("amount", FieldKind::Decimal),
    Field::required("price_per_unit", FieldKind::Decimal),
    Field::required("reset_point", FieldKind::Bool),
  ],
};
