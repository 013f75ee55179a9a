//! The store traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `sklad-store-sqlite`). Higher layers (`sklad-api`) depend on these
//! abstractions, not on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use rust_decimal::Decimal;

use crate::{
  costing::{self, CostingEntry, HistoryLine, StockFigures},
  contact::{Contact, ContactKey},
  invoice::{Invoice, InvoiceKey},
  item::Item,
  movement::{MovementKey, NewStockMovement, StockMovement},
  patch::Patch,
};

// ─── Backend ─────────────────────────────────────────────────────────────────

/// Lets outer layers see the domain failure inside a backend error without
/// knowing the backend.
pub trait DomainFailure {
  /// The wrapped [`crate::Error`], if this is a domain failure rather than an
  /// infrastructure one.
  fn domain(&self) -> Option<&crate::Error>;
}

/// Shared error type of every store trait.
pub trait Backend: Send + Sync {
  type Error: std::error::Error
    + DomainFailure
    + From<crate::Error>
    + Send
    + Sync
    + 'static;
}

// ─── Entity stores ───────────────────────────────────────────────────────────

/// Keyed CRUD over contacts.
pub trait ContactStore: Backend {
  /// Fails with `DuplicateKey` if the key is taken.
  fn create_contact(
    &self,
    contact: Contact,
  ) -> impl Future<Output = Result<Contact, Self::Error>> + Send + '_;

  fn get_contact(
    &self,
    key: ContactKey,
  ) -> impl Future<Output = Result<Option<Contact>, Self::Error>> + Send + '_;

  /// All contacts in insertion order.
  fn list_contacts(
    &self,
  ) -> impl Future<Output = Result<Vec<Contact>, Self::Error>> + Send + '_;

  /// Apply a validated partial update. Fails with `NotFound` if no row
  /// matched.
  fn update_contact(
    &self,
    key: ContactKey,
    patch: Patch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_contact(
    &self,
    key: ContactKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Keyed CRUD over items.
pub trait ItemStore: Backend {
  fn create_item(
    &self,
    item: Item,
  ) -> impl Future<Output = Result<Item, Self::Error>> + Send + '_;

  fn get_item(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<Option<Item>, Self::Error>> + Send + '_;

  fn list_items(
    &self,
  ) -> impl Future<Output = Result<Vec<Item>, Self::Error>> + Send + '_;

  fn update_item(
    &self,
    ean: String,
    patch: Patch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fails with `ItemInUse` while movements still reference the item.
  fn delete_item(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Keyed CRUD over invoices.
pub trait InvoiceStore: Backend {
  fn create_invoice(
    &self,
    invoice: Invoice,
  ) -> impl Future<Output = Result<Invoice, Self::Error>> + Send + '_;

  fn get_invoice(
    &self,
    key: InvoiceKey,
  ) -> impl Future<Output = Result<Option<Invoice>, Self::Error>> + Send + '_;

  fn list_invoices(
    &self,
  ) -> impl Future<Output = Result<Vec<Invoice>, Self::Error>> + Send + '_;

  fn update_invoice(
    &self,
    key: InvoiceKey,
    patch: Patch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete an invoice together with all of its stock movements, as one
  /// unit of work. Fails with `NotFound` (and changes nothing) if the invoice
  /// does not exist.
  fn delete_invoice(
    &self,
    key: InvoiceKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// The append/mutate/delete surface for stock movements.
pub trait StockLedger: Backend {
  /// Record a movement. The referenced invoice and item must exist
  /// (`InvoiceNotFound` / `ItemNotFound`); the `(invoice, item)` pair must be
  /// free (`DuplicateMovement`). The reset-point flag is computed against the
  /// item's stock at the time of the call.
  fn create_movement(
    &self,
    input: NewStockMovement,
  ) -> impl Future<Output = Result<StockMovement, Self::Error>> + Send + '_;

  fn get_movement(
    &self,
    key: MovementKey,
  ) -> impl Future<Output = Result<Option<StockMovement>, Self::Error>> + Send + '_;

  /// Movements of one invoice, in insertion order.
  fn movements_by_invoice(
    &self,
    invoice: InvoiceKey,
  ) -> impl Future<Output = Result<Vec<StockMovement>, Self::Error>> + Send + '_;

  /// Movements of one item, in insertion order.
  fn movements_by_item(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<Vec<StockMovement>, Self::Error>> + Send + '_;

  /// Only `amount`, `price_per_unit` and `reset_point` may change.
  fn update_movement(
    &self,
    key: MovementKey,
    patch: Patch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn delete_movement(
    &self,
    key: MovementKey,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Delete every movement of an invoice and return how many were removed.
  fn delete_movements_by_invoice(
    &self,
    invoice: InvoiceKey,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;
}

// ─── Costing ─────────────────────────────────────────────────────────────────

/// Read-only inventory figures, recomputed from the ledger on every call.
///
/// Backends supply [`Costing::costing_entries`]; every figure is derived from
/// it by the pure functions in [`crate::costing`].
pub trait Costing: ItemStore {
  /// The item's ledger lines in costing order: invoice issue date, then
  /// insertion order.
  fn costing_entries(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<Vec<CostingEntry>, Self::Error>> + Send + '_;

  /// Quantity on hand; `0` for an item with no movements.
  fn stock_amount(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<Decimal, Self::Error>> + Send + '_ {
    async move {
      let entries = self.costing_entries(ean).await?;
      costing::stock_amount(&entries).map_err(Self::Error::from)
    }
  }

  /// Weighted-average purchase price over purchase movements only.
  fn average_buy_price(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<Decimal, Self::Error>> + Send + '_ {
    async move {
      let entries = self.costing_entries(ean).await?;
      costing::average_buy_price(&entries).map_err(Self::Error::from)
    }
  }

  fn last_buy_price(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<Decimal, Self::Error>> + Send + '_ {
    async move { Ok(costing::last_buy_price(&self.costing_entries(ean).await?)) }
  }

  /// Whether a movement with stock effect `delta` would deplete the item.
  fn is_reset_point(
    &self,
    ean: String,
    delta: Decimal,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_ {
    async move {
      let current = self.stock_amount(ean).await?;
      costing::is_reset_point(current, delta).map_err(Self::Error::from)
    }
  }

  fn stock_figures(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<StockFigures, Self::Error>> + Send + '_ {
    async move {
      let entries = self.costing_entries(ean.clone()).await?;
      StockFigures::from_entries(ean, &entries).map_err(Self::Error::from)
    }
  }

  /// Figures for every item, in item insertion order.
  fn stock_overview(
    &self,
  ) -> impl Future<Output = Result<Vec<StockFigures>, Self::Error>> + Send + '_ {
    async move {
      let mut overview = Vec::new();
      for item in self.list_items().await? {
        overview.push(self.stock_figures(item.ean).await?);
      }
      Ok(overview)
    }
  }

  fn item_history(
    &self,
    ean: String,
  ) -> impl Future<Output = Result<Vec<HistoryLine>, Self::Error>> + Send + '_ {
    async move {
      let entries = self.costing_entries(ean).await?;
      costing::history(&entries).map_err(Self::Error::from)
    }
  }
}

// ─── Everything ──────────────────────────────────────────────────────────────

/// A backend that implements every store trait.
pub trait InventoryStore:
  ContactStore + ItemStore + InvoiceStore + StockLedger + Costing
{
}

impl<T> InventoryStore for T where
  T: ContactStore + ItemStore + InvoiceStore + StockLedger + Costing
{
}
