//! Costing rules over an item's ledger lines.
//!
//! Everything here is a pure function of the lines passed in. Stores fetch
//! the lines fresh on every query (see [`crate::store::Costing`]), so the
//! figures always reflect the latest ledger state. Nothing is cached.
//!
//! Sign convention: purchases add the entered amount, sales subtract it and
//! corrections apply it verbatim (negative corrections reduce stock). Only
//! purchases contribute to the cost basis.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, invoice::InvoiceKey, movement::MovementKind};

/// Fractional digits of every surfaced price or value.
pub const PRICE_SCALE: u32 = 2;

/// Parse a decimal string as stored on a movement.
pub fn parse_decimal(s: &str) -> Result<Decimal> {
  Decimal::from_str(s.trim()).map_err(|_| Error::InvalidDecimal(s.to_owned()))
}

/// Round to [`PRICE_SCALE`] digits, midpoint away from zero, and pad the
/// scale so `50` surfaces as `50.00`.
pub fn round_price(value: Decimal) -> Decimal {
  let mut rounded = value
    .round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
  rounded.rescale(PRICE_SCALE);
  rounded
}

// ─── Ledger line ─────────────────────────────────────────────────────────────

/// One movement of an item, joined with what its invoice says about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostingEntry {
  pub invoice:        InvoiceKey,
  pub date_issue:     NaiveDate,
  pub kind:           MovementKind,
  pub amount:         Decimal,
  pub price_per_unit: Decimal,
  pub reset_point:    bool,
}

impl CostingEntry {
  pub fn signed_amount(&self) -> Decimal { self.kind.signed(self.amount) }
}

// ─── Aggregates ──────────────────────────────────────────────────────────────

fn add(a: Decimal, b: Decimal, what: &'static str) -> Result<Decimal> {
  a.checked_add(b).ok_or(Error::Overflow(what))
}

/// Quantity on hand. `0` when there are no lines.
pub fn stock_amount(entries: &[CostingEntry]) -> Result<Decimal> {
  entries
    .iter()
    .try_fold(Decimal::ZERO, |q, e| add(q, e.signed_amount(), "stock amount"))
}

/// `Σ(amount × price) / Σ(amount)` over purchase lines, rounded to
/// [`PRICE_SCALE`]. `0` when there are no purchases or their amounts net to
/// zero.
pub fn average_buy_price(entries: &[CostingEntry]) -> Result<Decimal> {
  let (quantity, cost) = entries
    .iter()
    .filter(|e| e.kind.is_purchase())
    .try_fold((Decimal::ZERO, Decimal::ZERO), |(q, c), e| {
      let line_cost = e
        .amount
        .checked_mul(e.price_per_unit)
        .ok_or(Error::Overflow("purchase cost"))?;
      Ok((add(q, e.amount, "purchased quantity")?, add(c, line_cost, "purchase cost")?))
    })?;

  if quantity.is_zero() {
    return Ok(round_price(Decimal::ZERO));
  }
  let average = cost
    .checked_div(quantity)
    .ok_or(Error::Overflow("average price"))?;
  Ok(round_price(average))
}

/// Unit price of the most recent purchase line. `entries` must be in
/// costing order (oldest first). `0` when there are no purchases.
pub fn last_buy_price(entries: &[CostingEntry]) -> Decimal {
  entries
    .iter()
    .rev()
    .find(|e| e.kind.is_purchase())
    .map(|e| e.price_per_unit)
    .unwrap_or(Decimal::ZERO)
}

/// Whether applying `delta` to `current` stock crosses it from positive to
/// zero or below.
pub fn is_reset_point(current: Decimal, delta: Decimal) -> Result<bool> {
  let after = add(current, delta, "stock amount")?;
  Ok(current > Decimal::ZERO && after <= Decimal::ZERO)
}

/// Fails with [`Error::Overflow`] unless every figure over `entries` (running
/// stock, cost basis, average and stock value) fits a [`Decimal`]. The ledger
/// runs this before a line is written or changed.
pub fn check_representable(entries: &[CostingEntry]) -> Result<()> {
  history(entries)?;
  StockFigures::from_entries(String::new(), entries)?;
  Ok(())
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// The derived inventory figures of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockFigures {
  pub ean:                 String,
  pub stock_amount:        Decimal,
  pub avg_purchase_price:  Decimal,
  pub last_purchase_price: Decimal,
  /// `stock_amount × avg_purchase_price`, rounded.
  pub stock_value:         Decimal,
}

impl StockFigures {
  pub fn from_entries(ean: String, entries: &[CostingEntry]) -> Result<Self> {
    let stock_amount = stock_amount(entries)?;
    let avg_purchase_price = average_buy_price(entries)?;
    let stock_value = stock_amount
      .checked_mul(avg_purchase_price)
      .ok_or(Error::Overflow("stock value"))?;
    Ok(Self {
      ean,
      stock_amount,
      avg_purchase_price,
      last_purchase_price: last_buy_price(entries),
      stock_value: round_price(stock_value),
    })
  }
}

/// One line of an item's stock card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLine {
  pub invoice:        InvoiceKey,
  pub date_issue:     NaiveDate,
  pub kind:           MovementKind,
  pub amount:         Decimal,
  pub price_per_unit: Decimal,
  /// Effect of this line on quantity on hand.
  pub delta:          Decimal,
  /// Quantity on hand after this line.
  pub stock_after:    Decimal,
  pub reset_point:    bool,
}

/// Running stock card over `entries` in costing order.
pub fn history(entries: &[CostingEntry]) -> Result<Vec<HistoryLine>> {
  let mut running = Decimal::ZERO;
  entries
    .iter()
    .map(|e| {
      let delta = e.signed_amount();
      running = add(running, delta, "stock amount")?;
      Ok(HistoryLine {
        invoice: e.invoice.clone(),
        date_issue: e.date_issue,
        kind: e.kind,
        amount: e.amount,
        price_per_unit: e.price_per_unit,
        delta,
        stock_after: running,
        reset_point: e.reset_point,
      })
    })
    .collect()
}
