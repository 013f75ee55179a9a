//! Items: stock-keeping units identified by EAN.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
  Entity, Error,
  patch::{Field, FieldKind, PatchTarget},
};

/// VAT bracket applied to an item or a movement line. Stored and
/// serialised as its numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VatRate {
  Zero,
  Reduced,
  #[default]
  Standard,
}

impl TryFrom<i64> for VatRate {
  type Error = Error;

  fn try_from(code: i64) -> Result<Self, Self::Error> {
    match code {
      0 => Ok(Self::Zero),
      1 => Ok(Self::Reduced),
      2 => Ok(Self::Standard),
      other => Err(Error::UnknownVatRate(other)),
    }
  }
}

impl From<VatRate> for i64 {
  fn from(rate: VatRate) -> Self {
    match rate {
      VatRate::Zero => 0,
      VatRate::Reduced => 1,
      VatRate::Standard => 2,
    }
  }
}

/// A stock-keeping unit.
///
/// Cost figures (average and last purchase price) are not stored here; they
/// are derived from the ledger on every read, see
/// [`StockFigures`](crate::costing::StockFigures).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  pub ean:               String,
  pub name:              String,
  pub category:          Option<String>,
  pub note:              Option<String>,
  pub vat_rate:          VatRate,
  pub unit_of_measure:   String,
  pub sale_price_group1: Decimal,
  pub sale_price_group2: Decimal,
  pub sale_price_group3: Decimal,
  pub sale_price_group4: Decimal,
}

pub static ITEM_PATCH: PatchTarget = PatchTarget {
  entity: Entity::Item,
  table:  "items",
  key:    &["ean"],
  fields: &[
    Field::required("name", FieldKind::Text),
    Field::optional("category", FieldKind::Text),
    Field::optional("note", FieldKind::Text),
    Field::required("vat_rate", FieldKind::Integer { min: 0, max: 2 }),
    Field::required("unit_of_measure", FieldKind::Text),
    Field::required("sale_price_group1", FieldKind::Price),
    Field::required("sale_price_group2", FieldKind::Price),
    Field::required("sale_price_group3", FieldKind::Price),
    Field::required("sale_price_group4", FieldKind::Price),
  ],
};
