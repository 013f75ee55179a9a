//! Invoices: transaction headers that own stock movements.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Entity, Error,
  contact::Contact,
  movement::MovementKind,
  patch::{Field, FieldKind, PatchTarget},
};

/// Composite key of an invoice: a series prefix plus a number within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceKey {
  pub prefix: String,
  pub number: i64,
}

impl InvoiceKey {
  pub fn new(prefix: impl Into<String>, number: i64) -> Self {
    Self { prefix: prefix.into(), number }
  }
}

impl fmt::Display for InvoiceKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.prefix, self.number)
  }
}

/// What kind of transaction an invoice records. The numeric codes are the
/// persisted and serialised form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum InvoiceType {
  PurchaseCash,
  PurchaseInvoice,
  SaleCash,
  SaleInvoice,
  StockCorrection,
}

impl InvoiceType {
  /// How movements on an invoice of this type affect stock and cost basis.
  pub fn movement_kind(self) -> MovementKind {
    match self {
      Self::PurchaseCash | Self::PurchaseInvoice => MovementKind::Purchase,
      Self::SaleCash | Self::SaleInvoice => MovementKind::Sale,
      Self::StockCorrection => MovementKind::Correction,
    }
  }
}

impl TryFrom<i64> for InvoiceType {
  type Error = Error;

  fn try_from(code: i64) -> Result<Self, Self::Error> {
    match code {
      1 => Ok(Self::PurchaseCash),
      2 => Ok(Self::PurchaseInvoice),
      3 => Ok(Self::SaleCash),
      4 => Ok(Self::SaleInvoice),
      5 => Ok(Self::StockCorrection),
      other => Err(Error::UnknownInvoiceType(other)),
    }
  }
}

impl From<InvoiceType> for i64 {
  fn from(t: InvoiceType) -> Self {
    match t {
      InvoiceType::PurchaseCash => 1,
      InvoiceType::PurchaseInvoice => 2,
      InvoiceType::SaleCash => 3,
      InvoiceType::SaleInvoice => 4,
      InvoiceType::StockCorrection => 5,
    }
  }
}

/// Counterparty details copied onto the invoice when it is issued. Later
/// edits to the contact do not change issued invoices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartySnapshot {
  pub ico:          Option<String>,
  pub modifier:     Option<u8>,
  pub dic:          Option<String>,
  pub company_name: Option<String>,
  pub street:       Option<String>,
  pub city:         Option<String>,
  pub postal_code:  Option<String>,
  pub bank_account: Option<String>,
  pub bank_code:    Option<String>,
}

impl From<&Contact> for CounterpartySnapshot {
  fn from(c: &Contact) -> Self {
    Self {
      ico:          Some(c.ico.clone()),
      modifier:     Some(c.modifier),
      dic:          c.dic.clone(),
      company_name: Some(c.company_name.clone()),
      street:       c.street.clone(),
      city:         c.city.clone(),
      postal_code:  c.postal_code.clone(),
      bank_account: c.bank_account.clone(),
      bank_code:    c.bank_code.clone(),
    }
  }
}

/// A transaction header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
  pub prefix:          String,
  pub number:          i64,
  #[serde(rename = "type")]
  pub invoice_type:    InvoiceType,
  pub date_issue:      NaiveDate,
  pub date_tax:        Option<NaiveDate>,
  pub date_due:        Option<NaiveDate>,
  pub payment_method:  Option<String>,
  pub variable_symbol: Option<String>,
  pub note:            Option<String>,
  #[serde(flatten)]
  pub counterparty:    CounterpartySnapshot,
}

impl Invoice {
  pub fn key(&self) -> InvoiceKey { InvoiceKey::new(self.prefix.clone(), self.number) }
}

pub static INVOICE_PATCH: PatchTarget = PatchTarget {
  entity: Entity::Invoice,
  table:  "invoices",
  key:    &["prefix", "number"],
  fields: &[
    Field::required("type", FieldKind::Integer { min: 1, max: 5 }),
    Field::required("date_issue", FieldKind::Date),
    Field::optional("date_tax", FieldKind::Date),
    Field::optional("date_due", FieldKind::Date),
    Field::optional("payment_method", FieldKind::Text),
    Field::optional("variable_symbol", FieldKind::Text),
    Field::optional("note", FieldKind::Text),
    Field::optional("ico", FieldKind::Text),
    Field::optional("modifier", FieldKind::Integer { min: 1, max: 100 }),
    Field::optional("dic", FieldKind::Text),
    Field::optional("company_name", FieldKind::Text),
    Field::optional("street", FieldKind::Text),
    Field::optional("city", FieldKind::Text),
    Field::optional("postal_code", FieldKind::Text),
    Field::optional("bank_account", FieldKind::Text),
    Field::optional("bank_code", FieldKind::Text),
  ],
};
