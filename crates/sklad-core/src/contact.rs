//! Contacts: trading partners that appear on invoices.
//!
//! Invoices do not reference contacts by foreign key; they copy a
//! [`CounterpartySnapshot`](crate::invoice::CounterpartySnapshot) at creation
//! time, so contacts can be edited or deleted without touching the ledger.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
  Entity,
  patch::{Field, FieldKind, PatchTarget},
};

/// Composite key of a contact: business id plus a disambiguator (1–100) for
/// several branches sharing one `ico`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactKey {
  pub ico:      String,
  pub modifier: u8,
}

impl ContactKey {
  pub fn new(ico: impl Into<String>, modifier: u8) -> Self {
    Self { ico: ico.into(), modifier }
  }
}

impl fmt::Display for ContactKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{}", self.ico, self.modifier)
  }
}

/// A supplier and/or customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
  pub ico:          String,
  pub modifier:     u8,
  pub dic:          Option<String>,
  pub company_name: String,
  pub is_supplier:  bool,
  pub is_customer:  bool,
  /// Which of the four item sale prices applies to this customer (1–4).
  pub price_group:  u8,
  pub street:       Option<String>,
  pub city:         Option<String>,
  pub postal_code:  Option<String>,
  pub phone:        Option<String>,
  pub email:        Option<String>,
  pub web:          Option<String>,
  pub bank_account: Option<String>,
  pub bank_code:    Option<String>,
  pub note:         Option<String>,
}

impl Contact {
  pub fn key(&self) -> ContactKey { ContactKey::new(self.ico.clone(), self.modifier) }
}

pub static CONTACT_PATCH: PatchTarget = PatchTarget {
  entity: Entity::Contact,
  table:  "contacts",
  key:    &["ico", "modifier"],
  fields: &[
    Field::optional("dic", FieldKind::Text),
    Field::required("company_name", FieldKind::Text),
    Field::required("is_supplier", FieldKind::Bool),
    Field::required("is_customer", FieldKind::Bool),
    Field::required("price_group", FieldKind::Integer { min: 1, max: 4 }),
    Field::optional("street", FieldKind::Text),
    Field::optional("city", FieldKind::Text),
    Field::optional("postal_code", FieldKind::Text),
    Field::optional("phone", FieldKind::Text),
    Field::optional("email", FieldKind::Text),
    Field::optional("web", FieldKind::Text),
    Field::optional("bank_account", FieldKind::Text),
    Field::optional("bank_code", FieldKind::Text),
    Field::optional("note", FieldKind::Text),
  ],
};
