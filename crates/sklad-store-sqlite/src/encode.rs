//! Encoding and decoding helpers between Rust domain types and the plain
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, decimals
//! are their canonical string form and enums are their numeric codes.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use rusqlite::types::Value;
use sklad_core::{
  contact::Contact,
  costing::{CostingEntry, parse_decimal},
  invoice::{CounterpartySnapshot, Invoice, InvoiceKey, InvoiceType},
  item::{Item, VatRate},
  movement::StockMovement,
  patch::ColumnValue,
};

use crate::{Error, Result, schema::CHECK_RULES};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── NaiveDate ───────────────────────────────────────────────────────────────

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::from_str(s).map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

fn decode_opt_date(s: Option<String>) -> Result<Option<NaiveDate>> {
  s.as_deref().map(decode_date).transpose()
}

// ─── Decimal ─────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal) -> String { d.to_string() }

// ─── Patch values ────────────────────────────────────────────────────────────

pub fn bind_value(v: ColumnValue) -> Value {
  match v {
    ColumnValue::Null => Value::Null,
    ColumnValue::Text(s) => Value::Text(s),
    ColumnValue::Integer(i) => Value::Integer(i),
    ColumnValue::Bool(b) => Value::Integer(i64::from(b)),
  }
}

// ─── Constraint failures ─────────────────────────────────────────────────────

fn constraint_code(err: &rusqlite::Error) -> Option<std::ffi::c_int> {
  match err {
    rusqlite::Error::SqliteFailure(e, _)
      if e.code == rusqlite::ErrorCode::ConstraintViolation =>
    {
      Some(e.extended_code)
    }
    _ => None,
  }
}

/// A primary-key or UNIQUE collision.
pub fn is_unique_violation(err: &rusqlite::Error) -> bool {
  matches!(
    constraint_code(err),
    Some(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
      | Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
  )
}

pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
  constraint_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

/// The domain error behind a failed named `CHECK` constraint, if it is one
/// of [`CHECK_RULES`].
pub fn check_failure(err: &rusqlite::Error) -> Option<sklad_core::Error> {
  if constraint_code(err) != Some(rusqlite::ffi::SQLITE_CONSTRAINT_CHECK) {
    return None;
  }
  let rusqlite::Error::SqliteFailure(_, Some(message)) = err else {
    return None;
  };
  let name = message.rsplit(": ").next()?;
  CHECK_RULES
    .iter()
    .find(|(constraint, ..)| *constraint == name)
    .map(|(_, field, reason)| sklad_core::Error::InvalidValue {
      field:  (*field).to_owned(),
      reason: (*reason).to_owned(),
    })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub fn read_contact(row: &rusqlite::Row<'_>) -> rusqlite::Result<Contact> {
  Ok(Contact {
    ico:          row.get("ico")?,
    modifier:     row.get("modifier")?,
    dic:          row.get("dic")?,
    company_name: row.get("company_name")?,
    is_supplier:  row.get("is_supplier")?,
    is_customer:  row.get("is_customer")?,
    price_group:  row.get("price_group")?,
    street:       row.get("street")?,
    city:         row.get("city")?,
    postal_code:  row.get("postal_code")?,
    phone:        row.get("phone")?,
    email:        row.get("email")?,
    web:          row.get("web")?,
    bank_account: row.get("bank_account")?,
    bank_code:    row.get("bank_code")?,
    note:         row.get("note")?,
  })
}

/// Raw values read directly from an `items` row.
pub struct RawItem {
  pub ean:               String,
  pub name:              String,
  pub category:          Option<String>,
  pub note:              Option<String>,
  pub vat_rate:          i64,
  pub unit_of_measure:   String,
  pub sale_price_group1: String,
  pub sale_price_group2: String,
  pub sale_price_group3: String,
  pub sale_price_group4: String,
}

impl RawItem {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      ean:               row.get("ean")?,
      name:              row.get("name")?,
      category:          row.get("category")?,
      note:              row.get("note")?,
      vat_rate:          row.get("vat_rate")?,
      unit_of_measure:   row.get("unit_of_measure")?,
      sale_price_group1: row.get("sale_price_group1")?,
      sale_price_group2: row.get("sale_price_group2")?,
      sale_price_group3: row.get("sale_price_group3")?,
      sale_price_group4: row.get("sale_price_group4")?,
    })
  }

  pub fn into_item(self) -> Result<Item> {
    Ok(Item {
      ean:               self.ean,
      name:              self.name,
      category:          self.category,
      note:              self.note,
      vat_rate:          VatRate::try_from(self.vat_rate)?,
      unit_of_measure:   self.unit_of_measure,
      sale_price_group1: parse_decimal(&self.sale_price_group1)?,
      sale_price_group2: parse_decimal(&self.sale_price_group2)?,
      sale_price_group3: parse_decimal(&self.sale_price_group3)?,
      sale_price_group4: parse_decimal(&self.sale_price_group4)?,
    })
  }
}

/// Raw values read directly from an `invoices` row.
pub struct RawInvoice {
  pub prefix:          String,
  pub number:          i64,
  pub invoice_type:    i64,
  pub date_issue:      String,
  pub date_tax:        Option<String>,
  pub date_due:        Option<String>,
  pub payment_method:  Option<String>,
  pub variable_symbol: Option<String>,
  pub note:            Option<String>,
  pub counterparty:    CounterpartySnapshot,
}

impl RawInvoice {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      prefix:          row.get("prefix")?,
      number:          row.get("number")?,
      invoice_type:    row.get("type")?,
      date_issue:      row.get("date_issue")?,
      date_tax:        row.get("date_tax")?,
      date_due:        row.get("date_due")?,
      payment_method:  row.get("payment_method")?,
      variable_symbol: row.get("variable_symbol")?,
      note:            row.get("note")?,
      counterparty:    CounterpartySnapshot {
        ico:          row.get("ico")?,
        modifier:     row.get("modifier")?,
        dic:          row.get("dic")?,
        company_name: row.get("company_name")?,
        street:       row.get("street")?,
        city:         row.get("city")?,
        postal_code:  row.get("postal_code")?,
        bank_account: row.get("bank_account")?,
        bank_code:    row.get("bank_code")?,
      },
    })
  }

  pub fn into_invoice(self) -> Result<Invoice> {
    Ok(Invoice {
      prefix:          self.prefix,
      number:          self.number,
      invoice_type:    InvoiceType::try_from(self.invoice_type)?,
      date_issue:      decode_date(&self.date_issue)?,
      date_tax:        decode_opt_date(self.date_tax)?,
      date_due:        decode_opt_date(self.date_due)?,
      payment_method:  self.payment_method,
      variable_symbol: self.variable_symbol,
      note:            self.note,
      counterparty:    self.counterparty,
    })
  }
}

/// Raw values read directly from a `stock_movements` row.
pub struct RawMovement {
  pub invoice_prefix: String,
  pub invoice_number: i64,
  pub item_ean:       String,
  pub amount:         String,
  pub price_per_unit: String,
  pub vat_rate:       i64,
  pub reset_point:    bool,
}

impl RawMovement {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      invoice_prefix: row.get("invoice_prefix")?,
      invoice_number: row.get("invoice_number")?,
      item_ean:       row.get("item_ean")?,
      amount:         row.get("amount")?,
      price_per_unit: row.get("price_per_unit")?,
      vat_rate:       row.get("vat_rate")?,
      reset_point:    row.get("reset_point")?,
    })
  }

  pub fn into_movement(self) -> Result<StockMovement> {
    Ok(StockMovement {
      invoice_prefix: self.invoice_prefix,
      invoice_number: self.invoice_number,
      item_ean:       self.item_ean,
      amount:         self.amount,
      price_per_unit: self.price_per_unit,
      vat_rate:       VatRate::try_from(self.vat_rate)?,
      reset_point:    self.reset_point,
    })
  }
}

/// A movement row joined with its invoice's type and issue date.
pub struct RawCostingLine {
  pub invoice_prefix: String,
  pub invoice_number: i64,
  pub date_issue:     String,
  pub invoice_type:   i64,
  pub amount:         String,
  pub price_per_unit: String,
  pub reset_point:    bool,
}

impl RawCostingLine {
  pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      invoice_prefix: row.get("invoice_prefix")?,
      invoice_number: row.get("invoice_number")?,
      date_issue:     row.get("date_issue")?,
      invoice_type:   row.get("type")?,
      amount:         row.get("amount")?,
      price_per_unit: row.get("price_per_unit")?,
      reset_point:    row.get("reset_point")?,
    })
  }

  pub fn into_entry(self) -> Result<CostingEntry> {
    Ok(CostingEntry {
      invoice:        InvoiceKey::new(self.invoice_prefix, self.invoice_number),
      date_issue:     decode_date(&self.date_issue)?,
      kind:           InvoiceType::try_from(self.invoice_type)?.movement_kind(),
      amount:         parse_decimal(&self.amount)?,
      price_per_unit: parse_decimal(&self.price_per_unit)?,
      reset_point:    self.reset_point,
    })
  }
}
