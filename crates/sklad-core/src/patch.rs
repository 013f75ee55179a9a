//! The partial-update validator shared by every entity.
//!
//! Callers send a sparse JSON object of fields to change. A [`PatchTarget`]
//! describes one table: which columns form its key and which columns may be
//! written. [`PatchTarget::validate`] turns the sparse map into a
//! [`Mutation`]: a field-whitelisted, typed assignment list that renders as a
//! single parameterised `UPDATE`. Column names in the rendered statement only
//! ever come from the static whitelist, never from caller input.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde_json::Value;

use crate::{Entity, Error, Result};

/// A sparse update: field name to new value.
pub type Patch = serde_json::Map<String, Value>;

/// Bookkeeping columns maintained by the store; silently dropped from patches.
const TIMESTAMP_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

// ─── Field description ───────────────────────────────────────────────────────

/// The accepted shape of an updatable column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
  Text,
  /// A decimal quantity, stored exactly as submitted.
  Decimal,
  /// A decimal price that must not be negative.
  Price,
  /// An integer code within an inclusive range.
  Integer { min: i64, max: i64 },
  Bool,
  /// An ISO 8601 calendar date (`YYYY-MM-DD`).
  Date,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
  pub name:     &'static str,
  pub kind:     FieldKind,
  pub nullable: bool,
}

impl Field {
  pub const fn required(name: &'static str, kind: FieldKind) -> Self {
    Self { name, kind, nullable: false }
  }

  pub const fn optional(name: &'static str, kind: FieldKind) -> Self {
    Self { name, kind, nullable: true }
  }

  fn convert(&self, value: Value) -> Result<ColumnValue> {
    let invalid = |reason: &str| Error::InvalidValue {
      field:  self.name.to_owned(),
      reason: reason.to_owned(),
    };

    match (self.kind, value) {
      (_, Value::Null) if self.nullable => Ok(ColumnValue::Null),
      (_, Value::Null) => Err(invalid("must not be null")),

      (FieldKind::Text, Value::String(s)) => Ok(ColumnValue::Text(s)),
      (FieldKind::Text, _) => Err(invalid("expected a string")),

      (FieldKind::Decimal, Value::String(s)) => {
        Decimal::from_str(&s).map_err(|_| invalid("expected a decimal number"))?;
        Ok(ColumnValue::Text(s))
      }
      (FieldKind::Decimal, Value::Number(n)) => {
        let s = n.to_string();
        Decimal::from_str(&s).map_err(|_| invalid("expected a decimal number"))?;
        Ok(ColumnValue::Text(s))
      }
      (FieldKind::Decimal, _) => Err(invalid("expected a decimal number")),

      (FieldKind::Price, Value::String(s)) => match Decimal::from_str(&s) {
        Ok(d) if d >= Decimal::ZERO => Ok(ColumnValue::Text(s)),
        _ => Err(invalid("expected a non-negative decimal number")),
      },
      (FieldKind::Price, Value::Number(n)) => {
        let s = n.to_string();
        match Decimal::from_str(&s) {
          Ok(d) if d >= Decimal::ZERO => Ok(ColumnValue::Text(s)),
          _ => Err(invalid("expected a non-negative decimal number")),
        }
      }
      (FieldKind::Price, _) => Err(invalid("expected a non-negative decimal number")),

      (FieldKind::Integer { min, max }, Value::Number(n)) => match n.as_i64() {
        Some(i) if (min..=max).contains(&i) => Ok(ColumnValue::Integer(i)),
        _ => Err(invalid(&format!("expected an integer in {min}..={max}"))),
      },
      (FieldKind::Integer { min, max }, _) => {
        Err(invalid(&format!("expected an integer in {min}..={max}")))
      }

      (FieldKind::Bool, Value::Bool(b)) => Ok(ColumnValue::Bool(b)),
      (FieldKind::Bool, _) => Err(invalid("expected a boolean")),

      (FieldKind::Date, Value::String(s)) => {
        NaiveDate::from_str(&s).map_err(|_| invalid("expected a YYYY-MM-DD date"))?;
        Ok(ColumnValue::Text(s))
      }
      (FieldKind::Date, _) => Err(invalid("expected a YYYY-MM-DD date")),
    }
  }
}

/// Describes how one entity table may be partially updated.
#[derive(Debug)]
pub struct PatchTarget {
  pub entity: Entity,
  pub table:  &'static str,
  /// Primary-key columns, in predicate order. Immutable after creation.
  pub key:    &'static [&'static str],
  /// Whitelist of writable columns.
  pub fields: &'static [Field],
}

impl PatchTarget {
  fn field(&self, name: &str) -> Option<&'static Field> {
    self.fields.iter().find(|f| f.name == name)
  }

  /// Validate `patch` against this target.
  ///
  /// Key columns and timestamps are stripped first. Any remaining field not
  /// in the whitelist fails with [`Error::InvalidField`]; an empty remainder
  /// fails with [`Error::NoFieldsToUpdate`]; a value of the wrong shape fails
  /// with [`Error::InvalidValue`].
  pub fn validate(
    &'static self,
    patch: Patch,
    now: DateTime<Utc>,
  ) -> Result<Mutation> {
    let remaining: Vec<(String, Value)> = patch
      .into_iter()
      .filter(|(name, _)| {
        !self.key.contains(&name.as_str())
          && !TIMESTAMP_COLUMNS.contains(&name.as_str())
      })
      .collect();

    let mut fields = Vec::with_capacity(remaining.len());
    for (name, value) in remaining {
      let field = self.field(&name).ok_or(Error::InvalidField {
        entity: self.entity,
        field:  name,
      })?;
      fields.push((field, value));
    }

    if fields.is_empty() {
      return Err(Error::NoFieldsToUpdate);
    }

    let assignments = fields
      .into_iter()
      .map(|(field, value)| Ok((field.name, field.convert(value)?)))
      .collect::<Result<Vec<_>>>()?;

    Ok(Mutation { target: self, assignments, touched_at: now })
  }
}

// ─── Mutation ────────────────────────────────────────────────────────────────

/// A typed value bound to one statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnValue {
  Null,
  Text(String),
  Integer(i64),
  Bool(bool),
}

/// A validated partial update, ready to be bound and executed.
#[derive(Debug)]
pub struct Mutation {
  pub target:      &'static PatchTarget,
  /// Whitelisted column assignments, in patch order.
  pub assignments: Vec<(&'static str, ColumnValue)>,
  /// Value written to `updated_at`.
  pub touched_at:  DateTime<Utc>,
}

impl Mutation {
  /// Render the `UPDATE` statement.
  ///
  /// Parameters are numbered: assignments first (`?1..?n`), then
  /// `updated_at` (`?n+1`), then the key columns in
  /// [`PatchTarget::key`] order.
  pub fn statement(&self) -> String {
    let mut sets: Vec<String> = self
      .assignments
      .iter()
      .enumerate()
      .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
      .collect();
    let touched = sets.len() + 1;
    sets.push(format!("updated_at = ?{touched}"));

    let predicate = self
      .target
      .key
      .iter()
      .enumerate()
      .map(|(i, column)| format!("{column} = ?{}", touched + 1 + i))
      .collect::<Vec<_>>()
      .join(" AND ");

    format!(
      "UPDATE {} SET {} WHERE {}",
      self.target.table,
      sets.join(", "),
      predicate
    )
  }
}
