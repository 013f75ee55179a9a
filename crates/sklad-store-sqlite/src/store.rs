//! [`SqliteStore`]: the SQLite implementation of the Sklad store traits.

use std::path::Path;

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use rust_decimal::Decimal;
use sklad_core::{
  Entity,
  contact::{CONTACT_PATCH, Contact, ContactKey},
  costing::{self, CostingEntry, parse_decimal},
  invoice::{INVOICE_PATCH, Invoice, InvoiceKey, InvoiceType},
  item::{ITEM_PATCH, Item},
  movement::{MovementKey, NewStockMovement, STOCK_MOVEMENT_PATCH, StockMovement},
  patch::{Patch, PatchTarget},
  store::{
    Backend, ContactStore, Costing, InvoiceStore, ItemStore, StockLedger,
  },
};
use tracing::debug;

use crate::{
  encode::{
    RawCostingLine, RawInvoice, RawItem, RawMovement, bind_value, check_failure,
    encode_date, encode_decimal, encode_dt, is_foreign_key_violation,
    is_unique_violation, read_contact,
  },
  schema::{SCHEMA, next_seq},
  Error, Result,
};

type CoreError = sklad_core::Error;

const CONTACT_COLUMNS: &str = "ico, modifier, dic, company_name, is_supplier,
  is_customer, price_group, street, city, postal_code, phone, email, web,
  bank_account, bank_code, note";

const ITEM_COLUMNS: &str = "ean, name, category, note, vat_rate,
  unit_of_measure, sale_price_group1, sale_price_group2, sale_price_group3,
  sale_price_group4";

const INVOICE_COLUMNS: &str = "prefix, number, type, date_issue, date_tax,
  date_due, payment_method, variable_symbol, note, ico, modifier, dic,
  company_name, street, city, postal_code, bank_account, bank_code";

const MOVEMENT_COLUMNS: &str = "invoice_prefix, invoice_number, item_ean,
  amount, price_per_unit, vat_rate, reset_point";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Sklad store backed by a single SQLite file.
///
/// Cloning is cheap: the inner connection is reference-counted. All clones
/// share the one connection, which serialises every statement.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Close the connection. Other clones of this store fail afterwards.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Insert one row. Returns `false` on a key collision.
  async fn insert_row(&self, sql: String, params: Vec<Value>) -> Result<bool> {
    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(&sql, rusqlite::params_from_iter(params)) {
          Ok(_) => Ok(Ok(true)),
          Err(e) if is_unique_violation(&e) => Ok(Ok(false)),
          Err(e) => match check_failure(&e) {
            Some(rule) => Ok(Err(rule)),
            None => Err(e.into()),
          },
        }
      })
      .await?;
    Ok(inserted?)
  }

  /// Validate `patch` against `target` and apply it to the row matching
  /// `key`. `key` values are bound in [`PatchTarget::key`] order.
  ///
  /// With `ledger_scope` set (a query selecting the item EANs the row feeds
  /// into, bound with `key`), the update is rolled back unless every
  /// affected item's figures stay representable.
  async fn apply_patch(
    &self,
    target: &'static PatchTarget,
    key: Vec<Value>,
    key_display: String,
    patch: Patch,
    ledger_scope: Option<&'static str>,
  ) -> Result<()> {
    let mutation = target.validate(patch, Utc::now())?;
    let sql = mutation.statement();

    let mut params: Vec<Value> = mutation
      .assignments
      .into_iter()
      .map(|(_, v)| bind_value(v))
      .collect();
    params.push(Value::Text(encode_dt(mutation.touched_at)));
    params.extend(key.iter().cloned());

    let affected = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let affected = match tx.execute(&sql, rusqlite::params_from_iter(params)) {
          Ok(n) => n,
          Err(e) => {
            return match check_failure(&e) {
              Some(rule) => Ok(Err(rule.into())),
              None => Err(e.into()),
            };
          }
        };
        if affected > 0
          && let Some(scope) = ledger_scope
          && let Err(e) = check_ledger(&tx, scope, &key)?
        {
          return Ok(Err(e));
        }
        tx.commit()?;
        Ok(Ok(affected))
      })
      .await??;

    if affected == 0 {
      return Err(CoreError::not_found(target.entity, key_display).into());
    }
    debug!(entity = %target.entity, key = %key_display, "row updated");
    Ok(())
  }

  /// Run a single-row `DELETE`; `NotFound` if nothing matched.
  async fn delete_row(
    &self,
    entity: Entity,
    sql: &'static str,
    key: Vec<Value>,
    key_display: String,
  ) -> Result<()> {
    let affected = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params_from_iter(key))?))
      .await?;

    if affected == 0 {
      return Err(CoreError::not_found(entity, key_display).into());
    }
    Ok(())
  }
}

fn contact_key_params(key: &ContactKey) -> Vec<Value> {
  vec![Value::Text(key.ico.clone()), Value::Integer(i64::from(key.modifier))]
}

fn invoice_key_params(key: &InvoiceKey) -> Vec<Value> {
  vec![Value::Text(key.prefix.clone()), Value::Integer(key.number)]
}

fn movement_key_params(key: &MovementKey) -> Vec<Value> {
  vec![
    Value::Text(key.invoice_prefix.clone()),
    Value::Integer(key.invoice_number),
    Value::Text(key.item_ean.clone()),
  ]
}

fn select_costing_lines(
  conn: &rusqlite::Connection,
  ean: &str,
) -> rusqlite::Result<Vec<RawCostingLine>> {
  let mut stmt = conn.prepare(
    "SELECT
       m.invoice_prefix, m.invoice_number, i.date_issue, i.type,
       m.amount, m.price_per_unit, m.reset_point
     FROM stock_movements m
     JOIN invoices i
       ON i.prefix = m.invoice_prefix AND i.number = m.invoice_number
     WHERE m.item_ean = ?1
     ORDER BY i.date_issue, m.seq",
  )?;
  stmt
    .query_map(rusqlite::params![ean], RawCostingLine::read)?
    .collect()
}

fn select_movements(
  conn: &rusqlite::Connection,
  filter: &str,
  params: Vec<Value>,
) -> rusqlite::Result<Vec<RawMovement>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE {filter} ORDER BY seq"
  ))?;
  stmt
    .query_map(rusqlite::params_from_iter(params), RawMovement::read)?
    .collect()
}

/// Fails unless every figure of `ean`, as currently stored, fits a decimal.
fn check_item(conn: &rusqlite::Connection, ean: &str) -> rusqlite::Result<Result<()>> {
  let entries = select_costing_lines(conn, ean)?
    .into_iter()
    .map(RawCostingLine::into_entry)
    .collect::<Result<Vec<_>>>();
  Ok(entries.and_then(|e| Ok(costing::check_representable(&e)?)))
}

/// [`check_item`] for every EAN selected by `scope`.
fn check_ledger(
  conn: &rusqlite::Connection,
  scope: &str,
  key: &[Value],
) -> rusqlite::Result<Result<()>> {
  let eans = conn
    .prepare(scope)?
    .query_map(rusqlite::params_from_iter(key), |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  for ean in eans {
    let checked = check_item(conn, &ean)?;
    if checked.is_err() {
      return Ok(checked);
    }
  }
  Ok(Ok(()))
}

/// Record a movement inside one transaction: referential checks, reset-point
/// classification against the current stock, and the insert either all
/// happen or none do. The insert is rolled back if it would push any of the
/// item's figures out of decimal range.
fn insert_movement(
  conn: &mut rusqlite::Connection,
  input: NewStockMovement,
  amount: Decimal,
  now: String,
) -> rusqlite::Result<Result<StockMovement>> {
  let tx = conn.transaction()?;
  let key = input.key();

  let invoice_type: Option<i64> = tx
    .query_row(
      "SELECT type FROM invoices WHERE prefix = ?1 AND number = ?2",
      rusqlite::params![input.invoice_prefix, input.invoice_number],
      |row| row.get(0),
    )
    .optional()?;
  let Some(invoice_type) = invoice_type else {
    return Ok(Err(CoreError::InvoiceNotFound(key.invoice()).into()));
  };

  let item_exists = tx
    .query_row(
      "SELECT 1 FROM items WHERE ean = ?1",
      rusqlite::params![input.item_ean],
      |_| Ok(()),
    )
    .optional()?
    .is_some();
  if !item_exists {
    return Ok(Err(CoreError::ItemNotFound(input.item_ean).into()));
  }

  let entries = select_costing_lines(&tx, &input.item_ean)?
    .into_iter()
    .map(RawCostingLine::into_entry)
    .collect::<Result<Vec<_>>>();
  let (entries, kind) = match (entries, InvoiceType::try_from(invoice_type)) {
    (Ok(entries), Ok(t)) => (entries, t.movement_kind()),
    (Err(e), _) => return Ok(Err(e)),
    (_, Err(e)) => return Ok(Err(e.into())),
  };

  let classified = costing::stock_amount(&entries)
    .and_then(|current| Ok((current, costing::is_reset_point(current, kind.signed(amount))?)));
  let (current, reset_point) = match classified {
    Ok(c) => c,
    Err(e) => return Ok(Err(e.into())),
  };
  let movement = StockMovement::from_new(input, reset_point);

  let inserted = tx.execute(
    &format!(
      "INSERT INTO stock_movements (seq, {MOVEMENT_COLUMNS}, created_at, updated_at)
       VALUES ({}, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
      next_seq("stock_movements"),
    ),
    rusqlite::params![
      movement.invoice_prefix,
      movement.invoice_number,
      movement.item_ean,
      movement.amount,
      movement.price_per_unit,
      i64::from(movement.vat_rate),
      movement.reset_point,
      now,
    ],
  );
  match inserted {
    Ok(_) => {}
    Err(e) if is_unique_violation(&e) => {
      return Ok(Err(CoreError::DuplicateMovement(key).into()));
    }
    Err(e) => return Err(e),
  }
  if let Err(e) = check_item(&tx, &movement.item_ean)? {
    return Ok(Err(e));
  }
  tx.commit()?;

  if reset_point {
    debug!(movement = %key, %current, "movement depletes stock; tagged as reset point");
  }
  Ok(Ok(movement))
}

// ─── Trait impls ─────────────────────────────────────────────────────────────

impl Backend for SqliteStore {
  type Error = Error;
}

impl ContactStore for SqliteStore {
  async fn create_contact(&self, contact: Contact) -> Result<Contact> {
    let key = contact.key();
    let now = encode_dt(Utc::now());
    let c = contact.clone();
    let params = vec![
      Value::Text(c.ico),
      Value::Integer(i64::from(c.modifier)),
      c.dic.into(),
      Value::Text(c.company_name),
      Value::Integer(i64::from(c.is_supplier)),
      Value::Integer(i64::from(c.is_customer)),
      Value::Integer(i64::from(c.price_group)),
      c.street.into(),
      c.city.into(),
      c.postal_code.into(),
      c.phone.into(),
      c.email.into(),
      c.web.into(),
      c.bank_account.into(),
      c.bank_code.into(),
      c.note.into(),
      Value::Text(now.clone()),
      Value::Text(now),
    ];

    let sql = format!(
      "INSERT INTO contacts (seq, {CONTACT_COLUMNS}, created_at, updated_at)
       VALUES ({}, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
      next_seq("contacts"),
    );
    if !self.insert_row(sql, params).await? {
      return Err(CoreError::duplicate(Entity::Contact, key).into());
    }
    Ok(contact)
  }

  async fn get_contact(&self, key: ContactKey) -> Result<Option<Contact>> {
    let contact = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {CONTACT_COLUMNS} FROM contacts WHERE ico = ?1 AND modifier = ?2"
            ),
            rusqlite::params![key.ico, key.modifier],
            read_contact,
          )
          .optional()?)
      })
      .await?;
    Ok(contact)
  }

  async fn list_contacts(&self) -> Result<Vec<Contact>> {
    let contacts = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {CONTACT_COLUMNS} FROM contacts ORDER BY seq"))?;
        let rows = stmt
          .query_map([], read_contact)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(contacts)
  }

  async fn update_contact(&self, key: ContactKey, patch: Patch) -> Result<()> {
    self
      .apply_patch(&CONTACT_PATCH, contact_key_params(&key), key.to_string(), patch, None)
      .await
  }

  async fn delete_contact(&self, key: ContactKey) -> Result<()> {
    self
      .delete_row(
        Entity::Contact,
        "DELETE FROM contacts WHERE ico = ?1 AND modifier = ?2",
        contact_key_params(&key),
        key.to_string(),
      )
      .await
  }
}

impl ItemStore for SqliteStore {
  async fn create_item(&self, item: Item) -> Result<Item> {
    let now = encode_dt(Utc::now());
    let i = item.clone();
    let params = vec![
      Value::Text(i.ean),
      Value::Text(i.name),
      i.category.into(),
      i.note.into(),
      Value::Integer(i64::from(i.vat_rate)),
      Value::Text(i.unit_of_measure),
      Value::Text(encode_decimal(i.sale_price_group1)),
      Value::Text(encode_decimal(i.sale_price_group2)),
      Value::Text(encode_decimal(i.sale_price_group3)),
      Value::Text(encode_decimal(i.sale_price_group4)),
      Value::Text(now.clone()),
      Value::Text(now),
    ];

    let sql = format!(
      "INSERT INTO items (seq, {ITEM_COLUMNS}, created_at, updated_at)
       VALUES ({}, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
      next_seq("items"),
    );
    if !self.insert_row(sql, params).await? {
      return Err(CoreError::duplicate(Entity::Item, &item.ean).into());
    }
    Ok(item)
  }

  async fn get_item(&self, ean: String) -> Result<Option<Item>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ITEM_COLUMNS} FROM items WHERE ean = ?1"),
            rusqlite::params![ean],
            RawItem::read,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawItem::into_item).transpose()
  }

  async fn list_items(&self) -> Result<Vec<Item>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {ITEM_COLUMNS} FROM items ORDER BY seq"))?;
        let rows = stmt
          .query_map([], RawItem::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawItem::into_item).collect()
  }

  async fn update_item(&self, ean: String, patch: Patch) -> Result<()> {
    self
      .apply_patch(&ITEM_PATCH, vec![Value::Text(ean.clone())], ean, patch, None)
      .await
  }

  async fn delete_item(&self, ean: String) -> Result<()> {
    let param = ean.clone();
    let affected = self
      .conn
      .call(move |conn| {
        match conn.execute("DELETE FROM items WHERE ean = ?1", rusqlite::params![param]) {
          Ok(n) => Ok(Some(n)),
          Err(e) if is_foreign_key_violation(&e) => Ok(None),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    match affected {
      None => Err(CoreError::ItemInUse(ean).into()),
      Some(0) => Err(CoreError::not_found(Entity::Item, ean).into()),
      Some(_) => Ok(()),
    }
  }
}

impl InvoiceStore for SqliteStore {
  async fn create_invoice(&self, invoice: Invoice) -> Result<Invoice> {
    let key = invoice.key();
    let now = encode_dt(Utc::now());
    let i = invoice.clone();
    let cp = i.counterparty;
    let params = vec![
      Value::Text(i.prefix),
      Value::Integer(i.number),
      Value::Integer(i64::from(i.invoice_type)),
      Value::Text(encode_date(i.date_issue)),
      i.date_tax.map(encode_date).into(),
      i.date_due.map(encode_date).into(),
      i.payment_method.into(),
      i.variable_symbol.into(),
      i.note.into(),
      cp.ico.into(),
      cp.modifier.map(i64::from).into(),
      cp.dic.into(),
      cp.company_name.into(),
      cp.street.into(),
      cp.city.into(),
      cp.postal_code.into(),
      cp.bank_account.into(),
      cp.bank_code.into(),
      Value::Text(now.clone()),
      Value::Text(now),
    ];

    let sql = format!(
      "INSERT INTO invoices (seq, {INVOICE_COLUMNS}, created_at, updated_at)
       VALUES ({}, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
               ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
      next_seq("invoices"),
    );
    if !self.insert_row(sql, params).await? {
      return Err(CoreError::duplicate(Entity::Invoice, key).into());
    }
    Ok(invoice)
  }

  async fn get_invoice(&self, key: InvoiceKey) -> Result<Option<Invoice>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {INVOICE_COLUMNS} FROM invoices WHERE prefix = ?1 AND number = ?2"
            ),
            rusqlite::params![key.prefix, key.number],
            RawInvoice::read,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawInvoice::into_invoice).transpose()
  }

  async fn list_invoices(&self) -> Result<Vec<Invoice>> {
    let raws = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY seq"))?;
        let rows = stmt
          .query_map([], RawInvoice::read)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawInvoice::into_invoice).collect()
  }

  async fn update_invoice(&self, key: InvoiceKey, patch: Patch) -> Result<()> {
    self
      .apply_patch(
        &INVOICE_PATCH,
        invoice_key_params(&key),
        key.to_string(),
        patch,
        Some(
          "SELECT item_ean FROM stock_movements
           WHERE invoice_prefix = ?1 AND invoice_number = ?2",
        ),
      )
      .await
  }

  async fn delete_invoice(&self, key: InvoiceKey) -> Result<()> {
    let params = invoice_key_params(&key);
    let removed: Option<usize> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists = tx
          .query_row(
            "SELECT 1 FROM invoices WHERE prefix = ?1 AND number = ?2",
            rusqlite::params_from_iter(&params),
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        let movements = tx.execute(
          "DELETE FROM stock_movements WHERE invoice_prefix = ?1 AND invoice_number = ?2",
          rusqlite::params_from_iter(&params),
        )?;
        tx.execute(
          "DELETE FROM invoices WHERE prefix = ?1 AND number = ?2",
          rusqlite::params_from_iter(&params),
        )?;
        tx.commit()?;
        Ok(Some(movements))
      })
      .await?;

    let Some(movements) = removed else {
      return Err(CoreError::not_found(Entity::Invoice, key).into());
    };
    debug!(invoice = %key, movements, "invoice deleted with its movements");
    Ok(())
  }
}

impl StockLedger for SqliteStore {
  async fn create_movement(&self, input: NewStockMovement) -> Result<StockMovement> {
    let amount = parse_decimal(&input.amount)?;
    parse_decimal(&input.price_per_unit)?;
    let now = encode_dt(Utc::now());

    let movement = self
      .conn
      .call(move |conn| Ok(insert_movement(conn, input, amount, now)?))
      .await??;
    Ok(movement)
  }

  async fn get_movement(&self, key: MovementKey) -> Result<Option<StockMovement>> {
    let raw = self
      .conn
      .call(move |conn| {
        Ok(select_movements(
          conn,
          "invoice_prefix = ?1 AND invoice_number = ?2 AND item_ean = ?3",
          movement_key_params(&key),
        )?
        .pop())
      })
      .await?;
    raw.map(RawMovement::into_movement).transpose()
  }

  async fn movements_by_invoice(&self, invoice: InvoiceKey) -> Result<Vec<StockMovement>> {
    let raws = self
      .conn
      .call(move |conn| {
        Ok(select_movements(
          conn,
          "invoice_prefix = ?1 AND invoice_number = ?2",
          invoice_key_params(&invoice),
        )?)
      })
      .await?;
    raws.into_iter().map(RawMovement::into_movement).collect()
  }

  async fn movements_by_item(&self, ean: String) -> Result<Vec<StockMovement>> {
    let raws = self
      .conn
      .call(move |conn| {
        Ok(select_movements(conn, "item_ean = ?1", vec![Value::Text(ean)])?)
      })
      .await?;
    raws.into_iter().map(RawMovement::into_movement).collect()
  }

  async fn update_movement(&self, key: MovementKey, patch: Patch) -> Result<()> {
    self
      .apply_patch(
        &STOCK_MOVEMENT_PATCH,
        movement_key_params(&key),
        key.to_string(),
        patch,
        Some(
          "SELECT item_ean FROM stock_movements
           WHERE invoice_prefix = ?1 AND invoice_number = ?2 AND item_ean = ?3",
        ),
      )
      .await
  }

  async fn delete_movement(&self, key: MovementKey) -> Result<()> {
    self
      .delete_row(
        Entity::StockMovement,
        "DELETE FROM stock_movements
         WHERE invoice_prefix = ?1 AND invoice_number = ?2 AND item_ean = ?3",
        movement_key_params(&key),
        key.to_string(),
      )
      .await
  }

  async fn delete_movements_by_invoice(&self, invoice: InvoiceKey) -> Result<usize> {
    let params = invoice_key_params(&invoice);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM stock_movements WHERE invoice_prefix = ?1 AND invoice_number = ?2",
          rusqlite::params_from_iter(params),
        )?)
      })
      .await?;
    debug!(invoice = %invoice, removed, "movements deleted");
    Ok(removed)
  }
}

impl Costing for SqliteStore {
  async fn costing_entries(&self, ean: String) -> Result<Vec<CostingEntry>> {
    let raws = self
      .conn
      .call(move |conn| Ok(select_costing_lines(conn, &ean)?))
      .await?;
    raws.into_iter().map(RawCostingLine::into_entry).collect()
  }
}
