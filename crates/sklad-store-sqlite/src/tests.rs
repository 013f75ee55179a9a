//! Integration tests for `SqliteStore` against an in-memory database.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use sklad_core::{
  Entity,
  contact::{Contact, ContactKey},
  invoice::{CounterpartySnapshot, Invoice, InvoiceKey, InvoiceType},
  item::{Item, VatRate},
  movement::{MovementKey, MovementKind, NewStockMovement},
  patch::Patch,
  store::{
    ContactStore, Costing, InvoiceStore, ItemStore, StockLedger,
  },
};

use crate::{Error, SqliteStore};

type CoreError = sklad_core::Error;

const EAN: &str = "8590000000011";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn dec(s: &str) -> Decimal { Decimal::from_str(s).unwrap() }

fn patch(value: Value) -> Patch {
  match value {
    Value::Object(map) => map,
    other => panic!("not an object: {other}"),
  }
}

fn core_err(err: Error) -> CoreError {
  match err {
    Error::Core(e) => e,
    other => panic!("expected a domain error, got {other:?}"),
  }
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

fn contact(ico: &str, modifier: u8) -> Contact {
  Contact {
    ico:          ico.into(),
    modifier,
    dic:          Some(format!("CZ{ico}")),
    company_name: "Acme s.r.o.".into(),
    is_supplier:  true,
    is_customer:  false,
    price_group:  1,
    street:       Some("Dlouhá 1".into()),
    city:         Some("Praha".into()),
    postal_code:  Some("11000".into()),
    phone:        None,
    email:        Some("orders@acme.example".into()),
    web:          None,
    bank_account: Some("123456789".into()),
    bank_code:    Some("0100".into()),
    note:         None,
  }
}

fn item(ean: &str) -> Item {
  Item {
    ean:               ean.into(),
    name:              "Widget".into(),
    category:          Some("parts".into()),
    note:              None,
    vat_rate:          VatRate::Standard,
    unit_of_measure:   "pcs".into(),
    sale_price_group1: dec("99.90"),
    sale_price_group2: dec("95.00"),
    sale_price_group3: dec("90"),
    sale_price_group4: dec("0"),
  }
}

fn invoice(number: i64, invoice_type: InvoiceType, day: u32) -> Invoice {
  Invoice {
    prefix: "INV-".into(),
    number,
    invoice_type,
    date_issue: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
    date_tax: None,
    date_due: NaiveDate::from_ymd_opt(2024, 4, day),
    payment_method: Some("transfer".into()),
    variable_symbol: Some(number.to_string()),
    note: None,
    counterparty: CounterpartySnapshot::default(),
  }
}

fn movement(number: i64, ean: &str, amount: &str, price: &str) -> NewStockMovement {
  NewStockMovement {
    invoice_prefix: "INV-".into(),
    invoice_number: number,
    item_ean:       ean.into(),
    amount:         amount.into(),
    price_per_unit: price.into(),
    vat_rate:       VatRate::Standard,
  }
}

fn key(number: i64, ean: &str) -> MovementKey {
  MovementKey::new(InvoiceKey::new("INV-", number), ean)
}

/// Create an invoice of `invoice_type` and one movement on it for `ean`.
async fn book(
  s: &SqliteStore,
  number: i64,
  invoice_type: InvoiceType,
  ean: &str,
  amount: &str,
  price: &str,
) {
  s.create_invoice(invoice(number, invoice_type, number as u32 % 28 + 1))
    .await
    .unwrap();
  s.create_movement(movement(number, ean, amount, price))
    .await
    .unwrap();
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn open_file_store_and_close() {
  let dir = std::env::temp_dir().join(format!("sklad-test-{}", std::process::id()));
  std::fs::create_dir_all(&dir).unwrap();
  let path = dir.join("ledger.db");

  let s = SqliteStore::open(&path).await.unwrap();
  s.create_item(item(EAN)).await.unwrap();
  s.close().await.unwrap();

  let reopened = SqliteStore::open(&path).await.unwrap();
  assert!(reopened.get_item(EAN.into()).await.unwrap().is_some());
  reopened.close().await.unwrap();
  std::fs::remove_dir_all(&dir).ok();
}

// ─── Entity stores ───────────────────────────────────────────────────────────

#[tokio::test]
async fn contact_crud_roundtrip() {
  let s = store().await;
  let c = contact("12345678", 1);

  s.create_contact(c.clone()).await.unwrap();
  let fetched = s.get_contact(c.key()).await.unwrap();
  assert_eq!(fetched, Some(c.clone()));

  s.update_contact(c.key(), patch(json!({ "city": "Brno", "is_customer": true })))
    .await
    .unwrap();
  let fetched = s.get_contact(c.key()).await.unwrap().unwrap();
  assert_eq!(fetched.city.as_deref(), Some("Brno"));
  assert!(fetched.is_customer);
  assert_eq!(fetched.company_name, c.company_name);

  s.delete_contact(c.key()).await.unwrap();
  assert!(s.get_contact(c.key()).await.unwrap().is_none());
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get_contact(ContactKey::new("1", 1)).await.unwrap().is_none());
  assert!(s.get_item("nope".into()).await.unwrap().is_none());
  assert!(s.get_invoice(InvoiceKey::new("X", 1)).await.unwrap().is_none());
  assert!(s.get_movement(key(1, EAN)).await.unwrap().is_none());
}

#[tokio::test]
async fn same_ico_with_different_modifier_is_distinct() {
  let s = store().await;
  s.create_contact(contact("12345678", 1)).await.unwrap();
  s.create_contact(contact("12345678", 2)).await.unwrap();

  let err = s.create_contact(contact("12345678", 1)).await.unwrap_err();
  assert_eq!(core_err(err), CoreError::DuplicateKey {
    entity: Entity::Contact,
    key:    "12345678/1".into(),
  });
  assert_eq!(s.list_contacts().await.unwrap().len(), 2);
}

#[tokio::test]
async fn list_preserves_insertion_order() {
  let s = store().await;
  for ean in ["300", "100", "200"] {
    s.create_item(item(ean)).await.unwrap();
  }
  let eans: Vec<_> = s
    .list_items()
    .await
    .unwrap()
    .into_iter()
    .map(|i| i.ean)
    .collect();
  assert_eq!(eans, ["300", "100", "200"]);
}

#[tokio::test]
async fn list_order_survives_rowid_renumbering() {
  let s = store().await;
  for ean in ["300", "100", "200"] {
    s.create_item(item(ean)).await.unwrap();
  }
  // What a VACUUM is free to do to tables without an INTEGER PRIMARY KEY.
  s.conn
    .call(|conn| Ok(conn.execute_batch("UPDATE items SET rowid = 1000 - rowid;")?))
    .await
    .unwrap();

  let eans: Vec<_> = s
    .list_items()
    .await
    .unwrap()
    .into_iter()
    .map(|i| i.ean)
    .collect();
  assert_eq!(eans, ["300", "100", "200"]);
}

#[tokio::test]
async fn contact_must_be_supplier_or_customer() {
  let s = store().await;
  let mut neither = contact("12345678", 1);
  neither.is_supplier = false;
  let err = s.create_contact(neither).await.unwrap_err();
  assert!(matches!(
    core_err(err),
    CoreError::InvalidValue { ref field, .. } if field == "is_supplier"
  ));
  assert!(s.list_contacts().await.unwrap().is_empty());

  let c = contact("12345678", 1);
  s.create_contact(c.clone()).await.unwrap();
  let err = s
    .update_contact(
      c.key(),
      patch(json!({ "is_supplier": false, "is_customer": false })),
    )
    .await
    .unwrap_err();
  assert!(matches!(
    core_err(err),
    CoreError::InvalidValue { ref field, .. } if field == "is_supplier"
  ));
  assert_eq!(s.get_contact(c.key()).await.unwrap(), Some(c.clone()));

  s.update_contact(c.key(), patch(json!({ "is_supplier": false, "is_customer": true })))
    .await
    .unwrap();
}

#[tokio::test]
async fn negative_sale_price_update_is_rejected() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  let err = s
    .update_item(EAN.into(), patch(json!({ "sale_price_group3": "-1.00" })))
    .await
    .unwrap_err();
  assert!(matches!(
    core_err(err),
    CoreError::InvalidValue { ref field, .. } if field == "sale_price_group3"
  ));
  let stored = s.get_item(EAN.into()).await.unwrap().unwrap();
  assert_eq!(stored.sale_price_group3, dec("90"));
}

#[tokio::test]
async fn item_roundtrip_keeps_prices() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  let fetched = s.get_item(EAN.into()).await.unwrap().unwrap();
  assert_eq!(fetched, item(EAN));
  assert_eq!(fetched.sale_price_group1.to_string(), "99.90");
}

#[tokio::test]
async fn duplicate_item_and_invoice_fail() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  let err = s.create_item(item(EAN)).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::DuplicateKey { entity: Entity::Item, .. }));

  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 1)).await.unwrap();
  let err = s
    .create_invoice(invoice(1, InvoiceType::SaleCash, 2))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::DuplicateKey { entity: Entity::Invoice, .. }));
}

#[tokio::test]
async fn invoice_roundtrip_with_counterparty_snapshot() {
  let s = store().await;
  let supplier = contact("87654321", 3);
  let mut inv = invoice(7, InvoiceType::PurchaseInvoice, 5);
  inv.counterparty = CounterpartySnapshot::from(&supplier);

  s.create_invoice(inv.clone()).await.unwrap();
  // Later edits to the contact do not reach the invoice.
  s.create_contact(supplier.clone()).await.unwrap();
  s.update_contact(supplier.key(), patch(json!({ "company_name": "Renamed" })))
    .await
    .unwrap();

  let fetched = s.get_invoice(inv.key()).await.unwrap().unwrap();
  assert_eq!(fetched, inv);
  assert_eq!(fetched.counterparty.company_name.as_deref(), Some("Acme s.r.o."));
  assert_eq!(fetched.counterparty.modifier, Some(3));
}

#[tokio::test]
async fn update_and_delete_missing_fail_with_not_found() {
  let s = store().await;

  let err = s
    .update_item("ghost".into(), patch(json!({ "name": "x" })))
    .await
    .unwrap_err();
  assert_eq!(core_err(err), CoreError::NotFound {
    entity: Entity::Item,
    key:    "ghost".into(),
  });

  let err = s.delete_contact(ContactKey::new("1", 1)).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::NotFound { entity: Entity::Contact, .. }));

  let err = s.delete_movement(key(1, EAN)).await.unwrap_err();
  assert!(matches!(
    core_err(err),
    CoreError::NotFound { entity: Entity::StockMovement, .. }
  ));
}

#[tokio::test]
async fn empty_update_fails_for_every_entity() {
  let s = store().await;
  s.create_contact(contact("1", 1)).await.unwrap();
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "1", "1.00").await;

  let errors = [
    s.update_contact(ContactKey::new("1", 1), Patch::new()).await.unwrap_err(),
    s.update_item(EAN.into(), Patch::new()).await.unwrap_err(),
    s.update_invoice(InvoiceKey::new("INV-", 1), Patch::new()).await.unwrap_err(),
    s.update_movement(key(1, EAN), Patch::new()).await.unwrap_err(),
    // Only key fields: empty after stripping.
    s.update_item(EAN.into(), patch(json!({ "ean": "other" }))).await.unwrap_err(),
  ];
  for err in errors {
    assert_eq!(core_err(err), CoreError::NoFieldsToUpdate);
  }
}

#[tokio::test]
async fn update_rejects_fields_outside_whitelist() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();

  let err = s
    .update_item(EAN.into(), patch(json!({ "avg_purchase_price": "1.00" })))
    .await
    .unwrap_err();
  assert!(matches!(
    core_err(err),
    CoreError::InvalidField { entity: Entity::Item, ref field } if field == "avg_purchase_price"
  ));
  assert_eq!(s.get_item(EAN.into()).await.unwrap().unwrap(), item(EAN));
}

// ─── Ledger ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn movement_roundtrip_preserves_strings() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 1)).await.unwrap();

  let created = s
    .create_movement(movement(1, EAN, "10.500", "50.00"))
    .await
    .unwrap();
  assert!(!created.reset_point);

  let fetched = s.get_movement(key(1, EAN)).await.unwrap().unwrap();
  assert_eq!(fetched, created);
  assert_eq!(fetched.amount, "10.500");
  assert_eq!(fetched.price_per_unit, "50.00");
}

#[tokio::test]
async fn movement_requires_existing_invoice_and_item() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 1)).await.unwrap();

  let err = s
    .create_movement(movement(99, EAN, "1", "1"))
    .await
    .unwrap_err();
  assert_eq!(core_err(err), CoreError::InvoiceNotFound(InvoiceKey::new("INV-", 99)));

  let err = s
    .create_movement(movement(1, "missing", "1", "1"))
    .await
    .unwrap_err();
  assert_eq!(core_err(err), CoreError::ItemNotFound("missing".into()));

  assert!(s.movements_by_item(EAN.into()).await.unwrap().is_empty());
  assert!(s.movements_by_invoice(InvoiceKey::new("INV-", 1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_movement_fails() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "10", "5.00").await;

  let err = s
    .create_movement(movement(1, EAN, "3", "6.00"))
    .await
    .unwrap_err();
  assert_eq!(core_err(err), CoreError::DuplicateMovement(key(1, EAN)));

  let kept = s.get_movement(key(1, EAN)).await.unwrap().unwrap();
  assert_eq!(kept.amount, "10");
}

#[tokio::test]
async fn movement_with_bad_decimal_is_rejected() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 1)).await.unwrap();

  let err = s
    .create_movement(movement(1, EAN, "ten", "1.00"))
    .await
    .unwrap_err();
  assert_eq!(core_err(err), CoreError::InvalidDecimal("ten".into()));
  assert!(s.get_movement(key(1, EAN)).await.unwrap().is_none());
}

#[tokio::test]
async fn movements_by_invoice_and_item() {
  let s = store().await;
  s.create_item(item("A")).await.unwrap();
  s.create_item(item("B")).await.unwrap();
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 1)).await.unwrap();
  s.create_invoice(invoice(2, InvoiceType::SaleCash, 2)).await.unwrap();

  s.create_movement(movement(1, "B", "5", "1")).await.unwrap();
  s.create_movement(movement(1, "A", "5", "1")).await.unwrap();
  s.create_movement(movement(2, "A", "2", "3")).await.unwrap();

  let on_invoice: Vec<_> = s
    .movements_by_invoice(InvoiceKey::new("INV-", 1))
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.item_ean)
    .collect();
  assert_eq!(on_invoice, ["B", "A"]);

  let for_item: Vec<_> = s
    .movements_by_item("A".into())
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.invoice_number)
    .collect();
  assert_eq!(for_item, [1, 2]);
}

#[tokio::test]
async fn movement_update_is_limited_to_quantity_and_price() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "10", "5.00").await;

  s.update_movement(key(1, EAN), patch(json!({ "amount": "12", "price_per_unit": "4.75" })))
    .await
    .unwrap();
  let m = s.get_movement(key(1, EAN)).await.unwrap().unwrap();
  assert_eq!((m.amount.as_str(), m.price_per_unit.as_str()), ("12", "4.75"));

  let err = s
    .update_movement(key(1, EAN), patch(json!({ "vat_rate": 0 })))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::InvalidField { .. }));

  // Linkage fields are stripped, not applied.
  s.update_movement(
    key(1, EAN),
    patch(json!({ "item_ean": "other", "reset_point": true })),
  )
  .await
  .unwrap();
  let m = s.get_movement(key(1, EAN)).await.unwrap().unwrap();
  assert_eq!(m.item_ean, EAN);
  assert!(m.reset_point);

  let err = s
    .update_movement(key(2, EAN), patch(json!({ "amount": "1" })))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::NotFound { .. }));
}

#[tokio::test]
async fn delete_movements_by_invoice_counts_rows() {
  let s = store().await;
  s.create_item(item("A")).await.unwrap();
  s.create_item(item("B")).await.unwrap();
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 1)).await.unwrap();
  s.create_movement(movement(1, "A", "1", "1")).await.unwrap();
  s.create_movement(movement(1, "B", "1", "1")).await.unwrap();

  let removed = s
    .delete_movements_by_invoice(InvoiceKey::new("INV-", 1))
    .await
    .unwrap();
  assert_eq!(removed, 2);
  assert!(s.get_invoice(InvoiceKey::new("INV-", 1)).await.unwrap().is_some());
}

#[tokio::test]
async fn item_with_movements_cannot_be_deleted() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "1", "1").await;

  let err = s.delete_item(EAN.into()).await.unwrap_err();
  assert_eq!(core_err(err), CoreError::ItemInUse(EAN.into()));
  assert!(s.get_item(EAN.into()).await.unwrap().is_some());

  let err = s.delete_item("ghost".into()).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::NotFound { entity: Entity::Item, .. }));
}

// ─── Cascade ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_invoice_removes_its_movements() {
  let s = store().await;
  for ean in ["A", "B", "C"] {
    s.create_item(item(ean)).await.unwrap();
  }
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 1)).await.unwrap();
  s.create_invoice(invoice(2, InvoiceType::PurchaseCash, 2)).await.unwrap();
  for ean in ["A", "B", "C"] {
    s.create_movement(movement(1, ean, "1", "1")).await.unwrap();
  }
  s.create_movement(movement(2, "A", "4", "1")).await.unwrap();

  s.delete_invoice(InvoiceKey::new("INV-", 1)).await.unwrap();

  assert!(s.get_invoice(InvoiceKey::new("INV-", 1)).await.unwrap().is_none());
  assert!(s.movements_by_invoice(InvoiceKey::new("INV-", 1)).await.unwrap().is_empty());
  // Other invoices are untouched.
  assert_eq!(s.movements_by_item("A".into()).await.unwrap().len(), 1);
  assert_eq!(s.stock_amount("A".into()).await.unwrap(), dec("4"));
}

#[tokio::test]
async fn deleting_missing_invoice_changes_nothing() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "3", "1").await;

  let err = s.delete_invoice(InvoiceKey::new("INV-", 2)).await.unwrap_err();
  assert!(matches!(core_err(err), CoreError::NotFound { entity: Entity::Invoice, .. }));

  assert_eq!(s.list_invoices().await.unwrap().len(), 1);
  assert_eq!(s.movements_by_item(EAN.into()).await.unwrap().len(), 1);
}

// ─── Costing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn item_without_movements_has_zero_figures() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();

  assert_eq!(s.stock_amount(EAN.into()).await.unwrap(), Decimal::ZERO);
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), Decimal::ZERO);
  assert_eq!(s.last_buy_price(EAN.into()).await.unwrap(), Decimal::ZERO);
  // Unknown items behave the same: no activity is not an error.
  assert_eq!(s.stock_amount("ghost".into()).await.unwrap(), Decimal::ZERO);
}

#[tokio::test]
async fn two_purchases_weighted_average() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 401, InvoiceType::PurchaseCash, EAN, "10", "50.00").await;
  book(&s, 402, InvoiceType::PurchaseCash, EAN, "20", "60.00").await;

  assert_eq!(s.stock_amount(EAN.into()).await.unwrap(), dec("30"));
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), dec("56.67"));
  assert_eq!(s.last_buy_price(EAN.into()).await.unwrap(), dec("60.00"));
}

#[tokio::test]
async fn both_purchase_types_count_towards_average() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "10", "40.00").await;
  book(&s, 2, InvoiceType::PurchaseInvoice, EAN, "10", "60.00").await;

  let avg = s.average_buy_price(EAN.into()).await.unwrap();
  assert_eq!(avg, dec("50.00"));
  assert_eq!(avg.to_string(), "50.00");
}

#[tokio::test]
async fn sales_and_corrections_affect_stock_not_cost() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseInvoice, EAN, "10", "40.00").await;
  book(&s, 2, InvoiceType::SaleInvoice, EAN, "3", "70.00").await;
  book(&s, 3, InvoiceType::StockCorrection, EAN, "-2", "0").await;

  let figures = s.stock_figures(EAN.into()).await.unwrap();
  assert_eq!(figures.stock_amount, dec("5"));
  assert_eq!(figures.avg_purchase_price, dec("40.00"));
  assert_eq!(figures.last_purchase_price, dec("40.00"));
  assert_eq!(figures.stock_value, dec("200.00"));
}

#[tokio::test]
async fn last_buy_price_follows_issue_date() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  // Booked later but dated earlier.
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 20)).await.unwrap();
  s.create_invoice(invoice(2, InvoiceType::PurchaseCash, 10)).await.unwrap();
  s.create_movement(movement(1, EAN, "1", "30.00")).await.unwrap();
  s.create_movement(movement(2, EAN, "1", "25.00")).await.unwrap();

  assert_eq!(s.last_buy_price(EAN.into()).await.unwrap(), dec("30.00"));
}

#[tokio::test]
async fn same_day_purchases_keep_booking_order() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  s.create_invoice(invoice(1, InvoiceType::PurchaseCash, 5)).await.unwrap();
  s.create_invoice(invoice(2, InvoiceType::PurchaseCash, 5)).await.unwrap();
  s.create_movement(movement(1, EAN, "1", "30.00")).await.unwrap();
  s.create_movement(movement(2, EAN, "1", "25.00")).await.unwrap();
  s.conn
    .call(|conn| {
      Ok(conn.execute_batch("UPDATE stock_movements SET rowid = 1000 - rowid;")?)
    })
    .await
    .unwrap();

  assert_eq!(s.last_buy_price(EAN.into()).await.unwrap(), dec("25.00"));
  let numbers: Vec<_> = s
    .movements_by_item(EAN.into())
    .await
    .unwrap()
    .into_iter()
    .map(|m| m.invoice_number)
    .collect();
  assert_eq!(numbers, [1, 2]);
}

#[tokio::test]
async fn figures_follow_ledger_updates() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "10", "10.00").await;
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), dec("10.00"));

  s.update_movement(key(1, EAN), patch(json!({ "price_per_unit": "12.00" })))
    .await
    .unwrap();
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), dec("12.00"));

  // Retyping the invoice to a sale flips the sign and drops it from the cost basis.
  s.update_invoice(InvoiceKey::new("INV-", 1), patch(json!({ "type": 3 })))
    .await
    .unwrap();
  assert_eq!(s.stock_amount(EAN.into()).await.unwrap(), dec("-10"));
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), Decimal::ZERO);
}

// ─── Reset points ────────────────────────────────────────────────────────────

#[tokio::test]
async fn sale_that_depletes_stock_is_a_reset_point() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "5", "10.00").await;

  assert!(!s.is_reset_point(EAN.into(), dec("-4")).await.unwrap());
  assert!(s.is_reset_point(EAN.into(), dec("-5")).await.unwrap());

  book(&s, 2, InvoiceType::SaleCash, EAN, "2", "20.00").await;
  book(&s, 3, InvoiceType::SaleCash, EAN, "4", "20.00").await;

  let partial = s.get_movement(key(2, EAN)).await.unwrap().unwrap();
  let oversell = s.get_movement(key(3, EAN)).await.unwrap().unwrap();
  assert!(!partial.reset_point);
  assert!(oversell.reset_point);

  // Already at or below zero: further sales are not boundaries.
  book(&s, 4, InvoiceType::SaleCash, EAN, "1", "20.00").await;
  assert!(!s.get_movement(key(4, EAN)).await.unwrap().unwrap().reset_point);
}

#[tokio::test]
async fn negative_correction_can_reset() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "3", "10.00").await;
  book(&s, 2, InvoiceType::StockCorrection, EAN, "-3", "0").await;

  assert!(s.get_movement(key(2, EAN)).await.unwrap().unwrap().reset_point);
}

#[tokio::test]
async fn reset_point_does_not_limit_averaging() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "10", "10.00").await;
  book(&s, 2, InvoiceType::SaleCash, EAN, "10", "15.00").await;
  book(&s, 3, InvoiceType::PurchaseCash, EAN, "10", "20.00").await;

  assert!(s.get_movement(key(2, EAN)).await.unwrap().unwrap().reset_point);
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), dec("15.00"));
}

// ─── Read models ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn item_history_has_running_stock() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "4", "10.00").await;
  book(&s, 2, InvoiceType::SaleInvoice, EAN, "4", "15.00").await;
  book(&s, 3, InvoiceType::PurchaseInvoice, EAN, "2", "11.00").await;

  let history = s.item_history(EAN.into()).await.unwrap();
  let summary: Vec<_> = history
    .iter()
    .map(|l| (l.kind, l.stock_after, l.reset_point))
    .collect();
  assert_eq!(summary, vec![
    (MovementKind::Purchase, dec("4"), false),
    (MovementKind::Sale, dec("0"), true),
    (MovementKind::Purchase, dec("2"), false),
  ]);
}

#[tokio::test]
async fn stock_overview_covers_every_item() {
  let s = store().await;
  s.create_item(item("A")).await.unwrap();
  s.create_item(item("B")).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, "A", "2", "3.50").await;

  let overview = s.stock_overview().await.unwrap();
  assert_eq!(overview.len(), 2);
  assert_eq!(overview[0].ean, "A");
  assert_eq!(overview[0].stock_value, dec("7.00"));
  assert_eq!(overview[1].ean, "B");
  assert_eq!(overview[1].stock_amount, Decimal::ZERO);
}

// ─── Decimal range ───────────────────────────────────────────────────────────

const DECIMAL_MAX: &str = "79228162514264337593543950335";

#[tokio::test]
async fn stock_past_decimal_range_is_rejected_and_store_keeps_working() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, DECIMAL_MAX, "1").await;
  s.create_invoice(invoice(2, InvoiceType::PurchaseCash, 9)).await.unwrap();

  let err = s
    .create_movement(movement(2, EAN, DECIMAL_MAX, "1"))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::Overflow(_)));
  assert!(s.get_movement(key(2, EAN)).await.unwrap().is_none());

  assert_eq!(s.stock_amount(EAN.into()).await.unwrap(), dec(DECIMAL_MAX));
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), dec("1.00"));
  assert_eq!(s.item_history(EAN.into()).await.unwrap().len(), 1);
  assert_eq!(s.list_items().await.unwrap().len(), 1);
}

#[tokio::test]
async fn purchase_cost_past_decimal_range_is_not_recorded() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  s.create_invoice(invoice(1, InvoiceType::PurchaseInvoice, 2)).await.unwrap();

  let huge = "100000000000000000000";
  let err = s
    .create_movement(movement(1, EAN, huge, huge))
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::Overflow(_)));
  assert!(s.movements_by_item(EAN.into()).await.unwrap().is_empty());
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), Decimal::ZERO);

  s.create_movement(movement(1, EAN, "2", "5.00")).await.unwrap();
  let figures = s.stock_figures(EAN.into()).await.unwrap();
  assert_eq!(figures.stock_value, dec("10.00"));
}

#[tokio::test]
async fn update_past_decimal_range_is_rolled_back() {
  let s = store().await;
  s.create_item(item(EAN)).await.unwrap();
  book(&s, 1, InvoiceType::PurchaseCash, EAN, "1000000000000000", "1").await;

  let err = s
    .update_movement(
      key(1, EAN),
      patch(json!({ "price_per_unit": "100000000000000000000" })),
    )
    .await
    .unwrap_err();
  assert!(matches!(core_err(err), CoreError::Overflow(_)));

  let stored = s.get_movement(key(1, EAN)).await.unwrap().unwrap();
  assert_eq!(stored.price_per_unit, "1");
  assert_eq!(s.average_buy_price(EAN.into()).await.unwrap(), dec("1.00"));
}
