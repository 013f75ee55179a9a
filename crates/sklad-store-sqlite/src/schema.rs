//! SQL schema for the Sklad SQLite store.
//!
//! Executed once at connection startup. `PRAGMA user_version` records the
//! schema revision; future migrations will be gated on it.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Decimal quantities and prices are TEXT so they round-trip exactly as
/// submitted. Dates are ISO 8601 (`YYYY-MM-DD`), which also makes them sort
/// correctly as text. Every table carries an explicit `seq` that records
/// insertion order; implicit rowids are not stable across `VACUUM`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS contacts (
    seq           INTEGER NOT NULL UNIQUE,
    ico           TEXT    NOT NULL,
    modifier      INTEGER NOT NULL,
    dic           TEXT,
    company_name  TEXT    NOT NULL,
    is_supplier   INTEGER NOT NULL,
    is_customer   INTEGER NOT NULL,
    price_group   INTEGER NOT NULL DEFAULT 1,
    street        TEXT,
    city          TEXT,
    postal_code   TEXT,
    phone         TEXT,
    email         TEXT,
    web           TEXT,
    bank_account  TEXT,
    bank_code     TEXT,
    note          TEXT,
    created_at    TEXT    NOT NULL,
    updated_at    TEXT    NOT NULL,
    PRIMARY KEY (ico, modifier),
    CONSTRAINT contact_role CHECK (is_supplier OR is_customer)
);

CREATE TABLE IF NOT EXISTS items (
    seq               INTEGER NOT NULL UNIQUE,
    ean               TEXT    PRIMARY KEY,
    name              TEXT    NOT NULL,
    category          TEXT,
    note              TEXT,
    vat_rate          INTEGER NOT NULL,    -- 0 | 1 | 2
    unit_of_measure   TEXT    NOT NULL,
    sale_price_group1 TEXT    NOT NULL DEFAULT '0',
    sale_price_group2 TEXT    NOT NULL DEFAULT '0',
    sale_price_group3 TEXT    NOT NULL DEFAULT '0',
    sale_price_group4 TEXT    NOT NULL DEFAULT '0',
    created_at        TEXT    NOT NULL,
    updated_at        TEXT    NOT NULL
);

-- Counterparty columns are a snapshot taken at issue time, not a reference
-- into contacts.
CREATE TABLE IF NOT EXISTS invoices (
    seq             INTEGER NOT NULL UNIQUE,
    prefix          TEXT    NOT NULL,
    number          INTEGER NOT NULL,
    type            INTEGER NOT NULL,      -- 1..5, see InvoiceType
    date_issue      TEXT    NOT NULL,
    date_tax        TEXT,
    date_due        TEXT,
    payment_method  TEXT,
    variable_symbol TEXT,
    note            TEXT,
    ico             TEXT,
    modifier        INTEGER,
    dic             TEXT,
    company_name    TEXT,
    street          TEXT,
    city            TEXT,
    postal_code     TEXT,
    bank_account    TEXT,
    bank_code       TEXT,
    created_at      TEXT    NOT NULL,
    updated_at      TEXT    NOT NULL,
    PRIMARY KEY (prefix, number)
);

-- One row per (invoice, item). Owned by the invoice; only references the item.
CREATE TABLE IF NOT EXISTS stock_movements (
    seq             INTEGER NOT NULL UNIQUE,
    invoice_prefix  TEXT    NOT NULL,
    invoice_number  INTEGER NOT NULL,
    item_ean        TEXT    NOT NULL REFERENCES items(ean),
    amount          TEXT    NOT NULL,
    price_per_unit  TEXT    NOT NULL,
    vat_rate        INTEGER NOT NULL,
    reset_point     INTEGER NOT NULL DEFAULT 0,
    created_at      TEXT    NOT NULL,
    updated_at      TEXT    NOT NULL,
    PRIMARY KEY (invoice_prefix, invoice_number, item_ean),
    FOREIGN KEY (invoice_prefix, invoice_number)
        REFERENCES invoices(prefix, number) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS stock_movements_item_idx ON stock_movements(item_ean);
CREATE INDEX IF NOT EXISTS invoices_issue_idx       ON invoices(date_issue);

PRAGMA user_version = 1;
";

/// Named `CHECK` constraints of [`SCHEMA`]: constraint, field it is reported
/// against, and the reason given to callers.
pub const CHECK_RULES: &[(&str, &str, &str)] = &[(
  "contact_role",
  "is_supplier",
  "a contact must be a supplier or a customer",
)];

/// The `seq` value for the next row of `table`.
pub fn next_seq(table: &str) -> String {
  format!("(SELECT COALESCE(MAX(seq), 0) + 1 FROM {table})")
}
