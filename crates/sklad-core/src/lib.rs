//! Core types and trait definitions for the Sklad inventory ledger.
//!
//! No HTTP or database dependencies. The costing rules and the
//! partial-update validator live here as pure functions; storage backends
//! (e.g. `sklad-store-sqlite`) feed them.

#![allow(async_fn_in_trait)]

pub mod contact;
pub mod costing;
pub mod error;
pub mod invoice;
pub mod item;
pub mod movement;
pub mod patch;
pub mod store;

pub use error::{Entity, Error, Result};
