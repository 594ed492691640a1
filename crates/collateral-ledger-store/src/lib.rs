//! # Collateral Ledger Store
//!
//! Storage abstraction for the collateral ledger. Provides a trait-based
//! interface for deposit persistence with SQLite and in-memory
//! implementations.
//!
//! ## Overview
//!
//! The ledger owns three kinds of state, all behind the [`Store`] trait:
//!
//! - **Deposits** keyed by [`DepositId`](collateral_ledger_core::DepositId)
//! - **Allocator counters**: the sequential counter and per-creator nonces
//! - **Journal**: the append-only event log read by observers
//!
//! [`SqliteStore`] is the persistent backend; [`MemoryStore`] has the same
//! semantics for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use collateral_ledger_store::{SqliteStore, Store, StoreExt};
//!
//! async fn example() {
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let total = store.custodied_total().await.unwrap();
//!     let events = store.events_since(0).await.unwrap();
//!     println!("{} custodied, {} events", total, events.len());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No reclamation**: terminal deposits stay in the store.
//! - **Batches**: a ledger call writes its record, counter move and events
//!   through one [`WriteBatch`], which lands atomically and can be reverted
//!   if the token later refuses.
//! - **Journal positions** start at 1 and are contiguous.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{CounterUpdate, Store, StoreExt, WriteBatch};
