//! # Collateral Ledger
//!
//! A custody ledger for token-denominated deposits that can be time-locked,
//! slashed by a designated arbiter, and withdrawn by their depositor once
//! unlocked.
//!
//! ## Overview
//!
//! - **Deposits**: one record per custody commitment, keyed by a 128-bit id
//! - **Lock**: the arbiter arms a deposit for slashing until its unlock time
//! - **Slash**: the arbiter burns some or all of a locked deposit's value
//! - **Withdraw**: the depositor takes the remainder once unlocked
//!
//! The ledger keeps three invariants: the custodian's token balance equals
//! the value of funded, live deposits; value never increases; and no deposit
//! leaves a terminal state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use collateral_ledger::{CollateralLedger, LedgerConfig};
//! use collateral_ledger::core::{AccountId, CallContext, DepositRequest, Timestamp};
//! use collateral_ledger::store::SqliteStore;
//! use collateral_ledger::token::MemoryToken;
//!
//! async fn example() {
//!     let depositor = AccountId::generate();
//!     let arbiter = AccountId::generate();
//!
//!     let token = MemoryToken::new(AccountId::generate());
//!     token.mint(&depositor, 100).unwrap();
//!     token.approve(&depositor, 100).unwrap();
//!
//!     let store = SqliteStore::open("ledger.db").unwrap();
//!     let mut ledger = CollateralLedger::new(store, token, LedgerConfig::default());
//!
//!     let ctx = CallContext::new(depositor, Timestamp(0));
//!     let id = ledger
//!         .deposit(&ctx, &DepositRequest::new(arbiter, 100, Timestamp(10)))
//!         .await
//!         .unwrap();
//!
//!     let arbiter_ctx = CallContext::new(arbiter, Timestamp(1));
//!     ledger.lock(&arbiter_ctx, &id, Timestamp(10)).await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `collateral_ledger::core` - Deposits, state machine, ids, events
//! - `collateral_ledger::store` - Storage abstraction and SQLite
//! - `collateral_ledger::token` - Custody token interface

pub mod error;
pub mod handle;
pub mod ledger;

// Re-export component crates
pub use collateral_ledger_core as core;
pub use collateral_ledger_store as store;
pub use collateral_ledger_token as token;

// Re-export main types for convenience
pub use error::{LedgerError, Result};
pub use handle::LedgerHandle;
pub use ledger::{CollateralLedger, LedgerConfig};

// Re-export commonly used core types
pub use collateral_ledger_core::{
    AccountId, Amount, CallContext, Deposit, DepositError, DepositId, DepositRequest,
    DepositState, DepositTerms, IdPolicy, LedgerEvent, LedgerPolicy, RelockPolicy, SlashPolicy,
    Timestamp, WithdrawAuthority,
};
