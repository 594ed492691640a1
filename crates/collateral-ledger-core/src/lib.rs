//! # Collateral Ledger Core
//!
//! Pure primitives for the collateral ledger: deposit records, the deposit
//! state machine, identifier derivation, and ledger events.
//!
//! This crate contains no I/O, no storage, no token accounting. Every
//! transition is a pure function from the current record and a
//! [`CallContext`] to a [`Transition`] describing the new record, the token
//! movement the custodian must perform, and the events to journal.
//!
//! ## Key Types
//!
//! - [`Deposit`] - One custody commitment
//! - [`DepositId`] - 128-bit deposit identifier
//! - [`DepositState`] - `Unlocked`, `Locked`, `Withdrawn`, `Slashed`
//! - [`LedgerPolicy`] - Slash, withdraw and re-lock policies
//! - [`IdPolicy`] - Sequential or derived identifier allocation
//!
//! ## State Machine
//!
//! ```text
//! Unlocked ──lock──▶ Locked ──slash (exhausted)──▶ Slashed
//!    │                 │  ╰─slash (partial)─╮
//!    │                 │◀───────────────────╯
//!    ╰──withdraw──▶ Withdrawn ◀──withdraw (expired)──╯
//! ```

pub mod deposit;
pub mod error;
pub mod event;
pub mod id;
pub mod policy;
pub mod state;
pub mod types;

pub use deposit::{Deposit, DepositRequest, DepositTerms, TokenEffect, Transition};
pub use error::{DepositError, Result};
pub use event::{JournalEntry, LedgerEvent};
pub use id::{derive_deposit_id, sequential_deposit_id, Allocation, CounterKey, ID_DOMAIN};
pub use policy::{IdPolicy, LedgerPolicy, RelockPolicy, SlashPolicy, WithdrawAuthority};
pub use state::DepositState;
pub use types::{AccountId, Amount, CallContext, DepositId, Timestamp};
