//! # Collateral Ledger Token
//!
//! The fungible token the ledger custodies value in, seen from the
//! custodian's side.
//!
//! The ledger never owns balances itself. It asks a [`CustodyToken`] to pull
//! funds into custody, push them out to a depositor, or burn them on a slash.
//! Any refusal aborts the ledger operation that asked for it.
//!
//! [`MemoryToken`] is a complete in-memory token with balances, allowances to
//! the custodian, supply and burn accounting, plus a pause switch that makes
//! every movement fail. It backs the tests and local tooling.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Result, TokenError};
pub use memory::MemoryToken;
pub use traits::CustodyToken;
