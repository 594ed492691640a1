//! Ledger events.
//!
//! Every committed transition appends events to an append-only journal.
//! Observers (indexers, consumer services) read the journal; the ledger
//! never reads it back.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Amount, DepositId, Timestamp};

/// A structured record of one state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEvent {
    Created {
        id: DepositId,
        arbiter: AccountId,
        value: Amount,
        expiration: Timestamp,
    },
    Funded {
        id: DepositId,
        depositor: AccountId,
    },
    Locked {
        id: DepositId,
    },
    Slashed {
        id: DepositId,
        amount: Amount,
    },
    Withdrawn {
        id: DepositId,
    },
}

impl LedgerEvent {
    /// The deposit this event concerns.
    pub fn deposit_id(&self) -> DepositId {
        match self {
            LedgerEvent::Created { id, .. }
            | LedgerEvent::Funded { id, .. }
            | LedgerEvent::Locked { id }
            | LedgerEvent::Slashed { id, .. }
            | LedgerEvent::Withdrawn { id } => *id,
        }
    }

    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Created { .. } => "created",
            LedgerEvent::Funded { .. } => "funded",
            LedgerEvent::Locked { .. } => "locked",
            LedgerEvent::Slashed { .. } => "slashed",
            LedgerEvent::Withdrawn { .. } => "withdrawn",
        }
    }
}

/// A journaled event with its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal, starting at 1.
    pub seq: u64,
    pub event: LedgerEvent,
}
