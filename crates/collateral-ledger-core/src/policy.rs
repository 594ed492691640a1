//! Deployment policies.
//!
//! The deposit state machine has a few points where equally valid behaviors
//! exist. Each is a per-ledger choice fixed at construction.

use serde::{Deserialize, Serialize};

/// How slashing reduces a deposit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlashPolicy {
    /// The arbiter burns any amount up to the remaining value. The deposit
    /// stays locked until its value is exhausted.
    #[default]
    Partial,
    /// Every slash burns the entire remaining value.
    Full,
}

/// Who may trigger a withdrawal. The payout always goes to the depositor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WithdrawAuthority {
    #[default]
    Depositor,
    Anyone,
}

/// Behavior of `lock` on an already locked deposit with the same unlock time.
///
/// A re-lock with a different unlock time is always rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelockPolicy {
    /// Matching re-lock succeeds without effect.
    #[default]
    Idempotent,
    /// Any re-lock fails with `UnexpectedState`.
    Strict,
}

/// Identifier allocation strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IdPolicy {
    /// One ledger-wide counter starting at 1.
    #[default]
    Sequential,
    /// Blake3 over (domain, creator, per-creator nonce).
    Derived { domain: String },
}

/// The transition policies consulted by [`crate::Deposit`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerPolicy {
    #[serde(default)]
    pub slash: SlashPolicy,
    #[serde(default)]
    pub withdraw: WithdrawAuthority,
    #[serde(default)]
    pub relock: RelockPolicy,
}
