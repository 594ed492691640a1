//! Deposit lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of a deposit.
///
/// `Withdrawn` and `Slashed` are terminal: no operation moves a deposit out
/// of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepositState {
    /// Created but not armed for slashing. Withdrawable at any time.
    Unlocked,
    /// Slashable by the arbiter until expiration, withdrawable after it.
    Locked,
    /// Remaining value paid out to the depositor.
    Withdrawn,
    /// Remaining value burned by the arbiter.
    Slashed,
}

impl DepositState {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DepositState::Withdrawn | DepositState::Slashed)
    }

    /// Whether the deposit still holds custodied value.
    pub fn is_live(&self) -> bool {
        !self.is_terminal()
    }

    /// Convert to the storage discriminant.
    pub fn to_u8(self) -> u8 {
        match self {
            DepositState::Unlocked => 0,
            DepositState::Locked => 1,
            DepositState::Withdrawn => 2,
            DepositState::Slashed => 3,
        }
    }

    /// Parse from the storage discriminant.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DepositState::Unlocked),
            1 => Some(DepositState::Locked),
            2 => Some(DepositState::Withdrawn),
            3 => Some(DepositState::Slashed),
            _ => None,
        }
    }
}

impl fmt::Display for DepositState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DepositState::Unlocked => "unlocked",
            DepositState::Locked => "locked",
            DepositState::Withdrawn => "withdrawn",
            DepositState::Slashed => "slashed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!DepositState::Unlocked.is_terminal());
        assert!(!DepositState::Locked.is_terminal());
        assert!(DepositState::Withdrawn.is_terminal());
        assert!(DepositState::Slashed.is_terminal());
    }

    #[test]
    fn test_discriminant_roundtrip() {
        for state in [
            DepositState::Unlocked,
            DepositState::Locked,
            DepositState::Withdrawn,
            DepositState::Slashed,
        ] {
            assert_eq!(DepositState::from_u8(state.to_u8()), Some(state));
        }
        assert_eq!(DepositState::from_u8(4), None);
    }
}
