//! Strong type definitions for the collateral ledger.
//!
//! Identifiers are newtypes so an arbiter can never be passed where a
//! deposit id is expected.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token amount in the custodial asset's smallest unit.
pub type Amount = u128;

/// A 16-byte deposit identifier.
///
/// Either a big-endian sequence number or the truncated Blake3 derivation
/// described in [`crate::id`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DepositId(pub [u8; 16]);

impl DepositId {
    /// Create a new DepositId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Create from a 128-bit integer (big-endian).
    pub const fn from_u128(value: u128) -> Self {
        Self(value.to_be_bytes())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Interpret the id as a big-endian 128-bit integer.
    pub const fn as_u128(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self(arr))
    }

    /// The zero id. Never issued by either allocation policy.
    pub const ZERO: Self = Self([0u8; 16]);
}

impl fmt::Debug for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DepositId({})", self.to_hex())
    }
}

impl fmt::Display for DepositId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 16]> for DepositId {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for DepositId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> std::result::Result<Self, Self::Error> {
        let arr: [u8; 16] = slice.try_into()?;
        Ok(Self(arr))
    }
}

/// A 32-byte account identity (depositor, arbiter, custodian).
///
/// The ledger treats identities as opaque; authentication happens in the
/// host that builds the [`CallContext`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Generate a random identity.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// Absolute time in seconds, as observed by the host.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp(pub u64);

impl Timestamp {
    /// Seconds since the host's epoch.
    pub const fn as_secs(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t={}", self.0)
    }
}

/// Who is calling and when.
///
/// Plays the role of the host's message sender and block timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub caller: AccountId,
    pub now: Timestamp,
}

impl CallContext {
    pub const fn new(caller: AccountId, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_id_hex_roundtrip() {
        let id = DepositId::from_bytes([0x42; 16]);
        let recovered = DepositId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_deposit_id_from_u128_is_big_endian() {
        let id = DepositId::from_u128(1);
        assert_eq!(id.as_bytes()[15], 1);
        assert_eq!(id.as_u128(), 1);
        assert!(DepositId::from_u128(2) > id);
    }

    #[test]
    fn test_deposit_id_rejects_wrong_length() {
        assert!(DepositId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_account_display_is_full_hex() {
        let account = AccountId::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", account), "ab".repeat(32));
        assert_eq!(format!("{:?}", account), "AccountId(abababababababab)");

        let mut bytes = [0xab; 32];
        bytes[31] = 0xcd;
        let sibling = AccountId::from_bytes(bytes);
        assert_eq!(format!("{:?}", sibling), format!("{:?}", account));
        assert_ne!(sibling.to_string(), account.to_string());
    }

    #[test]
    fn test_generated_accounts_differ() {
        assert_ne!(AccountId::generate(), AccountId::generate());
    }
}
