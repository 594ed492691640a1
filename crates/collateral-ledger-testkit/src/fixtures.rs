//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use collateral_ledger::{CollateralLedger, LedgerConfig};
use collateral_ledger_core::{AccountId, Amount, CallContext, DepositId, DepositRequest, Timestamp};
use collateral_ledger_store::MemoryStore;
use collateral_ledger_token::MemoryToken;

/// Balance minted to, and approved by, every fixture party.
pub const INITIAL_BALANCE: Amount = 1_000_000;

/// Ledger type used by fixtures.
pub type FixtureLedger = CollateralLedger<MemoryStore, Arc<MemoryToken>>;

/// A ledger over in-memory storage and token, plus the parties using it.
pub struct TestFixture {
    pub ledger: FixtureLedger,
    /// Shared with the ledger so tests can inspect balances or pause it.
    pub token: Arc<MemoryToken>,
    pub custodian: AccountId,
    pub depositor: AccountId,
    pub arbiter: AccountId,
}

impl TestFixture {
    /// Create a fixture with random parties and the default config.
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    /// Create a fixture with random parties.
    pub fn with_config(config: LedgerConfig) -> Self {
        Self::build(
            AccountId::generate(),
            AccountId::generate(),
            AccountId::generate(),
            config,
        )
    }

    /// Create with deterministic parties derived from `seed`.
    pub fn with_seed(seed: u8, config: LedgerConfig) -> Self {
        let account = |role: u8| {
            let mut bytes = [seed; 32];
            bytes[0] = role;
            AccountId::from_bytes(bytes)
        };
        Self::build(account(0xC0), account(0xD0), account(0xAB), config)
    }

    fn build(
        custodian: AccountId,
        depositor: AccountId,
        arbiter: AccountId,
        config: LedgerConfig,
    ) -> Self {
        let token = Arc::new(MemoryToken::new(custodian));
        let ledger = CollateralLedger::new(MemoryStore::new(), Arc::clone(&token), config);
        let fixture = Self {
            ledger,
            token,
            custodian,
            depositor,
            arbiter,
        };
        fixture.endow(&depositor);
        fixture
    }

    /// Mint [`INITIAL_BALANCE`] to `account` and approve the custodian for all of it.
    pub fn endow(&self, account: &AccountId) {
        self.token
            .mint(account, INITIAL_BALANCE)
            .and_then(|_| self.token.approve(account, INITIAL_BALANCE))
            .unwrap_or_else(|e| panic!("failed to endow {}: {}", account, e));
    }

    pub fn depositor_at(&self, t: u64) -> CallContext {
        CallContext::new(self.depositor, Timestamp(t))
    }

    pub fn arbiter_at(&self, t: u64) -> CallContext {
        CallContext::new(self.arbiter, Timestamp(t))
    }

    /// Open an unlocked deposit at t=0.
    pub async fn open_deposit(&mut self, value: Amount, expiration: u64) -> DepositId {
        let request = DepositRequest::new(self.arbiter, value, Timestamp(expiration));
        let ctx = self.depositor_at(0);
        self.ledger
            .deposit(&ctx, &request)
            .await
            .unwrap_or_else(|e| panic!("deposit failed: {}", e))
    }

    /// Open a deposit at t=0 locked until its expiration.
    pub async fn open_locked(&mut self, value: Amount, expiration: u64) -> DepositId {
        let request = DepositRequest::new(self.arbiter, value, Timestamp(expiration))
            .locked_until(Timestamp(expiration));
        let ctx = self.depositor_at(0);
        self.ledger
            .deposit(&ctx, &request)
            .await
            .unwrap_or_else(|e| panic!("locked deposit failed: {}", e))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic, distinct accounts for multi-party tests.
pub fn multi_party_accounts(count: usize) -> Vec<AccountId> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = 0x10;
            seed[1..9].copy_from_slice(&(i as u64).to_be_bytes());
            AccountId::from_bytes(seed)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use collateral_ledger_core::DepositState;

    #[tokio::test]
    async fn test_fixture_locked_deposit() {
        let mut fixture = TestFixture::new();
        let id = fixture.open_locked(250, 10).await;

        let deposit = fixture.ledger.get_deposit(&id).await.unwrap();
        assert_eq!(deposit.state, DepositState::Locked);
        assert_eq!(deposit.depositor, Some(fixture.depositor));
        assert_eq!(
            fixture.token.balance_of(&fixture.depositor).unwrap(),
            INITIAL_BALANCE - 250
        );
    }

    #[test]
    fn test_seeded_fixture_is_deterministic() {
        let a = TestFixture::with_seed(7, LedgerConfig::default());
        let b = TestFixture::with_seed(7, LedgerConfig::default());
        assert_eq!(a.depositor, b.depositor);
        assert_ne!(a.depositor, a.arbiter);
        assert_ne!(a.custodian, a.arbiter);
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_accounts(3);

        assert_ne!(parties[0], parties[1]);
        assert_ne!(parties[1], parties[2]);
        assert_ne!(parties[0], parties[2]);
    }
}
