//! The custody token interface.

use std::sync::Arc;

use async_trait::async_trait;
use collateral_ledger_core::{AccountId, Amount};

use crate::error::Result;

/// A fungible token as seen by the custodian.
///
/// Implementations must be thread-safe (Send + Sync). Every method either
/// applies the full movement or fails without effect.
#[async_trait]
pub trait CustodyToken: Send + Sync {
    /// Pull `amount` from `from` into custody.
    ///
    /// Fails if `from` lacks the balance or has not approved the custodian.
    async fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()>;

    /// Push `amount` out of custody to `to`.
    async fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()>;

    /// Destroy `amount` of custodied funds, reducing total supply.
    async fn burn(&self, amount: Amount) -> Result<()>;

    /// Current balance of the custodian account.
    async fn custody_balance(&self) -> Result<Amount>;
}

#[async_trait]
impl<T: CustodyToken + ?Sized> CustodyToken for Arc<T> {
    async fn transfer_in(&self, from: &AccountId, amount: Amount) -> Result<()> {
        (**self).transfer_in(from, amount).await
    }

    async fn transfer_out(&self, to: &AccountId, amount: Amount) -> Result<()> {
        (**self).transfer_out(to, amount).await
    }

    async fn burn(&self, amount: Amount) -> Result<()> {
        (**self).burn(amount).await
    }

    async fn custody_balance(&self) -> Result<Amount> {
        (**self).custody_balance().await
    }
}
