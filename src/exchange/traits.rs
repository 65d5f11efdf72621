//! Venue-agnostic interface for partner API clients.
//!
//! Lets callers (the CLI, tests) work against any account-data provider
//! without depending on the concrete HTTP client.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::BitbuyError;
use super::types::Wallet;

/// Account data available through an authenticated partner API.
#[async_trait]
pub trait PartnerApi: Send + Sync {
    /// Human-readable venue name.
    fn venue_name(&self) -> &'static str;

    /// Fetch all wallet balances for the authenticated account.
    ///
    /// Cancelling `cancel` aborts the in-flight request with
    /// [`BitbuyError::Cancelled`].
    async fn get_wallets(&self, cancel: &CancellationToken) -> Result<Vec<Wallet>, BitbuyError>;
}
