pub mod exchangerate_client;

pub use exchangerate_client::ExchangeRateClient;

use async_trait::async_trait;

use crate::error::ConverterError;
use crate::models::RateSnapshot;

/// Upstream rates service. Every call may fail; nothing is retried.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RatesApi: Send + Sync {
    /// Latest rates for `base`, one network request per call.
    async fn latest_rates(&self, base: &str) -> Result<RateSnapshot, ConverterError>;

    /// `(code, English name)` pairs for every supported currency.
    async fn supported_codes(&self) -> Result<Vec<(String, String)>, ConverterError>;
}
