// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::api::RatesApi;
use crate::config::Config;
use crate::error::ConverterError;
use crate::exchange_rates::RateCache;
use crate::models::{Conversion, CurrencyDirectory, DirectoryEntry};

/// Conversion and currency lookups on top of the rates service.
pub struct Converter {
    api: Arc<dyn RatesApi>,
    cache: RateCache,
    localized_names: HashMap<String, String>,
}

impl Converter {
    pub fn new(api: Arc<dyn RatesApi>, config: &Config) -> Self {
        let cache = RateCache::new(Arc::clone(&api), config.cache_ttl(), config.cache_capacity());
        Self {
            api,
            cache,
            localized_names: config.localized_names.clone(),
        }
    }

    pub fn localized_names(&self) -> &HashMap<String, String> {
        &self.localized_names
    }

    /// Convert `amount` of `from` into `to` using the (cached) rates for `from`.
    ///
    /// The destination code is checked before the source code; no rounding is applied.
    pub async fn convert_currency(
        &self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<Conversion, ConverterError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(ConverterError::validation(format!(
                "amount must be a positive number, got {}",
                amount
            )));
        }

        let snapshot = self.cache.get_or_fetch(from).await?;

        let rate = snapshot.rate(to).ok_or_else(|| {
            ConverterError::validation(format!("no exchange rate for currency {}", to))
        })?;
        if snapshot.rate(from).is_none() {
            return Err(ConverterError::validation(format!(
                "no exchange rate for currency {}",
                from
            )));
        }
        debug!(base = %snapshot.base, to, rate, "Both currencies present in rates");

        Ok(Conversion {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            rate,
            converted: amount * rate,
            last_updated: snapshot.last_updated,
        })
    }

    /// Fetch the full directory. Never cached.
    pub async fn currency_directory(&self) -> Result<CurrencyDirectory, ConverterError> {
        let codes = self.api.supported_codes().await?;
        info!(count = codes.len(), "Fetched currency list");
        Ok(CurrencyDirectory::from_supported_codes(&codes, &self.localized_names))
    }

    /// Fetch the directory and keep the entries whose label contains `query`.
    pub async fn search_currencies(&self, query: &str) -> Result<Vec<DirectoryEntry>, ConverterError> {
        let directory = self.currency_directory().await?;
        Ok(directory.search(query).into_iter().cloned().collect())
    }
}
