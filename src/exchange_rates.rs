// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::api::RatesApi;
use crate::error::ConverterError;
use crate::models::RateSnapshot;

struct CacheEntry {
    snapshot: Arc<RateSnapshot>,
    fetched_at: Instant,
}

/// Snapshots per base currency, each valid for `ttl` after it was fetched.
///
/// The lock is held across the upstream call, so concurrent lookups for the
/// same base wait for one fetch instead of issuing their own.
pub struct RateCache {
    api: Arc<dyn RatesApi>,
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl RateCache {
    pub fn new(api: Arc<dyn RatesApi>, ttl: Duration, capacity: usize) -> Self {
        Self {
            api,
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached snapshot for `base`, fetching a fresh one on a miss or after expiry.
    /// Failed fetches are not cached.
    pub async fn get_or_fetch(&self, base: &str) -> Result<Arc<RateSnapshot>, ConverterError> {
        let mut entries = self.entries.lock().await;

        if let Some(entry) = entries.get(base) {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!(base, "Rate cache hit");
                return Ok(Arc::clone(&entry.snapshot));
            }
            info!(base, "Cached rates expired");
            entries.remove(base);
        }

        info!(base, "Fetching exchange rates");
        let snapshot = Arc::new(self.api.latest_rates(base).await?);

        if entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(code, _)| code.clone());
            if let Some(oldest) = oldest {
                debug!(evicted = %oldest, "Rate cache full");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            base.to_string(),
            CacheEntry {
                snapshot: Arc::clone(&snapshot),
                fetched_at: Instant::now(),
            },
        );
        Ok(snapshot)
    }
}
