use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

use crate::utils::format_timestamp;

/// Body of `GET {api}/{key}/latest/{base}`.
///
/// All fields are optional so that a partial payload still deserializes and
/// the missing field can be reported by name.
#[derive(Debug, Deserialize)]
pub struct LatestRatesResponse {
    pub result: Option<String>,
    #[serde(rename = "error-type")]
    pub error_type: Option<String>,
    pub time_last_update_utc: Option<String>,
    pub conversion_rates: Option<HashMap<String, f64>>,
}

/// Body of `GET {api}/{key}/codes`; `supported_codes` is a list of `[code, name]` pairs.
#[derive(Debug, Deserialize)]
pub struct SupportedCodesResponse {
    pub result: Option<String>,
    #[serde(rename = "error-type")]
    pub error_type: Option<String>,
    pub supported_codes: Option<Vec<(String, String)>>,
}

/// One fetched set of rates for a base currency. Never mutated, only replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub base: String,
    pub last_updated: NaiveDateTime,
    pub rates: HashMap<String, f64>,
}

impl RateSnapshot {
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }
}

/// Result of a single conversion. `converted` is unrounded.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub rate: f64,
    pub converted: f64,
    pub last_updated: NaiveDateTime,
}

impl Conversion {
    pub fn last_updated_display(&self) -> String {
        format_timestamp(&self.last_updated)
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} = {:.2} {}",
            self.amount, self.from, self.converted, self.to
        )
    }
}
