use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::RatesApi;
use crate::config::{Config, API_KEY_ENV};
use crate::error::ConverterError;
use crate::models::{LatestRatesResponse, RateSnapshot, SupportedCodesResponse};
use crate::utils::parse_last_updated;

/// Client for exchangerate-api.com (v6). The key is part of the URL path.
pub struct ExchangeRateClient {
    client: Client,
    api_url: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

impl ExchangeRateClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut builder =
            Client::builder().user_agent(concat!("currency-converter/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<String, ConverterError> {
        let key = self.api_key.as_deref().ok_or_else(|| {
            ConverterError::validation(format!("no API key configured, set {}", API_KEY_ENV))
        })?;
        Ok(format!("{}/{}/{}", self.api_url, key, path))
    }

    async fn get(&self, path: &str) -> Result<(StatusCode, String), ConverterError> {
        let url = self.endpoint(path)?;
        info!(path, "Calling rates service");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;
        Ok((status, text))
    }
}

#[async_trait]
impl RatesApi for ExchangeRateClient {
    async fn latest_rates(&self, base: &str) -> Result<RateSnapshot, ConverterError> {
        let (status, body) = self.get(&format!("latest/{}", base)).await?;
        parse_latest_rates(base, status, &body)
    }

    async fn supported_codes(&self) -> Result<Vec<(String, String)>, ConverterError> {
        let (status, body) = self.get("codes").await?;
        parse_supported_codes(status, &body)
    }
}

/// Validate a `latest/{base}` response and turn it into a snapshot.
pub fn parse_latest_rates(
    base: &str,
    status: StatusCode,
    body: &str,
) -> Result<RateSnapshot, ConverterError> {
    debug!(base, %status, body, "Rates service response");

    let response: LatestRatesResponse = decode(status, body, "exchange rates")?;
    ensure_success(
        response.result.as_deref(),
        response.error_type.as_deref(),
        "exchange rates",
    )?;

    let rates = response
        .conversion_rates
        .ok_or_else(|| missing_field("conversion_rates", body))?;
    let raw_time = response
        .time_last_update_utc
        .ok_or_else(|| missing_field("time_last_update_utc", body))?;
    let last_updated = parse_last_updated(&raw_time).ok_or_else(|| {
        ConverterError::validation(format!(
            "invalid response from rates service: unrecognised last update time {:?}",
            raw_time
        ))
    })?;

    Ok(RateSnapshot {
        base: base.to_string(),
        last_updated,
        rates,
    })
}

/// Validate a `codes` response.
pub fn parse_supported_codes(
    status: StatusCode,
    body: &str,
) -> Result<Vec<(String, String)>, ConverterError> {
    let response: SupportedCodesResponse = decode(status, body, "currency list")?;
    ensure_success(
        response.result.as_deref(),
        response.error_type.as_deref(),
        "currency list",
    )?;

    response
        .supported_codes
        .ok_or_else(|| missing_field("supported_codes", body))
}

fn decode<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    what: &str,
) -> Result<T, ConverterError> {
    if !status.is_success() {
        let error_type = serde_json::from_str::<ErrorEnvelope>(body)
            .ok()
            .and_then(|e| e.error_type);
        warn!(%status, ?error_type, "Rates service returned an error status");
        return Err(ConverterError::validation(match error_type {
            Some(error_type) => format!("failed to fetch {} (HTTP {}): {}", what, status, error_type),
            None => format!("failed to fetch {} (HTTP {})", what, status),
        }));
    }

    serde_json::from_str(body).map_err(|e| {
        ConverterError::validation(format!(
            "invalid response from rates service: {}. Full response: {}",
            e, body
        ))
    })
}

fn ensure_success(
    result: Option<&str>,
    error_type: Option<&str>,
    what: &str,
) -> Result<(), ConverterError> {
    if result == Some("success") {
        return Ok(());
    }
    let reason = error_type.unwrap_or("unknown error");
    warn!(reason, "Rates service reported a failure");
    Err(ConverterError::validation(format!(
        "failed to fetch {}: {}",
        what, reason
    )))
}

fn missing_field(field: &str, body: &str) -> ConverterError {
    ConverterError::validation(format!(
        "invalid response from rates service: missing key '{}'. Full response: {}",
        field, body
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    const LATEST_OK: &str = r#"{
        "result": "success",
        "time_last_update_unix": 1585267200,
        "time_last_update_utc": "Fri, 27 Mar 2020 00:00:01 +0000",
        "base_code": "USD",
        "conversion_rates": {"USD": 1, "EUR": 0.9, "RUB": 90.0}
    }"#;

    fn message(err: ConverterError) -> String {
        assert!(err.is_validation(), "expected a validation error, got {:?}", err);
        err.to_string()
    }

    #[test]
    fn test_parse_latest_rates() {
        let snapshot = parse_latest_rates("USD", StatusCode::OK, LATEST_OK).unwrap();
        assert_eq!(snapshot.base, "USD");
        assert_eq!(
            snapshot.last_updated,
            NaiveDate::from_ymd_opt(2020, 3, 27)
                .unwrap()
                .and_hms_opt(0, 0, 1)
                .unwrap()
        );
        assert_eq!(snapshot.rates.len(), 3);
        assert_relative_eq!(snapshot.rate("USD").unwrap(), 1.0);
        assert_relative_eq!(snapshot.rate("RUB").unwrap(), 90.0);
    }

    #[test]
    fn test_api_error_carries_error_type() {
        let body = r#"{"result":"error","error-type":"invalid-key"}"#;
        let err = parse_latest_rates("USD", StatusCode::OK, body).unwrap_err();
        assert!(message(err).contains("invalid-key"));

        let err = parse_latest_rates("XXX", StatusCode::NOT_FOUND, r#"{"result":"error","error-type":"unsupported-code"}"#)
            .unwrap_err();
        let msg = message(err);
        assert!(msg.contains("unsupported-code"));
        assert!(msg.contains("404"));
    }

    #[test]
    fn test_error_status_without_body() {
        let err = parse_latest_rates("USD", StatusCode::BAD_GATEWAY, "<html>oops</html>").unwrap_err();
        assert_eq!(message(err), "failed to fetch exchange rates (HTTP 502 Bad Gateway)");
    }

    #[test]
    fn test_missing_result_is_unknown_error() {
        let err = parse_latest_rates("USD", StatusCode::OK, "{}").unwrap_err();
        assert_eq!(message(err), "failed to fetch exchange rates: unknown error");
    }

    #[test]
    fn test_missing_rates_names_field_and_payload() {
        let body = r#"{"result":"success","time_last_update_utc":"Fri, 27 Mar 2020 00:00:01 +0000"}"#;
        let msg = message(parse_latest_rates("USD", StatusCode::OK, body).unwrap_err());
        assert!(msg.contains("conversion_rates"));
        assert!(msg.contains(body));
    }

    #[test]
    fn test_bad_timestamp_and_bad_json() {
        let body = r#"{"result":"success","time_last_update_utc":"soon","conversion_rates":{"USD":1}}"#;
        let msg = message(parse_latest_rates("USD", StatusCode::OK, body).unwrap_err());
        assert!(msg.contains("soon"));

        let msg = message(parse_latest_rates("USD", StatusCode::OK, "not json").unwrap_err());
        assert!(msg.contains("not json"));
    }

    #[test]
    fn test_parse_supported_codes() {
        let body = r#"{"result":"success","supported_codes":[["AED","UAE Dirham"],["EUR","Euro"]]}"#;
        let codes = parse_supported_codes(StatusCode::OK, body).unwrap();
        assert_eq!(
            codes,
            vec![
                ("AED".to_string(), "UAE Dirham".to_string()),
                ("EUR".to_string(), "Euro".to_string()),
            ]
        );

        let err = parse_supported_codes(StatusCode::OK, r#"{"result":"error","error-type":"quota-reached"}"#)
            .unwrap_err();
        assert_eq!(message(err), "failed to fetch currency list: quota-reached");

        let err = parse_supported_codes(StatusCode::OK, r#"{"result":"success"}"#).unwrap_err();
        assert!(message(err).contains("supported_codes"));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let config = Config {
            api_url: "http://127.0.0.1:9".to_string(),
            api_key: None,
            ..Config::default()
        };
        let client = ExchangeRateClient::new(&config).unwrap();
        let err = client.latest_rates("USD").await.unwrap_err();
        assert!(message(err).contains(API_KEY_ENV));
    }

    fn client_for(api_url: String) -> ExchangeRateClient {
        let config = Config {
            api_url,
            api_key: Some("test-key".to_string()),
            request_timeout_secs: 5,
            ..Config::default()
        };
        ExchangeRateClient::new(&config).unwrap()
    }

    /// Serves one HTTP response to the first connection and returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = vec![0u8; 4096];
            let _ = stream.read(&mut request).await;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_error_status_over_http_is_a_validation_error() {
        let url = serve_once("403 Forbidden", r#"{"result":"error","error-type":"invalid-key"}"#).await;
        let client = client_for(url);

        let err = client.latest_rates("USD").await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "Error: failed to fetch exchange rates (HTTP 403 Forbidden): invalid-key"
        );
    }

    #[tokio::test]
    async fn test_success_over_http() {
        let url = serve_once(
            "200 OK",
            r#"{"result":"success","supported_codes":[["EUR","Euro"],["USD","United States Dollar"]]}"#,
        )
        .await;
        let client = client_for(url);

        let codes = client.supported_codes().await.unwrap();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes[0].0, "EUR");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unexpected() {
        // Bind and release a port so nothing is listening on it.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let client = client_for(format!("http://127.0.0.1:{}", port));

        let err = client.latest_rates("USD").await.unwrap_err();
        assert!(!err.is_validation());

        let msg = err.user_message();
        assert!(msg.starts_with("Unexpected error: Failed to reach the rates service: "), "{msg}");
        let ConverterError::Unexpected(inner) = &err else {
            unreachable!()
        };
        let root = inner.root_cause().to_string();
        assert_eq!(msg.matches(root.as_str()).count(), 1, "{msg}");
    }

    #[test]
    fn test_endpoint_embeds_key() {
        let config = Config {
            api_url: "https://v6.exchangerate-api.com/v6/".to_string(),
            api_key: Some("abc123".to_string()),
            ..Config::default()
        };
        let client = ExchangeRateClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint("latest/EUR").unwrap(),
            "https://v6.exchangerate-api.com/v6/abc123/latest/EUR"
        );
    }
}
