use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

use crate::core::config::ApiConfig;
use crate::core::{CurrencyCode, CurrencyRateProvider, Interrupted, ProviderError, RequestContext};

/// Longest response body kept in an HTTP error.
const BODY_SNIPPET_LEN: usize = 256;

/// Client for the ExchangeRate-API `latest` endpoint.
pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("xconv/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(&config.base_url, &config.api_key, config.timeout())
    }

    fn latest_url(&self, base: &CurrencyCode) -> String {
        format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, base)
    }

    /// The request URL with the API key replaced, safe for logs.
    fn masked(&self, url: &str) -> String {
        if self.api_key.is_empty() {
            url.to_string()
        } else {
            url.replacen(&self.api_key, "***", 1)
        }
    }

    fn transport_error(&self, err: reqwest::Error, started: Instant) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(started.elapsed())
        } else {
            // The URL carries the API key.
            ProviderError::Network(err.without_url())
        }
    }

    async fn get_body(
        &self,
        url: &str,
        started: Instant,
    ) -> Result<(StatusCode, String), ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(e, started))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, started))?;
        Ok((status, body))
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self, ctx), fields(from = %from, to = %to))]
    async fn fetch_rate(
        &self,
        ctx: &RequestContext,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Result<f64, ProviderError> {
        let url = self.latest_url(from);
        debug!(url = %self.masked(&url), "Fetching rate from ExchangeRate-API");

        let started = Instant::now();
        let (status, body) = match ctx.run(self.get_body(&url, started)).await {
            Ok(result) => result?,
            Err(Interrupted::DeadlineExceeded) => {
                return Err(ProviderError::Timeout(started.elapsed()));
            }
            Err(Interrupted::Canceled) => return Err(ProviderError::Canceled),
        };

        if !status.is_success() {
            return Err(ProviderError::Http {
                status: status.as_u16(),
                body: body.chars().take(BODY_SNIPPET_LEN).collect(),
            });
        }

        let data: LatestRatesResponse =
            serde_json::from_str(&body).map_err(ProviderError::Decode)?;

        if data.result != "success" {
            return Err(ProviderError::Api {
                reason: data.error_type.unwrap_or(data.result),
            });
        }

        match data.conversion_rates.get(to.as_str()) {
            Some(rate) => {
                debug!(rate, base = ?data.base_code, "Rate fetched from ExchangeRate-API");
                Ok(*rate)
            }
            None => {
                let mut available: Vec<String> = data.conversion_rates.into_keys().collect();
                available.sort();
                Err(ProviderError::CurrencyNotSupported {
                    currency: to.to_string(),
                    available,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-key-123";

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    async fn create_mock_server(base: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v6/{API_KEY}/latest/{base}")))
            .respond_with(template)
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider_for(server: &MockServer) -> ExchangeRateApiProvider {
        ExchangeRateApiProvider::new(&server.uri(), API_KEY, Duration::from_secs(5)).unwrap()
    }

    async fn fetch(
        provider: &ExchangeRateApiProvider,
        from: &str,
        to: &str,
    ) -> Result<f64, ProviderError> {
        provider
            .fetch_rate(&RequestContext::new(), &code(from), &code(to))
            .await
    }

    #[tokio::test]
    async fn test_successful_rate_fetch() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "USD",
            "conversion_rates": {"USD": 1, "EUR": 0.9, "GBP": 0.79}
        }"#;
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;

        let rate = fetch(&provider_for(&mock_server), "usd", "eur")
            .await
            .expect("Failed to get rate");
        assert_eq!(rate, 0.9);
    }

    #[tokio::test]
    async fn test_http_error_carries_status_and_body() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(500).set_body_string("x".repeat(1000)),
        )
        .await;

        match fetch(&provider_for(&mock_server), "USD", "EUR").await {
            Err(ProviderError::Http { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body.len(), BODY_SNIPPET_LEN);
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string("{not json"))
                .await;

        let result = fetch(&provider_for(&mock_server), "USD", "EUR").await;
        assert!(matches!(result, Err(ProviderError::Decode(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let mock_response = r#"{"result": "error", "error-type": "invalid-key"}"#;
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;

        match fetch(&provider_for(&mock_server), "USD", "EUR").await {
            Err(ProviderError::Api { reason }) => assert_eq!(reason, "invalid-key"),
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_error_without_reason_uses_result() {
        let mock_response = r#"{"result": "error"}"#;
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;

        let err = fetch(&provider_for(&mock_server), "USD", "EUR")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "exchange rate API error: error");
    }

    #[tokio::test]
    async fn test_currency_not_supported_lists_available() {
        let mock_response = r#"{
            "result": "success",
            "base_code": "USD",
            "conversion_rates": {"USD": 1, "GBP": 0.79, "EUR": 0.9}
        }"#;
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(mock_response))
                .await;

        match fetch(&provider_for(&mock_server), "USD", "XYZ").await {
            Err(ProviderError::CurrencyNotSupported {
                currency,
                available,
            }) => {
                assert_eq!(currency, "XYZ");
                assert_eq!(available, vec!["EUR", "GBP", "USD"]);
            }
            other => panic!("expected unsupported currency, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_timeout() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
        )
        .await;
        let provider =
            ExchangeRateApiProvider::new(&mock_server.uri(), API_KEY, Duration::from_millis(100))
                .unwrap();

        let result = fetch(&provider, "USD", "EUR").await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_context_deadline_is_timeout() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
        )
        .await;
        let ctx = RequestContext::with_timeout(Duration::from_millis(50));

        let result = provider_for(&mock_server)
            .fetch_rate(&ctx, &code("USD"), &code("EUR"))
            .await;
        assert!(matches!(result, Err(ProviderError::Timeout(_))), "{result:?}");
    }

    #[tokio::test]
    async fn test_context_cancel_is_distinct() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
        )
        .await;
        let provider = provider_for(&mock_server);
        let ctx = RequestContext::new();

        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let result = provider.fetch_rate(&ctx, &code("USD"), &code("EUR")).await;
        assert!(matches!(result, Err(ProviderError::Canceled)), "{result:?}");
    }

    #[tokio::test]
    async fn test_network_error_hides_api_key() {
        // Nothing listens on port 9 locally.
        let provider =
            ExchangeRateApiProvider::new("http://127.0.0.1:9", API_KEY, Duration::from_secs(2))
                .unwrap();

        let err = fetch(&provider, "USD", "EUR").await.unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)), "{err:?}");
        assert!(!format!("{err} {err:?}").contains(API_KEY));
    }

    #[test]
    fn test_masked_url() {
        let provider =
            ExchangeRateApiProvider::new("https://example.com/", API_KEY, Duration::from_secs(1))
                .unwrap();
        let url = provider.latest_url(&code("USD"));
        assert_eq!(url, format!("https://example.com/v6/{API_KEY}/latest/USD"));
        assert_eq!(provider.masked(&url), "https://example.com/v6/***/latest/USD");
    }
}
