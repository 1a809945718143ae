//! Paystack API client.
//!
//! The secret key is only ever sent to Paystack as a bearer token; it never
//! reaches browser code or logs.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;
use crate::error::AppError;

/// The part of the payment gateway the reconciliation flow talks to.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Raw JSON body of the gateway's verify-by-reference endpoint.
    ///
    /// # Errors
    ///
    /// - `GatewayUnavailable`: network failure, timeout or non-2xx status
    /// - `GatewayProtocol`: the 2xx body was not JSON
    async fn verify_transaction(&self, reference: &str) -> Result<Value, AppError>;
}

#[derive(Debug, Clone)]
pub struct PaystackClient {
    client: reqwest::Client,
    base_url: url::Url,
    secret_key: String,
}

impl PaystackClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.gateway_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: url::Url::parse(&config.paystack_base_url)?,
            secret_key: config.paystack_secret_key.clone(),
        })
    }

    /// `{base}/transaction/verify/{reference}` with the reference as one escaped segment.
    fn verify_url(&self, reference: &str) -> Result<url::Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::GatewayProtocol("gateway base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["transaction", "verify", reference]);
        Ok(url)
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    #[tracing::instrument(skip(self))]
    async fn verify_transaction(&self, reference: &str) -> Result<Value, AppError> {
        let response = self
            .client
            .get(self.verify_url(reference)?)
            .bearer_auth(&self.secret_key)
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(|e| AppError::GatewayUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            // Paystack puts a human-readable reason in `message`
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Failed to verify payment");
            tracing::warn!(%status, message, "gateway rejected verification");
            return Err(AppError::GatewayUnavailable(format!("{status}: {message}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::GatewayProtocol(format!("body is not JSON: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn verify_url_escapes_reference() {
        let mut config = test_config();
        config.paystack_base_url = "https://api.paystack.co/".into();
        let client = PaystackClient::new(&config).unwrap();

        assert_eq!(
            client.verify_url("EFFIDELI_1_1000").unwrap().as_str(),
            "https://api.paystack.co/transaction/verify/EFFIDELI_1_1000"
        );
        assert_eq!(
            client.verify_url("a/b").unwrap().as_str(),
            "https://api.paystack.co/transaction/verify/a%2Fb"
        );
    }

    #[tokio::test]
    async fn unreachable_gateway_is_unavailable() {
        let mut config = test_config();
        config.paystack_base_url = "http://127.0.0.1:9".into();
        let client = PaystackClient::new(&config).unwrap();

        let err = client.verify_transaction("EFFIDELI_1_1000").await.unwrap_err();
        assert!(matches!(err, AppError::GatewayUnavailable(_)));
    }
}
