use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::Sha256;
use std::time::Duration;
use thiserror::Error;

use crate::models::{BillingEvent, EventParseError};

type HmacSha256 = Hmac<Sha256>;

/// Errors that can occur when talking to the payment provider
#[derive(Debug, Error)]
pub enum StripeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Signature verification failed: {0}")]
    SignatureError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid event payload: {0}")]
    InvalidEvent(#[from] EventParseError),
}

/// Inputs for a subscription-mode checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
    pub company: Option<String>,
}

/// Payment provider API client
///
/// Handles checkout session creation and subscription cancellation. The API
/// speaks form-encoded requests with bearer auth; `api_base` is configurable
/// so tests can point it at a local mock server.
pub struct StripeClient {
    api_base: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
    client: Client,
}

impl StripeClient {
    pub fn new(
        api_base: String,
        secret_key: String,
        success_url: String,
        cancel_url: String,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_base,
            secret_key,
            success_url,
            cancel_url,
            client,
        }
    }

    /// Create a subscription-mode checkout session; returns its opaque id.
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<String, StripeError> {
        let url = format!(
            "{}/v1/checkout/sessions",
            self.api_base.trim_end_matches('/')
        );

        let form: Vec<(&str, String)> = vec![
            ("mode", "subscription".to_string()),
            ("line_items[0][price]", params.price_id.clone()),
            ("line_items[0][quantity]", "1".to_string()),
            ("customer_email", params.customer_email.clone()),
            ("success_url", self.success_url.clone()),
            ("cancel_url", self.cancel_url.clone()),
            ("allow_promotion_codes", "true".to_string()),
            (
                "metadata[customer_name]",
                params.customer_name.clone().unwrap_or_default(),
            ),
            (
                "metadata[plan_id]",
                params.plan_id.clone().unwrap_or_default(),
            ),
            (
                "metadata[plan_name]",
                params.plan_name.clone().unwrap_or_default(),
            ),
            (
                "metadata[company]",
                params.company.clone().unwrap_or_default(),
            ),
        ];

        tracing::debug!("Creating checkout session for {}", params.customer_email);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StripeError::ApiError(format!(
                "Failed to create checkout session: {} {}",
                status, body
            )));
        }

        let json: Value = response.json().await?;

        json.get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| StripeError::InvalidResponse("Missing session id".into()))
    }

    /// Cancel a subscription, prorating the final invoice.
    ///
    /// Returns the canceled subscription id. A provider 404 maps to
    /// `StripeError::NotFound` (already canceled or never existed).
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<String, StripeError> {
        let url = format!(
            "{}/v1/subscriptions/{}",
            self.api_base.trim_end_matches('/'),
            subscription_id
        );

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.secret_key)
            .form(&[("prorate", "true")])
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StripeError::NotFound(format!(
                "Subscription {} not found or already canceled",
                subscription_id
            )));
        }

        if !response.status().is_success() {
            return Err(StripeError::ApiError(format!(
                "Failed to cancel subscription: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;

        json.get("id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| StripeError::InvalidResponse("Missing subscription id".into()))
    }

    /// Decode a verified webhook body into a billing event.
    pub fn parse_event(payload: &[u8]) -> Result<BillingEvent, StripeError> {
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| StripeError::InvalidResponse(format!("Invalid event JSON: {}", e)))?;

        Ok(BillingEvent::from_value(&value)?)
    }
}

/// Verify a webhook payload against its signature header.
///
/// The header carries a unix timestamp and one or more `v1` digests:
/// `t=<secs>,v1=<hex>[,v1=<hex>...]`. The digest is HMAC-SHA256 of
/// `"{t}.{payload}"` under the shared endpoint secret. A payload older (or
/// newer) than `tolerance_secs` is rejected to bound replay.
pub fn verify_signature(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), StripeError> {
    verify_signature_at(
        payload,
        signature_header,
        secret,
        tolerance_secs,
        Utc::now().timestamp(),
    )
}

fn verify_signature_at(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_secs: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    for part in signature_header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = value.parse().ok();
            }
            Some(("v1", value)) => {
                if let Ok(digest) = hex::decode(value) {
                    candidates.push(digest);
                }
            }
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::SignatureError("missing timestamp".into()))?;

    if candidates.is_empty() {
        return Err(StripeError::SignatureError("missing v1 signature".into()));
    }

    if (now_secs - timestamp).abs() > tolerance_secs {
        return Err(StripeError::SignatureError(
            "timestamp outside tolerance".into(),
        ));
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| StripeError::SignatureError("invalid secret".into()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);

    // verify_slice is constant-time; accept any listed digest.
    for candidate in &candidates {
        if mac.clone().verify_slice(candidate).is_ok() {
            return Ok(());
        }
    }

    Err(StripeError::SignatureError("no matching signature".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"invoice.payment_succeeded"}"#;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let digest = hex::encode(mac.finalize().into_bytes());
        format!("t={},v1={}", timestamp, digest)
    }

    #[test]
    fn test_valid_signature_accepted() {
        let now = 1_700_000_000;
        let header = sign(PAYLOAD, SECRET, now);

        assert!(verify_signature_at(PAYLOAD, &header, SECRET, 300, now).is_ok());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let now = 1_700_000_000;
        let header = sign(PAYLOAD, "whsec_other", now);

        assert!(verify_signature_at(PAYLOAD, &header, SECRET, 300, now).is_err());
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let now = 1_700_000_000;
        let header = sign(PAYLOAD, SECRET, now);

        let tampered = br#"{"id":"evt_2","type":"invoice.payment_succeeded"}"#;
        assert!(verify_signature_at(tampered, &header, SECRET, 300, now).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let signed_at = 1_700_000_000;
        let header = sign(PAYLOAD, SECRET, signed_at);

        let result = verify_signature_at(PAYLOAD, &header, SECRET, 300, signed_at + 301);
        assert!(matches!(result, Err(StripeError::SignatureError(_))));
    }

    #[test]
    fn test_malformed_header_rejected() {
        assert!(verify_signature_at(PAYLOAD, "v1=abcd", SECRET, 300, 0).is_err());
        assert!(verify_signature_at(PAYLOAD, "t=123", SECRET, 300, 123).is_err());
        assert!(verify_signature_at(PAYLOAD, "", SECRET, 300, 0).is_err());
    }

    #[test]
    fn test_second_v1_candidate_accepted() {
        // Secret rotation sends digests under both the old and new secret.
        let now = 1_700_000_000;
        let good = sign(PAYLOAD, SECRET, now);
        let good_digest = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", now, "00".repeat(32), good_digest);

        assert!(verify_signature_at(PAYLOAD, &header, SECRET, 300, now).is_ok());
    }
}
