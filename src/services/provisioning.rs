use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Errors that can occur when calling the provisioning service
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Provisioning rejected: {0}")]
    Rejected(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Provisioning request for a newly active subscription.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionRequest {
    #[serde(rename = "companyName")]
    pub company_name: String,
    pub email: String,
    #[serde(rename = "planId")]
    pub plan_id: String,
    #[serde(rename = "planName")]
    pub plan_name: String,
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "subscriptionId")]
    pub subscription_id: Option<String>,
    #[serde(rename = "identityId")]
    pub identity_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ProvisionResponse {
    success: bool,
    #[serde(rename = "accountRef", default)]
    account_ref: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Reference to the external resources created for an account.
#[derive(Debug, Clone)]
pub struct ProvisionReceipt {
    pub reference: Option<String>,
}

/// Client for the external provisioning service.
///
/// One bounded-timeout call per event, no internal retries: the webhook
/// source redelivers failed events, and the idempotent account writes make
/// the replayed provisioning attempt safe.
pub struct ProvisioningClient {
    endpoint: String,
    service_key: String,
    client: Client,
}

impl ProvisioningClient {
    pub fn new(endpoint: String, service_key: String, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            endpoint,
            service_key,
            client,
        }
    }

    /// Request provisioning for a newly active subscription.
    pub async fn provision(
        &self,
        request: &ProvisionRequest,
    ) -> Result<ProvisionReceipt, ProvisioningError> {
        tracing::debug!(
            "Requesting provisioning for {} ({})",
            request.company_name,
            request.email
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.service_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProvisioningError::Rejected(format!("{} {}", status, body)));
        }

        let body: ProvisionResponse = response
            .json()
            .await
            .map_err(|e| ProvisioningError::InvalidResponse(e.to_string()))?;

        if !body.success {
            return Err(ProvisioningError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(ProvisionReceipt {
            reference: body.account_ref,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let request = ProvisionRequest {
            company_name: "Acme".to_string(),
            email: "founder@example.com".to_string(),
            plan_id: "entrepreneur".to_string(),
            plan_name: "Entrepreneur".to_string(),
            customer_id: "cus_1".to_string(),
            subscription_id: Some("sub_1".to_string()),
            identity_id: Uuid::nil(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["companyName"], "Acme");
        assert_eq!(json["customerId"], "cus_1");
        assert_eq!(json["subscriptionId"], "sub_1");
    }
}
