use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::{InvestmentStage, InvestorProfile, RankedMatch};

/// Response for the match query endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchQueryResponse {
    pub matches: Vec<RankedMatch>,
    pub total_candidates: usize,
}

/// Response after recording a funding submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub id: Uuid,
    #[serde(rename = "investmentStage")]
    pub investment_stage: InvestmentStage,
}

/// Response for the investor directory listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorListResponse {
    pub investors: Vec<InvestorProfile>,
    pub count: usize,
}

/// Response after creating or updating an investor profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertInvestorResponse {
    pub success: bool,
    pub id: Uuid,
}

/// Response for checkout session creation. `session_id` is the sentinel
/// `"free-plan"` when no payment is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response for subscription cancellation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
}

/// Acknowledgement returned to the webhook sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
