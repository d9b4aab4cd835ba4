use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::domain::{CompanyType, InvestmentStage, InvestorProfile, InvestorType};

/// Request to rank investors against a funding request.
///
/// The investment stage is derived server-side from `fundingRequired`; it is
/// not accepted from the caller. When `investors` is omitted the stored
/// directory is used.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchQueryRequest {
    #[serde(alias = "company_type", rename = "companyType")]
    pub company_type: CompanyType,
    #[validate(length(min = 1))]
    pub category: String,
    #[validate(range(min = 0))]
    #[serde(alias = "funding_required", rename = "fundingRequired")]
    pub funding_required: i64,
    #[validate(length(min = 1))]
    pub country: String,
    #[serde(default)]
    pub investors: Option<Vec<InvestorProfile>>,
    #[serde(default = "default_limit")]
    pub limit: u16,
}

fn default_limit() -> u16 {
    20
}

/// Request to record a funding submission.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SubmitRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "company_name", rename = "companyName")]
    pub company_name: String,
    #[serde(alias = "company_type", rename = "companyType")]
    pub company_type: CompanyType,
    #[validate(length(min = 1))]
    pub category: String,
    #[serde(alias = "custom_category", rename = "customCategory", default)]
    pub custom_category: Option<String>,
    #[validate(range(min = 0))]
    #[serde(alias = "funding_required", rename = "fundingRequired")]
    pub funding_required: i64,
    #[serde(alias = "business_description", rename = "businessDescription", default)]
    pub business_description: Option<String>,
    #[validate(length(min = 1))]
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
}

impl SubmitRequest {
    /// The category to store: the fixed list entry, or the free-text value
    /// when "Other" was chosen.
    pub fn resolved_category(&self) -> String {
        if self.category == "Other" {
            if let Some(custom) = &self.custom_category {
                if !custom.trim().is_empty() {
                    return custom.trim().to_string();
                }
            }
        }
        self.category.clone()
    }
}

/// Request to create (or update) an investor profile.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpsertInvestorRequest {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(alias = "investor_type", rename = "investorType")]
    pub investor_type: InvestorType,
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    #[serde(alias = "investment_range_min", rename = "investmentRangeMin")]
    pub investment_range_min: i64,
    #[serde(alias = "investment_range_max", rename = "investmentRangeMax", default)]
    pub investment_range_max: Option<i64>,
    #[serde(alias = "preferred_stages", rename = "preferredStages", default)]
    pub preferred_stages: Vec<InvestmentStage>,
    #[serde(alias = "preferred_industries", rename = "preferredIndustries", default)]
    pub preferred_industries: Vec<String>,
    #[serde(alias = "preferred_company_types", rename = "preferredCompanyTypes", default)]
    pub preferred_company_types: Vec<CompanyType>,
    #[serde(alias = "geographic_focus", rename = "geographicFocus", default)]
    pub geographic_focus: Vec<String>,
    #[serde(alias = "is_active", rename = "isActive", default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Request to start a checkout session.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutRequest {
    #[serde(alias = "price_id", rename = "priceId", default)]
    pub price_id: Option<String>,
    #[validate(email)]
    #[serde(alias = "customer_email", rename = "customerEmail")]
    pub customer_email: String,
    #[serde(alias = "customer_name", rename = "customerName", default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
}

/// Free-form plan metadata attached to a checkout session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(alias = "plan_id", rename = "planId", default)]
    pub plan_id: Option<String>,
    #[serde(alias = "plan_name", rename = "planName", default)]
    pub plan_name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
}

/// Request to cancel a customer's subscription.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelRequest {
    #[validate(email)]
    #[serde(alias = "customer_email", rename = "customerEmail")]
    pub customer_email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolved_category_custom() {
        let req = SubmitRequest {
            company_name: "Acme".to_string(),
            company_type: CompanyType::Llc,
            category: "Other".to_string(),
            custom_category: Some("Space Logistics".to_string()),
            funding_required: 1_000_000,
            business_description: None,
            country: "United States".to_string(),
            state: None,
            city: None,
            email: None,
        };

        assert_eq!(req.resolved_category(), "Space Logistics");
    }

    #[test]
    fn test_resolved_category_fixed() {
        let req = SubmitRequest {
            company_name: "Acme".to_string(),
            company_type: CompanyType::Llc,
            category: "Technology".to_string(),
            custom_category: Some("ignored".to_string()),
            funding_required: 1_000_000,
            business_description: None,
            country: "United States".to_string(),
            state: None,
            city: None,
            email: None,
        };

        assert_eq!(req.resolved_category(), "Technology");
    }
}
