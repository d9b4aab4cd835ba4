use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Legal structure of the company behind a funding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyType {
    #[serde(rename = "LLC")]
    Llc,
    #[serde(rename = "C Corporation")]
    CCorporation,
    #[serde(rename = "S Corporation")]
    SCorporation,
    Partnership,
    #[serde(rename = "Sole Proprietorship")]
    SoleProprietorship,
    Other,
}

impl CompanyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyType::Llc => "LLC",
            CompanyType::CCorporation => "C Corporation",
            CompanyType::SCorporation => "S Corporation",
            CompanyType::Partnership => "Partnership",
            CompanyType::SoleProprietorship => "Sole Proprietorship",
            CompanyType::Other => "Other",
        }
    }
}

impl std::str::FromStr for CompanyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LLC" => Ok(CompanyType::Llc),
            "C Corporation" => Ok(CompanyType::CCorporation),
            "S Corporation" => Ok(CompanyType::SCorporation),
            "Partnership" => Ok(CompanyType::Partnership),
            "Sole Proprietorship" => Ok(CompanyType::SoleProprietorship),
            "Other" => Ok(CompanyType::Other),
            other => Err(format!("unknown company type: {}", other)),
        }
    }
}

/// Investment stage. Derived from the funding amount, never user-chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InvestmentStage {
    PreSeed,
    Seed,
    SeriesA,
    SeriesB,
    LateStage,
}

impl InvestmentStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentStage::PreSeed => "pre-seed",
            InvestmentStage::Seed => "seed",
            InvestmentStage::SeriesA => "series-a",
            InvestmentStage::SeriesB => "series-b",
            InvestmentStage::LateStage => "late-stage",
        }
    }
}

impl std::str::FromStr for InvestmentStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pre-seed" => Ok(InvestmentStage::PreSeed),
            "seed" => Ok(InvestmentStage::Seed),
            "series-a" => Ok(InvestmentStage::SeriesA),
            "series-b" => Ok(InvestmentStage::SeriesB),
            "late-stage" => Ok(InvestmentStage::LateStage),
            other => Err(format!("unknown investment stage: {}", other)),
        }
    }
}

/// Investor organization type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestorType {
    Individual,
    Vc,
    Angel,
    Pe,
    FamilyOffice,
    Corporate,
}

impl InvestorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestorType::Individual => "individual",
            InvestorType::Vc => "vc",
            InvestorType::Angel => "angel",
            InvestorType::Pe => "pe",
            InvestorType::FamilyOffice => "family_office",
            InvestorType::Corporate => "corporate",
        }
    }
}

impl std::str::FromStr for InvestorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "individual" => Ok(InvestorType::Individual),
            "vc" => Ok(InvestorType::Vc),
            "angel" => Ok(InvestorType::Angel),
            "pe" => Ok(InvestorType::Pe),
            "family_office" => Ok(InvestorType::FamilyOffice),
            "corporate" => Ok(InvestorType::Corporate),
            other => Err(format!("unknown investor type: {}", other)),
        }
    }
}

/// Scoring input for one funding request.
///
/// Immutable once created; carries exactly the fields the scorer reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundingRequest {
    #[serde(rename = "companyType")]
    pub company_type: CompanyType,
    pub category: String,
    #[serde(rename = "fundingRequired")]
    pub funding_required: i64,
    #[serde(rename = "investmentStage")]
    pub investment_stage: InvestmentStage,
    pub country: String,
}

/// Investor profile from the directory. Static reference data for matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestorProfile {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "investorType")]
    pub investor_type: InvestorType,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "investmentRangeMin")]
    pub investment_range_min: i64,
    #[serde(rename = "investmentRangeMax", default)]
    pub investment_range_max: Option<i64>,
    #[serde(rename = "preferredStages", default)]
    pub preferred_stages: Vec<InvestmentStage>,
    #[serde(rename = "preferredIndustries", default)]
    pub preferred_industries: Vec<String>,
    #[serde(rename = "preferredCompanyTypes", default)]
    pub preferred_company_types: Vec<CompanyType>,
    #[serde(rename = "geographicFocus", default)]
    pub geographic_focus: Vec<String>,
    #[serde(rename = "isActive", default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Compatibility score for one (funding request, investor) pair.
///
/// `score` is a deterministic pure function of its inputs: identical inputs
/// always produce an identical score and reason list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub score: u8,
    pub reasons: Vec<String>,
}

/// One ranked entry returned from a match query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedMatch {
    #[serde(rename = "investorId")]
    pub investor_id: Uuid,
    #[serde(rename = "investorName")]
    pub investor_name: String,
    pub score: u8,
    pub reasons: Vec<String>,
}

/// Login identity created on first checkout for an unknown email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    #[serde(rename = "displayName", default)]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Billing status of a customer account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
    Canceled,
}

/// Customer account row. Status moves only in response to billing events;
/// rows are never deleted, terminal accounts stay in `canceled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionAccount {
    pub id: Uuid,
    #[serde(rename = "identityId")]
    pub identity_id: Uuid,
    pub email: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "customerId")]
    pub customer_id: String,
    #[serde(rename = "subscriptionId", default)]
    pub subscription_id: Option<String>,
    #[serde(rename = "planId")]
    pub plan_id: String,
    #[serde(rename = "planName")]
    pub plan_name: String,
    #[serde(rename = "provisioningRef", default)]
    pub provisioning_ref: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subscription metadata as reported by the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    #[serde(rename = "subscriptionId")]
    pub subscription_id: String,
    #[serde(rename = "customerId")]
    pub customer_id: String,
    pub status: String,
    #[serde(rename = "currentPeriodStart", default)]
    pub current_period_start: Option<DateTime<Utc>>,
    #[serde(rename = "currentPeriodEnd", default)]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(rename = "priceId", default)]
    pub price_id: Option<String>,
    #[serde(default)]
    pub amount: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Persisted funding request submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    #[serde(rename = "companyName")]
    pub company_name: String,
    #[serde(rename = "companyType")]
    pub company_type: CompanyType,
    pub category: String,
    #[serde(rename = "fundingRequired")]
    pub funding_required: i64,
    #[serde(rename = "investmentStage")]
    pub investment_stage: InvestmentStage,
    #[serde(rename = "businessDescription", default)]
    pub business_description: Option<String>,
    pub country: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(rename = "matchesSent", default)]
    pub matches_sent: bool,
    pub created_at: DateTime<Utc>,
}

impl Submission {
    /// Project the scoring-relevant fields out of a stored submission.
    pub fn funding_request(&self) -> FundingRequest {
        FundingRequest {
            company_type: self.company_type,
            category: self.category.clone(),
            funding_required: self.funding_required,
            investment_stage: self.investment_stage,
            country: self.country.clone(),
        }
    }
}
