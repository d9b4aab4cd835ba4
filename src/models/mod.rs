// Model exports
pub mod domain;
pub mod events;
pub mod requests;
pub mod responses;

pub use domain::{
    AccountStatus, CompanyType, FundingRequest, Identity, InvestmentStage, InvestorProfile,
    InvestorType, MatchResult, RankedMatch, Submission, SubscriptionAccount, SubscriptionRecord,
};
pub use events::{
    BillingEvent, CheckoutSessionData, EventKind, EventParseError, InvoiceData, ProviderStatus,
    SubscriptionData,
};
pub use requests::{
    CancelRequest, CheckoutMetadata, CheckoutRequest, MatchQueryRequest, SubmitRequest,
    UpsertInvestorRequest,
};
pub use responses::{
    CancelResponse, CheckoutResponse, ErrorResponse, HealthResponse, InvestorListResponse,
    MatchQueryResponse, SubmissionResponse, UpsertInvestorResponse, WebhookAck,
};
