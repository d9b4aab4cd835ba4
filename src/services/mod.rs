// Service exports
pub mod cache;
pub mod postgres;
pub mod provisioning;
pub mod stripe;

pub use cache::{CacheError, CacheKey, CacheManager};
pub use postgres::{NewAccount, PostgresClient, PostgresError};
pub use provisioning::{ProvisionReceipt, ProvisionRequest, ProvisioningClient, ProvisioningError};
pub use stripe::{verify_signature, CheckoutSessionParams, StripeClient, StripeError};
