use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors raised while decoding a webhook event payload.
#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    #[error("Failed to decode event object: {0}")]
    DecodeError(#[from] serde_json::Error),
}

/// Subscription status as reported by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
    Other(String),
}

impl ProviderStatus {
    pub fn parse(s: &str) -> Self {
        match s {
            "active" => ProviderStatus::Active,
            "trialing" => ProviderStatus::Trialing,
            "past_due" => ProviderStatus::PastDue,
            "canceled" => ProviderStatus::Canceled,
            other => ProviderStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProviderStatus::Active => "active",
            ProviderStatus::Trialing => "trialing",
            ProviderStatus::PastDue => "past_due",
            ProviderStatus::Canceled => "canceled",
            ProviderStatus::Other(s) => s,
        }
    }
}

/// Fields extracted from a completed checkout session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionData {
    pub session_id: String,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub company_name: Option<String>,
    pub plan_id: Option<String>,
    pub plan_name: Option<String>,
}

/// Fields extracted from a subscription lifecycle event.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionData {
    pub subscription_id: String,
    pub customer_id: String,
    pub status: ProviderStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub price_id: Option<String>,
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

/// Fields extracted from an invoice payment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceData {
    pub invoice_id: String,
    pub subscription_id: Option<String>,
    pub customer_id: Option<String>,
}

/// One parsed webhook event from the payment provider.
#[derive(Debug, Clone)]
pub struct BillingEvent {
    /// Provider-assigned event id, the idempotency key for replay detection.
    pub event_id: String,
    pub event_type: String,
    pub kind: EventKind,
}

#[derive(Debug, Clone)]
pub enum EventKind {
    CheckoutCompleted(CheckoutSessionData),
    SubscriptionCreated(SubscriptionData),
    SubscriptionUpdated(SubscriptionData),
    SubscriptionDeleted(SubscriptionData),
    PaymentSucceeded(InvoiceData),
    PaymentFailed(InvoiceData),
    /// Event types outside the reconciliation table; acknowledged, not acted on.
    Unhandled,
}

/// Wire shape of a checkout session object.
#[derive(Debug, Deserialize, Serialize)]
struct CheckoutSessionObject {
    id: String,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    customer_details: Option<CustomerDetails>,
    #[serde(default)]
    metadata: Option<SessionMetadata>,
}

#[derive(Debug, Deserialize, Serialize)]
struct CustomerDetails {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SessionMetadata {
    #[serde(default)]
    customer_name: Option<String>,
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    plan_name: Option<String>,
    #[serde(default)]
    company: Option<String>,
}

/// Wire shape of a subscription object.
#[derive(Debug, Deserialize, Serialize)]
struct SubscriptionObject {
    id: String,
    customer: String,
    status: String,
    #[serde(default)]
    current_period_start: Option<i64>,
    #[serde(default)]
    current_period_end: Option<i64>,
    #[serde(default)]
    items: Option<SubscriptionItems>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SubscriptionItems {
    #[serde(default)]
    data: Vec<SubscriptionItem>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SubscriptionItem {
    #[serde(default)]
    price: Option<PriceObject>,
}

#[derive(Debug, Deserialize, Serialize)]
struct PriceObject {
    id: String,
    #[serde(default)]
    unit_amount: Option<i64>,
    #[serde(default)]
    currency: Option<String>,
}

/// Wire shape of an invoice object.
#[derive(Debug, Deserialize, Serialize)]
struct InvoiceObject {
    id: String,
    #[serde(default)]
    subscription: Option<String>,
    #[serde(default)]
    customer: Option<String>,
}

impl BillingEvent {
    /// Decode the provider's event envelope: `{ id, type, data: { object } }`.
    pub fn from_value(value: &Value) -> Result<Self, EventParseError> {
        let event_id = value
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EventParseError::MalformedPayload("missing event id".into()))?
            .to_string();

        let event_type = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| EventParseError::MalformedPayload("missing event type".into()))?
            .to_string();

        let object = value
            .get("data")
            .and_then(|d| d.get("object"))
            .ok_or_else(|| EventParseError::MalformedPayload("missing data.object".into()))?;

        let kind = match event_type.as_str() {
            "checkout.session.completed" => {
                let session: CheckoutSessionObject = serde_json::from_value(object.clone())?;
                EventKind::CheckoutCompleted(session.into())
            }
            "customer.subscription.created" => {
                let sub: SubscriptionObject = serde_json::from_value(object.clone())?;
                EventKind::SubscriptionCreated(sub.into())
            }
            "customer.subscription.updated" => {
                let sub: SubscriptionObject = serde_json::from_value(object.clone())?;
                EventKind::SubscriptionUpdated(sub.into())
            }
            "customer.subscription.deleted" => {
                let sub: SubscriptionObject = serde_json::from_value(object.clone())?;
                EventKind::SubscriptionDeleted(sub.into())
            }
            "invoice.payment_succeeded" => {
                let invoice: InvoiceObject = serde_json::from_value(object.clone())?;
                EventKind::PaymentSucceeded(invoice.into())
            }
            "invoice.payment_failed" => {
                let invoice: InvoiceObject = serde_json::from_value(object.clone())?;
                EventKind::PaymentFailed(invoice.into())
            }
            _ => EventKind::Unhandled,
        };

        Ok(BillingEvent {
            event_id,
            event_type,
            kind,
        })
    }

    /// Subscription id referenced by this event, when it carries one.
    pub fn subscription_id(&self) -> Option<&str> {
        match &self.kind {
            EventKind::CheckoutCompleted(session) => session.subscription_id.as_deref(),
            EventKind::SubscriptionCreated(sub)
            | EventKind::SubscriptionUpdated(sub)
            | EventKind::SubscriptionDeleted(sub) => Some(&sub.subscription_id),
            EventKind::PaymentSucceeded(invoice) | EventKind::PaymentFailed(invoice) => {
                invoice.subscription_id.as_deref()
            }
            EventKind::Unhandled => None,
        }
    }
}

impl From<CheckoutSessionObject> for CheckoutSessionData {
    fn from(session: CheckoutSessionObject) -> Self {
        let details = session.customer_details;
        let metadata = session.metadata;

        let customer_email = details.as_ref().and_then(|d| d.email.clone());
        // Metadata wins over checkout-form details for the display name.
        let customer_name = metadata
            .as_ref()
            .and_then(|m| m.customer_name.clone())
            .or_else(|| details.as_ref().and_then(|d| d.name.clone()));
        let company_name = metadata
            .as_ref()
            .and_then(|m| m.company.clone())
            .or_else(|| customer_name.clone());

        CheckoutSessionData {
            session_id: session.id,
            customer_id: session.customer,
            subscription_id: session.subscription,
            customer_email,
            customer_name,
            company_name,
            plan_id: metadata.as_ref().and_then(|m| m.plan_id.clone()),
            plan_name: metadata.as_ref().and_then(|m| m.plan_name.clone()),
        }
    }
}

impl From<SubscriptionObject> for SubscriptionData {
    fn from(sub: SubscriptionObject) -> Self {
        let price = sub
            .items
            .as_ref()
            .and_then(|items| items.data.first())
            .and_then(|item| item.price.as_ref());

        SubscriptionData {
            subscription_id: sub.id,
            customer_id: sub.customer,
            status: ProviderStatus::parse(&sub.status),
            current_period_start: sub
                .current_period_start
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            current_period_end: sub
                .current_period_end
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
            price_id: price.map(|p| p.id.clone()),
            amount: price.and_then(|p| p.unit_amount),
            currency: price.and_then(|p| p.currency.clone()),
        }
    }
}

impl From<&SubscriptionData> for crate::models::domain::SubscriptionRecord {
    fn from(sub: &SubscriptionData) -> Self {
        Self {
            subscription_id: sub.subscription_id.clone(),
            customer_id: sub.customer_id.clone(),
            status: sub.status.as_str().to_string(),
            current_period_start: sub.current_period_start,
            current_period_end: sub.current_period_end,
            price_id: sub.price_id.clone(),
            amount: sub.amount,
            currency: sub.currency.clone(),
        }
    }
}

impl From<InvoiceObject> for InvoiceData {
    fn from(invoice: InvoiceObject) -> Self {
        InvoiceData {
            invoice_id: invoice.id,
            subscription_id: invoice.subscription,
            customer_id: invoice.customer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_checkout_completed() {
        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "cs_test_1",
                "customer": "cus_1",
                "subscription": "sub_1",
                "customer_details": { "email": "founder@example.com", "name": "Ada Founder" },
                "metadata": { "plan_id": "entrepreneur", "plan_name": "Entrepreneur", "company": "Acme" }
            }}
        });

        let event = BillingEvent::from_value(&payload).unwrap();
        assert_eq!(event.event_id, "evt_1");
        match event.kind {
            EventKind::CheckoutCompleted(session) => {
                assert_eq!(session.customer_id.as_deref(), Some("cus_1"));
                assert_eq!(session.subscription_id.as_deref(), Some("sub_1"));
                assert_eq!(session.customer_email.as_deref(), Some("founder@example.com"));
                assert_eq!(session.company_name.as_deref(), Some("Acme"));
                assert_eq!(session.plan_id.as_deref(), Some("entrepreneur"));
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_subscription_updated() {
        let payload = json!({
            "id": "evt_2",
            "type": "customer.subscription.updated",
            "data": { "object": {
                "id": "sub_1",
                "customer": "cus_1",
                "status": "past_due",
                "current_period_start": 1_700_000_000,
                "current_period_end": 1_702_592_000,
                "items": { "data": [ { "price": { "id": "price_1", "unit_amount": 9900, "currency": "usd" } } ] }
            }}
        });

        let event = BillingEvent::from_value(&payload).unwrap();
        match event.kind {
            EventKind::SubscriptionUpdated(sub) => {
                assert_eq!(sub.status, ProviderStatus::PastDue);
                assert_eq!(sub.amount, Some(9900));
                assert!(sub.current_period_start.is_some());
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_parse_unknown_event_type() {
        let payload = json!({
            "id": "evt_3",
            "type": "customer.created",
            "data": { "object": { "id": "cus_1" } }
        });

        let event = BillingEvent::from_value(&payload).unwrap();
        assert!(matches!(event.kind, EventKind::Unhandled));
        assert!(event.subscription_id().is_none());
    }

    #[test]
    fn test_missing_envelope_fields() {
        let payload = json!({ "type": "invoice.payment_failed" });
        assert!(BillingEvent::from_value(&payload).is_err());
    }
}
