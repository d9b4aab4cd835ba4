use crate::models::{
    AccountStatus, CheckoutSessionData, EventKind, ProviderStatus, SubscriptionAccount,
    SubscriptionData,
};
use uuid::Uuid;

/// Side effects the webhook dispatcher must apply for one billing event.
///
/// Deriving the decision is pure; executing it (database writes, identity
/// creation, external provisioning) belongs to the caller. Every decision is
/// keyed by provider-assigned ids so applying it twice lands in the same end
/// state as applying it once.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// First checkout for an unknown customer: create the identity, request
    /// external provisioning, then write the account row.
    ProvisionAccount(CheckoutSessionData),
    /// Checkout for a customer we already know: attach the new subscription
    /// id to the existing account and reactivate it.
    AttachSubscription {
        account_id: Uuid,
        subscription_id: String,
        plan_id: Option<String>,
        plan_name: Option<String>,
    },
    /// Persist subscription metadata (period bounds, plan, amount).
    RecordSubscription(SubscriptionData),
    /// Refresh period bounds; move the account only when the provider status
    /// demands it.
    ApplySubscriptionUpdate {
        subscription: SubscriptionData,
        account_status: Option<AccountStatus>,
    },
    /// Mark both the subscription and the account terminal.
    Terminate { subscription_id: String },
    /// Invoice outcome for a subscription with a known account.
    ApplyPaymentOutcome {
        subscription_id: String,
        account_status: AccountStatus,
    },
    /// Nothing to apply.
    Ignore { reason: String },
}

/// Account status implied by a provider-reported subscription status on an
/// update event. `None` means the account keeps its current status.
pub fn status_for_provider(status: &ProviderStatus) -> Option<AccountStatus> {
    match status {
        // Trials are not modeled separately; both keep the account as-is.
        ProviderStatus::Active | ProviderStatus::Trialing => None,
        ProviderStatus::PastDue => Some(AccountStatus::Suspended),
        ProviderStatus::Canceled => Some(AccountStatus::Canceled),
        // Statuses outside the reconciliation table never move the account.
        ProviderStatus::Other(_) => None,
    }
}

/// Derive the next account status and side effects for one event.
///
/// `account` is the current account row resolved by the caller: by customer
/// id or email for checkout events, by subscription id for invoice events.
/// Events are treated as independent, idempotent status-setting operations;
/// no arrival order is assumed.
pub fn reconcile(event: &EventKind, account: Option<&SubscriptionAccount>) -> Decision {
    match event {
        EventKind::CheckoutCompleted(session) => reconcile_checkout(session, account),

        EventKind::SubscriptionCreated(sub) => Decision::RecordSubscription(sub.clone()),

        EventKind::SubscriptionUpdated(sub) => Decision::ApplySubscriptionUpdate {
            subscription: sub.clone(),
            account_status: status_for_provider(&sub.status),
        },

        EventKind::SubscriptionDeleted(sub) => Decision::Terminate {
            subscription_id: sub.subscription_id.clone(),
        },

        EventKind::PaymentSucceeded(invoice) => {
            reconcile_invoice(invoice.subscription_id.as_deref(), account, AccountStatus::Active)
        }

        EventKind::PaymentFailed(invoice) => reconcile_invoice(
            invoice.subscription_id.as_deref(),
            account,
            AccountStatus::Suspended,
        ),

        EventKind::Unhandled => Decision::Ignore {
            reason: "event type outside the reconciliation table".to_string(),
        },
    }
}

fn reconcile_checkout(
    session: &CheckoutSessionData,
    account: Option<&SubscriptionAccount>,
) -> Decision {
    let subscription_id = match &session.subscription_id {
        Some(id) => id.clone(),
        None => {
            return Decision::Ignore {
                reason: "checkout session carries no subscription".to_string(),
            }
        }
    };

    if session.customer_id.is_none() || session.customer_email.is_none() {
        return Decision::Ignore {
            reason: "checkout session missing customer id or email".to_string(),
        };
    }

    match account {
        Some(existing) => Decision::AttachSubscription {
            account_id: existing.id,
            subscription_id,
            plan_id: session.plan_id.clone(),
            plan_name: session.plan_name.clone(),
        },
        None => Decision::ProvisionAccount(session.clone()),
    }
}

fn reconcile_invoice(
    subscription_id: Option<&str>,
    account: Option<&SubscriptionAccount>,
    status: AccountStatus,
) -> Decision {
    let subscription_id = match subscription_id {
        Some(id) => id.to_string(),
        None => {
            return Decision::Ignore {
                reason: "invoice not tied to a subscription".to_string(),
            }
        }
    };

    if account.is_none() {
        // Events can arrive before the account exists; safe to drop, the
        // provider will redeliver anything that still matters.
        return Decision::Ignore {
            reason: format!("no account for subscription {}", subscription_id),
        };
    }

    Decision::ApplyPaymentOutcome {
        subscription_id,
        account_status: status,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceData;
    use chrono::Utc;

    fn checkout_session() -> CheckoutSessionData {
        CheckoutSessionData {
            session_id: "cs_1".to_string(),
            customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            customer_email: Some("founder@example.com".to_string()),
            customer_name: Some("Ada Founder".to_string()),
            company_name: Some("Acme".to_string()),
            plan_id: Some("entrepreneur".to_string()),
            plan_name: Some("Entrepreneur".to_string()),
        }
    }

    fn account() -> SubscriptionAccount {
        SubscriptionAccount {
            id: Uuid::new_v4(),
            identity_id: Uuid::new_v4(),
            email: "founder@example.com".to_string(),
            company_name: "Acme".to_string(),
            customer_id: "cus_1".to_string(),
            subscription_id: Some("sub_1".to_string()),
            plan_id: "entrepreneur".to_string(),
            plan_name: "Entrepreneur".to_string(),
            provisioning_ref: None,
            status: AccountStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn subscription(status: ProviderStatus) -> SubscriptionData {
        SubscriptionData {
            subscription_id: "sub_1".to_string(),
            customer_id: "cus_1".to_string(),
            status,
            current_period_start: None,
            current_period_end: None,
            price_id: Some("price_1".to_string()),
            amount: Some(9900),
            currency: Some("usd".to_string()),
        }
    }

    #[test]
    fn test_first_checkout_provisions() {
        let decision = reconcile(&EventKind::CheckoutCompleted(checkout_session()), None);
        assert!(matches!(decision, Decision::ProvisionAccount(_)));
    }

    #[test]
    fn test_repeat_checkout_attaches() {
        let existing = account();
        let decision = reconcile(
            &EventKind::CheckoutCompleted(checkout_session()),
            Some(&existing),
        );

        match decision {
            Decision::AttachSubscription {
                account_id,
                subscription_id,
                ..
            } => {
                assert_eq!(account_id, existing.id);
                assert_eq!(subscription_id, "sub_1");
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_checkout_missing_email_ignored() {
        let mut session = checkout_session();
        session.customer_email = None;

        let decision = reconcile(&EventKind::CheckoutCompleted(session), None);
        assert!(matches!(decision, Decision::Ignore { .. }));
    }

    #[test]
    fn test_update_past_due_suspends() {
        let decision = reconcile(
            &EventKind::SubscriptionUpdated(subscription(ProviderStatus::PastDue)),
            Some(&account()),
        );

        match decision {
            Decision::ApplySubscriptionUpdate { account_status, .. } => {
                assert_eq!(account_status, Some(AccountStatus::Suspended));
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_update_active_keeps_status() {
        for status in [ProviderStatus::Active, ProviderStatus::Trialing] {
            let decision = reconcile(
                &EventKind::SubscriptionUpdated(subscription(status)),
                Some(&account()),
            );

            match decision {
                Decision::ApplySubscriptionUpdate { account_status, .. } => {
                    assert_eq!(account_status, None);
                }
                other => panic!("unexpected decision: {:?}", other),
            }
        }
    }

    #[test]
    fn test_update_canceled_terminalizes_account() {
        let decision = reconcile(
            &EventKind::SubscriptionUpdated(subscription(ProviderStatus::Canceled)),
            Some(&account()),
        );

        match decision {
            Decision::ApplySubscriptionUpdate { account_status, .. } => {
                assert_eq!(account_status, Some(AccountStatus::Canceled));
            }
            other => panic!("unexpected decision: {:?}", other),
        }
    }

    #[test]
    fn test_deleted_terminates() {
        let decision = reconcile(
            &EventKind::SubscriptionDeleted(subscription(ProviderStatus::Canceled)),
            Some(&account()),
        );

        assert_eq!(
            decision,
            Decision::Terminate {
                subscription_id: "sub_1".to_string()
            }
        );
    }

    #[test]
    fn test_payment_failed_without_account_is_noop() {
        let invoice = InvoiceData {
            invoice_id: "in_1".to_string(),
            subscription_id: Some("sub_unknown".to_string()),
            customer_id: None,
        };

        let decision = reconcile(&EventKind::PaymentFailed(invoice), None);
        assert!(matches!(decision, Decision::Ignore { .. }));
    }

    #[test]
    fn test_payment_outcomes_set_status() {
        let invoice = InvoiceData {
            invoice_id: "in_1".to_string(),
            subscription_id: Some("sub_1".to_string()),
            customer_id: Some("cus_1".to_string()),
        };
        let existing = account();

        let succeeded = reconcile(&EventKind::PaymentSucceeded(invoice.clone()), Some(&existing));
        assert_eq!(
            succeeded,
            Decision::ApplyPaymentOutcome {
                subscription_id: "sub_1".to_string(),
                account_status: AccountStatus::Active,
            }
        );

        let failed = reconcile(&EventKind::PaymentFailed(invoice), Some(&existing));
        assert_eq!(
            failed,
            Decision::ApplyPaymentOutcome {
                subscription_id: "sub_1".to_string(),
                account_status: AccountStatus::Suspended,
            }
        );
    }
}
