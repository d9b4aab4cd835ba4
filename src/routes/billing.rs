use actix_web::{web, HttpRequest, HttpResponse, Responder};
use thiserror::Error;
use validator::Validate;

use crate::core::{reconcile, Decision};
use crate::models::{
    BillingEvent, CancelRequest, CancelResponse, CheckoutRequest, CheckoutResponse, ErrorResponse,
    EventKind, SubscriptionAccount, SubscriptionRecord, WebhookAck,
};
use crate::routes::matches::AppState;
use crate::services::{
    verify_signature, CheckoutSessionParams, NewAccount, PostgresError, ProvisionRequest,
    ProvisioningError, StripeClient, StripeError,
};

/// Session id sentinel returned when no payment is needed.
const FREE_PLAN_SESSION: &str = "free-plan";
/// Plan that never goes through checkout, regardless of price id.
const FREE_PLAN_ID: &str = "self-employed";

const DEFAULT_PLAN_ID: &str = "entrepreneur";
const DEFAULT_PLAN_NAME: &str = "Entrepreneur";

/// Configure billing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/billing/checkout", web::post().to(create_checkout))
        .route("/billing/cancel", web::post().to(cancel_subscription))
        .route("/billing/webhook", web::post().to(webhook));
}

/// Create a checkout session
///
/// POST /api/v1/billing/checkout
///
/// Returns the sentinel session id `"free-plan"` when no price id is given
/// (or the plan is the free tier); otherwise the provider session id.
async fn create_checkout(
    state: web::Data<AppState>,
    req: web::Json<CheckoutRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();
    let metadata = req.metadata.unwrap_or_default();

    let is_free = match req.price_id.as_deref() {
        None | Some("") | Some("free") => true,
        _ => metadata.plan_id.as_deref() == Some(FREE_PLAN_ID),
    };

    if is_free {
        tracing::info!("Free plan selected for {}, skipping checkout", req.customer_email);
        return HttpResponse::Ok().json(CheckoutResponse {
            session_id: FREE_PLAN_SESSION.to_string(),
            message: Some("Free plan selected - no payment required".to_string()),
        });
    }

    let params = CheckoutSessionParams {
        // The free branch above handled None.
        price_id: req.price_id.unwrap_or_default(),
        customer_email: req.customer_email,
        customer_name: req.customer_name,
        plan_id: metadata.plan_id,
        plan_name: metadata.plan_name,
        company: metadata.company,
    };

    match state.stripe.create_checkout_session(&params).await {
        Ok(session_id) => {
            tracing::info!("Checkout session created: {}", session_id);
            HttpResponse::Ok().json(CheckoutResponse {
                session_id,
                message: None,
            })
        }
        Err(e) => {
            tracing::error!("Failed to create checkout session: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to create checkout session".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Cancel the customer's subscription
///
/// POST /api/v1/billing/cancel
///
/// Cancels with proration and marks the subscription and account terminal
/// immediately, without waiting for the asynchronous deleted event.
async fn cancel_subscription(
    state: web::Data<AppState>,
    req: web::Json<CancelRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let account = match state.postgres.find_account_by_email(&req.customer_email).await {
        Ok(Some(account)) => account,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Client account not found".to_string(),
                message: format!("No account for {}", req.customer_email),
                status_code: 404,
            });
        }
        Err(e) => {
            tracing::error!("Failed to look up account: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to look up account".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let subscription_id = match &account.subscription_id {
        Some(id) => id.clone(),
        None => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "No active subscription found".to_string(),
                message: format!("Account {} has no subscription", account.id),
                status_code: 404,
            });
        }
    };

    tracing::info!("Cancelling subscription {}", subscription_id);

    match state.stripe.cancel_subscription(&subscription_id).await {
        Ok(_) => {}
        Err(StripeError::NotFound(message)) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Subscription not found or already canceled".to_string(),
                message,
                status_code: 404,
            });
        }
        Err(e) => {
            tracing::error!("Failed to cancel subscription {}: {}", subscription_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to cancel subscription".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    }

    // Mark terminal now; the deleted webhook event lands on the same state.
    if let Err(e) = state.postgres.mark_subscription_canceled(&subscription_id).await {
        tracing::error!("Provider cancel succeeded but status write failed: {}", e);
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to record cancellation".to_string(),
            message: e.to_string(),
            status_code: 500,
        });
    }

    HttpResponse::Ok().json(CancelResponse {
        success: true,
        message: "Subscription canceled successfully".to_string(),
        subscription_id,
    })
}

/// Webhook receiver for billing events
///
/// POST /api/v1/billing/webhook
///
/// Verifies the payload signature, drops replays, derives the reconciliation
/// decision and applies it. Failures return 500 so the provider redelivers;
/// the idempotent writes make the replay safe.
async fn webhook(
    state: web::Data<AppState>,
    body: web::Bytes,
    http_req: HttpRequest,
) -> impl Responder {
    let signature = match http_req
        .headers()
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
    {
        Some(header) => header,
        None => {
            tracing::warn!("Webhook request without signature header");
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "No signature".to_string(),
                message: "Stripe-Signature header is required".to_string(),
                status_code: 400,
            });
        }
    };

    if let Err(e) = verify_signature(
        &body,
        signature,
        &state.webhook_secret,
        state.signature_tolerance_secs,
    ) {
        tracing::warn!("Webhook signature verification failed: {}", e);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Invalid signature".to_string(),
            message: e.to_string(),
            status_code: 400,
        });
    }

    let event = match StripeClient::parse_event(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!("Failed to parse webhook event: {}", e);
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Malformed event".to_string(),
                message: e.to_string(),
                status_code: 400,
            });
        }
    };

    tracing::info!("Received billing event: {} ({})", event.event_type, event.event_id);

    if matches!(event.kind, EventKind::Unhandled) {
        tracing::debug!("Unhandled event type: {}", event.event_type);
        return HttpResponse::Ok().json(WebhookAck { received: true });
    }

    match state.postgres.has_processed_event(&event.event_id).await {
        Ok(true) => {
            tracing::info!("Replay of event {}, already applied", event.event_id);
            return HttpResponse::Ok().json(WebhookAck { received: true });
        }
        Ok(false) => {}
        Err(e) => {
            tracing::error!("Failed to check event {}: {}", event.event_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Event processing failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    }

    let account = match resolve_account(&state, &event).await {
        Ok(account) => account,
        Err(e) => {
            tracing::error!("Failed to resolve account for {}: {}", event.event_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Event processing failed".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let decision = reconcile(&event.kind, account.as_ref());

    if let Err(e) = apply_decision(&state, decision).await {
        tracing::error!("Failed to apply event {}: {}", event.event_id, e);
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Event processing failed".to_string(),
            message: e.to_string(),
            status_code: 500,
        });
    }

    // Recorded only after the effects are applied, so a failure above leaves
    // the event unmarked and the redelivery reprocesses it.
    if let Err(e) = state
        .postgres
        .record_processed_event(&event.event_id, &event.event_type, event.subscription_id())
        .await
    {
        tracing::warn!("Failed to record processed event {}: {}", event.event_id, e);
    }

    HttpResponse::Ok().json(WebhookAck { received: true })
}

/// Errors raised while applying a reconciliation decision.
#[derive(Debug, Error)]
enum ApplyError {
    #[error("database error: {0}")]
    Database(#[from] PostgresError),

    #[error("provisioning error: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("event missing required field: {0}")]
    MissingData(&'static str),
}

/// Resolve the account a billing event refers to.
///
/// Checkout events look up by customer id or email; invoice events by
/// subscription id. Subscription lifecycle events address rows directly by
/// provider id and need no prior lookup.
async fn resolve_account(
    state: &AppState,
    event: &BillingEvent,
) -> Result<Option<SubscriptionAccount>, PostgresError> {
    match &event.kind {
        EventKind::CheckoutCompleted(session) => {
            match (&session.customer_id, &session.customer_email) {
                (Some(customer_id), Some(email)) => {
                    state.postgres.find_account_for_customer(customer_id, email).await
                }
                _ => Ok(None),
            }
        }
        EventKind::PaymentSucceeded(invoice) | EventKind::PaymentFailed(invoice) => {
            match &invoice.subscription_id {
                Some(subscription_id) => {
                    state.postgres.find_account_by_subscription(subscription_id).await
                }
                None => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

async fn apply_decision(state: &AppState, decision: Decision) -> Result<(), ApplyError> {
    match decision {
        Decision::Ignore { reason } => {
            tracing::info!("Skipping event: {}", reason);
            Ok(())
        }

        Decision::ProvisionAccount(session) => {
            let customer_id = session
                .customer_id
                .ok_or(ApplyError::MissingData("customer id"))?;
            let email = session
                .customer_email
                .ok_or(ApplyError::MissingData("customer email"))?;

            let identity = state
                .postgres
                .get_or_create_identity(&email, session.customer_name.as_deref())
                .await?;

            let company_name = session
                .company_name
                .unwrap_or_else(|| "Unknown Company".to_string());
            let plan_id = session
                .plan_id
                .unwrap_or_else(|| DEFAULT_PLAN_ID.to_string());
            let plan_name = session
                .plan_name
                .unwrap_or_else(|| DEFAULT_PLAN_NAME.to_string());

            // Provisioning runs before the account write. If it fails the
            // identity stays in place and the redelivered event finds it and
            // retries from this step.
            let receipt = state
                .provisioning
                .provision(&ProvisionRequest {
                    company_name: company_name.clone(),
                    email: email.clone(),
                    plan_id: plan_id.clone(),
                    plan_name: plan_name.clone(),
                    customer_id: customer_id.clone(),
                    subscription_id: session.subscription_id.clone(),
                    identity_id: identity.id,
                })
                .await?;

            let account_id = state
                .postgres
                .create_account(&NewAccount {
                    identity_id: identity.id,
                    email,
                    company_name,
                    customer_id: customer_id.clone(),
                    subscription_id: session.subscription_id,
                    plan_id,
                    plan_name,
                    provisioning_ref: receipt.reference,
                })
                .await?;

            tracing::info!(
                "Provisioned account {} for customer {}",
                account_id,
                customer_id
            );
            Ok(())
        }

        Decision::AttachSubscription {
            account_id,
            subscription_id,
            plan_id,
            plan_name,
        } => {
            state
                .postgres
                .attach_subscription(
                    account_id,
                    &subscription_id,
                    plan_id.as_deref(),
                    plan_name.as_deref(),
                )
                .await?;
            Ok(())
        }

        Decision::RecordSubscription(subscription) => {
            let record = SubscriptionRecord::from(&subscription);
            state.postgres.apply_subscription_update(&record, None).await?;
            Ok(())
        }

        Decision::ApplySubscriptionUpdate {
            subscription,
            account_status,
        } => {
            let record = SubscriptionRecord::from(&subscription);
            state
                .postgres
                .apply_subscription_update(&record, account_status)
                .await?;
            Ok(())
        }

        Decision::Terminate { subscription_id } => {
            state.postgres.mark_subscription_canceled(&subscription_id).await?;
            Ok(())
        }

        Decision::ApplyPaymentOutcome {
            subscription_id,
            account_status,
        } => {
            let updated = state
                .postgres
                .set_account_status_by_subscription(&subscription_id, account_status)
                .await?;

            if !updated {
                tracing::info!(
                    "No account references subscription {}, payment event dropped",
                    subscription_id
                );
            }
            Ok(())
        }
    }
}
