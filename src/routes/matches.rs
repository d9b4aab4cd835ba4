use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{stage_for_amount, Matcher};
use crate::models::{
    ErrorResponse, FundingRequest, HealthResponse, InvestorProfile, MatchQueryRequest,
    MatchQueryResponse,
};
use crate::services::{
    CacheKey, CacheManager, PostgresClient, PostgresError, ProvisioningClient, StripeClient,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub stripe: Arc<StripeClient>,
    pub provisioning: Arc<ProvisioningClient>,
    pub cache: Arc<CacheManager>,
    pub postgres: Arc<PostgresClient>,
    pub matcher: Matcher,
    pub webhook_secret: String,
    pub signature_tolerance_secs: i64,
}

/// Configure match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/find", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let pg_healthy = state.postgres.health_check().await.unwrap_or(false);

    let status = if pg_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Load the active investor directory, cache first.
///
/// Cache failures degrade to a direct database read; only the database going
/// away is an error.
pub(crate) async fn load_directory(
    state: &AppState,
) -> Result<Vec<InvestorProfile>, PostgresError> {
    let key = CacheKey::investors();

    match state.cache.get::<Vec<InvestorProfile>>(&key).await {
        Ok(investors) => return Ok(investors),
        Err(e) => tracing::trace!("Investor directory not cached: {}", e),
    }

    let investors = state.postgres.list_active_investors().await?;

    if let Err(e) = state.cache.set(&key, &investors).await {
        tracing::warn!("Failed to cache investor directory: {}", e);
    }

    Ok(investors)
}

/// Find matches endpoint
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "companyType": "LLC",
///   "category": "Technology",
///   "fundingRequired": 1000000,
///   "country": "United States",
///   "investors": [ ... ],
///   "limit": 20
/// }
/// ```
///
/// The investment stage is derived from `fundingRequired`. When `investors`
/// is omitted, the stored directory is ranked instead.
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<MatchQueryRequest>,
) -> impl Responder {
    // Validate request
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for find_matches request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();
    // Cap limit at 100 to bound response size
    let limit = (req.limit.min(100)) as usize;

    let request = FundingRequest {
        company_type: req.company_type,
        category: req.category,
        funding_required: req.funding_required,
        investment_stage: stage_for_amount(req.funding_required),
        country: req.country,
    };

    let investors = match req.investors {
        Some(investors) => investors,
        None => match load_directory(&state).await {
            Ok(investors) => investors,
            Err(e) => {
                tracing::error!("Failed to load investor directory: {}", e);
                return HttpResponse::InternalServerError().json(ErrorResponse {
                    error: "Failed to load investor directory".to_string(),
                    message: e.to_string(),
                    status_code: 500,
                });
            }
        },
    };

    tracing::debug!(
        "Ranking {} investors for a {} {} request",
        investors.len(),
        request.investment_stage.as_str(),
        request.category
    );

    let mut result = state.matcher.rank(&request, investors);
    result.matches.truncate(limit);

    tracing::info!(
        "Returning {} qualifying matches (from {} candidates)",
        result.matches.len(),
        result.total_candidates
    );

    HttpResponse::Ok().json(MatchQueryResponse {
        matches: result.matches,
        total_candidates: result.total_candidates,
    })
}
