use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    ErrorResponse, InvestorListResponse, InvestorProfile, UpsertInvestorRequest,
    UpsertInvestorResponse,
};
use crate::routes::matches::{load_directory, AppState};

/// Configure investor directory routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/investors", web::get().to(list_investors))
        .route("/investors", web::post().to(upsert_investor));
}

/// List the active investor directory
///
/// GET /api/v1/investors
async fn list_investors(state: web::Data<AppState>) -> impl Responder {
    match load_directory(&state).await {
        Ok(investors) => {
            let count = investors.len();
            HttpResponse::Ok().json(InvestorListResponse { investors, count })
        }
        Err(e) => {
            tracing::error!("Failed to load investor directory: {}", e);
            HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load investor directory".to_string(),
                message: e.to_string(),
                status_code: 500,
            })
        }
    }
}

/// Create or update an investor profile
///
/// POST /api/v1/investors
///
/// Writes invalidate the cached directory and any ranked results derived
/// from it.
async fn upsert_investor(
    state: web::Data<AppState>,
    req: web::Json<UpsertInvestorRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let req = req.into_inner();
    let investor = InvestorProfile {
        id: req.id.unwrap_or_else(Uuid::new_v4),
        name: req.name,
        investor_type: req.investor_type,
        email: req.email,
        website: req.website,
        description: req.description,
        investment_range_min: req.investment_range_min,
        investment_range_max: req.investment_range_max,
        preferred_stages: req.preferred_stages,
        preferred_industries: req.preferred_industries,
        preferred_company_types: req.preferred_company_types,
        geographic_focus: req.geographic_focus,
        is_active: req.is_active,
    };

    if let Err(e) = state.postgres.upsert_investor(&investor).await {
        tracing::error!("Failed to upsert investor {}: {}", investor.id, e);
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to save investor".to_string(),
            message: e.to_string(),
            status_code: 500,
        });
    }

    if let Err(e) = state.cache.invalidate_directory().await {
        tracing::warn!("Failed to invalidate directory cache: {}", e);
    }

    tracing::info!("Saved investor {} ({})", investor.name, investor.id);

    HttpResponse::Ok().json(UpsertInvestorResponse {
        success: true,
        id: investor.id,
    })
}
