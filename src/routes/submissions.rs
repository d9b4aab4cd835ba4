use actix_web::{web, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::core::stage_for_amount;
use crate::models::{
    ErrorResponse, MatchQueryResponse, Submission, SubmissionResponse, SubmitRequest,
};
use crate::routes::matches::{load_directory, AppState};
use crate::services::CacheKey;

/// Configure submission routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/submissions", web::post().to(create_submission))
        .route(
            "/submissions/{id}/matches",
            web::get().to(submission_matches),
        );
}

/// Record a funding submission
///
/// POST /api/v1/submissions
///
/// The investment stage is derived from the funding amount; a custom category
/// replaces "Other" when one is supplied.
async fn create_submission(
    state: web::Data<AppState>,
    req: web::Json<SubmitRequest>,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for submission: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let investment_stage = stage_for_amount(req.funding_required);

    let submission = Submission {
        id: Uuid::new_v4(),
        company_name: req.company_name.clone(),
        company_type: req.company_type,
        category: req.resolved_category(),
        funding_required: req.funding_required,
        investment_stage,
        business_description: req.business_description.clone(),
        country: req.country.clone(),
        state: req.state.clone(),
        city: req.city.clone(),
        email: req.email.clone(),
        matches_sent: false,
        created_at: chrono::Utc::now(),
    };

    if let Err(e) = state.postgres.insert_submission(&submission).await {
        tracing::error!("Failed to store submission: {}", e);
        return HttpResponse::InternalServerError().json(ErrorResponse {
            error: "Failed to store submission".to_string(),
            message: e.to_string(),
            status_code: 500,
        });
    }

    tracing::info!(
        "Stored submission {} ({}, {})",
        submission.id,
        submission.company_name,
        submission.investment_stage.as_str()
    );

    HttpResponse::Ok().json(SubmissionResponse {
        id: submission.id,
        investment_stage,
    })
}

/// Ranked matches for a stored submission
///
/// GET /api/v1/submissions/{id}/matches
///
/// Results are cached per submission until the investor directory changes.
async fn submission_matches(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> impl Responder {
    let submission_id = path.into_inner();

    let submission = match state.postgres.get_submission(submission_id).await {
        Ok(Some(submission)) => submission,
        Ok(None) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: "Submission not found".to_string(),
                message: format!("No submission with id {}", submission_id),
                status_code: 404,
            });
        }
        Err(e) => {
            tracing::error!("Failed to load submission {}: {}", submission_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load submission".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let cache_key = CacheKey::submission_matches(submission_id);
    if let Ok(cached) = state.cache.get::<MatchQueryResponse>(&cache_key).await {
        tracing::debug!("Serving cached matches for submission {}", submission_id);
        return HttpResponse::Ok().json(cached);
    }

    let investors = match load_directory(&state).await {
        Ok(investors) => investors,
        Err(e) => {
            tracing::error!("Failed to load investor directory: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load investor directory".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let request = submission.funding_request();
    let result = state.matcher.rank(&request, investors);

    let response = MatchQueryResponse {
        matches: result.matches,
        total_candidates: result.total_candidates,
    };

    if let Err(e) = state.cache.set(&cache_key, &response).await {
        tracing::warn!("Failed to cache matches for {}: {}", submission_id, e);
    }

    tracing::info!(
        "Returning {} qualifying matches for submission {}",
        response.matches.len(),
        submission_id
    );

    HttpResponse::Ok().json(response)
}
