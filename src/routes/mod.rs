// Route exports
pub mod billing;
pub mod investors;
pub mod matches;
pub mod submissions;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(submissions::configure)
            .configure(investors::configure)
            .configure(billing::configure),
    );
}
