use crate::{
    handlers::{beneficiaries, benefits, health, processing, scheme},
    server::MembershipServer,
};
use axum::{
    routing::{get, post},
    Router,
};

pub const API_V1_MEMBERSHIP: &str = "/api/v1/membership";

pub fn health_routes() -> Router<MembershipServer> {
    Router::new().route("/health", get(health::health_check))
}

pub fn scheme_routes() -> Router<MembershipServer> {
    Router::new()
        .route("/payers", get(scheme::list_payers).post(scheme::add_payer))
        .route("/payers/:id", get(scheme::get_payer))
        .route("/payers/:id/plans", get(scheme::plans_by_payer))
        .route("/payers/:id/mappings", get(scheme::benefit_mappings_of))
        .route("/payers/:id/benefits/:benefit_id/code", get(scheme::benefit_code))
        .route("/payers/mappings", post(scheme::add_benefit_mapping))
        .route("/plans", get(scheme::list_plans).post(scheme::add_plan))
        .route("/plans/:id", get(scheme::get_plan))
        .route("/plans/:id/policies", get(scheme::policies_by_plan))
        .route("/policies", post(scheme::add_policy))
        .route("/policies/:id", get(scheme::get_policy))
        .route("/policies/:id/categories", get(scheme::categories_by_policy))
        .route("/categories", post(scheme::add_categories))
        .route("/categories/:id", get(scheme::get_category))
        .route("/catalog", get(scheme::catalog_by_group).post(scheme::add_catalog_entries))
        .route("/catalog/search", get(scheme::search_catalog))
}

pub fn member_routes() -> Router<MembershipServer> {
    Router::new()
        .route("/benefits", post(benefits::add_benefit))
        .route("/benefits/payers", post(benefits::payers_of_benefits))
        .route("/categories/:id/benefits", get(benefits::benefits_by_category))
        .route("/beneficiaries", post(beneficiaries::add_beneficiary))
        .route("/beneficiaries/search", get(beneficiaries::search_members))
        .route("/categories/:id/beneficiaries", get(beneficiaries::beneficiaries_by_category))
        .route(
            "/beneficiaries/:id",
            get(beneficiaries::get_beneficiary).put(beneficiaries::update_member),
        )
        .route("/beneficiaries/:id/family", get(beneficiaries::family_of))
        .route("/beneficiaries/:id/entitlements", get(beneficiaries::entitlements_of))
        .route("/beneficiaries/:id/activate", post(beneficiaries::activate_member))
        .route("/beneficiaries/:id/deactivate", post(beneficiaries::deactivate_member))
}

pub fn processing_routes() -> Router<MembershipServer> {
    Router::new()
        .route("/category/:id/process", post(processing::process_category))
        .route("/category/change", post(processing::change_category))
        .route("/suspensions/retry", post(processing::retry_suspensions))
}

pub fn create_routes() -> Router<MembershipServer> {
    Router::new().merge(health_routes()).nest(
        API_V1_MEMBERSHIP,
        Router::new()
            .merge(scheme_routes())
            .merge(member_routes())
            .merge(processing_routes()),
    )
}
