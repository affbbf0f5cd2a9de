use crate::error::{api_success, ApiResult};
use crate::server::MembershipServer;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use membership_service::{Benefit, BenefitPayer, NewBenefit};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct BenefitFilter {
    /// Only benefits without a parent
    #[serde(default)]
    pub main: bool,
}

#[derive(Debug, Deserialize)]
pub struct BenefitIds {
    pub benefit_ids: Vec<i64>,
}

pub async fn add_benefit(State(server): State<MembershipServer>, Json(request): Json<NewBenefit>) -> ApiResult<Benefit> {
    api_success(server.service.add_benefit(request).await?)
}

pub async fn benefits_by_category(
    State(server): State<MembershipServer>,
    Path(category_id): Path<i64>,
    Query(filter): Query<BenefitFilter>,
) -> ApiResult<Vec<Benefit>> {
    let benefits = if filter.main {
        server.service.main_benefits_by_category(category_id).await?
    } else {
        server.service.benefits_by_category(category_id).await?
    };
    api_success(benefits)
}

pub async fn payers_of_benefits(
    State(server): State<MembershipServer>,
    Json(request): Json<BenefitIds>,
) -> ApiResult<Vec<BenefitPayer>> {
    api_success(server.service.payers_of_benefits(&request.benefit_ids).await?)
}
