use super::SearchQuery;
use crate::error::{api_success, api_success_with_msg, ApiResult};
use crate::server::MembershipServer;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use membership_service::{Beneficiary, MemberEntitlements, MemberUpdate, NewBeneficiary};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
pub struct BeneficiaryFilter {
    #[serde(default)]
    pub principals: bool,
}

pub async fn add_beneficiary(
    State(server): State<MembershipServer>,
    Json(request): Json<NewBeneficiary>,
) -> ApiResult<Beneficiary> {
    api_success(server.service.add_beneficiary(request).await?)
}

pub async fn beneficiaries_by_category(
    State(server): State<MembershipServer>,
    Path(category_id): Path<i64>,
    Query(filter): Query<BeneficiaryFilter>,
) -> ApiResult<Vec<Beneficiary>> {
    let members = if filter.principals {
        server.service.principals_by_category(category_id).await?
    } else {
        server.service.beneficiaries_by_category(category_id).await?
    };
    api_success(members)
}

pub async fn get_beneficiary(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Beneficiary> {
    api_success(server.service.find_beneficiary(id).await?)
}

pub async fn update_member(
    State(server): State<MembershipServer>,
    Path(id): Path<i64>,
    Json(update): Json<MemberUpdate>,
) -> ApiResult<Beneficiary> {
    api_success(server.service.update_member(id, update).await?)
}

pub async fn family_of(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Vec<Beneficiary>> {
    api_success(server.service.family_of(id).await?)
}

pub async fn entitlements_of(
    State(server): State<MembershipServer>,
    Path(id): Path<i64>,
) -> ApiResult<MemberEntitlements> {
    api_success(server.service.entitlements_of(id).await?)
}

pub async fn activate_member(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Beneficiary> {
    let member = server.service.activate_member(id).await?;
    api_success_with_msg(member, "Member activated")
}

pub async fn deactivate_member(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Beneficiary> {
    let member = server.service.deactivate_member(id).await?;
    api_success_with_msg(member, "Member deactivated")
}

pub async fn search_members(
    State(server): State<MembershipServer>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<Beneficiary>> {
    let term = query.term()?;
    api_success(server.service.search_members(&term).await?)
}
