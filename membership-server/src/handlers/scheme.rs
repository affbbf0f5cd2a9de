//! Payers, plans, policies, categories and the benefit catalog

use super::SearchQuery;
use crate::error::{api_success, ApiResult};
use crate::server::MembershipServer;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use membership_service::{
    BenefitCatalog, Category, NewCatalogEntry, NewCategories, NewPayer, NewPayerBenefitMapping, NewPlan, NewPolicy,
    Payer, PayerBenefitMapping, PayerType, Plan, Policy, ServiceGroup,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct PayerFilter {
    #[serde(rename = "type")]
    pub payer_type: Option<PayerType>,
}

#[derive(Debug, Deserialize)]
pub struct CatalogFilter {
    pub group: ServiceGroup,
}

pub async fn add_payer(State(server): State<MembershipServer>, Json(request): Json<NewPayer>) -> ApiResult<Payer> {
    api_success(server.service.add_payer(request).await?)
}

pub async fn list_payers(
    State(server): State<MembershipServer>,
    Query(filter): Query<PayerFilter>,
) -> ApiResult<Vec<Payer>> {
    let payers = match filter.payer_type {
        Some(payer_type) => server.service.payers_by_type(payer_type).await?,
        None => server.service.list_payers().await?,
    };
    api_success(payers)
}

pub async fn get_payer(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Payer> {
    api_success(server.service.find_payer(id).await?)
}

pub async fn plans_by_payer(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Vec<Plan>> {
    api_success(server.service.plans_by_payer(id).await?)
}

pub async fn add_benefit_mapping(
    State(server): State<MembershipServer>,
    Json(request): Json<NewPayerBenefitMapping>,
) -> ApiResult<PayerBenefitMapping> {
    api_success(server.service.add_benefit_mapping(request).await?)
}

pub async fn benefit_mappings_of(
    State(server): State<MembershipServer>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<PayerBenefitMapping>> {
    api_success(server.service.benefit_mappings_of(id).await?)
}

/// `data` is null when the payer has no code for the benefit
pub async fn benefit_code(
    State(server): State<MembershipServer>,
    Path((payer_id, benefit_id)): Path<(i64, i64)>,
) -> ApiResult<Option<PayerBenefitMapping>> {
    api_success(server.service.benefit_code(payer_id, benefit_id).await?)
}

pub async fn add_plan(State(server): State<MembershipServer>, Json(request): Json<NewPlan>) -> ApiResult<Plan> {
    api_success(server.service.add_plan(request).await?)
}

pub async fn list_plans(State(server): State<MembershipServer>) -> ApiResult<Vec<Plan>> {
    api_success(server.service.list_plans().await?)
}

pub async fn get_plan(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Plan> {
    api_success(server.service.find_plan(id).await?)
}

pub async fn policies_by_plan(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Vec<Policy>> {
    api_success(server.service.policies_by_plan(id).await?)
}

pub async fn add_policy(State(server): State<MembershipServer>, Json(request): Json<NewPolicy>) -> ApiResult<Policy> {
    api_success(server.service.add_policy(request).await?)
}

pub async fn get_policy(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Policy> {
    api_success(server.service.find_policy(id).await?)
}

pub async fn categories_by_policy(
    State(server): State<MembershipServer>,
    Path(id): Path<i64>,
) -> ApiResult<Vec<Category>> {
    api_success(server.service.categories_by_policy(id).await?)
}

pub async fn add_categories(
    State(server): State<MembershipServer>,
    Json(request): Json<NewCategories>,
) -> ApiResult<Vec<Category>> {
    api_success(server.service.add_categories(request).await?)
}

pub async fn get_category(State(server): State<MembershipServer>, Path(id): Path<i64>) -> ApiResult<Category> {
    api_success(server.service.find_category(id).await?)
}

pub async fn add_catalog_entries(
    State(server): State<MembershipServer>,
    Json(entries): Json<Vec<NewCatalogEntry>>,
) -> ApiResult<Vec<BenefitCatalog>> {
    api_success(server.service.add_catalog_entries(entries).await?)
}

pub async fn catalog_by_group(
    State(server): State<MembershipServer>,
    Query(filter): Query<CatalogFilter>,
) -> ApiResult<Vec<BenefitCatalog>> {
    api_success(server.service.catalog_by_group(filter.group).await?)
}

pub async fn search_catalog(
    State(server): State<MembershipServer>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<BenefitCatalog>> {
    let term = query.term()?;
    api_success(server.service.search_catalog(&term).await?)
}
