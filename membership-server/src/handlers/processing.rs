use crate::error::{api_success, api_success_with_msg, ApiResult};
use crate::server::MembershipServer;
use axum::{
    extract::{Path, State},
    Json,
};
use membership_service::{ChangeCategoryRequest, ChangeCategorySummary, ProcessingSummary, SuspensionRetrySummary};

/// Run the first or incremental benefit pass for a category
pub async fn process_category(
    State(server): State<MembershipServer>,
    Path(category_id): Path<i64>,
) -> ApiResult<ProcessingSummary> {
    let summary = server.service.process_category(category_id).await?;
    let msg = summary.message();
    api_success_with_msg(summary, msg)
}

pub async fn change_category(
    State(server): State<MembershipServer>,
    Json(request): Json<ChangeCategoryRequest>,
) -> ApiResult<ChangeCategorySummary> {
    api_success(server.service.change_category(request).await?)
}

pub async fn retry_suspensions(State(server): State<MembershipServer>) -> ApiResult<SuspensionRetrySummary> {
    api_success(server.service.retry_pending_suspensions().await?)
}
