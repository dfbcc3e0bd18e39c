use axum::{Json, Router, extract::State, routing::post};

use super::models::{ShareEventRequest, ShareEventResponse};
use crate::{error::AppError, state::AppState};

/// 创建分享动态路由
pub fn create_activity_router() -> Router<AppState> {
    Router::new().route("/activity/share", post(record_share))
}

#[utoipa::path(
    post,
    path = "/activity/share",
    summary = "记录一次分享动态",
    description = "乐观递增该条目的分享计数；配置了上游日志端点时转发事件，失败则回滚计数并返回错误。",
    request_body = ShareEventRequest,
    responses(
        (status = 200, description = "分享已记录", body = ShareEventResponse),
        (status = 502, description = "上游动态日志失败（计数已回滚）", body = crate::error::ProblemDetails)
    ),
    tag = "Activity"
)]
pub async fn record_share(
    State(state): State<AppState>,
    Json(req): Json<ShareEventRequest>,
) -> Result<Json<ShareEventResponse>, AppError> {
    let title = req.item_title.trim();
    if title.is_empty() {
        return Err(AppError::Validation("itemTitle 不能为空".to_string()));
    }

    let total_shares = state.activity.record_share(title).await?;
    Ok(Json(ShareEventResponse {
        ok: true,
        total_shares,
    }))
}
