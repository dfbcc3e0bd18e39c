use serde::{Deserialize, Serialize};

/// 分享动态上报请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareEventRequest {
    /// 被分享条目的标题（指南标题或榜单名）
    #[schema(example = "Essential Sci-Fi Classics")]
    pub item_title: String,
}

/// 分享动态上报响应
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareEventResponse {
    pub ok: bool,
    /// 该条目当前累计的分享次数（本实例内存计数）
    pub total_shares: u64,
}
