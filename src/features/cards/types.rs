use serde::{Deserialize, Serialize};

/// 卡片主题
///
/// 未识别的主题标识在反序列化阶段即被拒绝（参数校验错误），不会进入渲染。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum CardTheme {
    /// 浅紫对角渐变背景
    #[serde(alias = "GRADIENT")]
    Gradient,
    /// 近黑底色（默认）
    #[serde(alias = "MODERN")]
    #[default]
    Modern,
    /// 白底衬线
    #[serde(alias = "CLASSIC")]
    Classic,
}

/// 阅读指南摘要（由上游数据层提供，渲染侧只读）
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GuideSummary {
    /// 指南标题
    #[schema(example = "Essential Sci-Fi Classics")]
    pub title: String,
    /// 指南简介
    pub description: String,
    /// 作者用户名（渲染为 "by @{authorUsername}"）
    #[schema(example = "scifi_reader")]
    pub author_username: String,
    /// 点赞数
    #[serde(default)]
    pub likes: u32,
    /// 标签（卡片本身不渲染，随上游记录携带）
    #[serde(default)]
    pub tags: Vec<String>,
}

/// 单指南分享卡片渲染请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderGuideCardRequest {
    /// 指南数据
    pub guide: GuideSummary,
    /// 渲染主题：gradient/modern/classic（默认 modern）
    #[serde(default)]
    pub theme: CardTheme,
    /// 可选封面图 URL（缺失或取回失败时降级为纯文字布局）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
}

/// Top5 排行卡片渲染请求
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderRankingCardRequest {
    /// 指南列表（调用方需按点赞数降序预排序，渲染侧不排序，只取前 5 条）
    pub guides: Vec<GuideSummary>,
    /// 渲染主题：gradient/modern/classic（默认 modern）
    #[serde(default)]
    pub theme: CardTheme,
}

#[cfg(test)]
mod tests {
    use super::{CardTheme, RenderGuideCardRequest};

    #[test]
    fn theme_deserializes_lowercase_and_alias() {
        let t: CardTheme = serde_json::from_str("\"classic\"").expect("parse");
        assert_eq!(t, CardTheme::Classic);
        let t: CardTheme = serde_json::from_str("\"MODERN\"").expect("parse alias");
        assert_eq!(t, CardTheme::Modern);
    }

    #[test]
    fn unknown_theme_is_rejected() {
        let r: Result<CardTheme, _> = serde_json::from_str("\"vaporwave\"");
        assert!(r.is_err());
    }

    #[test]
    fn guide_request_defaults_theme_to_modern() {
        let req: RenderGuideCardRequest = serde_json::from_str(
            r#"{"guide":{"title":"t","description":"d","authorUsername":"a"}}"#,
        )
        .expect("parse");
        assert_eq!(req.theme, CardTheme::Modern);
        assert!(req.cover_url.is_none());
        assert_eq!(req.guide.likes, 0);
    }
}
