use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// 应用统一错误类型
#[derive(Error, Debug, utoipa::ToSchema)]
pub enum AppError {
    /// 网络请求错误
    #[error("网络错误: {0}")]
    Network(String),
    /// 上游请求超时（包含 connect/read 等阶段）
    #[error("请求超时: {0}")]
    Timeout(String),

    /// JSON 解析错误
    #[error("JSON 解析错误: {0}")]
    Json(String),

    /// 参数校验错误
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 卡片渲染错误（SVG 解析 / 栅格表面创建 / PNG 编码失败）
    #[error("卡片渲染错误: {0}")]
    CardRender(String),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
///
/// 设计目标：
/// - 让所有 API 错误返回结构化 JSON，便于 SDK/调用方稳定处理
/// - 与 OpenAPI 一致（content-type = application/problem+json）
/// - 允许在不破坏主结构的前提下扩展字段（如 requestId）
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI）。若无更细分的类型，可使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Validation Failed")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 422)]
    pub status: u16,

    /// 人类可读的详细信息（尽量稳定，不建议依赖解析）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "VALIDATION_FAILED")]
    pub code: String,

    /// 可选：请求追踪 ID（由 request-id 中间件回填）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Network(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CardRender(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn stable_code(&self) -> &'static str {
        match self {
            AppError::Network(_) => "UPSTREAM_ERROR",
            AppError::Timeout(_) => "UPSTREAM_TIMEOUT",
            AppError::Json(_) => "BAD_REQUEST",
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::CardRender(_) => "CARD_RENDER_FAILED",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNPROCESSABLE_ENTITY => "Validation Failed",
            StatusCode::BAD_GATEWAY => "Bad Gateway",
            StatusCode::GATEWAY_TIMEOUT => "Gateway Timeout",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}

// =============== Error conversions for common external errors ===============

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Timeout(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err.to_string())
    }
}
