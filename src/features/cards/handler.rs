use axum::body::Bytes;
use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::cover::fetch_cover;
use super::renderer::{build_guide_card_svg, build_ranking_card_svg};
use super::service;
use super::types::{RenderGuideCardRequest, RenderRankingCardRequest};
use crate::{error::AppError, http, state::AppState};

/// 卡片输出选项（通过 Query 传入，避免破坏 JSON 请求体）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardQueryOpts {
    /// 输出格式：png、svg 或 datauri（默认 png）
    #[serde(default)]
    format: Option<String>,
}

fn format_code(q: &CardQueryOpts) -> &'static str {
    match q.format.as_deref() {
        Some(fmt) if fmt.eq_ignore_ascii_case("svg") => "svg",
        Some(fmt) if fmt.eq_ignore_ascii_case("datauri") => "datauri",
        _ => "png",
    }
}

fn content_type_from_fmt_code(code: &str) -> &'static str {
    match code {
        "svg" => "image/svg+xml; charset=utf-8",
        "datauri" => "text/plain; charset=utf-8",
        _ => "image/png",
    }
}

/// 缓存键：请求体规范化字节的 SHA-256 前缀 + 输出格式
fn cache_key(scope: &str, payload: &[u8], fmt_code: &str) -> String {
    let digest = Sha256::digest(payload);
    format!("{scope}:{}:{fmt_code}", hex::encode(&digest[..16]))
}

fn image_headers(fmt_code: &str) -> axum::http::HeaderMap {
    let mut headers = axum::http::HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_from_fmt_code(fmt_code)),
    );
    headers
}

/// 创建卡片渲染路由
pub fn create_card_router() -> Router<AppState> {
    Router::new()
        .route("/cards/guide", post(render_guide_card))
        .route("/cards/ranking", post(render_ranking_card))
}

#[utoipa::path(
    post,
    path = "/cards/guide",
    summary = "生成单指南分享卡片",
    description = "根据指南数据与主题渲染 1200x630 分享卡片。可选封面 URL 经图片代理取回，失败或超时则降级为纯文字布局。",
    request_body = RenderGuideCardRequest,
    params(
        ("format" = Option<String>, Query, description = "输出格式：png|svg|datauri，默认 png")
    ),
    responses(
        (status = 200, description = "PNG bytes / SVG document / data URI text"),
        (status = 422, description = "Validation or render failure", body = crate::error::ProblemDetails)
    ),
    tag = "Cards"
)]
pub async fn render_guide_card(
    State(state): State<AppState>,
    Query(q): Query<CardQueryOpts>,
    Json(req): Json<RenderGuideCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fmt_code = format_code(&q);
    let key = cache_key("guide", &serde_json::to_vec(&req)?, fmt_code);

    if state.card_cache_enabled
        && let Some(cached) = state.card_image_cache.get(&key).await
    {
        tracing::debug!("指南卡片缓存命中: {key}");
        return Ok((StatusCode::OK, image_headers(fmt_code), cached));
    }

    let client = http::client_default().map_err(AppError::from)?;
    let ctx = state.cards.clone();

    // 渲染是 CPU 密集操作，经信号量限流
    let _permit = state
        .render_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(format!("获取渲染信号量失败: {e}")))?;

    let bytes = match fmt_code {
        "svg" => {
            let cover = match req.cover_url.as_deref() {
                Some(url) if !url.is_empty() => {
                    fetch_cover(client, &ctx.proxy, url, ctx.cover_deadline).await
                }
                _ => None,
            };
            let svg = build_guide_card_svg(&ctx.options, &req.guide, req.theme, cover.as_ref())?;
            Bytes::from(svg.into_bytes())
        }
        "datauri" => {
            let uri = service::generate_share_card(
                &ctx,
                client,
                &req.guide,
                req.theme,
                req.cover_url.as_deref(),
            )
            .await?;
            Bytes::from(uri.into_bytes())
        }
        _ => {
            let png = service::render_guide_card_png(
                &ctx,
                client,
                &req.guide,
                req.theme,
                req.cover_url.as_deref(),
            )
            .await?;
            Bytes::from(png)
        }
    };

    if state.card_cache_enabled {
        state.card_image_cache.insert(key, bytes.clone()).await;
    }

    Ok((StatusCode::OK, image_headers(fmt_code), bytes))
}

#[utoipa::path(
    post,
    path = "/cards/ranking",
    summary = "生成 Top5 排行分享卡片",
    description = "渲染公开指南点赞榜前 5 名的分享卡片（金银铜奖牌 + 点赞数）。输入需按点赞数降序预排序。",
    request_body = RenderRankingCardRequest,
    params(
        ("format" = Option<String>, Query, description = "输出格式：png|svg|datauri，默认 png")
    ),
    responses(
        (status = 200, description = "PNG bytes / SVG document / data URI text"),
        (status = 422, description = "Validation or render failure", body = crate::error::ProblemDetails)
    ),
    tag = "Cards"
)]
pub async fn render_ranking_card(
    State(state): State<AppState>,
    Query(q): Query<CardQueryOpts>,
    Json(req): Json<RenderRankingCardRequest>,
) -> Result<impl IntoResponse, AppError> {
    let fmt_code = format_code(&q);
    let key = cache_key("ranking", &serde_json::to_vec(&req)?, fmt_code);

    if state.card_cache_enabled
        && let Some(cached) = state.card_image_cache.get(&key).await
    {
        tracing::debug!("排行卡片缓存命中: {key}");
        return Ok((StatusCode::OK, image_headers(fmt_code), cached));
    }

    let ctx = state.cards.clone();

    let _permit = state
        .render_semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| AppError::Internal(format!("获取渲染信号量失败: {e}")))?;

    let bytes = match fmt_code {
        "svg" => {
            let svg = build_ranking_card_svg(&ctx.options, &req.guides, req.theme)?;
            Bytes::from(svg.into_bytes())
        }
        "datauri" => {
            let uri = service::generate_ranking_card(&ctx, &req.guides, req.theme).await?;
            Bytes::from(uri.into_bytes())
        }
        _ => {
            let png = service::render_ranking_card_png(&ctx, &req.guides, req.theme).await?;
            Bytes::from(png)
        }
    };

    if state.card_cache_enabled {
        state.card_image_cache.insert(key, bytes.clone()).await;
    }

    Ok((StatusCode::OK, image_headers(fmt_code), bytes))
}

#[cfg(test)]
mod tests {
    use super::{CardQueryOpts, cache_key, content_type_from_fmt_code, format_code};

    #[test]
    fn format_code_defaults_to_png() {
        assert_eq!(format_code(&CardQueryOpts::default()), "png");
        let q = CardQueryOpts {
            format: Some("SVG".to_string()),
        };
        assert_eq!(format_code(&q), "svg");
        let q = CardQueryOpts {
            format: Some("datauri".to_string()),
        };
        assert_eq!(format_code(&q), "datauri");
        assert_eq!(content_type_from_fmt_code("png"), "image/png");
        assert_eq!(
            content_type_from_fmt_code("svg"),
            "image/svg+xml; charset=utf-8"
        );
    }

    #[test]
    fn cache_key_separates_scope_and_format() {
        let payload = br#"{"guide":{}}"#;
        let a = cache_key("guide", payload, "png");
        let b = cache_key("guide", payload, "svg");
        let c = cache_key("ranking", payload, "png");
        assert_ne!(a, b);
        assert_ne!(a, c);
        // 相同输入键稳定
        assert_eq!(a, cache_key("guide", payload, "png"));
    }
}
