use std::time::Duration;

use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};
use reqwest::Client;

use super::cover::fetch_cover;
use super::renderer::{
    RenderOptions, build_guide_card_svg, build_ranking_card_svg, render_svg_to_png,
};
use super::types::{CardTheme, GuideSummary};
use crate::config::{AppConfig, ImageProxyConfig};
use crate::error::AppError;

/// 卡片渲染上下文：从配置解析一次，随后显式传递
#[derive(Debug, Clone)]
pub struct CardContext {
    /// 渲染选项（字体栈、速度/质量取舍）
    pub options: RenderOptions,
    /// 封面代理配置
    pub proxy: ImageProxyConfig,
    /// 封面取回的墙钟上限
    pub cover_deadline: Duration,
}

impl Default for CardContext {
    fn default() -> Self {
        Self {
            options: RenderOptions::default(),
            proxy: ImageProxyConfig::default(),
            cover_deadline: Duration::from_millis(10_000),
        }
    }
}

impl CardContext {
    /// 从应用配置构建
    pub fn from_config(cfg: &AppConfig) -> Self {
        Self {
            options: RenderOptions::from_config(&cfg.card_render),
            proxy: cfg.image_proxy.clone(),
            cover_deadline: cfg.card_render.cover_fetch_timeout(),
        }
    }
}

/// 渲染单指南分享卡片为 PNG 字节
///
/// 封面取回（如有）在异步侧完成；SVG 生成与栅格化是 CPU 密集操作，
/// 必须移出 tokio worker（spawn_blocking）。
pub async fn render_guide_card_png(
    ctx: &CardContext,
    client: &Client,
    guide: &GuideSummary,
    theme: CardTheme,
    cover_url: Option<&str>,
) -> Result<Vec<u8>, AppError> {
    let cover = match cover_url {
        Some(url) if !url.is_empty() => {
            fetch_cover(client, &ctx.proxy, url, ctx.cover_deadline).await
        }
        _ => None,
    };

    let options = ctx.options.clone();
    let guide = guide.clone();
    tokio::task::spawn_blocking(move || {
        let svg = build_guide_card_svg(&options, &guide, theme, cover.as_ref())?;
        render_svg_to_png(&options, &svg)
    })
    .await
    .map_err(|e| AppError::Internal(format!("阻塞渲染任务执行失败: {e}")))?
}

/// 渲染 Top5 排行卡片为 PNG 字节
pub async fn render_ranking_card_png(
    ctx: &CardContext,
    guides: &[GuideSummary],
    theme: CardTheme,
) -> Result<Vec<u8>, AppError> {
    let options = ctx.options.clone();
    let guides = guides.to_vec();
    tokio::task::spawn_blocking(move || {
        let svg = build_ranking_card_svg(&options, &guides, theme)?;
        render_svg_to_png(&options, &svg)
    })
    .await
    .map_err(|e| AppError::Internal(format!("阻塞渲染任务执行失败: {e}")))?
}

/// 将 PNG 字节包装为 data URI 字符串
pub fn png_data_uri(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", base64_engine.encode(png))
}

/// 生成单指南分享卡片，返回 `data:image/png;base64,...` 字符串。
///
/// 正常情况下恰好结算一次：封面侧的全部失败（网络错误、解码失败、超时）都
/// 降级为纯文字渲染；唯一向上传播的错误是栅格表面/SVG 树创建失败。
pub async fn generate_share_card(
    ctx: &CardContext,
    client: &Client,
    guide: &GuideSummary,
    theme: CardTheme,
    cover_url: Option<&str>,
) -> Result<String, AppError> {
    let png = render_guide_card_png(ctx, client, guide, theme, cover_url).await?;
    Ok(png_data_uri(&png))
}

/// 生成 Top5 排行卡片，返回 `data:image/png;base64,...` 字符串。
pub async fn generate_ranking_card(
    ctx: &CardContext,
    guides: &[GuideSummary],
    theme: CardTheme,
) -> Result<String, AppError> {
    let png = render_ranking_card_png(ctx, guides, theme).await?;
    Ok(png_data_uri(&png))
}

#[cfg(test)]
mod tests {
    use super::png_data_uri;

    #[test]
    fn data_uri_has_png_prefix() {
        let uri = png_data_uri(&[0x89, b'P', b'N', b'G']);
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
