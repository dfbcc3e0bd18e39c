use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use image::GenericImageView;
use lru::LruCache;
use reqwest::Client;

use crate::config::ImageProxyConfig;
use crate::error::AppError;

/// 封面字节缓存条数（按 URL 记忆，主题快速切换时避免重复取回）
const COVER_CACHE_SIZE: usize = 32;

/// 取回并解码完成的封面图
#[derive(Debug, Clone)]
pub struct CoverImage {
    /// 原始编码字节（原样内嵌进 SVG）
    pub data: Vec<u8>,
    /// 嗅探得到的 MIME 类型
    pub mime: &'static str,
    /// 固有宽度（像素）
    pub width: u32,
    /// 固有高度（像素）
    pub height: u32,
}

static COVER_CACHE: OnceLock<Mutex<LruCache<String, CoverImage>>> = OnceLock::new();

fn get_cover_cache() -> &'static Mutex<LruCache<String, CoverImage>> {
    COVER_CACHE
        .get_or_init(|| Mutex::new(LruCache::new(NonZeroUsize::new(COVER_CACHE_SIZE).unwrap())))
}

/// 构造实际取回地址：启用代理时把原始 URL 挂到代理的查询参数上
pub fn proxied_url(proxy: &ImageProxyConfig, cover_url: &str) -> Result<String, AppError> {
    if !proxy.enabled {
        return Ok(cover_url.to_string());
    }
    let url =
        reqwest::Url::parse_with_params(&proxy.base_url, &[(proxy.url_param.as_str(), cover_url)])
            .map_err(|e| AppError::Validation(format!("无效的图片代理地址: {e}")))?;
    Ok(url.into())
}

fn mime_for_format(format: image::ImageFormat) -> Option<&'static str> {
    match format {
        image::ImageFormat::Png => Some("image/png"),
        image::ImageFormat::Jpeg => Some("image/jpeg"),
        image::ImageFormat::WebP => Some("image/webp"),
        image::ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}

/// 下载并解码封面：校验字节可解码，同时获得布局所需的固有尺寸
async fn fetch_and_decode(client: &Client, target: &str) -> Result<CoverImage, AppError> {
    let resp = client.get(target).send().await?.error_for_status()?;
    let bytes = resp.bytes().await?;

    let format = image::guess_format(&bytes)
        .map_err(|e| AppError::Validation(format!("无法识别封面图片格式: {e}")))?;
    let mime = mime_for_format(format)
        .ok_or_else(|| AppError::Validation(format!("不支持的封面图片格式: {format:?}")))?;

    let decoded = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| AppError::Validation(format!("封面图片解码失败: {e}")))?;
    let (width, height) = decoded.dimensions();

    Ok(CoverImage {
        data: bytes.to_vec(),
        mime,
        width,
        height,
    })
}

/// 在墙钟上限内取回封面，所有失败路径均降级为 `None`（纯文字布局）。
///
/// 取回+解码与一次性定时器用 `select!` 竞速：先完成者即最终结果，至多结算一次
/// 由结构保证（非分支在返回时整体丢弃），无需手工 settled 标志。
pub async fn fetch_cover(
    client: &Client,
    proxy: &ImageProxyConfig,
    cover_url: &str,
    deadline: Duration,
) -> Option<CoverImage> {
    if let Ok(mut cache) = get_cover_cache().lock()
        && let Some(cached) = cache.get(cover_url)
    {
        return Some(cached.clone());
    }

    let target = match proxied_url(proxy, cover_url) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!("封面地址构造失败，降级为纯文字卡片: {e}");
            return None;
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(deadline) => {
            tracing::warn!(
                "封面取回超过 {}ms 未完成，降级为纯文字卡片: {cover_url}",
                deadline.as_millis()
            );
            None
        }
        fetched = fetch_and_decode(client, &target) => match fetched {
            Ok(cover) => {
                if let Ok(mut cache) = get_cover_cache().lock() {
                    cache.put(cover_url.to_string(), cover.clone());
                }
                Some(cover)
            }
            Err(e) => {
                tracing::warn!("封面取回失败，降级为纯文字卡片: {e}");
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::proxied_url;
    use crate::config::ImageProxyConfig;

    #[test]
    fn proxied_url_percent_encodes_original() {
        let proxy = ImageProxyConfig::default();
        let out =
            proxied_url(&proxy, "https://covers.example.com/a b.png?x=1&y=2").expect("proxied");
        assert!(out.starts_with("https://images.weserv.nl/?url="));
        // 原始 URL 的保留字符必须被编码，避免破坏代理的查询串
        assert!(!out.contains("a b.png"));
        assert!(out.contains("url=https"));
    }

    #[test]
    fn disabled_proxy_passes_url_through() {
        let proxy = ImageProxyConfig {
            enabled: false,
            ..ImageProxyConfig::default()
        };
        let raw = "http://127.0.0.1:9/direct.png";
        assert_eq!(proxied_url(&proxy, raw).expect("direct"), raw);
    }
}
