use axum::body::Bytes;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::activity::ActivityRecorder;
use crate::features::cards::CardContext;
use crate::http;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 卡片渲染上下文（字体栈、代理、封面超时）
    pub cards: Arc<CardContext>,
    /// 控制并发渲染的信号量（限制 CPU 密集型任务数量）
    pub render_semaphore: Arc<Semaphore>,
    /// 渲染结果缓存（按图片字节大小加权）
    pub card_image_cache: Cache<String, Bytes>,
    /// 是否启用渲染结果缓存
    pub card_cache_enabled: bool,
    /// 分享动态记录器
    pub activity: Arc<ActivityRecorder>,
}

impl AppState {
    /// 从应用配置构建共享状态
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let img = &config.card_render;
        let card_image_cache: Cache<String, Bytes> = Cache::builder()
            .weigher(|_k, v: &Bytes| v.len() as u32)
            .max_capacity(img.cache_max_bytes)
            .time_to_live(Duration::from_secs(img.cache_ttl_secs))
            .time_to_idle(Duration::from_secs(img.cache_tti_secs))
            .build();

        let activity_client = http::client_timeout_10s()
            .map_err(AppError::from)?
            .clone();

        Ok(Self {
            cards: Arc::new(CardContext::from_config(config)),
            render_semaphore: Arc::new(Semaphore::new({
                let m = img.max_parallel as usize;
                if m == 0 { num_cpus::get() } else { m }
            })),
            card_image_cache,
            card_cache_enabled: img.cache_enabled,
            activity: Arc::new(ActivityRecorder::new(
                config.activity.upstream_url.clone(),
                activity_client,
            )),
        })
    }
}
