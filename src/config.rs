use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3900,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: String,
    /// 日志格式
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "full".to_string(),
        }
    }
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API 路由前缀
    pub prefix: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: "/api/v1".to_string(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// 是否启用 CORS
    #[serde(default = "CorsConfig::default_enabled")]
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub allowed_headers: Vec<String>,
    /// 暴露的响应头列表（支持 "*" 表示任意）
    #[serde(default)]
    pub expose_headers: Vec<String>,
    /// 是否允许携带凭证（Cookie/Authorization）
    #[serde(default = "CorsConfig::default_allow_credentials")]
    pub allow_credentials: bool,
    /// 预检缓存时间（秒）
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl CorsConfig {
    fn default_enabled() -> bool {
        false
    }

    fn default_allow_credentials() -> bool {
        false
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            allowed_origins: Vec::new(),
            allowed_methods: Vec::new(),
            allowed_headers: Vec::new(),
            expose_headers: Vec::new(),
            allow_credentials: Self::default_allow_credentials(),
            max_age_secs: None,
        }
    }
}

/// 封面图片代理配置
///
/// 跨域封面必须经由改写 URL 的图片代理取回：代理以 CORS 许可头返回等价的
/// 图片字节，否则画布像素读取会把跨域图片当作受污染资源拒绝。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageProxyConfig {
    /// 是否启用代理（关闭后直接请求原始 URL，仅建议测试环境使用）
    #[serde(default = "ImageProxyConfig::default_enabled")]
    pub enabled: bool,
    /// 代理基地址
    #[serde(default = "ImageProxyConfig::default_base_url")]
    pub base_url: String,
    /// 原始 URL 挂载的查询参数名
    #[serde(default = "ImageProxyConfig::default_url_param")]
    pub url_param: String,
}

impl ImageProxyConfig {
    fn default_enabled() -> bool {
        true
    }
    fn default_base_url() -> String {
        "https://images.weserv.nl/".to_string()
    }
    fn default_url_param() -> String {
        "url".to_string()
    }
}

impl Default for ImageProxyConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            base_url: Self::default_base_url(),
            url_param: Self::default_url_param(),
        }
    }
}

/// 卡片渲染配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRenderConfig {
    /// 无衬线字体栈（gradient/modern 主题）
    #[serde(default = "CardRenderConfig::default_sans_font_stack")]
    pub sans_font_stack: String,
    /// 衬线字体栈（classic 主题）
    #[serde(default = "CardRenderConfig::default_serif_font_stack")]
    pub serif_font_stack: String,
    /// 是否优先速度渲染（OptimizeSpeed），提升栅格化性能，可能略降画质
    #[serde(default)]
    pub optimize_speed: bool,
    /// 是否启用卡片图片缓存
    #[serde(default = "CardRenderConfig::default_cache_enabled")]
    pub cache_enabled: bool,
    /// 缓存最大容量（字节），按图片字节大小加权
    #[serde(default = "CardRenderConfig::default_cache_max_bytes")]
    pub cache_max_bytes: u64,
    /// 缓存 TTL（秒）
    #[serde(default = "CardRenderConfig::default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// 缓存 TTI（秒）
    #[serde(default = "CardRenderConfig::default_cache_tti")]
    pub cache_tti_secs: u64,
    /// 并发渲染许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 封面取回的墙钟超时（毫秒），超时后降级为纯文字卡片
    #[serde(default = "CardRenderConfig::default_cover_fetch_timeout_ms")]
    pub cover_fetch_timeout_ms: u64,
}

impl CardRenderConfig {
    fn default_sans_font_stack() -> String {
        "Noto Sans, Liberation Sans, DejaVu Sans, sans-serif".to_string()
    }
    fn default_serif_font_stack() -> String {
        "Noto Serif, Liberation Serif, DejaVu Serif, serif".to_string()
    }
    fn default_cache_enabled() -> bool {
        true
    }
    fn default_cache_max_bytes() -> u64 {
        100 * 1024 * 1024
    }
    fn default_cache_ttl() -> u64 {
        60
    }
    fn default_cache_tti() -> u64 {
        30
    }
    fn default_cover_fetch_timeout_ms() -> u64 {
        10_000
    }

    /// 封面取回超时
    pub fn cover_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.cover_fetch_timeout_ms)
    }
}

impl Default for CardRenderConfig {
    fn default() -> Self {
        Self {
            sans_font_stack: Self::default_sans_font_stack(),
            serif_font_stack: Self::default_serif_font_stack(),
            optimize_speed: false,
            cache_enabled: Self::default_cache_enabled(),
            cache_max_bytes: Self::default_cache_max_bytes(),
            cache_ttl_secs: Self::default_cache_ttl(),
            cache_tti_secs: Self::default_cache_tti(),
            max_parallel: 0,
            cover_fetch_timeout_ms: Self::default_cover_fetch_timeout_ms(),
        }
    }
}

/// 分享动态上报配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ActivityConfig {
    /// 上游动态日志端点（留空则仅本地计数）
    #[serde(default)]
    pub upstream_url: Option<String>,
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 优雅退出超时（秒）
    #[serde(default = "ShutdownConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout_secs() -> u64 {
        30
    }

    /// 优雅退出超时时长
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout_secs(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub api: ApiConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 封面图片代理配置
    #[serde(default)]
    pub image_proxy: ImageProxyConfig,
    /// 卡片渲染配置
    #[serde(default)]
    pub card_render: CardRenderConfig,
    /// 分享动态上报配置
    #[serde(default)]
    pub activity: ActivityConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 从配置文件加载配置，支持环境变量覆盖
    ///
    /// 配置文件允许缺失：所有段均有默认值，便于零配置启动与测试。
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件", config_path);

        let builder = ConfigBuilder::builder()
            // 加载配置文件（允许缺失）
            .add_source(File::with_name(config_path.to_str().unwrap()).required(false))
            // 支持环境变量覆盖，例如：APP_API_PREFIX
            .add_source(
                Environment::with_prefix("APP")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        builder.try_deserialize()
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<(), ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;

    #[test]
    fn default_config_has_sane_card_render_values() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.card_render.cover_fetch_timeout_ms, 10_000);
        assert!(cfg.card_render.cache_enabled);
        assert!(cfg.image_proxy.enabled);
        assert_eq!(cfg.api.prefix, "/api/v1");
    }
}
