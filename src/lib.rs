/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 启动检查模块
pub mod startup;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出管理模块
pub mod shutdown;

/// 宿主环境探测模块
pub mod host;

/// CORS 中间件构建模块
pub mod cors;

/// 请求追踪 ID 中间件模块
pub mod request_id;

/// HTTP Client 复用工具
pub mod http;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::AppError;
pub use host::{HostCapabilities, HostEnvironment, detect_host_environment};
pub use shutdown::{ShutdownManager, ShutdownReason};
