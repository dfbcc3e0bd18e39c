//! 优雅退出管理模块
//!
//! 提供跨平台的信号处理和优雅退出协调机制，
//! 支持SIGINT、SIGTERM信号和Windows Ctrl+C处理。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;
use tracing::{debug, info};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
    /// 应用请求退出
    Application,
}

#[derive(Debug)]
struct ShutdownInner {
    /// 退出信号通知器
    notify: Notify,
    /// 最近一次退出原因（先触发后等待的场景直接读取）
    last_reason: std::sync::Mutex<Option<ShutdownReason>>,
    /// 是否已经开始优雅退出
    shutting_down: AtomicBool,
}

/// 优雅退出管理器
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    inner: Arc<ShutdownInner>,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    /// 创建新的优雅退出管理器
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ShutdownInner {
                notify: Notify::new(),
                last_reason: std::sync::Mutex::new(None),
                shutting_down: AtomicBool::new(false),
            }),
        }
    }

    /// 是否已经开始退出
    pub fn is_shutting_down(&self) -> bool {
        self.inner.shutting_down.load(Ordering::SeqCst)
    }

    /// 触发优雅退出（幂等，只记录第一次的原因）
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        if self
            .inner
            .shutting_down
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("退出已在进行中，忽略重复触发: {:?}", reason);
            return;
        }
        if let Ok(mut guard) = self.inner.last_reason.lock() {
            *guard = Some(reason);
        }
        info!("触发优雅退出: {:?}", reason);
        self.inner.notify.notify_waiters();
    }

    /// 等待退出信号，返回退出原因
    pub async fn wait_for_shutdown(&self) -> ShutdownReason {
        if !self.is_shutting_down() {
            self.inner.notify.notified().await;
        }
        self.inner
            .last_reason
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .unwrap_or(ShutdownReason::Application)
    }

    /// 启动操作系统信号监听任务
    pub fn start_signal_handler(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            let reason = wait_for_os_signal().await;
            manager.trigger_shutdown(reason);
        });
    }
}

#[cfg(unix)]
async fn wait_for_os_signal() -> ShutdownReason {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("注册SIGTERM处理失败: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return ShutdownReason::Interrupt;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => ShutdownReason::Interrupt,
        _ = sigterm.recv() => ShutdownReason::Terminate,
    }
}

#[cfg(not(unix))]
async fn wait_for_os_signal() -> ShutdownReason {
    let _ = tokio::signal::ctrl_c().await;
    ShutdownReason::Interrupt
}

#[cfg(test)]
mod tests {
    use super::{ShutdownManager, ShutdownReason};
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_before_wait_returns_first_reason() {
        let manager = ShutdownManager::new();
        manager.trigger_shutdown(ShutdownReason::Terminate);
        // 重复触发被忽略
        manager.trigger_shutdown(ShutdownReason::Interrupt);

        let reason = manager.wait_for_shutdown().await;
        assert_eq!(reason, ShutdownReason::Terminate);
        assert!(manager.is_shutting_down());
    }

    #[tokio::test]
    async fn wait_is_released_by_trigger() {
        let manager = ShutdownManager::new();
        let waiter = {
            let m = manager.clone();
            tokio::spawn(async move { m.wait_for_shutdown().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        manager.trigger_shutdown(ShutdownReason::Application);

        let reason = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("wait_for_shutdown should resolve")
            .expect("join");
        assert_eq!(reason, ShutdownReason::Application);
    }
}
