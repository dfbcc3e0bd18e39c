//! 宿主环境探测模块
//!
//! 服务可能运行在两种互斥的宿主环境里：systemd 托管（有 notify socket 注入）
//! 或独立进程。环境在启动时探测一次，得到显式的 `HostEnvironment` 值并逐层
//! 传递，运行期不再读取环境变量。

/// 启动时注入的宿主能力快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// 是否存在 systemd notify socket（`NOTIFY_SOCKET`）
    pub notify_socket: bool,
}

impl HostCapabilities {
    /// 从进程环境采集能力快照（仅在启动时调用一次）
    pub fn from_env() -> Self {
        Self {
            notify_socket: std::env::var_os("NOTIFY_SOCKET").is_some(),
        }
    }
}

/// 宿主环境
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEnvironment {
    /// systemd 托管：生命周期信号通过 sd-notify 上报
    Supervised,
    /// 独立进程：生命周期信号为空操作
    Standalone,
}

/// 由能力快照解析宿主环境（纯函数，无副作用）
pub fn detect_host_environment(caps: &HostCapabilities) -> HostEnvironment {
    if caps.notify_socket {
        HostEnvironment::Supervised
    } else {
        HostEnvironment::Standalone
    }
}

impl HostEnvironment {
    /// 上报服务就绪
    pub fn notify_ready(&self) {
        if let HostEnvironment::Supervised = self {
            systemd_impl::notify_ready();
        }
    }

    /// 上报服务停止中
    pub fn notify_stopping(&self) {
        if let HostEnvironment::Supervised = self {
            systemd_impl::notify_stopping();
        }
    }
}

#[cfg(target_os = "linux")]
mod systemd_impl {
    use sd_notify::{NotifyState, notify};
    use tracing::{debug, error};

    fn send(state: NotifyState) {
        debug!("发送systemd通知: {:?}", state);
        if let Err(e) = notify(false, &[state]) {
            error!("systemd通知失败: {}", e);
        }
    }

    pub fn notify_ready() {
        send(NotifyState::Ready);
    }

    pub fn notify_stopping() {
        send(NotifyState::Stopping);
    }
}

#[cfg(not(target_os = "linux"))]
mod systemd_impl {
    use tracing::debug;

    pub fn notify_ready() {
        debug!("非Linux平台，忽略systemd ready通知");
    }

    pub fn notify_stopping() {
        debug!("非Linux平台，忽略systemd stopping通知");
    }
}
