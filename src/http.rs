use once_cell::sync::OnceCell;
use reqwest::Client;
use std::time::Duration;

/// 全局复用的 HTTP Client（统一连接池/Keep-Alive），避免每次请求重复创建。
///
/// 说明：
/// - 封面取回不在 client 上设置 timeout：墙钟上限由渲染侧的 select! 竞速控制。
/// - 上游动态上报属于短请求，单独使用 10s timeout 的 client。
/// - `Client` 本身是线程安全的，适合全局复用。
static CLIENT_DEFAULT: OnceCell<Client> = OnceCell::new();
static CLIENT_TIMEOUT_10S: OnceCell<Client> = OnceCell::new();

/// 默认配置的 HTTP Client（不额外设置 timeout），用于封面取回等受外部竞速约束的请求。
pub fn client_default() -> Result<&'static Client, reqwest::Error> {
    CLIENT_DEFAULT.get_or_try_init(|| Client::builder().build())
}

/// timeout=10s 的 HTTP Client（用于动态上报等短请求）。
pub fn client_timeout_10s() -> Result<&'static Client, reqwest::Error> {
    CLIENT_TIMEOUT_10S
        .get_or_try_init(|| Client::builder().timeout(Duration::from_secs(10)).build())
}
