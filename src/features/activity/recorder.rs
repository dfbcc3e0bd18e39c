use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

use chrono::Utc;
use reqwest::Client;
use serde_json::json;

use crate::error::AppError;

/// 补偿式更新：先应用本地变更，远端失败时回放先前状态。
///
/// `apply`/`undo` 必须互为逆操作；`remote` 失败时 `undo` 一定会执行，
/// 随后错误原样向上传播。
pub async fn apply_optimistic<A, U, F>(apply: A, undo: U, remote: F) -> Result<(), AppError>
where
    A: FnOnce(),
    U: FnOnce(),
    F: Future<Output = Result<(), AppError>>,
{
    apply();
    match remote.await {
        Ok(()) => Ok(()),
        Err(e) => {
            undo();
            Err(e)
        }
    }
}

/// 分享动态记录器：本实例内存计数 + 可选上游日志端点
#[derive(Debug)]
pub struct ActivityRecorder {
    counts: Mutex<HashMap<String, u64>>,
    upstream: Option<String>,
    client: Client,
}

impl ActivityRecorder {
    pub fn new(upstream: Option<String>, client: Client) -> Self {
        Self {
            counts: Mutex::new(HashMap::new()),
            upstream,
            client,
        }
    }

    /// 当前条目的累计分享次数
    pub fn total_shares(&self, item_title: &str) -> u64 {
        self.counts
            .lock()
            .map(|counts| counts.get(item_title).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// 向上游转发动态事件；未配置上游时视为成功（仅本地计数）
    async fn forward(&self, action: &str, item_title: &str) -> Result<(), AppError> {
        let Some(endpoint) = self.upstream.as_deref() else {
            return Ok(());
        };

        let body = json!({
            "action": action,
            "itemTitle": item_title,
            "timestamp": Utc::now().to_rfc3339(),
        });
        self.client
            .post(endpoint)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// 记录一次分享：乐观递增本地计数，上游失败则回滚并报错
    pub async fn record_share(&self, item_title: &str) -> Result<u64, AppError> {
        apply_optimistic(
            || {
                if let Ok(mut counts) = self.counts.lock() {
                    *counts.entry(item_title.to_string()).or_insert(0) += 1;
                }
            },
            || {
                if let Ok(mut counts) = self.counts.lock()
                    && let Some(n) = counts.get_mut(item_title)
                {
                    *n = n.saturating_sub(1);
                }
            },
            self.forward("Shared", item_title),
        )
        .await?;

        Ok(self.total_shares(item_title))
    }
}
