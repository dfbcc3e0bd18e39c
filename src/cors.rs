use axum::http::{HeaderValue, Method, header};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

/// 根据配置构建 CORS 中间件
///
/// 返回 None 表示跳过启用（未启用、配置为空或配置无效）。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let (any_origin, origins) = collect(&cors.allowed_origins, |v| {
        HeaderValue::from_str(v)
            .map_err(|_| tracing::warn!("CORS allowed_origins 含无效值: {}", v))
            .ok()
    });
    if !any_origin && origins.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }

    let (any_methods, methods) = collect(&cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes())
            .map_err(|_| tracing::warn!("CORS allowed_methods 含无效值: {}", v))
            .ok()
    });
    let (any_headers, headers) = collect(&cors.allowed_headers, |v| {
        header::HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes())
            .map_err(|_| tracing::warn!("CORS allowed_headers 含无效值: {}", v))
            .ok()
    });
    let (any_expose, expose_headers) = collect(&cors.expose_headers, |v| {
        header::HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes())
            .map_err(|_| tracing::warn!("CORS expose_headers 含无效值: {}", v))
            .ok()
    });

    if cors.allow_credentials && (any_origin || any_methods || any_headers || any_expose) {
        tracing::error!("CORS 配置无效：allow_credentials=true 不能与 \"*\" 同时使用，已跳过启用");
        return None;
    }

    let mut layer = CorsLayer::new();

    if any_origin {
        layer = layer.allow_origin(Any);
    } else if !origins.is_empty() {
        layer = layer.allow_origin(origins);
    }

    if any_methods {
        layer = layer.allow_methods(Any);
    } else if !methods.is_empty() {
        layer = layer.allow_methods(methods);
    }

    if any_headers {
        layer = layer.allow_headers(Any);
    } else if !headers.is_empty() {
        layer = layer.allow_headers(headers);
    }

    if any_expose {
        layer = layer.expose_headers(Any);
    } else if !expose_headers.is_empty() {
        layer = layer.expose_headers(expose_headers);
    }

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

/// 解析配置列表：空白项忽略，"*" 记为通配，其余经 parse 转换（无效值由 parse 负责告警）。
fn collect<T>(values: &[String], parse: impl Fn(&str) -> Option<T>) -> (bool, Vec<T>) {
    let mut any = false;
    let mut out = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value == "*" {
            any = true;
            continue;
        }
        if let Some(v) = parse(value) {
            out.push(v);
        }
    }
    (any, out)
}

#[cfg(test)]
mod tests {
    use super::{build_cors_layer, collect};
    use crate::config::CorsConfig;
    use axum::http::Method;

    #[test]
    fn build_cors_layer_skips_when_origins_empty() {
        let cors = CorsConfig {
            enabled: true,
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_none());
    }

    #[test]
    fn build_cors_layer_rejects_credentials_with_wildcard() {
        let cors = CorsConfig {
            enabled: true,
            allow_credentials: true,
            allowed_origins: vec!["*".to_string()],
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_none());
    }

    #[test]
    fn collect_normalizes_methods_and_detects_wildcard() {
        let input = vec!["get".to_string(), " POST ".to_string()];
        let (any, methods) = collect(&input, |v| {
            Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
        });
        assert!(!any);
        assert_eq!(methods, vec![Method::GET, Method::POST]);

        let (any, _) = collect(&["*".to_string()], |_| Some(()));
        assert!(any);
    }
}
