use axum::{Router, http::StatusCode, response::Json, routing::get};
use castlist_backend::features::activity::create_activity_router;
use castlist_backend::features::cards::create_card_router;
use castlist_backend::host::{HostCapabilities, detect_host_environment};
use castlist_backend::startup::run_startup_checks;
use castlist_backend::state::AppState;
use castlist_backend::{ShutdownManager, config::AppConfig, cors::build_cors_layer, request_id};
use serde_json::json;
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    // 压缩策略：明确排除不该压缩的响应。
    //
    // - 图片（PNG 卡片输出）：本身已压缩，再压缩只浪费 CPU；SVG 除外。
    // - SSE/流式响应：压缩可能引入缓冲，影响实时性。
    // - application/octet-stream/zip/gzip 等常见二进制下载类型：收益不确定。
    //
    // 仍保留默认的最小大小阈值（默认 32B），避免压缩开销覆盖收益。
    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/octet-stream"))
        .and(NotForContentType::const_new("application/zip"))
        .and(NotForContentType::const_new("application/gzip"))
}

#[cfg(test)]
mod compression_predicate_tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        // 命中 SizeAbove（默认 32B），避免因为 body 太小导致测试不稳定。
        let body_bytes = vec![b'x'; 2048];
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body_bytes))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn compression_predicate_disables_png_cards_but_allows_svg() {
        assert!(!should_compress_for("image/png"));
        assert!(should_compress_for("image/svg+xml"));
    }

    #[test]
    fn compression_predicate_disables_common_binary_downloads() {
        assert!(!should_compress_for("application/octet-stream"));
        assert!(!should_compress_for("application/zip"));
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        castlist_backend::features::cards::handler::render_guide_card,
        castlist_backend::features::cards::handler::render_ranking_card,
        castlist_backend::features::activity::handler::record_share,
        health_check,
    ),
    components(
        schemas(
            castlist_backend::AppError,
            castlist_backend::error::ProblemDetails,
            castlist_backend::features::cards::CardTheme,
            castlist_backend::features::cards::GuideSummary,
            castlist_backend::features::cards::RenderGuideCardRequest,
            castlist_backend::features::cards::RenderRankingCardRequest,
            castlist_backend::features::activity::ShareEventRequest,
            castlist_backend::features::activity::ShareEventResponse,
        )
    ),
    tags(
        (name = "Cards", description = "Share card rendering APIs"),
        (name = "Activity", description = "Share activity APIs"),
        (name = "Health", description = "Health APIs"),
    ),
    info(
        title = "Castlist Backend API",
        version = "0.1.0",
        description = "Castlist share-card rendering service (Axum)"
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/health",
    summary = "健康检查",
    description = "用于探活的健康检查端点，返回服务状态与版本信息。",
    responses((status = 200, description = "服务健康", body = serde_json::Value)),
    tag = "Health"
)]
async fn health_check() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "castlist-backend",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "castlist_backend=info,tower_http=info".into()),
        )
        .init();

    // Load config
    if let Err(e) = AppConfig::init_global() {
        tracing::error!("Config init failed: {}", e);
        std::process::exit(1);
    }
    let config = AppConfig::global();

    // 宿主环境探测：启动时采集一次能力快照，随后显式传递
    let host_env = detect_host_environment(&HostCapabilities::from_env());
    tracing::info!("宿主环境: {:?}", host_env);

    // 创建优雅退出管理器并启动信号处理器
    let shutdown_manager = ShutdownManager::new();
    shutdown_manager.start_signal_handler();

    // Run startup checks
    if let Err(e) = run_startup_checks().await {
        tracing::error!("Startup checks failed: {}", e);
        std::process::exit(1);
    }

    // Shared state
    let app_state = match AppState::from_config(config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("State init failed: {}", e);
            std::process::exit(1);
        }
    };

    // Routes
    let api_router = Router::<AppState>::new()
        .merge(create_card_router())
        .merge(create_activity_router());

    let mut app = Router::<AppState>::new()
        .route("/health", get(health_check))
        .nest(&config.api.prefix, api_router)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // 全局 request_id 中间件
    app = app.layer(axum::middleware::from_fn(request_id::request_id_middleware));

    // CORS（按配置启用）
    if let Some(cors) = build_cors_layer(&config.cors) {
        app = app.layer(cors);
    }

    // 应用内响应压缩：对 SVG/JSON/文本等内容启用 gzip/brotli（不压缩 PNG 卡片输出）。
    app = app.layer(CompressionLayer::new().compress_when(compression_predicate()));

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Bind address failed {}: {}", addr, e);
            std::process::exit(1);
        });

    tracing::info!("Server: http://{}", addr);
    tracing::info!("Docs: http://{}/docs", addr);
    tracing::info!("Health: http://{}/health", addr);
    tracing::info!("Cards API: http://{}{}/cards", addr, config.api.prefix);

    // 通知宿主服务已就绪
    host_env.notify_ready();

    // 启动服务器并等待优雅退出信号
    let shutdown_timeout = config.shutdown.timeout_duration();
    let manager_for_signal = shutdown_manager.clone();
    let graceful = axum::serve(listener, app).with_graceful_shutdown(async move {
        let reason = manager_for_signal.wait_for_shutdown().await;
        tracing::info!(
            "接收到退出信号: {:?}，开始优雅退出（超时 {}s）...",
            reason,
            shutdown_timeout.as_secs()
        );
        host_env.notify_stopping();
    });

    // 在途请求允许收尾；超过配置的优雅退出窗口则强制结束进程
    {
        let manager = shutdown_manager.clone();
        tokio::spawn(async move {
            manager.wait_for_shutdown().await;
            tokio::time::sleep(shutdown_timeout).await;
            tracing::warn!("优雅退出超时，强制退出");
            std::process::exit(0);
        });
    }

    if let Err(e) = graceful.await {
        tracing::error!("服务器运行错误: {}", e);
        std::process::exit(1);
    }

    tracing::info!("服务器已优雅关闭");
}
