//! 卡片 API 黑盒测试：路由、内容类型、输出格式与主题校验。

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use image::GenericImageView;
use tower::ServiceExt;

use castlist_backend::config::AppConfig;
use castlist_backend::features::cards::create_card_router;
use castlist_backend::state::AppState;

fn test_app() -> Router {
    let state = AppState::from_config(&AppConfig::default()).expect("state");
    Router::new().merge(create_card_router()).with_state(state)
}

fn guide_body() -> String {
    serde_json::json!({
        "guide": {
            "title": "Essential Sci-Fi Classics",
            "description": "A journey through the golden age of science fiction.",
            "authorUsername": "scifi_reader",
            "likes": 3
        },
        "theme": "modern"
    })
    .to_string()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("build request")
}

#[tokio::test]
async fn guide_card_endpoint_returns_png() {
    let app = test_app();
    let resp = app
        .oneshot(post_json("/cards/guide", guide_body()))
        .await
        .expect("call app");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let img = image::load_from_memory(&bytes).expect("decode png");
    assert_eq!(img.dimensions(), (1200, 630));
}

#[tokio::test]
async fn guide_card_endpoint_supports_datauri_format() {
    let app = test_app();
    let resp = app
        .oneshot(post_json("/cards/guide?format=datauri", guide_body()))
        .await
        .expect("call app");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/plain; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8 body");
    assert!(text.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn guide_card_endpoint_supports_svg_format() {
    let app = test_app();
    let resp = app
        .oneshot(post_json("/cards/guide?format=svg", guide_body()))
        .await
        .expect("call app");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/svg+xml; charset=utf-8"
    );

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let svg = String::from_utf8(bytes.to_vec()).expect("utf8 body");
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Shared from Castlist"));
}

#[tokio::test]
async fn unknown_theme_identifier_is_rejected() {
    let body = serde_json::json!({
        "guide": {
            "title": "t",
            "description": "d",
            "authorUsername": "a"
        },
        "theme": "vaporwave"
    })
    .to_string();

    let app = test_app();
    let resp = app
        .oneshot(post_json("/cards/guide", body))
        .await
        .expect("call app");

    assert!(
        resp.status().is_client_error(),
        "unknown theme must be rejected, got {}",
        resp.status()
    );
}

#[tokio::test]
async fn ranking_card_endpoint_returns_png() {
    let body = serde_json::json!({
        "guides": [
            {"title": "G1", "description": "", "authorUsername": "a1", "likes": 12},
            {"title": "G2", "description": "", "authorUsername": "a2", "likes": 9},
            {"title": "G3", "description": "", "authorUsername": "a3", "likes": 7},
            {"title": "G4", "description": "", "authorUsername": "a4", "likes": 4},
            {"title": "G5", "description": "", "authorUsername": "a5", "likes": 1}
        ],
        "theme": "classic"
    })
    .to_string();

    let app = test_app();
    let resp = app
        .oneshot(post_json("/cards/ranking", body))
        .await
        .expect("call app");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let img = image::load_from_memory(&bytes).expect("decode png");
    assert_eq!(img.dimensions(), (1200, 630));
}

/// 相同请求第二次命中缓存，输出与首次一致。
#[tokio::test]
async fn repeated_request_serves_identical_bytes_from_cache() {
    let state = AppState::from_config(&AppConfig::default()).expect("state");
    let app = Router::new()
        .merge(create_card_router())
        .with_state(state);

    let first = app
        .clone()
        .oneshot(post_json("/cards/guide", guide_body()))
        .await
        .expect("call app");
    let first_bytes = axum::body::to_bytes(first.into_body(), usize::MAX)
        .await
        .expect("read body");

    let second = app
        .oneshot(post_json("/cards/guide", guide_body()))
        .await
        .expect("call app");
    let second_bytes = axum::body::to_bytes(second.into_body(), usize::MAX)
        .await
        .expect("read body");

    assert_eq!(first_bytes, second_bytes);
}
