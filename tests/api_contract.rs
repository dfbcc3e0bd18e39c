use axum::{
    http::{StatusCode, header},
    response::IntoResponse,
};

/// 契约关键点：全局错误必须为 RFC7807 ProblemDetails（application/problem+json）。
#[tokio::test]
async fn app_error_into_response_is_problem_details() {
    let resp = castlist_backend::AppError::Json("缺少参数 guide".to_string()).into_response();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .expect("missing Content-Type")
        .to_str()
        .expect("invalid Content-Type");
    assert_eq!(content_type, "application/problem+json");

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");

    // 核心字段（强一致契约）
    assert_eq!(v["status"], 400);
    assert_eq!(v["code"], "BAD_REQUEST");
    assert!(v.get("type").is_some());
    assert!(v.get("title").is_some());
    assert!(v.get("detail").is_some());
}

/// 契约关键点：渲染失败映射为 422 + 稳定错误码。
#[tokio::test]
async fn card_render_error_maps_to_unprocessable_entity() {
    let resp =
        castlist_backend::AppError::CardRender("Failed to create pixmap".to_string())
            .into_response();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let v: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");
    assert_eq!(v["code"], "CARD_RENDER_FAILED");
}

/// 契约关键点：对外 JSON 字段命名统一 camelCase。
#[test]
fn render_guide_card_request_serializes_as_camel_case() {
    use castlist_backend::features::cards::{
        CardTheme, GuideSummary, RenderGuideCardRequest,
    };

    let req = RenderGuideCardRequest {
        guide: GuideSummary {
            title: "Essential Sci-Fi Classics".to_string(),
            description: "A journey through the golden age of science fiction.".to_string(),
            author_username: "scifi_reader".to_string(),
            likes: 3,
            tags: vec!["sci-fi".to_string()],
        },
        theme: CardTheme::Modern,
        cover_url: Some("https://covers.example.com/book.png".to_string()),
    };

    let v = serde_json::to_value(req).expect("serialize json");

    // snake_case 字段应被重命名为 camelCase
    assert!(v.get("coverUrl").is_some());
    assert!(v.get("cover_url").is_none());
    assert!(v["guide"].get("authorUsername").is_some());
    assert!(v["guide"].get("author_username").is_none());

    // 主题序列化为小写标识
    assert_eq!(v["theme"], "modern");
}
