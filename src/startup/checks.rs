use std::path::Path;

use crate::error::AppError;

/// 自定义字体目录（与渲染层一致；缺失只告警，系统字体兜底）
const FONTS_DIR: &str = "resources/fonts";

/// 执行启动检查
///
/// 1. 检查字体资源目录（仅告警，不阻断启动）
/// 2. 预热字体数据库，降低首个渲染请求的长尾延迟
pub async fn run_startup_checks() -> Result<(), AppError> {
    tracing::info!("开始执行启动检查...");

    check_font_resources();

    let t_prewarm = std::time::Instant::now();
    if let Err(e) = tokio::task::spawn_blocking(crate::features::cards::prewarm_font_db).await {
        tracing::warn!("字体数据库预热任务失败: {}", e);
    } else {
        tracing::info!("字体数据库预热完成: {}ms", t_prewarm.elapsed().as_millis());
    }

    tracing::info!("启动检查完成");
    Ok(())
}

/// 检查自定义字体目录
fn check_font_resources() {
    let fonts_path = Path::new(FONTS_DIR);
    if fonts_path.is_dir() {
        tracing::info!("自定义字体目录已存在: {}", fonts_path.display());
    } else {
        tracing::warn!(
            "未找到自定义字体目录 {}，将仅使用系统字体（卡片主题需要可用的无衬线与衬线字体）",
            fonts_path.display()
        );
    }
}
