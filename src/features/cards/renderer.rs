use std::fmt::Write;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use base64::{Engine as _, engine::general_purpose::STANDARD as base64_engine};
use resvg::usvg::{self, Options as UsvgOptions, fontdb};
use resvg::{
    render,
    tiny_skia::{Pixmap, Transform},
};

use super::cover::CoverImage;
use super::style::{
    CARD_HEIGHT, CARD_WIDTH, CardBackground, FontKind, LIKES_COLOR, MEDAL_DIGIT, MEDAL_FILL,
    TextStyle, guide_style, ranking_style,
};
use super::text::{truncate_to_width, wrap_text};
use super::types::{CardTheme, GuideSummary};
use crate::error::AppError;

/// 自定义字体目录（可缺失，缺失时只使用系统字体）
const FONTS_DIR: &str = "resources/fonts";

/// 排行卡片标题
const RANKING_TITLE: &str = "Top 5 Reading Guides";
/// 卡片右下角品牌文案
const BRAND_TEXT: &str = "Shared from Castlist";
/// 品牌文案字号（固定无衬线，不随主题变化）
const BRAND_PX: f64 = 24.0;
/// 排行卡片最多渲染的条目数
const RANKING_MAX_ROWS: usize = 5;
/// 排行卡片行内标题的最大渲染宽度
const RANKING_MAX_TITLE_WIDTH: f64 = 650.0;

/// 渲染选项：字体栈与速度/质量取舍，由配置解析后显式传入（渲染层不读全局状态）
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// 无衬线字体栈（CSS font-family 值）
    pub sans_stack: String,
    /// 衬线字体栈（CSS font-family 值）
    pub serif_stack: String,
    /// 是否优先速度渲染
    pub optimize_speed: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        let cfg = crate::config::CardRenderConfig::default();
        Self {
            sans_stack: cfg.sans_font_stack,
            serif_stack: cfg.serif_font_stack,
            optimize_speed: cfg.optimize_speed,
        }
    }
}

impl RenderOptions {
    /// 从卡片渲染配置构建
    pub fn from_config(cfg: &crate::config::CardRenderConfig) -> Self {
        Self {
            sans_stack: cfg.sans_font_stack.clone(),
            serif_stack: cfg.serif_font_stack.clone(),
            optimize_speed: cfg.optimize_speed,
        }
    }

    fn stack(&self, kind: FontKind) -> &str {
        match kind {
            FontKind::Sans => &self.sans_stack,
            FontKind::Serif => &self.serif_stack,
        }
    }
}

// 全局字体数据库单例
static GLOBAL_FONT_DB: OnceLock<Arc<fontdb::Database>> = OnceLock::new();

/// 初始化全局字体数据库
fn init_global_font_db() -> Arc<fontdb::Database> {
    let mut font_db = fontdb::Database::new();
    font_db.load_system_fonts();

    // 加载自定义字体
    let fonts_dir = PathBuf::from(FONTS_DIR);
    if fonts_dir.exists() {
        if let Ok(entries) = fs::read_dir(&fonts_dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file()
                    && (path.extension() == Some("ttf".as_ref())
                        || path.extension() == Some("otf".as_ref()))
                {
                    if let Err(e) = font_db.load_font_file(&path) {
                        tracing::error!("加载字体文件失败 '{}': {}", path.display(), e);
                    }
                }
            }
        }
    }

    Arc::new(font_db)
}

/// 获取全局字体数据库
pub fn get_global_font_db() -> Arc<fontdb::Database> {
    GLOBAL_FONT_DB.get_or_init(init_global_font_db).clone()
}

/// XML 文本转义
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

// 画布文本锚点到 SVG 基线的近似换算：按 em box 估算 ascent≈0.8em、descent≈0.2em。
fn baseline_from_top(y: f64, px: f64) -> f64 {
    y + px * 0.8
}

fn baseline_from_middle(y: f64, px: f64) -> f64 {
    y + px * 0.3
}

fn baseline_from_bottom(y: f64, px: f64) -> f64 {
    y - px * 0.2
}

/// 写入一条文本样式类（字体栈/字号/粗细/斜体/填充色）
fn write_text_class(
    svg: &mut String,
    opts: &RenderOptions,
    name: &str,
    style: &TextStyle,
    fill: &str,
) -> Result<(), std::fmt::Error> {
    writeln!(
        svg,
        ".{} {{ font-family: {}; font-size: {}px; font-weight: {}; font-style: {}; fill: {}; }}",
        name,
        opts.stack(style.kind),
        style.px,
        if style.bold { 700 } else { 400 },
        if style.italic { "italic" } else { "normal" },
        fill,
    )
}

/// 写入背景（纯色矩形或对角渐变），渐变的 `<linearGradient>` 需已在 defs 中定义
fn write_background(svg: &mut String, background: &CardBackground) -> Result<(), std::fmt::Error> {
    match background {
        CardBackground::Solid(color) => {
            writeln!(svg, r#"<rect width="100%" height="100%" fill="{color}"/>"#)
        }
        CardBackground::Gradient { .. } => {
            writeln!(
                svg,
                r#"<rect width="100%" height="100%" fill="url(#bg-gradient)"/>"#
            )
        }
    }
}

/// 写入渐变背景定义（左上 -> 右下）
fn write_gradient_def(svg: &mut String, from: &str, to: &str) -> Result<(), std::fmt::Error> {
    writeln!(
        svg,
        r#"<linearGradient id="bg-gradient" x1="0%" y1="0%" x2="100%" y2="100%"><stop offset="0%" style="stop-color:{from}" /><stop offset="100%" style="stop-color:{to}" /></linearGradient>"#
    )
}

/// 生成单指南分享卡片的 SVG 文档
///
/// 有封面时为双栏布局（左文右图），否则单栏全宽文本。封面的缺失/失败由取回层
/// 处理，这里只区分 `Some`/`None`。
pub fn build_guide_card_svg(
    opts: &RenderOptions,
    guide: &GuideSummary,
    theme: CardTheme,
    cover: Option<&CoverImage>,
) -> Result<String, AppError> {
    let fmt_err = |e| AppError::CardRender(format!("SVG formatting error: {e}"));

    let style = guide_style(theme);
    let width = CARD_WIDTH as f64;
    let height = CARD_HEIGHT as f64;

    let mut svg = String::with_capacity(16 * 1024);
    writeln!(
        svg,
        r#"<svg width="{CARD_WIDTH}" height="{CARD_HEIGHT}" viewBox="0 0 {CARD_WIDTH} {CARD_HEIGHT}" xmlns="http://www.w3.org/2000/svg">"#
    )
    .map_err(fmt_err)?;

    // --- Definitions (Gradient, Shadow, Styles) ---
    writeln!(svg, "<defs>").map_err(fmt_err)?;
    if let CardBackground::Gradient { from, to } = style.background {
        write_gradient_def(&mut svg, from, to).map_err(fmt_err)?;
    }
    if cover.is_some() {
        // 封面投影：向下 8px、模糊 20px、15% 黑
        writeln!(
            svg,
            r##"<filter id="cover-shadow" x="-20%" y="-20%" width="140%" height="140%"><feDropShadow dx="0" dy="8" stdDeviation="10" flood-color="#000000" flood-opacity="0.15" /></filter>"##
        )
        .map_err(fmt_err)?;
    }
    writeln!(svg, "<style>").map_err(fmt_err)?;
    write_text_class(&mut svg, opts, "title", &style.title, style.title_color).map_err(fmt_err)?;
    write_text_class(&mut svg, opts, "body", &style.body, style.body_color).map_err(fmt_err)?;
    write_text_class(&mut svg, opts, "author", &style.author, style.author_color)
        .map_err(fmt_err)?;
    let brand = TextStyle {
        kind: FontKind::Sans,
        px: BRAND_PX,
        bold: false,
        italic: false,
    };
    write_text_class(&mut svg, opts, "brand", &brand, style.brand_color).map_err(fmt_err)?;
    writeln!(svg, "</style>").map_err(fmt_err)?;
    writeln!(svg, "</defs>").map_err(fmt_err)?;

    write_background(&mut svg, &style.background).map_err(fmt_err)?;

    let text_x = 60.0;
    let (text_max_width, body_gap) = if let Some(cover) = cover {
        // --- 双栏布局：右栏为等比缩放居中的封面 ---
        let img_padding = 60.0;
        let img_area_x = width * 0.55;
        let img_area_width = width - img_area_x - img_padding;
        let img_area_height = height - img_padding * 2.0;

        let h_ratio = img_area_width / cover.width as f64;
        let v_ratio = img_area_height / cover.height as f64;
        let ratio = h_ratio.min(v_ratio);
        let draw_width = cover.width as f64 * ratio;
        let draw_height = cover.height as f64 * ratio;
        let draw_x = img_area_x + (img_area_width - draw_width) / 2.0;
        let draw_y = img_padding + (img_area_height - draw_height) / 2.0;

        let href = format!(
            "data:{};base64,{}",
            cover.mime,
            base64_engine.encode(&cover.data)
        );
        writeln!(
            svg,
            r#"<image href="{href}" x="{draw_x:.1}" y="{draw_y:.1}" width="{draw_width:.1}" height="{draw_height:.1}" preserveAspectRatio="none" filter="url(#cover-shadow)" />"#
        )
        .map_err(fmt_err)?;

        (width * 0.55 - 90.0, 15.0)
    } else {
        // --- 单栏全宽文本布局 ---
        (1080.0, 10.0)
    };

    // 标题自 y=80 顶部锚定换行，行高 85
    let title_line_height = 85.0;
    let mut y = 80.0;
    for line in wrap_text(&guide.title, style.title.px, text_max_width) {
        writeln!(
            svg,
            r#"<text x="{text_x}" y="{:.1}" class="title">{}</text>"#,
            baseline_from_top(y, style.title.px),
            escape_xml(&line)
        )
        .map_err(fmt_err)?;
        y += title_line_height;
    }

    // 简介紧随标题块之后，行高 50
    let body_line_height = 50.0;
    y += body_gap;
    for line in wrap_text(&guide.description, style.body.px, text_max_width) {
        writeln!(
            svg,
            r#"<text x="{text_x}" y="{:.1}" class="body">{}</text>"#,
            baseline_from_top(y, style.body.px),
            escape_xml(&line)
        )
        .map_err(fmt_err)?;
        y += body_line_height;
    }

    // --- Footer：与正文长度无关，底部锚定 ---
    let footer_y = height - 60.0;
    writeln!(
        svg,
        r#"<text x="{text_x}" y="{:.1}" class="author">by @{}</text>"#,
        baseline_from_bottom(footer_y, style.author.px),
        escape_xml(&guide.author_username)
    )
    .map_err(fmt_err)?;
    writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" class="brand" text-anchor="end">{BRAND_TEXT}</text>"#,
        width - 60.0,
        baseline_from_bottom(footer_y, BRAND_PX)
    )
    .map_err(fmt_err)?;

    writeln!(svg, "</svg>").map_err(fmt_err)?;
    Ok(svg)
}

/// 写入一枚圆形奖牌（排名 1-3）：彩色填充 + 半透明白描边环 + 居中深色数字
fn write_medal(svg: &mut String, cx: f64, cy: f64, rank: usize) -> Result<(), std::fmt::Error> {
    let fill = MEDAL_FILL[rank - 1];
    let digit_fill = MEDAL_DIGIT[rank - 1];
    writeln!(
        svg,
        r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="20" fill="{fill}" stroke="rgba(255,255,255,0.5)" stroke-width="2" />"#
    )?;
    writeln!(
        svg,
        r#"<text x="{cx:.1}" y="{:.1}" class="medal-digit" text-anchor="middle" fill="{digit_fill}">{rank}</text>"#,
        baseline_from_middle(cy + 2.0, 24.0)
    )
}

/// 生成 Top5 排行卡片的 SVG 文档
///
/// 输入按点赞数降序预排序（外部协作方职责），这里只取前 5 条渲染。
pub fn build_ranking_card_svg(
    opts: &RenderOptions,
    guides: &[GuideSummary],
    theme: CardTheme,
) -> Result<String, AppError> {
    let fmt_err = |e| AppError::CardRender(format!("SVG formatting error: {e}"));

    let style = ranking_style(theme);
    let width = CARD_WIDTH as f64;
    let height = CARD_HEIGHT as f64;

    let mut svg = String::with_capacity(16 * 1024);
    writeln!(
        svg,
        r#"<svg width="{CARD_WIDTH}" height="{CARD_HEIGHT}" viewBox="0 0 {CARD_WIDTH} {CARD_HEIGHT}" xmlns="http://www.w3.org/2000/svg">"#
    )
    .map_err(fmt_err)?;

    writeln!(svg, "<defs>").map_err(fmt_err)?;
    if let CardBackground::Gradient { from, to } = style.background {
        write_gradient_def(&mut svg, from, to).map_err(fmt_err)?;
    }
    writeln!(svg, "<style>").map_err(fmt_err)?;
    write_text_class(&mut svg, opts, "title", &style.title, style.title_color).map_err(fmt_err)?;
    write_text_class(&mut svg, opts, "row", &style.body, style.body_color).map_err(fmt_err)?;
    write_text_class(&mut svg, opts, "row-author", &style.author, style.author_color)
        .map_err(fmt_err)?;
    // 排名数字、奖牌数字、点赞数与品牌文案固定无衬线，不随主题切换
    let rank_label = TextStyle {
        kind: FontKind::Sans,
        px: 48.0,
        bold: true,
        italic: false,
    };
    write_text_class(&mut svg, opts, "rank-label", &rank_label, style.body_color)
        .map_err(fmt_err)?;
    let medal_digit = TextStyle {
        kind: FontKind::Sans,
        px: 24.0,
        bold: true,
        italic: false,
    };
    writeln!(
        svg,
        ".medal-digit {{ font-family: {}; font-size: {}px; font-weight: 700; }}",
        opts.stack(medal_digit.kind),
        medal_digit.px
    )
    .map_err(fmt_err)?;
    let likes = TextStyle {
        kind: FontKind::Sans,
        px: 40.0,
        bold: true,
        italic: false,
    };
    write_text_class(&mut svg, opts, "likes", &likes, LIKES_COLOR).map_err(fmt_err)?;
    let brand = TextStyle {
        kind: FontKind::Sans,
        px: BRAND_PX,
        bold: false,
        italic: false,
    };
    write_text_class(&mut svg, opts, "brand", &brand, style.brand_color).map_err(fmt_err)?;
    writeln!(svg, "</style>").map_err(fmt_err)?;
    writeln!(svg, "</defs>").map_err(fmt_err)?;

    write_background(&mut svg, &style.background).map_err(fmt_err)?;

    // --- 标题居中，基线 y=90 ---
    writeln!(
        svg,
        r#"<text x="{:.1}" y="90" class="title" text-anchor="middle">{RANKING_TITLE}</text>"#,
        width / 2.0
    )
    .map_err(fmt_err)?;

    // --- 列表：自 y=180 起，每行 85px，仅取前 5 条 ---
    let mut y_pos = 180.0;
    let item_height = 85.0;
    let row_x = 120.0;
    for (index, guide) in guides.iter().take(RANKING_MAX_ROWS).enumerate() {
        let rank = index + 1;

        if rank <= 3 {
            write_medal(&mut svg, row_x - 40.0, y_pos, rank).map_err(fmt_err)?;
        } else {
            writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" class="rank-label" text-anchor="middle">#{rank}</text>"#,
                row_x - 40.0,
                baseline_from_middle(y_pos + 5.0, rank_label.px)
            )
            .map_err(fmt_err)?;
        }

        // 行内标题按当前列表字体实测截断到 650px
        let title = truncate_to_width(&guide.title, style.body.px, RANKING_MAX_TITLE_WIDTH);
        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" class="row">{}</text>"#,
            row_x + 20.0,
            baseline_from_middle(y_pos - 12.0, style.body.px),
            escape_xml(&title)
        )
        .map_err(fmt_err)?;

        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" class="row-author">by @{}</text>"#,
            row_x + 25.0,
            baseline_from_middle(y_pos + 22.0, style.author.px),
            escape_xml(&guide.author_username)
        )
        .map_err(fmt_err)?;

        writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" class="likes" text-anchor="end">&#10084; {}</text>"#,
            width - 100.0,
            baseline_from_middle(y_pos, likes.px),
            guide.likes
        )
        .map_err(fmt_err)?;

        y_pos += item_height;
    }

    // --- Footer ---
    writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" class="brand" text-anchor="end">{BRAND_TEXT}</text>"#,
        width - 60.0,
        baseline_from_bottom(height - 40.0, BRAND_PX)
    )
    .map_err(fmt_err)?;

    writeln!(svg, "</svg>").map_err(fmt_err)?;
    Ok(svg)
}

/// 将 SVG 文档栅格化为 PNG 字节
///
/// 这是渲染调用里唯一会向上传播的失败路径（SVG 解析 / 栅格表面创建 / 编码）。
pub fn render_svg_to_png(opts: &RenderOptions, svg_data: &str) -> Result<Vec<u8>, AppError> {
    // 字体数据库（全局复用）
    let font_db = get_global_font_db();

    let speed = opts.optimize_speed;
    let usvg_opts = UsvgOptions {
        fontdb: font_db,
        font_size: 16.0,
        languages: vec!["en".to_string()],
        shape_rendering: if speed {
            usvg::ShapeRendering::OptimizeSpeed
        } else {
            usvg::ShapeRendering::GeometricPrecision
        },
        text_rendering: if speed {
            usvg::TextRendering::OptimizeSpeed
        } else {
            usvg::TextRendering::OptimizeLegibility
        },
        image_rendering: if speed {
            usvg::ImageRendering::OptimizeSpeed
        } else {
            usvg::ImageRendering::OptimizeQuality
        },
        ..Default::default()
    };

    let tree = usvg::Tree::from_data(svg_data.as_bytes(), &usvg_opts)
        .map_err(|e| AppError::CardRender(format!("Failed to parse SVG: {e}")))?;

    let pixmap_size = tree.size().to_int_size();
    let mut pixmap = Pixmap::new(pixmap_size.width(), pixmap_size.height())
        .ok_or_else(|| AppError::CardRender("Failed to create pixmap".to_string()))?;

    render(&tree, Transform::default(), &mut pixmap.as_mut());

    // 使用 png crate 进行编码
    let mut out = Vec::with_capacity((pixmap_size.width() * pixmap_size.height()) as usize);
    {
        let mut encoder = png::Encoder::new(&mut out, pixmap_size.width(), pixmap_size.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        if speed {
            encoder.set_compression(png::Compression::Fast);
            encoder.set_filter(png::FilterType::NoFilter);
        } else {
            encoder.set_compression(png::Compression::Default);
            encoder.set_filter(png::FilterType::Paeth);
        }
        let mut writer = encoder
            .write_header()
            .map_err(|e| AppError::CardRender(format!("PNG write_header error: {e}")))?;
        writer
            .write_image_data(pixmap.data())
            .map_err(|e| AppError::CardRender(format!("PNG write_image_data error: {e}")))?;
        writer
            .finish()
            .map_err(|e| AppError::CardRender(format!("PNG finish error: {e}")))?;
    }

    Ok(out)
}
