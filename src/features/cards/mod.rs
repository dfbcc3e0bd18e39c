mod cover;
pub mod handler;
mod renderer;
mod service;
mod style;
mod text;
mod types;

/// 启动期预热字体数据库，降低首个渲染请求的长尾延迟。
pub(crate) fn prewarm_font_db() {
    let _ = renderer::get_global_font_db();
}

pub use cover::{CoverImage, fetch_cover, proxied_url};
pub use handler::create_card_router;
pub use renderer::{RenderOptions, build_guide_card_svg, build_ranking_card_svg, render_svg_to_png};
pub use service::{
    CardContext, generate_ranking_card, generate_share_card, png_data_uri, render_guide_card_png,
    render_ranking_card_png,
};
pub use style::{CARD_HEIGHT, CARD_WIDTH};
pub use types::{CardTheme, GuideSummary, RenderGuideCardRequest, RenderRankingCardRequest};
