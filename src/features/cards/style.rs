use super::types::CardTheme;

/// 卡片栅格尺寸：固定 1200x630（常见社交预览比例 1.91:1）
pub const CARD_WIDTH: u32 = 1200;
pub const CARD_HEIGHT: u32 = 630;

/// 字体族类别（具体字体栈由渲染选项提供）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontKind {
    Sans,
    Serif,
}

/// 文本样式：族类别 + 像素字号 + 粗细/斜体
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    pub kind: FontKind,
    pub px: f64,
    pub bold: bool,
    pub italic: bool,
}

impl TextStyle {
    const fn sans(px: f64, bold: bool, italic: bool) -> Self {
        Self {
            kind: FontKind::Sans,
            px,
            bold,
            italic,
        }
    }

    const fn serif(px: f64, bold: bool, italic: bool) -> Self {
        Self {
            kind: FontKind::Serif,
            px,
            bold,
            italic,
        }
    }
}

/// 卡片背景
#[derive(Debug, Clone, Copy)]
pub enum CardBackground {
    /// 纯色填充
    Solid(&'static str),
    /// 对角线性渐变（左上 -> 右下）
    Gradient {
        from: &'static str,
        to: &'static str,
    },
}

/// 主题解析结果：一套不可变的调色板 + 字体组合
///
/// 单指南卡片中 `body` 为简介文字；排行卡片复用同一结构，`body` 为列表行文字。
#[derive(Debug, Clone, Copy)]
pub struct CardStyle {
    pub background: CardBackground,
    pub title_color: &'static str,
    pub body_color: &'static str,
    pub author_color: &'static str,
    pub brand_color: &'static str,
    pub title: TextStyle,
    pub body: TextStyle,
    pub author: TextStyle,
}

/// 单指南卡片的主题样式
pub fn guide_style(theme: CardTheme) -> CardStyle {
    match theme {
        CardTheme::Gradient => CardStyle {
            background: CardBackground::Gradient {
                from: "#F4E6FF",
                to: "#E9D0FF",
            },
            title_color: "#2E0F50",
            body_color: "#6020A0",
            author_color: "#4F1B82",
            brand_color: "#7828C8",
            title: TextStyle::sans(72.0, true, false),
            body: TextStyle::sans(40.0, false, false),
            author: TextStyle::sans(32.0, false, true),
        },
        CardTheme::Modern => CardStyle {
            background: CardBackground::Solid("#111827"),
            title_color: "#F9FAFB",
            body_color: "#D1D5DB",
            author_color: "#9CA3AF",
            brand_color: "#E5E7EB",
            title: TextStyle::sans(72.0, true, false),
            body: TextStyle::sans(40.0, false, false),
            author: TextStyle::sans(32.0, false, true),
        },
        CardTheme::Classic => CardStyle {
            background: CardBackground::Solid("#FFFFFF"),
            title_color: "#1F2937",
            body_color: "#4B5563",
            author_color: "#6B7280",
            brand_color: "#9CA3AF",
            title: TextStyle::serif(80.0, true, false),
            body: TextStyle::serif(42.0, false, false),
            author: TextStyle::serif(34.0, false, true),
        },
    }
}

/// 排行卡片的主题样式（标题 72/80，列表行 48/50，行内作者 30/32）
pub fn ranking_style(theme: CardTheme) -> CardStyle {
    let base = guide_style(theme);
    match theme {
        CardTheme::Classic => CardStyle {
            body: TextStyle::serif(50.0, false, false),
            author: TextStyle::serif(32.0, false, true),
            ..base
        },
        _ => CardStyle {
            body: TextStyle::sans(48.0, false, false),
            author: TextStyle::sans(30.0, false, true),
            ..base
        },
    }
}

/// 奖牌配色：金/银/铜（仅排名 1-3）
pub const MEDAL_FILL: [&str; 3] = ["#FFD700", "#C0C0C0", "#CD7F32"];
/// 奖牌内数字用同色系的更深色
pub const MEDAL_DIGIT: [&str; 3] = ["#A36B00", "#6C757D", "#8C5A2D"];
/// 点赞数固定玫红色，不随主题变化
pub const LIKES_COLOR: &str = "#E11D48";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_uses_larger_serif_fonts() {
        let s = guide_style(CardTheme::Classic);
        assert_eq!(s.title.kind, FontKind::Serif);
        assert_eq!(s.title.px, 80.0);
        assert_eq!(s.body.px, 42.0);
        assert_eq!(s.author.px, 34.0);

        let m = guide_style(CardTheme::Modern);
        assert_eq!(m.title.kind, FontKind::Sans);
        assert_eq!(m.title.px, 72.0);
    }

    #[test]
    fn ranking_style_overrides_list_row_fonts() {
        let r = ranking_style(CardTheme::Modern);
        assert_eq!(r.body.px, 48.0);
        assert_eq!(r.author.px, 30.0);

        let c = ranking_style(CardTheme::Classic);
        assert_eq!(c.body.px, 50.0);
        assert_eq!(c.author.px, 32.0);
    }
}
