use unicode_width::UnicodeWidthChar;

/// 半角字符的平均推进宽度（以 em 计）。全角（中日韩等双格）字符按一个 em 估算。
///
/// 估算必须与换行/截断判定使用同一套口径，渲染结果才可复现、可测试。
const HALF_WIDTH_ADVANCE_EM: f64 = 0.55;

/// 估算文本在给定像素字号下的渲染宽度
pub fn estimate_text_width(text: &str, px: f64) -> f64 {
    text.chars()
        .map(|ch| match UnicodeWidthChar::width(ch) {
            Some(2) => px,
            Some(0) | None => 0.0,
            _ => px * HALF_WIDTH_ADVANCE_EM,
        })
        .sum()
}

/// 按单词换行：逐词累积测量，超出列宽时折行（行首单词永不折出空行）。
///
/// 返回的行序列保持输入词序，不做断词；单个超宽单词独占一行（无损换行）。
pub fn wrap_text(text: &str, px: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for (n, word) in text.split_whitespace().enumerate() {
        let test_line = format!("{line}{word} ");
        if estimate_text_width(&test_line, px) > max_width && n > 0 {
            lines.push(line.trim_end().to_string());
            line = format!("{word} ");
        } else {
            line = test_line;
        }
    }
    lines.push(line.trim_end().to_string());
    lines
}

/// 单行截断：超宽时从尾部逐字符去除并追加省略号，直到测量宽度不超过列宽。
pub fn truncate_to_width(text: &str, px: f64, max_width: f64) -> String {
    if estimate_text_width(text, px) <= max_width {
        return text.to_string();
    }

    let mut truncated = text.to_string();
    while !truncated.is_empty()
        && estimate_text_width(&format!("{truncated}..."), px) > max_width
    {
        truncated.pop();
    }
    truncated.push_str("...");
    truncated
}
