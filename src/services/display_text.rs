//! 显示文本解析
//!
//! 只在测量没有缓存统计值时使用，从 "12.3 mm"、"45.2°" 这类文本中提取数值。
//! 文本格式一旦变化解析就会失败，此时返回 `None` 而不是猜测

use std::sync::LazyLock;

use regex::Regex;

use crate::models::measurement::DisplayText;

static LENGTH_MM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*mm").expect("valid length regex"));

static ANGLE_DEG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]+(?:\.[0-9]+)?)\s*°").expect("valid angle regex"));

/// 主显示文本的第一行
pub fn first_primary(display_text: Option<&DisplayText>) -> Option<&str> {
    display_text?.primary.first().map(String::as_str)
}

/// 解析长度（毫米）
pub fn parse_length_mm(text: &str) -> Option<f64> {
    capture_number(&LENGTH_MM, text)
}

/// 解析角度（度）
pub fn parse_angle_deg(text: &str) -> Option<f64> {
    capture_number(&ANGLE_DEG, text)
}

fn capture_number(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)
        .and_then(|cap| cap.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_length_mm() {
        assert_eq!(parse_length_mm("12.3 mm"), Some(12.3));
        assert_eq!(parse_length_mm("7mm"), Some(7.0));
        assert_eq!(parse_length_mm("L: 40.25 mm (short 3 mm)"), Some(40.25));
    }

    #[test]
    fn test_parse_length_rejects_other_units() {
        assert_eq!(parse_length_mm("12.3 cm"), None);
        assert_eq!(parse_length_mm("no value"), None);
        assert_eq!(parse_length_mm(""), None);
    }

    #[test]
    fn test_parse_angle_deg() {
        assert_eq!(parse_angle_deg("45.5°"), Some(45.5));
        assert_eq!(parse_angle_deg("90 °"), Some(90.0));
        assert_eq!(parse_angle_deg("45.5 deg"), None);
    }

    #[test]
    fn test_first_primary() {
        let text = DisplayText {
            primary: vec!["3.2 mm".into(), "ignored".into()],
            secondary: vec![],
        };
        assert_eq!(first_primary(Some(&text)), Some("3.2 mm"));
        assert_eq!(first_primary(Some(&DisplayText::default())), None);
        assert_eq!(first_primary(None), None);
    }
}
