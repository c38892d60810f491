//! 集合名称处理 - 业务能力层
//!
//! XNAT 集合名只允许 `[A-Za-z0-9_-]`

use chrono::{DateTime, Utc};

fn is_allowed(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// 测量集合名：非法字符替换为 `_`，开头的数字或下划线替换为 `M_`
pub fn sanitize_collection_label(label: &str) -> String {
    let sanitized: String = label
        .chars()
        .map(|c| if is_allowed(c) { c } else { '_' })
        .collect();

    match sanitized.chars().next() {
        Some(first) if first.is_ascii_digit() || first == '_' => {
            format!("M_{}", &sanitized[first.len_utf8()..])
        }
        _ => sanitized,
    }
}

/// 分割集合名：空白替换为 `_`，其余非法字符删除，最长 50 个字符
pub fn sanitize_segmentation_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut in_whitespace = false;
    for c in label.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                out.push('_');
            }
            in_whitespace = true;
            continue;
        }
        in_whitespace = false;
        if is_allowed(c) {
            out.push(c);
        }
    }
    out.chars().take(50).collect()
}

/// 文件名：路径分隔符与文件系统不允许的字符替换为 `_`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// 默认测量集合名，如 `Measurements_20261019T083015123Z`
pub fn default_measurement_label(now: DateTime<Utc>) -> String {
    let iso = now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string();
    let stamp: String = iso.chars().filter(|c| !matches!(c, '.' | ':' | '-')).collect();
    format!("Measurements_{}", stamp)
}

/// 处理用户输入的名称
///
/// # 参数
/// - `input`: 用户输入，`None` 表示取消
/// - `default_label`: 输入为空时使用的名称
/// - `sanitize`: 名称清洗规则
///
/// # 返回
/// 取消或清洗后为空时返回 `None`
pub fn resolve_label(
    input: Option<&str>,
    default_label: &str,
    sanitize: fn(&str) -> String,
) -> Option<String> {
    let input = input?;
    let trimmed = input.trim();
    let label = if trimmed.is_empty() {
        sanitize(default_label)
    } else {
        sanitize(trimmed)
    };
    (!label.is_empty()).then_some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_collection_label() {
        assert_eq!(sanitize_collection_label("My Seg #1!"), "My_Seg__1_");
        assert_eq!(sanitize_collection_label("Liver-ROI_2"), "Liver-ROI_2");
    }

    #[test]
    fn test_sanitize_collection_label_leading_digit_or_underscore() {
        assert_eq!(sanitize_collection_label("1st"), "M_st");
        assert_eq!(sanitize_collection_label("_x"), "M_x");
        assert_eq!(sanitize_collection_label(" lead"), "M_lead");
    }

    #[test]
    fn test_sanitized_labels_only_use_allowed_chars() {
        for raw in ["My Seg #1!", "résumé (v2)", "a/b\\c", "tab\there"] {
            let label = sanitize_collection_label(raw);
            assert!(label.chars().all(is_allowed), "{raw} -> {label}");
            let label = sanitize_segmentation_label(raw);
            assert!(label.chars().all(is_allowed), "{raw} -> {label}");
        }
    }

    #[test]
    fn test_sanitize_segmentation_label() {
        assert_eq!(sanitize_segmentation_label("My Seg #1!"), "My_Seg_1");
        assert_eq!(sanitize_segmentation_label("a   b"), "a_b");
        assert_eq!(sanitize_segmentation_label(&"x".repeat(80)).len(), 50);
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Liver/Kidney"), "Liver_Kidney");
        assert_eq!(sanitize_file_name("../up"), ".._up");
        assert_eq!(sanitize_file_name(r"a\b:c?"), "a_b_c_");
        assert_eq!(sanitize_file_name("Liver Seg (v2)"), "Liver Seg (v2)");
    }

    #[test]
    fn test_default_measurement_label() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap();
        assert_eq!(default_measurement_label(now), "Measurements_20261019T083015000Z");
    }

    #[test]
    fn test_resolve_label() {
        let s = sanitize_collection_label;
        assert_eq!(resolve_label(None, "Default", s), None);
        assert_eq!(resolve_label(Some("   "), "Default", s), Some("Default".into()));
        assert_eq!(resolve_label(Some(" my label "), "Default", s), Some("my_label".into()));
        assert_eq!(resolve_label(Some("!!!"), "Default", sanitize_segmentation_label), None);
    }
}
