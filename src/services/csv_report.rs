//! 分割统计 CSV 报告 - 业务能力层
//!
//! 报告结构（逐行）：
//! 1. 标题、生成时间、分割 ID、分割名称
//! 2. 基本信息：体积、是否修改、段数量
//! 3. 参考序列信息（仅输出存在的字段）
//! 4. 段统计表：每个段占一列，每种统计占一行

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::segmentation::{NamedStat, Segment, Segmentation};
use crate::services::label::sanitize_file_name;

/// 转义单元格：含逗号、引号或换行时加引号，内部引号加倍
pub fn escape_cell(cell: &str) -> Cow<'_, str> {
    if cell.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", cell.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(cell)
    }
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

/// 统计值单元格，数值按最短形式输出
fn value_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        Some(other) => other.to_string(),
    }
}

/// 段的统计列表：优先使用段自身的缓存统计，否则使用计算得到的统计
fn segment_named_stats<'a>(
    segment_number: u32,
    segment: &'a Segment,
    computed: Option<&'a BTreeMap<u32, Vec<NamedStat>>>,
) -> &'a [NamedStat] {
    match &segment.cached_stats {
        Some(stats) => &stats.named_stats,
        None => computed
            .and_then(|c| c.get(&segment_number))
            .map(Vec::as_slice)
            .unwrap_or(&[]),
    }
}

/// 组装报告的所有行
///
/// # 参数
/// - `segmentation`: 分割
/// - `segmentation_id`: 分割 ID（报告中原样输出）
/// - `generated_at`: 生成时间
/// - `computed`: 没有缓存统计的段使用的统计值
pub fn build_rows(
    segmentation: &Segmentation,
    segmentation_id: &str,
    generated_at: DateTime<Utc>,
    computed: Option<&BTreeMap<u32, Vec<NamedStat>>>,
) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();

    rows.push(row(&["Segmentation Statistics Export"]));
    rows.push(row(&[
        "Generated on",
        generated_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .as_str(),
    ]));
    rows.push(row(&["Segmentation ID", segmentation_id]));
    rows.push(row(&["Segmentation Label", segmentation.label.as_str()]));
    rows.push(Vec::new());

    // 基本信息
    let info = segmentation.cached_stats.clone().unwrap_or_default();
    let volume = info
        .volume
        .filter(|v| *v != 0.0)
        .map(|v| v.to_string())
        .unwrap_or_default();
    rows.push(row(&["Basic Information"]));
    rows.push(row(&["Volume (mm³)", volume.as_str()]));
    rows.push(row(&["Modified", yes_no(info.modified).as_str()]));
    rows.push(row(&[
        "Segments Count",
        segmentation.segments.len().to_string().as_str(),
    ]));

    // 参考信息
    if let Some(reference) = &info.reference {
        rows.push(Vec::new());
        rows.push(row(&["Reference Information"]));
        let keys = [
            ("Series Number", &reference.series_number),
            ("Series Instance UID", &reference.series_instance_uid),
            ("Study Instance UID", &reference.study_instance_uid),
            ("Series Date", &reference.series_date),
            ("Series Time", &reference.series_time),
            ("Series Description", &reference.series_description),
        ];
        for (key, value) in keys {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                rows.push(vec![format!("reference {}", key), value.to_string()]);
            }
        }
    }

    rows.push(Vec::new());
    rows.push(row(&["Segments Statistics"]));

    let segments: Vec<(u32, &Segment)> = segmentation
        .segments
        .iter()
        .map(|(&n, s)| (n, s))
        .collect();

    let column_row = |title: &str, cell: &dyn Fn(&Segment) -> String| {
        std::iter::once(title.to_string())
            .chain(segments.iter().map(|(_, s)| cell(s)))
            .collect::<Vec<_>>()
    };

    rows.push(column_row("Label", &|s: &Segment| s.label.clone()));
    rows.push(column_row("Segment Index", &|s: &Segment| {
        if s.segment_index == 0 {
            String::new()
        } else {
            s.segment_index.to_string()
        }
    }));
    rows.push(column_row("Locked", &|s: &Segment| yes_no(s.locked)));
    rows.push(column_row("Active", &|s: &Segment| yes_no(s.active)));

    // 所有段出现过的统计名，保持首次出现顺序
    let mut stat_names: Vec<String> = Vec::new();
    for (number, segment) in &segments {
        for stat in segment_named_stats(*number, segment, computed) {
            let name = stat.display_name();
            if !stat_names.contains(&name) {
                stat_names.push(name);
            }
        }
    }

    for stat_name in stat_names {
        let mut stat_row = vec![stat_name.clone()];
        for (number, segment) in &segments {
            let value = segment_named_stats(*number, segment, computed)
                .iter()
                .find(|s| s.display_name() == stat_name)
                .map(|s| value_cell(s.value.as_ref()))
                .unwrap_or_default();
            stat_row.push(value);
        }
        rows.push(stat_row);
    }

    rows
}

/// 渲染为 CSV 文本，每行以 `\n` 结尾
pub fn render_csv(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            let cells: Vec<Cow<'_, str>> = row.iter().map(|c| escape_cell(c)).collect();
            format!("{}\n", cells.join(","))
        })
        .collect()
}

/// 报告文件名 `<label>_stats.csv`，名称为空时使用 `segmentation`
///
/// 名称中的路径分隔符会被替换，报告总是落在输出目录内
pub fn report_file_name(segmentation: &Segmentation) -> String {
    let base = if segmentation.label.is_empty() {
        "segmentation"
    } else {
        segmentation.label.as_str()
    };
    format!("{}_stats.csv", sanitize_file_name(base))
}

/// 写出报告文件，返回完整路径
pub async fn write_report(output_dir: &Path, file_name: &str, csv: &str) -> AppResult<PathBuf> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| AppError::file_write_failed(output_dir.display().to_string(), e))?;

    let path = output_dir.join(file_name);
    fs::write(&path, csv)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    info!("✓ 统计报告已保存: {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::segmentation::{ReferenceInfo, SegmentStats, SegmentationStats};
    use chrono::TimeZone;

    fn segmentation() -> Segmentation {
        let liver = Segment {
            segment_index: 1,
            label: "Liver".into(),
            active: true,
            cached_stats: Some(SegmentStats {
                named_stats: vec![
                    NamedStat::new("mean", 55.5).with_label("Mean").with_unit("HU"),
                    NamedStat::new("volume", 1200).with_label("Volume").with_unit("mm³"),
                ],
            }),
            ..Default::default()
        };
        let tumor = Segment {
            segment_index: 2,
            label: "Tumor, left".into(),
            locked: true,
            cached_stats: Some(SegmentStats {
                named_stats: vec![NamedStat::new("volume", 30.5)
                    .with_label("Volume")
                    .with_unit("mm³")],
            }),
            ..Default::default()
        };

        Segmentation {
            id: "seg-1".into(),
            label: "Liver Seg".into(),
            segments: [(1, liver), (2, tumor)].into_iter().collect(),
            cached_stats: Some(SegmentationStats {
                volume: Some(1230.5),
                modified: true,
                reference: Some(ReferenceInfo {
                    series_number: Some("3".into()),
                    series_description: Some("CT, arterial".into()),
                    ..Default::default()
                }),
            }),
            ..Default::default()
        }
    }

    fn generated_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap()
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a,b"), "\"a,b\"");
        assert_eq!(escape_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_cell("two\nlines"), "\"two\nlines\"");
        assert_eq!(escape_cell("cr\rhere"), "\"cr\rhere\"");
        assert!(matches!(escape_cell("plain"), Cow::Borrowed("plain")));
    }

    #[test]
    fn test_report_layout() {
        let rows = build_rows(&segmentation(), "seg-1", generated_at(), None);
        let csv = render_csv(&rows);
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "Segmentation Statistics Export");
        assert_eq!(lines[1], "Generated on,2026-10-19T08:30:15.000Z");
        assert_eq!(lines[2], "Segmentation ID,seg-1");
        assert_eq!(lines[3], "Segmentation Label,Liver Seg");
        assert_eq!(lines[4], "");
        assert_eq!(lines[5], "Basic Information");
        assert_eq!(lines[6], "Volume (mm³),1230.5");
        assert_eq!(lines[7], "Modified,Yes");
        assert_eq!(lines[8], "Segments Count,2");
        assert_eq!(lines[9], "");
        assert_eq!(lines[10], "Reference Information");
        assert_eq!(lines[11], "reference Series Number,3");
        assert_eq!(lines[12], "reference Series Description,\"CT, arterial\"");
        assert_eq!(lines[13], "");
        assert_eq!(lines[14], "Segments Statistics");
        assert_eq!(lines[15], "Label,Liver,\"Tumor, left\"");
        assert_eq!(lines[16], "Segment Index,1,2");
        assert_eq!(lines[17], "Locked,No,Yes");
        assert_eq!(lines[18], "Active,Yes,No");
        assert_eq!(lines[19], "Mean (HU),55.5,");
        assert_eq!(lines[20], "Volume (mm³),1200,30.5");
        assert_eq!(lines.len(), 21);
        assert!(csv.ends_with('\n'));
    }

    #[test]
    fn test_missing_stats_and_reference() {
        let mut seg = segmentation();
        seg.cached_stats = None;
        for segment in seg.segments.values_mut() {
            segment.cached_stats = None;
        }

        let rows = build_rows(&seg, "seg-1", generated_at(), None);
        assert_eq!(rows[6], vec!["Volume (mm³)".to_string(), String::new()]);
        assert_eq!(rows[7][1], "No");
        assert!(!rows.iter().any(|r| r.first().map(String::as_str) == Some("Reference Information")));
        assert_eq!(rows.last().unwrap()[0], "Active");
    }

    #[test]
    fn test_computed_stats_fill_segments_without_cache() {
        let mut seg = segmentation();
        seg.segments.get_mut(&2).unwrap().cached_stats = None;
        let computed: BTreeMap<u32, Vec<NamedStat>> = [(
            2,
            vec![NamedStat::new("voxelCount", 7).with_label("Voxel Count")],
        )]
        .into_iter()
        .collect();

        let rows = build_rows(&seg, "seg-1", generated_at(), Some(&computed));
        let voxel_row = rows
            .iter()
            .find(|r| r.first().map(String::as_str) == Some("Voxel Count"))
            .unwrap();
        assert_eq!(voxel_row, &vec!["Voxel Count".to_string(), String::new(), "7".into()]);
    }

    #[test]
    fn test_report_file_name() {
        let mut seg = segmentation();
        assert_eq!(report_file_name(&seg), "Liver Seg_stats.csv");
        seg.label.clear();
        assert_eq!(report_file_name(&seg), "segmentation_stats.csv");
        seg.label = "Liver/Kidney".into();
        assert_eq!(report_file_name(&seg), "Liver_Kidney_stats.csv");
        seg.label = "../escape".into();
        assert_eq!(report_file_name(&seg), ".._escape_stats.csv");
    }

    #[tokio::test]
    async fn test_write_report_with_separator_in_label() {
        let dir = std::env::temp_dir().join(format!("xnat_csv_sep_{}", std::process::id()));
        let mut seg = segmentation();
        seg.label = "Liver/Kidney".into();

        let path = write_report(&dir, &report_file_name(&seg), "a\n").await.unwrap();
        assert_eq!(path.parent(), Some(dir.as_path()));
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "a\n");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = std::env::temp_dir().join(format!("xnat_csv_{}", std::process::id()));
        let path = write_report(&dir, "x_stats.csv", "a,b\n").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
        std::fs::remove_dir_all(&dir).ok();
    }
}
