//! 分割数据及其在图像缓存中的 labelmap

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 命名统计值（如 "Mean"、"Volume"）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedStat {
    pub name: String,
    pub label: Option<String>,
    pub value: Option<serde_json::Value>,
    pub unit: Option<String>,
}

impl NamedStat {
    pub fn new(name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            name: name.into(),
            label: None,
            value: Some(value.into()),
            unit: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// 报表中的行名: `label (unit)`，无 label 时用 name
    pub fn display_name(&self) -> String {
        let label = self.label.as_deref().unwrap_or(&self.name);
        match &self.unit {
            Some(unit) => format!("{} ({})", label, unit),
            None => label.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentStats {
    #[serde(default)]
    pub named_stats: Vec<NamedStat>,
}

/// 单个分割段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    pub segment_index: u32,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub locked: bool,
    /// RGBA 0-255
    pub color: Option<[u8; 4]>,
    pub algorithm_type: Option<String>,
    pub algorithm_name: Option<String>,
    pub cached_stats: Option<SegmentStats>,
}

/// 分割所引用的原始序列信息
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferenceInfo {
    #[serde(rename = "SeriesNumber")]
    pub series_number: Option<String>,
    #[serde(rename = "SeriesInstanceUID")]
    pub series_instance_uid: Option<String>,
    #[serde(rename = "StudyInstanceUID")]
    pub study_instance_uid: Option<String>,
    #[serde(rename = "SeriesDate")]
    pub series_date: Option<String>,
    #[serde(rename = "SeriesTime")]
    pub series_time: Option<String>,
    #[serde(rename = "SeriesDescription")]
    pub series_description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationStats {
    pub volume: Option<f64>,
    #[serde(default)]
    pub modified: bool,
    pub reference: Option<ReferenceInfo>,
}

/// labelmap 表示：按图像 ID 列表或按体数据 ID 间接定位
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelmapRepresentation {
    pub image_ids: Option<Vec<String>>,
    pub volume_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepresentationData {
    #[serde(rename = "Labelmap")]
    pub labelmap: Option<LabelmapRepresentation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segmentation {
    #[serde(rename = "segmentationId")]
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// segmentIndex → Segment，按索引有序
    #[serde(default)]
    pub segments: BTreeMap<u32, Segment>,
    #[serde(default)]
    pub representation_data: RepresentationData,
    pub cached_stats: Option<SegmentationStats>,
}

/// 分割在某个视口中的显示表示
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationRepresentation {
    pub viewport_id: String,
    pub segmentation_id: String,
    /// segmentIndex → RGBA
    #[serde(default)]
    pub segment_colors: BTreeMap<u32, [u8; 4]>,
}

/// 图像缓存中的单幅图像
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedImage {
    pub image_id: String,
    /// 分割图像所对应的原始图像
    pub referenced_image_id: Option<String>,
    pub rows: u32,
    pub columns: u32,
    /// 分割图像的体素标签值，原始图像可为空
    #[serde(default)]
    pub pixel_data: Vec<u8>,
    #[serde(rename = "SOPInstanceUID")]
    pub sop_instance_uid: Option<String>,
    #[serde(rename = "SOPClassUID")]
    pub sop_class_uid: Option<String>,
    #[serde(rename = "FrameOfReferenceUID")]
    pub frame_of_reference_uid: Option<String>,
    #[serde(rename = "ImagePositionPatient")]
    pub image_position_patient: Option<[f64; 3]>,
    #[serde(rename = "PixelSpacing")]
    pub pixel_spacing: Option<[f64; 2]>,
    #[serde(rename = "SliceThickness")]
    pub slice_thickness: Option<f64>,
}

/// 体数据：按切片顺序排列的图像 ID
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedVolume {
    pub volume_id: String,
    #[serde(default)]
    pub image_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_stat_display_name() {
        let stat = NamedStat::new("mean", 12.5).with_label("Mean").with_unit("HU");
        assert_eq!(stat.display_name(), "Mean (HU)");

        let bare = NamedStat::new("count", 3);
        assert_eq!(bare.display_name(), "count");
    }

    #[test]
    fn test_segments_are_ordered_by_index() {
        let seg: Segmentation = serde_json::from_str(
            r#"{
                "segmentationId": "seg-1",
                "label": "Liver",
                "segments": {
                    "2": { "segmentIndex": 2, "label": "Tumor" },
                    "1": { "segmentIndex": 1, "label": "Liver" }
                },
                "representationData": { "Labelmap": { "volumeId": "vol-1" } }
            }"#,
        )
        .unwrap();

        let labels: Vec<_> = seg.segments.values().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Liver", "Tumor"]);
        assert_eq!(
            seg.representation_data.labelmap.unwrap().volume_id.as_deref(),
            Some("vol-1")
        );
    }
}
