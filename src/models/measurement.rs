//! 测量数据（来自查看器的测量登记表，只读）

use serde::{Deserialize, Serialize};

use crate::models::tool_type::ToolType;

/// 世界坐标点，缺失的 z 分量按 0 处理
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<f64>", into = "[f64; 3]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec<f64>> for Point {
    fn from(v: Vec<f64>) -> Self {
        let at = |i: usize| v.get(i).copied().unwrap_or(0.0);
        Self::new(at(0), at(1), at(2))
    }
}

impl From<Point> for [f64; 3] {
    fn from(p: Point) -> Self {
        [p.x, p.y, p.z]
    }
}

/// 渲染库为测量预先计算的统计值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedStats {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub area: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub max: Option<f64>,
    pub min: Option<f64>,
    pub angle: Option<f64>,
    pub perimeter: Option<f64>,
    pub radius: Option<f64>,
    pub value: Option<f64>,
    pub modality_unit: Option<String>,
    pub area_unit: Option<String>,
}

/// 测量在界面上显示的文本
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplayText {
    #[serde(default)]
    pub primary: Vec<String>,
    #[serde(default)]
    pub secondary: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementMetadata {
    #[serde(rename = "FrameOfReferenceUID")]
    pub frame_of_reference_uid: Option<String>,
}

/// 单个测量
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub uid: Option<String>,
    pub tool_name: Option<String>,
    pub label: Option<String>,
    pub color: Option<String>,
    /// 箭头标注的文字
    pub text: Option<String>,
    #[serde(default)]
    pub points: Vec<Point>,
    #[serde(rename = "SOPInstanceUID")]
    pub sop_instance_uid: String,
    pub frame_number: Option<u32>,
    #[serde(rename = "FrameOfReferenceUID")]
    pub frame_of_reference_uid: Option<String>,
    pub metadata: Option<MeasurementMetadata>,
    #[serde(rename = "referenceStudyUID")]
    pub reference_study_uid: Option<String>,
    #[serde(rename = "referenceSeriesUID")]
    pub reference_series_uid: Option<String>,
    pub cached_stats: Option<CachedStats>,
    pub display_text: Option<DisplayText>,
}

impl Measurement {
    pub fn tool_type(&self) -> ToolType {
        self.tool_name
            .as_deref()
            .map(ToolType::from_name)
            .unwrap_or(ToolType::Unknown)
    }

    /// 帧索引（0 起始），缺失为 0
    pub fn frame_index(&self) -> u32 {
        self.frame_number.unwrap_or(0)
    }

    /// 测量自身的 FrameOfReferenceUID，缺失时取 metadata 中的值
    pub fn resolved_frame_of_reference_uid(&self) -> Option<&str> {
        self.frame_of_reference_uid.as_deref().or_else(|| {
            self.metadata
                .as_ref()
                .and_then(|m| m.frame_of_reference_uid.as_deref())
        })
    }
}
