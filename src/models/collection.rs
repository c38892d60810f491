//! 导出到 XNAT 的测量集合 JSON 结构

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::measurement::Point;

/// 句柄坐标
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Handle {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl From<Point> for Handle {
    fn from(p: Point) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

impl From<Handle> for Point {
    fn from(h: Handle) -> Self {
        Point::new(h.x, h.y, h.z)
    }
}

/// 工具相关的几何数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortest_diameter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longest_diameter: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub handles: BTreeMap<String, Handle>,
    /// 轮廓工具的完整折线
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub polyline: Vec<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
}

impl MeasurementData {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_handle(mut self, name: &str, point: Point) -> Self {
        self.handles.insert(name.to_string(), point.into());
        self
    }
}

/// 单个数值结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementValue {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

impl MeasurementValue {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageCollectionEntry {
    #[serde(rename = "SOPInstanceUID")]
    pub sop_instance_uid: String,
    pub frame_index: u32,
}

/// 映射后的单条测量记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMeasurement {
    pub uuid: String,
    pub tool_type: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub coding_sequence: Vec<serde_json::Value>,
    pub color: String,
    pub line_thickness: u32,
    pub dashed_line: bool,
    pub visible: bool,
    #[serde(
        rename = "frameOfReferenceUID",
        skip_serializing_if = "Option::is_none"
    )]
    pub frame_of_reference_uid: Option<String>,
    pub image_reference: ImageCollectionEntry,
    #[serde(default)]
    pub viewport: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub data: MeasurementData,
    #[serde(default)]
    pub measurements: Vec<MeasurementValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub manufacturer_name: String,
    pub manufacturer_model_name: String,
    pub software_version: String,
}

impl Default for Equipment {
    fn default() -> Self {
        Self {
            manufacturer_name: "OHIF-XNAT".to_string(),
            manufacturer_model_name: "xnat_roi_export".to_string(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReference {
    #[serde(rename = "PatientID")]
    pub patient_id: String,
    #[serde(rename = "StudyInstanceUID")]
    pub study_instance_uid: String,
    #[serde(rename = "SeriesInstanceUID")]
    pub series_instance_uid: String,
    #[serde(rename = "Modality")]
    pub modality: String,
    #[serde(rename = "imageCollection", default)]
    pub image_collection: Vec<ImageCollectionEntry>,
}

/// 测量集合（导出结果）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementCollection {
    pub uuid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created: String,
    pub modified: String,
    #[serde(default)]
    pub revision: u32,
    #[serde(default)]
    pub equipment: Equipment,
    pub image_reference: ImageReference,
    #[serde(default)]
    pub image_measurements: Vec<ImageMeasurement>,
}
