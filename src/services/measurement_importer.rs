//! 测量集合导入
//!
//! 把 XNAT 上的测量集合 JSON 还原为查看器测量：
//! - 点：按工具的命名句柄顺序取，否则取全部句柄；轮廓工具取 polyline
//! - 帧号：测量自身的图像引用，缺失时查集合的 imageCollection
//! - 缓存统计：由 measurements 数组重建

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::models::collection::{Handle, ImageMeasurement, MeasurementCollection, MeasurementValue};
use crate::models::measurement::{CachedStats, Measurement, Point};
use crate::models::tool_type::ToolType;

/// 解析测量集合
pub fn import_collection(bytes: &[u8]) -> AppResult<Vec<Measurement>> {
    let collection: MeasurementCollection = serde_json::from_slice(bytes)?;

    let frames: HashMap<&str, u32> = collection
        .image_reference
        .image_collection
        .iter()
        .map(|e| (e.sop_instance_uid.as_str(), e.frame_index))
        .collect();

    let measurements: Vec<Measurement> = collection
        .image_measurements
        .iter()
        .map(|im| import_measurement(im, &collection, &frames))
        .collect();

    info!(
        "✓ 已导入集合 {}: {} 个测量",
        collection.name,
        measurements.len()
    );
    Ok(measurements)
}

fn import_measurement(
    im: &ImageMeasurement,
    collection: &MeasurementCollection,
    frames: &HashMap<&str, u32>,
) -> Measurement {
    let tool_type = ToolType::from_name(&im.tool_type);
    let sop_instance_uid = im.image_reference.sop_instance_uid.clone();
    let frame = match im.image_reference.frame_index {
        0 => frames.get(sop_instance_uid.as_str()).copied().unwrap_or(0),
        n => n,
    };

    let points = import_points(im, tool_type);
    if points.is_empty() {
        warn!("测量 {} ({}) 没有可用的点", im.uuid, im.tool_type);
    }
    debug!("导入测量 {}: {} 个点", im.uuid, points.len());

    Measurement {
        uid: Some(im.uuid.clone()),
        tool_name: Some(im.tool_type.clone()),
        label: Some(im.name.clone()).filter(|n| !n.is_empty()),
        color: Some(im.color.clone()),
        text: im.data.text.clone(),
        points,
        sop_instance_uid,
        frame_number: Some(frame),
        frame_of_reference_uid: im.frame_of_reference_uid.clone(),
        metadata: None,
        reference_study_uid: Some(collection.image_reference.study_instance_uid.clone()),
        reference_series_uid: Some(collection.image_reference.series_instance_uid.clone()),
        cached_stats: rebuild_stats(&im.measurements, im.data.length),
        display_text: None,
    }
}

fn import_points(im: &ImageMeasurement, tool_type: ToolType) -> Vec<Point> {
    if tool_type.is_contour() || !im.data.polyline.is_empty() {
        return im.data.polyline.iter().copied().map(Point::from).collect();
    }

    let handles = &im.data.handles;
    let named: Option<Vec<Point>> = {
        let names = tool_type.handle_names();
        (!names.is_empty())
            .then(|| {
                names
                    .iter()
                    .map(|name| handles.get(*name).copied().map(Point::from))
                    .collect::<Option<Vec<Point>>>()
            })
            .flatten()
    };

    match (tool_type, named) {
        (ToolType::EllipticalRoi, Some(points)) => ellipse_axes(points[0], points[1]),
        (ToolType::RectangleRoi, Some(points)) => rectangle_corners(points[0], points[1]),
        (_, Some(points)) => points,
        (_, None) => ordered_handles(handles),
    }
}

/// 句柄按名称排序，`pointN` 按数字顺序
fn ordered_handles(handles: &BTreeMap<String, Handle>) -> Vec<Point> {
    let mut entries: Vec<(&String, &Handle)> = handles.iter().collect();
    entries.sort_by_key(|(name, _)| {
        let index = name
            .strip_prefix("point")
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(u32::MAX);
        (index, name.to_string())
    });
    entries.into_iter().map(|(_, h)| Point::from(*h)).collect()
}

/// 由中心和角点还原椭圆的四个轴端点
fn ellipse_axes(center: Point, corner: Point) -> Vec<Point> {
    let (hx, hy) = (corner.x - center.x, corner.y - center.y);
    let z = center.z;
    vec![
        Point::new(center.x, center.y - hy, z),
        Point::new(center.x, center.y + hy, z),
        Point::new(center.x - hx, center.y, z),
        Point::new(center.x + hx, center.y, z),
    ]
}

/// 由对角点还原矩形四角，`end` 位于下标 2
fn rectangle_corners(start: Point, end: Point) -> Vec<Point> {
    vec![
        start,
        Point::new(end.x, start.y, start.z),
        end,
        Point::new(start.x, end.y, end.z),
    ]
}

fn rebuild_stats(values: &[MeasurementValue], data_length: Option<f64>) -> Option<CachedStats> {
    if values.is_empty() && data_length.is_none() {
        return None;
    }

    let mut stats = CachedStats {
        length: data_length,
        ..Default::default()
    };
    for v in values {
        let unit = (!v.unit.is_empty()).then(|| v.unit.clone());
        match v.name.as_str() {
            "length" | "longestDiameter" => stats.length = Some(v.value),
            "shortestDiameter" => stats.width = Some(v.value),
            "angle" | "cobbAngle" => stats.angle = Some(v.value),
            "perimeter" => stats.perimeter = Some(v.value),
            "area" => {
                stats.area = Some(v.value);
                stats.area_unit = unit;
            }
            "mean" | "stdDev" | "max" | "min" | "value" => {
                let slot = match v.name.as_str() {
                    "mean" => &mut stats.mean,
                    "stdDev" => &mut stats.std_dev,
                    "max" => &mut stats.max,
                    "min" => &mut stats.min,
                    _ => &mut stats.value,
                };
                *slot = Some(v.value);
                if stats.modality_unit.is_none() {
                    stats.modality_unit = unit;
                }
            }
            other => debug!("忽略未知统计项 {}", other),
        }
    }
    Some(stats)
}
