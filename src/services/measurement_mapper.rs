//! 测量映射 - 业务能力层
//!
//! 把查看器中的测量（工具类型 + 点 + 缓存统计）转换为 XNAT 测量集合中的固定结构。
//! 每种工具一个映射函数；点数不足时 `data` 为空，未知工具按通用点集导出。
//! 输入只读，不修改任何测量对象

use tracing::debug;

use crate::models::collection::{
    Handle, ImageCollectionEntry, ImageMeasurement, MeasurementData, MeasurementValue,
};
use crate::models::measurement::{CachedStats, Measurement, Point};
use crate::models::tool_type::ToolType;
use crate::services::display_text::{first_primary, parse_angle_deg, parse_length_mm};
use crate::services::uid::new_dicom_uid;

const DEFAULT_COLOR: &str = "#FF0000";

/// 单个工具的映射结果
#[derive(Debug, Default)]
struct ToolMapping {
    data: MeasurementData,
    measurements: Vec<MeasurementValue>,
}

/// 映射单个测量
pub fn map_measurement(m: &Measurement) -> ImageMeasurement {
    let tool_type = m.tool_type();
    let tool_name = m.tool_name.clone().unwrap_or_else(|| "Unknown".to_string());

    debug!(
        "映射测量 {:?}: 工具={} ({}), 点数={}, 缓存统计={}",
        m.uid,
        tool_name,
        tool_type,
        m.points.len(),
        m.cached_stats.is_some()
    );

    let mapping = match tool_type {
        ToolType::Length => map_length(m),
        ToolType::Bidirectional => map_bidirectional(m),
        ToolType::Angle => map_angle(m),
        ToolType::CobbAngle => map_cobb_angle(m),
        ToolType::EllipticalRoi => map_elliptical_roi(m),
        ToolType::CircleRoi => map_circle_roi(m),
        ToolType::RectangleRoi => map_rectangle_roi(m),
        ToolType::ArrowAnnotate => map_arrow_annotate(m),
        ToolType::Probe => map_probe(m),
        ToolType::PlanarFreehandRoi | ToolType::SplineRoi | ToolType::LivewireContour => {
            map_contour(m)
        }
        ToolType::Unknown => {
            debug!("未识别的工具类型 {}，使用通用点集结构", tool_name);
            Some(map_generic(m))
        }
    }
    .unwrap_or_default();

    ImageMeasurement {
        uuid: m.uid.clone().unwrap_or_else(new_dicom_uid),
        name: m
            .label
            .clone()
            .or_else(|| m.tool_name.clone())
            .unwrap_or_default(),
        tool_type: tool_name,
        description: String::new(),
        coding_sequence: Vec::new(),
        color: m.color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        line_thickness: 1,
        dashed_line: false,
        visible: true,
        frame_of_reference_uid: m.resolved_frame_of_reference_uid().map(str::to_string),
        image_reference: ImageCollectionEntry {
            sop_instance_uid: m.sop_instance_uid.clone(),
            frame_index: m.frame_index(),
        },
        viewport: serde_json::Map::new(),
        data: mapping.data,
        measurements: mapping.measurements,
    }
}

/// 映射全部测量
pub fn map_measurements(measurements: &[Measurement]) -> Vec<ImageMeasurement> {
    measurements.iter().map(map_measurement).collect()
}

// ========== 各工具的映射 ==========

fn map_length(m: &Measurement) -> Option<ToolMapping> {
    let [start, end, ..] = m.points[..] else {
        return None;
    };

    let length = match &m.cached_stats {
        Some(stats) => stats.length.unwrap_or(0.0),
        None => first_primary(m.display_text.as_ref())
            .and_then(parse_length_mm)
            .unwrap_or(0.0),
    };

    Some(ToolMapping {
        data: MeasurementData {
            length: Some(length),
            ..Default::default()
        }
        .with_handle("start", start)
        .with_handle("end", end),
        measurements: vec![MeasurementValue::new("length", length, "mm")],
    })
}

fn map_bidirectional(m: &Measurement) -> Option<ToolMapping> {
    let [start, end, start2, end2, ..] = m.points[..] else {
        return None;
    };

    let stats = m.cached_stats.as_ref();
    let longest = stats.and_then(|s| s.length).unwrap_or(0.0);
    let shortest = stats.and_then(|s| s.width).unwrap_or(0.0);

    Some(ToolMapping {
        data: MeasurementData {
            longest_diameter: Some(longest),
            shortest_diameter: Some(shortest),
            ..Default::default()
        }
        .with_handle("start", start)
        .with_handle("end", end)
        .with_handle("start2", start2)
        .with_handle("end2", end2),
        measurements: vec![
            MeasurementValue::new("longestDiameter", longest, "mm"),
            MeasurementValue::new("shortestDiameter", shortest, "mm"),
        ],
    })
}

fn map_angle(m: &Measurement) -> Option<ToolMapping> {
    let [start, middle, end, ..] = m.points[..] else {
        return None;
    };

    let angle = match &m.cached_stats {
        Some(stats) => stats.angle.unwrap_or(0.0),
        None => first_primary(m.display_text.as_ref())
            .and_then(parse_angle_deg)
            .unwrap_or(0.0),
    };

    Some(ToolMapping {
        data: MeasurementData::default()
            .with_handle("start", start)
            .with_handle("middle", middle)
            .with_handle("end", end),
        measurements: vec![MeasurementValue::new("angle", angle, "deg")],
    })
}

fn map_cobb_angle(m: &Measurement) -> Option<ToolMapping> {
    let [start, end, start2, end2, ..] = m.points[..] else {
        return None;
    };

    let angle = m
        .cached_stats
        .as_ref()
        .and_then(|s| s.angle)
        .unwrap_or(0.0);

    Some(ToolMapping {
        data: MeasurementData::default()
            .with_handle("start", start)
            .with_handle("end", end)
            .with_handle("start2", start2)
            .with_handle("end2", end2),
        measurements: vec![MeasurementValue::new("cobbAngle", angle, "deg")],
    })
}

fn map_elliptical_roi(m: &Measurement) -> Option<ToolMapping> {
    if m.points.len() < 4 {
        return None;
    }

    // 四个轴端点的包围盒: start = 中心, end = 中心 + 半轴
    let (min_x, max_x, min_y, max_y) = m.points[..4].iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
        |(lx, hx, ly, hy), p| (lx.min(p.x), hx.max(p.x), ly.min(p.y), hy.max(p.y)),
    );
    let z = m.points[0].z;
    let center = Point::new((min_x + max_x) / 2.0, (min_y + max_y) / 2.0, z);
    let corner = Point::new(max_x, max_y, z);

    Some(ToolMapping {
        data: MeasurementData::default()
            .with_handle("start", center)
            .with_handle("end", corner),
        measurements: roi_statistics(m.cached_stats.as_ref()),
    })
}

fn map_circle_roi(m: &Measurement) -> Option<ToolMapping> {
    let [center, perimeter, ..] = m.points[..] else {
        return None;
    };

    Some(ToolMapping {
        data: MeasurementData::default()
            .with_handle("start", center)
            .with_handle("end", perimeter),
        measurements: roi_statistics(m.cached_stats.as_ref()),
    })
}

fn map_rectangle_roi(m: &Measurement) -> Option<ToolMapping> {
    if m.points.len() < 4 {
        return None;
    }

    Some(ToolMapping {
        data: MeasurementData::default()
            .with_handle("start", m.points[0])
            .with_handle("end", m.points[2]),
        measurements: roi_statistics(m.cached_stats.as_ref()),
    })
}

fn map_arrow_annotate(m: &Measurement) -> Option<ToolMapping> {
    let [start, end, ..] = m.points[..] else {
        return None;
    };

    Some(ToolMapping {
        data: MeasurementData {
            text: Some(m.text.clone().unwrap_or_default()),
            ..Default::default()
        }
        .with_handle("start", start)
        .with_handle("end", end),
        measurements: Vec::new(),
    })
}

fn map_probe(m: &Measurement) -> Option<ToolMapping> {
    let start = *m.points.first()?;

    let measurements = m
        .cached_stats
        .as_ref()
        .and_then(|s| {
            s.value.map(|v| {
                MeasurementValue::new("value", v, s.modality_unit.clone().unwrap_or_default())
            })
        })
        .into_iter()
        .collect();

    Some(ToolMapping {
        data: MeasurementData::default().with_handle("start", start),
        measurements,
    })
}

fn map_contour(m: &Measurement) -> Option<ToolMapping> {
    if m.points.is_empty() {
        return None;
    }

    let closed = m.tool_type() != ToolType::LivewireContour || is_closed(&m.points);
    let mut measurements = roi_statistics(m.cached_stats.as_ref());
    if let Some(perimeter) = m.cached_stats.as_ref().and_then(|s| s.perimeter) {
        measurements.push(MeasurementValue::new("perimeter", perimeter, "mm"));
    }

    Some(ToolMapping {
        data: MeasurementData {
            polyline: m.points.iter().copied().map(Handle::from).collect(),
            closed: Some(closed),
            ..Default::default()
        },
        measurements,
    })
}

fn map_generic(m: &Measurement) -> ToolMapping {
    let data = m
        .points
        .iter()
        .enumerate()
        .fold(MeasurementData::default(), |data, (idx, p)| {
            data.with_handle(&format!("point{}", idx + 1), *p)
        });

    ToolMapping {
        data,
        measurements: Vec::new(),
    }
}

// ========== 辅助函数 ==========

/// ROI 统计: 面积（> 0 时）以及均值 / 标准差 / 最大 / 最小值
fn roi_statistics(stats: Option<&CachedStats>) -> Vec<MeasurementValue> {
    let Some(stats) = stats else {
        return Vec::new();
    };

    let mut values = Vec::new();
    if let Some(area) = stats.area.filter(|a| *a > 0.0) {
        let unit = stats.area_unit.as_deref().unwrap_or("mm²");
        values.push(MeasurementValue::new("area", area, unit));
    }

    let unit = stats.modality_unit.as_deref().unwrap_or("");
    for (name, value) in [
        ("mean", stats.mean),
        ("stdDev", stats.std_dev),
        ("max", stats.max),
        ("min", stats.min),
    ] {
        if let Some(value) = value {
            values.push(MeasurementValue::new(name, value, unit));
        }
    }
    values
}

fn is_closed(points: &[Point]) -> bool {
    match (points.first(), points.last()) {
        (Some(a), Some(b)) if points.len() > 2 => a == b,
        _ => false,
    }
}
