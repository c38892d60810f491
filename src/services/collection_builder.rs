//! 测量集合组装 - 业务能力层
//!
//! 负责：
//! - 汇总测量引用的图像（去重，保持首次出现顺序）
//! - 组装 `MeasurementCollection` 并序列化为上传用的 JSON

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use tracing::{debug, info};

use crate::error::AppResult;
use crate::models::collection::{
    Equipment, ImageCollectionEntry, ImageReference, MeasurementCollection,
};
use crate::models::measurement::Measurement;
use crate::models::session::DisplaySetInfo;
use crate::services::measurement_mapper::map_measurements;
use crate::services::uid::new_dicom_uid;

/// 集合时间戳格式 `YYYYMMDDHHmmss.SSS`，按 `now` 所在时区的钟面时间输出
pub fn format_collection_timestamp<Tz: TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format("%Y%m%d%H%M%S%.3f").to_string()
}

/// 测量引用的图像列表
///
/// 每个 SOP Instance UID 只出现一次，按首次出现排序；
/// 同一图像被多次引用时取最后一次的帧号
pub fn image_collection(measurements: &[Measurement]) -> Vec<ImageCollectionEntry> {
    let mut entries: Vec<ImageCollectionEntry> = Vec::new();

    for m in measurements {
        match entries
            .iter_mut()
            .find(|e| e.sop_instance_uid == m.sop_instance_uid)
        {
            Some(entry) => entry.frame_index = m.frame_index(),
            None => entries.push(ImageCollectionEntry {
                sop_instance_uid: m.sop_instance_uid.clone(),
                frame_index: m.frame_index(),
            }),
        }
    }

    entries
}

/// 组装测量集合
pub fn build_collection(
    measurements: &[Measurement],
    display_set: &DisplaySetInfo,
    label: &str,
    now: DateTime<Utc>,
) -> MeasurementCollection {
    // created / modified 使用本地时间
    let timestamp = format_collection_timestamp(now.with_timezone(&Local));
    let image_collection = image_collection(measurements);
    let mut image_measurements = map_measurements(measurements);

    // 记录的帧号与 imageCollection 中同一图像的帧号保持一致
    for record in &mut image_measurements {
        if let Some(entry) = image_collection
            .iter()
            .find(|e| e.sop_instance_uid == record.image_reference.sop_instance_uid)
        {
            record.image_reference.frame_index = entry.frame_index;
        }
    }

    debug!(
        "组装集合 {}: {} 个测量, {} 幅图像",
        label,
        image_measurements.len(),
        image_collection.len()
    );

    MeasurementCollection {
        uuid: new_dicom_uid(),
        name: label.to_string(),
        description: String::new(),
        created: timestamp.clone(),
        modified: timestamp,
        revision: 1,
        equipment: Equipment::default(),
        image_reference: ImageReference {
            patient_id: display_set.patient_id.clone(),
            study_instance_uid: display_set.study_instance_uid.clone(),
            series_instance_uid: display_set.series_instance_uid.clone(),
            modality: display_set.modality.clone(),
            image_collection,
        },
        image_measurements,
    }
}

/// 序列化集合为上传载荷
pub fn package_collection(collection: &MeasurementCollection) -> AppResult<Vec<u8>> {
    let payload = serde_json::to_vec(collection)?;
    info!(
        "✓ 集合 {} 已打包 ({} 字节)",
        collection.name,
        payload.len()
    );
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::measurement::Point;
    use chrono::TimeZone;

    fn at(sop: &str, frame: Option<u32>) -> Measurement {
        Measurement {
            tool_name: Some("Probe".into()),
            points: vec![Point::new(1.0, 1.0, 0.0)],
            sop_instance_uid: sop.into(),
            frame_number: frame,
            ..Default::default()
        }
    }

    fn display_set() -> DisplaySetInfo {
        DisplaySetInfo {
            patient_id: "P001".into(),
            study_instance_uid: "1.2.1".into(),
            series_instance_uid: "1.2.1.1".into(),
            modality: "CT".into(),
        }
    }

    #[test]
    fn test_image_collection_is_distinct_in_first_seen_order() {
        let ms = vec![at("b", None), at("a", Some(2)), at("b", Some(4)), at("c", None)];
        let entries = image_collection(&ms);

        let sops: Vec<_> = entries.iter().map(|e| e.sop_instance_uid.as_str()).collect();
        assert_eq!(sops, vec!["b", "a", "c"]);
        assert_eq!(entries[0].frame_index, 4);
        assert_eq!(entries[1].frame_index, 2);
    }

    #[test]
    fn test_image_collection_empty() {
        assert!(image_collection(&[]).is_empty());
    }

    #[test]
    fn test_timestamp_format() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 5, 9).unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(format_collection_timestamp(now), "20261019080509.042");
    }

    #[test]
    fn test_timestamp_uses_wall_clock_of_zone() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap();
        let east8 = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
        assert_eq!(
            format_collection_timestamp(now.with_timezone(&east8)),
            "20261019163015.000"
        );
    }

    #[test]
    fn test_build_collection() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap();
        let ms = vec![at("a", None), at("a", None)];
        let collection = build_collection(&ms, &display_set(), "Liver", now);

        assert_eq!(collection.name, "Liver");
        assert_eq!(
            collection.created,
            format_collection_timestamp(now.with_timezone(&Local))
        );
        assert_eq!(collection.created, collection.modified);
        assert_eq!(collection.image_reference.modality, "CT");
        assert_eq!(collection.image_reference.image_collection.len(), 1);
        assert_eq!(collection.image_measurements.len(), 2);
    }

    #[test]
    fn test_records_share_frame_with_image_collection() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap();
        let ms = vec![at("a", Some(1)), at("a", Some(3)), at("b", Some(2))];
        let collection = build_collection(&ms, &display_set(), "Frames", now);

        let frames: Vec<u32> = collection
            .image_measurements
            .iter()
            .map(|r| r.image_reference.frame_index)
            .collect();
        assert_eq!(frames, vec![3, 3, 2]);
        assert_eq!(collection.image_reference.image_collection[0].frame_index, 3);
    }

    #[test]
    fn test_package_collection_schema_keys() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 15).unwrap();
        let collection = build_collection(&[at("a", Some(1))], &display_set(), "L", now);
        let payload = package_collection(&collection).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        assert_eq!(json["imageReference"]["PatientID"], "P001");
        assert_eq!(
            json["imageReference"]["imageCollection"][0]["SOPInstanceUID"],
            "a"
        );
        assert_eq!(json["imageReference"]["imageCollection"][0]["frameIndex"], 1);
        assert_eq!(json["imageMeasurements"][0]["toolType"], "Probe");
        assert_eq!(json["equipment"]["manufacturerName"], "OHIF-XNAT");
    }
}
