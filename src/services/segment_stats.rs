//! 段统计：体素数与体积
//!
//! 体积 = 体素数 × 像素间距 × 层厚，间距或层厚缺失时只给出体素数

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::infrastructure::registry::ImageCache;
use crate::models::segmentation::{CachedImage, NamedStat, Segmentation};
use crate::services::seg_generator::labelmap_image_ids;

/// 计算每个段的统计值
pub fn compute_segment_stats(
    segmentation: &Segmentation,
    cache: &dyn ImageCache,
) -> AppResult<BTreeMap<u32, Vec<NamedStat>>> {
    let image_ids = labelmap_image_ids(segmentation, cache)?;

    let mut voxel_counts: BTreeMap<u32, u64> =
        segmentation.segments.keys().map(|&n| (n, 0)).collect();
    let mut voxel_volume: Option<f64> = None;

    for image_id in &image_ids {
        let image = cache
            .get_image(image_id)
            .ok_or_else(|| AppError::image_not_found(image_id))?;

        for &value in &image.pixel_data {
            if value != 0 {
                if let Some(count) = voxel_counts.get_mut(&(value as u32)) {
                    *count += 1;
                }
            }
        }

        if voxel_volume.is_none() {
            voxel_volume = voxel_size(image).or_else(|| {
                image
                    .referenced_image_id
                    .as_deref()
                    .and_then(|id| cache.get_image(id))
                    .and_then(voxel_size)
            });
        }
    }

    debug!(
        "分割 {} 体素统计: {:?}, 体素体积 {:?}",
        segmentation.id, voxel_counts, voxel_volume
    );

    Ok(voxel_counts
        .into_iter()
        .map(|(number, count)| {
            let mut stats = vec![NamedStat::new("voxelCount", count).with_label("Voxel Count")];
            if let Some(size) = voxel_volume {
                stats.push(
                    NamedStat::new("volume", round3(count as f64 * size))
                        .with_label("Volume")
                        .with_unit("mm³"),
                );
            }
            (number, stats)
        })
        .collect())
}

fn voxel_size(image: &CachedImage) -> Option<f64> {
    let [row_spacing, column_spacing] = image.pixel_spacing?;
    Some(row_spacing * column_spacing * image.slice_thickness?)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::viewer_state::ViewerState;
    use crate::models::segmentation::{
        LabelmapRepresentation, RepresentationData, Segment,
    };
    use crate::models::snapshot::ViewerSnapshot;

    fn segmentation() -> Segmentation {
        Segmentation {
            id: "seg-1".into(),
            label: "Liver".into(),
            segments: (1..=3)
                .map(|n| {
                    (
                        n,
                        Segment {
                            segment_index: n,
                            ..Default::default()
                        },
                    )
                })
                .collect(),
            representation_data: RepresentationData {
                labelmap: Some(LabelmapRepresentation {
                    image_ids: Some(vec!["lm-0".into()]),
                    volume_id: None,
                }),
            },
            cached_stats: None,
        }
    }

    fn state(source: CachedImage) -> ViewerState {
        ViewerState::from_snapshot(ViewerSnapshot {
            segmentations: vec![segmentation()],
            images: vec![
                CachedImage {
                    image_id: "lm-0".into(),
                    referenced_image_id: Some("src-0".into()),
                    rows: 2,
                    columns: 2,
                    pixel_data: vec![1, 1, 2, 0],
                    ..Default::default()
                },
                source,
            ],
            ..Default::default()
        })
    }

    #[test]
    fn test_voxel_count_and_volume() {
        let state = state(CachedImage {
            image_id: "src-0".into(),
            pixel_spacing: Some([0.5, 0.5]),
            slice_thickness: Some(2.0),
            ..Default::default()
        });

        let stats = compute_segment_stats(&segmentation(), &state).unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[&1][0].value, Some(serde_json::json!(2)));
        assert_eq!(stats[&1][1].value, Some(serde_json::json!(1.0)));
        assert_eq!(stats[&1][1].display_name(), "Volume (mm³)");
        assert_eq!(stats[&3][0].value, Some(serde_json::json!(0)));
    }

    #[test]
    fn test_volume_omitted_without_spacing() {
        let state = state(CachedImage {
            image_id: "src-0".into(),
            ..Default::default()
        });

        let stats = compute_segment_stats(&segmentation(), &state).unwrap();
        assert_eq!(stats[&2].len(), 1);
        assert_eq!(stats[&2][0].display_name(), "Voxel Count");
    }
}
