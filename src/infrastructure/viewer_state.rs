//! 查看器状态快照 - 基础设施层
//!
//! 从 JSON 快照加载测量、分割、图像缓存和会话信息，
//! 并以登记表 / 缓存 trait 的形式暴露给上层

use std::collections::{BTreeMap, HashMap};

use crate::error::{AppError, AppResult};
use crate::infrastructure::registry::{ImageCache, MeasurementRegistry, SegmentationRegistry};
use crate::models::measurement::Measurement;
use crate::models::segmentation::{
    CachedImage, CachedVolume, NamedStat, Segmentation, SegmentationRepresentation,
};
use crate::models::session::{DisplaySetInfo, SessionContext};
use crate::models::snapshot::ViewerSnapshot;
use crate::services::segment_stats::compute_segment_stats;

/// 已建立索引的查看器状态
#[derive(Debug, Clone, Default)]
pub struct ViewerState {
    display_set: DisplaySetInfo,
    session: SessionContext,
    measurements: Vec<Measurement>,
    segmentations: HashMap<String, Segmentation>,
    representations: Vec<SegmentationRepresentation>,
    images: HashMap<String, CachedImage>,
    volumes: HashMap<String, CachedVolume>,
}

impl ViewerState {
    pub fn from_snapshot(snapshot: ViewerSnapshot) -> Self {
        Self {
            display_set: snapshot.display_set,
            session: snapshot.session,
            measurements: snapshot.measurements,
            segmentations: snapshot
                .segmentations
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
            representations: snapshot.representations,
            images: snapshot
                .images
                .into_iter()
                .map(|i| (i.image_id.clone(), i))
                .collect(),
            volumes: snapshot
                .volumes
                .into_iter()
                .map(|v| (v.volume_id.clone(), v))
                .collect(),
        }
    }

    pub fn display_set(&self) -> &DisplaySetInfo {
        &self.display_set
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn segmentation_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.segmentations.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl MeasurementRegistry for ViewerState {
    fn get_measurements(&self) -> &[Measurement] {
        &self.measurements
    }
}

impl SegmentationRegistry for ViewerState {
    fn get_segmentation(&self, segmentation_id: &str) -> Option<&Segmentation> {
        self.segmentations.get(segmentation_id)
    }

    fn get_representations_for_segmentation(
        &self,
        segmentation_id: &str,
    ) -> Vec<&SegmentationRepresentation> {
        self.representations
            .iter()
            .filter(|r| r.segmentation_id == segmentation_id)
            .collect()
    }

    fn get_segment_color(
        &self,
        viewport_id: &str,
        segmentation_id: &str,
        segment_index: u32,
    ) -> Option<[u8; 4]> {
        self.representations
            .iter()
            .find(|r| r.viewport_id == viewport_id && r.segmentation_id == segmentation_id)
            .and_then(|r| r.segment_colors.get(&segment_index).copied())
    }

    fn calculate_segmentation_stats(
        &self,
        segmentation_id: &str,
    ) -> AppResult<BTreeMap<u32, Vec<NamedStat>>> {
        let segmentation = self
            .get_segmentation(segmentation_id)
            .ok_or_else(|| AppError::segmentation_not_found(segmentation_id))?;
        compute_segment_stats(segmentation, self)
    }
}

impl ImageCache for ViewerState {
    fn get_image(&self, image_id: &str) -> Option<&CachedImage> {
        self.images.get(image_id)
    }

    fn get_volume(&self, volume_id: &str) -> Option<&CachedVolume> {
        self.volumes.get(volume_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::segmentation::{LabelmapRepresentation, RepresentationData, Segment};

    fn state() -> ViewerState {
        let segmentation = Segmentation {
            id: "seg-b".into(),
            label: "Kidney".into(),
            segments: [(
                1,
                Segment {
                    segment_index: 1,
                    label: "Left".into(),
                    ..Default::default()
                },
            )]
            .into_iter()
            .collect(),
            representation_data: RepresentationData {
                labelmap: Some(LabelmapRepresentation {
                    image_ids: Some(vec!["lm-0".into()]),
                    volume_id: None,
                }),
            },
            cached_stats: None,
        };

        ViewerState::from_snapshot(ViewerSnapshot {
            segmentations: vec![
                segmentation,
                Segmentation {
                    id: "seg-a".into(),
                    ..Default::default()
                },
            ],
            representations: vec![
                SegmentationRepresentation {
                    viewport_id: "vp-1".into(),
                    segmentation_id: "seg-b".into(),
                    segment_colors: [(1, [10, 20, 30, 255])].into_iter().collect(),
                },
                SegmentationRepresentation {
                    viewport_id: "vp-2".into(),
                    segmentation_id: "seg-b".into(),
                    segment_colors: BTreeMap::new(),
                },
            ],
            images: vec![CachedImage {
                image_id: "lm-0".into(),
                rows: 1,
                columns: 3,
                pixel_data: vec![1, 0, 1],
                ..Default::default()
            }],
            ..Default::default()
        })
    }

    #[test]
    fn test_segmentation_lookup() {
        let state = state();
        assert_eq!(state.segmentation_ids(), vec!["seg-a", "seg-b"]);
        assert_eq!(state.get_segmentation("seg-b").map(|s| s.label.as_str()), Some("Kidney"));
        assert!(state.get_segmentation("seg-c").is_none());
        assert_eq!(state.get_representations_for_segmentation("seg-b").len(), 2);
        assert!(state.get_image("lm-0").is_some());
        assert!(state.get_volume("vol-1").is_none());
    }

    #[test]
    fn test_segment_color_per_viewport() {
        let state = state();
        assert_eq!(state.get_segment_color("vp-1", "seg-b", 1), Some([10, 20, 30, 255]));
        assert_eq!(state.get_segment_color("vp-2", "seg-b", 1), None);
        assert_eq!(state.get_segment_color("vp-1", "seg-b", 2), None);
    }

    #[test]
    fn test_calculate_segmentation_stats() {
        let state = state();
        let stats = state.calculate_segmentation_stats("seg-b").unwrap();
        assert_eq!(stats[&1][0].value, Some(serde_json::json!(2)));

        let err = state.calculate_segmentation_stats("seg-c").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
