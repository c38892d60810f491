use serde::Deserialize;

use crate::models::measurement::Measurement;
use crate::models::segmentation::{
    CachedImage, CachedVolume, Segmentation, SegmentationRepresentation,
};
use crate::models::session::{DisplaySetInfo, SessionContext};

/// 查看器状态快照文件
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerSnapshot {
    pub display_set: DisplaySetInfo,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(default)]
    pub segmentations: Vec<Segmentation>,
    #[serde(default)]
    pub representations: Vec<SegmentationRepresentation>,
    #[serde(default)]
    pub images: Vec<CachedImage>,
    #[serde(default)]
    pub volumes: Vec<CachedVolume>,
    #[serde(default)]
    pub session: SessionContext,
}
