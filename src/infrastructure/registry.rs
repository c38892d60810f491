//! 查看器侧的外部协作者 - 基础设施层
//!
//! 只暴露"读取"能力，导出逻辑不修改其中任何对象

use std::collections::BTreeMap;

use crate::error::AppResult;
use crate::models::measurement::Measurement;
use crate::models::segmentation::{
    CachedImage, CachedVolume, NamedStat, Segmentation, SegmentationRepresentation,
};

/// 测量登记表
pub trait MeasurementRegistry: Send + Sync {
    /// 当前屏幕上的全部测量
    fn get_measurements(&self) -> &[Measurement];
}

/// 分割登记表
pub trait SegmentationRegistry: Send + Sync {
    fn get_segmentation(&self, segmentation_id: &str) -> Option<&Segmentation>;

    fn get_representations_for_segmentation(
        &self,
        segmentation_id: &str,
    ) -> Vec<&SegmentationRepresentation>;

    /// 分割段在指定视口中的显示颜色（RGBA）
    fn get_segment_color(
        &self,
        viewport_id: &str,
        segmentation_id: &str,
        segment_index: u32,
    ) -> Option<[u8; 4]>;

    /// 重新计算各分割段的统计值: segmentIndex → 统计列表
    fn calculate_segmentation_stats(
        &self,
        segmentation_id: &str,
    ) -> AppResult<BTreeMap<u32, Vec<NamedStat>>>;
}

/// 渲染库的图像 / 体数据缓存
pub trait ImageCache: Send + Sync {
    fn get_image(&self, image_id: &str) -> Option<&CachedImage>;

    fn get_volume(&self, volume_id: &str) -> Option<&CachedVolume>;
}
