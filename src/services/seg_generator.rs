//! DICOM-SEG 生成 - 业务能力层
//!
//! 从分割登记表和图像缓存中收集 labelmap、源图像和段元数据，
//! 得到与编码格式无关的 `GeneratedSegmentation`，再交给 `SegEncoder` 编码。
//!
//! 流程：
//! 1. 查找分割
//! 2. 解析 labelmap 图像列表（`imageIds`，否则经 `volumeId` 查缓存体数据）
//! 3. 取出每幅 labelmap 图像及其源图像
//! 4. 统计每个切片上出现的段，以及整体并集
//! 5. 生成段元数据（编号、名称、算法、CIELab 颜色、类别编码）

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::registry::{ImageCache, SegmentationRegistry};
use crate::models::segmentation::{CachedImage, Segment, Segmentation};
use crate::models::session::DisplaySetInfo;
use crate::services::color::segment_color_to_dicom_lab;

/// 没有任何颜色来源时的段颜色
pub const DEFAULT_SEGMENT_COLOR: [u8; 4] = [221, 84, 84, 255];

const DEFAULT_ALGORITHM_TYPE: &str = "MANUAL";
const DEFAULT_ALGORITHM_NAME: &str = "OHIF Brush";

/// 生成选项
#[derive(Debug, Clone)]
pub struct SegOptions {
    /// 源序列（患者 / 检查 / 序列 UID）
    pub source: DisplaySetInfo,
    pub series_description: String,
    pub series_number: u32,
    pub content_creator_name: String,
    pub manufacturer: String,
}

impl Default for SegOptions {
    fn default() -> Self {
        Self {
            source: DisplaySetInfo::default(),
            series_description: "Research Derived Series".to_string(),
            series_number: 99,
            content_creator_name: "OHIF^XNAT".to_string(),
            manufacturer: "OHIF-XNAT".to_string(),
        }
    }
}

impl SegOptions {
    pub fn for_source(source: DisplaySetInfo) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }
}

/// 编码条目（CodeValue / CodingSchemeDesignator / CodeMeaning）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeItem {
    pub code_value: String,
    pub coding_scheme_designator: String,
    pub code_meaning: String,
}

impl CodeItem {
    pub fn tissue() -> Self {
        Self {
            code_value: "T-D0050".to_string(),
            coding_scheme_designator: "SRT".to_string(),
            code_meaning: "Tissue".to_string(),
        }
    }
}

/// 单个段的 DICOM 元数据
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentMetadata {
    pub segment_number: u32,
    pub segment_label: String,
    pub algorithm_type: String,
    pub algorithm_name: String,
    pub recommended_display_cielab: [u16; 3],
    pub category: CodeItem,
    pub property_type: CodeItem,
}

/// 单个切片的 labelmap
#[derive(Debug, Clone, PartialEq)]
pub struct Labelmap2D {
    pub rows: u32,
    pub columns: u32,
    pub pixel_data: Vec<u8>,
    /// 该切片上出现的段编号（升序）
    pub segments_on_labelmap: Vec<u32>,
}

impl Labelmap2D {
    pub fn from_image(image: &CachedImage) -> AppResult<Self> {
        let expected = image.rows as usize * image.columns as usize;
        if image.pixel_data.len() != expected {
            return Err(AppError::segmentation_invalid(format!(
                "labelmap 图像 {} 像素数 {} 与尺寸 {}x{} 不符",
                image.image_id,
                image.pixel_data.len(),
                image.rows,
                image.columns
            )));
        }

        let segments: BTreeSet<u32> = image
            .pixel_data
            .iter()
            .filter(|&&v| v != 0)
            .map(|&v| v as u32)
            .collect();

        Ok(Self {
            rows: image.rows,
            columns: image.columns,
            pixel_data: image.pixel_data.clone(),
            segments_on_labelmap: segments.into_iter().collect(),
        })
    }

    pub fn contains(&self, segment_number: u32) -> bool {
        self.segments_on_labelmap.binary_search(&segment_number).is_ok()
    }
}

/// 整个分割的 labelmap（按切片）
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Labelmap3D {
    /// 所有切片上出现的段编号并集（升序）
    pub segments_on_labelmap: Vec<u32>,
    pub labelmaps_2d: Vec<Labelmap2D>,
    pub metadata: BTreeMap<u32, SegmentMetadata>,
}

/// 生成结果，交给编码器
#[derive(Debug, Clone)]
pub struct GeneratedSegmentation {
    pub segmentation_id: String,
    pub label: String,
    pub labelmap: Labelmap3D,
    /// 与 `labelmap.labelmaps_2d` 一一对应的源图像
    pub referenced_images: Vec<CachedImage>,
    pub options: SegOptions,
}

impl GeneratedSegmentation {
    /// 需要编码的段：出现在 labelmap 上且有元数据
    pub fn encoded_segments(&self) -> Vec<&SegmentMetadata> {
        self.labelmap
            .segments_on_labelmap
            .iter()
            .filter_map(|n| self.labelmap.metadata.get(n))
            .collect()
    }

    /// 帧列表 (段编号, 切片下标)，按段再按切片排序
    pub fn frames(&self) -> Vec<(u32, usize)> {
        self.encoded_segments()
            .into_iter()
            .flat_map(|meta| {
                self.labelmap
                    .labelmaps_2d
                    .iter()
                    .enumerate()
                    .filter(move |(_, slice)| slice.contains(meta.segment_number))
                    .map(move |(z, _)| (meta.segment_number, z))
            })
            .collect()
    }
}

/// 分割编码器，例如 DICOM-SEG 二进制
pub trait SegEncoder: Send + Sync {
    fn encode(&self, generated: &GeneratedSegmentation) -> AppResult<Vec<u8>>;
}

/// 解析分割的 labelmap 图像 ID 列表
pub fn labelmap_image_ids(segmentation: &Segmentation, cache: &dyn ImageCache) -> AppResult<Vec<String>> {
    let labelmap = segmentation
        .representation_data
        .labelmap
        .as_ref()
        .ok_or_else(|| AppError::labelmap_not_found(&segmentation.id))?;

    if let Some(ids) = labelmap.image_ids.as_ref().filter(|ids| !ids.is_empty()) {
        return Ok(ids.clone());
    }

    if let Some(volume_id) = &labelmap.volume_id {
        match cache.get_volume(volume_id) {
            Some(volume) if !volume.image_ids.is_empty() => return Ok(volume.image_ids.clone()),
            Some(_) => warn!("体数据 {} 不包含任何图像", volume_id),
            None => warn!("缓存中没有体数据 {}", volume_id),
        }
    }

    Err(AppError::labelmap_not_found(&segmentation.id))
}

/// 生成分割
///
/// # 参数
/// - `segmentation_id`: 分割 ID
/// - `registry`: 分割登记表（分割、表示、段颜色）
/// - `cache`: 图像缓存
/// - `options`: 序列描述等
///
/// # 错误
/// 分割、labelmap 或任一图像找不到时返回 `NotFound`
pub fn generate_segmentation(
    segmentation_id: &str,
    registry: &dyn SegmentationRegistry,
    cache: &dyn ImageCache,
    options: &SegOptions,
) -> AppResult<GeneratedSegmentation> {
    let segmentation = registry
        .get_segmentation(segmentation_id)
        .ok_or_else(|| AppError::segmentation_not_found(segmentation_id))?;

    let image_ids = labelmap_image_ids(segmentation, cache)?;
    debug!("分割 {} 的 labelmap 共 {} 幅图像", segmentation_id, image_ids.len());

    let mut labelmaps_2d = Vec::with_capacity(image_ids.len());
    let mut referenced_images = Vec::with_capacity(image_ids.len());

    for image_id in &image_ids {
        let seg_image = cache
            .get_image(image_id)
            .ok_or_else(|| AppError::image_not_found(image_id))?;

        let referenced_id = seg_image
            .referenced_image_id
            .as_deref()
            .ok_or_else(|| AppError::image_not_found(format!("{} 的源图像", image_id)))?;
        let referenced = cache
            .get_image(referenced_id)
            .ok_or_else(|| AppError::image_not_found(referenced_id))?;

        labelmaps_2d.push(Labelmap2D::from_image(seg_image)?);
        referenced_images.push(referenced.clone());
    }

    if let Some(first) = labelmaps_2d.first() {
        let (rows, columns) = (first.rows, first.columns);
        if labelmaps_2d.iter().any(|l| l.rows != rows || l.columns != columns) {
            return Err(AppError::segmentation_invalid(format!(
                "分割 {} 的切片尺寸不一致",
                segmentation_id
            )));
        }
    }

    let segments_on_labelmap: Vec<u32> = labelmaps_2d
        .iter()
        .flat_map(|l| l.segments_on_labelmap.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if segments_on_labelmap.is_empty() {
        return Err(AppError::segmentation_invalid(format!(
            "分割 {} 没有任何已标注的像素",
            segmentation_id
        )));
    }

    let first_viewport = registry
        .get_representations_for_segmentation(segmentation_id)
        .first()
        .map(|r| r.viewport_id.clone());

    let metadata: BTreeMap<u32, SegmentMetadata> = segmentation
        .segments
        .iter()
        .map(|(&number, segment)| {
            let color = first_viewport
                .as_deref()
                .and_then(|viewport| registry.get_segment_color(viewport, segmentation_id, number))
                .or(segment.color)
                .unwrap_or(DEFAULT_SEGMENT_COLOR);
            (number, segment_metadata(number, segment, color))
        })
        .collect();

    for number in &segments_on_labelmap {
        if !metadata.contains_key(number) {
            warn!("labelmap 中的段 {} 没有对应的段定义，将被忽略", number);
        }
    }

    info!(
        "✓ 分割 {} 已生成: {} 个切片, 段 {:?}",
        segmentation_id,
        labelmaps_2d.len(),
        segments_on_labelmap
    );

    Ok(GeneratedSegmentation {
        segmentation_id: segmentation_id.to_string(),
        label: segmentation.label.clone(),
        labelmap: Labelmap3D {
            segments_on_labelmap,
            labelmaps_2d,
            metadata,
        },
        referenced_images,
        options: options.clone(),
    })
}

fn segment_metadata(number: u32, segment: &Segment, color: [u8; 4]) -> SegmentMetadata {
    SegmentMetadata {
        segment_number: number,
        segment_label: segment.label.clone(),
        algorithm_type: segment
            .algorithm_type
            .clone()
            .unwrap_or_else(|| DEFAULT_ALGORITHM_TYPE.to_string()),
        algorithm_name: segment
            .algorithm_name
            .clone()
            .unwrap_or_else(|| DEFAULT_ALGORITHM_NAME.to_string()),
        recommended_display_cielab: segment_color_to_dicom_lab(color),
        category: CodeItem::tissue(),
        property_type: CodeItem::tissue(),
    }
}
