//! DICOM-SEG 编码
//!
//! 把 `GeneratedSegmentation` 写成 Segmentation Storage 对象（BINARY，1 位像素）：
//! - 每个 (段, 切片) 组合一帧，帧按段再按切片排序
//! - 每帧的功能组引用源图像 SOP 实例和段编号
//! - 像素按 LSB 优先连续打包，总长度补齐为偶数
//! - 文件元信息使用 Explicit VR Little Endian

use chrono::Local;
use dicom::core::value::DataSetSequence;
use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::dictionary_std::{tags, uids};
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::models::segmentation::CachedImage;
use crate::services::seg_generator::{CodeItem, GeneratedSegmentation, SegEncoder, SegmentMetadata};
use crate::services::uid::new_dicom_uid;

// 分割模块相关标签
const SEGMENTATION_TYPE: Tag = Tag(0x0062, 0x0001);
const SEGMENT_SEQUENCE: Tag = Tag(0x0062, 0x0002);
const SEGMENTED_PROPERTY_CATEGORY_CODE_SEQUENCE: Tag = Tag(0x0062, 0x0003);
const SEGMENT_NUMBER: Tag = Tag(0x0062, 0x0004);
const SEGMENT_LABEL: Tag = Tag(0x0062, 0x0005);
const SEGMENT_ALGORITHM_TYPE: Tag = Tag(0x0062, 0x0008);
const SEGMENT_ALGORITHM_NAME: Tag = Tag(0x0062, 0x0009);
const SEGMENT_IDENTIFICATION_SEQUENCE: Tag = Tag(0x0062, 0x000A);
const REFERENCED_SEGMENT_NUMBER: Tag = Tag(0x0062, 0x000B);
const RECOMMENDED_DISPLAY_CIELAB_VALUE: Tag = Tag(0x0062, 0x000D);
const SEGMENTED_PROPERTY_TYPE_CODE_SEQUENCE: Tag = Tag(0x0062, 0x000F);

// 多帧功能组
const SHARED_FUNCTIONAL_GROUPS_SEQUENCE: Tag = Tag(0x5200, 0x9229);
const PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE: Tag = Tag(0x5200, 0x9230);
const DERIVATION_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x9124);
const SOURCE_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x2112);
const PIXEL_MEASURES_SEQUENCE: Tag = Tag(0x0028, 0x9110);
const PLANE_POSITION_SEQUENCE: Tag = Tag(0x0020, 0x9113);
const REFERENCED_SERIES_SEQUENCE: Tag = Tag(0x0008, 0x1115);
const REFERENCED_INSTANCE_SEQUENCE: Tag = Tag(0x0008, 0x114A);

// 通用内容标识
const CONTENT_LABEL: Tag = Tag(0x0070, 0x0080);
const CONTENT_DESCRIPTION: Tag = Tag(0x0070, 0x0081);
const CONTENT_CREATOR_NAME: Tag = Tag(0x0070, 0x0084);

/// DICOM-SEG 编码器
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomSegWriter;

impl DicomSegWriter {
    pub fn new() -> Self {
        Self
    }
}

impl SegEncoder for DicomSegWriter {
    fn encode(&self, generated: &GeneratedSegmentation) -> AppResult<Vec<u8>> {
        let frames = generated.frames();
        let first = generated
            .labelmap
            .labelmaps_2d
            .first()
            .ok_or_else(|| AppError::segmentation_invalid("分割不包含任何切片"))?;
        if frames.is_empty() {
            return Err(AppError::segmentation_invalid("分割没有可编码的帧"));
        }

        let sop_instance_uid = new_dicom_uid();
        let now = Local::now();
        let options = &generated.options;

        let mut obj = InMemDicomObject::new_empty();

        // 患者 / 检查 / 序列
        put_str(&mut obj, tags::SOP_CLASS_UID, VR::UI, uids::SEGMENTATION_STORAGE);
        put_str(&mut obj, tags::SOP_INSTANCE_UID, VR::UI, &sop_instance_uid);
        put_str(&mut obj, tags::PATIENT_ID, VR::LO, &options.source.patient_id);
        put_str(&mut obj, tags::STUDY_INSTANCE_UID, VR::UI, &options.source.study_instance_uid);
        put_str(&mut obj, tags::SERIES_INSTANCE_UID, VR::UI, &new_dicom_uid());
        put_str(&mut obj, tags::SERIES_NUMBER, VR::IS, &options.series_number.to_string());
        put_str(&mut obj, tags::SERIES_DESCRIPTION, VR::LO, &options.series_description);
        put_str(&mut obj, tags::INSTANCE_NUMBER, VR::IS, "1");
        put_str(&mut obj, tags::MODALITY, VR::CS, "SEG");
        put_str(&mut obj, tags::MANUFACTURER, VR::LO, &options.manufacturer);
        if let Some(frame_of_reference) = generated
            .referenced_images
            .iter()
            .find_map(|img| img.frame_of_reference_uid.as_deref())
        {
            put_str(&mut obj, tags::FRAME_OF_REFERENCE_UID, VR::UI, frame_of_reference);
        }

        // 内容标识
        put_str(&mut obj, CONTENT_LABEL, VR::CS, "SEGMENTATION");
        put_str(&mut obj, CONTENT_DESCRIPTION, VR::LO, &generated.label);
        put_str(&mut obj, CONTENT_CREATOR_NAME, VR::PN, &options.content_creator_name);
        put_str(&mut obj, tags::CONTENT_DATE, VR::DA, &now.format("%Y%m%d").to_string());
        put_str(&mut obj, tags::CONTENT_TIME, VR::TM, &now.format("%H%M%S").to_string());

        // 图像像素模块
        put_strs(&mut obj, tags::IMAGE_TYPE, VR::CS, &["DERIVED", "PRIMARY"]);
        put_u16(&mut obj, tags::SAMPLES_PER_PIXEL, 1);
        put_str(&mut obj, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, "MONOCHROME2");
        put_u16(&mut obj, tags::ROWS, dimension(first.rows)?);
        put_u16(&mut obj, tags::COLUMNS, dimension(first.columns)?);
        put_u16(&mut obj, tags::BITS_ALLOCATED, 1);
        put_u16(&mut obj, tags::BITS_STORED, 1);
        put_u16(&mut obj, tags::HIGH_BIT, 0);
        put_u16(&mut obj, tags::PIXEL_REPRESENTATION, 0);
        put_str(&mut obj, tags::LOSSY_IMAGE_COMPRESSION, VR::CS, "00");
        put_str(&mut obj, SEGMENTATION_TYPE, VR::CS, "BINARY");
        put_str(&mut obj, tags::NUMBER_OF_FRAMES, VR::IS, &frames.len().to_string());

        // 段定义
        let segment_items = generated
            .encoded_segments()
            .into_iter()
            .map(segment_item)
            .collect::<AppResult<Vec<_>>>()?;
        put_sequence(&mut obj, SEGMENT_SEQUENCE, segment_items);

        put_sequence(
            &mut obj,
            REFERENCED_SERIES_SEQUENCE,
            vec![referenced_series_item(
                &options.source.series_instance_uid,
                &generated.referenced_images,
            )],
        );

        if let Some(shared) = shared_functional_group(&generated.referenced_images) {
            put_sequence(&mut obj, SHARED_FUNCTIONAL_GROUPS_SEQUENCE, vec![shared]);
        }

        let per_frame = frames
            .iter()
            .map(|&(segment_number, z)| {
                per_frame_functional_group(segment_number, &generated.referenced_images[z])
            })
            .collect::<AppResult<Vec<_>>>()?;
        put_sequence(&mut obj, PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE, per_frame);

        let pixel_data = pack_frames(generated, &frames);
        debug!("像素数据: {} 帧, {} 字节", frames.len(), pixel_data.len());
        obj.put(DataElement::new(
            tags::PIXEL_DATA,
            VR::OB,
            PrimitiveValue::from(pixel_data),
        ));

        let file_obj = obj
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::SEGMENTATION_STORAGE)
                    .media_storage_sop_instance_uid(sop_instance_uid.as_str()),
            )
            .map_err(AppError::dicom)?;

        let mut out = Vec::new();
        file_obj.write_all(&mut out).map_err(AppError::dicom)?;

        info!(
            "✓ DICOM-SEG 已编码: {} 个段, {} 帧, {} 字节",
            generated.encoded_segments().len(),
            frames.len(),
            out.len()
        );
        Ok(out)
    }
}

/// 按帧顺序把 (段, 切片) 掩码打包为 1 位像素，LSB 优先，帧间不补位
pub fn pack_frames(generated: &GeneratedSegmentation, frames: &[(u32, usize)]) -> Vec<u8> {
    let slices = &generated.labelmap.labelmaps_2d;
    let frame_len = slices.first().map_or(0, |s| s.pixel_data.len());
    let total_bits = frame_len * frames.len();

    let mut packed = vec![0u8; total_bits.div_ceil(8)];
    for (frame_idx, &(segment_number, z)) in frames.iter().enumerate() {
        let offset = frame_idx * frame_len;
        for (i, &value) in slices[z].pixel_data.iter().enumerate() {
            if value as u32 == segment_number {
                let bit = offset + i;
                packed[bit / 8] |= 1 << (bit % 8);
            }
        }
    }

    if packed.len() % 2 == 1 {
        packed.push(0);
    }
    packed
}

fn dimension(value: u32) -> AppResult<u16> {
    u16::try_from(value).map_err(|_| AppError::dicom(format!("图像尺寸 {} 超出 US 范围", value)))
}

fn put_str(obj: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    obj.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn put_strs(obj: &mut InMemDicomObject, tag: Tag, vr: VR, values: &[&str]) {
    obj.put(DataElement::new(
        tag,
        vr,
        PrimitiveValue::Strs(values.iter().map(|v| v.to_string()).collect()),
    ));
}

fn put_u16(obj: &mut InMemDicomObject, tag: Tag, value: u16) {
    obj.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
}

fn put_decimals(obj: &mut InMemDicomObject, tag: Tag, values: &[f64]) {
    obj.put(DataElement::new(
        tag,
        VR::DS,
        PrimitiveValue::Strs(values.iter().map(|v| v.to_string()).collect()),
    ));
}

fn put_sequence(obj: &mut InMemDicomObject, tag: Tag, items: Vec<InMemDicomObject>) {
    obj.put(DataElement::new(tag, VR::SQ, DataSetSequence::from(items)));
}

fn code_item(code: &CodeItem) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    put_str(&mut item, tags::CODE_VALUE, VR::SH, &code.code_value);
    put_str(&mut item, tags::CODING_SCHEME_DESIGNATOR, VR::SH, &code.coding_scheme_designator);
    put_str(&mut item, tags::CODE_MEANING, VR::LO, &code.code_meaning);
    item
}

fn segment_item(meta: &SegmentMetadata) -> AppResult<InMemDicomObject> {
    let mut item = InMemDicomObject::new_empty();
    put_u16(&mut item, SEGMENT_NUMBER, segment_number(meta.segment_number)?);
    put_str(&mut item, SEGMENT_LABEL, VR::LO, &meta.segment_label);
    put_str(&mut item, SEGMENT_ALGORITHM_TYPE, VR::CS, &meta.algorithm_type);
    if !meta.algorithm_name.is_empty() {
        put_str(&mut item, SEGMENT_ALGORITHM_NAME, VR::LO, &meta.algorithm_name);
    }
    item.put(DataElement::new(
        RECOMMENDED_DISPLAY_CIELAB_VALUE,
        VR::US,
        PrimitiveValue::U16(meta.recommended_display_cielab.iter().copied().collect()),
    ));
    put_sequence(
        &mut item,
        SEGMENTED_PROPERTY_CATEGORY_CODE_SEQUENCE,
        vec![code_item(&meta.category)],
    );
    put_sequence(
        &mut item,
        SEGMENTED_PROPERTY_TYPE_CODE_SEQUENCE,
        vec![code_item(&meta.property_type)],
    );
    Ok(item)
}

fn segment_number(number: u32) -> AppResult<u16> {
    u16::try_from(number).map_err(|_| AppError::dicom(format!("段编号 {} 超出 US 范围", number)))
}

fn image_reference_item(image: &CachedImage) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    if let Some(class_uid) = &image.sop_class_uid {
        put_str(&mut item, tags::REFERENCED_SOP_CLASS_UID, VR::UI, class_uid);
    }
    if let Some(instance_uid) = &image.sop_instance_uid {
        put_str(&mut item, tags::REFERENCED_SOP_INSTANCE_UID, VR::UI, instance_uid);
    }
    item
}

fn referenced_series_item(series_uid: &str, images: &[CachedImage]) -> InMemDicomObject {
    let mut item = InMemDicomObject::new_empty();
    put_str(&mut item, tags::SERIES_INSTANCE_UID, VR::UI, series_uid);
    put_sequence(
        &mut item,
        REFERENCED_INSTANCE_SEQUENCE,
        images.iter().map(image_reference_item).collect(),
    );
    item
}

fn shared_functional_group(images: &[CachedImage]) -> Option<InMemDicomObject> {
    let first = images.first()?;
    let spacing = first.pixel_spacing?;

    let mut measures = InMemDicomObject::new_empty();
    put_decimals(&mut measures, tags::PIXEL_SPACING, &spacing);
    if let Some(thickness) = first.slice_thickness {
        put_decimals(&mut measures, tags::SLICE_THICKNESS, &[thickness]);
    }

    let mut group = InMemDicomObject::new_empty();
    put_sequence(&mut group, PIXEL_MEASURES_SEQUENCE, vec![measures]);
    Some(group)
}

fn per_frame_functional_group(segment: u32, source: &CachedImage) -> AppResult<InMemDicomObject> {
    let mut derivation = InMemDicomObject::new_empty();
    put_sequence(
        &mut derivation,
        SOURCE_IMAGE_SEQUENCE,
        vec![image_reference_item(source)],
    );

    let mut identification = InMemDicomObject::new_empty();
    put_u16(&mut identification, REFERENCED_SEGMENT_NUMBER, segment_number(segment)?);

    let mut group = InMemDicomObject::new_empty();
    put_sequence(&mut group, DERIVATION_IMAGE_SEQUENCE, vec![derivation]);
    if let Some(position) = source.image_position_patient {
        let mut plane = InMemDicomObject::new_empty();
        put_decimals(&mut plane, tags::IMAGE_POSITION_PATIENT, &position);
        put_sequence(&mut group, PLANE_POSITION_SEQUENCE, vec![plane]);
    }
    put_sequence(&mut group, SEGMENT_IDENTIFICATION_SEQUENCE, vec![identification]);
    Ok(group)
}
