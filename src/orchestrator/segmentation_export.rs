//! 分割导出命令 - 编排层
//!
//! ## 导出 DICOM-SEG
//! 1. 默认名称取分割名称，询问用户（取消则返回）
//! 2. 生成并编码 DICOM-SEG，失败时提示并返回错误
//! 3. 确定实验 / 项目 ID
//! 4. 通过导出流程上传，演练模式下保存到本地
//!
//! ## 导出统计 CSV
//! 缓存统计缺失的段使用重新计算的体素统计

use tracing::{info, warn};

use crate::clients::{CollectionType, UploadRequest};
use crate::error::{AppError, AppResult, ArchiveError};
use crate::orchestrator::context::{save_payload, CommandContext, CommandOutcome};
use crate::services::csv_report::{build_rows, render_csv, report_file_name, write_report};
use crate::services::dicom_seg::DicomSegWriter;
use crate::services::label::{resolve_label, sanitize_segmentation_label};
use crate::services::notifier::Notification;
use crate::services::seg_generator::{generate_segmentation, SegEncoder, SegOptions};
use crate::workflow::{ExportCtx, ExportFlow, ExportOutcome};

const DEFAULT_LABEL: &str = "Segmentation";

fn notify_failure(ctx: &CommandContext<'_>, err: &AppError) {
    ctx.notifier.show(Notification::error(
        "Export Failed",
        format!("Failed to export segmentation: {}", err),
    ));
}

/// 生成并编码 DICOM-SEG
fn encode_segmentation(
    ctx: &CommandContext<'_>,
    segmentation_id: &str,
) -> AppResult<(Vec<u8>, usize)> {
    let options = SegOptions::for_source(ctx.display_set.clone());
    let generated =
        generate_segmentation(segmentation_id, ctx.segmentations, ctx.images, &options)?;
    let segment_count = generated.encoded_segments().len();
    let bytes = DicomSegWriter::new().encode(&generated)?;
    Ok((bytes, segment_count))
}

/// 导出一个分割为 XNAT 分割集合
///
/// # 参数
/// - `segmentation_id`: 分割 ID
/// - `series_instance_uid`: 参考序列，缺省为当前显示的序列
pub async fn export_segmentation(
    segmentation_id: &str,
    series_instance_uid: Option<&str>,
    ctx: &CommandContext<'_>,
) -> AppResult<CommandOutcome> {
    let default_label = ctx
        .segmentations
        .get_segmentation(segmentation_id)
        .map(|s| s.label.as_str())
        .filter(|label| !label.is_empty())
        .unwrap_or(DEFAULT_LABEL);
    let suggested = sanitize_segmentation_label(default_label);

    let message = format!(
        "Enter a name for the segmentation export to XNAT.\nOnly letters, numbers, underscores, and hyphens are allowed.\n\nCurrent name: {}",
        suggested
    );
    let input = ctx.prompt.prompt(&message, &suggested);
    let Some(label) = resolve_label(input.as_deref(), default_label, sanitize_segmentation_label)
    else {
        info!("用户取消了分割 {} 的导出", segmentation_id);
        return Ok(CommandOutcome::Cancelled);
    };

    let (payload, segment_count) = match encode_segmentation(ctx, segmentation_id) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!("❌ 分割 {} 生成失败: {}", segmentation_id, e);
            notify_failure(ctx, &e);
            return Err(e);
        }
    };
    info!(
        "✓ 分割 {} 已编码: {} 个段, {} 字节",
        segmentation_id,
        segment_count,
        payload.len()
    );

    if ctx.config.dry_run {
        let path = save_payload(ctx.output_dir(), &label, CollectionType::Segmentation, &payload)
            .await?;
        return Ok(CommandOutcome::SavedLocally { label, path });
    }

    let series_uid = series_instance_uid
        .filter(|uid| !uid.is_empty())
        .unwrap_or(ctx.display_set.series_instance_uid.as_str())
        .to_string();

    let ids = ctx
        .experiment_id(&series_uid)
        .ok_or_else(|| AppError::from(ArchiveError::MissingExperimentId))
        .and_then(|experiment_id| Ok((experiment_id, ctx.project_id()?)));
    let (experiment_id, project_id) = match ids {
        Ok(ids) => ids,
        Err(e) => {
            notify_failure(ctx, &e);
            return Err(e);
        }
    };

    let export_ctx = ExportCtx::new(
        CollectionType::Segmentation,
        label.as_str(),
        experiment_id.as_str(),
        segment_count,
    );
    let request = UploadRequest {
        payload,
        collection_type: CollectionType::Segmentation,
        series_instance_uid: series_uid,
        label: label.clone(),
        experiment_id,
        project_id,
    };

    let outcome = ExportFlow::new(ctx.notifier, ctx.prompt)
        .run(ctx.uploader, &request, &export_ctx)
        .await?;

    Ok(match outcome {
        ExportOutcome::Exported { overwritten } => CommandOutcome::Exported { label, overwritten },
        ExportOutcome::Declined => CommandOutcome::Declined { label },
    })
}

/// 导出分割统计为 CSV，写入输出目录并返回 CSV 文本
pub async fn export_segmentation_csv(
    segmentation_id: &str,
    ctx: &CommandContext<'_>,
) -> AppResult<String> {
    let segmentation = ctx
        .segmentations
        .get_segmentation(segmentation_id)
        .ok_or_else(|| AppError::segmentation_not_found(segmentation_id))?;

    let needs_computed = segmentation
        .segments
        .values()
        .any(|s| s.cached_stats.is_none());
    let computed = if needs_computed {
        match ctx.segmentations.calculate_segmentation_stats(segmentation_id) {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!("⚠️ 分割 {} 统计计算失败，对应单元格留空: {}", segmentation_id, e);
                None
            }
        }
    } else {
        None
    };

    let rows = build_rows(segmentation, segmentation_id, ctx.now, computed.as_ref());
    let csv = render_csv(&rows);
    write_report(ctx.output_dir(), &report_file_name(segmentation), &csv).await?;

    Ok(csv)
}
