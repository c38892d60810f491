//! 测量导出命令 - 编排层
//!
//! 1. 收集当前全部测量（为空则提示并返回）
//! 2. 确定实验 ID（找不到则提示并返回）
//! 3. 询问集合名称（取消则返回）
//! 4. 组装并打包 MeasurementCollection
//! 5. 通过导出流程上传，演练模式下保存到本地

use tracing::{info, warn};

use crate::clients::{CollectionType, UploadRequest};
use crate::error::AppResult;
use crate::orchestrator::context::{save_payload, CommandContext, CommandOutcome};
use crate::services::collection_builder::{build_collection, package_collection};
use crate::services::label::{default_measurement_label, resolve_label, sanitize_collection_label};
use crate::services::notifier::Notification;
use crate::workflow::{ExportCtx, ExportFlow, ExportOutcome};

const TITLE: &str = "Export Measurements";

/// 导出当前全部测量为一个 XNAT 测量集合
pub async fn store_measurements(ctx: &CommandContext<'_>) -> AppResult<CommandOutcome> {
    let measurements = ctx.measurements.get_measurements();
    if measurements.is_empty() {
        warn!("⚠️ 没有可导出的测量");
        ctx.notifier
            .show(Notification::warning(TITLE, "No measurements found to export."));
        return Ok(CommandOutcome::NothingToExport);
    }

    let series_uid = &ctx.display_set.series_instance_uid;
    let Some(experiment_id) = ctx.experiment_id(series_uid) else {
        warn!("⚠️ 序列 {} 无法确定实验 ID", series_uid);
        ctx.notifier.show(Notification::error(
            TITLE,
            "Unable to determine XNAT experiment ID. Please ensure you are viewing data from XNAT.",
        ));
        return Ok(CommandOutcome::MissingExperiment);
    };

    let default_label = default_measurement_label(ctx.now);
    let input = ctx.prompt.prompt(
        "Enter a name for the measurement collection.\n(Allowed characters: A-Z, a-z, 0-9, _, -)",
        &sanitize_collection_label(&default_label),
    );
    let Some(label) = resolve_label(input.as_deref(), &default_label, sanitize_collection_label)
    else {
        info!("用户取消了测量导出");
        return Ok(CommandOutcome::Cancelled);
    };

    let collection = build_collection(measurements, ctx.display_set, &label, ctx.now);
    let payload = package_collection(&collection)?;

    if ctx.config.dry_run {
        let path = save_payload(ctx.output_dir(), &label, CollectionType::Measurement, &payload)
            .await?;
        return Ok(CommandOutcome::SavedLocally { label, path });
    }

    let export_ctx = ExportCtx::new(
        CollectionType::Measurement,
        label.as_str(),
        experiment_id.as_str(),
        measurements.len(),
    );
    let project_id = match ctx.project_id() {
        Ok(id) => id,
        Err(e) => {
            ctx.notifier
                .show(Notification::error("Export Failed", export_ctx.failure_message(&e)));
            return Err(e);
        }
    };

    let request = UploadRequest {
        payload,
        collection_type: CollectionType::Measurement,
        series_instance_uid: series_uid.clone(),
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
