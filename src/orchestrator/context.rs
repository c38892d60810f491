//! 命令上下文
//!
//! 一次导出命令所需的全部协作者，由入口组装后显式传入

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::info;

use crate::clients::{ArchiveUploader, CollectionType};
use crate::config::Config;
use crate::error::{AppError, AppResult, ArchiveError};
use crate::infrastructure::{ImageCache, MeasurementRegistry, SegmentationRegistry, ViewerState};
use crate::models::session::{DisplaySetInfo, SessionContext};
use crate::services::experiment::{resolve_experiment_id, resolve_project_id};
use crate::services::notifier::Notifier;
use crate::services::prompt::UserPrompt;

/// 命令执行结果
///
/// 取消、无数据等情况不是错误，以结果值返回
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// 已上传到 XNAT
    Exported { label: String, overwritten: bool },
    /// 演练模式：已保存到本地
    SavedLocally { label: String, path: PathBuf },
    /// 集合已存在，用户拒绝覆盖
    Declined { label: String },
    /// 用户取消了名称输入
    Cancelled,
    /// 没有可导出的测量
    NothingToExport,
    /// 无法确定实验 ID
    MissingExperiment,
}

impl CommandOutcome {
    /// 日志中使用的简短描述
    pub fn summary(&self) -> String {
        match self {
            CommandOutcome::Exported { label, overwritten: true } => {
                format!("已导出 {}（覆盖）", label)
            }
            CommandOutcome::Exported { label, .. } => format!("已导出 {}", label),
            CommandOutcome::SavedLocally { path, .. } => format!("已保存 {}", path.display()),
            CommandOutcome::Declined { label } => format!("未覆盖已有集合 {}", label),
            CommandOutcome::Cancelled => "用户取消".to_string(),
            CommandOutcome::NothingToExport => "没有可导出的测量".to_string(),
            CommandOutcome::MissingExperiment => "无法确定实验 ID".to_string(),
        }
    }
}

/// 命令上下文
pub struct CommandContext<'a> {
    pub config: &'a Config,
    pub measurements: &'a dyn MeasurementRegistry,
    pub segmentations: &'a dyn SegmentationRegistry,
    pub images: &'a dyn ImageCache,
    pub display_set: &'a DisplaySetInfo,
    pub session: &'a SessionContext,
    pub notifier: &'a dyn Notifier,
    pub prompt: &'a dyn UserPrompt,
    pub uploader: &'a dyn ArchiveUploader,
    /// 命令开始的时间（默认名称、集合时间戳、报告时间）
    pub now: DateTime<Utc>,
}

impl<'a> CommandContext<'a> {
    /// 以一个查看器状态同时充当登记表和图像缓存
    pub fn from_viewer(
        config: &'a Config,
        viewer: &'a ViewerState,
        notifier: &'a dyn Notifier,
        prompt: &'a dyn UserPrompt,
        uploader: &'a dyn ArchiveUploader,
    ) -> Self {
        Self {
            config,
            measurements: viewer,
            segmentations: viewer,
            images: viewer,
            display_set: viewer.display_set(),
            session: viewer.session(),
            notifier,
            prompt,
            uploader,
            now: Utc::now(),
        }
    }

    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// 实验 ID：配置中指定的优先，否则按会话信息解析
    pub fn experiment_id(&self, series_instance_uid: &str) -> Option<String> {
        self.config
            .experiment_id
            .clone()
            .filter(|id| !id.is_empty())
            .or_else(|| {
                resolve_experiment_id(
                    self.session,
                    series_instance_uid,
                    &self.display_set.study_instance_uid,
                )
            })
    }

    /// 项目 ID
    pub fn project_id(&self) -> AppResult<String> {
        resolve_project_id(
            self.config.project_id.as_deref(),
            self.session,
            &self.display_set.study_instance_uid,
        )
        .ok_or_else(|| ArchiveError::MissingProjectId.into())
    }

    pub fn output_dir(&self) -> &Path {
        Path::new(&self.config.output_dir)
    }
}

/// 演练模式下把载荷写到 `output_dir/<label>.<ext>`
pub async fn save_payload(
    output_dir: &Path,
    label: &str,
    collection_type: CollectionType,
    payload: &[u8],
) -> AppResult<PathBuf> {
    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| AppError::file_write_failed(output_dir.display().to_string(), e))?;

    let path = output_dir.join(format!("{}.{}", label, collection_type.file_extension()));
    fs::write(&path, payload)
        .await
        .map_err(|e| AppError::file_write_failed(path.display().to_string(), e))?;

    info!(
        "✓ [演练] {} 集合已保存到 {} ({} 字节)",
        collection_type.as_str(),
        path.display(),
        payload.len()
    );
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_summary() {
        let exported = CommandOutcome::Exported {
            label: "Liver".into(),
            overwritten: true,
        };
        assert_eq!(exported.summary(), "已导出 Liver（覆盖）");
        assert_eq!(CommandOutcome::Cancelled.summary(), "用户取消");
    }

    #[tokio::test]
    async fn test_save_payload_creates_directory() {
        let dir = std::env::temp_dir().join(format!("xnat-roi-save-{}", uuid::Uuid::new_v4()));
        let path = save_payload(&dir, "Liver", CollectionType::Segmentation, b"DICM")
            .await
            .unwrap();

        assert_eq!(path, dir.join("Liver.dcm"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"DICM");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
