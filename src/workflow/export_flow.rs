//! 导出流程 - 流程层
//!
//! 核心职责：把一个已打包的集合上传到 XNAT，处理"集合已存在"冲突
//!
//! 状态：
//! Idle → Uploading(overwrite=false)
//!   → Done
//!   → Conflict → Confirming
//!       → Uploading(overwrite=true) → Done | Failed
//!       → Declined
//!   → Failed
//!
//! 最多上传两次；第二次只会在用户确认覆盖后发生

use tracing::{debug, info, warn};

use crate::clients::{ArchiveUploader, UploadRequest};
use crate::error::{AppError, AppResult};
use crate::services::notifier::{Notification, Notifier};
use crate::services::prompt::UserPrompt;
use crate::workflow::export_ctx::ExportCtx;

/// 导出状态
#[derive(Debug)]
pub enum ExportState {
    Idle,
    Uploading { overwrite: bool },
    Conflict,
    Confirming,
    Done { overwritten: bool },
    Declined,
    Failed(AppError),
}

/// 导出结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    /// 上传成功
    Exported { overwritten: bool },
    /// 集合已存在且用户拒绝覆盖
    Declined,
}

/// 导出流程
///
/// - 不持有上传客户端，每次运行时传入
/// - 通知和确认通过注入的协作者完成
pub struct ExportFlow<'a> {
    notifier: &'a dyn Notifier,
    prompt: &'a dyn UserPrompt,
}

impl<'a> ExportFlow<'a> {
    pub fn new(notifier: &'a dyn Notifier, prompt: &'a dyn UserPrompt) -> Self {
        Self { notifier, prompt }
    }

    pub async fn run(
        &self,
        uploader: &dyn ArchiveUploader,
        request: &UploadRequest,
        ctx: &ExportCtx,
    ) -> AppResult<ExportOutcome> {
        let mut state = ExportState::Idle;

        loop {
            debug!("{} 状态: {:?}", ctx, state);

            state = match state {
                ExportState::Idle => ExportState::Uploading { overwrite: false },

                ExportState::Uploading { overwrite } => {
                    info!("{} 上传中 (overwrite={})", ctx, overwrite);
                    match uploader.upload(request, overwrite).await {
                        Ok(()) => ExportState::Done {
                            overwritten: overwrite,
                        },
                        Err(e) if e.is_collection_exists() && !overwrite => ExportState::Conflict,
                        Err(e) => ExportState::Failed(e),
                    }
                }

                ExportState::Conflict => {
                    warn!("{} 集合已存在，询问是否覆盖", ctx);
                    ExportState::Confirming
                }

                ExportState::Confirming => {
                    if self.prompt.confirm(&ctx.overwrite_question()) {
                        ExportState::Uploading { overwrite: true }
                    } else {
                        ExportState::Declined
                    }
                }

                ExportState::Done { overwritten } => {
                    info!("{} ✓ 导出完成", ctx);
                    self.notifier
                        .show(Notification::success("Export Successful", ctx.success_message()));
                    return Ok(ExportOutcome::Exported { overwritten });
                }

                ExportState::Declined => {
                    info!("{} 用户拒绝覆盖，导出取消", ctx);
                    return Ok(ExportOutcome::Declined);
                }

                ExportState::Failed(e) => {
                    self.notifier
                        .show(Notification::error("Export Failed", ctx.failure_message(&e)));
                    return Err(e);
                }
            };
        }
    }
}
