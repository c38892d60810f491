//! # XNAT ROI Export
//!
//! 把 OHIF 查看器中的测量和分割导出为 XNAT ROI 集合
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 查看器侧的只读协作者
//! - `MeasurementRegistry` / `SegmentationRegistry` / `ImageCache` - 登记表与图像缓存
//! - `ViewerState` - 从 JSON 快照建立的实现
//! - `clients/` - `XnatClient`，XNAT 集合上传
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个模块只做一件事
//! - `measurement_mapper` / `collection_builder` - 测量映射与集合组装
//! - `seg_generator` / `dicom_seg` / `color` - DICOM-SEG 生成与编码
//! - `segment_stats` / `csv_report` - 段统计与 CSV 报告
//! - `experiment` / `label` - 实验 ID 解析、名称清洗
//! - `notifier` / `prompt` - 通知与用户交互
//! - `measurement_importer` - 读取已导出的测量集合
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次上传"的完整处理流程
//! - `ExportCtx` - 上下文封装（集合类型 + 名称 + 实验）
//! - `ExportFlow` - 状态机（上传 → 冲突 → 确认 → 覆盖）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/measurement_export` - 测量导出命令
//! - `orchestrator/segmentation_export` - 分割导出与统计 CSV 命令
//!
//! ## 模块结构

pub mod cli;
pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use clients::{ArchiveUploader, XnatClient};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::ViewerState;
pub use models::ViewerSnapshot;
pub use orchestrator::{
    export_segmentation, export_segmentation_csv, store_measurements, CommandContext,
    CommandOutcome,
};
pub use workflow::{ExportCtx, ExportFlow, ExportOutcome};
