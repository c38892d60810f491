//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是命令边界：收集 → 映射 → 打包 → 上传 → 通知。
//!
//! ## 模块划分
//!
//! ### `context` - 命令上下文
//! - 汇集配置、登记表、图像缓存、会话信息和交互协作者
//! - 实验 / 项目 ID 的最终解析（配置优先）
//! - 演练模式的本地保存
//!
//! ### `measurement_export` - 测量导出
//! - 收集全部测量，组装 MeasurementCollection
//! - 通过 ExportFlow 上传
//!
//! ### `segmentation_export` - 分割导出
//! - 生成并编码 DICOM-SEG，通过 ExportFlow 上传
//! - 导出分割统计 CSV
//!
//! ## 层次关系
//!
//! ```text
//! measurement_export / segmentation_export (单个命令)
//!     ↓
//! workflow::ExportFlow (上传 → 冲突 → 确认 → 覆盖)
//!     ↓
//! services (能力层：映射 / 生成 / 编码 / 统计 / CSV)
//!     ↓
//! infrastructure + clients (登记表、图像缓存、XNAT)
//! ```

pub mod context;
pub mod measurement_export;
pub mod segmentation_export;

pub use context::{save_payload, CommandContext, CommandOutcome};
pub use measurement_export::store_measurements;
pub use segmentation_export::{export_segmentation, export_segmentation_csv};
