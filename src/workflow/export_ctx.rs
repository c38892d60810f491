//! 导出上下文
//!
//! 封装"我正在把什么导出到哪个实验"这一信息

use std::fmt::Display;

use crate::clients::CollectionType;

/// 导出上下文
#[derive(Debug, Clone)]
pub struct ExportCtx {
    /// 集合类型
    pub collection_type: CollectionType,

    /// 集合名称（已清洗）
    pub label: String,

    /// XNAT 实验 ID
    pub experiment_id: String,

    /// 导出条目数（测量数或段数，仅用于提示信息）
    pub item_count: usize,
}

impl ExportCtx {
    pub fn new(
        collection_type: CollectionType,
        label: impl Into<String>,
        experiment_id: impl Into<String>,
        item_count: usize,
    ) -> Self {
        Self {
            collection_type,
            label: label.into(),
            experiment_id: experiment_id.into(),
            item_count,
        }
    }

    /// 成功提示
    pub fn success_message(&self) -> String {
        match self.collection_type {
            CollectionType::Measurement => format!(
                "Successfully exported {} measurement(s) to XNAT",
                self.item_count
            ),
            CollectionType::Segmentation => {
                format!("Segmentation \"{}\" exported to XNAT successfully", self.label)
            }
        }
    }

    /// 失败提示
    pub fn failure_message(&self, reason: &impl Display) -> String {
        match self.collection_type {
            CollectionType::Measurement => format!("Failed to export measurements: {}", reason),
            CollectionType::Segmentation => format!("Failed to export segmentation: {}", reason),
        }
    }

    /// 覆盖确认提示
    pub fn overwrite_question(&self) -> String {
        let kind = match self.collection_type {
            CollectionType::Measurement => "measurement",
            CollectionType::Segmentation => "segmentation",
        };
        format!(
            "A {} collection named \"{}\" already exists in XNAT.\n\nDo you want to overwrite it?",
            kind, self.label
        )
    }
}

impl Display for ExportCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} 集合 {} → 实验 {}]",
            self.collection_type.as_str(),
            self.label,
            self.experiment_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let ctx = ExportCtx::new(CollectionType::Measurement, "M_1", "XNAT_E1", 3);
        assert_eq!(ctx.success_message(), "Successfully exported 3 measurement(s) to XNAT");
        assert_eq!(ctx.to_string(), "[MEAS 集合 M_1 → 实验 XNAT_E1]");

        let seg = ExportCtx::new(CollectionType::Segmentation, "Liver", "XNAT_E1", 2);
        assert_eq!(seg.failure_message(&"timeout"), "Failed to export segmentation: timeout");
        assert!(seg.overwrite_question().contains("segmentation collection named \"Liver\""));
    }
}
