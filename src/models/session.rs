//! 会话上下文：当前序列信息与 XNAT 会话映射
//!
//! 取代查看器中的全局 sessionMap / sessionStorage，显式传入导出函数

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// 当前活动视口所显示的序列
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySetInfo {
    #[serde(rename = "PatientID", default)]
    pub patient_id: String,
    #[serde(rename = "StudyInstanceUID")]
    pub study_instance_uid: String,
    #[serde(rename = "SeriesInstanceUID")]
    pub series_instance_uid: String,
    #[serde(rename = "Modality", default)]
    pub modality: String,
}

/// 一个 XNAT 会话（实验）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub experiment_id: Option<String>,
    pub project_id: Option<String>,
}

/// 序列 / 检查到 XNAT 会话的映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMap {
    /// SeriesInstanceUID → experimentId
    #[serde(default)]
    pub series: HashMap<String, String>,
    /// StudyInstanceUID → 会话
    #[serde(default)]
    pub studies: HashMap<String, SessionData>,
}

impl SessionMap {
    /// 按序列查找实验 ID
    pub fn experiment_for_series(&self, series_uid: &str) -> Option<&str> {
        self.series.get(series_uid).map(String::as_str)
    }

    /// 只有一个会话时直接返回它的实验 ID
    pub fn single_experiment(&self) -> Option<&str> {
        let mut ids = self
            .studies
            .values()
            .filter_map(|s| s.experiment_id.as_deref());
        match (ids.next(), ids.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }

    pub fn session_for_study(&self, study_uid: &str) -> Option<&SessionData> {
        self.studies.get(study_uid)
    }
}

/// 实验 ID 的所有候选来源
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// 路由传入的实验 ID（最高优先级）
    pub router_experiment_id: Option<String>,
    /// 之前保存的实验 ID
    pub stored_experiment_id: Option<String>,
    #[serde(default)]
    pub session_map: SessionMap,
}
