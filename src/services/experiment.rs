//! XNAT 实验 / 项目 ID 解析
//!
//! 查找顺序：
//! 1. 会话路由给出的实验 ID
//! 2. 本地保存的实验 ID
//! 3. 会话映射（按序列 UID）
//! 4. 会话映射中唯一的会话
//! 5. 检查对应的会话数据

use tracing::debug;

use crate::models::session::SessionContext;

/// 解析实验 ID，全部来源都没有时返回 `None`
pub fn resolve_experiment_id(
    session: &SessionContext,
    series_instance_uid: &str,
    study_instance_uid: &str,
) -> Option<String> {
    let map = &session.session_map;

    let candidates = [
        ("路由", session.router_experiment_id.as_deref()),
        ("本地存储", session.stored_experiment_id.as_deref()),
        ("序列映射", map.experiment_for_series(series_instance_uid)),
        ("唯一会话", map.single_experiment()),
        (
            "检查会话",
            map.session_for_study(study_instance_uid)
                .and_then(|s| s.experiment_id.as_deref()),
        ),
    ];

    candidates
        .into_iter()
        .find_map(|(source, id)| {
            id.filter(|id| !id.is_empty()).map(|id| {
                debug!("实验 ID {} 来自{}", id, source);
                id.to_string()
            })
        })
}

/// 解析项目 ID：配置优先，其次为检查对应的会话数据
pub fn resolve_project_id(
    configured: Option<&str>,
    session: &SessionContext,
    study_instance_uid: &str,
) -> Option<String> {
    configured
        .filter(|id| !id.is_empty())
        .or_else(|| {
            session
                .session_map
                .session_for_study(study_instance_uid)
                .and_then(|s| s.project_id.as_deref())
        })
        .map(str::to_string)
}
