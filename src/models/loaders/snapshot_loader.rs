use std::path::Path;

use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::snapshot::ViewerSnapshot;

/// 从 JSON 文件加载查看器状态快照
pub async fn load_snapshot(snapshot_path: &Path) -> AppResult<ViewerSnapshot> {
    let content = fs::read_to_string(snapshot_path)
        .await
        .map_err(|e| AppError::file_read_failed(snapshot_path.display().to_string(), e))?;

    let snapshot: ViewerSnapshot = serde_json::from_str(&content)?;

    info!(
        "✓ 已加载快照 {}: {} 个测量, {} 个分割, {} 幅缓存图像",
        snapshot_path.display(),
        snapshot.measurements.len(),
        snapshot.segmentations.len(),
        snapshot.images.len()
    );

    Ok(snapshot)
}

/// 读取一个测量集合文件（原始字节，交给导入器解析）
pub async fn load_collection_file(collection_path: &Path) -> AppResult<Vec<u8>> {
    fs::read(collection_path)
        .await
        .map_err(|e| AppError::file_read_failed(collection_path.display().to_string(), e))
}
