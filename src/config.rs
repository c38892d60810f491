use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult, FileError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// XNAT 根地址
    pub xnat_root_url: String,
    /// XNAT 用户名（为空时不做 basic auth）
    pub xnat_username: Option<String>,
    pub xnat_password: Option<String>,
    /// 项目 ID，未配置时从会话信息中查找
    pub project_id: Option<String>,
    /// 实验 ID，优先级最高的来源
    pub experiment_id: Option<String>,
    /// CSV / 本地导出文件目录
    pub output_dir: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 请求超时（秒），不配置则一直等待
    pub request_timeout_secs: Option<u64>,
    /// 只打包到本地，不上传
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            xnat_root_url: "http://localhost:8080".to_string(),
            xnat_username: None,
            xnat_password: None,
            project_id: None,
            experiment_id: None,
            output_dir: "output".to_string(),
            verbose_logging: false,
            request_timeout_secs: None,
            dry_run: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载，缺省字段取默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        toml::from_str(&content).map_err(|source| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source,
            })
        })
    }

    /// 文件配置（可选）+ 环境变量覆盖
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let base = match path {
            Some(p) => Self::from_toml_file(p)?,
            None => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        let env = |name: &str| std::env::var(name).ok();
        Self {
            xnat_root_url: env("XNAT_ROOT_URL").unwrap_or(self.xnat_root_url),
            xnat_username: env("XNAT_USERNAME").or(self.xnat_username),
            xnat_password: env("XNAT_PASSWORD").or(self.xnat_password),
            project_id: env("XNAT_PROJECT_ID").or(self.project_id),
            experiment_id: env("XNAT_EXPERIMENT_ID").or(self.experiment_id),
            output_dir: env("OUTPUT_DIR").unwrap_or(self.output_dir),
            verbose_logging: env("VERBOSE_LOGGING").and_then(|v| v.parse().ok()).unwrap_or(self.verbose_logging),
            request_timeout_secs: env("REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()).or(self.request_timeout_secs),
            dry_run: env("DRY_RUN").and_then(|v| v.parse().ok()).unwrap_or(self.dry_run),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            xnat_root_url = "https://xnat.example.org"
            project_id = "PRJ01"
            "#,
        )
        .unwrap();

        assert_eq!(config.xnat_root_url, "https://xnat.example.org");
        assert_eq!(config.project_id.as_deref(), Some("PRJ01"));
        assert_eq!(config.output_dir, "output");
        assert!(!config.dry_run);
        assert!(config.request_timeout_secs.is_none());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::from_toml_file(Path::new("/nonexistent/xnat.toml")).unwrap_err();
        assert!(matches!(err, AppError::File(FileError::ReadFailed { .. })));
    }
}
