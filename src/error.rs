use thiserror::Error;

/// 应用程序错误类型
///
/// 用户取消（关闭输入框）不是错误，由 `Option` / 结果枚举表达
#[derive(Debug, Error)]
pub enum AppError {
    /// XNAT 归档相关错误
    #[error("归档错误: {0}")]
    Archive(#[from] ArchiveError),
    /// 查找对象失败
    #[error("未找到: {0}")]
    NotFound(#[from] NotFoundError),
    /// 生成 / 编码导出数据失败
    #[error("编码错误: {0}")]
    Encode(#[from] EncodeError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// XNAT 归档错误
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 同名集合已存在（需要用户确认覆盖）
    #[error("集合 '{label}' 已存在")]
    CollectionExists { label: String },
    /// 网络请求失败
    #[error("请求失败 ({url}): {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务器返回非成功状态
    #[error("服务器返回错误响应 ({url}): status={status}, body={body}")]
    BadResponse {
        url: String,
        status: u16,
        body: String,
    },
    /// 无法确定实验 ID
    #[error("无法确定 XNAT 实验 ID")]
    MissingExperimentId,
    /// 无法确定项目 ID
    #[error("无法确定 XNAT 项目 ID")]
    MissingProjectId,
}

/// 查找失败
#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("分割 {id}")]
    Segmentation { id: String },
    #[error("分割 {segmentation_id} 的 labelmap")]
    Labelmap { segmentation_id: String },
    #[error("图像 {image_id}")]
    Image { image_id: String },
}

/// 生成 / 编码错误
#[derive(Debug, Error)]
pub enum EncodeError {
    /// JSON 序列化 / 解析失败
    #[error("JSON 处理失败: {0}")]
    Json(#[from] serde_json::Error),
    /// DICOM 对象构建或写出失败
    #[error("DICOM 编码失败: {message}")]
    Dicom { message: String },
    /// 分割数据不完整
    #[error("分割生成失败: {message}")]
    Segmentation { message: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML 解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 缺少必填项
    #[error("缺少配置项 {name}")]
    Missing { name: String },
    /// 地址无法解析
    #[error("无效的地址 '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Encode(EncodeError::Json(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: err,
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建无效地址错误
    pub fn invalid_url(url: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Config(ConfigError::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        })
    }

    /// 创建集合已存在错误
    pub fn collection_exists(label: impl Into<String>) -> Self {
        AppError::Archive(ArchiveError::CollectionExists {
            label: label.into(),
        })
    }

    /// 创建请求失败错误
    pub fn request_failed(url: impl Into<String>, source: reqwest::Error) -> Self {
        AppError::Archive(ArchiveError::RequestFailed {
            url: url.into(),
            source,
        })
    }

    /// 创建分割未找到错误
    pub fn segmentation_not_found(id: impl Into<String>) -> Self {
        AppError::NotFound(NotFoundError::Segmentation { id: id.into() })
    }

    /// 创建 labelmap 未找到错误
    pub fn labelmap_not_found(segmentation_id: impl Into<String>) -> Self {
        AppError::NotFound(NotFoundError::Labelmap {
            segmentation_id: segmentation_id.into(),
        })
    }

    /// 创建图像未找到错误
    pub fn image_not_found(image_id: impl Into<String>) -> Self {
        AppError::NotFound(NotFoundError::Image {
            image_id: image_id.into(),
        })
    }

    /// 创建 DICOM 编码错误
    pub fn dicom(message: impl std::fmt::Display) -> Self {
        AppError::Encode(EncodeError::Dicom {
            message: message.to_string(),
        })
    }

    /// 创建分割生成错误
    pub fn segmentation_invalid(message: impl Into<String>) -> Self {
        AppError::Encode(EncodeError::Segmentation {
            message: message.into(),
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 是否为"集合已存在"冲突，导出流程据此决定是否询问覆盖
    pub fn is_collection_exists(&self) -> bool {
        matches!(
            self,
            AppError::Archive(ArchiveError::CollectionExists { .. })
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
