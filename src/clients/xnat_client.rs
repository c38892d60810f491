/// XNAT ROI 集合上传客户端
///
/// `PUT {root}/xapi/roi/projects/{project}/sessions/{experiment}/collections/{label}`
/// - 409: 集合已存在（导出流程据此询问是否覆盖）
/// - 其他非 2xx: 错误响应
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ArchiveError};
use crate::utils::logging::truncate_text;

/// 集合类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionType {
    Measurement,
    Segmentation,
}

impl CollectionType {
    pub fn as_str(self) -> &'static str {
        match self {
            CollectionType::Measurement => "MEAS",
            CollectionType::Segmentation => "SEG",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            CollectionType::Measurement => "application/octet-stream",
            CollectionType::Segmentation => "application/dicom",
        }
    }

    /// 本地保存时使用的扩展名
    pub fn file_extension(self) -> &'static str {
        match self {
            CollectionType::Measurement => "json",
            CollectionType::Segmentation => "dcm",
        }
    }
}

/// 一次上传的全部参数
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub payload: Vec<u8>,
    pub collection_type: CollectionType,
    pub series_instance_uid: String,
    pub label: String,
    pub experiment_id: String,
    pub project_id: String,
}

/// 归档上传
#[async_trait]
pub trait ArchiveUploader: Send + Sync {
    async fn upload(&self, request: &UploadRequest, overwrite: bool) -> AppResult<()>;
}

/// XNAT 客户端
pub struct XnatClient {
    root_url: Url,
    username: Option<String>,
    password: Option<String>,
    client: reqwest::Client,
}

impl XnatClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> AppResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AppError::request_failed(&config.xnat_root_url, e))?;

        let root_url = Url::parse(&config.xnat_root_url)
            .map_err(|e| AppError::invalid_url(&config.xnat_root_url, e))?;
        if root_url.cannot_be_a_base() {
            return Err(AppError::invalid_url(&config.xnat_root_url, "不能作为基础地址"));
        }

        Ok(Self {
            root_url,
            username: config.xnat_username.clone().filter(|u| !u.is_empty()),
            password: config.xnat_password.clone(),
            client,
        })
    }

    /// 集合地址，路径段与查询参数都经过百分号编码
    pub fn collection_url(&self, request: &UploadRequest, overwrite: bool) -> AppResult<Url> {
        let mut url = self.root_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::invalid_url(self.root_url.as_str(), "不能作为基础地址"))?
            .pop_if_empty()
            .extend([
                "xapi",
                "roi",
                "projects",
                request.project_id.as_str(),
                "sessions",
                request.experiment_id.as_str(),
                "collections",
                request.label.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("type", request.collection_type.as_str())
            .append_pair("overwrite", if overwrite { "true" } else { "false" })
            .append_pair("seriesuid", &request.series_instance_uid);
        Ok(url)
    }
}

/// 根据响应状态判断上传结果
pub fn classify_response(url: &str, label: &str, status: u16, body: String) -> AppResult<()> {
    match status {
        200..=299 => Ok(()),
        409 => Err(AppError::collection_exists(label)),
        _ => Err(ArchiveError::BadResponse {
            url: url.to_string(),
            status,
            body,
        }
        .into()),
    }
}

#[async_trait]
impl ArchiveUploader for XnatClient {
    async fn upload(&self, request: &UploadRequest, overwrite: bool) -> AppResult<()> {
        let url = self.collection_url(request, overwrite)?;
        info!(
            "正在上传 {} 集合 {} ({} 字节, overwrite={})",
            request.collection_type.as_str(),
            request.label,
            request.payload.len(),
            overwrite
        );

        let mut builder = self
            .client
            .put(url.clone())
            .header(reqwest::header::CONTENT_TYPE, request.collection_type.content_type())
            .body(request.payload.clone());
        if let Some(username) = &self.username {
            builder = builder.basic_auth(username, self.password.as_ref());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::request_failed(url.as_str(), e))?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        debug!("上传响应: status={}, body={}", status, truncate_text(&body, 200));

        let result = classify_response(url.as_str(), &request.label, status, body);
        match &result {
            Ok(()) => info!("✓ 集合 {} 上传成功", request.label),
            Err(e) if e.is_collection_exists() => warn!("集合 {} 已存在", request.label),
            Err(e) => warn!("集合 {} 上传失败: {}", request.label, e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> UploadRequest {
        UploadRequest {
            payload: b"{}".to_vec(),
            collection_type: CollectionType::Segmentation,
            series_instance_uid: "1.2.3".into(),
            label: "Liver_Seg".into(),
            experiment_id: "XNAT_E00001".into(),
            project_id: "PROJ".into(),
        }
    }

    #[test]
    fn test_collection_url() {
        let config = Config {
            xnat_root_url: "https://xnat.example.org/".into(),
            ..Default::default()
        };
        let client = XnatClient::new(&config).unwrap();

        assert_eq!(
            client.collection_url(&request(), true).unwrap().as_str(),
            "https://xnat.example.org/xapi/roi/projects/PROJ/sessions/XNAT_E00001/collections/Liver_Seg?type=SEG&overwrite=true&seriesuid=1.2.3"
        );
    }

    #[test]
    fn test_collection_url_encodes_ids() {
        let config = Config {
            xnat_root_url: "https://xnat.example.org/xnat".into(),
            ..Default::default()
        };
        let client = XnatClient::new(&config).unwrap();
        let mut request = request();
        request.project_id = "My Proj/1".into();
        request.experiment_id = "E?1#2".into();
        request.series_instance_uid = "1.2 3&x=y".into();

        let url = client.collection_url(&request, false).unwrap();
        assert_eq!(
            url.path(),
            "/xnat/xapi/roi/projects/My%20Proj%2F1/sessions/E%3F1%232/collections/Liver_Seg"
        );
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(query[2], ("seriesuid".to_string(), "1.2 3&x=y".to_string()));
        assert_eq!(query[1], ("overwrite".to_string(), "false".to_string()));
    }

    #[test]
    fn test_invalid_root_url() {
        let config = Config {
            xnat_root_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(
            XnatClient::new(&config),
            Err(AppError::Config(crate::error::ConfigError::InvalidUrl { .. }))
        ));
    }

    #[test]
    fn test_classify_response() {
        assert!(classify_response("u", "L", 200, String::new()).is_ok());
        assert!(classify_response("u", "L", 201, String::new()).is_ok());
        assert!(classify_response("u", "L", 409, String::new())
            .unwrap_err()
            .is_collection_exists());

        let err = classify_response("u", "L", 500, "boom".into()).unwrap_err();
        assert!(!err.is_collection_exists());
        assert!(err.to_string().contains("status=500"));
    }

    #[test]
    fn test_measurement_type() {
        assert_eq!(CollectionType::Measurement.as_str(), "MEAS");
        assert_eq!(CollectionType::Measurement.file_extension(), "json");
    }

    #[tokio::test]
    #[ignore = "需要可访问的 XNAT 服务"]
    async fn test_upload_against_live_server() {
        let config = Config::from_env();
        let client = XnatClient::new(&config).unwrap();
        client.upload(&request(), false).await.unwrap();
    }
}
