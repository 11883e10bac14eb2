//! HTTP Prediction Client - 调用外部预测服务（Replicate 风格 API）
//!
//! 实现 PredictionServicePort trait
//!
//! 外部 API:
//! POST {base_url}/models/{owner}/{name}/predictions   Request: {"input": {...}}
//! POST {base_url}/predictions                         Request: {"version": "...", "input": {...}}
//! GET  {base_url}/predictions/{id}
//! Response: {"id": "...", "status": "...", "output": ..., "error": ...}

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::application::ports::{
    PredictionError, PredictionHandle, PredictionRequest, PredictionServicePort,
};
use crate::domain::generation::{PredictionState, PredictionStatus};

/// 创建预测请求体
#[derive(Debug, Serialize)]
struct CreatePredictionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<&'a str>,
    input: &'a Value,
}

/// 预测对象
#[derive(Debug, Deserialize)]
struct PredictionBody {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl PredictionBody {
    fn into_status(self) -> PredictionStatus {
        PredictionStatus {
            state: PredictionState::parse(&self.status),
            output: self.output.and_then(parse_output),
            error: self.error.and_then(parse_error),
        }
    }
}

/// output 可能是单个字符串或字符串数组，非字符串元素丢弃
fn parse_output(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(vec![s]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    other => {
                        tracing::debug!(item = %other, "Dropping non-string prediction output");
                        None
                    }
                })
                .collect(),
        ),
        other => {
            tracing::debug!(output = %other, "Unexpected prediction output shape");
            Some(Vec::new())
        }
    }
}

fn parse_error(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// 模型引用对应的创建地址
#[derive(Debug, PartialEq, Eq)]
enum CreateTarget<'a> {
    /// `owner/name` -> /models/{owner}/{name}/predictions
    Model { owner: &'a str, name: &'a str },
    /// `owner/name:version` -> /predictions
    Version(&'a str),
}

fn parse_model_ref(model: &str) -> Result<CreateTarget<'_>, PredictionError> {
    let model = model.trim();
    if let Some((_, version)) = model.split_once(':') {
        if version.is_empty() {
            return Err(PredictionError::InvalidModel(model.to_string()));
        }
        return Ok(CreateTarget::Version(version));
    }

    match model.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok(CreateTarget::Model { owner, name })
        }
        _ => Err(PredictionError::InvalidModel(model.to_string())),
    }
}

/// HTTP Prediction 客户端配置
#[derive(Debug, Clone)]
pub struct HttpPredictionClientConfig {
    /// API 基础 URL
    pub base_url: String,
    /// API Token
    pub api_token: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpPredictionClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.replicate.com/v1".to_string(),
            api_token: String::new(),
            timeout_secs: 30,
        }
    }
}

impl HttpPredictionClientConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: api_token.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP Prediction 客户端
pub struct HttpPredictionClient {
    client: Client,
    config: HttpPredictionClientConfig,
}

impl HttpPredictionClient {
    pub fn new(mut config: HttpPredictionClientConfig) -> Result<Self, PredictionError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PredictionError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn create_url(&self, target: &CreateTarget<'_>) -> String {
        match target {
            CreateTarget::Model { owner, name } => {
                format!("{}/models/{}/{}/predictions", self.config.base_url, owner, name)
            }
            CreateTarget::Version(_) => format!("{}/predictions", self.config.base_url),
        }
    }

    fn status_url(&self, id: &str) -> String {
        format!("{}/predictions/{}", self.config.base_url, id)
    }

    fn map_send_error(e: reqwest::Error) -> PredictionError {
        if e.is_timeout() {
            PredictionError::Timeout
        } else if e.is_connect() {
            PredictionError::NetworkError(format!("Cannot connect to prediction service: {}", e))
        } else {
            PredictionError::NetworkError(e.to_string())
        }
    }

    async fn read_prediction(response: Response) -> Result<PredictionBody, PredictionError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PredictionError::ServiceError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        response
            .json::<PredictionBody>()
            .await
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl PredictionServicePort for HttpPredictionClient {
    async fn submit(&self, request: PredictionRequest) -> Result<PredictionHandle, PredictionError> {
        let target = parse_model_ref(&request.model)?;
        let url = self.create_url(&target);
        let body = CreatePredictionBody {
            version: match &target {
                CreateTarget::Version(version) => Some(*version),
                CreateTarget::Model { .. } => None,
            },
            input: &request.input,
        };

        tracing::debug!(url = %url, model = %request.model, "Submitting prediction");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_token)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let prediction = Self::read_prediction(response).await?;

        tracing::info!(
            prediction_id = %prediction.id,
            status = %prediction.status,
            model = %request.model,
            "Prediction submitted"
        );

        Ok(PredictionHandle::new(prediction.id))
    }

    async fn get_status(&self, handle: &PredictionHandle) -> Result<PredictionStatus, PredictionError> {
        let response = self
            .client
            .get(self.status_url(&handle.id))
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let prediction = Self::read_prediction(response).await?;
        if prediction.id != handle.id {
            tracing::warn!(
                expected = %handle.id,
                actual = %prediction.id,
                "Prediction id mismatch in status response"
            );
        }

        Ok(prediction.into_status())
    }
}
