//! Generation Context - Value Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 生成任务唯一标识
///
/// 对调用方是不透明的字符串；服务端生成时使用 UUID v4
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(String);

impl GenerationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// 从外部传入的字符串构造（例如 query 参数），空字符串视为无效
    pub fn parse(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GenerationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GenerationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 本地生成状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Starting,
    Generating,
    Processing,
    Complete,
    Error,
}

impl GenerationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Starting => "starting",
            GenerationStatus::Generating => "generating",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Complete => "complete",
            GenerationStatus::Error => "error",
        }
    }

    /// complete / error 之后不会再有进度更新
    pub fn is_terminal(&self) -> bool {
        matches!(self, GenerationStatus::Complete | GenerationStatus::Error)
    }
}

/// 进度记录
///
/// progress 只是展示值，不保证单调递增
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub status: GenerationStatus,
    pub progress: u8,
    pub message: String,
}

impl ProgressRecord {
    pub fn new(status: GenerationStatus, progress: u8, message: impl Into<String>) -> Self {
        Self {
            status,
            progress: progress.min(100),
            message: message.into(),
        }
    }

    pub fn starting() -> Self {
        Self::new(GenerationStatus::Starting, 0, "Starting image generation...")
    }

    pub fn submitted() -> Self {
        Self::new(GenerationStatus::Generating, 10, "Generating images...")
    }

    pub fn error(progress: u8, message: impl Into<String>) -> Self {
        Self::new(GenerationStatus::Error, progress, message)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// 外部预测服务报告的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PredictionState {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    /// 未识别的状态字符串，按"仍在生成"处理
    Other(String),
}

impl PredictionState {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "starting" => PredictionState::Starting,
            "processing" => PredictionState::Processing,
            "succeeded" => PredictionState::Succeeded,
            "failed" => PredictionState::Failed,
            "canceled" | "cancelled" => PredictionState::Canceled,
            other => PredictionState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PredictionState::Starting => "starting",
            PredictionState::Processing => "processing",
            PredictionState::Succeeded => "succeeded",
            PredictionState::Failed => "failed",
            PredictionState::Canceled => "canceled",
            PredictionState::Other(s) => s,
        }
    }

    /// 外部服务不会再改变的状态
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            PredictionState::Succeeded | PredictionState::Failed | PredictionState::Canceled
        )
    }
}

/// 一次状态查询的结果快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionStatus {
    pub state: PredictionState,
    pub output: Option<Vec<String>>,
    pub error: Option<String>,
}

impl PredictionStatus {
    pub fn new(state: PredictionState) -> Self {
        Self {
            state,
            output: None,
            error: None,
        }
    }

    pub fn processing() -> Self {
        Self::new(PredictionState::Processing)
    }

    pub fn succeeded<I, S>(output: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: PredictionState::Succeeded,
            output: Some(output.into_iter().map(Into::into).collect()),
            error: None,
        }
    }

    pub fn failed(error: Option<&str>) -> Self {
        Self {
            state: PredictionState::Failed,
            output: None,
            error: error.map(str::to_string),
        }
    }
}
