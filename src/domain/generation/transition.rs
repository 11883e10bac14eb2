//! Generation Context - 轮询状态机
//!
//! 纯函数：外部状态 + 尝试序号 -> 本地进度记录 / 终态。
//! 不含任何 IO 或定时逻辑，便于脱离真实延迟做单元测试。
//!
//! 状态流转:
//! ```text
//! Starting -> Generating/Processing -> { Complete | Error }
//! ```

use reqwest::Url;

use super::{GenerationError, GenerationStatus, PredictionState, PredictionStatus, ProgressRecord};

/// 单次轮询的结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// 未到终态，写入记录后继续轮询
    Pending(ProgressRecord),
    /// 成功，images 已通过 URL 校验且非空
    Completed {
        record: ProgressRecord,
        images: Vec<String>,
    },
    /// 失败终态
    Failed {
        record: ProgressRecord,
        error: GenerationError,
    },
}

impl PollOutcome {
    pub fn record(&self) -> &ProgressRecord {
        match self {
            PollOutcome::Pending(record) => record,
            PollOutcome::Completed { record, .. } => record,
            PollOutcome::Failed { record, .. } => record,
        }
    }
}

/// 按尝试序号计算展示进度，attempt 从 0 开始
pub fn attempt_progress(attempt: u32, max_attempts: u32) -> u8 {
    if max_attempts == 0 {
        return 100;
    }
    let scaled = (u64::from(attempt) * 100 + u64::from(max_attempts) / 2) / u64::from(max_attempts);
    scaled.min(100) as u8
}

/// 根据一次状态查询的结果推进状态机
pub fn evaluate_poll(status: &PredictionStatus, attempt: u32, max_attempts: u32) -> PollOutcome {
    let progress = attempt_progress(attempt, max_attempts);

    match &status.state {
        PredictionState::Processing => PollOutcome::Pending(ProgressRecord::new(
            GenerationStatus::Processing,
            progress,
            "Processing image...",
        )),
        PredictionState::Succeeded => {
            // succeeded 但没有 output 不算成功
            let output = match status.output.as_deref() {
                Some(output) if !output.is_empty() => output,
                _ => {
                    let error = GenerationError::InvalidResponse;
                    return PollOutcome::Failed {
                        record: ProgressRecord::error(progress, error.to_string()),
                        error,
                    };
                }
            };

            let images = filter_image_urls(output);
            if images.is_empty() {
                let error = GenerationError::NoValidImages;
                return PollOutcome::Failed {
                    record: ProgressRecord::error(progress, error.to_string()),
                    error,
                };
            }

            PollOutcome::Completed {
                record: ProgressRecord::new(
                    GenerationStatus::Complete,
                    100,
                    "Generation complete!",
                ),
                images,
            }
        }
        PredictionState::Failed => {
            let message = external_message(status, "Generation failed");
            PollOutcome::Failed {
                record: ProgressRecord::error(progress, message.clone()),
                error: GenerationError::Failed(message),
            }
        }
        PredictionState::Canceled => {
            let message = external_message(status, "Generation was canceled");
            PollOutcome::Failed {
                record: ProgressRecord::error(progress, message.clone()),
                error: GenerationError::Canceled(message),
            }
        }
        PredictionState::Starting | PredictionState::Other(_) => PollOutcome::Pending(
            ProgressRecord::new(GenerationStatus::Generating, progress, "Generating images..."),
        ),
    }
}

/// 尝试次数耗尽
pub fn timed_out() -> (ProgressRecord, GenerationError) {
    let error = GenerationError::TimedOut;
    (ProgressRecord::error(100, error.to_string()), error)
}

/// 过滤输出列表，只保留带 scheme 的非空 URL
pub fn filter_image_urls(output: &[String]) -> Vec<String> {
    output
        .iter()
        .map(|item| item.trim())
        .filter(|item| is_image_url(item))
        .map(str::to_string)
        .collect()
}

fn is_image_url(candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    match Url::parse(candidate) {
        Ok(url) => match url.scheme() {
            "http" | "https" => url.host_str().is_some(),
            "data" => true,
            _ => false,
        },
        Err(_) => false,
    }
}

fn external_message(status: &PredictionStatus, fallback: &str) -> String {
    status
        .error
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
