//! Data Transfer Objects

use serde::{Deserialize, Serialize};

use crate::application::{GenerateResponse, TransformationSummary};

// ============================================================================
// Generate DTOs
// ============================================================================

/// 缺失字段由应用层校验，这里不做必填约束
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub transformation: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponseDto {
    pub images: Vec<String>,
    pub generation_id: String,
}

impl From<GenerateResponse> for GenerateResponseDto {
    fn from(response: GenerateResponse) -> Self {
        Self {
            images: response.images,
            generation_id: response.generation_id.to_string(),
        }
    }
}

// ============================================================================
// Progress DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ProgressParams {
    #[serde(default)]
    pub id: Option<String>,
}

// ============================================================================
// Transformation DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct TransformationDto {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<TransformationSummary> for TransformationDto {
    fn from(summary: TransformationSummary) -> Self {
        Self {
            id: summary.id,
            name: summary.name,
            description: summary.description,
        }
    }
}
