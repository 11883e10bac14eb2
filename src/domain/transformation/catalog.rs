//! Transformation Context - Catalog

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse transformations: {0}")]
    Parse(String),

    #[error("Duplicate transformation id: {0}")]
    Duplicate(String),

    #[error("Invalid transformation {id}: {reason}")]
    Invalid { id: String, reason: String },

    #[error("Transformation catalog is empty")]
    Empty,
}

fn default_image_field() -> String {
    "image".to_string()
}

/// 单个风格转换定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transformation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// 提示词模板
    pub prompt: String,
    /// 模型引用：`owner/name` 或 `owner/name:version`
    pub model: String,
    /// 模型输入中承载图片的字段名
    #[serde(default = "default_image_field")]
    pub image_field: String,
    /// 额外的模型输入参数
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl Transformation {
    /// 构造提交给预测服务的 input 对象
    pub fn build_input(&self, image: &str) -> Value {
        let mut input = self.params.clone();
        input.insert("prompt".to_string(), Value::String(self.prompt.clone()));
        input.insert(self.image_field.clone(), Value::String(image.to_string()));
        Value::Object(input)
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |reason: &str| CatalogError::Invalid {
            id: self.id.clone(),
            reason: reason.to_string(),
        };

        if self.id.trim().is_empty() {
            return Err(invalid("id cannot be empty"));
        }
        if self.prompt.trim().is_empty() {
            return Err(invalid("prompt cannot be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(invalid("model cannot be empty"));
        }
        if self.image_field.trim().is_empty() || self.image_field == "prompt" {
            return Err(invalid("image_field must be a non-empty key other than 'prompt'"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    transformation: Vec<Transformation>,
}

/// 转换目录（只读，启动时加载一次）
#[derive(Debug, Clone)]
pub struct TransformationCatalog {
    items: BTreeMap<String, Transformation>,
}

const DEFAULT_MODEL: &str = "black-forest-labs/flux-kontext-pro";

impl TransformationCatalog {
    pub fn new(transformations: Vec<Transformation>) -> Result<Self, CatalogError> {
        if transformations.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut items = BTreeMap::new();
        for t in transformations {
            t.validate()?;
            if items.contains_key(&t.id) {
                return Err(CatalogError::Duplicate(t.id));
            }
            items.insert(t.id.clone(), t);
        }
        Ok(Self { items })
    }

    /// 从 TOML 文本解析（`[[transformation]]` 数组）
    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::new(file.transformation)
    }

    /// 内置目录
    pub fn builtin() -> Self {
        let entries = [
            (
                "anime",
                "Anime",
                "Hand-drawn Japanese animation look",
                "Transform this photo into a vibrant anime illustration with clean line art and cel shading, keep the composition and the subject's pose",
            ),
            (
                "watercolor",
                "Watercolor",
                "Soft watercolor painting",
                "Repaint this image as a delicate watercolor painting with soft bleeding edges and paper texture, keep the composition",
            ),
            (
                "pixel-art",
                "Pixel Art",
                "16-bit retro game sprite style",
                "Convert this image into detailed 16-bit pixel art with a limited color palette, keep the subject recognizable",
            ),
            (
                "cyberpunk",
                "Cyberpunk",
                "Neon-lit futuristic city mood",
                "Restyle this image as a cyberpunk scene with neon lighting, rain-slick reflections and futuristic details, keep the subject",
            ),
            (
                "oil-painting",
                "Oil Painting",
                "Classical oil on canvas",
                "Transform this image into a classical oil painting with visible brush strokes and rich warm tones, keep the composition",
            ),
        ];

        let items = entries
            .into_iter()
            .map(|(id, name, description, prompt)| {
                let mut params = Map::new();
                params.insert(
                    "aspect_ratio".to_string(),
                    Value::String("match_input_image".to_string()),
                );
                params.insert("output_format".to_string(), Value::String("png".to_string()));
                (
                    id.to_string(),
                    Transformation {
                        id: id.to_string(),
                        name: name.to_string(),
                        description: description.to_string(),
                        prompt: prompt.to_string(),
                        model: DEFAULT_MODEL.to_string(),
                        image_field: "input_image".to_string(),
                        params,
                    },
                )
            })
            .collect();

        Self { items }
    }

    pub fn get(&self, id: &str) -> Option<&Transformation> {
        self.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// 按 id 排序
    pub fn list(&self) -> impl Iterator<Item = &Transformation> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for TransformationCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
