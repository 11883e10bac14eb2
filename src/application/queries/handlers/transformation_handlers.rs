//! Transformation Query Handlers

use std::sync::Arc;

use crate::application::queries::ListTransformations;
use crate::domain::transformation::{Transformation, TransformationCatalog};

/// 对外展示的转换信息（不暴露提示词和模型）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationSummary {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<&Transformation> for TransformationSummary {
    fn from(t: &Transformation) -> Self {
        Self {
            id: t.id.clone(),
            name: t.name.clone(),
            description: t.description.clone(),
        }
    }
}

/// ListTransformations Handler
pub struct ListTransformationsHandler {
    catalog: Arc<TransformationCatalog>,
}

impl ListTransformationsHandler {
    pub fn new(catalog: Arc<TransformationCatalog>) -> Self {
        Self { catalog }
    }

    pub fn handle(&self, _query: ListTransformations) -> Vec<TransformationSummary> {
        self.catalog.list().map(TransformationSummary::from).collect()
    }
}
