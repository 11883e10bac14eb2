//! Transformation Context - 风格转换目录
//!
//! 每个 transformation 把一个标识映射到提示词模板和模型引用

mod catalog;

pub use catalog::{CatalogError, Transformation, TransformationCatalog};
