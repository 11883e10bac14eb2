//! Generate Command Handler
//!
//! 流程：校验 -> 创建 generation id -> 写入 starting -> 提交外部任务
//! -> 写入 generating -> 等待完成 -> 调度延迟清理

use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

use crate::application::commands::generate_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{PredictionRequest, PredictionServicePort, ProgressStorePort};
use crate::application::services::{DeferredCleanup, PredictionWaiter};
use crate::domain::generation::{GenerationId, ProgressRecord};
use crate::domain::transformation::{Transformation, TransformationCatalog};

/// Generate Handler - 提交图像生成并等待结果
pub struct GenerateHandler {
    catalog: Arc<TransformationCatalog>,
    prediction_service: Arc<dyn PredictionServicePort>,
    progress_store: Arc<dyn ProgressStorePort>,
    waiter: PredictionWaiter,
    cleanup: Arc<DeferredCleanup>,
    cleanup_delay: Duration,
}

impl GenerateHandler {
    pub fn new(
        catalog: Arc<TransformationCatalog>,
        prediction_service: Arc<dyn PredictionServicePort>,
        progress_store: Arc<dyn ProgressStorePort>,
        waiter: PredictionWaiter,
        cleanup: Arc<DeferredCleanup>,
        cleanup_delay: Duration,
    ) -> Self {
        Self {
            catalog,
            prediction_service,
            progress_store,
            waiter,
            cleanup,
            cleanup_delay,
        }
    }

    pub async fn handle(&self, cmd: GenerateCommand) -> Result<GenerateResponse, ApplicationError> {
        let (image, transformation) = self.validate(&cmd)?;

        let generation_id = GenerationId::new();
        self.progress_store
            .set(&generation_id, ProgressRecord::starting());

        tracing::info!(
            generation_id = %generation_id,
            transformation = %transformation.id,
            model = %transformation.model,
            "Generation started"
        );

        let result = self.run(&generation_id, image, transformation).await;

        // 无论成功与否都要清理
        self.cleanup
            .schedule(generation_id.clone(), self.cleanup_delay);

        result.map(|images| GenerateResponse {
            generation_id,
            images,
        })
    }

    async fn run(
        &self,
        generation_id: &GenerationId,
        image: &str,
        transformation: &Transformation,
    ) -> Result<Vec<String>, ApplicationError> {
        let request = PredictionRequest {
            model: transformation.model.clone(),
            input: transformation.build_input(image),
        };

        let handle = match self.prediction_service.submit(request).await {
            Ok(handle) => handle,
            Err(e) => {
                let message = format!("Failed to start generation: {}", e);
                tracing::error!(
                    generation_id = %generation_id,
                    error = %e,
                    "Prediction submission failed"
                );
                self.progress_store
                    .set(generation_id, ProgressRecord::error(0, message.clone()));
                return Err(ApplicationError::ExternalServiceError(message));
            }
        };

        self.progress_store
            .set(generation_id, ProgressRecord::submitted());

        tracing::debug!(
            generation_id = %generation_id,
            prediction_id = %handle.id,
            "Waiting for prediction"
        );

        self.waiter
            .wait(generation_id, &handle)
            .await
            .map_err(|source| ApplicationError::GenerationFailed {
                generation_id: generation_id.clone(),
                source,
            })
    }

    fn validate<'a>(
        &'a self,
        cmd: &'a GenerateCommand,
    ) -> Result<(&'a str, &'a Transformation), ApplicationError> {
        let image = cmd
            .image
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApplicationError::validation("Missing required field: image"))?;

        let transformation_id = cmd
            .transformation
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ApplicationError::validation("Missing required field: transformation"))?;

        let transformation = self.catalog.get(transformation_id).ok_or_else(|| {
            ApplicationError::validation(format!("Unknown transformation: {}", transformation_id))
        })?;

        if !is_supported_image(image) {
            return Err(ApplicationError::validation(
                "Image must be a data:image URL or an https URL",
            ));
        }

        Ok((image, transformation))
    }
}

/// data:image/...;base64,... 或带主机名的 https URL
fn is_supported_image(image: &str) -> bool {
    if let Some(rest) = image.strip_prefix("data:") {
        return rest.starts_with("image/") && rest.contains(',');
    }
    match Url::parse(image) {
        Ok(url) => url.scheme() == "https" && url.host_str().is_some(),
        Err(_) => false,
    }
}
