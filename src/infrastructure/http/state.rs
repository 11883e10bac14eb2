//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::application::{
    // Command handlers
    GenerateHandler,
    // Query handlers
    ListTransformationsHandler, ProgressStreamConfig, StreamProgressHandler,
    // Services
    DeferredCleanup, PredictionWaiter, WaiterConfig,
    // Ports
    PredictionServicePort, ProgressStorePort,
};
use crate::domain::transformation::TransformationCatalog;

/// 生成流程的时间参数
#[derive(Debug, Clone, Default)]
pub struct RelaySettings {
    pub waiter: WaiterConfig,
    pub progress: ProgressStreamConfig,
    pub cleanup_delay: Duration,
}

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub progress_store: Arc<dyn ProgressStorePort>,
    pub cleanup: Arc<DeferredCleanup>,

    // ========== Command Handlers ==========
    pub generate_handler: GenerateHandler,

    // ========== Query Handlers ==========
    pub stream_progress_handler: StreamProgressHandler,
    pub list_transformations_handler: ListTransformationsHandler,
}

impl AppState {
    /// 创建应用状态
    ///
    /// `shutdown` 取消时，等待中的生成、打开的进度流和待执行的清理一并结束
    pub fn new(
        catalog: Arc<TransformationCatalog>,
        prediction_service: Arc<dyn PredictionServicePort>,
        progress_store: Arc<dyn ProgressStorePort>,
        settings: RelaySettings,
        shutdown: CancellationToken,
    ) -> Self {
        let cleanup = Arc::new(DeferredCleanup::new(
            progress_store.clone(),
            shutdown.clone(),
        ));

        let waiter = PredictionWaiter::new(
            prediction_service.clone(),
            progress_store.clone(),
            settings.waiter,
            shutdown.clone(),
        );

        Self {
            // Ports
            progress_store: progress_store.clone(),
            cleanup: cleanup.clone(),

            // Command handlers
            generate_handler: GenerateHandler::new(
                catalog.clone(),
                prediction_service,
                progress_store.clone(),
                waiter,
                cleanup,
                settings.cleanup_delay,
            ),

            // Query handlers
            stream_progress_handler: StreamProgressHandler::new(
                progress_store,
                settings.progress,
                shutdown,
            ),
            list_transformations_handler: ListTransformationsHandler::new(catalog),
        }
    }
}
