//! Pixmorph - 图像风格转换中继服务
//!
//! - Domain: generation/, transformation/
//! - Application: commands, queries, services, ports
//! - Infrastructure: http, memory, adapters

use std::sync::Arc;

use pixmorph::application::{
    PredictionServicePort, ProgressStreamConfig, WaiterConfig,
};
use pixmorph::config::{
    load_config, load_transformations, print_config, AppConfig, PredictionProvider,
};
use pixmorph::infrastructure::adapters::{
    FakePredictionClient, FakePredictionClientConfig, HttpPredictionClient,
    HttpPredictionClientConfig,
};
use pixmorph::infrastructure::http::{AppState, HttpServer, RelaySettings, ServerConfig};
use pixmorph::infrastructure::memory::InMemoryProgressStore;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Pixmorph - 图像风格转换中继服务");
    print_config(&config);

    let catalog = Arc::new(load_transformations(&config)?);
    tracing::info!(count = catalog.len(), "Transformations loaded");

    let prediction_service = create_prediction_service(&config)?;
    let progress_store = InMemoryProgressStore::new().arc();

    let settings = RelaySettings {
        waiter: WaiterConfig {
            poll_interval: config.generation.poll_interval(),
            max_attempts: config.generation.max_attempts,
        },
        progress: ProgressStreamConfig {
            interval: config.progress.interval(),
            max_lifetime: config.progress.max_lifetime(),
        },
        cleanup_delay: config.generation.cleanup_delay(),
    };

    // 关闭时取消等待中的生成、进度流和延迟清理
    let shutdown = CancellationToken::new();

    let state = AppState::new(
        catalog,
        prediction_service,
        progress_store,
        settings,
        shutdown.clone(),
    );
    let cleanup = state.cleanup.clone();

    let server_config = ServerConfig::new(&config.server.host, config.server.port)
        .with_max_body_bytes(config.server.max_body_bytes);
    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    let signal_token = shutdown.clone();
    server
        .run_with_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
            }
            tracing::info!("Received shutdown signal");
            signal_token.cancel();
        })
        .await?;

    shutdown.cancel();
    cleanup.shutdown();

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// 初始化日志（RUST_LOG 优先于 log.level）
fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},pixmorph={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn create_prediction_service(
    config: &AppConfig,
) -> anyhow::Result<Arc<dyn PredictionServicePort>> {
    match config.prediction.provider {
        PredictionProvider::Replicate => {
            let token = config.prediction.api_token.clone().unwrap_or_default();
            let client_config = HttpPredictionClientConfig::new(&config.prediction.base_url, token)
                .with_timeout(config.prediction.timeout_secs);
            Ok(Arc::new(HttpPredictionClient::new(client_config)?))
        }
        PredictionProvider::Fake => {
            tracing::warn!("Using fake prediction service, no external calls will be made");
            Ok(Arc::new(FakePredictionClient::new(
                FakePredictionClientConfig::default(),
            )))
        }
    }
}
