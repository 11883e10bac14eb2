//! Prediction Adapter - 外部预测服务客户端实现

mod fake_prediction_client;
mod http_prediction_client;

pub use fake_prediction_client::{FakePredictionClient, FakePredictionClientConfig};
pub use http_prediction_client::{HttpPredictionClient, HttpPredictionClientConfig};
