//! Memory Layer - In-Memory State Management
//!
//! 实现 ProgressStore，进程内保存生成任务的最新进度

mod progress_store;

pub use progress_store::InMemoryProgressStore;
