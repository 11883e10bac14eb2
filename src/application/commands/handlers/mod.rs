//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod generate_handler;

pub use generate_handler::*;
