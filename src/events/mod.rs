//! 事件收集与发布
//!
//! 执行期间产生的日志先进入 [`EventCollector`]，交易成功后作为一个事件
//! 通过 [`EventChannel`] 发布

pub mod channel;
pub mod collector;

pub use channel::{ChannelError, EmittedEvent, EventChannel, MemoryEventChannel};
pub use collector::{EventCollector, FlushOutcome, LogSink};

use thiserror::Error;

/// 事件错误类型
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to encode log topics: {0}")]
    Topic(String),

    #[error("Failed to marshal event messages: {0}")]
    Marshal(#[from] serde_json::Error),

    #[error("Event channel error: {0}")]
    Channel(#[from] ChannelError),
}
