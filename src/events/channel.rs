//! 事件通道
//!
//! 账本对外发布事件的接口

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("event name can not be empty")]
    EmptyName,

    #[error("event channel rejected event {name}: {reason}")]
    Rejected { name: String, reason: String },
}

/// 事件通道：每次调用发布一个命名事件
pub trait EventChannel {
    fn emit(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ChannelError>;
}

impl<T: EventChannel + ?Sized> EventChannel for &mut T {
    fn emit(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        (**self).emit(name, payload)
    }
}

/// 已发布的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

/// 内存事件通道，按发布顺序保存事件
#[derive(Debug, Clone, Default)]
pub struct MemoryEventChannel {
    events: Vec<EmittedEvent>,
}

impl MemoryEventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[EmittedEvent] {
        &self.events
    }

    pub fn take(&mut self) -> Vec<EmittedEvent> {
        std::mem::take(&mut self.events)
    }
}

impl EventChannel for MemoryEventChannel {
    fn emit(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ChannelError> {
        if name.is_empty() {
            return Err(ChannelError::EmptyName);
        }
        self.events.push(EmittedEvent {
            name: name.to_string(),
            payload,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_channel() {
        let mut channel = MemoryEventChannel::new();
        channel.emit("a9059cbb", b"[]".to_vec()).unwrap();
        assert!(matches!(channel.emit("", Vec::new()), Err(ChannelError::EmptyName)));

        assert_eq!(channel.events().len(), 1);
        let events = channel.take();
        assert_eq!(events[0].name, "a9059cbb");
        assert!(channel.events().is_empty());
    }
}
