//! 事件收集器
//!
//! 缓存一笔交易内产生的全部日志，交易成功后序列化为单个事件发布

use alloy_primitives::Log;
use tracing::{info, warn};

use crate::events::{EventChannel, EventError};
use crate::schema::event::{encode_payload, Event, EventContext};

/// EVM 单条日志最多携带的 topic 数（LOG0..LOG4）
pub const MAX_TOPICS: usize = 4;

/// 日志接收器，执行引擎通过它上报日志
pub trait LogSink {
    fn log(&mut self, log: &Log) -> Result<(), EventError>;
}

/// flush 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// 没有日志，未发布任何事件
    Empty,
    /// 已发布一个包含 `records` 条日志的事件
    Emitted { name: String, records: usize },
}

/// 交易级事件收集器
#[derive(Debug, Default)]
pub struct EventCollector {
    records: Vec<Event>,
    context: EventContext,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 附带调用上下文（对每条日志原样附加）
    pub fn with_context(context: EventContext) -> Self {
        Self {
            records: Vec::new(),
            context,
        }
    }

    pub fn records(&self) -> &[Event] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 规范化并追加一条日志
    pub fn record(&mut self, log: &Log) -> Result<(), EventError> {
        let topics = log.data.topics();
        if topics.len() > MAX_TOPICS {
            return Err(EventError::Topic(format!(
                "log from {} carries {} topics, at most {MAX_TOPICS} allowed",
                log.address,
                topics.len()
            )));
        }

        let event = Event {
            address: hex::encode(log.address),
            topics: topics.iter().map(hex::encode).collect(),
            data: hex::encode(&log.data.data),
            context: self.context.clone(),
        };
        info!("Logging event {}", event.address);

        self.records.push(event);
        Ok(())
    }

    /// 将全部日志作为一个事件发布
    ///
    /// 没有日志时直接成功返回 [`FlushOutcome::Empty`]，不会调用通道
    pub fn flush<C>(self, name: &str, channel: &mut C) -> Result<FlushOutcome, EventError>
    where
        C: EventChannel + ?Sized,
    {
        if self.records.is_empty() {
            info!("No events to flush");
            return Ok(FlushOutcome::Empty);
        }

        let payload = encode_payload(&self.records).map_err(|e| {
            warn!("Failed to marshal events: {}", e);
            EventError::Marshal(e)
        })?;

        info!("Flushing events for {}", name);
        channel.emit(name, payload)?;

        Ok(FlushOutcome::Emitted {
            name: name.to_string(),
            records: self.records.len(),
        })
    }
}

impl LogSink for EventCollector {
    fn log(&mut self, log: &Log) -> Result<(), EventError> {
        self.record(log)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ChannelError, MemoryEventChannel};
    use crate::schema::event::decode_payload;
    use alloy_primitives::{address, Bytes, LogData, B256};

    fn sample_log(topics: Vec<B256>) -> Log {
        Log {
            address: address!("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            data: LogData::new_unchecked(topics, Bytes::from(vec![0xAB, 0xCD])),
        }
    }

    struct RejectingChannel;

    impl EventChannel for RejectingChannel {
        fn emit(&mut self, name: &str, _payload: Vec<u8>) -> Result<(), ChannelError> {
            Err(ChannelError::Rejected {
                name: name.to_string(),
                reason: "closed".to_string(),
            })
        }
    }

    #[test]
    fn test_empty_flush_is_noop() {
        let mut channel = MemoryEventChannel::new();
        let outcome = EventCollector::new().flush("deadbeef", &mut channel).unwrap();

        assert_eq!(outcome, FlushOutcome::Empty);
        assert!(channel.events().is_empty());

        // 空 flush 不会触达通道，即使通道会拒绝
        let outcome = EventCollector::new().flush("deadbeef", &mut RejectingChannel).unwrap();
        assert_eq!(outcome, FlushOutcome::Empty);
    }

    #[test]
    fn test_records_are_lowercase_and_roundtrip() {
        let topic = B256::repeat_byte(0xEF);
        let mut collector = EventCollector::new();
        collector.record(&sample_log(vec![topic])).unwrap();
        collector.log(&sample_log(vec![])).unwrap();

        let record = &collector.records()[0];
        assert_eq!(record.address, "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
        assert_eq!(record.topics, vec!["ef".repeat(32)]);
        assert_eq!(record.data, "abcd");

        let expected = collector.records().to_vec();
        let mut channel = MemoryEventChannel::new();
        let outcome = collector.flush("a9059cbb", &mut channel).unwrap();
        assert_eq!(
            outcome,
            FlushOutcome::Emitted { name: "a9059cbb".to_string(), records: 2 }
        );

        let emitted = &channel.events()[0];
        assert_eq!(emitted.name, "a9059cbb");
        let decoded = decode_payload(&emitted.payload).unwrap();
        assert_eq!(decoded, expected);
        assert_eq!(decoded[0].topics[0], hex::encode(topic));
    }

    #[test]
    fn test_context_attached_to_every_record() {
        let mut context = EventContext::new();
        context.insert("order".to_string(), "42".to_string());

        let mut collector = EventCollector::with_context(context.clone());
        collector.record(&sample_log(vec![])).unwrap();
        collector.record(&sample_log(vec![B256::ZERO])).unwrap();

        assert!(collector.records().iter().all(|r| r.context == context));
    }

    #[test]
    fn test_too_many_topics() {
        let mut collector = EventCollector::new();
        let err = collector.record(&sample_log(vec![B256::ZERO; 5])).unwrap_err();

        assert!(matches!(err, EventError::Topic(_)));
        assert!(collector.is_empty());
    }

    #[test]
    fn test_channel_failure_surfaces() {
        let mut collector = EventCollector::new();
        collector.record(&sample_log(vec![])).unwrap();

        let err = collector.flush("a9059cbb", &mut RejectingChannel).unwrap_err();
        assert!(matches!(err, EventError::Channel(ChannelError::Rejected { .. })));
    }
}
