//! 事件日志数据结构
//!
//! 执行过程中产生的 EVM 日志，规范化为小写十六进制文本后对外发布

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 调用方附加到每条事件上的上下文
pub type EventContext = BTreeMap<String, String>;

/// 规范化后的事件日志
///
/// 所有十六进制字段均为小写、不带 `0x` 前缀
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 产生日志的合约地址
    pub address: String,

    /// Topics（索引字段）
    pub topics: Vec<String>,

    /// Data（非索引字段）
    pub data: String,

    /// 调用上下文
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: EventContext,
}

/// 将一次交易内收集的事件序列编码为事件负载
pub fn encode_payload(events: &[Event]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(events)
}

/// 解析事件负载
pub fn decode_payload(payload: &[u8]) -> Result<Vec<Event>, serde_json::Error> {
    serde_json::from_slice(payload)
}
