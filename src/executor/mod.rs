//! EVM 执行器
//!
//! 执行引擎接口，以及基于 REVM 的实现

pub mod revm_adapter;

pub use revm_adapter::RevmEngine;

use alloy_primitives::{Address, Bytes, U256};
use thiserror::Error;

use crate::events::{EventError, LogSink};
use crate::state::{CacheError, VmState};

/// 执行器错误类型
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("execution reverted: 0x{}", hex::encode(.0))]
    Reverted(Bytes),

    #[error("execution halted: {reason} (gas used {gas_used})")]
    Halted { reason: String, gas_used: u64 },

    #[error("state error: {0}")]
    State(#[from] CacheError),

    #[error("log sink error: {0}")]
    Sink(#[from] EventError),

    #[error("EVM error: {0}")]
    Evm(String),
}

/// 一次消息调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallMessage {
    pub caller: Address,
    pub callee: Address,
    /// 在 callee 地址上执行的代码（部署时为构造代码）
    pub code: Bytes,
    pub input: Bytes,
    pub value: U256,
    pub gas_limit: u64,
}

/// 执行引擎
///
/// 引擎通过 `state` 读写账户、通过 `sink` 上报日志；
/// 返回 None 表示执行没有通过 RETURN 结束（如 STOP）；零长度的 RETURN 返回 Some
pub trait ExecutionEngine {
    fn call(
        &self,
        state: &mut dyn VmState,
        sink: &mut dyn LogSink,
        msg: CallMessage,
    ) -> Result<Option<Bytes>, EngineError>;
}

impl<E: ExecutionEngine + ?Sized> ExecutionEngine for Box<E> {
    fn call(
        &self,
        state: &mut dyn VmState,
        sink: &mut dyn LogSink,
        msg: CallMessage,
    ) -> Result<Option<Bytes>, EngineError> {
        (**self).call(state, sink, msg)
    }
}
