//! EVM Bridge Library
//!
//! 在账本交易中执行 EVM 合约：调用分类、地址推导、交易级账户缓存、
//! 事件收集，以及按交易一次性提交

pub mod address;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod events;
pub mod executor;
pub mod schema;
pub mod state;

pub use config::BridgeConfig;
pub use dispatcher::{EvmBridge, FailureKind, Invocation, InvokeError, TxContext};
pub use executor::{ExecutionEngine, RevmEngine};
