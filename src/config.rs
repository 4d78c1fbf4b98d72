//! 桥接配置
//!
//! 进程启动时构建一次，注入调度器

use revm::primitives::SpecId;

/// 每次调用的默认 gas 上限
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000_000;

/// 调度器配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// 每次执行的 gas 预算，耗尽即为执行错误
    pub gas_limit: u64,
    /// EVM 规范版本
    pub spec_id: SpecId,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            gas_limit: DEFAULT_GAS_LIMIT,
            spec_id: SpecId::SHANGHAI,
        }
    }
}

impl BridgeConfig {
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }
}
