//! 账户数据结构
//!
//! 定义账本中以太坊账户的持久化字段

use alloy_primitives::{keccak256, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

use crate::schema::permission::Permissions;

/// 合约/用户账户
///
/// 与以太坊账户不同，代码直接存放在账户内（不按哈希单独存储），
/// 并额外携带一组权限位
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Account {
    /// 交易计数器（由执行引擎维护）
    pub nonce: u64,

    /// 账户余额（以 wei 为单位）
    pub balance: U256,

    /// 合约字节码（普通账户为空）
    pub code: Bytes,

    /// 权限位
    pub permissions: Permissions,
}

impl Account {
    /// 创建空账户
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建指定余额的账户
    pub fn with_balance(balance: U256) -> Self {
        Self {
            balance,
            ..Default::default()
        }
    }

    /// 检查是否为合约账户
    pub fn is_contract(&self) -> bool {
        !self.code.is_empty()
    }

    /// 代码哈希（keccak256）
    pub fn code_hash(&self) -> B256 {
        keccak256(&self.code)
    }

    /// 编码为账本中保存的字节
    pub fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// 从账本字节解码
    pub fn decode(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

/// 空代码哈希（keccak256("")）
pub const EMPTY_CODE_HASH: B256 = B256::new([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c,
    0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b,
    0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);
