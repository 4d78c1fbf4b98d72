//! 交易级账户缓存
//!
//! 执行引擎通过 [`VmState`] 读写账户；[`AccountCache`] 在内存中累积变更，
//! 仅在显式 `sync` 时写回账本存储

pub mod account_cache;

pub use account_cache::AccountCache;

use alloy_primitives::{Address, Bytes, U256};
use thiserror::Error;

use crate::db::StoreError;
use crate::schema::{Account, PermFlag, Permissions};

/// 账户缓存错误类型
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to decode account {address}: {reason}")]
    Decode { address: Address, reason: String },

    #[error("Failed to encode account {address}: {reason}")]
    Encode { address: Address, reason: String },

    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Tried to create an account that already exists: {0}")]
    DuplicateAddress(Address),

    #[error("Block hash lookup is not supported (block {0})")]
    BlockHashUnsupported(u64),
}

/// 执行引擎使用的状态接口
///
/// 读操作同样需要 `&mut self`：未命中的账户会被读入缓存
pub trait VmState {
    /// 读取账户，不存在时返回 None
    fn get_account(&mut self, address: &Address) -> Result<Option<Account>, CacheError>;

    fn account_exists(&mut self, address: &Address) -> Result<bool, CacheError> {
        Ok(self.get_account(address)?.is_some())
    }

    /// 创建空账户；地址已存在时报错
    fn create_account(&mut self, address: &Address) -> Result<(), CacheError>;

    /// 删除账户
    fn remove_account(&mut self, address: &Address) -> Result<(), CacheError>;

    /// 读取代码；账户不存在时返回空代码
    fn get_code(&mut self, address: &Address) -> Result<Bytes, CacheError> {
        Ok(self.get_account(address)?.map(|acc| acc.code).unwrap_or_default())
    }

    /// 为已存在的账户设置代码
    fn init_code(&mut self, address: &Address, code: Bytes) -> Result<(), CacheError>;

    fn get_permissions(&mut self, address: &Address) -> Result<Permissions, CacheError> {
        Ok(self.get_account(address)?.map(|acc| acc.permissions).unwrap_or_default())
    }

    /// 设置（或清除）权限位
    fn set_permission(&mut self, address: &Address, flags: PermFlag, value: bool) -> Result<(), CacheError>;

    fn get_balance(&mut self, address: &Address) -> Result<U256, CacheError> {
        Ok(self.get_account(address)?.map(|acc| acc.balance).unwrap_or_default())
    }

    fn set_balance(&mut self, address: &Address, balance: U256) -> Result<(), CacheError>;

    fn get_nonce(&mut self, address: &Address) -> Result<u64, CacheError> {
        Ok(self.get_account(address)?.map(|acc| acc.nonce).unwrap_or_default())
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) -> Result<(), CacheError>;

    /// 读取存储槽，未写入过的槽位为零
    fn get_storage(&mut self, address: &Address, key: U256) -> Result<U256, CacheError>;

    fn set_storage(&mut self, address: &Address, key: U256, value: U256) -> Result<(), CacheError>;
}
