//! 账户缓存 / 同步适配器
//!
//! 读操作先查内存变更，再读账本存储；写操作只进入内存，
//! 直到 `sync` 时才一次性写回存储

use alloy_primitives::{Address, Bytes, U256};
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::keys::{account_key, storage_key};
use crate::db::StateStore;
use crate::schema::{Account, PermFlag};
use crate::state::{CacheError, VmState};

/// 缓存中的账户条目；`account` 为 None 表示不存在或已删除
#[derive(Debug, Clone)]
struct AccountEntry {
    account: Option<Account>,
    dirty: bool,
}

/// 缓存中的存储槽
#[derive(Debug, Clone, Copy)]
struct StorageEntry {
    value: U256,
    dirty: bool,
}

/// 同步结果统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// 写入或删除的账户数
    pub accounts: usize,
    /// 写入或删除的存储槽数
    pub slots: usize,
}

/// 交易级账户缓存
///
/// 每笔交易一个实例，`sync` 会消耗缓存本身，因此至多同步一次
pub struct AccountCache<S: StateStore> {
    store: S,
    accounts: BTreeMap<Address, AccountEntry>,
    storage: BTreeMap<(Address, U256), StorageEntry>,
}

impl<S: StateStore> AccountCache<S> {
    /// 基于账本存储创建缓存
    pub fn new(store: S) -> Self {
        Self {
            store,
            accounts: BTreeMap::new(),
            storage: BTreeMap::new(),
        }
    }

    /// 待同步的条目数量
    pub fn pending_writes(&self) -> usize {
        self.accounts.values().filter(|e| e.dirty).count()
            + self.storage.values().filter(|e| e.dirty).count()
    }

    /// 将全部变更写回账本存储
    ///
    /// 任一写入失败立即中止；已经写入的条目是否生效由存储自身的事务决定
    pub fn sync(mut self) -> Result<SyncReport, CacheError> {
        let mut report = SyncReport::default();

        for (address, entry) in &self.accounts {
            if !entry.dirty {
                continue;
            }
            let key = account_key(address);
            match &entry.account {
                Some(account) => {
                    let data = account.encode().map_err(|e| CacheError::Encode {
                        address: *address,
                        reason: e.to_string(),
                    })?;
                    self.store.put_state(&key, &data)?;
                }
                None => self.store.del_state(&key)?,
            }
            report.accounts += 1;
        }

        for ((address, slot), entry) in &self.storage {
            if !entry.dirty {
                continue;
            }
            let key = storage_key(address, *slot);
            if entry.value.is_zero() {
                self.store.del_state(&key)?;
            } else {
                self.store.put_state(&key, &entry.value.to_be_bytes::<32>())?;
            }
            report.slots += 1;
        }

        debug!(accounts = report.accounts, slots = report.slots, "account cache synced");
        Ok(report)
    }

    /// 读入账户条目（未命中时从存储加载）
    fn load(&mut self, address: &Address) -> Result<&mut AccountEntry, CacheError> {
        if !self.accounts.contains_key(address) {
            let account = match self.store.get_state(&account_key(address))? {
                Some(bytes) if !bytes.is_empty() => {
                    Some(Account::decode(&bytes).map_err(|e| CacheError::Decode {
                        address: *address,
                        reason: e.to_string(),
                    })?)
                }
                _ => None,
            };
            self.accounts.insert(*address, AccountEntry { account, dirty: false });
        }
        self.accounts
            .get_mut(address)
            .ok_or(CacheError::AccountNotFound(*address))
    }

    /// 修改已存在的账户
    fn update<F>(&mut self, address: &Address, f: F) -> Result<(), CacheError>
    where
        F: FnOnce(&mut Account),
    {
        let entry = self.load(address)?;
        let account = entry
            .account
            .as_mut()
            .ok_or(CacheError::AccountNotFound(*address))?;
        f(account);
        entry.dirty = true;
        Ok(())
    }
}

impl<S: StateStore> VmState for AccountCache<S> {
    fn get_account(&mut self, address: &Address) -> Result<Option<Account>, CacheError> {
        Ok(self.load(address)?.account.clone())
    }

    fn create_account(&mut self, address: &Address) -> Result<(), CacheError> {
        let entry = self.load(address)?;
        if entry.account.is_some() {
            return Err(CacheError::DuplicateAddress(*address));
        }
        entry.account = Some(Account::new());
        entry.dirty = true;
        Ok(())
    }

    fn remove_account(&mut self, address: &Address) -> Result<(), CacheError> {
        let entry = self.load(address)?;
        entry.account = None;
        entry.dirty = true;
        self.storage.retain(|(owner, _), _| owner != address);
        Ok(())
    }

    fn init_code(&mut self, address: &Address, code: Bytes) -> Result<(), CacheError> {
        self.update(address, |acc| acc.code = code)
    }

    fn set_permission(&mut self, address: &Address, flags: PermFlag, value: bool) -> Result<(), CacheError> {
        self.update(address, |acc| acc.permissions.set(flags, value))
    }

    fn set_balance(&mut self, address: &Address, balance: U256) -> Result<(), CacheError> {
        self.update(address, |acc| acc.balance = balance)
    }

    fn set_nonce(&mut self, address: &Address, nonce: u64) -> Result<(), CacheError> {
        self.update(address, |acc| acc.nonce = nonce)
    }

    fn get_storage(&mut self, address: &Address, key: U256) -> Result<U256, CacheError> {
        if let Some(entry) = self.storage.get(&(*address, key)) {
            return Ok(entry.value);
        }

        let value = match self.store.get_state(&storage_key(address, key))? {
            Some(bytes) if !bytes.is_empty() => U256::try_from_be_slice(&bytes)
                .filter(|_| bytes.len() <= 32)
                .ok_or_else(|| CacheError::Decode {
                    address: *address,
                    reason: format!("storage slot {key} holds {} bytes", bytes.len()),
                })?,
            _ => U256::ZERO,
        };
        self.storage.insert((*address, key), StorageEntry { value, dirty: false });
        Ok(value)
    }

    fn set_storage(&mut self, address: &Address, key: U256, value: U256) -> Result<(), CacheError> {
        self.storage.insert((*address, key), StorageEntry { value, dirty: true });
        Ok(())
    }
}
