//! Redb 账本存储实现
//!
//! 使用嵌入式 redb 数据库持久化世界状态与已发布事件

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::db::{StateCache, StateStore, StoreError, TransactionBuffer};

// ==================== 表定义 ====================

/// 世界状态表: key (小写十六进制) -> value
const STATE_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("world_state");

/// 事件表: tx_id -> 事件名 + 负载
const EVENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("events");

fn backend<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// 已发布事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEvent {
    pub name: String,
    pub payload: Vec<u8>,
}

// ==================== RedbLedger ====================

/// 基于 Redb 的账本存储
///
/// 支持显式事务：事务期间的写入只进入缓冲区，提交时在一个 redb 写事务中落盘
pub struct RedbLedger {
    /// Redb 数据库实例
    db: Arc<Database>,

    /// 事务缓冲区（内存中暂存未提交的变更）
    tx_buffer: RwLock<Option<TransactionBuffer>>,

    /// 已提交状态的读缓存
    cache: StateCache,
}

impl RedbLedger {
    /// 创建或打开 Redb 数据库
    pub fn open(path: &str) -> Result<Self, StoreError> {
        // 确保父目录存在
        if let Some(parent) = std::path::Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path).map_err(backend)?;

        // 初始化所有表
        let write_txn = db.begin_write().map_err(backend)?;
        {
            let _ = write_txn.open_table(STATE_TABLE).map_err(backend)?;
            let _ = write_txn.open_table(EVENTS_TABLE).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;

        Ok(Self {
            db: Arc::new(db),
            tx_buffer: RwLock::new(None),
            cache: StateCache::new(),
        })
    }

    /// 开始事务
    pub fn begin_transaction(&self) -> Result<(), StoreError> {
        let mut buffer = self.tx_buffer.write();
        if buffer.is_some() {
            return Err(StoreError::Transaction("Transaction already started".to_string()));
        }
        *buffer = Some(TransactionBuffer::new());
        Ok(())
    }

    /// 提交事务
    pub fn commit_transaction(&self) -> Result<(), StoreError> {
        let buffer = self
            .tx_buffer
            .write()
            .take()
            .ok_or_else(|| StoreError::Transaction("No active transaction".to_string()))?;

        if buffer.is_empty() {
            return Ok(());
        }

        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(STATE_TABLE).map_err(backend)?;
            for (key, value) in &buffer.writes {
                table.insert(key.as_str(), value.as_slice()).map_err(backend)?;
            }
            for key in &buffer.deletes {
                table.remove(key.as_str()).map_err(backend)?;
            }
        }
        write_txn.commit().map_err(backend)?;

        for (key, value) in buffer.writes {
            self.cache.put(&key, Some(value));
        }
        for key in buffer.deletes {
            self.cache.put(&key, None);
        }
        debug!("ledger transaction committed");
        Ok(())
    }

    /// 回滚事务
    pub fn rollback_transaction(&self) -> Result<(), StoreError> {
        *self.tx_buffer.write() = None;
        Ok(())
    }

    /// 是否处于事务中
    pub fn in_transaction(&self) -> bool {
        self.tx_buffer.read().is_some()
    }

    /// 记录交易发布的事件
    pub fn save_event(&self, tx_id: &str, event: &StoredEvent) -> Result<(), StoreError> {
        let data = bincode::serialize(event)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(EVENTS_TABLE).map_err(backend)?;
            table.insert(tx_id, data.as_slice()).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)
    }

    /// 读取交易发布的事件
    pub fn get_event(&self, tx_id: &str) -> Result<Option<StoredEvent>, StoreError> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(EVENTS_TABLE).map_err(backend)?;
        let value = table.get(tx_id).map_err(backend)?;

        match value {
            Some(data) => bincode::deserialize(data.value())
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    fn read_committed(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }

        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(STATE_TABLE).map_err(backend)?;
        let value = table
            .get(key)
            .map_err(backend)?
            .map(|data| data.value().to_vec());

        self.cache.put(key, value.clone());
        Ok(value)
    }

    fn write_direct(&self, key: &str, value: Option<&[u8]>) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(STATE_TABLE).map_err(backend)?;
            match value {
                Some(value) => {
                    table.insert(key, value).map_err(backend)?;
                }
                None => {
                    table.remove(key).map_err(backend)?;
                }
            }
        }
        write_txn.commit().map_err(backend)?;
        self.cache.put(key, value.map(<[u8]>::to_vec));
        Ok(())
    }
}

// ==================== StateStore 实现 ====================

impl StateStore for RedbLedger {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        // 1. 先检查事务缓冲区
        if let Some(ref buffer) = *self.tx_buffer.read() {
            if let Some(value) = buffer.lookup(key) {
                return Ok(value.map(<[u8]>::to_vec));
            }
        }

        // 2. 读取已提交状态
        self.read_committed(key)
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        if let Some(ref mut buffer) = *self.tx_buffer.write() {
            // 事务模式：写入缓冲区
            buffer.put(key, value);
            return Ok(());
        }
        // 直接模式：立即持久化
        self.write_direct(key, Some(value))
    }

    fn del_state(&mut self, key: &str) -> Result<(), StoreError> {
        if let Some(ref mut buffer) = *self.tx_buffer.write() {
            buffer.delete(key);
            return Ok(());
        }
        self.write_direct(key, None)
    }
}
