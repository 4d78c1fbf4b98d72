//! Store Trait 定义
//!
//! 定义账本世界状态的键值接口，账户缓存通过它读取与同步状态

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// 存储错误类型
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Write rejected for key {0}")]
    Rejected(String),
}

/// 账本世界状态接口
///
/// 键为小写十六进制账户地址（存储槽在其后拼接槽位），值为不透明字节
pub trait StateStore {
    /// 读取状态，不存在时返回 None
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// 写入状态
    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// 删除状态
    fn del_state(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<T: StateStore + ?Sized> StateStore for &mut T {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get_state(key)
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).put_state(key, value)
    }

    fn del_state(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).del_state(key)
    }
}

/// 事务缓冲区（用于支持回滚）
#[derive(Debug, Clone, Default)]
pub struct TransactionBuffer {
    pub writes: BTreeMap<String, Vec<u8>>,
    pub deletes: BTreeSet<String>,
}

impl TransactionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, key: &str, value: &[u8]) {
        self.deletes.remove(key);
        self.writes.insert(key.to_string(), value.to_vec());
    }

    pub fn delete(&mut self, key: &str) {
        self.writes.remove(key);
        self.deletes.insert(key.to_string());
    }

    /// 查询缓冲区：Some(None) 表示已删除，None 表示缓冲区未涉及该键
    pub fn lookup(&self, key: &str) -> Option<Option<&[u8]>> {
        if let Some(value) = self.writes.get(key) {
            return Some(Some(value.as_slice()));
        }
        if self.deletes.contains(key) {
            return Some(None);
        }
        None
    }

    pub fn clear(&mut self) {
        self.writes.clear();
        self.deletes.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty() && self.deletes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_put_then_delete() {
        let mut buffer = TransactionBuffer::new();
        assert_eq!(buffer.lookup("aa"), None);

        buffer.put("aa", b"1");
        assert_eq!(buffer.lookup("aa"), Some(Some(&b"1"[..])));

        buffer.delete("aa");
        assert_eq!(buffer.lookup("aa"), Some(None));
        assert!(buffer.writes.is_empty());

        buffer.put("aa", b"2");
        assert!(buffer.deletes.is_empty());

        buffer.clear();
        assert!(buffer.is_empty());
    }
}
