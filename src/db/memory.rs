//! 内存状态存储
//!
//! 有序内存映射，用于测试与嵌入式场景

use std::collections::BTreeMap;

use crate::db::{StateStore, StoreError};

/// 内存世界状态
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Vec<u8>>,
    /// 写入次数（put + delete）
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 累计写入次数
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl StateStore for MemoryStore {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put_state(&mut self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.writes += 1;
        self.entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn del_state(&mut self, key: &str) -> Result<(), StoreError> {
        self.writes += 1;
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get_state("aa").unwrap(), None);

        store.put_state("aa", b"value").unwrap();
        assert_eq!(store.get_state("aa").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.len(), 1);

        store.del_state("aa").unwrap();
        assert_eq!(store.get_state("aa").unwrap(), None);
        assert!(store.is_empty());
        assert_eq!(store.writes(), 2);
    }
}
