//! 状态读缓存
//!
//! 使用 LRU Cache 减少对 redb 已提交状态的读取次数

use lru::LruCache;
use parking_lot::RwLock;
use std::num::NonZeroUsize;

/// 已提交状态的读缓存
///
/// 同时缓存"键不存在"的结果（值为 None）
pub struct StateCache {
    cache: RwLock<LruCache<String, Option<Vec<u8>>>>,
}

impl StateCache {
    /// 创建缓存（默认容量 10000）
    pub fn new() -> Self {
        Self::with_capacity(10000)
    }

    /// 创建指定容量的缓存
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// 获取缓存值；外层 None 表示未命中
    pub fn get(&self, key: &str) -> Option<Option<Vec<u8>>> {
        self.cache.write().get(key).cloned()
    }

    /// 设置缓存值
    pub fn put(&self, key: &str, value: Option<Vec<u8>>) {
        self.cache.write().put(key.to_string(), value);
    }

    /// 移除缓存
    pub fn remove(&self, key: &str) {
        self.cache.write().pop(key);
    }

    /// 清空缓存
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    /// 获取缓存大小
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// 检查缓存是否为空
    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }
}

impl Default for StateCache {
    fn default() -> Self {
        Self::new()
    }
}
