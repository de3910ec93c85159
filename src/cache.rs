use std::num::NonZeroUsize;
use std::time::SystemTime;

use bytes::Bytes;
use log::warn;
use lru::LruCache;

const FALLBACK_CAPACITY: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(n) => n,
    None => unreachable!(),
};

#[derive(Clone)]
struct CachedVariant {
    bytes: Bytes,
    mtime: SystemTime,
}

/// 变体文件内容的 LRU 缓存，以存储句柄为键
pub struct VariantCache {
    entries: LruCache<String, CachedVariant>,
}

impl VariantCache {
    // 容量为0时退回默认容量
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or_else(|| {
            warn!("缓存容量为0，使用默认容量{}", FALLBACK_CAPACITY);
            FALLBACK_CAPACITY
        });
        Self {
            entries: LruCache::new(capacity),
        }
    }

    pub fn insert(&mut self, handle: &str, bytes: Bytes, mtime: SystemTime) {
        self.entries
            .put(handle.to_string(), CachedVariant { bytes, mtime });
    }

    /// 不超过阈值的文件才进入缓存，更大的文件走流式读取
    pub fn admits(size: u64, threshold: u64) -> bool {
        size <= threshold
    }

    // 文件在磁盘上被替换（修改时间变化）时视为未命中
    pub fn lookup(&mut self, handle: &str, mtime: SystemTime) -> Option<Bytes> {
        self.entries
            .get(handle)
            .filter(|cached| cached.mtime == mtime)
            .map(|cached| cached.bytes.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
