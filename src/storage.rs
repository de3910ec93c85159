// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 存储后端
//!
//! 资源服务器只通过 [`AssetStorage`] 访问变体文件，并不关心具体实现：
//! - [`PhysicalStorage`]：以磁盘目录为根，小文件经 LRU 缓存返回，大文件流式读取。
//! - [`MemoryStorage`]：内存中的句柄到字节映射，用于嵌入式部署与测试。

use std::{
    collections::HashMap,
    io,
    path::{Component, Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, warn};
use tokio::io::AsyncRead;

use crate::cache::VariantCache;

/// 存在性查询的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLocation {
    /// 存储中的实际字节数
    pub length: u64,
}

/// 打开后的内容
pub enum AssetBody {
    /// 已完整位于内存中
    Bytes(Bytes),
    /// 需要按块读取
    Stream(Box<dyn AsyncRead + Send + Unpin>),
}

impl std::fmt::Debug for AssetBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetBody::Bytes(b) => write!(f, "AssetBody::Bytes({} bytes)", b.len()),
            AssetBody::Stream(_) => write!(f, "AssetBody::Stream"),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetStorage: Send + Sync {
    /// 查询句柄对应的文件是否存在
    async fn locate(&self, file_name: &str) -> Option<AssetLocation>;

    /// 打开句柄对应的内容
    async fn open(&self, file_name: &str) -> io::Result<AssetBody>;
}

/// 以目录为根的磁盘存储
pub struct PhysicalStorage {
    root: PathBuf,
    cache: Mutex<VariantCache>,
    cache_threshold: u64,
}

impl PhysicalStorage {
    pub fn new(root: impl Into<PathBuf>, cache_size: usize, cache_threshold: u64) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(VariantCache::with_capacity(cache_size)),
            cache_threshold,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 将句柄映射为根目录下的路径。绝对路径和包含 `..` 的句柄一律拒绝。
    fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let relative = Path::new(file_name);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
            Some(self.root.join(relative))
        } else {
            warn!("拒绝越界的存储句柄: {}", file_name);
            None
        }
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, VariantCache> {
        match self.cache.lock() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("缓存锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }
}

fn not_found(file_name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, format!("no such asset: {}", file_name))
}

#[async_trait]
impl AssetStorage for PhysicalStorage {
    async fn locate(&self, file_name: &str) -> Option<AssetLocation> {
        let path = self.resolve(file_name)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(AssetLocation { length: meta.len() }),
            _ => None,
        }
    }

    async fn open(&self, file_name: &str) -> io::Result<AssetBody> {
        let path = self.resolve(file_name).ok_or_else(|| not_found(file_name))?;
        let meta = tokio::fs::metadata(&path).await?;
        let modified = meta.modified()?;

        if !VariantCache::admits(meta.len(), self.cache_threshold) {
            debug!("文件{}较大({} bytes)，使用流式读取", file_name, meta.len());
            let file = tokio::fs::File::open(&path).await?;
            return Ok(AssetBody::Stream(Box::new(file)));
        }

        if let Some(bytes) = self.lock_cache().lookup(file_name, modified) {
            debug!("缓存命中: {}", file_name);
            return Ok(AssetBody::Bytes(bytes));
        }

        debug!("缓存未命中或文件已修改: {}", file_name);
        let bytes = Bytes::from(tokio::fs::read(&path).await?);
        self.lock_cache().insert(file_name, bytes.clone(), modified);
        Ok(AssetBody::Bytes(bytes))
    }
}

/// 内存存储
#[derive(Default)]
pub struct MemoryStorage {
    files: HashMap<String, Bytes>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file_name: &str, content: impl Into<Bytes>) {
        self.files.insert(file_name.to_string(), content.into());
    }

    pub fn with_file(mut self, file_name: &str, content: impl Into<Bytes>) -> Self {
        self.insert(file_name, content);
        self
    }
}

#[async_trait]
impl AssetStorage for MemoryStorage {
    async fn locate(&self, file_name: &str) -> Option<AssetLocation> {
        self.files.get(file_name).map(|bytes| AssetLocation {
            length: bytes.len() as u64,
        })
    }

    async fn open(&self, file_name: &str) -> io::Result<AssetBody> {
        self.files
            .get(file_name)
            .cloned()
            .map(AssetBody::Bytes)
            .ok_or_else(|| not_found(file_name))
    }
}
