// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源清单模块
//!
//! 打包工具生成的 JSON 清单描述了三类信息：
//! 1. 入口点（entrypoints）：名字到脚本/样式表列表的映射，顺序即加载顺序。
//! 2. 文件（files）：逻辑路径到内容类型、SRI 哈希以及各编码变体的映射。
//! 3. 变体（variants）：编码名称到物理文件名、内容哈希与字节大小的映射。
//!
//! 清单在进程内只加载一次，之后只读地在所有并发请求之间共享。
//! [`Entrypoints`] 负责这次加载：第一个调用者触发加载，其余调用者（包括加载
//! 完成之前到达的）等待同一个加载过程并观察到同一个结果，成功或失败都会被缓存。

use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, error, info};
use serde_derive::Deserialize;
use tokio::sync::OnceCell;

use crate::{
    entrypoint::{resolve, ResolvedEntrypoint},
    exception::{Exception, ManifestError},
};

/// 解析后的清单。构造完成后不再修改。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    pub entrypoints: BTreeMap<String, EntrypointSpec>,
    pub files: BTreeMap<String, FileSpec>,
}

/// 一个入口点。列表可能包含重复项，去重在解析入口点时进行。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntrypointSpec {
    pub scripts: Vec<String>,
    #[serde(rename = "stylesheets")]
    pub styles: Vec<String>,
}

/// 一个逻辑文件及其所有编码变体
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileSpec {
    #[serde(rename = "contentType")]
    pub content_type: String,
    /// 针对 identity 内容计算的 SRI 摘要
    #[serde(rename = "sriHash")]
    pub integrity_hash: String,
    /// 编码名称 -> 变体。大小相同时的选择顺序不作保证。
    pub variants: BTreeMap<String, VariantSpec>,
}

/// 某个编码下的具体文件
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VariantSpec {
    /// 交给存储后端的不透明句柄
    #[serde(rename = "file")]
    pub file_name: String,
    /// 用于构造强 ETag
    #[serde(rename = "hash")]
    pub content_hash: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
}

impl Manifest {
    /// 严格解析清单 JSON。缺少任何必需字段都会导致整体失败，不做逐字段默认值。
    pub fn from_json(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Manifest =
            serde_json::from_slice(bytes).map_err(|e| ManifestError::Parse(e.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// 校验结构不变量：每个文件至少有一个变体。
    ///
    /// 入口点引用缺失文件的情况留到解析入口点时报告为 `MissingFileData`。
    fn validate(&self) -> Result<(), ManifestError> {
        for (path, file) in &self.files {
            if file.variants.is_empty() {
                return Err(ManifestError::EmptyVariants(path.clone()));
            }
        }
        Ok(())
    }

    pub fn entrypoint(&self, name: &str) -> Option<&EntrypointSpec> {
        self.entrypoints.get(name)
    }

    pub fn file(&self, path: &str) -> Option<&FileSpec> {
        self.files.get(path)
    }
}

/// 自定义的清单读取方式，例如从远端配置中心拉取
#[async_trait]
pub trait ManifestReader: fmt::Debug + Send + Sync {
    async fn read(&self) -> Result<Bytes, ManifestError>;
}

/// 清单字节流的来源
#[derive(Debug, Clone)]
pub enum ManifestSource {
    /// 磁盘上的 JSON 文件
    File(PathBuf),
    /// 已经在内存中的字节（例如通过 `include_bytes!` 编译进二进制）
    Embedded(Bytes),
    Reader(Arc<dyn ManifestReader>),
}

impl ManifestSource {
    async fn read(&self) -> Result<Bytes, ManifestError> {
        match self {
            ManifestSource::File(path) => tokio::fs::read(path)
                .await
                .map(Bytes::from)
                .map_err(|e| ManifestError::Io(format!("{}: {}", path.display(), e))),
            ManifestSource::Embedded(bytes) => Ok(bytes.clone()),
            ManifestSource::Reader(reader) => reader.read().await,
        }
    }
}

/// 清单的共享句柄，带单次（single-flight）懒加载。
pub struct Entrypoints {
    url_prefix: String,
    source: ManifestSource,
    manifest: OnceCell<Result<Arc<Manifest>, ManifestError>>,
    loads: AtomicUsize,
}

impl Entrypoints {
    pub fn new(source: ManifestSource, url_prefix: &str) -> Self {
        Self {
            url_prefix: url_prefix.to_string(),
            source,
            manifest: OnceCell::new(),
            loads: AtomicUsize::new(0),
        }
    }

    /// 生成 HTML 标签时使用的 URL 前缀
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// 获取清单，必要时触发加载。
    ///
    /// 所有并发调用者等待同一个加载过程；加载例程至多执行一次，
    /// 失败结果同样被缓存，不会重试。
    pub async fn manifest(&self) -> Result<Arc<Manifest>, ManifestError> {
        self.manifest
            .get_or_init(|| async {
                self.loads.fetch_add(1, Ordering::SeqCst);
                debug!("开始加载资源清单: {:?}", self.source);
                let result = self
                    .source
                    .read()
                    .await
                    .and_then(|bytes| Manifest::from_json(&bytes))
                    .map(Arc::new);
                match &result {
                    Ok(manifest) => info!(
                        "资源清单已载入：{}个入口点，{}个文件",
                        manifest.entrypoints.len(),
                        manifest.files.len()
                    ),
                    Err(e) => error!("资源清单加载失败: {}", e),
                }
                result
            })
            .await
            .clone()
    }

    /// 加载例程实际执行的次数
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// 将入口点名称列表解析为去重后的脚本与样式表
    pub async fn resolve<I, S>(&self, names: I) -> Result<ResolvedEntrypoint, Exception>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let manifest = self.manifest().await?;
        resolve(&manifest, names)
    }
}
