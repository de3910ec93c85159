use num_cpus;
use serde_derive::Deserialize;
use serde_derive::Serialize;

use core::str;
use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;
use std::path::PathBuf;

use crate::param::{DEFAULT_MANIFEST, DEFAULT_URL_PREFIX};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_www_root")]
    www_root: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    worker_threads: usize,
    #[serde(default = "default_cache_size")]
    cache_size: usize,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default = "default_manifest")]
    manifest: String,
    #[serde(default = "default_url_prefix")]
    url_prefix: String,
    #[serde(default = "default_claim_whole_prefix")]
    claim_whole_prefix: bool,
    #[serde(default = "default_cache_threshold")]
    cache_threshold: u64,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default)]
    index_entrypoints: String,
}

fn default_www_root() -> String {
    "static".to_string()
}

fn default_port() -> u16 {
    7878
}

fn default_cache_size() -> usize {
    64
}

fn default_local() -> bool {
    true
}

fn default_manifest() -> String {
    DEFAULT_MANIFEST.to_string()
}

fn default_url_prefix() -> String {
    DEFAULT_URL_PREFIX.to_string()
}

fn default_claim_whole_prefix() -> bool {
    true
}

fn default_cache_threshold() -> u64 {
    1048576 // 1MB
}

fn default_chunk_size() -> usize {
    16384 // 16KB
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            www_root: default_www_root(),
            port: default_port(),
            worker_threads: 0,
            cache_size: default_cache_size(),
            local: default_local(),
            manifest: default_manifest(),
            url_prefix: default_url_prefix(),
            claim_whole_prefix: default_claim_whole_prefix(),
            cache_threshold: default_cache_threshold(),
            chunk_size: default_chunk_size(),
            index_entrypoints: String::new(),
        }
        .normalized()
    }

    pub fn from_toml(filename: &str) -> Self {
        let mut str_val = String::new();
        let read = File::open(filename).and_then(|mut file| file.read_to_string(&mut str_val));
        if let Err(e) = read {
            error!("无法读取配置文件{}：{}，使用默认配置", filename, e);
            return Config::new();
        }
        Self::from_toml_str(&str_val)
    }

    pub fn from_toml_str(str_val: &str) -> Self {
        match toml::from_str::<Config>(str_val) {
            Ok(config) => config.normalized(),
            Err(e) => {
                error!("无法成功从配置文件构建配置对象，使用默认配置：{}", e);
                Config::new()
            }
        }
    }

    fn normalized(mut self) -> Self {
        if self.worker_threads == 0 {
            self.worker_threads = num_cpus::get();
        }
        if self.cache_size == 0 {
            warn!("cache_size被设置为0，但目前尚不支持禁用缓存，因此该值将被改为5。");
            self.cache_size = 5;
        }
        if self.chunk_size == 0 {
            warn!("chunk_size不能为0，使用默认值");
            self.chunk_size = default_chunk_size();
        }
        if !self.url_prefix.starts_with('/') {
            self.url_prefix.insert(0, '/');
        }
        while self.url_prefix.len() > 1 && self.url_prefix.ends_with('/') {
            self.url_prefix.pop();
        }
        self
    }
}

impl Config {
    pub fn www_root(&self) -> &str {
        &self.www_root
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn manifest(&self) -> &str {
        &self.manifest
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn claim_whole_prefix(&self) -> bool {
        self.claim_whole_prefix
    }

    pub fn cache_threshold(&self) -> u64 {
        self.cache_threshold
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn index_entrypoints(&self) -> &str {
        &self.index_entrypoints
    }

    /// 默认存储根目录：`{www_root}{url_prefix}`
    pub fn asset_root(&self) -> PathBuf {
        PathBuf::from(&self.www_root).join(self.url_prefix.trim_start_matches('/'))
    }
}
