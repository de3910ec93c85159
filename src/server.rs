// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源服务中间件
//!
//! [`AssetServer`] 位于请求管线中：它要么完整处理一个请求，要么把请求交还给下一个处理器。
//!
//! 处理流程：
//! 1. 过滤：只处理 `GET`/`HEAD`，且路径位于配置的前缀之下。
//! 2. 查找：在清单中查找子路径对应的文件；找不到时按 `claim_whole_prefix` 决定 404 或放行。
//! 3. 协商：选择变体（406）。
//! 4. 条件：求值 `If-Match` / `If-None-Match`（412 / 304）。
//! 5. 组装：确认存储中存在该变体（否则 404），生成响应。
//!
//! 字节传输由 [`AssetServer::transfer`] 完成，支持协作式取消。

use std::sync::Arc;

use log::{debug, error, warn};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    exception::Exception,
    manifest::Entrypoints,
    negotiate::choose_variant,
    precondition::{Decision, Preconditions},
    request::Request,
    response::{BodyPlan, Response},
    storage::{AssetBody, AssetStorage, PhysicalStorage},
};

pub struct AssetServerOptions {
    /// 存储后端。为空时使用以 `{www_root}{prefix}` 为根的磁盘存储。
    pub storage: Option<Arc<dyn AssetStorage>>,
    pub prefix: String,
    pub claim_whole_prefix: bool,
    pub chunk_size: usize,
}

impl AssetServerOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            storage: None,
            prefix: config.url_prefix().to_string(),
            claim_whole_prefix: config.claim_whole_prefix(),
            chunk_size: config.chunk_size(),
        }
    }
}

impl Default for AssetServerOptions {
    fn default() -> Self {
        Self::from_config(&Config::new())
    }
}

/// 中间件对一个请求的处理结果
#[derive(Debug)]
pub enum Outcome {
    /// 交给下一个处理器
    Declined,
    Handled(Response),
}

pub struct AssetServer {
    entrypoints: Arc<Entrypoints>,
    storage: Arc<dyn AssetStorage>,
    prefix: String,
    claim_whole_prefix: bool,
    chunk_size: usize,
}

impl AssetServer {
    pub fn new(options: AssetServerOptions, entrypoints: Arc<Entrypoints>, config: &Config) -> Self {
        let storage: Arc<dyn AssetStorage> = match options.storage {
            Some(storage) => storage,
            None => Arc::new(PhysicalStorage::new(
                config.asset_root(),
                config.cache_size(),
                config.cache_threshold(),
            )),
        };
        Self {
            entrypoints,
            storage,
            prefix: options.prefix.trim_end_matches('/').to_string(),
            claim_whole_prefix: options.claim_whole_prefix,
            chunk_size: options.chunk_size.max(1),
        }
    }

    pub fn with_storage(
        options: AssetServerOptions,
        entrypoints: Arc<Entrypoints>,
        storage: Arc<dyn AssetStorage>,
    ) -> Self {
        let options = AssetServerOptions {
            storage: Some(storage),
            ..options
        };
        Self::new(options, entrypoints, &Config::new())
    }

    /// 按路径段匹配前缀（大小写不敏感），返回去掉前缀后的子路径。
    ///
    /// `/assets` 匹配 `/assets` 与 `/assets/x`，但不匹配 `/assetsx`。
    fn match_prefix<'a>(&self, path: &'a str) -> Option<&'a str> {
        let head = path.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        let rest = &path[self.prefix.len()..];
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    pub async fn handle(&self, request: &Request, id: u128) -> Outcome {
        let method = request.method();
        if !method.is_get_or_head() {
            debug!("[ID{}]跳过资源服务：不处理{}方法", id, method);
            return Outcome::Declined;
        }

        let path = request.route_path();
        let sub_path = match self.match_prefix(path) {
            Some(sub_path) => sub_path,
            None => {
                debug!("[ID{}]跳过资源服务：路径{}不匹配前缀{}", id, path, self.prefix);
                return Outcome::Declined;
            }
        };

        match self.respond(request, sub_path, id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                match &e {
                    Exception::AssetNotFound(file_name) => warn!(
                        "[ID{}]清单中的变体{}在存储中不存在，部署可能不一致，返回404",
                        id, file_name
                    ),
                    Exception::ManifestLoadFailure(_) => error!("[ID{}]资源清单不可用: {}", id, e),
                    _ => debug!("[ID{}]{}", id, e),
                }
                Outcome::Handled(Response::from_exception(&e))
            }
        }
    }

    async fn respond(
        &self,
        request: &Request,
        sub_path: &str,
        id: u128,
    ) -> Result<Outcome, Exception> {
        let method = request.method();
        let manifest = self.entrypoints.manifest().await?;

        let slashless = sub_path.trim_start_matches('/');
        let file = match manifest.file(slashless) {
            Some(file) => file,
            None if self.claim_whole_prefix => {
                debug!("[ID{}]请求的资源{}不存在，返回404", id, slashless);
                return Ok(Outcome::Handled(Response::not_found()));
            }
            None => {
                debug!("[ID{}]跳过未知资源{}：前缀未被完整占用", id, slashless);
                return Ok(Outcome::Declined);
            }
        };
        debug!("[ID{}]处理资源{}{}", id, self.prefix, sub_path);

        let outcome = choose_variant(file, request.accept_encoding());
        let (variant, etag) = match (&outcome.selected_variant, &outcome.etag) {
            (Some(variant), Some(etag)) => (variant, etag),
            _ => return Err(Exception::NoAcceptableVariant),
        };
        debug!(
            "[ID{}]选择变体{:?}: {} ({} bytes)",
            id, outcome.selected_encoding, variant.file_name, variant.size_bytes
        );

        let preconditions = Preconditions::evaluate(request.if_match(), request.if_none_match(), etag);
        let decision = preconditions.decide(method);
        debug!("[ID{}]前置条件 {:?} => {:?}", id, preconditions, decision);

        if decision == Decision::Proceed {
            let location = self
                .storage
                .locate(&variant.file_name)
                .await
                .ok_or_else(|| Exception::AssetNotFound(variant.file_name.clone()))?;
            // Content-Length 以清单为准
            if location.length != variant.size_bytes {
                warn!(
                    "[ID{}]变体{}的大小与清单不符：存储中{}字节，清单中{}字节",
                    id, variant.file_name, location.length, variant.size_bytes
                );
            }
        }

        Ok(Outcome::Handled(Response::assemble(decision, file, &outcome, method)))
    }

    /// 写出响应头，并按计划传输响应体。
    ///
    /// `cancel` 被触发时立即停止，不再向 `writer` 写入任何内容，返回 `Err`，
    /// 调用方应直接丢弃连接。成功时返回写出的响应体字节数。
    pub async fn transfer<W>(
        &self,
        response: &Response,
        writer: &mut W,
        cancel: &CancellationToken,
        id: u128,
    ) -> Result<u64, Exception>
    where
        W: AsyncWrite + Unpin + Send,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("[ID{}]请求已取消，中止传输", id);
                Err(Exception::Io("transfer cancelled".to_string()))
            }
            result = self.write_response(response, writer, id) => result,
        }
    }

    async fn write_response<W>(&self, response: &Response, writer: &mut W, id: u128) -> Result<u64, Exception>
    where
        W: AsyncWrite + Unpin + Send,
    {
        writer.write_all(&response.head_bytes()).await?;

        let sent = match response.body() {
            BodyPlan::Empty => 0,
            BodyPlan::Finalized => {
                writer.flush().await?;
                writer.shutdown().await?;
                return Ok(0);
            }
            BodyPlan::Inline(bytes) => {
                writer.write_all(bytes).await?;
                bytes.len() as u64
            }
            BodyPlan::File { file_name, length } => {
                let body = match self.storage.open(file_name).await {
                    Ok(body) => body,
                    Err(e) => {
                        error!("[ID{}]无法打开变体文件{}: {}", id, file_name, e);
                        return Err(e.into());
                    }
                };
                let sent = self.copy_body(body, writer).await?;
                if sent != *length {
                    warn!(
                        "[ID{}]变体{}的实际大小{}与清单记录{}不一致",
                        id, file_name, sent, length
                    );
                }
                sent
            }
        };
        writer.flush().await?;
        debug!("[ID{}]传输完成，共发送 {} 字节", id, sent);
        Ok(sent)
    }

    async fn copy_body<W>(&self, body: AssetBody, writer: &mut W) -> Result<u64, Exception>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match body {
            AssetBody::Bytes(bytes) => {
                let mut sent = 0u64;
                for chunk in bytes.chunks(self.chunk_size) {
                    writer.write_all(chunk).await?;
                    sent += chunk.len() as u64;
                }
                Ok(sent)
            }
            AssetBody::Stream(mut reader) => {
                let mut buffer = vec![0u8; self.chunk_size];
                let mut sent = 0u64;
                loop {
                    let n = reader.read(&mut buffer).await?;
                    if n == 0 {
                        break;
                    }
                    writer.write_all(&buffer[..n]).await?;
                    sent += n as u64;
                }
                Ok(sent)
            }
        }
    }

    pub fn entrypoints(&self) -> &Arc<Entrypoints> {
        &self.entrypoints
    }
}
