// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了资源服务器在清单加载与请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：区分清单级错误（进程级不可恢复）与请求级错误（映射为确定的 HTTP 状态码）。
//! - **语义映射**：面向客户端的变体通过 [`Exception::status_code`] 转化为对应的响应状态码。

use thiserror::Error;

/// 清单加载或校验失败。
///
/// 该错误会被单次加载器缓存，并分发给所有等待者，因此需要实现 `Clone`。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifestError {
    /// 清单字节流无法读取（文件不存在、权限不足等）
    #[error("failed to read manifest: {0}")]
    Io(String),
    /// 清单不是合法的 JSON，或缺少必需字段
    #[error("failed to parse manifest: {0}")]
    Parse(String),
    /// 文件没有列出任何变体
    #[error("file '{0}' lists no variants")]
    EmptyVariants(String),
}

/// 服务器处理请求过程中发生的异常类型。
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Exception {
    /// 请求了清单中不存在的入口点。模板渲染必须因此失败，不能静默省略资源。
    #[error("no entrypoint available named '{0}'")]
    UnknownEntrypoint(String),
    /// 清单内部不一致：入口点引用的文件没有文件数据
    #[error("no file data for '{0}'")]
    MissingFileData(String),
    /// 清单无法加载，资源服务能力整体不可用
    #[error("manifest could not be loaded: {0}")]
    ManifestLoadFailure(#[from] ManifestError),
    /// 没有任何变体满足 `Accept-Encoding`，对应 `406 Not Acceptable`
    #[error("no acceptable variant (406)")]
    NoAcceptableVariant,
    /// `If-Match` / `If-None-Match` 前置条件不成立，对应 `412 Precondition Failed`
    #[error("precondition failed (412)")]
    PreconditionFailed,
    /// 客户端缓存仍然有效，对应 `304 Not Modified`（并非真正的错误）
    #[error("not modified (304)")]
    NotModified,
    /// 清单列出的变体在存储后端中找不到，说明部署出现漂移。对应 `404 Not Found`
    #[error("asset '{0}' listed in manifest but missing from storage (404)")]
    AssetNotFound(String),
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串
    #[error("request bytes can't be parsed in UTF-8")]
    RequestIsNotUtf8,
    /// 请求行格式错误或使用了无法识别的方法
    #[error("malformed request line")]
    MalformedRequestLine,
    /// 客户端使用了服务器不支持的 HTTP 协议版本
    #[error("unsupported HTTP version")]
    UnsupportedHttpVersion,
    /// 传输过程中的 I/O 错误或传输被取消
    #[error("I/O error: {0}")]
    Io(String),
}

impl Exception {
    /// 将异常映射为确定的 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Exception::NoAcceptableVariant => 406,
            Exception::PreconditionFailed => 412,
            Exception::NotModified => 304,
            Exception::AssetNotFound(_) => 404,
            Exception::RequestIsNotUtf8
            | Exception::MalformedRequestLine
            | Exception::UnsupportedHttpVersion => 400,
            Exception::UnknownEntrypoint(_)
            | Exception::MissingFileData(_)
            | Exception::ManifestLoadFailure(_)
            | Exception::Io(_) => 500,
        }
    }
}

impl From<std::io::Error> for Exception {
    fn from(e: std::io::Error) -> Self {
        Exception::Io(e.to_string())
    }
}
