// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! 该模块定义了资源服务器遵循的 HTTP 协议相关常量和数据结构，包括：
//! - 服务器会发出的 HTTP 状态码及其原因短语（Reason Phrase）。
//! - 缓存相关的固定响应头取值。
//! - HTTP 方法与版本的强类型枚举。

use std::collections::HashMap;
use lazy_static::lazy_static;

/// 服务器名称标识，用于 HTTP 响应头的 `Server` 字段
pub const SERVER_NAME: &str = "shaneyale-assetserver";

/// HTTP 协议规定的换行符（Carriage Return Line Feed）
pub const CRLF: &str = "\r\n";

/// 未经任何内容编码的变体名称。该名称永远不会出现在 `Content-Encoding` 中。
pub const IDENTITY: &str = "identity";

/// `Accept-Encoding` / `If-Match` / `If-None-Match` 中的通配符
pub const WILDCARD: &str = "*";

/// 资源由内容哈希寻址，因此可以被永久缓存
pub const CACHE_CONTROL_IMMUTABLE: &str = "public, max-age=31536000, immutable";

/// `Expires` 相对当前时间的偏移天数，与 `immutable` 一起照顾老旧缓存
pub const EXPIRES_AFTER_DAYS: i64 = 365;

/// 协商结果依赖的请求头
pub const VARY_ACCEPT_ENCODING: &str = "Accept-Encoding";

/// 默认的资源 URL 前缀
pub const DEFAULT_URL_PREFIX: &str = "/assets";

/// 默认的清单文件名
pub const DEFAULT_MANIFEST: &str = "webpack-entrypoints.json";

lazy_static! {
    /// HTTP 状态码与其对应的标准原因短语映射表。
    ///
    /// 只收录本服务器实际会发出的状态码。
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(304, "Not Modified");
        map.insert(400, "Bad Request");
        map.insert(404, "Not Found");
        map.insert(406, "Not Acceptable");
        map.insert(412, "Precondition Failed");
        map.insert(500, "Internal Server Error");
        map
    };
}

/// 支持的 HTTP 协议版本
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpVersion {
    /// HTTP/1.1 版本
    V1_1,
}

/// 标准 HTTP 请求方法
///
/// 资源服务器本身只处理 `GET` 与 `HEAD`，其余方法仍需被识别，
/// 因为 `If-None-Match` 命中时它们的结果是 412 而不是 304。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Options,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpRequestMethod {
    /// 从请求行中的方法名解析（大小写不敏感）
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "OPTIONS" => Some(Self::Options),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            _ => None,
        }
    }

    /// 只读方法：`GET` 或 `HEAD`
    pub fn is_get_or_head(&self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

use std::fmt;

impl fmt::Display for HttpVersion {
    /// 将枚举格式化为 HTTP 报文中的版本字符串
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_1 => write!(f, "HTTP/1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    /// 将枚举格式化为 HTTP 标准大写方法名
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Head => "HEAD",
            HttpRequestMethod::Options => "OPTIONS",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Patch => "PATCH",
        };
        write!(f, "{}", name)
    }
}
