// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责将 TCP 流中读取的原始字节解析为强类型的 `Request` 结构体，
//! 即资源服务器所需的规范化请求描述：
//! 1. 请求行（方法、路径、版本）。
//! 2. `Accept-Encoding`（含质量值）。
//! 3. `If-Match` / `If-None-Match` 实体标签列表。
//!
//! `Range`、`If-Range` 与 `If-Modified-Since` 不受支持，解析时直接忽略。

use crate::{
    etag::TagCondition,
    exception::Exception,
    negotiate::EncodingPreference,
    param::*,
};
use log::error;

/// 一个完整的 HTTP 请求元数据。请求体不会被读取。
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpRequestMethod,
    /// 请求的资源路径（包含查询字符串）
    path: String,
    version: HttpVersion,
    user_agent: String,
    /// 按出现顺序排列的编码偏好
    accept_encoding: Vec<EncodingPreference>,
    if_match: Vec<TagCondition>,
    if_none_match: Vec<TagCondition>,
}

impl Request {
    /// 从原始字节缓冲区尝试构建 `Request` 实例。
    ///
    /// # 参数
    /// * `buffer` - 从网络 Socket 读取的原始数据。
    /// * `id` - 全局请求 ID，用于在多线程环境下追踪日志。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let request_string = match std::str::from_utf8(buffer) {
            Ok(string) => string.trim_end_matches('\0'),
            Err(_) => {
                error!("[ID{}]无法解析HTTP请求", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut request_lines = request_string.split(CRLF);
        let first_line = request_lines.next().unwrap_or_default();
        let first_line_parts: Vec<&str> = first_line.split(' ').collect();

        if first_line_parts.len() < 3 {
            error!("[ID{}]HTTP请求行格式不正确：{}", id, first_line);
            return Err(Exception::MalformedRequestLine);
        }

        let method = match HttpRequestMethod::parse(first_line_parts[0]) {
            Some(method) => method,
            None => {
                error!("[ID{}]不支持的HTTP请求方法：{}", id, first_line_parts[0]);
                return Err(Exception::MalformedRequestLine);
            }
        };

        let version_str = first_line_parts[first_line_parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            _ => {
                error!("[ID{}]不支持的HTTP协议版本：{}", id, &version_str);
                return Err(Exception::UnsupportedHttpVersion);
            }
        };

        // 路径中可能包含空格，虽然不规范但通过 join 尝试恢复
        let path = first_line_parts[1..first_line_parts.len() - 1].join(" ");

        let mut user_agent = String::new();
        let mut accept_encoding = vec![];
        let mut if_match = vec![];
        let mut if_none_match = vec![];
        for line in request_lines {
            // 空行标志着请求头结束
            if line.is_empty() {
                break;
            }
            let (name, value) = match line.split_once(':') {
                Some((name, value)) => (name.trim().to_ascii_lowercase(), value.trim()),
                None => continue,
            };
            match name.as_str() {
                "user-agent" => user_agent = value.to_string(),
                "accept-encoding" => accept_encoding.extend(parse_accept_encoding(value)),
                "if-match" => if_match.extend(parse_tag_list(value)),
                "if-none-match" => if_none_match.extend(parse_tag_list(value)),
                _ => {}
            }
        }

        Ok(Self {
            method,
            path,
            version,
            user_agent,
            accept_encoding,
            if_match,
            if_none_match,
        })
    }
}

/// 解析 `Accept-Encoding` 的值，例如 `gzip;q=0.8, br, identity;q=0`。
///
/// 质量值不合法的项被跳过。
pub fn parse_accept_encoding(value: &str) -> Vec<EncodingPreference> {
    value
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let token = parts.next()?.trim();
            if token.is_empty() {
                return None;
            }
            let mut quality = EncodingPreference::MAX_QUALITY;
            for param in parts {
                if let Some((key, q)) = param.split_once('=') {
                    if key.trim().eq_ignore_ascii_case("q") {
                        quality = parse_qvalue(q.trim())?;
                    }
                }
            }
            Some(EncodingPreference::new(token, quality))
        })
        .collect()
}

/// 按 RFC 7231 §5.3.1 解析质量值，返回千分之一单位
pub fn parse_qvalue(value: &str) -> Option<u16> {
    let (int_part, frac_part) = match value.split_once('.') {
        Some((i, f)) => (i, f),
        None => (value, ""),
    };
    if frac_part.len() > 3 || !frac_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let millis = match int_part {
        "0" => {
            let padded = format!("{:0<3}", frac_part);
            padded.parse::<u16>().ok()?
        }
        "1" => {
            if frac_part.chars().any(|c| c != '0') {
                return None;
            }
            1000
        }
        _ => return None,
    };
    Some(millis)
}

/// 解析 `If-Match` / `If-None-Match` 的值。逗号只在引号外起分隔作用，
/// 无法识别的项被跳过。
pub fn parse_tag_list(value: &str) -> Vec<TagCondition> {
    let mut items = vec![];
    let mut start = 0;
    let mut quoted = false;
    for (i, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ',' if !quoted => {
                items.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&value[start..]);

    items
        .into_iter()
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .filter_map(TagCondition::parse)
        .collect()
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    /// 获取请求路径（含查询参数）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取去掉查询字符串后的路径，用于路由
    pub fn route_path(&self) -> &str {
        match self.path.split_once('?') {
            Some((path, _)) => path,
            None => &self.path,
        }
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn accept_encoding(&self) -> &[EncodingPreference] {
        &self.accept_encoding
    }

    pub fn if_match(&self) -> &[TagCondition] {
        &self.if_match
    }

    pub fn if_none_match(&self) -> &[TagCondition] {
        &self.if_none_match
    }
}
