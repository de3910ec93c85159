// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 响应组装
//!
//! 根据协商与前置条件的结论生成状态码和响应头集合。字节传输不在这里进行：
//! 响应只携带一个 [`BodyPlan`]，由服务器层交给存储后端完成。
//!
//! | 状态 | 响应头                                                      | 响应体 |
//! |------|-------------------------------------------------------------|--------|
//! | 200  | 缓存头 + `Content-Length` + `Content-Type` (+ `Content-Encoding`) | 变体文件（HEAD 除外） |
//! | 304  | 仅缓存头                                                    | 无     |
//! | 406  | 无缓存头                                                    | 无     |
//! | 412  | 无缓存头                                                    | 无，写完响应头后结束输出 |

use bytes::Bytes;
use chrono::{prelude::*, Duration};
use log::error;

use crate::{
    etag::EntityTag,
    exception::Exception,
    manifest::FileSpec,
    negotiate::NegotiationOutcome,
    param::*,
    precondition::Decision,
};

/// 响应体的传输计划
#[derive(Debug, Clone, PartialEq)]
pub enum BodyPlan {
    /// 无响应体
    Empty,
    /// 无响应体，写完响应头后立即结束输出流，不允许再写入
    Finalized,
    /// 内存中的响应体
    Inline(Bytes),
    /// 由存储后端提供的变体文件
    File { file_name: String, length: u64 },
}

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    date: DateTime<Utc>,
    server_name: String,
    cache_control: Option<String>,
    etag: Option<EntityTag>,
    expires: Option<DateTime<Utc>>,
    vary: Option<String>,
    content_encoding: Option<String>,
    content_length: Option<u64>,
    content_type: Option<String>,
    body: BodyPlan,
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            cache_control: None,
            etag: None,
            expires: None,
            vary: None,
            content_encoding: None,
            content_length: None,
            content_type: None,
            body: BodyPlan::Empty,
        }
    }

    /// 无响应体的状态响应
    pub fn from_status_code(code: u16) -> Self {
        let mut response = Self::new();
        response.set_code(code);
        response.content_length = Some(0);
        response
    }

    /// 406：没有可接受的变体
    pub fn not_acceptable() -> Self {
        Self::from_status_code(406)
    }

    /// 404：资源不存在
    pub fn not_found() -> Self {
        Self::from_status_code(404)
    }

    /// 412：前置条件不成立，写完响应头后结束输出
    pub fn precondition_failed() -> Self {
        let mut response = Self::from_status_code(412);
        response.body = BodyPlan::Finalized;
        response
    }

    /// 由请求异常生成响应。412 写完响应头即结束，其余只有状态行与 `Content-Length: 0`。
    ///
    /// `NotModified` 需要协商结果来生成缓存头，应使用 [`Response::not_modified`]。
    pub fn from_exception(e: &Exception) -> Self {
        match e {
            Exception::PreconditionFailed => Self::precondition_failed(),
            e => Self::from_status_code(e.status_code()),
        }
    }

    /// 304：只带缓存头
    pub fn not_modified(outcome: &NegotiationOutcome) -> Self {
        let mut response = Self::new();
        response.set_code(304);
        response.set_caching_headers(outcome);
        response
    }

    /// 200：缓存头、长度、类型与编码。HEAD 请求不传输响应体。
    pub fn serve(file: &FileSpec, outcome: &NegotiationOutcome, headonly: bool) -> Self {
        let variant = match &outcome.selected_variant {
            Some(variant) => variant,
            None => {
                error!("尝试为没有选中变体的协商结果生成200响应");
                return Self::not_acceptable();
            }
        };
        let mut response = Self::new();
        response.set_caching_headers(outcome);
        response.content_length = Some(variant.size_bytes);
        response.content_type = Some(file.content_type.clone());
        response.content_encoding = outcome.content_encoding().map(str::to_string);
        response.body = match headonly {
            true => BodyPlan::Empty,
            false => BodyPlan::File {
                file_name: variant.file_name.clone(),
                length: variant.size_bytes,
            },
        };
        response
    }

    /// 200：内存中的 HTML 页面
    pub fn from_html(html: String, headonly: bool) -> Self {
        let mut response = Self::new();
        response.content_length = Some(html.len() as u64);
        response.content_type = Some("text/html;charset=utf-8".to_string());
        response.body = match headonly {
            true => BodyPlan::Empty,
            false => BodyPlan::Inline(Bytes::from(html)),
        };
        response
    }

    /// 将判定结论映射为响应。调用方需在 `Proceed` 时已确认存储中存在该变体。
    pub fn assemble(
        decision: Decision,
        file: &FileSpec,
        outcome: &NegotiationOutcome,
        method: HttpRequestMethod,
    ) -> Self {
        match decision.into_result() {
            Ok(()) => Self::serve(file, outcome, method == HttpRequestMethod::Head),
            Err(Exception::NotModified) => Self::not_modified(outcome),
            Err(e) => Self::from_exception(&e),
        }
    }

    fn set_caching_headers(&mut self, outcome: &NegotiationOutcome) -> &mut Self {
        self.cache_control = Some(CACHE_CONTROL_IMMUTABLE.to_string());
        self.etag = outcome.etag.clone();
        self.expires = Some(self.date + Duration::days(EXPIRES_AFTER_DAYS));
        self.vary = Some(VARY_ACCEPT_ENCODING.to_string());
        self
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&info) => info.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown".to_string()
            }
        };
        self
    }

    /// 按输出顺序排列的响应头
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = vec![];
        if let Some(cache_control) = &self.cache_control {
            headers.push(("Cache-Control", cache_control.clone()));
        }
        if let Some(encoding) = &self.content_encoding {
            headers.push(("Content-Encoding", encoding.clone()));
        }
        if let Some(length) = self.content_length {
            headers.push(("Content-Length", length.to_string()));
        }
        if let Some(content_type) = &self.content_type {
            headers.push(("Content-Type", content_type.clone()));
        }
        headers.push(("Date", format_date(&self.date)));
        if let Some(etag) = &self.etag {
            headers.push(("ETag", etag.to_string()));
        }
        if let Some(expires) = &self.expires {
            headers.push(("Expires", format_date(expires)));
        }
        headers.push(("Server", self.server_name.clone()));
        if let Some(vary) = &self.vary {
            headers.push(("Vary", vary.clone()));
        }
        headers
    }

    /// 按名称查找响应头（大小写不敏感）
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .into_iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// 状态行与响应头，以空行结尾
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}{}",
            self.version, self.status_code, self.information, CRLF
        );
        for (name, value) in self.headers() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(&value);
            head.push_str(CRLF);
        }
        head.push_str(CRLF);
        head.into_bytes()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn body(&self) -> &BodyPlan {
        &self.body
    }

    pub fn date(&self) -> DateTime<Utc> {
        self.date
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }
}

/// RFC 7231 §7.1.1.1 的 IMF-fixdate 格式
fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::VariantSpec;
    use std::collections::BTreeMap;

    fn file() -> FileSpec {
        let mut variants = BTreeMap::new();
        for (token, size) in [("identity", 100u64), ("gzip", 40)] {
            variants.insert(
                token.to_string(),
                VariantSpec {
                    file_name: format!("main.js.{}", token),
                    content_hash: format!("hash-{}", token),
                    size_bytes: size,
                },
            );
        }
        FileSpec {
            content_type: "text/javascript".to_string(),
            integrity_hash: "sha384-main".to_string(),
            variants,
        }
    }

    fn outcome(token: &str) -> NegotiationOutcome {
        let file = file();
        let variant = file.variants[token].clone();
        NegotiationOutcome {
            selected_encoding: Some(token.to_string()),
            etag: Some(EntityTag::strong(&variant.content_hash)),
            selected_variant: Some(variant),
        }
    }

    #[test]
    fn test_format_date() {
        let date = Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap();
        assert_eq!(format_date(&date), "Wed, 21 Oct 2015 07:28:00 GMT");
    }

    #[test]
    fn test_serve_gzip() {
        let response = Response::serve(&file(), &outcome("gzip"), false);
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.header("Cache-Control").as_deref(), Some(CACHE_CONTROL_IMMUTABLE));
        assert_eq!(response.header("ETag").as_deref(), Some("\"hash-gzip\""));
        assert_eq!(response.header("Vary").as_deref(), Some("Accept-Encoding"));
        assert_eq!(response.header("Content-Encoding").as_deref(), Some("gzip"));
        assert_eq!(response.header("Content-Length").as_deref(), Some("40"));
        assert_eq!(response.header("Content-Type").as_deref(), Some("text/javascript"));
        assert!(response.header("Date").is_some());
        assert_eq!(
            response.body(),
            &BodyPlan::File {
                file_name: "main.js.gzip".to_string(),
                length: 40
            }
        );
    }

    #[test]
    fn test_identity_not_advertised() {
        let response = Response::serve(&file(), &outcome("identity"), false);
        assert_eq!(response.header("Content-Encoding"), None);
        assert_eq!(response.header("Content-Length").as_deref(), Some("100"));
    }

    #[test]
    fn test_expires_one_year_after_date() {
        let response = Response::serve(&file(), &outcome("gzip"), false);
        let expires = response.expires().unwrap();
        assert_eq!(expires - response.date(), Duration::days(365));
    }

    #[test]
    fn test_head_has_headers_but_no_body() {
        let response = Response::serve(&file(), &outcome("gzip"), true);
        assert_eq!(response.header("Content-Length").as_deref(), Some("40"));
        assert_eq!(response.body(), &BodyPlan::Empty);
    }

    #[test]
    fn test_not_modified_only_caching_headers() {
        let response = Response::not_modified(&outcome("gzip"));
        assert_eq!(response.status_code(), 304);
        assert!(response.header("Cache-Control").is_some());
        assert!(response.header("Date").is_some());
        assert!(response.header("Expires").is_some());
        assert_eq!(response.header("ETag").as_deref(), Some("\"hash-gzip\""));
        assert_eq!(response.header("Vary").as_deref(), Some("Accept-Encoding"));
        assert_eq!(response.header("Content-Length"), None);
        assert_eq!(response.header("Content-Type"), None);
        assert_eq!(response.header("Content-Encoding"), None);
        assert_eq!(response.body(), &BodyPlan::Empty);
    }

    #[test]
    fn test_not_acceptable_has_no_caching_headers() {
        let response = Response::not_acceptable();
        assert_eq!(response.status_code(), 406);
        assert_eq!(response.information(), "Not Acceptable");
        assert_eq!(response.header("Cache-Control"), None);
        assert_eq!(response.header("ETag"), None);
        assert_eq!(response.header("Vary"), None);
        assert_eq!(response.header("Content-Length").as_deref(), Some("0"));
    }

    #[test]
    fn test_precondition_failed_is_finalized() {
        let response = Response::precondition_failed();
        assert_eq!(response.status_code(), 412);
        assert_eq!(response.body(), &BodyPlan::Finalized);
        assert_eq!(response.header("ETag"), None);
    }

    #[test]
    fn test_assemble() {
        let file = file();
        let outcome = outcome("gzip");
        let get = HttpRequestMethod::Get;
        assert_eq!(
            Response::assemble(Decision::PreconditionFailed, &file, &outcome, get).status_code(),
            412
        );
        assert_eq!(
            Response::assemble(Decision::NotModified, &file, &outcome, get).status_code(),
            304
        );
        let ok = Response::assemble(Decision::Proceed, &file, &outcome, HttpRequestMethod::Head);
        assert_eq!(ok.status_code(), 200);
        assert_eq!(ok.body(), &BodyPlan::Empty);
    }

    #[test]
    fn test_from_exception() {
        let response = Response::from_exception(&Exception::NoAcceptableVariant);
        assert_eq!(response.status_code(), 406);
        assert_eq!(response.body(), &BodyPlan::Empty);

        let response = Response::from_exception(&Exception::AssetNotFound("main.js.br".into()));
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.information(), "Not Found");
        assert_eq!(response.header("ETag"), None);

        let response = Response::from_exception(&Exception::PreconditionFailed);
        assert_eq!(response.status_code(), 412);
        assert_eq!(response.body(), &BodyPlan::Finalized);

        let response = Response::from_exception(&Exception::MalformedRequestLine);
        assert_eq!(response.status_code(), 400);
        assert_eq!(response.header("Content-Length").as_deref(), Some("0"));
    }

    #[test]
    fn test_serve_without_variant_falls_back_to_406() {
        let response = Response::serve(&file(), &NegotiationOutcome::default(), false);
        assert_eq!(response.status_code(), 406);
    }

    #[test]
    fn test_head_bytes() {
        let response = Response::serve(&file(), &outcome("gzip"), false);
        let head = String::from_utf8(response.head_bytes()).unwrap();
        assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(head.contains("Content-Encoding: gzip\r\n"));
        assert!(head.contains("ETag: \"hash-gzip\"\r\n"));
        assert!(head.contains("Server: shaneyale-assetserver\r\n"));
        assert!(head.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_from_html() {
        let response = Response::from_html("<p>hi</p>".to_string(), false);
        assert_eq!(response.header("Content-Length").as_deref(), Some("9"));
        assert_eq!(response.body(), &BodyPlan::Inline(Bytes::from("<p>hi</p>")));
    }
}
