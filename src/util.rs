// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! HTML 注入：把入口点展开成 `<script>` / `<link>` 标签。

use html_escape::{encode_double_quoted_attribute, encode_text};
use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    entrypoint::ResolvedEntrypoint,
    exception::Exception,
    manifest::Entrypoints,
};

lazy_static! {
    static ref NAME_SEPARATOR: Regex = Regex::new(r"\s*,\s*").unwrap();
}

/// 拆分逗号分隔的入口点名称，空白名称被丢弃
pub fn split_entrypoint_names(names: &str) -> Vec<String> {
    NAME_SEPARATOR
        .split(names)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

pub struct HtmlBuilder {
    title: String,
    head: String,
    body: String,
}

impl HtmlBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            head: String::new(),
            body: String::new(),
        }
    }

    /// 生成入口点的标签片段，每个标签一行。所有插值都经过 HTML 转义。
    pub fn entrypoint_tags(url_prefix: &str, entrypoint: &ResolvedEntrypoint) -> String {
        let prefix = match url_prefix.ends_with('/') {
            true => url_prefix.to_string(),
            false => format!("{}/", url_prefix),
        };
        let prefix = encode_double_quoted_attribute(&prefix);

        let mut tags = String::new();
        for script in &entrypoint.scripts {
            tags.push_str(&format!(
                "<script src=\"{}{}\" integrity=\"{}\" crossorigin=\"anonymous\" defer></script>\n",
                prefix,
                encode_double_quoted_attribute(&script.file),
                encode_double_quoted_attribute(&script.integrity_hash),
            ));
        }
        for style in &entrypoint.styles {
            tags.push_str(&format!(
                "<link rel=\"stylesheet\" href=\"{}{}\" integrity=\"{}\" crossorigin=\"anonymous\">\n",
                prefix,
                encode_double_quoted_attribute(&style.file),
                encode_double_quoted_attribute(&style.integrity_hash),
            ));
        }
        tags
    }

    /// 以入口点标签作为 `<head>` 内容的页面
    pub fn from_entrypoint(title: &str, url_prefix: &str, entrypoint: &ResolvedEntrypoint) -> Self {
        let mut builder = Self::new(title);
        builder.head = Self::entrypoint_tags(url_prefix, entrypoint);
        builder
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn build(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n{}</head>\n<body>\n{}\n</body>\n</html>\n",
            encode_text(&self.title),
            self.head,
            self.body
        )
    }
}

/// 模板侧入口：解析逗号分隔的入口点列表并输出标签。
///
/// 未知入口点是硬错误，模板渲染不能静默省略资源。
pub async fn call_entrypoint(entrypoints: &Entrypoints, names: &str) -> Result<String, Exception> {
    let names = split_entrypoint_names(names);
    let resolved = entrypoints.resolve(&names).await?;
    Ok(HtmlBuilder::entrypoint_tags(entrypoints.url_prefix(), &resolved))
}
