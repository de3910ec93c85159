// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容编码协商
//!
//! 按 RFC 7231 §5.3.4 判断某个变体的编码是否可被客户端接受，
//! 然后在所有可接受的变体中选择字节数最小的一个。

use log::debug;

use crate::{
    etag::EntityTag,
    manifest::{FileSpec, VariantSpec},
    param::{IDENTITY, WILDCARD},
};

/// `Accept-Encoding` 中的一项。
///
/// 质量值以千分之一为单位保存（`q=0.5` 即 500），避免浮点比较。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingPreference {
    pub token: String,
    pub quality: u16,
}

impl EncodingPreference {
    pub const MAX_QUALITY: u16 = 1000;

    pub fn new(token: &str, quality: u16) -> Self {
        Self {
            token: token.to_ascii_lowercase(),
            quality: quality.min(Self::MAX_QUALITY),
        }
    }

    /// 质量值为 0 表示显式排除
    pub fn is_excluded(&self) -> bool {
        self.quality == 0
    }
}

/// 一次协商的结果。没有可接受变体时三个字段都为 `None`，调用方应返回 406。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NegotiationOutcome {
    pub selected_encoding: Option<String>,
    pub selected_variant: Option<VariantSpec>,
    pub etag: Option<EntityTag>,
}

impl NegotiationOutcome {
    pub fn is_acceptable(&self) -> bool {
        self.selected_variant.is_some()
    }

    /// `identity` 永远不会作为 `Content-Encoding` 发出
    pub fn content_encoding(&self) -> Option<&str> {
        self.selected_encoding
            .as_deref()
            .filter(|encoding| *encoding != IDENTITY)
    }
}

/// 判断编码 `token` 在给定的 `Accept-Encoding` 下是否可接受
pub fn is_acceptable(token: &str, accept_encoding: &[EncodingPreference]) -> bool {
    // 请求没有 Accept-Encoding 时任何编码都可接受
    if accept_encoding.is_empty() {
        debug!("变体{}可接受：请求未给出Accept-Encoding", token);
        return true;
    }

    if token == IDENTITY {
        let identity = accept_encoding.iter().find(|p| p.token == IDENTITY);
        if identity.map_or(false, EncodingPreference::is_excluded) {
            debug!("identity被显式排除 (identity;q=0)");
            return false;
        }

        // 只有在没有更具体的 identity 项时，*;q=0 才排除 identity
        let wildcard = accept_encoding.iter().find(|p| p.token == WILDCARD);
        if identity.is_none() && wildcard.map_or(false, EncodingPreference::is_excluded) {
            debug!("identity被排除：*;q=0 且没有单独的identity项");
            return false;
        }

        debug!("identity默认可接受");
        return true;
    }

    // 取第一个与编码名或通配符匹配的项
    match accept_encoding
        .iter()
        .find(|p| p.token == token || p.token == WILDCARD)
    {
        Some(preference) if preference.is_excluded() => {
            debug!("变体{}被显式排除", token);
            false
        }
        Some(_) => {
            debug!("变体{}被显式接受", token);
            true
        }
        None => {
            debug!("变体{}不可接受：未在Accept-Encoding中列出", token);
            false
        }
    }
}

/// 为 `file` 选择最合适的变体。
///
/// 在可接受的变体中取 `size_bytes` 最小者；大小相同时的胜者不作保证。
pub fn choose_variant(file: &FileSpec, accept_encoding: &[EncodingPreference]) -> NegotiationOutcome {
    let selected = file
        .variants
        .iter()
        .filter(|(token, _)| is_acceptable(token, accept_encoding))
        .min_by_key(|(_, variant)| variant.size_bytes);

    match selected {
        Some((token, variant)) => NegotiationOutcome {
            selected_encoding: Some(token.clone()),
            etag: Some(EntityTag::strong(&variant.content_hash)),
            selected_variant: Some(variant.clone()),
        },
        None => NegotiationOutcome::default(),
    }
}
