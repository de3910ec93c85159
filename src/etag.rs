// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 实体标签（Entity Tag）
//!
//! 按 RFC 7232 §2.3 建模 `ETag`。标签值始终保存为带双引号的形式，比较区分大小写。

use std::fmt;

use crate::param::WILDCARD;

/// 一个实体标签，例如 `"abc123"` 或弱标签 `W/"abc123"`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTag {
    /// 带双引号的 opaque-tag
    tag: String,
    weak: bool,
}

impl EntityTag {
    /// 由内容哈希构造强标签。引号是必须的，下游比较函数只接受带引号的形式。
    pub fn strong(content_hash: &str) -> Self {
        Self {
            tag: format!("\"{}\"", content_hash),
            weak: false,
        }
    }

    /// 解析请求头中的单个标签。不带引号或引号不闭合的值返回 `None`。
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (weak, rest) = match value.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        if rest.len() < 2 || !rest.starts_with('"') || !rest.ends_with('"') {
            return None;
        }
        // 引号内部不允许再出现引号
        if rest[1..rest.len() - 1].contains('"') {
            return None;
        }
        Some(Self {
            tag: rest.to_string(),
            weak,
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_weak(&self) -> bool {
        self.weak
    }

    /// 强比较：双方都不是弱标签且 opaque-tag 完全相同
    pub fn strong_eq(&self, other: &EntityTag) -> bool {
        !self.weak && !other.weak && self.tag == other.tag
    }

    /// 弱比较：忽略弱标记，仅比较 opaque-tag
    pub fn weak_eq(&self, other: &EntityTag) -> bool {
        self.tag == other.tag
    }
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.weak {
            write!(f, "W/{}", self.tag)
        } else {
            write!(f, "{}", self.tag)
        }
    }
}

/// `If-Match` / `If-None-Match` 列表中的一项：通配符或具体标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCondition {
    Any,
    Tag(EntityTag),
}

impl TagCondition {
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value == WILDCARD {
            return Some(TagCondition::Any);
        }
        EntityTag::parse(value).map(TagCondition::Tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_is_quoted() {
        let etag = EntityTag::strong("abc123");
        assert_eq!(etag.tag(), "\"abc123\"");
        assert_eq!(etag.to_string(), "\"abc123\"");
        assert!(!etag.is_weak());
    }

    #[test]
    fn test_parse_weak_and_strong() {
        let weak = EntityTag::parse("W/\"xyz\"").unwrap();
        assert!(weak.is_weak());
        assert_eq!(weak.tag(), "\"xyz\"");

        let strong = EntityTag::parse(" \"xyz\" ").unwrap();
        assert!(!strong.is_weak());
    }

    #[test]
    fn test_parse_rejects_unquoted() {
        assert!(EntityTag::parse("xyz").is_none());
        assert!(EntityTag::parse("\"").is_none());
        assert!(EntityTag::parse("\"a\"b\"").is_none());
    }

    #[test]
    fn test_comparison_is_case_sensitive() {
        let a = EntityTag::strong("ABC");
        let b = EntityTag::strong("abc");
        assert!(!a.strong_eq(&b));
        assert!(!a.weak_eq(&b));
    }

    #[test]
    fn test_weak_never_strong_equal() {
        let strong = EntityTag::strong("abc");
        let weak = EntityTag::parse("W/\"abc\"").unwrap();
        assert!(!weak.strong_eq(&strong));
        assert!(weak.weak_eq(&strong));
    }

    #[test]
    fn test_condition_wildcard() {
        assert_eq!(TagCondition::parse("*"), Some(TagCondition::Any));
        assert!(matches!(TagCondition::parse("\"a\""), Some(TagCondition::Tag(_))));
        assert_eq!(TagCondition::parse("a"), None);
    }
}
