// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 前置条件判定
//!
//! 实现 RFC 7232 §6 的判定顺序。每个条件先被求值为三态之一，
//! 再由纯函数 [`Preconditions::decide`] 按固定顺序给出唯一结论。
//!
//! `If-Modified-Since` / `Last-Modified` 不在支持范围内：对应的状态
//! 永远是 `Unchecked`，判定表中与之相关的两个分支保留但不可达。

use crate::{
    etag::{EntityTag, TagCondition},
    exception::Exception,
    param::HttpRequestMethod,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionState {
    /// 请求未携带该条件
    Unchecked,
    Failed,
    Fulfilled,
}

/// 判定结论
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// 继续返回内容
    Proceed,
    /// 304
    NotModified,
    /// 412
    PreconditionFailed,
}

impl Decision {
    /// 把结论映射到请求异常分类，`Proceed` 为 `Ok`
    pub fn into_result(self) -> Result<(), Exception> {
        match self {
            Decision::Proceed => Ok(()),
            Decision::NotModified => Err(Exception::NotModified),
            Decision::PreconditionFailed => Err(Exception::PreconditionFailed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preconditions {
    pub if_match: PreconditionState,
    pub if_none_match: PreconditionState,
    /// 保留位，始终为 `Unchecked`
    pub if_modified_since: PreconditionState,
}

impl Default for Preconditions {
    fn default() -> Self {
        Self {
            if_match: PreconditionState::Unchecked,
            if_none_match: PreconditionState::Unchecked,
            if_modified_since: PreconditionState::Unchecked,
        }
    }
}

/// `If-Match`（RFC 7232 §3.1）：任一项为 `*` 或与 `etag` 强匹配即满足
pub fn evaluate_if_match(conditions: &[TagCondition], etag: &EntityTag) -> PreconditionState {
    if conditions.is_empty() {
        return PreconditionState::Unchecked;
    }
    let matched = conditions.iter().any(|condition| match condition {
        TagCondition::Any => true,
        TagCondition::Tag(tag) => tag.strong_eq(etag),
    });
    if matched {
        PreconditionState::Fulfilled
    } else {
        PreconditionState::Failed
    }
}

/// `If-None-Match`（RFC 7232 §3.2）：任一项为 `*` 或与 `etag` 弱匹配即不满足
pub fn evaluate_if_none_match(conditions: &[TagCondition], etag: &EntityTag) -> PreconditionState {
    if conditions.is_empty() {
        return PreconditionState::Unchecked;
    }
    let matched = conditions.iter().any(|condition| match condition {
        TagCondition::Any => true,
        TagCondition::Tag(tag) => tag.weak_eq(etag),
    });
    if matched {
        PreconditionState::Failed
    } else {
        PreconditionState::Fulfilled
    }
}

impl Preconditions {
    /// 针对已选变体的 ETag 求值请求中的条件
    pub fn evaluate(
        if_match: &[TagCondition],
        if_none_match: &[TagCondition],
        etag: &EntityTag,
    ) -> Self {
        Self {
            if_match: evaluate_if_match(if_match, etag),
            if_none_match: evaluate_if_none_match(if_none_match, etag),
            if_modified_since: PreconditionState::Unchecked,
        }
    }

    /// RFC 7232 §6 判定。`If-Match` 优先于 `If-None-Match`；
    /// 方法只影响 `If-None-Match` 失败时是 304 还是 412。
    pub fn decide(&self, method: HttpRequestMethod) -> Decision {
        use PreconditionState::*;

        if self.if_match == Failed {
            return Decision::PreconditionFailed;
        }
        // 修改时间条件的占位分支，当前不可达
        if self.if_match == Unchecked && self.if_modified_since == Failed {
            return Decision::PreconditionFailed;
        }

        if self.if_none_match == Failed {
            return if method.is_get_or_head() {
                Decision::NotModified
            } else {
                Decision::PreconditionFailed
            };
        }
        if self.if_none_match == Unchecked && self.if_modified_since == Failed {
            return Decision::NotModified;
        }

        Decision::Proceed
    }
}
