// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 入口点解析
//!
//! 将一组入口点名称展开为去重、保持首次出现顺序的脚本与样式表列表，
//! 并附带每个文件的 SRI 哈希。结果只取决于名称顺序与清单内容，
//! 相同输入的两次调用必然产生完全相同的输出。

use std::collections::HashSet;

use crate::{exception::Exception, manifest::Manifest};

/// 解析结果中的单个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// 清单中的逻辑路径
    pub file: String,
    pub integrity_hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedEntrypoint {
    pub scripts: Vec<Element>,
    pub styles: Vec<Element>,
}

/// 去重累加器，按逻辑路径判重
#[derive(Default)]
struct OrderedSet<'a> {
    seen: HashSet<&'a str>,
    items: Vec<&'a str>,
}

impl<'a> OrderedSet<'a> {
    fn extend(&mut self, paths: &'a [String]) {
        for path in paths {
            if self.seen.insert(path.as_str()) {
                self.items.push(path.as_str());
            }
        }
    }

    fn into_elements(self, manifest: &Manifest) -> Result<Vec<Element>, Exception> {
        self.items
            .into_iter()
            .map(|path| {
                let file = manifest
                    .file(path)
                    .ok_or_else(|| Exception::MissingFileData(path.to_string()))?;
                Ok(Element {
                    file: path.to_string(),
                    integrity_hash: file.integrity_hash.clone(),
                })
            })
            .collect()
    }
}

/// 按给定顺序解析入口点名称。
///
/// 未知名称返回 `UnknownEntrypoint`；入口点引用了清单中不存在的文件时返回 `MissingFileData`。
pub fn resolve<I, S>(manifest: &Manifest, names: I) -> Result<ResolvedEntrypoint, Exception>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut scripts = OrderedSet::default();
    let mut styles = OrderedSet::default();

    for name in names {
        let name = name.as_ref();
        let entrypoint = manifest
            .entrypoint(name)
            .ok_or_else(|| Exception::UnknownEntrypoint(name.to_string()))?;
        scripts.extend(&entrypoint.scripts);
        styles.extend(&entrypoint.styles);
    }

    Ok(ResolvedEntrypoint {
        scripts: scripts.into_elements(manifest)?,
        styles: styles.into_elements(manifest)?,
    })
}
