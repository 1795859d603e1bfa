// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::engines::traits::ResponseEvent;

/// 目标响应声明
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    /// 结果中的键名
    pub name: String,
    /// 响应URL需要包含的片段
    pub url_fragment: String,
}

impl TargetSpec {
    pub fn new(name: impl Into<String>, url_fragment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_fragment: url_fragment.into(),
        }
    }

    /// 判断响应URL是否命中
    pub fn matches(&self, url: &str) -> bool {
        url.contains(&self.url_fragment)
    }
}

/// 已捕获的响应句柄
///
/// 标识只在驱动会话存活期间有效
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    pub source_url: String,
    pub status_code: u16,
    pub identifier: String,
}

impl From<&ResponseEvent> for CapturedResponse {
    fn from(event: &ResponseEvent) -> Self {
        Self {
            source_url: event.url.clone(),
            status_code: event.status,
            identifier: event.request_id.clone(),
        }
    }
}

/// 解码后的载荷
///
/// 要么是结构化数据，要么是 `{"error": ...}` 错误标记
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DecodedPayload {
    Data(Value),
    Failed { error: String },
}

impl DecodedPayload {
    pub fn failed(reason: impl Into<String>) -> Self {
        DecodedPayload::Failed {
            error: reason.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, DecodedPayload::Failed { .. })
    }
}

/// 单个阶段的结果，键为 `TargetSpec::name`
pub type PhaseResult = BTreeMap<String, DecodedPayload>;

/// 整个任务的结果
pub type CheckReport = BTreeMap<String, DecodedPayload>;
