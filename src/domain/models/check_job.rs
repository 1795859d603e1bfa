// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 检查模式
///
/// 决定一次任务执行哪些阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckMode {
    /// 仅流量
    #[serde(rename = "traffic")]
    Traffic,
    /// 仅外链（域名评级）
    #[serde(rename = "dr")]
    Backlinks,
    /// 流量和外链
    #[serde(rename = "both")]
    Both,
}

impl CheckMode {
    /// 是否需要执行流量阶段
    pub fn includes_traffic(&self) -> bool {
        matches!(self, CheckMode::Traffic | CheckMode::Both)
    }

    /// 是否需要执行外链阶段
    pub fn includes_backlinks(&self) -> bool {
        matches!(self, CheckMode::Backlinks | CheckMode::Both)
    }
}

/// 域名检查任务
///
/// 每个请求创建一个，只在一次编排执行期间存在
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckJob {
    /// 任务ID，仅用于日志关联
    pub id: Uuid,
    /// 目标域名
    pub target: String,
    /// 检查模式
    pub mode: CheckMode,
}

impl CheckJob {
    pub fn new(target: impl Into<String>, mode: CheckMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            target: target.into(),
            mode,
        }
    }
}
