// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

use crate::domain::models::check_job::{CheckJob, CheckMode};

/// 域名检查请求数据传输对象
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckRequestDto {
    /// 要检查的域名
    pub url: String,
    /// 检查类型：traffic、dr 或 both
    #[serde(rename = "checkType")]
    pub check_type: CheckMode,
}

impl From<CheckRequestDto> for CheckJob {
    fn from(dto: CheckRequestDto) -> Self {
        CheckJob::new(dto.url, dto.check_type)
    }
}
