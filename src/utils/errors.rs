// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::engines::traits::DriverError;

/// 检查任务错误类型
///
/// 任务级失败，对外表现为 500 响应
#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("单飞门已关闭")]
    GateClosed,

    #[error("无效的检查URL: {0}")]
    InvalidUrl(String),

    #[error("检查任务异常终止: {0}")]
    JobAborted(String),
}
