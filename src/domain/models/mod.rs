// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// 定义检查任务、目标声明、捕获句柄和解码结果
pub mod capture;
pub mod check_job;
