// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// 响应捕获的核心：载荷解码、响应关联、会话编排和单飞门
pub mod payload_decoder;
pub mod refresh_watcher;
pub mod response_correlator;
pub mod scrape_orchestrator;
pub mod single_flight_gate;
