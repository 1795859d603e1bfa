// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, info_span, Instrument};

use crate::domain::models::capture::CheckReport;
use crate::domain::models::check_job::CheckJob;
use crate::domain::services::scrape_orchestrator::ScrapeOrchestrator;
use crate::domain::services::single_flight_gate::SingleFlightGate;
use crate::utils::errors::CheckError;

/// 域名检查用例
///
/// 先通过单飞门取得独占许可，再运行编排器。许可在任何退出路径上都会被释放。
#[derive(Clone)]
pub struct CheckDomainUseCase {
    gate: SingleFlightGate,
    orchestrator: Arc<ScrapeOrchestrator>,
}

impl CheckDomainUseCase {
    pub fn new(gate: SingleFlightGate, orchestrator: Arc<ScrapeOrchestrator>) -> Self {
        Self { gate, orchestrator }
    }

    pub fn gate(&self) -> &SingleFlightGate {
        &self.gate
    }

    /// 执行检查任务
    ///
    /// 取得许可后任务在独立的 tokio 任务中运行，调用方被取消（客户端断开）时
    /// 任务仍会完整结束并关闭会话，之后才释放单飞门。
    ///
    /// # 参数
    ///
    /// * `job` - 检查任务
    ///
    /// # 返回值
    ///
    /// * `Ok(CheckReport)` - 合并后的结果
    /// * `Err(CheckError)` - 任务级失败
    pub async fn execute(&self, job: CheckJob) -> Result<CheckReport, CheckError> {
        let span = info_span!("check_domain", job_id = %job.id, target = %job.target, mode = ?job.mode);

        let permit = self.gate.acquire().instrument(span.clone()).await?;
        let orchestrator = Arc::clone(&self.orchestrator);

        let task = tokio::spawn(
            async move {
                let _permit = permit;
                info!("Gate acquired, starting check");

                let start = Instant::now();
                let result = orchestrator.run(&job).await;
                histogram!("domaincheck_job_duration_seconds").record(start.elapsed().as_secs_f64());

                match &result {
                    Ok(report) => {
                        counter!("domaincheck_jobs_total", "outcome" => "success").increment(1);
                        info!("Check finished with {} key(s)", report.len());
                    }
                    Err(e) => {
                        counter!("domaincheck_jobs_total", "outcome" => "failure").increment(1);
                        info!("Check failed: {}", e);
                    }
                }
                result
            }
            .instrument(span),
        );

        task.await
            .map_err(|e| CheckError::JobAborted(e.to_string()))?
    }
}
