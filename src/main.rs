// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::Extension;
use domaincheck::application::use_cases::check_domain_use_case::CheckDomainUseCase;
use domaincheck::config::settings::Settings;
use domaincheck::domain::services::scrape_orchestrator::{OrchestratorConfig, ScrapeOrchestrator};
use domaincheck::domain::services::single_flight_gate::SingleFlightGate;
use domaincheck::engines::chromium_driver::ChromiumSessionFactory;
use domaincheck::presentation::routes;
use domaincheck::utils::telemetry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 主函数
///
/// 应用程序入口点，负责初始化所有组件并启动服务
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting domaincheck...");

    // 2. Load configuration
    let settings = Arc::new(Settings::new()?);
    info!("Configuration loaded");

    // 3. Initialize Prometheus Metrics
    domaincheck::infrastructure::metrics::init_metrics(&settings.metrics);

    // 4. Browser sessions are opened lazily on the first check
    let sessions = Arc::new(ChromiumSessionFactory::new(settings.browser.clone()));
    let orchestrator = Arc::new(ScrapeOrchestrator::new(
        sessions,
        OrchestratorConfig::from(settings.as_ref()),
    ));
    let gate = SingleFlightGate::new();
    let use_case = Arc::new(CheckDomainUseCase::new(gate.clone(), orchestrator));

    // 5. Start HTTP server
    let app = routes::routes()
        .layer(Extension(use_case))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
            gate.close();
        })
        .await?;

    Ok(())
}
