// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use axum::extract::{Extension, Json};
use std::sync::Arc;

use crate::application::dto::check_request::CheckRequestDto;
use crate::application::use_cases::check_domain_use_case::CheckDomainUseCase;
use crate::domain::models::capture::CheckReport;
use crate::domain::models::check_job::CheckJob;
use crate::presentation::errors::AppError;

/// 域名检查端点
///
/// 返回的对象键为 `traffic`、`domainOverview`、`topBacklinksList` 的子集，
/// 每个值是解码后的数据或 `{"error": ...}`
pub async fn check_domain(
    Extension(use_case): Extension<Arc<CheckDomainUseCase>>,
    Json(payload): Json<CheckRequestDto>,
) -> Result<Json<CheckReport>, AppError> {
    let report = use_case.execute(CheckJob::from(payload)).await?;
    Ok(Json(report))
}
