// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::models::capture::{CapturedResponse, DecodedPayload};
use crate::engines::traits::{BrowserDriver, ResponseBody};

/// 非 JSON 响应的错误标记内容
pub const NOT_JSON_MESSAGE: &str = "Response not in JSON format";

/// 获取并解码一个已捕获的响应
///
/// 所有失败都会降级为错误标记，不会向外抛出
///
/// # 参数
///
/// * `driver` - 浏览器驱动
/// * `captured` - 已捕获的响应句柄
///
/// # 返回值
///
/// 解包后的数据或错误标记
pub async fn decode_captured(
    driver: &dyn BrowserDriver,
    captured: &CapturedResponse,
) -> DecodedPayload {
    match driver.fetch_response_body(&captured.identifier).await {
        Ok(body) => decode_body(&body),
        Err(e) => {
            warn!(
                "Failed to fetch body for {} ({}): {}",
                captured.source_url, captured.identifier, e
            );
            DecodedPayload::failed(e.to_string())
        }
    }
}

/// 解码原始响应体
pub fn decode_body(body: &ResponseBody) -> DecodedPayload {
    let text = if body.base64_encoded {
        match BASE64.decode(body.content.trim()) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => return DecodedPayload::failed(format!("Invalid base64 body: {}", e)),
        }
    } else {
        body.content.clone()
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(parsed) => DecodedPayload::Data(unwrap_envelope(parsed)),
        Err(e) => {
            debug!("Captured body is not JSON: {}", e);
            DecodedPayload::failed(NOT_JSON_MESSAGE)
        }
    }
}

/// 解开 `[metadata, payload]` 信封
///
/// 恰好两个元素的数组取第二个元素，其他形状原样返回
pub fn unwrap_envelope(parsed: Value) -> Value {
    match parsed {
        Value::Array(mut items) if items.len() == 2 => items.swap_remove(1),
        other => other,
    }
}
