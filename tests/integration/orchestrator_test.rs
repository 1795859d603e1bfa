// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use domaincheck::domain::models::capture::DecodedPayload;
use domaincheck::domain::models::check_job::{CheckJob, CheckMode};
use domaincheck::engines::traits::{DriverError, ResponseBody};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::Instant;

use super::helpers::fake_driver::{FakeDriver, FakeSessions};
use super::helpers::{orchestrator, BACKLINKS_LIST_ENDPOINT, OVERVIEW_ENDPOINT, TRAFFIC_ENDPOINT};

/// 流量阶段：2 秒后到达的信封响应被解包
#[tokio::test(start_paused = true)]
async fn test_traffic_envelope_unwrapped() {
    let driver = FakeDriver::new();
    driver.respond(
        "traffic-checker",
        Duration::from_secs(2),
        &format!("{}?input=yep.com", TRAFFIC_ENDPOINT),
        "req-1",
        r#"[{}, {"visits": 100}]"#,
    );
    let sessions = FakeSessions::new(driver.clone());

    let start = Instant::now();
    let report = orchestrator(sessions.clone())
        .run(&CheckJob::new("yep.com", CheckMode::Traffic))
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report["traffic"], DecodedPayload::Data(json!({"visits": 100})));
    assert!(start.elapsed() < Duration::from_secs(3));
    assert_eq!(sessions.opened.load(Ordering::SeqCst), 1);
}

/// 两个阶段的调用顺序，以及阶段之间监听器被清空
#[tokio::test(start_paused = true)]
async fn test_both_phases_call_sequence() {
    let driver = FakeDriver::new();
    driver.respond("traffic-checker", Duration::from_millis(300), TRAFFIC_ENDPOINT, "t", "[0, 1]");
    driver.respond("backlink-checker", Duration::from_millis(300), OVERVIEW_ENDPOINT, "o", "[0, 2]");
    driver.respond("backlink-checker", Duration::from_millis(600), BACKLINKS_LIST_ENDPOINT, "l", "[0, 3]");

    let report = orchestrator(FakeSessions::new(driver.clone()))
        .run(&CheckJob::new("yep.com", CheckMode::Both))
        .await
        .unwrap();

    assert_eq!(report["traffic"], DecodedPayload::Data(json!(1)));
    assert_eq!(report["domainOverview"], DecodedPayload::Data(json!(2)));
    assert_eq!(report["topBacklinksList"], DecodedPayload::Data(json!(3)));
    assert_eq!(driver.listener_count(), 0);

    let calls = driver.calls();
    let expected = vec![
        "enable_human_mode".to_string(),
        "listen".to_string(),
        "move_pointer:100,100,true".to_string(),
        "navigate:https://ahrefs.com/traffic-checker/?input=yep.com&mode=subdomains".to_string(),
        "get_text:body".to_string(),
        "fetch:t".to_string(),
        "clear".to_string(),
        "listen".to_string(),
        "move_pointer:100,100,true".to_string(),
        "navigate:https://ahrefs.com/backlink-checker/?input=yep.com&mode=subdomains".to_string(),
        "fetch:o".to_string(),
        "fetch:l".to_string(),
        "clear".to_string(),
        "disable_human_mode".to_string(),
        "close".to_string(),
    ];
    assert_eq!(calls, expected);
}

/// 只有 domainOverview 响应时，结果只包含该键（以及 traffic）
#[tokio::test(start_paused = true)]
async fn test_missing_backlinks_list_is_omitted() {
    let driver = FakeDriver::new();
    driver.respond("traffic-checker", Duration::from_secs(1), TRAFFIC_ENDPOINT, "t", r#"[{}, {"visits": 5}]"#);
    driver.respond(
        "backlink-checker",
        Duration::from_secs(4),
        OVERVIEW_ENDPOINT,
        "o",
        r#"["Ok", {"domainRating": 91}]"#,
    );

    let start = Instant::now();
    let report = orchestrator(FakeSessions::new(driver.clone()))
        .run(&CheckJob::new("yep.com", CheckMode::Both))
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.len(), 2);
    assert_eq!(report["traffic"], DecodedPayload::Data(json!({"visits": 5})));
    assert_eq!(report["domainOverview"], DecodedPayload::Data(json!({"domainRating": 91})));
    assert!(!report.contains_key("topBacklinksList"));
    // the backlinks phase waits out its full timeout
    assert!(elapsed >= Duration::from_secs(31));
    assert!(elapsed <= Duration::from_millis(31_500));
}

/// 未捕获到任何响应时返回空结果而不是错误
#[tokio::test(start_paused = true)]
async fn test_timeout_yields_empty_report() {
    let driver = FakeDriver::new();
    let report = orchestrator(FakeSessions::new(driver.clone()))
        .run(&CheckJob::new("quiet.com", CheckMode::Traffic))
        .await
        .unwrap();
    assert!(report.is_empty());
    assert!(driver.calls().contains(&"close".to_string()));
}

/// 响应体获取失败时对应键为错误标记
#[tokio::test(start_paused = true)]
async fn test_stale_body_becomes_marker() {
    let driver = FakeDriver::new();
    driver.respond_with(
        "traffic-checker",
        Duration::from_millis(100),
        TRAFFIC_ENDPOINT,
        "gone",
        Err(DriverError::BodyFetch("No resource with given identifier found".to_string())),
    );

    let report = orchestrator(FakeSessions::new(driver))
        .run(&CheckJob::new("yep.com", CheckMode::Traffic))
        .await
        .unwrap();

    assert_eq!(
        report["traffic"],
        DecodedPayload::failed("Failed to fetch response body: No resource with given identifier found")
    );
}

/// Base64 编码的响应体和非 JSON 内容
#[tokio::test(start_paused = true)]
async fn test_encoded_and_non_json_bodies() {
    let driver = FakeDriver::new();
    driver.respond_with(
        "backlink-checker",
        Duration::from_millis(100),
        OVERVIEW_ENDPOINT,
        "o",
        Ok(ResponseBody {
            content: BASE64.encode(r#"["Ok", {"backlinks": 12}]"#),
            base64_encoded: true,
        }),
    );
    driver.respond(
        "backlink-checker",
        Duration::from_millis(200),
        BACKLINKS_LIST_ENDPOINT,
        "l",
        "<html>rate limited</html>",
    );

    let report = orchestrator(FakeSessions::new(driver))
        .run(&CheckJob::new("yep.com", CheckMode::Backlinks))
        .await
        .unwrap();

    assert_eq!(report["domainOverview"], DecodedPayload::Data(json!({"backlinks": 12})));
    assert_eq!(
        report["topBacklinksList"],
        DecodedPayload::failed("Response not in JSON format")
    );
}

/// 重复事件只记录第一个
#[tokio::test(start_paused = true)]
async fn test_duplicate_events_first_wins() {
    let driver = FakeDriver::new();
    driver.respond("traffic-checker", Duration::from_millis(100), TRAFFIC_ENDPOINT, "first", "[0, \"first\"]");
    driver.respond("traffic-checker", Duration::from_millis(50), "https://ahrefs.com/static/app.js", "js", "x");
    driver.respond("traffic-checker", Duration::from_millis(200), TRAFFIC_ENDPOINT, "second", "[0, \"second\"]");

    let report = orchestrator(FakeSessions::new(driver.clone()))
        .run(&CheckJob::new("yep.com", CheckMode::Traffic))
        .await
        .unwrap();

    assert_eq!(report["traffic"], DecodedPayload::Data(json!("first")));
    assert!(!driver.calls().contains(&"fetch:second".to_string()));
}

/// 导航失败：前一阶段已有数据时返回部分结果
#[tokio::test(start_paused = true)]
async fn test_navigation_failure_keeps_earlier_phase() {
    let driver = FakeDriver::new();
    driver.respond("traffic-checker", Duration::from_millis(100), TRAFFIC_ENDPOINT, "t", "[0, 7]");
    driver.fail_navigation("backlink-checker", DriverError::Navigation("net::ERR_TIMED_OUT".to_string()));

    let report = orchestrator(FakeSessions::new(driver.clone()))
        .run(&CheckJob::new("yep.com", CheckMode::Both))
        .await
        .unwrap();

    assert_eq!(report.len(), 1);
    assert_eq!(report["traffic"], DecodedPayload::Data(json!(7)));
    // listener of the failed phase is still torn down
    assert_eq!(driver.listener_count(), 0);
    assert_eq!(driver.calls().iter().filter(|c| *c == "clear").count(), 2);
}

/// 导航失败且没有任何数据时为任务级失败，会话仍被关闭
#[tokio::test(start_paused = true)]
async fn test_navigation_failure_without_data_fails_job() {
    let driver = FakeDriver::new();
    driver.fail_navigation("traffic-checker", DriverError::ChallengeTimeout(20));

    let err = orchestrator(FakeSessions::new(driver.clone()))
        .run(&CheckJob::new("yep.com", CheckMode::Traffic))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Protection challenge not cleared within 20 seconds");
    let calls = driver.calls();
    assert_eq!(calls[calls.len() - 2], "disable_human_mode");
    assert_eq!(calls[calls.len() - 1], "close");
    assert_eq!(driver.listener_count(), 0);
}

/// 失败阶段不影响后续阶段
#[tokio::test(start_paused = true)]
async fn test_failed_first_phase_does_not_block_second() {
    let driver = FakeDriver::new();
    driver.fail_navigation("traffic-checker", DriverError::Navigation("reset".to_string()));
    driver.respond("backlink-checker", Duration::from_millis(100), OVERVIEW_ENDPOINT, "o", "[0, 1]");
    driver.respond("backlink-checker", Duration::from_millis(100), BACKLINKS_LIST_ENDPOINT, "l", "[0, 2]");

    let report = orchestrator(FakeSessions::new(driver))
        .run(&CheckJob::new("yep.com", CheckMode::Both))
        .await
        .unwrap();

    assert!(!report.contains_key("traffic"));
    assert_eq!(report["domainOverview"], DecodedPayload::Data(json!(1)));
    assert_eq!(report["topBacklinksList"], DecodedPayload::Data(json!(2)));
}

/// 调用方中途放弃时，会话仍在后台被清理并关闭
#[tokio::test(start_paused = true)]
async fn test_abandoned_run_still_closes_session() {
    let driver = FakeDriver::new();
    let orchestrator = orchestrator(FakeSessions::new(driver.clone()));
    let job = CheckJob::new("yep.com", CheckMode::Traffic);

    let result = tokio::time::timeout(Duration::from_secs(5), orchestrator.run(&job)).await;
    assert!(result.is_err());

    tokio::time::sleep(Duration::from_millis(10)).await;

    let calls = driver.calls();
    assert_eq!(calls[calls.len() - 3], "clear");
    assert_eq!(calls[calls.len() - 2], "disable_human_mode");
    assert_eq!(calls[calls.len() - 1], "close");
    assert_eq!(driver.listener_count(), 0);
}
