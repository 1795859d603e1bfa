// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use domaincheck::domain::services::refresh_watcher::{wait_for_refresh, RefreshWatch};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use super::helpers::fake_driver::FakeDriver;

#[tokio::test(start_paused = true)]
async fn test_title_change_detected() {
    let driver = FakeDriver::new();
    driver.set_page("https://ahrefs.com/traffic-checker/", "Just a moment...");

    let flipper = Arc::clone(&driver);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        flipper.set_page("https://ahrefs.com/traffic-checker/", "Website Traffic Checker");
    });

    let start = Instant::now();
    let refreshed = wait_for_refresh(
        driver.as_ref(),
        "https://ahrefs.com/traffic-checker/",
        "Just a moment...",
        RefreshWatch::default(),
    )
    .await
    .unwrap();

    assert!(refreshed);
    assert!(start.elapsed() < Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_url_change_detected_immediately() {
    let driver = FakeDriver::new();
    driver.set_page("https://ahrefs.com/after", "Checker");

    let refreshed = wait_for_refresh(
        driver.as_ref(),
        "https://ahrefs.com/before",
        "Checker",
        RefreshWatch::default(),
    )
    .await
    .unwrap();
    assert!(refreshed);
}

#[tokio::test(start_paused = true)]
async fn test_unchanged_page_times_out() {
    let driver = FakeDriver::new();
    driver.set_page("https://ahrefs.com/", "Checker");

    let watch = RefreshWatch {
        timeout: Duration::from_secs(2),
        interval: Duration::from_millis(100),
    };
    let start = Instant::now();
    let refreshed = wait_for_refresh(driver.as_ref(), "https://ahrefs.com/", "Checker", watch)
        .await
        .unwrap();

    assert!(!refreshed);
    assert!(start.elapsed() >= Duration::from_secs(2));
}
