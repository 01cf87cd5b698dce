// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;

fn monitor() -> Heartbeat {
    Heartbeat::new(Some(Duration::from_secs(30)), Duration::from_secs(10))
}

#[tokio::test(start_paused = true)]
async fn unanswered_probe_times_out() {
    let mut heartbeat = monitor();
    heartbeat.start();
    let start = Instant::now();

    assert_eq!(heartbeat.wait().await, Beat::Tick);
    assert!(start.elapsed() >= Duration::from_secs(30));
    assert_eq!(heartbeat.handle(Beat::Tick), Action::SendProbe);
    heartbeat.probe_sent();
    assert!(heartbeat.probe_outstanding());

    assert_eq!(heartbeat.wait().await, Beat::Timeout);
    assert!(start.elapsed() >= Duration::from_secs(40));
    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(heartbeat.handle(Beat::Timeout), Action::Dead);
    assert!(!heartbeat.is_running());
    assert!(!heartbeat.probe_outstanding());
}

#[tokio::test(start_paused = true)]
async fn pong_clears_probe() {
    let mut heartbeat = monitor();
    heartbeat.start();

    let beat = heartbeat.wait().await;
    assert_eq!(heartbeat.handle(beat), Action::SendProbe);
    heartbeat.probe_sent();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let rtt = heartbeat.on_pong().unwrap();
    assert!(rtt >= Duration::from_secs(2));
    assert!(!heartbeat.probe_outstanding());

    // Next beat is the following tick, not a timeout
    let start = Instant::now();
    assert_eq!(heartbeat.wait().await, Beat::Tick);
    assert!(start.elapsed() >= Duration::from_secs(28));
}

#[tokio::test(start_paused = true)]
async fn tick_with_outstanding_probe_is_dead() {
    // Timeout longer than the interval so the tick comes first
    let mut heartbeat = Heartbeat::new(Some(Duration::from_secs(10)), Duration::from_secs(60));
    heartbeat.start();

    let beat = heartbeat.wait().await;
    assert_eq!(heartbeat.handle(beat), Action::SendProbe);
    heartbeat.probe_sent();

    assert_eq!(heartbeat.wait().await, Beat::Tick);
    assert_eq!(heartbeat.handle(Beat::Tick), Action::Dead);
    assert!(!heartbeat.is_running());
}

#[tokio::test]
async fn pong_without_probe_is_ignored() {
    let mut heartbeat = monitor();
    heartbeat.start();
    assert_eq!(heartbeat.on_pong(), None);
    assert!(heartbeat.is_running());
}

#[tokio::test]
async fn stop_clears_everything() {
    let mut heartbeat = monitor();
    heartbeat.start();
    heartbeat.probe_sent();
    heartbeat.stop();
    assert!(!heartbeat.is_running());
    assert!(!heartbeat.probe_outstanding());
}

#[tokio::test(start_paused = true)]
async fn disabled_heartbeat_never_beats() {
    let mut heartbeat = Heartbeat::new(None, Duration::from_secs(10));
    heartbeat.start();
    assert!(!heartbeat.is_running());
    let beat = tokio::time::timeout(Duration::from_secs(3600), heartbeat.wait()).await;
    assert!(beat.is_err());
}
