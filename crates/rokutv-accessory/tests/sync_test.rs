//! Synchronizer behavior against a scripted device.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::MockController;
use rokutv_accessory::{AccessorySynchronizer, PublishedSnapshot};
use rokutv_core::{AccessoryEvent, AppIdentityMap, EventBus, LocalAppId, RawApp, HOME_APP_ID};

fn apps() -> Arc<AppIdentityMap> {
    Arc::new(AppIdentityMap::new(vec![
        RawApp::new("12", "Netflix", "appl", "4.1.218"),
        RawApp::home(),
    ]))
}

fn synchronizer(controller: Arc<MockController>, bus: &EventBus) -> Arc<AccessorySynchronizer> {
    Arc::new(AccessorySynchronizer::new(
        "tv-1",
        controller,
        apps(),
        bus.clone(),
        Duration::from_secs(30),
    ))
}

#[tokio::test]
async fn test_power_published_only_on_change() {
    let bus = EventBus::new();
    let mut power = bus.filter().power_events();
    let controller = Arc::new(MockController::new("10.0.0.5").with_power_script(&[true, true, false, false]));
    let sync = synchronizer(controller.clone(), &bus);

    for _ in 0..4 {
        sync.refresh().await;
    }

    let pushed: Vec<bool> = power
        .drain()
        .into_iter()
        .map(|event| match event {
            AccessoryEvent::PowerChanged { powered, .. } => powered,
            other => panic!("unexpected event {:?}", other),
        })
        .collect();
    assert_eq!(pushed, vec![true, false]);
    assert_eq!(controller.count("query_info"), 4);
}

#[tokio::test]
async fn test_active_input_published_every_poll() {
    let bus = EventBus::new();
    let mut inputs = bus.filter().input_events();
    let controller = Arc::new(MockController::new("10.0.0.5").with_active(Some("12")));
    let sync = synchronizer(controller, &bus);

    sync.refresh().await;
    sync.refresh().await;

    let events = inputs.drain();
    assert_eq!(events.len(), 2);
    for event in events {
        assert_eq!(
            event,
            AccessoryEvent::ActiveInputChanged {
                accessory_id: "tv-1".to_string(),
                local_id: LocalAppId::from_remote_id("12"),
            }
        );
    }
}

#[tokio::test]
async fn test_info_failure_leaves_power_untouched() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe();
    let controller = Arc::new(
        MockController::new("10.0.0.5")
            .failing_info()
            .with_active(Some("12")),
    );
    let sync = synchronizer(controller, &bus);

    sync.refresh().await;

    let events = rx.drain();
    assert_eq!(events.len(), 1);
    assert!(events[0].is_input_event());
    assert_eq!(
        sync.snapshot(),
        PublishedSnapshot {
            powered: None,
            active_input: Some(LocalAppId::from_remote_id("12")),
        }
    );
}

#[tokio::test]
async fn test_active_failure_leaves_input_untouched() {
    let bus = EventBus::new();
    let controller = Arc::new(
        MockController::new("10.0.0.5")
            .with_power_script(&[true])
            .failing_active(),
    );
    let sync = synchronizer(controller, &bus);

    sync.refresh().await;

    assert_eq!(sync.snapshot().powered, Some(true));
    assert_eq!(sync.snapshot().active_input, None);
}

#[tokio::test]
async fn test_home_screen_and_unknown_app_show_home() {
    let bus = EventBus::new();
    let home = LocalAppId::from_remote_id(HOME_APP_ID);

    let on_home = synchronizer(Arc::new(MockController::new("10.0.0.5")), &bus);
    on_home.refresh().await;
    assert_eq!(on_home.snapshot().active_input, Some(home));

    let on_unknown = synchronizer(
        Arc::new(MockController::new("10.0.0.6").with_active(Some("551012"))),
        &bus,
    );
    on_unknown.refresh().await;
    assert_eq!(on_unknown.snapshot().active_input, Some(home));
}

#[tokio::test]
async fn test_refresh_power_reports_device_state() {
    let bus = EventBus::new();
    let mut power = bus.filter().power_events();
    let sync = synchronizer(
        Arc::new(MockController::new("10.0.0.5").with_power_script(&[true])),
        &bus,
    );

    assert_eq!(sync.refresh_power().await, Some(true));
    assert_eq!(power.drain().len(), 1);

    let failing = synchronizer(Arc::new(MockController::new("10.0.0.6").failing_info()), &bus);
    assert_eq!(failing.refresh_power().await, None);
    assert_eq!(failing.snapshot().powered, None);
}

#[tokio::test(start_paused = true)]
async fn test_poll_loop_keeps_running_through_failures() {
    let bus = EventBus::new();
    let controller = Arc::new(MockController::new("10.0.0.5").failing_info());
    let sync = synchronizer(controller.clone(), &bus);

    let handle = sync.clone().spawn();
    // Ticks at 0s, 30s, 60s and 90s.
    tokio::time::sleep(Duration::from_secs(95)).await;
    handle.abort();

    assert_eq!(controller.count("query_info"), 4);
    assert_eq!(controller.count("query_active_app"), 4);
    assert_eq!(sync.snapshot().powered, None);
    assert!(sync.snapshot().active_input.is_some());
}
