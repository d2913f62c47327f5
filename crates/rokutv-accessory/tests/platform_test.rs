//! Discovery through publish, restore and characteristic handling.

mod common;

use std::sync::Arc;

use common::{MockController, MockDiscoverer};
use rokutv_accessory::{
    accessory_uuid, Accessory, AccessoryCategory, CharacteristicKind, CharacteristicValue,
    DiscoveryCoordinator, InMemoryAccessoryRepository, InputSource, InputSourceType,
    RokuTvPlatform,
};
use rokutv_core::{
    AccessoryEvent, DeviceAddress, EventBus, LocalAppId, PlatformConfig, RawApp, HOME_APP_ID,
};

fn platform(
    config: PlatformConfig,
    repository: Arc<InMemoryAccessoryRepository>,
    controllers: Vec<Arc<MockController>>,
    bus: &EventBus,
) -> RokuTvPlatform {
    RokuTvPlatform::new(
        config,
        repository,
        Arc::new(MockDiscoverer::new(controllers)),
        bus.clone(),
    )
}

#[tokio::test]
async fn test_discovery_appends_home_app() {
    let controller = Arc::new(MockController::new("192.168.1.20"));
    let coordinator = DiscoveryCoordinator::new(Arc::new(MockDiscoverer::new(vec![controller])));

    let devices = coordinator.discover().await.unwrap();
    assert_eq!(devices.len(), 1);

    let apps = devices[0].descriptor.app_map();
    let all = apps.all();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].remote_id, "12");
    assert_eq!(all[0].name, "Netflix");
    assert_eq!(all[1].remote_id, HOME_APP_ID);
    assert_eq!(apps.by_remote_id(HOME_APP_ID).unwrap().name, "Home");
    assert_eq!(all[0].local_id, LocalAppId(1569));
    assert_eq!(all[1].local_id, LocalAppId(1450575459));
}

#[tokio::test]
async fn test_failing_device_does_not_block_others() {
    let good = Arc::new(MockController::new("192.168.1.20").with_name("Den"));
    let bad = Arc::new(MockController::new("192.168.1.21").unreachable());
    let other = Arc::new(MockController::new("192.168.1.22").with_name("Bedroom"));
    let coordinator =
        DiscoveryCoordinator::new(Arc::new(MockDiscoverer::new(vec![good, bad, other])));

    let devices = coordinator.discover().await.unwrap();

    let names: Vec<&str> = devices.iter().map(|d| d.descriptor.display_name()).collect();
    assert_eq!(names, vec!["Den", "Bedroom"]);
}

#[tokio::test]
async fn test_new_accessories_are_published_once() {
    let bus = EventBus::new();
    let mut lifecycle = bus.filter().lifecycle_events();
    let repository = Arc::new(InMemoryAccessoryRepository::new());
    let controllers = vec![
        Arc::new(MockController::new("192.168.1.20").with_name("Den")),
        Arc::new(MockController::new("192.168.1.22").with_name("Bedroom")),
    ];
    let platform = platform(PlatformConfig::default(), repository.clone(), controllers, &bus);

    let started = platform.did_finish_launching().await;
    assert_eq!(started.len(), 2);

    let den = accessory_uuid(&DeviceAddress::new("192.168.1.20"));
    let bedroom = accessory_uuid(&DeviceAddress::new("192.168.1.22"));
    assert_eq!(repository.published().await, vec![den, bedroom]);

    let stored = repository.get(&den).await.unwrap();
    assert_eq!(stored.display_name, "Den");
    assert_eq!(stored.category, AccessoryCategory::Television);
    assert_eq!(stored.information.manufacturer, "TCL");
    assert_eq!(stored.television.configured_name, "Den");
    assert_eq!(stored.television.linked_inputs.len(), 2);
    assert!(stored.speaker.active);

    let events = lifecycle.drain();
    assert_eq!(events.len(), 2);
    assert!(events
        .iter()
        .all(|e| matches!(e, AccessoryEvent::AccessoryPublished { .. })));

    // A second launch signal attaches nothing new.
    assert!(platform.did_finish_launching().await.is_empty());
    assert_eq!(repository.published().await.len(), 2);

    platform.shutdown().await;
    assert!(platform.accessories().await.is_empty());
}

#[tokio::test]
async fn test_cached_accessory_is_restored_not_published() {
    let bus = EventBus::new();
    let mut lifecycle = bus.filter().lifecycle_events();
    let repository = Arc::new(InMemoryAccessoryRepository::new());
    let controller = Arc::new(MockController::new("192.168.1.20").with_name("Den"));
    let uuid = accessory_uuid(&DeviceAddress::new("192.168.1.20"));
    let platform = platform(PlatformConfig::default(), repository.clone(), vec![controller], &bus);

    let mut cached = Accessory::new("Den", uuid, AccessoryCategory::Television);
    cached.inputs.push(InputSource {
        identifier: LocalAppId(1),
        remote_id: "12".to_string(),
        name: "Netflix".to_string(),
        source_type: InputSourceType::Other,
        configured: false,
    });
    platform.configure_accessory(cached).await;

    let started = platform.did_finish_launching().await;
    assert_eq!(started.len(), 1);
    assert!(repository.published().await.is_empty());

    let restored = repository.get(&uuid).await.unwrap();
    // The cached Netflix input is reused and updated, Home is added.
    assert_eq!(restored.inputs.len(), 2);
    let netflix = restored.input_by_name("Netflix").unwrap();
    assert_eq!(netflix.identifier, LocalAppId(1569));
    assert_eq!(netflix.source_type, InputSourceType::Hdmi);
    assert!(netflix.configured);
    assert_eq!(
        restored.input_by_name("Home").unwrap().source_type,
        InputSourceType::HomeScreen
    );

    let events = lifecycle.drain();
    assert_eq!(
        events,
        vec![AccessoryEvent::AccessoryRestored {
            accessory_id: uuid.to_string(),
            name: "Den".to_string(),
        }]
    );

    platform.shutdown().await;
}

#[tokio::test]
async fn test_excluded_apps_are_not_inputs() {
    let bus = EventBus::new();
    let repository = Arc::new(InMemoryAccessoryRepository::new());
    let controller = Arc::new(MockController::new("192.168.1.20").with_apps(vec![
        RawApp::new("12", "Netflix", "appl", "4.1.218"),
        RawApp::new("837", "YouTube", "appl", "2.0.0"),
    ]));
    let config = PlatformConfig::default().with_excluded_apps(vec!["Netflix".to_string()]);
    let platform = platform(config, repository.clone(), vec![controller], &bus);

    let started = platform.did_finish_launching().await;

    let names: Vec<&str> = started[0].inputs().iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["YouTube", "Home"]);

    let stored = repository.get(&started[0].uuid()).await.unwrap();
    assert!(stored.input_by_name("Netflix").is_none());
    assert!(stored.input_by_name("Home").is_some());

    platform.shutdown().await;
}

#[tokio::test]
async fn test_characteristic_reads_and_writes() {
    let bus = EventBus::new();
    let repository = Arc::new(InMemoryAccessoryRepository::new());
    let controller = Arc::new(
        MockController::new("192.168.1.20")
            .with_power_script(&[true])
            .with_active(Some("12")),
    );
    let platform = platform(
        PlatformConfig::default(),
        repository,
        vec![controller.clone()],
        &bus,
    );
    let started = platform.did_finish_launching().await;
    let tv = &started[0];
    tv.stop_polling();

    assert_eq!(
        tv.handle_get(CharacteristicKind::Active).await,
        Some(CharacteristicValue::Active(true))
    );
    assert_eq!(
        tv.handle_get(CharacteristicKind::ActiveIdentifier).await,
        Some(CharacteristicValue::ActiveIdentifier(LocalAppId(1569)))
    );
    assert_eq!(tv.handle_get(CharacteristicKind::RemoteKey).await, None);

    controller.clear_calls();
    tv.handle_set(CharacteristicValue::ActiveIdentifier(LocalAppId(
        1450575459,
    )))
    .await;
    assert_eq!(controller.calls(), vec!["keypress Home".to_string()]);

    platform.shutdown().await;
}

#[tokio::test]
async fn test_reads_fall_back_when_device_is_silent() {
    let bus = EventBus::new();
    let repository = Arc::new(InMemoryAccessoryRepository::new());
    let controller = Arc::new(MockController::new("192.168.1.20").failing_active());
    let platform = platform(PlatformConfig::default(), repository, vec![controller], &bus);
    let started = platform.did_finish_launching().await;
    let tv = &started[0];
    tv.stop_polling();

    assert_eq!(
        tv.handle_get(CharacteristicKind::ActiveIdentifier).await,
        Some(CharacteristicValue::ActiveIdentifier(LocalAppId::from_remote_id(
            HOME_APP_ID
        )))
    );

    platform.shutdown().await;
}

#[tokio::test]
async fn test_repository_follows_state_events() {
    let bus = EventBus::new();
    let repository = Arc::new(InMemoryAccessoryRepository::new());
    let follower = repository.clone().follow(&bus);
    let controller = Arc::new(
        MockController::new("192.168.1.20")
            .with_power_script(&[true])
            .with_active(Some("12")),
    );
    let platform = platform(
        PlatformConfig::default(),
        repository.clone(),
        vec![controller],
        &bus,
    );
    let started = platform.did_finish_launching().await;
    let tv = &started[0];
    tv.stop_polling();

    tv.synchronizer().refresh().await;
    // Let the follower task catch up.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let stored = repository.get(&tv.uuid()).await.unwrap();
    assert!(stored.television.active);
    assert_eq!(stored.television.active_identifier, Some(LocalAppId(1569)));

    platform.shutdown().await;
    follower.abort();
}
