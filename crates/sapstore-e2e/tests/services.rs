//! Service-level end-to-end tests

use std::sync::Arc;
use std::time::Duration;

use sapstore::migration::BACKEND_SYSTEM_MIGRATION_V1;
use sapstore::{
    ApiHubSettings, BackendSystem, BackendSystemKey, GetAllOptions, SecureStorageMode, StoreError,
    SystemPatch, SystemType, TelemetrySetting, WriteOptions,
};
use sapstore_e2e::{init_test, TestStore};
use sapstore_secrets::{select_from, SecretError, SecureStore};
use serde_json::json;

fn unavailable() -> Result<Arc<dyn SecureStore>, SecretError> {
    Err(SecretError::unavailable("keyring", "no secret service on this host"))
}

#[tokio::test]
async fn test_duplicate_write_requires_force() {
    init_test();
    let t = TestStore::new();
    let systems = t.store.systems();

    let first = BackendSystem::new("first", "http://a").with_client("100");
    systems.write(&first, WriteOptions::default()).await.unwrap();

    let second = BackendSystem::new("second", "http://a/").with_client(" 100 ");
    let result = systems.write(&second, WriteOptions::default()).await;
    assert!(matches!(result, Err(StoreError::AlreadyExists(id)) if id == "http://a/100"));

    systems
        .write(&second, WriteOptions { force: true })
        .await
        .unwrap();
    let stored = systems
        .read(&BackendSystemKey::new("http://a", Some("100".into())))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "second");
}

#[tokio::test]
async fn test_write_rejects_blank_url() {
    init_test();
    let t = TestStore::new();

    let result = t
        .store
        .systems()
        .write(&BackendSystem::new("nameless", "   "), WriteOptions::default())
        .await;
    assert!(matches!(result, Err(StoreError::Invalid(_))));
    assert!(t.read_file("systems").is_none());
}

#[tokio::test]
async fn test_partial_update_keeps_key_and_credentials() {
    init_test();
    let t = TestStore::new();
    let systems = t.store.systems();
    let key = BackendSystemKey::new("http://a", Some("100".into()));

    systems
        .write(
            &BackendSystem::new("dev", "http://a")
                .with_client("100")
                .with_credentials("user", "old"),
            WriteOptions::default(),
        )
        .await
        .unwrap();

    let updated = systems
        .partial_update(
            &key,
            SystemPatch {
                name: Some("dev-renamed".into()),
                system_type: Some(SystemType::OnPrem),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "dev-renamed");
    assert_eq!(updated.url, "http://a");
    assert_eq!(updated.client.as_deref(), Some("100"));

    let stored = systems.read(&key).await.unwrap().unwrap();
    assert_eq!(stored.name, "dev-renamed");
    assert_eq!(stored.system_type, Some(SystemType::OnPrem));
    assert_eq!(stored.username.as_deref(), Some("user"));
    assert_eq!(stored.password.as_deref(), Some("old"));
}

#[tokio::test]
async fn test_partial_update_missing_system() {
    init_test();
    let t = TestStore::new();

    let result = t
        .store
        .systems()
        .partial_update(
            &BackendSystemKey::new("http://missing", None),
            SystemPatch::default(),
        )
        .await;
    assert!(matches!(result, Err(StoreError::NotFound(id)) if id == "http://missing"));
}

#[tokio::test]
async fn test_read_normalizes_key() {
    init_test();
    let t = TestStore::new();
    let systems = t.store.systems();

    systems
        .write(
            &BackendSystem::new("x", "http://x/").with_client("100"),
            WriteOptions::default(),
        )
        .await
        .unwrap();

    let read = systems
        .read(&BackendSystemKey::new("  http://x  ", Some(" 100 ".into())))
        .await
        .unwrap();
    assert_eq!(read.map(|s| s.name), Some("x".to_string()));
    assert!(t.file_entries("systems").contains_key("http://x/100"));
}

#[tokio::test]
async fn test_read_skips_secure_store_without_credentials() {
    init_test();
    let t = TestStore::new();
    let systems = t.store.systems();

    let written = systems
        .write(&BackendSystem::new("plain", "http://plain"), WriteOptions::default())
        .await
        .unwrap();
    assert_eq!(written.has_sensitive_data, Some(false));

    let read = systems
        .read(&BackendSystemKey::new("http://plain", None))
        .await
        .unwrap();

    assert!(read.is_some());
    assert_eq!(t.secure.retrieve_calls(), 0);
}

#[tokio::test]
async fn test_force_overwrite_without_credentials_drops_old_secret() {
    init_test();
    let t = TestStore::new();
    let systems = t.store.systems();
    let key = BackendSystemKey::new("http://a", None);

    systems
        .write(
            &BackendSystem::new("dev", "http://a").with_credentials("u", "old"),
            WriteOptions::default(),
        )
        .await
        .unwrap();
    systems
        .write(&BackendSystem::new("dev", "http://a"), WriteOptions { force: true })
        .await
        .unwrap();

    assert_eq!(t.secure.get(&t.service("systems"), "http://a"), None);

    let read = systems.read(&key).await.unwrap().unwrap();
    assert_eq!(read.username, None);
    assert_eq!(read.password, None);

    let listed = systems.get_all(GetAllOptions::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].password, None);
    assert_eq!(listed[0].has_sensitive_data, Some(false));
}

#[tokio::test]
async fn test_listing_hides_secret_of_credential_free_system() {
    init_test();
    let t = TestStore::new();
    t.context
        .sentinel()
        .record(BACKEND_SYSTEM_MIGRATION_V1)
        .await
        .unwrap();
    t.seed_file(
        "systems",
        json!({ "http://a": { "name": "dev", "url": "http://a", "hasSensitiveData": false } }),
    );
    // Left behind by a cleanup that failed
    t.secure
        .seed(&t.service("systems"), "http://a", json!({ "username": "u", "password": "stale" }));

    let listed = t
        .store
        .systems()
        .get_all(GetAllOptions::default())
        .await
        .unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].username, None);
    assert_eq!(listed[0].password, None);
}

#[tokio::test]
async fn test_delete_system() {
    init_test();
    let t = TestStore::new();
    let systems = t.store.systems();
    let system = BackendSystem::new("dev", "http://a").with_credentials("u", "p");

    systems.write(&system, WriteOptions::default()).await.unwrap();
    assert!(systems.delete(&system).await.unwrap());
    assert!(!systems.delete(&system).await.unwrap());

    assert!(systems.read(&system.key()).await.unwrap().is_none());
    assert_eq!(t.secure.entry_count(), 0);
    assert!(t.file_entries("systems").is_empty());
}

#[tokio::test]
async fn test_unavailable_secret_manager_degrades_to_dummy() {
    init_test();
    let secure = select_from(SecureStorageMode::Enabled, &[unavailable]);
    assert_eq!(secure.backend_name(), "dummy");

    let t = TestStore::with_secure_store(secure);
    let systems = t.store.systems();

    systems
        .write(
            &BackendSystem::new("dev", "http://a").with_credentials("u", "p"),
            WriteOptions::default(),
        )
        .await
        .expect("writes succeed without a secret manager");

    let listed = systems.get_all(GetAllOptions::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "dev");
    assert_eq!(listed[0].password, None);
    assert_eq!(listed[0].has_sensitive_data, Some(true));

    let entry = &t.file_entries("systems")["http://a"];
    assert!(entry.get("password").is_none());
    assert!(entry.get("username").is_none());
}

#[tokio::test]
async fn test_telemetry_setting_round_trip() {
    init_test();
    let t = TestStore::new();
    let telemetry = t.store.telemetry();

    assert_eq!(telemetry.read().await.unwrap(), None);

    telemetry.write(&TelemetrySetting::new(false)).await.unwrap();
    telemetry.write(&TelemetrySetting::new(true)).await.unwrap();

    assert_eq!(telemetry.read().await.unwrap(), Some(TelemetrySetting::new(true)));
    assert_eq!(
        t.read_file("telemetrysettings"),
        Some(json!({ "telemetrysettings": { "telemetrysetting": { "enableTelemetry": true } } }))
    );
}

#[tokio::test]
async fn test_api_hub_key_lives_only_in_secure_store() {
    init_test();
    let t = TestStore::new();
    let api_hub = t.store.api_hub();

    api_hub.write(&ApiHubSettings::new("k1")).await.unwrap();

    assert_eq!(
        t.secure.get(&t.service("apihubs"), "apiHub"),
        Some(json!({ "apiKey": "k1" }))
    );
    assert_eq!(t.secure.saved_keys(), vec!["apiHub".to_string()]);
    assert!(t.read_file("apihubs").is_none());
}

#[tokio::test]
async fn test_watch_needs_existing_file() {
    init_test();
    let t = TestStore::new();
    let systems = t.store.systems();

    assert!(systems.watch(|_| {}).unwrap().is_none());

    systems
        .write(&BackendSystem::new("dev", "http://a"), WriteOptions::default())
        .await
        .unwrap();

    let (tx, rx) = std::sync::mpsc::channel();
    let watcher = systems
        .watch(move |event| {
            let _ = tx.send(event);
        })
        .unwrap();
    assert!(watcher.is_some());

    systems
        .write(&BackendSystem::new("other", "http://b"), WriteOptions::default())
        .await
        .unwrap();

    // Delivery timing is platform dependent; only check the handle stays usable
    let _ = rx.recv_timeout(Duration::from_millis(200));
    drop(watcher);
}
