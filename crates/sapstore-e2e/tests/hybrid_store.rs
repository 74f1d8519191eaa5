//! Hybrid store end-to-end tests

use sapstore::access::{DataAccess, ReadOptions, Record};
use sapstore::{
    ApiHubSettings, BackendSystem, Entity, EntitySchema, GetAllOptions, StoreError, TelemetrySetting,
    WriteOptions,
};
use sapstore_e2e::{init_test, MockSecureStore, TestStore};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Entity with one field of each kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Connection {
    host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    /// Untagged: never persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    session_cache: Option<String>,
}

impl Entity for Connection {
    const SCHEMA: EntitySchema = EntitySchema {
        name: "connection",
        serializable: &["host"],
        sensitive: &["token"],
    };
}

/// Entity with a field tagged both ways
const DUAL_TAGGED: EntitySchema = EntitySchema {
    name: "dual",
    serializable: &["name", "secret"],
    sensitive: &["secret"],
};

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(record) => record,
        other => panic!("not an object: {}", other),
    }
}

#[tokio::test]
async fn test_write_then_read_merges_both_halves() {
    init_test();
    let t = TestStore::new();
    let hybrid = t.context.hybrid();

    let connection = Connection {
        host: "https://h".into(),
        token: Some("t1".into()),
        session_cache: Some("scratch".into()),
    };
    hybrid
        .write(&Connection::SCHEMA, "c1", &connection.to_record().unwrap())
        .await
        .unwrap();

    let read = hybrid
        .read(&Connection::SCHEMA, "c1", ReadOptions::full())
        .await
        .unwrap()
        .expect("record should exist");
    let read = Connection::from_record(read).unwrap();

    assert_eq!(read.host, "https://h");
    assert_eq!(read.token.as_deref(), Some("t1"));
    assert_eq!(read.session_cache, None, "untagged fields are never stored");

    // Each half holds only its own fields
    assert_eq!(
        t.file_entries("connections")["c1"],
        json!({ "host": "https://h" })
    );
    assert_eq!(
        t.secure.get(&t.service("connections"), "c1"),
        Some(json!({ "token": "t1" }))
    );
}

#[tokio::test]
async fn test_fresh_store_scenario() {
    init_test();
    let t = TestStore::new();

    let system = BackendSystem {
        password: Some("p1".into()),
        ..BackendSystem::new("sys1", "http://a")
    };
    t.store
        .systems()
        .write(&system, WriteOptions::default())
        .await
        .unwrap();

    let systems = t
        .store
        .systems()
        .get_all(GetAllOptions::default())
        .await
        .unwrap();
    assert_eq!(systems.len(), 1);
    assert_eq!(systems[0].password.as_deref(), Some("p1"));

    let entry = &t.file_entries("systems")["http://a"];
    assert_eq!(entry["name"], "sys1");
    assert_eq!(entry["url"], "http://a");
    assert!(entry.get("password").is_none());
    assert_eq!(entry["hasSensitiveData"], true);
}

#[tokio::test]
async fn test_no_sensitive_fields_skips_secure_store() {
    init_test();
    let t = TestStore::new();

    t.store
        .telemetry()
        .write(&TelemetrySetting::new(true))
        .await
        .unwrap();
    t.store
        .systems()
        .write(&BackendSystem::new("plain", "http://plain"), WriteOptions::default())
        .await
        .unwrap();

    assert_eq!(t.secure.save_calls(), 0);
    assert_eq!(
        t.store.telemetry().read().await.unwrap(),
        Some(TelemetrySetting::new(true))
    );
}

#[tokio::test]
async fn test_no_serializable_fields_skips_filesystem() {
    init_test();
    let t = TestStore::new();

    t.store
        .api_hub()
        .write(&ApiHubSettings::new("key-123"))
        .await
        .unwrap();

    assert!(t.read_file("apihubs").is_none(), "no plaintext file expected");
    assert_eq!(t.secure.save_calls(), 1);
    assert_eq!(
        t.store.api_hub().read().await.unwrap(),
        Some(ApiHubSettings::new("key-123"))
    );

    assert!(t.store.api_hub().delete().await.unwrap());
    assert_eq!(t.store.api_hub().read().await.unwrap(), None);
}

#[tokio::test]
async fn test_secret_failure_keeps_plaintext_half() {
    init_test();
    let t = TestStore::new();
    t.secure.set_fail_save(true);

    let system = BackendSystem::new("sys1", "http://a").with_credentials("u", "p1");
    let result = t
        .store
        .systems()
        .write(&system, WriteOptions::default())
        .await;

    match result {
        Err(StoreError::PartialWrite {
            plaintext_saved,
            secret_saved,
            ..
        }) => {
            assert!(plaintext_saved);
            assert!(!secret_saved);
        }
        other => panic!("expected partial write, got {:?}", other),
    }

    // Both halves were attempted; the plaintext one stands
    assert_eq!(t.secure.save_calls(), 1);
    assert_eq!(t.file_entries("systems")["http://a"]["name"], "sys1");
}

#[tokio::test]
async fn test_dual_tagged_field_is_stored_as_sensitive() {
    init_test();
    let t = TestStore::new();
    let hybrid = t.context.hybrid();

    hybrid
        .write(&DUAL_TAGGED, "d1", &record(json!({ "name": "n", "secret": "s" })))
        .await
        .unwrap();

    assert_eq!(t.file_entries("duals")["d1"], json!({ "name": "n" }));
    assert_eq!(
        t.secure.get(&t.service("duals"), "d1"),
        Some(json!({ "secret": "s" }))
    );

    let merged = hybrid
        .read(&DUAL_TAGGED, "d1", ReadOptions::full())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged, record(json!({ "name": "n", "secret": "s" })));
}

#[tokio::test]
async fn test_secret_half_wins_on_read() {
    init_test();
    let t = TestStore::new();

    // A stale plaintext password left by an older client
    t.seed_file("connections", json!({ "c1": { "host": "h", "token": "stale" } }));
    t.secure
        .seed(&t.service("connections"), "c1", json!({ "token": "fresh" }));

    let merged = t
        .context
        .hybrid()
        .read(&Connection::SCHEMA, "c1", ReadOptions::full())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(merged["token"], "fresh");
}

#[tokio::test]
async fn test_read_all_unions_both_backends() {
    init_test();
    let t = TestStore::new();

    t.seed_file("connections", json!({ "plain-only": { "host": "p" }, "both": { "host": "b" } }));
    t.secure
        .seed(&t.service("connections"), "both", json!({ "token": "tb" }));
    t.secure
        .seed(&t.service("connections"), "secret-only", json!({ "token": "ts" }));

    let all = t
        .context
        .hybrid()
        .read_all(&Connection::SCHEMA, ReadOptions::full())
        .await
        .unwrap();

    assert_eq!(all.len(), 3);
    assert_eq!(all["both"], record(json!({ "host": "b", "token": "tb" })));
    assert_eq!(all["secret-only"], record(json!({ "token": "ts" })));

    let plaintext = t
        .context
        .hybrid()
        .get_all(&Connection::SCHEMA, ReadOptions::plaintext())
        .await
        .unwrap();
    assert_eq!(plaintext.len(), 2);
    assert!(plaintext.iter().all(|r| !r.contains_key("token")));
}

#[tokio::test]
async fn test_read_all_looks_up_plaintext_ids_for_non_enumerating_backends() {
    init_test();
    let t = TestStore::with_mock(MockSecureStore::non_enumerating());

    t.seed_file("connections", json!({ "c1": { "host": "h" } }));
    t.secure
        .seed(&t.service("connections"), "c1", json!({ "token": "t1" }));
    t.secure
        .seed(&t.service("connections"), "orphan", json!({ "token": "t2" }));

    let all = t
        .context
        .hybrid()
        .read_all(&Connection::SCHEMA, ReadOptions::full())
        .await
        .unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(all["c1"]["token"], "t1");
}

#[tokio::test]
async fn test_delete_secret_only_key_returns_true() {
    init_test();
    let t = TestStore::new();
    t.secure
        .seed(&t.service("connections"), "c1", json!({ "token": "t1" }));

    let deleted = t
        .context
        .hybrid()
        .delete(&Connection::SCHEMA, "c1")
        .await
        .unwrap();

    assert!(deleted);
    assert_eq!(t.secure.entry_count(), 0);
}

#[tokio::test]
async fn test_delete_missing_key_returns_false() {
    init_test();
    let t = TestStore::new();

    let deleted = t
        .context
        .hybrid()
        .delete(&Connection::SCHEMA, "nothing")
        .await
        .unwrap();
    assert!(!deleted);
}

#[tokio::test]
async fn test_delete_surfaces_plaintext_failure() {
    init_test();
    let t = TestStore::new();
    std::fs::create_dir_all(t.context.base_dir()).unwrap();
    std::fs::write(t.file("connections"), "not json").unwrap();
    t.secure
        .seed(&t.service("connections"), "c1", json!({ "token": "t1" }));

    let result = t.context.hybrid().delete(&Connection::SCHEMA, "c1").await;

    assert!(matches!(result, Err(StoreError::Malformed { .. })));
    // The secret half still went
    assert_eq!(t.secure.entry_count(), 0);
    assert_eq!(
        std::fs::read_to_string(t.file("connections")).unwrap(),
        "not json"
    );
}

#[tokio::test]
async fn test_malformed_file_surfaces_error() {
    init_test();
    let t = TestStore::new();
    std::fs::create_dir_all(t.context.base_dir()).unwrap();
    std::fs::write(t.file("systems"), "{\"systems\": [").unwrap();

    let result = t
        .store
        .systems()
        .get_all(GetAllOptions::default())
        .await;
    assert!(matches!(result, Err(StoreError::Malformed { .. })));
}
