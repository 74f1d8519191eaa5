//! Test store harness
//!
//! Builds a full store over a temporary directory, with either the mock
//! secure store or any other [`SecureStore`].

use std::path::PathBuf;
use std::sync::Arc;

use sapstore::{Store, StoreContext};
use sapstore_secrets::SecureStore;
use serde_json::Value;
use tempfile::TempDir;

use crate::mock_secure_store::MockSecureStore;

/// Service prefix used by every test store
pub const TEST_SERVICE_PREFIX: &str = "sapstore-test";

/// Initialize tracing for tests
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("sapstore=debug,sapstore_secrets=debug,sapstore_e2e=debug")
        .with_test_writer()
        .try_init();
}

/// A store rooted in a fresh temporary directory
pub struct TestStore {
    /// Kept alive for the lifetime of the store
    pub dir: TempDir,
    /// The mock behind the store, when one is used
    pub secure: Arc<MockSecureStore>,
    pub context: StoreContext,
    pub store: Store,
}

impl TestStore {
    /// Store backed by a mock secure store that can enumerate entries
    pub fn new() -> Self {
        Self::with_mock(MockSecureStore::new())
    }

    /// Store backed by the given mock
    pub fn with_mock(secure: Arc<MockSecureStore>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let context = StoreContext::with_secure_store(
            dir.path().join("store"),
            TEST_SERVICE_PREFIX,
            secure.clone(),
        );
        let store = Store::new(context.clone());

        Self {
            dir,
            secure,
            context,
            store,
        }
    }

    /// Store backed by an arbitrary secure store; `secure` is then an unused mock
    pub fn with_secure_store(secure_store: Arc<dyn SecureStore>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let context = StoreContext::with_secure_store(
            dir.path().join("store"),
            TEST_SERVICE_PREFIX,
            secure_store,
        );
        let store = Store::new(context.clone());

        Self {
            dir,
            secure: MockSecureStore::new(),
            context,
            store,
        }
    }

    /// Qualified secret manager service for a collection, e.g. `systems`
    pub fn service(&self, collection: &str) -> String {
        format!("{}/{}", TEST_SERVICE_PREFIX, collection)
    }

    /// Path of a collection file, e.g. `systems`
    pub fn file(&self, collection: &str) -> PathBuf {
        self.context.base_dir().join(format!("{}.json", collection))
    }

    /// Parsed content of a collection file, `None` if it does not exist
    pub fn read_file(&self, collection: &str) -> Option<Value> {
        let content = std::fs::read_to_string(self.file(collection)).ok()?;
        Some(serde_json::from_str(&content).expect("Store file is not JSON"))
    }

    /// Entries of a collection file, keyed by id
    pub fn file_entries(&self, collection: &str) -> serde_json::Map<String, Value> {
        match self.read_file(collection) {
            Some(Value::Object(mut document)) => match document.remove(collection) {
                Some(Value::Object(entries)) => entries,
                _ => serde_json::Map::new(),
            },
            _ => serde_json::Map::new(),
        }
    }

    /// Write a collection file directly, as an older client would have
    pub fn seed_file(&self, collection: &str, entries: Value) {
        std::fs::create_dir_all(self.context.base_dir()).expect("Failed to create store dir");
        let mut document = serde_json::Map::new();
        document.insert(collection.to_string(), entries);
        std::fs::write(
            self.file(collection),
            serde_json::to_string_pretty(&Value::Object(document)).expect("Serialize seed"),
        )
        .expect("Failed to seed store file");
    }

    /// Whether the migration sentinel file exists
    pub fn sentinel_exists(&self) -> bool {
        self.context.sentinel().path().is_file()
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}
