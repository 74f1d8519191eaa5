//! Mock secure store for E2E tests
//!
//! This module provides an in-memory implementation of the SecureStore trait
//! that records calls and can simulate backend failures.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

use sapstore_secrets::SecureStore;

/// In-memory secret manager that tracks operations
pub struct MockSecureStore {
    /// Stored secrets: (service, key) -> value
    entries: DashMap<(String, String), Value>,
    /// Whether `get_all` lists every entry or only answers for known keys
    enumerates: bool,
    /// Whether to simulate failures on save
    fail_save: AtomicBool,
    save_calls: AtomicUsize,
    retrieve_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    get_all_calls: AtomicUsize,
    /// Keys passed to successful saves, in call order
    saved_keys: Mutex<Vec<String>>,
}

impl MockSecureStore {
    /// Create a mock that can enumerate its entries
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a mock that, like most OS keyrings, only answers for keys it is asked about
    pub fn non_enumerating() -> Arc<Self> {
        Arc::new(Self {
            enumerates: false,
            ..Self::default()
        })
    }

    /// Insert a secret directly, bypassing call tracking
    pub fn seed(&self, service: &str, key: &str, value: Value) {
        self.entries
            .insert((service.to_string(), key.to_string()), value);
    }

    /// Get a stored secret (for test assertions)
    pub fn get(&self, service: &str, key: &str) -> Option<Value> {
        self.entries
            .get(&(service.to_string(), key.to_string()))
            .map(|v| v.value().clone())
    }

    /// Number of stored secrets
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Configure mock to fail save operations
    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn retrieve_calls(&self) -> usize {
        self.retrieve_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn get_all_calls(&self) -> usize {
        self.get_all_calls.load(Ordering::SeqCst)
    }

    pub fn saved_keys(&self) -> Vec<String> {
        self.saved_keys.lock().clone()
    }
}

impl Default for MockSecureStore {
    fn default() -> Self {
        Self {
            entries: DashMap::new(),
            enumerates: true,
            fail_save: AtomicBool::new(false),
            save_calls: AtomicUsize::new(0),
            retrieve_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            get_all_calls: AtomicUsize::new(0),
            saved_keys: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SecureStore for MockSecureStore {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn save(&self, service: &str, key: &str, value: &Value) -> bool {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_save.load(Ordering::SeqCst) {
            tracing::debug!("MockSecureStore: simulated save failure for {}/{}", service, key);
            return false;
        }

        self.entries
            .insert((service.to_string(), key.to_string()), value.clone());
        self.saved_keys.lock().push(key.to_string());
        tracing::debug!("MockSecureStore: saved {}/{}", service, key);
        true
    }

    async fn retrieve(&self, service: &str, key: &str) -> Option<Value> {
        self.retrieve_calls.fetch_add(1, Ordering::SeqCst);
        self.get(service, key)
    }

    async fn delete(&self, service: &str, key: &str) -> bool {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .remove(&(service.to_string(), key.to_string()))
            .is_some()
    }

    async fn get_all(&self, service: &str, known_keys: &[String]) -> BTreeMap<String, Value> {
        self.get_all_calls.fetch_add(1, Ordering::SeqCst);
        self.entries
            .iter()
            .filter(|entry| entry.key().0 == service)
            .filter(|entry| self.enumerates || known_keys.contains(&entry.key().1))
            .map(|entry| (entry.key().1.clone(), entry.value().clone()))
            .collect()
    }
}
