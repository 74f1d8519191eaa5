//! End-to-end test infrastructure for sapstore
//!
//! This crate provides test utilities for running full store scenarios
//! against a temporary directory and an in-memory secret manager.

pub mod harness;
pub mod mock_secure_store;

pub use harness::{init_test, TestStore, TEST_SERVICE_PREFIX};
pub use mock_secure_store::MockSecureStore;
