//! Test helpers for cachestack integration tests.

#![allow(dead_code, unused_imports)]

use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};

use cachestack::CacheError;
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Installs a test subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Factory call counter.
#[derive(Debug, Default)]
pub struct Calls(AtomicU32);

impl Calls {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a factory that counts its call and yields `value`.
    pub fn yielding<'a, K, V: Clone + 'a>(&'a self, value: V) -> impl FnOnce(&K) -> Result<V, CacheError> + 'a {
        move |_| {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    /// Returns a factory that counts its call and fails.
    pub fn failing<K, V>(&self) -> impl FnOnce(&K) -> Result<V, CacheError> + '_ {
        move |_| {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(CacheError::invalid_settings("factory failed"))
        }
    }

    pub fn count(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }
}
