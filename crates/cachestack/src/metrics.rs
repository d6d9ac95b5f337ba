//! Cache hit/miss instrumentation.

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use cachestack_core::{CacheError, KeyedCache};
use metrics::{counter, histogram};

/// Describe las metricas del cache ante el recorder instalado.
/// Llamar una vez al inicio; registrar valores funciona sin ella.
pub fn register_cache_metrics() {
    metrics::describe_counter!("cachestack_cache_hits_total", "Total number of cache hits");
    metrics::describe_counter!(
        "cachestack_cache_misses_total",
        "Total number of cache misses"
    );
    metrics::describe_counter!(
        "cachestack_cache_clears_total",
        "Total number of explicit cache clears"
    );
    metrics::describe_histogram!(
        "cachestack_cache_operation_seconds",
        "Time spent on cache operations"
    );
}

/// Recorder de hits y misses.
///
/// Cuenta localmente con atomics y replica cada evento en la fachada
/// `metrics`. Los clones comparten los mismos contadores.
#[derive(Debug, Clone)]
pub struct CacheMetrics {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registra un hit
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        counter!("cachestack_cache_hits_total").increment(1);
    }

    /// Registra un miss
    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        counter!("cachestack_cache_misses_total").increment(1);
    }

    /// Registra un clear explicito
    pub fn record_clear(&self) {
        counter!("cachestack_cache_clears_total").increment(1);
    }

    /// Registra la duracion de una operacion
    pub fn record_operation_duration(&self, operation: &'static str, duration: Duration) {
        histogram!("cachestack_cache_operation_seconds", "operation" => operation)
            .record(duration.as_secs_f64());
    }

    /// Ejecuta `f` y registra su duracion bajo `operation`
    pub fn time_operation<T, F: FnOnce() -> T>(&self, operation: &'static str, f: F) -> T {
        let start = Instant::now();
        let result = f();
        self.record_operation_duration(operation, start.elapsed());
        result
    }

    /// Proporcion de lecturas con hit; 0.0 si todavia no hubo ninguna
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 { 0.0 } else { hits / total }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

impl Default for CacheMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decorador que registra hits y misses sin alterar el cache interno.
///
/// `get_or_create` cuenta un miss cuando la factory se ejecuto y un hit
/// cuando no; `try_get` cuenta un hit si encontro el valor y un miss si no.
/// Las llamadas que fallan sin ejecutar la factory no se cuentan.
#[derive(Debug)]
pub struct MeteredCache<C> {
    inner: C,
    metrics: CacheMetrics,
}

impl<C> MeteredCache<C> {
    /// Envuelve `inner` con un recorder nuevo.
    pub fn new(inner: C) -> Self {
        Self::with_metrics(inner, CacheMetrics::new())
    }

    /// Envuelve `inner` registrando en `metrics`.
    pub fn with_metrics(inner: C, metrics: CacheMetrics) -> Self {
        Self { inner, metrics }
    }

    /// Retorna el recorder
    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Returns the wrapped cache.
    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C, K, V> KeyedCache<K, V> for MeteredCache<C>
where
    C: KeyedCache<K, V>,
{
    fn try_get(&self, key: &K) -> Result<Option<V>, CacheError> {
        let found = self
            .metrics
            .time_operation("try_get", || self.inner.try_get(key))?;
        match found {
            Some(_) => self.metrics.record_hit(),
            None => self.metrics.record_miss(),
        }
        Ok(found)
    }

    fn get_or_create<E, F>(&self, key: K, factory: F) -> Result<V, E>
    where
        F: FnOnce(&K) -> Result<V, E>,
        E: From<CacheError>,
    {
        let invoked = Cell::new(false);
        let result = self.metrics.time_operation("get_or_create", || {
            self.inner.get_or_create(key, |key| {
                invoked.set(true);
                factory(key)
            })
        });

        if invoked.get() {
            self.metrics.record_miss();
        } else if result.is_ok() {
            self.metrics.record_hit();
        }
        result
    }

    fn clear(&self) {
        self.metrics.record_clear();
        self.inner.clear();
    }

    fn entries(&self) -> Vec<(K, V)> {
        self.inner.entries()
    }

    fn is_null(&self) -> bool {
        self.inner.is_null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cachestack_core::{Cache, NullCache};

    #[test]
    fn test_cache_metrics_hit_rate() {
        let metrics = CacheMetrics::new();

        metrics.record_hit();
        metrics.record_hit();
        metrics.record_hit();
        metrics.record_miss();

        assert!((metrics.hit_rate() - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_hit_rate_without_lookups() {
        assert_eq!(CacheMetrics::new().hit_rate(), 0.0);
    }

    #[test]
    fn test_operation_timing_returns_result() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.time_operation("test_op", || 42), 42);
    }

    #[test]
    fn test_metered_get_or_create_counts() {
        let cache = MeteredCache::new(Cache::new());

        cache.get_or_insert_with("a", |_| 1).unwrap();
        cache.get_or_insert_with("a", |_| 2).unwrap();
        cache.get_or_insert_with("b", |_| 3).unwrap();

        assert_eq!(cache.metrics().hits(), 1);
        assert_eq!(cache.metrics().misses(), 2);
    }

    #[test]
    fn test_metered_try_get_counts() {
        let cache = MeteredCache::new(Cache::new());
        cache.get_or_insert_with("a", |_| 1).unwrap();

        assert_eq!(cache.try_get(&"a").unwrap(), Some(1));
        assert_eq!(cache.try_get(&"b").unwrap(), None);

        assert_eq!(cache.metrics().hits(), 1);
        assert_eq!(cache.metrics().misses(), 2);
    }

    #[test]
    fn test_failed_factory_counts_as_miss() {
        let cache = MeteredCache::new(Cache::<&str, u32>::new());

        let result = cache.get_or_create("a", |_| Err(CacheError::invalid_settings("boom")));

        assert!(result.is_err());
        assert_eq!(cache.metrics().misses(), 1);
        assert_eq!(cache.metrics().hits(), 0);
    }

    #[test]
    fn test_null_cache_always_misses() {
        let cache = MeteredCache::new(NullCache::<&str, u32>::new());

        cache.get_or_insert_with("a", |_| 1).unwrap();
        cache.get_or_insert_with("a", |_| 1).unwrap();

        assert!(cache.is_null());
        assert_eq!(cache.metrics().misses(), 2);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = CacheMetrics::new();
        let cache = MeteredCache::with_metrics(Cache::new(), metrics.clone());

        cache.get_or_insert_with(1, |_| 1).unwrap();

        assert_eq!(metrics.misses(), 1);
    }
}
