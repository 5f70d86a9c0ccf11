//! Request orchestrator: dedup, bounded concurrency, retries.
//!
//! Every outbound call goes through [`RequestOrchestrator::call`]:
//!
//! 1. Idempotent calls first check a result cache keyed by the hashed request
//!    signature. A live hit returns without touching the queue.
//! 2. An idempotent call whose signature is already in flight waits for that
//!    call's result instead of enqueueing a duplicate.
//! 3. Everything else joins a FIFO queue. At most `max_concurrent` operations
//!    run at once; each finished operation frees its slot (success, failure or
//!    panic) and, if work remains, re-triggers the drain after a short delay.
//!
//! The queue is unbounded; [`OrchestratorStats::queued`] exposes its depth.
//! Resilience (per-attempt timeout, capped exponential backoff) is layered on
//! with [`RetryPolicy`] via [`RequestOrchestrator::call_with_retry`] or
//! [`RequestOrchestrator::call_resilient`].

pub mod queue;
pub mod retry;

pub use queue::{PendingRequest, QueueState};
pub use retry::RetryPolicy;

use anyhow::Context;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::cache_engine::Cache;
use super::cache_key::cache_key;
use crate::domain::models::{CacheMetrics, CacheProfile, EvictionStrategy, OrchestratorConfig};
use crate::domain::{RequestError, RequestResult};
use crate::infrastructure::http::{classify_response, join_endpoint};

type Waiters = Vec<oneshot::Sender<RequestResult<Value>>>;

/// Per-call options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Whether the result may be cached and shared between identical calls.
    pub idempotent: bool,
    /// Result TTL; the orchestrator default applies when unset.
    pub ttl: Option<Duration>,
}

impl CallOptions {
    pub const fn idempotent() -> Self {
        Self {
            idempotent: true,
            ttl: None,
        }
    }

    pub const fn non_idempotent() -> Self {
        Self {
            idempotent: false,
            ttl: None,
        }
    }

    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Snapshot of orchestrator activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OrchestratorStats {
    pub max_concurrent: usize,
    pub active: usize,
    pub queued: usize,
    pub completed: u64,
    pub failed: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub coalesced: u64,
    pub cached_results: usize,
}

#[derive(Debug, Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    coalesced: AtomicU64,
}

struct Inner {
    config: OrchestratorConfig,
    retry_policy: RetryPolicy,
    queue: Mutex<QueueState>,
    results: Mutex<Cache<Value>>,
    in_flight: Mutex<HashMap<String, Waiters>>,
    counters: Counters,
    http: reqwest::Client,
}

/// Cloneable handle; clones share one queue and one result cache.
#[derive(Clone)]
pub struct RequestOrchestrator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RequestOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestOrchestrator")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// State locks are never held across an await, so a poisoned lock only means
/// another task panicked between two plain field updates.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RequestOrchestrator {
    pub fn new(config: OrchestratorConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.retry.timeout_ms))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self::with_client(config, http))
    }

    pub fn with_defaults() -> anyhow::Result<Self> {
        Self::new(OrchestratorConfig::default())
    }

    /// Build around an existing HTTP client.
    pub fn with_client(config: OrchestratorConfig, http: reqwest::Client) -> Self {
        let results = Cache::new(
            "request_results",
            CacheProfile::new(EvictionStrategy::Ttl, config.result_cache_max_entries)
                .with_ttl_secs(config.result_ttl_secs),
        );
        Self {
            inner: Arc::new(Inner {
                retry_policy: RetryPolicy::from(config.retry),
                queue: Mutex::new(QueueState::new(config.max_concurrent)),
                results: Mutex::new(results),
                in_flight: Mutex::new(HashMap::new()),
                counters: Counters::default(),
                http,
                config,
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// The retry policy built from configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry_policy
    }

    /// Operations currently running.
    pub fn active_count(&self) -> usize {
        lock(&self.inner.queue).active()
    }

    /// Operations waiting for a slot.
    pub fn queued_count(&self) -> usize {
        lock(&self.inner.queue).queued()
    }

    pub fn stats(&self) -> OrchestratorStats {
        let (max_concurrent, active, queued) = {
            let queue = lock(&self.inner.queue);
            (queue.max_concurrent(), queue.active(), queue.queued())
        };
        let counters = &self.inner.counters;
        OrchestratorStats {
            max_concurrent,
            active,
            queued,
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            cache_hits: counters.cache_hits.load(Ordering::Relaxed),
            cache_misses: counters.cache_misses.load(Ordering::Relaxed),
            coalesced: counters.coalesced.load(Ordering::Relaxed),
            cached_results: lock(&self.inner.results).len(),
        }
    }

    pub fn result_cache_metrics(&self) -> CacheMetrics {
        lock(&self.inner.results).metrics()
    }

    /// Forget every cached result.
    pub fn clear_cache(&self) {
        lock(&self.inner.results).clear();
    }

    /// Drop the cached result for one signature.
    pub fn invalidate(&self, signature: &str) -> bool {
        lock(&self.inner.results).invalidate(&cache_key(signature))
    }

    /// Run `operation` behind the cache and the concurrency gate.
    ///
    /// With `options.idempotent`, a live cached result for `signature` is
    /// returned without running anything, and a successful result is cached
    /// for `options.ttl` (or the configured default).
    pub async fn call<T, F, Fut>(
        &self,
        signature: &str,
        operation: F,
        options: CallOptions,
    ) -> RequestResult<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = RequestResult<T>> + Send + 'static,
    {
        if !options.idempotent {
            return self.enqueue(operation).await;
        }

        let key = cache_key(signature);
        let cached = lock(&self.inner.results).get(&key).cloned();
        if let Some(value) = cached {
            self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
            debug!(signature, "served from result cache");
            return decode(value);
        }
        self.inner.counters.cache_misses.fetch_add(1, Ordering::Relaxed);

        if let Some(waiter) = self.join_in_flight(&key) {
            self.inner.counters.coalesced.fetch_add(1, Ordering::Relaxed);
            debug!(signature, "joined in-flight request");
            let value = waiter.await.unwrap_or(Err(RequestError::Cancelled))?;
            return decode(value);
        }

        let flight = InFlight {
            inner: &self.inner,
            key: key.clone(),
            finished: false,
        };
        let outcome = self.enqueue(operation).await;

        let shared = match &outcome {
            Ok(result) => serde_json::to_value(result).map_err(RequestError::from),
            Err(err) => Err(err.clone()),
        };
        if let Ok(value) = &shared {
            let ttl = options
                .ttl
                .unwrap_or_else(|| Duration::from_secs(self.inner.config.result_ttl_secs));
            lock(&self.inner.results).put(key, value.clone(), Some(ttl));
        }
        flight.finish(&shared);

        outcome
    }

    /// Run a single operation outside the queue with timeout and retries.
    ///
    /// Start from [`retry_policy`](Self::retry_policy) and adjust it per call:
    ///
    /// ```no_run
    /// # async fn demo(orchestrator: perfcore::RequestOrchestrator) {
    /// let policy = orchestrator.retry_policy().with_retries(5).with_timeout_ms(2_000);
    /// let result = orchestrator
    ///     .call_with_retry(policy, || async { Ok::<_, perfcore::RequestError>(1) })
    ///     .await;
    /// # }
    /// ```
    pub async fn call_with_retry<T, F, Fut>(
        &self,
        policy: RetryPolicy,
        operation: F,
    ) -> RequestResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RequestResult<T>>,
    {
        policy.execute(operation).await
    }

    /// [`call`](Self::call) whose queued operation retries per the configured
    /// policy.
    pub async fn call_resilient<T, F, Fut>(
        &self,
        signature: &str,
        operation: F,
        options: CallOptions,
    ) -> RequestResult<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = RequestResult<T>> + Send + 'static,
    {
        let policy = self.inner.retry_policy;
        self.call(
            signature,
            move || async move { policy.execute(operation).await },
            options,
        )
        .await
    }

    /// GET `base_url` + `path` and decode the JSON body.
    ///
    /// Server errors are retried; any other non-success status is returned
    /// as a [`RequestError::ClientError`] without retrying.
    pub async fn get_json(
        &self,
        base_url: &str,
        path: &str,
        options: CallOptions,
    ) -> RequestResult<Value> {
        let url = join_endpoint(base_url, path);
        let signature = format!("GET {url}");
        let http = self.inner.http.clone();

        self.call_resilient(
            &signature,
            move || {
                let http = http.clone();
                let url = url.clone();
                async move {
                    let response = classify_response(http.get(&url).send().await?).await?;
                    let status = response.status();
                    if !status.is_success() {
                        let body = response.text().await.unwrap_or_default();
                        return Err(RequestError::from_status(status.as_u16(), body));
                    }
                    Ok::<_, RequestError>(response.json::<Value>().await?)
                }
            },
            options,
        )
        .await
    }

    /// Probe `base_url` + the configured health path once.
    ///
    /// True only when the endpoint answered with a success status within the
    /// probe timeout. Never errors.
    pub async fn is_reachable(&self, base_url: &str) -> bool {
        let url = join_endpoint(base_url, &self.inner.config.health_path);
        let probe_timeout = Duration::from_millis(self.inner.config.probe_timeout_ms);

        match self
            .inner
            .http
            .get(&url)
            .timeout(probe_timeout)
            .send()
            .await
        {
            Ok(response) => {
                let reachable = response.status().is_success();
                debug!(url = %url, status = response.status().as_u16(), reachable, "health probe answered");
                reachable
            }
            Err(err) => {
                debug!(url = %url, error = %err, "health probe failed");
                false
            }
        }
    }

    fn join_in_flight(&self, key: &str) -> Option<oneshot::Receiver<RequestResult<Value>>> {
        let mut in_flight = lock(&self.inner.in_flight);
        if let Some(waiters) = in_flight.get_mut(key) {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            Some(rx)
        } else {
            in_flight.insert(key.to_string(), Vec::new());
            None
        }
    }

    async fn enqueue<T, F, Fut>(&self, operation: F) -> RequestResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = RequestResult<T>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);
        let job = async move {
            let result = operation().await;
            let counter = if result.is_ok() {
                &inner.counters.completed
            } else {
                &inner.counters.failed
            };
            counter.fetch_add(1, Ordering::Relaxed);
            // caller may have gone away; nothing to report to
            let _ = tx.send(result);
        }
        .boxed();

        let request = PendingRequest::new(job);
        debug!(request_id = %request.id, "request enqueued");
        lock(&self.inner.queue).push(request);
        drain(&self.inner);

        rx.await.unwrap_or(Err(RequestError::Cancelled))
    }
}

/// Start queued requests while slots are free.
fn drain(inner: &Arc<Inner>) {
    loop {
        let Some(request) = lock(&inner.queue).next_ready() else {
            break;
        };
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            debug!(
                request_id = %request.id,
                waited_ms = u64::try_from(request.enqueued_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                "request started"
            );
            // own task, so a panicking operation still frees its slot
            if let Err(err) = tokio::spawn(request.job).await {
                warn!(request_id = %request.id, error = %err, "queued operation aborted");
            }
            let work_remains = lock(&inner.queue).release();
            if work_remains {
                schedule_drain(inner);
            }
        });
    }
}

fn schedule_drain(inner: Arc<Inner>) {
    let delay = Duration::from_millis(inner.config.drain_delay_ms);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        drain(&inner);
    });
}

fn decode<T: DeserializeOwned>(value: Value) -> RequestResult<T> {
    serde_json::from_value(value).map_err(RequestError::from)
}

/// Registration of an in-flight idempotent call.
///
/// Dropping it without [`InFlight::finish`] (the leading caller was
/// cancelled) releases any waiters with [`RequestError::Cancelled`].
struct InFlight<'a> {
    inner: &'a Inner,
    key: String,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(mut self, outcome: &RequestResult<Value>) {
        let waiters = lock(&self.inner.in_flight)
            .remove(&self.key)
            .unwrap_or_default();
        self.finished = true;
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // a later leader may already own the key
        if !self.finished {
            lock(&self.inner.in_flight).remove(&self.key);
        }
    }
}
