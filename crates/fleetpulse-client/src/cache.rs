//! Query cache: TTL freshness, in-flight de-duplication, dependent
//! invalidation.
//!
//! Results are keyed by (operation, canonical params). A fresh entry is
//! served without a network call; concurrent fetches for one key share a
//! single in-flight request via a broadcast channel, so several views
//! observing the same data never stampede the backend. Mutations invalidate
//! the read operations declared dependent on them - only after confirmed
//! success - which forces the next read to refetch.
//!
//! Failed reads follow stale-while-error: the error is reported alongside
//! the last known good value, and the cache is not updated for that key.

use std::collections::HashMap;
use std::sync::Mutex as StdMutex;

use tokio::sync::{broadcast, Mutex};
use tokio::time::{Duration, Instant};
use tracing::debug;

use fleetpulse_api::routes::{Operation, Params};
use fleetpulse_api::ApiError;

type Payload = serde_json::Value;

/// Outcome of a read operation.
///
/// `data` and `error` can both be set: a failed refetch keeps serving the
/// last known good value alongside the error.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> QueryResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    pub fn err(error: ApiError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    pub fn stale(data: T, error: ApiError) -> Self {
        Self {
            data: Some(data),
            error: Some(error),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryResult<U> {
        QueryResult {
            data: self.data.map(f),
            error: self.error,
        }
    }
}

impl QueryResult<Payload> {
    /// Decode the raw payload into a typed result. A payload that does not
    /// deserialize becomes an `UnexpectedShape` error unless a real error is
    /// already present.
    pub fn decode<T: serde::de::DeserializeOwned>(self, op: Operation) -> QueryResult<T> {
        let QueryResult { data, error } = self;
        match data.map(serde_json::from_value::<T>) {
            None => QueryResult { data: None, error },
            Some(Ok(value)) => QueryResult {
                data: Some(value),
                error,
            },
            Some(Err(e)) => QueryResult {
                data: None,
                error: Some(error.unwrap_or_else(|| {
                    ApiError::unexpected_shape(format!("{} payload: {}", op.name(), e))
                })),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct QueryKey {
    op: Operation,
    params: String,
}

impl QueryKey {
    fn new(op: Operation, params: &Params) -> Self {
        // Params is a BTreeMap, so this serialization is canonical.
        let params = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        Self { op, params }
    }
}

struct CacheEntry {
    value: Payload,
    fetched_at: Instant,
    stale: bool,
}

type Shared = Result<Payload, ApiError>;

pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
    // Sync mutex, never held across an await: the in-flight guard must be
    // able to clean up from a plain `Drop`.
    in_flight: StdMutex<HashMap<QueryKey, broadcast::Sender<Shared>>>,
}

/// Removes the in-flight entry for its key when dropped.
///
/// The fetching future can be cancelled at any await point (a polling task
/// being aborted mid-request, for instance). Dropping the guard takes the
/// sender out of the map and closes the channel, so joined readers observe
/// `RecvError::Closed` instead of waiting on a request nobody is running.
struct InFlightGuard<'a> {
    cache: &'a QueryCache,
    key: &'a QueryKey,
    tx: Option<broadcast::Sender<Shared>>,
}

impl InFlightGuard<'_> {
    /// Normal completion: release the key, then broadcast to joined readers.
    fn complete(mut self, result: Shared) {
        self.release();
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(result);
        }
    }

    fn release(&self) {
        self.cache
            .in_flight
            .lock()
            .expect("in-flight map lock poisoned")
            .remove(self.key);
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if self.tx.is_some() {
            self.release();
        }
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            in_flight: StdMutex::new(HashMap::new()),
        }
    }

    /// Serve `op` from cache when fresh, otherwise run `fetch` - joining an
    /// already in-flight fetch for the same key instead of issuing a second
    /// network call.
    pub async fn fetch<F, Fut>(
        &self,
        op: Operation,
        params: &Params,
        ttl: Duration,
        fetch: F,
    ) -> QueryResult<Payload>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Shared>,
    {
        let key = QueryKey::new(op, params);

        {
            let entries = self.entries.lock().await;
            if let Some(entry) = entries.get(&key) {
                if !entry.stale && entry.fetched_at.elapsed() < ttl {
                    return QueryResult::ok(entry.value.clone());
                }
            }
        }

        // Join an in-flight fetch, or become the one that fetches. The guard
        // releases the key even if this future is cancelled mid-fetch.
        let joined_or_guard = {
            let mut in_flight = self.in_flight.lock().expect("in-flight map lock poisoned");
            match in_flight.get(&key) {
                Some(tx) => {
                    let rx = tx.subscribe();
                    drop(in_flight);
                    debug!("[QueryCache] joining in-flight fetch: {}", key.op);
                    Err(rx)
                }
                None => {
                    let (tx, _) = broadcast::channel(1);
                    in_flight.insert(key.clone(), tx.clone());
                    Ok(InFlightGuard {
                        cache: self,
                        key: &key,
                        tx: Some(tx),
                    })
                }
            }
        };
        let guard = match joined_or_guard {
            Err(mut rx) => {
                return match rx.recv().await {
                    Ok(Ok(value)) => QueryResult::ok(value),
                    Ok(Err(error)) => self.error_result(&key, error).await,
                    // Closed: the fetching future was dropped before it
                    // could broadcast.
                    Err(_) => {
                        self.error_result(
                            &key,
                            ApiError::Network {
                                message: "in-flight request was abandoned".to_string(),
                            },
                        )
                        .await
                    }
                };
            }
            Ok(guard) => guard,
        };

        let result = fetch().await;

        if let Ok(value) = &result {
            let mut entries = self.entries.lock().await;
            entries.insert(
                key.clone(),
                CacheEntry {
                    value: value.clone(),
                    fetched_at: Instant::now(),
                    stale: false,
                },
            );
        }
        guard.complete(result.clone());

        match result {
            Ok(value) => QueryResult::ok(value),
            Err(error) => self.error_result(&key, error).await,
        }
    }

    /// Mark every cached result of `op` stale, whatever its params.
    pub async fn invalidate(&self, op: Operation) {
        let mut entries = self.entries.lock().await;
        let mut hits = 0usize;
        for (key, entry) in entries.iter_mut() {
            if key.op == op {
                entry.stale = true;
                hits += 1;
            }
        }
        if hits > 0 {
            debug!("[QueryCache] invalidated {} entries for {}", hits, op);
        }
    }

    /// Invalidate every read operation declared dependent on `mutation`.
    pub async fn invalidate_dependents(&self, mutation: Operation) {
        for &dep in dependents(mutation) {
            self.invalidate(dep).await;
        }
    }

    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    async fn error_result(&self, key: &QueryKey, error: ApiError) -> QueryResult<Payload> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) => QueryResult::stale(entry.value.clone(), error),
            None => QueryResult::err(error),
        }
    }
}

/// Which cached reads a mutation invalidates.
pub fn dependents(mutation: Operation) -> &'static [Operation] {
    match mutation {
        Operation::VehicleSync | Operation::AdminRegisterVehicle => &[Operation::VehicleList],
        Operation::AdminUpdateVehicle => {
            &[Operation::VehicleList, Operation::AdminUserVehicles]
        }
        Operation::AdminResetPassword => &[Operation::AdminUserGet],
        _ => &[],
    }
}
