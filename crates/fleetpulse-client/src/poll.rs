//! Background polling for live views.
//!
//! Each subscription spawns a tokio task that re-fetches its query on a
//! fixed interval and pushes every result over a channel. Dropping the
//! handle (or calling [`PollHandle::cancel`]) aborts the task; receivers
//! simply see the stream end.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::debug;

use fleetpulse_api::models::{Vehicle, VehicleTelemetry};

use crate::cache::QueryResult;
use crate::client::FleetClient;

/// Telemetry detail views refresh every 5 seconds.
pub const DETAIL_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Fleet listings refresh every 10 seconds.
pub const LIST_POLL_INTERVAL: Duration = Duration::from_secs(10);
/// Map overviews refresh every 30 seconds.
pub const MAP_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Owner handle for a polling task. Aborts the task on drop so a forgotten
/// subscription cannot keep hitting the backend.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl FleetClient {
    /// Poll the caller's vehicle list. The first fetch happens immediately;
    /// each tick bypasses the cache TTL so the channel always carries a
    /// fresh read.
    pub fn poll_vehicles(
        &self,
        interval: Duration,
    ) -> (PollHandle, mpsc::Receiver<QueryResult<Vec<Vehicle>>>) {
        let client = self.clone();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = client.vehicles_with_ttl(Duration::ZERO).await;
                if tx.send(result).await.is_err() {
                    debug!("[Poll] vehicle list receiver dropped, stopping");
                    break;
                }
            }
        });
        (PollHandle { task }, rx)
    }

    /// Poll one vehicle's telemetry by sensor IMEI.
    pub fn poll_vehicle_data(
        &self,
        imei: &str,
        interval: Duration,
    ) -> (
        PollHandle,
        mpsc::Receiver<QueryResult<Option<VehicleTelemetry>>>,
    ) {
        let client = self.clone();
        let imei = imei.to_string();
        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let result = client.vehicle_data_with_ttl(&imei, Duration::ZERO).await;
                if tx.send(result).await.is_err() {
                    debug!("[Poll] telemetry receiver dropped, stopping");
                    break;
                }
            }
        });
        (PollHandle { task }, rx)
    }
}
