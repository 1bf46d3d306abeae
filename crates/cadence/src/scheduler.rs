// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Minute-aligned job runner. Each job runs at most once at a time: a tick
//! that finds the previous run still going skips that job, and ticks missed
//! while the process was busy are dropped rather than replayed.

use async_trait::async_trait;
use cadence_common::{api::DeliveryOutcome, error::Result, touch::TouchType};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::conversation::store::ConversationStore;
use crate::delivery::DeliveryExecutor;

const TICK: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, now: DateTime<Utc>) -> Result<()>;
}

struct Slot {
    job: Arc<dyn Job>,
    running: Arc<Mutex<()>>,
}

#[derive(Default)]
pub struct Scheduler {
    slots: Vec<Slot>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(mut self, job: impl Job + 'static) -> Self {
        self.slots.push(Slot {
            job: Arc::new(job),
            running: Arc::new(Mutex::new(())),
        });
        self
    }

    pub fn job_names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.job.name()).collect()
    }

    /// Starts every job that is not already running and returns the handles
    /// of the runs it started.
    pub fn tick(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let mut started = vec![];
        for slot in &self.slots {
            let Ok(guard) = slot.running.clone().try_lock_owned() else {
                warn!(job = slot.job.name(), "Previous run still in flight, skipping");
                continue;
            };
            let job = slot.job.clone();
            started.push(tokio::spawn(async move {
                let _guard = guard;
                debug!(job = job.name(), %now, "Running job");
                if let Err(err) = job.run(now).await {
                    error!(job = job.name(), "Job failed: {err}");
                }
            }));
        }
        started
    }

    /// Ticks on every minute boundary until `cancel` fires, then waits for
    /// the runs still in flight.
    pub async fn run(self, cancel: CancellationToken) {
        let start = Instant::now() + until_next_minute(Utc::now());
        let mut ticker = tokio::time::interval_at(start, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(jobs = ?self.job_names(), "Scheduler started");

        let mut in_flight: Vec<JoinHandle<()>> = vec![];
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    in_flight.retain(|handle| !handle.is_finished());
                    in_flight.extend(self.tick(Utc::now()));
                }
                _ = cancel.cancelled() => {
                    info!("Scheduler shutting down");
                    break;
                }
            }
        }

        for handle in in_flight {
            if let Err(err) = handle.await {
                error!("Job task panicked: {err}");
            }
        }
    }
}

pub fn until_next_minute(now: DateTime<Utc>) -> Duration {
    let into_minute = u64::try_from(now.timestamp_millis().rem_euclid(60_000)).unwrap_or(0);
    TICK - Duration::from_millis(into_minute)
}

/// Delivers one touch type to the users due this minute.
pub struct TouchJob {
    name: String,
    touch: TouchType,
    executor: DeliveryExecutor,
}

impl TouchJob {
    pub fn new(touch: TouchType, executor: DeliveryExecutor) -> Self {
        TouchJob {
            name: format!("touch:{touch}"),
            touch,
            executor,
        }
    }
}

#[async_trait]
impl Job for TouchJob {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let reports = self.executor.deliver_due(self.touch, now).await?;
        if reports.is_empty() {
            return Ok(());
        }
        let delivered = reports
            .iter()
            .filter(|r| r.outcome == DeliveryOutcome::Delivered)
            .count();
        info!(
            touch = %self.touch,
            due = reports.len(),
            delivered,
            "Touch run finished"
        );
        Ok(())
    }
}

/// Drops cursors whose TTL has passed.
pub struct PurgeJob {
    store: ConversationStore,
}

impl PurgeJob {
    pub fn new(store: ConversationStore) -> Self {
        PurgeJob { store }
    }
}

#[async_trait]
impl Job for PurgeJob {
    fn name(&self) -> &str {
        "purge-cursors"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<()> {
        let purged = self.store.purge_expired(now).await?;
        if purged > 0 {
            debug!(purged, "Purged expired cursors");
        }
        Ok(())
    }
}
