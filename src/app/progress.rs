//! Job progress shared between running scans and progress polls.
//!
//! Each job owns one entry keyed by its id. Finished entries stay readable
//! (status `done`, 100%) until the retention TTL runs out and are evicted
//! lazily on the next registry call.
//!
//! Writes go through the [`JobLease`] handed out by `start`. A lease only
//! touches the entry it created, so a job that outlives a `clear` cannot
//! write into a newer job registered under the same id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ScanError;
use super::types::{JobStatus, ProgressEntry};

#[derive(Debug)]
struct JobSlot {
    status: JobStatus,
    visited: usize,
    total: usize,
    budget: usize,
    finished_at: Option<Instant>,
    generation: u64,
    cancel: CancellationToken,
}

impl JobSlot {
    fn percent(&self) -> u8 {
        match self.status {
            JobStatus::Done => 100,
            _ => percent_of(self.visited, self.budget),
        }
    }

    fn expired(&self, now: Instant, ttl: Duration) -> bool {
        self.finished_at
            .is_some_and(|finished| now.duration_since(finished) >= ttl)
    }
}

/// Ownership of one progress entry, returned by [`ProgressRegistry::start`].
#[derive(Debug, Clone)]
pub struct JobLease {
    job_id: String,
    generation: u64,
    cancel: CancellationToken,
}

impl JobLease {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// `floor(visited / max(1, budget) * 100)`, capped at 100.
pub fn percent_of(visited: usize, budget: usize) -> u8 {
    let pct = visited.saturating_mul(100) / budget.max(1);
    pct.min(100) as u8
}

#[derive(Debug)]
pub struct ProgressRegistry {
    jobs: DashMap<String, JobSlot>,
    next_generation: AtomicU64,
    ttl: Duration,
}

impl Default for ProgressRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

impl ProgressRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: DashMap::new(),
            next_generation: AtomicU64::new(1),
            ttl,
        }
    }

    /// Reserves `job_id` for a new running job. Fails if a job with that id
    /// is still running; a finished entry is replaced.
    pub fn start(&self, job_id: &str, budget: usize) -> Result<JobLease, ScanError> {
        self.evict_expired();

        let lease = JobLease {
            job_id: job_id.to_string(),
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
            cancel: CancellationToken::new(),
        };
        let slot = JobSlot {
            status: JobStatus::Running,
            visited: 0,
            total: budget,
            budget,
            finished_at: None,
            generation: lease.generation,
            cancel: lease.cancel.clone(),
        };

        match self.jobs.entry(job_id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().status == JobStatus::Running {
                    return Err(ScanError::JobIdInUse(job_id.to_string()));
                }
                occupied.insert(slot);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
            }
        }
        debug!(job_id, budget, generation = lease.generation, "progress entry created");
        Ok(lease)
    }

    pub fn update(&self, lease: &JobLease, visited: usize, total: usize) {
        self.with_owned_slot(lease, |slot| {
            slot.visited = visited;
            slot.total = total;
        });
    }

    /// Replaces the budget once the real amount of work is known.
    pub fn set_budget(&self, lease: &JobLease, budget: usize) {
        self.with_owned_slot(lease, |slot| {
            slot.budget = budget;
            slot.total = budget;
        });
    }

    pub fn complete(&self, lease: &JobLease) {
        self.with_owned_slot(lease, |slot| {
            slot.status = JobStatus::Done;
            slot.finished_at = Some(Instant::now());
        });
    }

    /// Drops the lease's entry if it is still running. Entries that finished,
    /// were cleared, or now belong to a newer job are left alone.
    pub fn release(&self, lease: &JobLease) -> bool {
        let removed = self
            .jobs
            .remove_if(&lease.job_id, |_, slot| {
                slot.generation == lease.generation && slot.status == JobStatus::Running
            })
            .is_some();
        if removed {
            lease.cancel.cancel();
            debug!(job_id = %lease.job_id, "unfinished progress entry released");
        }
        removed
    }

    pub fn get(&self, job_id: &str) -> ProgressEntry {
        self.evict_expired();
        match self.jobs.get(job_id) {
            Some(slot) => ProgressEntry {
                status: slot.status,
                visited: Some(slot.visited),
                total: Some(slot.total),
                percent: slot.percent(),
            },
            None => ProgressEntry::not_found(),
        }
    }

    /// Removes the entry, cancelling the job first if it is still running.
    pub fn clear(&self, job_id: &str) -> bool {
        match self.jobs.remove(job_id) {
            Some((_, slot)) => {
                slot.cancel.cancel();
                debug!(job_id, "progress entry cleared");
                true
            }
            None => false,
        }
    }

    fn with_owned_slot(&self, lease: &JobLease, apply: impl FnOnce(&mut JobSlot)) {
        if let Some(mut slot) = self.jobs.get_mut(&lease.job_id) {
            if slot.generation == lease.generation {
                apply(slot.value_mut());
            }
        }
    }

    fn evict_expired(&self) {
        let now = Instant::now();
        let ttl = self.ttl;
        self.jobs.retain(|_, slot| !slot.expired(now, ttl));
    }
}
