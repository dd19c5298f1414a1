//! Admission control for crawl units
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Optional memory-pressure gating before a unit is admitted

use crate::config::{CrawlerConfig, MemoryConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sysinfo::{MemoryRefreshKind, RefreshKind, System};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

type UsageProbe = Box<dyn FnMut() -> f64 + Send>;

/// Last reading, reused until the check interval has passed
struct Sampler {
    probe: UsageProbe,
    last: Option<(Instant, f64)>,
    /// Start of the current run of readings above the threshold
    pressure_since: Option<Instant>,
    warned: bool,
}

/// Holds new units back while memory usage is above a threshold
///
/// Usage is sampled at most once per check interval. The wait budget
/// belongs to a pressure episode, not to a unit: the episode starts at the
/// first reading above the threshold and ends at the first reading at or
/// below it. Units are held until the episode is `max_wait` old; after that
/// every unit is admitted straight away, with a single warning, until usage
/// drops. A wave spawning units one after another therefore stalls for at
/// most `max_wait` per episode rather than `max_wait` per URL.
pub struct MemoryGate {
    threshold: Option<f64>,
    check_interval: Duration,
    max_wait: Duration,
    sampler: Mutex<Sampler>,
}

impl MemoryGate {
    /// A gate that admits everything immediately
    pub fn disabled() -> Self {
        Self::with_probe(None, Duration::from_secs(1), Duration::ZERO, || 0.0)
    }

    /// A gate reading system memory through sysinfo
    pub fn from_config(config: &MemoryConfig) -> Self {
        let Some(threshold) = config.threshold_percent else {
            return Self::disabled();
        };

        let mut system = System::new_with_specifics(
            RefreshKind::nothing().with_memory(MemoryRefreshKind::everything()),
        );

        Self::with_probe(
            Some(threshold),
            Duration::from_millis(config.check_interval_ms),
            Duration::from_secs(config.max_wait_secs),
            move || {
                system.refresh_memory();
                let total = system.total_memory();
                if total == 0 {
                    return 0.0;
                }
                system.used_memory() as f64 / total as f64 * 100.0
            },
        )
    }

    /// A gate over an arbitrary usage source (percent, 0-100)
    pub fn with_probe(
        threshold: Option<f64>,
        check_interval: Duration,
        max_wait: Duration,
        probe: impl FnMut() -> f64 + Send + 'static,
    ) -> Self {
        Self {
            threshold,
            check_interval,
            max_wait,
            sampler: Mutex::new(Sampler {
                probe: Box::new(probe),
                last: None,
                pressure_since: None,
                warned: false,
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold.is_some()
    }

    /// Current usage in percent, from cache when fresh enough
    pub fn usage_percent(&self) -> f64 {
        let mut sampler = self
            .sampler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        if let Some((taken, value)) = sampler.last {
            if now.duration_since(taken) < self.check_interval {
                return value;
            }
        }

        let value = (sampler.probe)();
        sampler.last = Some((now, value));
        value
    }

    /// Waits until usage is at or below the threshold, or the current
    /// pressure episode has lasted `max_wait`
    pub async fn wait_for_capacity(&self) {
        let Some(threshold) = self.threshold else {
            return;
        };

        loop {
            let usage = self.usage_percent();
            if self.admits(usage, threshold) {
                return;
            }

            tracing::debug!(
                "Memory usage {:.1}% above {:.1}%, holding admission",
                usage,
                threshold
            );
            tokio::time::sleep(self.check_interval).await;
        }
    }

    /// Updates the pressure episode with `usage` and decides admission
    fn admits(&self, usage: f64, threshold: f64) -> bool {
        let mut sampler = self
            .sampler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if usage <= threshold {
            if sampler.warned {
                tracing::info!("Memory usage back to {:.1}%, holding admission again under pressure", usage);
            }
            sampler.pressure_since = None;
            sampler.warned = false;
            return true;
        }

        let since = *sampler.pressure_since.get_or_insert_with(Instant::now);
        if since.elapsed() < self.max_wait {
            return false;
        }

        if !sampler.warned {
            sampler.warned = true;
            tracing::warn!(
                "Memory usage {:.1}% still above {:.1}% after {:?}, admitting until it drops",
                usage,
                threshold,
                self.max_wait
            );
        }
        true
    }
}

/// Bounds the number of units in flight
pub struct Scheduler {
    semaphore: Arc<Semaphore>,
    memory: MemoryGate,
    max_concurrent: usize,
}

impl Scheduler {
    /// Creates a new scheduler
    ///
    /// # Arguments
    ///
    /// * `max_concurrent` - Upper bound on units holding a permit at once
    /// * `memory` - Gate consulted after a permit is obtained
    pub fn new(max_concurrent: usize, memory: MemoryGate) -> Self {
        let max_concurrent = max_concurrent.max(1);

        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            memory,
            max_concurrent,
        }
    }

    pub fn from_config(crawler: &CrawlerConfig, memory: &MemoryConfig) -> Self {
        Self::new(crawler.max_concurrent, MemoryGate::from_config(memory))
    }

    /// Waits for a free slot and for memory headroom
    ///
    /// The returned permit is held for the lifetime of the unit; dropping it
    /// frees the slot. `None` means the scheduler was shut down.
    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        let permit = self.semaphore.clone().acquire_owned().await.ok()?;
        self.memory.wait_for_capacity().await;
        Some(permit)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Free slots right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}
