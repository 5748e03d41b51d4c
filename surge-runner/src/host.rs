//! Load-generator host utilisation, sampled into the degradation buckets so
//! a saturated harness can be told apart from a saturated target.

use std::sync::Arc;
use std::time::{Duration, Instant};
use surge_core::DegradationTracker;
use sysinfo::System;
use tokio::task::JoinHandle;
use tracing::debug;

const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Current host CPU and memory utilisation, in percent
#[derive(Debug)]
pub struct HostProbe {
    system: System,
}

impl HostProbe {
    pub fn new() -> Self {
        let mut system = System::new();
        // CPU usage is a delta; prime the first reading
        system.refresh_cpu_usage();
        Self { system }
    }

    pub fn sample(&mut self) -> (f64, f64) {
        self.system.refresh_cpu_usage();
        self.system.refresh_memory();

        let cpu = self.system.global_cpu_usage() as f64;
        let total = self.system.total_memory();
        let memory = if total == 0 {
            0.0
        } else {
            self.system.used_memory() as f64 / total as f64 * 100.0
        };
        (cpu, memory)
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Sample the host every `every` until the returned task is aborted
pub fn spawn_sampler(tracker: Arc<DegradationTracker>, started_at: Instant, every: Duration) -> JoinHandle<()> {
    let every = every.max(MIN_INTERVAL);
    tokio::spawn(async move {
        let mut probe = HostProbe::new();
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick fires immediately and would see no CPU delta
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let (cpu, memory) = probe.sample();
            debug!(cpu, memory, "Harness host sample");
            tracker.record_host(started_at.elapsed(), cpu, memory);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_percent_range() {
        let mut probe = HostProbe::new();
        let (cpu, memory) = probe.sample();
        assert!(cpu >= 0.0);
        assert!((0.0..=100.0).contains(&memory));
    }
}
