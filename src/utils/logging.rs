use log::{Level, log_enabled};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Simple scoped timer for profiling expensive symbolic passes.
pub struct ScopedTimer<'a> {
    label: &'a str,
    start: Instant,
}

impl<'a> ScopedTimer<'a> {
    pub fn new(label: &'a str) -> Self {
        if log_enabled!(Level::Trace) {
            log::trace!("start {label}");
        }
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for ScopedTimer<'a> {
    fn drop(&mut self) {
        if log_enabled!(Level::Trace) {
            let elapsed = self.start.elapsed();
            log::trace!("end {} ({} µs)", self.label, elapsed.as_micros());
        }
    }
}

/// Counts state-derivative evaluations and reports simulated time every
/// `interval` calls. An interval of zero keeps it silent.
#[derive(Debug)]
pub struct ProgressLog {
    interval: u64,
    calls: AtomicU64,
}

impl ProgressLog {
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            calls: AtomicU64::new(0),
        }
    }

    pub fn tick(&self, time: f64) {
        let call = self.calls.fetch_add(1, Ordering::Relaxed);
        if self.interval > 0 && call % self.interval == 0 {
            log::debug!("t = {time:.6} (evaluation {call})");
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }
}

impl Clone for ProgressLog {
    fn clone(&self) -> Self {
        Self {
            interval: self.interval,
            calls: AtomicU64::new(self.calls()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_counts_every_call() {
        let progress = ProgressLog::new(3);
        for step in 0..7 {
            progress.tick(step as f64 * 0.1);
        }
        assert_eq!(progress.calls(), 7);
        assert_eq!(progress.clone().calls(), 7);
    }

    #[test]
    fn zero_interval_still_counts() {
        let progress = ProgressLog::new(0);
        progress.tick(0.0);
        assert_eq!(progress.calls(), 1);
    }
}
