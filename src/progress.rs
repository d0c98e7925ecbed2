//! Progress reporting for batch verification.
//!
//! Progress bars are drawn on stderr unless log-only mode is on, in which
//! case periodic one-line updates are logged instead so output stays
//! readable with `tail -f`.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Global flag for log-only mode (set from args in main)
pub static LOG_ONLY: AtomicBool = AtomicBool::new(false);

pub fn set_log_only(value: bool) {
    LOG_ONLY.store(value, Ordering::Relaxed);
}

pub fn is_log_only() -> bool {
    LOG_ONLY.load(Ordering::Relaxed)
}

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.1}m", secs / 60.0)
    }
}

/// Progress bar for `len` verification jobs; hidden in log-only mode.
pub fn create_progress_bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if is_log_only() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else {
        let style = ProgressStyle::default_bar()
            .template("{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb
}

/// Finished-job counter shared by parallel workers. Each `tick` returns a
/// distinct count, so every progress checkpoint is logged exactly once.
#[derive(Debug, Default)]
pub struct JobCounter(AtomicU64);

impl JobCounter {
    /// Record one finished job and return the new total.
    pub fn tick(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Whether a log line is due at `current` of `total`.
pub fn progress_due(current: u64, total: u64, interval: u64) -> bool {
    interval > 0 && (current % interval == 0 || current == total)
}

/// Log progress every `interval` jobs, only in log-only mode.
pub fn log_progress(phase: &str, current: u64, total: u64, interval: u64) {
    if is_log_only() && total > 0 && progress_due(current, total, interval) {
        let pct = 100.0 * current as f64 / total as f64;
        tracing::info!("[{}] {}/{} ({:.1}%)", phase, current, total, pct);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1.5m");
    }

    #[test]
    fn test_job_counter_parallel_ticks_are_distinct() {
        use rayon::prelude::*;

        let counter = JobCounter::default();
        let mut seen: Vec<u64> = (0..1000).into_par_iter().map(|_| counter.tick()).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=1000).collect::<Vec<u64>>());

        let due = seen.iter().filter(|&&n| progress_due(n, 1000, 100)).count();
        assert_eq!(due, 10);
    }

    #[test]
    fn test_progress_due() {
        assert!(progress_due(100, 250, 100));
        assert!(progress_due(250, 250, 100));
        assert!(!progress_due(101, 250, 100));
        assert!(!progress_due(5, 10, 0));
    }
}
