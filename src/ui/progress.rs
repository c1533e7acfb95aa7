//! Progress tracking for long-running analysis runs
//!
//! `ProgressTracker` computes rate, ETA, and memory telemetry from periodic
//! update calls and throttles emissions to at most one per second. Rendering
//! is separate: commands draw with `linya` bars, the tracker stays UI-free.

use linya::{Bar, Progress};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling window length for the rate average
const RATE_WINDOW: usize = 10;

/// Minimum interval between emitted snapshots
const EMIT_INTERVAL: Duration = Duration::from_secs(1);

/// A point-in-time view of a run's progress. Recomputed per update, never
/// persisted.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
  pub current: usize,
  pub total: usize,
  pub batch_index: usize,
  pub total_batches: usize,
  /// Rolling average processing rate (items/sec)
  pub rate: f64,
  /// Estimated time remaining
  pub eta: Option<Duration>,
  /// Resident memory (bytes), best-effort
  pub memory_bytes: Option<u64>,
}

impl ProgressSnapshot {
  /// Percent complete (0-100)
  pub fn percent(&self) -> f64 {
    if self.total == 0 {
      100.0
    } else {
      self.current as f64 / self.total as f64 * 100.0
    }
  }
}

/// Computes rate/ETA/memory telemetry from periodic updates.
pub struct ProgressTracker {
  total: usize,
  samples: VecDeque<(Instant, usize)>,
  last_emit: Option<Instant>,
}

impl ProgressTracker {
  pub fn new(total: usize) -> Self {
    let mut samples = VecDeque::with_capacity(RATE_WINDOW + 1);
    samples.push_back((Instant::now(), 0));
    Self {
      total,
      samples,
      last_emit: None,
    }
  }

  /// Record progress. Returns a snapshot when enough time has passed since
  /// the last emission (throttled to <=1/sec); the first and final updates
  /// always emit.
  pub fn update(&mut self, current: usize, batch_index: usize, total_batches: usize) -> Option<ProgressSnapshot> {
    let now = Instant::now();

    self.samples.push_back((now, current));
    while self.samples.len() > RATE_WINDOW {
      self.samples.pop_front();
    }

    let finished = current >= self.total;
    let due = match self.last_emit {
      None => true,
      Some(last) => now.duration_since(last) >= EMIT_INTERVAL,
    };

    if !due && !finished {
      return None;
    }
    self.last_emit = Some(now);

    let rate = self.rolling_rate();
    let remaining = self.total.saturating_sub(current);
    let eta = if rate > 0.0 {
      Some(Duration::from_secs_f64(remaining as f64 / rate))
    } else {
      None
    };

    Some(ProgressSnapshot {
      current,
      total: self.total,
      batch_index,
      total_batches,
      rate,
      eta,
      memory_bytes: resident_memory(),
    })
  }

  fn rolling_rate(&self) -> f64 {
    let (oldest_at, oldest) = match self.samples.front() {
      Some(s) => *s,
      None => return 0.0,
    };
    let (newest_at, newest) = match self.samples.back() {
      Some(s) => *s,
      None => return 0.0,
    };

    let elapsed = newest_at.duration_since(oldest_at).as_secs_f64();
    if elapsed <= 0.0 {
      return 0.0;
    }
    (newest.saturating_sub(oldest)) as f64 / elapsed
  }
}

/// Resident set size in bytes, read from /proc/self/statm. Returns None on
/// platforms without procfs.
#[cfg(target_os = "linux")]
fn resident_memory() -> Option<u64> {
  let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
  let resident_pages: u64 = statm.split_whitespace().nth(1)?.parse().ok()?;
  Some(resident_pages * 4096)
}

#[cfg(not(target_os = "linux"))]
fn resident_memory() -> Option<u64> {
  None
}

/// Progress bar wrapper for file analysis
pub struct AnalysisProgress {
  progress: Progress,
  bar: Bar,
}

impl AnalysisProgress {
  /// Create a new progress bar for analyzing files
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self { progress, bar }
  }

  /// Set progress to a specific value
  pub fn set(&mut self, pos: usize) {
    self.progress.set_and_draw(&self.bar, pos);
  }

  /// Increment progress by 1
  #[allow(dead_code)]
  pub fn inc(&mut self) {
    self.progress.inc_and_draw(&self.bar, 1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_first_update_emits() {
    let mut tracker = ProgressTracker::new(100);
    let snapshot = tracker.update(10, 0, 10);
    assert!(snapshot.is_some());
    let snapshot = snapshot.unwrap();
    assert_eq!(snapshot.current, 10);
    assert_eq!(snapshot.total, 100);
    assert!((snapshot.percent() - 10.0).abs() < f64::EPSILON);
  }

  #[test]
  fn test_throttles_rapid_updates() {
    let mut tracker = ProgressTracker::new(100);
    assert!(tracker.update(10, 0, 10).is_some());
    // Immediately after an emission: suppressed
    assert!(tracker.update(20, 1, 10).is_none());
    assert!(tracker.update(30, 2, 10).is_none());
  }

  #[test]
  fn test_final_update_always_emits() {
    let mut tracker = ProgressTracker::new(100);
    assert!(tracker.update(10, 0, 10).is_some());
    assert!(tracker.update(50, 4, 10).is_none());
    let last = tracker.update(100, 9, 10);
    assert!(last.is_some());
    assert_eq!(last.unwrap().current, 100);
  }

  #[test]
  fn test_rate_and_eta_computed() {
    let mut tracker = ProgressTracker::new(1000);
    tracker.update(100, 0, 10);
    std::thread::sleep(Duration::from_millis(20));
    // Force an emission by finishing
    let snapshot = tracker.update(1000, 9, 10).unwrap();
    assert!(snapshot.rate > 0.0);
    // Finished run: nothing remaining
    assert_eq!(snapshot.eta.unwrap(), Duration::from_secs(0));
  }

  #[test]
  fn test_empty_total_percent() {
    let tracker = ProgressTracker::new(0);
    drop(tracker);
    let snapshot = ProgressSnapshot {
      current: 0,
      total: 0,
      batch_index: 0,
      total_batches: 0,
      rate: 0.0,
      eta: None,
      memory_bytes: None,
    };
    assert!((snapshot.percent() - 100.0).abs() < f64::EPSILON);
  }
}
