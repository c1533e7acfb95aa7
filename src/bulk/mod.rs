//! Generic batching + bounded-concurrency executor
//!
//! Processes arbitrary item lists in contiguous batches; within a batch,
//! items run in parallel chunks of `max_concurrency`. A chunk fully settles
//! before the next starts, so concurrency is bounded by chunking rather than
//! a counting primitive, trading some parallelism for strict, predictable
//! peak resource use.
//!
//! Failure policy is per-item isolation: a failing item is captured as
//! `{item, error}` and never aborts its batch or later batches. This is the
//! opposite contract from the safety layer's all-or-nothing ChangeSet.

use rayon::prelude::*;
use std::fmt::Display;
use std::time::{Duration, Instant};

/// Hard bounds on the adaptive batch size
const MIN_BATCH_SIZE: usize = 10;
const MAX_BATCH_SIZE: usize = 500;

/// Invoke the memory-pressure hint every this many batches
const MEMORY_HINT_INTERVAL: usize = 5;

/// Assumed item size when the caller has no better estimate
const DEFAULT_AVG_ITEM_SIZE: u64 = 8 * 1024;

/// Default memory budget for adaptive sizing (bytes)
const DEFAULT_MEMORY_BUDGET: u64 = 256 * 1024 * 1024;

/// Options for a bulk run
pub struct BulkOptions<'a> {
  /// Fixed batch size; None selects adaptive sizing
  pub batch_size: Option<usize>,

  /// Maximum items in flight at once (chunk width)
  pub max_concurrency: usize,

  /// Memory budget for adaptive sizing (bytes)
  pub memory_budget: u64,

  /// Average item size estimate for adaptive sizing (bytes)
  pub avg_item_size: Option<u64>,

  /// Called once per completed batch: (processed, total, batch_index, total_batches)
  pub progress: Option<&'a (dyn Fn(usize, usize, usize, usize) + Sync)>,

  /// Best-effort memory-reclaim hint, invoked every few batches.
  /// Injectable so environments without a useful hint simply pass None.
  pub memory_pressure: Option<&'a (dyn Fn() + Sync)>,
}

impl Default for BulkOptions<'_> {
  fn default() -> Self {
    Self {
      batch_size: None,
      max_concurrency: 4,
      memory_budget: DEFAULT_MEMORY_BUDGET,
      avg_item_size: None,
      progress: None,
      memory_pressure: None,
    }
  }
}

/// A captured per-item failure
#[derive(Debug)]
pub struct BulkFailure<T> {
  pub item: T,
  pub error: String,
}

/// Outcome of a bulk run
#[derive(Debug)]
pub struct BulkReport<T, R> {
  /// Successful results, in item order
  pub results: Vec<R>,
  /// Captured per-item failures
  pub errors: Vec<BulkFailure<T>>,
  /// Items attempted (success + failure)
  pub processed: usize,
  pub total: usize,
  pub duration: Duration,
}

/// Compute an adaptive batch size: bounds peak memory via the budget while
/// avoiding excessive batch counts for huge inputs.
///
/// `clamp(min(memory_budget / (2 * avg_item_size), max(50, total / 10)), 10, 500)`
pub fn adaptive_batch_size(total_items: usize, avg_item_size: u64, memory_budget: u64) -> usize {
  let by_memory = memory_budget / (2 * avg_item_size.max(1));
  let by_count = (total_items / 10).max(50) as u64;
  by_memory.min(by_count).clamp(MIN_BATCH_SIZE as u64, MAX_BATCH_SIZE as u64) as usize
}

/// Process `items` with bounded parallelism and per-item failure isolation.
pub fn process_bulk<T, R, E, F>(items: &[T], processor: F, options: &BulkOptions) -> BulkReport<T, R>
where
  T: Clone + Send + Sync,
  R: Send,
  E: Display + Send,
  F: Fn(&T) -> Result<R, E> + Sync,
{
  let started = Instant::now();
  let total = items.len();

  let batch_size = options.batch_size.unwrap_or_else(|| {
    adaptive_batch_size(
      total,
      options.avg_item_size.unwrap_or(DEFAULT_AVG_ITEM_SIZE),
      options.memory_budget,
    )
  });
  let batch_size = batch_size.max(1);
  let max_concurrency = options.max_concurrency.max(1);
  let total_batches = total.div_ceil(batch_size);

  let mut results = Vec::new();
  let mut errors = Vec::new();
  let mut processed = 0usize;

  for (batch_index, batch) in items.chunks(batch_size).enumerate() {
    for chunk in batch.chunks(max_concurrency) {
      // The whole chunk settles here before the next chunk starts
      let outcomes: Vec<Result<R, E>> = chunk.par_iter().map(|item| processor(item)).collect();

      for (item, outcome) in chunk.iter().zip(outcomes) {
        match outcome {
          Ok(result) => results.push(result),
          Err(err) => errors.push(BulkFailure {
            item: item.clone(),
            error: err.to_string(),
          }),
        }
      }
    }

    processed += batch.len();

    if let Some(progress) = options.progress {
      progress(processed, total, batch_index, total_batches);
    }

    if (batch_index + 1) % MEMORY_HINT_INTERVAL == 0
      && let Some(hint) = options.memory_pressure
    {
      hint();
    }
  }

  BulkReport {
    results,
    errors,
    processed,
    total,
    duration: started.elapsed(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::Mutex;
  use std::sync::atomic::{AtomicUsize, Ordering};

  #[test]
  fn test_adaptive_batch_size_bounds() {
    // Memory-constrained: 1 MiB budget, 64 KiB items -> 8, clamped up to 10
    assert_eq!(adaptive_batch_size(10_000, 64 * 1024, 1024 * 1024), 10);
    // Generous budget: count term wins, clamped to 500
    assert_eq!(adaptive_batch_size(100_000, 1, u64::MAX), 500);
    // Small input: max(50, 3) = 50 vs huge memory term
    assert_eq!(adaptive_batch_size(30, 1024, DEFAULT_MEMORY_BUDGET), 50);
  }

  #[test]
  fn test_single_failure_does_not_abort() {
    let items: Vec<usize> = (0..1000).collect();
    let batches_seen = AtomicUsize::new(0);
    let progress = |_p: usize, _t: usize, _i: usize, _n: usize| {
      batches_seen.fetch_add(1, Ordering::SeqCst);
    };

    let options = BulkOptions {
      batch_size: Some(100),
      progress: Some(&progress),
      ..BulkOptions::default()
    };

    let report = process_bulk(
      &items,
      |item| {
        if *item == 437 {
          Err("intentional failure")
        } else {
          Ok(*item * 2)
        }
      },
      &options,
    );

    assert_eq!(report.results.len(), 999);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].item, 437);
    assert_eq!(report.processed, 1000);
    assert_eq!(batches_seen.load(Ordering::SeqCst), 10);
  }

  #[test]
  fn test_concurrency_bound_holds() {
    let items: Vec<usize> = (0..60).collect();
    let in_flight = AtomicUsize::new(0);
    let peak = AtomicUsize::new(0);

    let options = BulkOptions {
      batch_size: Some(20),
      max_concurrency: 3,
      ..BulkOptions::default()
    };

    let report = process_bulk(
      &items,
      |item| -> Result<usize, String> {
        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(2));
        in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(*item)
      },
      &options,
    );

    assert_eq!(report.results.len(), 60);
    assert!(
      peak.load(Ordering::SeqCst) <= 3,
      "peak in-flight {} exceeded max_concurrency",
      peak.load(Ordering::SeqCst)
    );
  }

  #[test]
  fn test_progress_reports_per_batch() {
    let items: Vec<u8> = vec![0; 25];
    let calls = Mutex::new(Vec::new());
    let progress = |processed: usize, total: usize, batch_index: usize, total_batches: usize| {
      calls.lock().unwrap().push((processed, total, batch_index, total_batches));
    };

    let options = BulkOptions {
      batch_size: Some(10),
      progress: Some(&progress),
      ..BulkOptions::default()
    };

    process_bulk(&items, |_| Ok::<_, String>(()), &options);

    let calls = calls.into_inner().unwrap();
    assert_eq!(calls, vec![(10, 25, 0, 3), (20, 25, 1, 3), (25, 25, 2, 3)]);
  }

  #[test]
  fn test_memory_hint_every_fifth_batch() {
    let items: Vec<u8> = vec![0; 120];
    let hints = AtomicUsize::new(0);
    let hint = || {
      hints.fetch_add(1, Ordering::SeqCst);
    };

    let options = BulkOptions {
      batch_size: Some(10),
      memory_pressure: Some(&hint),
      ..BulkOptions::default()
    };

    process_bulk(&items, |_| Ok::<_, String>(()), &options);

    // 12 batches -> hints after batches 5 and 10
    assert_eq!(hints.load(Ordering::SeqCst), 2);
  }

  #[test]
  fn test_empty_input() {
    let items: Vec<u8> = Vec::new();
    let report = process_bulk(&items, |_| Ok::<_, String>(()), &BulkOptions::default());
    assert_eq!(report.total, 0);
    assert_eq!(report.processed, 0);
    assert!(report.results.is_empty());
  }
}
