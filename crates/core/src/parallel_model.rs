// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel speedup models for [`crate::action::ActionKind::Compute`].

use std::sync::Arc;

/// Pure function `(total_work, num_threads) -> (sequential_work, per_thread_parallel_work)`.
///
/// `sequential_work` is the portion of `total_work` that must run on a
/// single thread regardless of `num_threads`; the remainder is split evenly
/// across `num_threads` threads, each doing `per_thread_parallel_work`.
#[derive(Clone)]
pub enum ParallelModel {
    /// Amdahl's law with parallelizable fraction `alpha` in `[0, 1]`.
    Amdahl(f64),
    /// A fixed per-thread efficiency `efficiency` in `(0, 1]`: makespan
    /// scales as `total_work / (num_threads * efficiency)`.
    ConstantEfficiency(f64),
    /// User-supplied `(sequential_fn, parallel_fn)` pair.
    Custom(Arc<dyn Fn(f64, u32) -> f64 + Send + Sync>, Arc<dyn Fn(f64, u32) -> f64 + Send + Sync>),
}

impl std::fmt::Debug for ParallelModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParallelModel::Amdahl(alpha) => f.debug_tuple("Amdahl").field(alpha).finish(),
            ParallelModel::ConstantEfficiency(e) => {
                f.debug_tuple("ConstantEfficiency").field(e).finish()
            }
            ParallelModel::Custom(..) => f.write_str("Custom(..)"),
        }
    }
}

impl ParallelModel {
    /// Returns `(sequential_work, per_thread_parallel_work)` for the given
    /// total amount of work split across `num_threads` threads.
    pub fn apply(&self, total_work: f64, num_threads: u32) -> (f64, f64) {
        let threads = num_threads.max(1) as f64;
        match self {
            ParallelModel::Amdahl(alpha) => {
                let alpha = alpha.clamp(0.0, 1.0);
                let sequential = (1.0 - alpha) * total_work;
                let parallel_total = alpha * total_work;
                (sequential, parallel_total / threads)
            }
            ParallelModel::ConstantEfficiency(efficiency) => {
                let efficiency = efficiency.max(f64::MIN_POSITIVE);
                (0.0, total_work / (threads * efficiency))
            }
            ParallelModel::Custom(sequential_fn, parallel_fn) => {
                (sequential_fn(total_work, num_threads), parallel_fn(total_work, num_threads))
            }
        }
    }

    /// Total makespan if the sequential part and the parallel part run
    /// back to back, which is how the executor actually schedules a
    /// Compute action's single-threaded "sleep" fast path.
    pub fn makespan(&self, total_work: f64, num_threads: u32) -> f64 {
        let (sequential, per_thread_parallel) = self.apply(total_work, num_threads);
        sequential + per_thread_parallel
    }
}

#[cfg(test)]
#[path = "parallel_model_tests.rs"]
mod tests;
