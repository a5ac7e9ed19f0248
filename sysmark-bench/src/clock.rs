// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Monotonic clock helpers.
//!
//! Every interval in the harness is measured with `Instant`; wall-clock time
//! only appears in report timestamps.

use std::time::{Duration, Instant};

/// Timer for measuring one interval.
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn started_at(&self) -> Instant {
        self.start
    }

    /// Elapsed time so far, without stopping.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return elapsed seconds.
    pub fn stop(self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

/// Which limit a deadline came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineSource {
    /// The per-trial timeout.
    Trial,
    /// The category's total wall-time budget.
    Category,
}

/// The earlier of a per-trial timeout and an optional category deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    source: DeadlineSource,
}

impl Deadline {
    /// Deadline `timeout` from now, capped by `category` if that comes first.
    pub fn earliest(timeout: Duration, category: Option<Instant>) -> Self {
        let trial_at = Instant::now() + timeout;
        match category {
            Some(cat_at) if cat_at <= trial_at => Self {
                at: cat_at,
                source: DeadlineSource::Category,
            },
            _ => Self {
                at: trial_at,
                source: DeadlineSource::Trial,
            },
        }
    }

    pub fn at(&self) -> Instant {
        self.at
    }

    pub fn source(&self) -> DeadlineSource {
        self.source
    }

    /// Time left, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn expired(&self) -> bool {
        Instant::now() >= self.at
    }
}
