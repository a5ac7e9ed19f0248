// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Category session state machine with typed state transitions.
//!
//! Idle → Running(i) → PlanningConcurrency → Trialing ⇄ Aggregating → Running(i+1)
//! … → Complete | PartialFailure | Aborted.
//! Invalid transitions result in StateTransitionError.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::StateTransitionError;
use crate::types::Category;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Category not started yet.
    Idle,

    /// About to measure the workload at this index.
    Running(usize),

    /// Deriving the concurrency plan for the current workload.
    PlanningConcurrency,

    /// Trials for one unit count are executing.
    Trialing,

    /// Trials for one unit count are being summarized.
    Aggregating,

    /// Every workload ran and none failed.
    Complete,

    /// Some workloads failed or were skipped.
    PartialFailure,

    /// Every workload failed.
    Aborted,
}

impl SessionState {
    /// Get the state name for error messages.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running(_) => "Running",
            Self::PlanningConcurrency => "PlanningConcurrency",
            Self::Trialing => "Trialing",
            Self::Aggregating => "Aggregating",
            Self::Complete => "Complete",
            Self::PartialFailure => "PartialFailure",
            Self::Aborted => "Aborted",
        }
    }

    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::PartialFailure | Self::Aborted)
    }

    /// Check if transition to the target state is valid.
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        match (*self, target) {
            // From Idle
            (Self::Idle, Self::Running(0)) => true,
            // From Running
            (Self::Running(_), Self::PlanningConcurrency) => true,
            // From PlanningConcurrency
            (Self::PlanningConcurrency, Self::Trialing) => true,
            // From Trialing
            (Self::Trialing, Self::Aggregating) => true,
            // From Aggregating (next unit count)
            (Self::Aggregating, Self::Trialing) => true,
            // Finishing: between workloads, after the last summary, or on category expiry
            (Self::Idle | Self::Running(_) | Self::Trialing | Self::Aggregating, t)
                if t.is_terminal() =>
            {
                true
            }
            _ => false,
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running(index) => write!(f, "Running({})", index),
            other => f.write_str(other.name()),
        }
    }
}

/// State machine for one category session.
#[derive(Debug)]
pub struct SessionStateMachine {
    category: Category,
    current_state: SessionState,
    workload_index: Option<usize>,
    started: Instant,
    transition_count: u64,
}

impl SessionStateMachine {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            current_state: SessionState::Idle,
            workload_index: None,
            started: Instant::now(),
            transition_count: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.current_state
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Index of the workload currently being measured.
    pub fn workload_index(&self) -> Option<usize> {
        self.workload_index
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Move on to the next workload. Valid from Idle, PlanningConcurrency,
    /// Trialing and Aggregating; the index always advances by one.
    pub fn advance(&mut self) -> Result<usize, StateTransitionError> {
        let next = self.workload_index.map_or(0, |i| i + 1);
        let allowed = match self.current_state {
            SessionState::Idle => next == 0,
            SessionState::PlanningConcurrency
            | SessionState::Trialing
            | SessionState::Aggregating => true,
            _ => false,
        };
        if !allowed {
            return Err(self.invalid(SessionState::Running(next)));
        }
        self.enter(SessionState::Running(next));
        self.workload_index = Some(next);
        Ok(next)
    }

    /// Attempt to transition to a new state.
    pub fn transition_to(&mut self, target: SessionState) -> Result<(), StateTransitionError> {
        if self.current_state.is_terminal() {
            return Err(StateTransitionError::TerminalState {
                category: self.category,
                state: self.current_state.name(),
            });
        }

        if let SessionState::Running(_) = target {
            return self.advance().map(|_| ());
        }

        if !self.current_state.can_transition_to(target) {
            return Err(self.invalid(target));
        }

        self.enter(target);
        Ok(())
    }

    fn enter(&mut self, target: SessionState) {
        tracing::debug!(
            category = %self.category,
            from = %self.current_state,
            to = %target,
            "Session transition"
        );
        self.current_state = target;
        self.transition_count += 1;
    }

    fn invalid(&self, target: SessionState) -> StateTransitionError {
        StateTransitionError::InvalidTransition {
            category: self.category,
            from: self.current_state.name(),
            to: target.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let sm = SessionStateMachine::new(Category::Cpu);
        assert_eq!(sm.state(), SessionState::Idle);
        assert_eq!(sm.transition_count(), 0);
        assert_eq!(sm.workload_index(), None);
    }

    #[test]
    fn test_full_workload_cycle() {
        let mut sm = SessionStateMachine::new(Category::Disk);

        assert_eq!(sm.advance().unwrap(), 0);
        sm.transition_to(SessionState::PlanningConcurrency).unwrap();
        sm.transition_to(SessionState::Trialing).unwrap();
        sm.transition_to(SessionState::Aggregating).unwrap();
        // Second unit count
        sm.transition_to(SessionState::Trialing).unwrap();
        sm.transition_to(SessionState::Aggregating).unwrap();

        assert_eq!(sm.advance().unwrap(), 1);
        assert_eq!(sm.state(), SessionState::Running(1));
        sm.transition_to(SessionState::Complete).unwrap();
        assert!(sm.state().is_terminal());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut sm = SessionStateMachine::new(Category::Ram);

        // Idle → Trialing (invalid)
        assert!(sm.transition_to(SessionState::Trialing).is_err());
        assert_eq!(sm.state(), SessionState::Idle);

        sm.advance().unwrap();
        // Running → Aggregating (invalid)
        assert!(sm.transition_to(SessionState::Aggregating).is_err());
        // Running → Running (index must come from PlanningConcurrency or later)
        assert!(sm.advance().is_err());
    }

    #[test]
    fn test_terminal_is_final() {
        let mut sm = SessionStateMachine::new(Category::Network);
        sm.transition_to(SessionState::Complete).unwrap();
        let err = sm.transition_to(SessionState::Running(0)).unwrap_err();
        assert!(matches!(err, StateTransitionError::TerminalState { .. }));
    }

    #[test]
    fn test_trialing_can_skip_to_next_workload() {
        let mut sm = SessionStateMachine::new(Category::Cpu);
        sm.advance().unwrap();
        sm.transition_to(SessionState::PlanningConcurrency).unwrap();
        sm.transition_to(SessionState::Trialing).unwrap();
        assert_eq!(sm.advance().unwrap(), 1);
        sm.transition_to(SessionState::PartialFailure).unwrap();
    }

    #[test]
    fn test_category_expiry_finishes_from_trialing() {
        let mut sm = SessionStateMachine::new(Category::Disk);
        sm.advance().unwrap();
        sm.transition_to(SessionState::PlanningConcurrency).unwrap();
        sm.transition_to(SessionState::Trialing).unwrap();
        sm.transition_to(SessionState::PartialFailure).unwrap();
        assert_eq!(sm.state(), SessionState::PartialFailure);
    }
}
