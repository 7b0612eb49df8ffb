// ── Adaptive poll state machine ──
//
// Pure countdown logic, kept free of timers so every transition rule is
// testable without time. The bridge's poll task owns the actual sleeps
// and feeds cycle outcomes back in.

use std::time::Duration;

use crate::config::PollConfig;

/// Which cadence the next armed timer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum IntervalClass {
    Short,
    Long,
}

/// Countdown state driving SHORT/LONG interval selection.
///
/// `count` climbs from 0 toward `budget`; while below budget each armed
/// tick is SHORT, at budget the system settles on LONG. Activity resets
/// the climb, a failed cycle buys exactly one SHORT retry.
#[derive(Debug)]
pub struct PollState {
    budget: u32,
    count: u32,
    pending: bool,
}

impl PollState {
    /// Starts settled at LONG; the caller runs an explicit first cycle
    /// before arming the timer.
    pub fn new(budget: u32) -> Self {
        Self {
            budget: budget.max(1),
            count: budget.max(1),
            pending: false,
        }
    }

    /// Pick the cadence for the next tick, consuming one SHORT credit
    /// if any remain.
    pub fn next_interval(&mut self) -> IntervalClass {
        if self.count < self.budget {
            self.count += 1;
            IntervalClass::Short
        } else {
            IntervalClass::Long
        }
    }

    /// A bolt transition or a dispatched command was observed: grant a
    /// full SHORT budget.
    pub fn record_activity(&mut self) {
        self.count = 0;
    }

    /// A fetch cycle failed: grant exactly one SHORT retry, then settle
    /// back toward LONG unless the retry finds activity.
    pub fn record_failure(&mut self) {
        self.count = self.budget - 1;
    }

    /// Try to start a cycle. Returns `false` if one is already in
    /// flight; overlapping ticks are dropped, never queued.
    pub fn begin_cycle(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn end_cycle(&mut self) {
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }
}

/// Concrete sleep duration for an interval class.
pub fn interval_duration(class: IntervalClass, config: &PollConfig) -> Duration {
    match class {
        IntervalClass::Short => Duration::from_secs(config.short_interval_secs),
        IntervalClass::Long => Duration::from_secs(config.long_interval_secs),
    }
}
