//! Host-driven timers.
//!
//! Nothing here spawns tasks or sleeps. The host passes the current
//! `Instant` in, so timers are plain values that die with their owner and
//! tests can step time explicitly.

use std::time::{Duration, Instant};

/// Fires once, `delay` after the most recent `arm`.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)start the delay from `now`, dropping any earlier deadline.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True exactly once per arm, at or after the deadline.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Whole-second countdown.
///
/// Hosts with a steady one-second clock call `tick`; hosts that wake up
/// irregularly call `catch_up` with wall-clock time instead.
#[derive(Debug, Clone)]
pub struct Countdown {
    total: u32,
    remaining: u32,
    anchor: Option<Instant>,
}

impl Countdown {
    pub fn new(total_secs: u32) -> Self {
        Self {
            total: total_secs,
            remaining: total_secs,
            anchor: None,
        }
    }

    /// Start counting from `now`.
    pub fn started_at(total_secs: u32, now: Instant) -> Self {
        Self {
            anchor: Some(now),
            ..Self::new(total_secs)
        }
    }

    pub fn tick(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Apply every whole second elapsed since the last catch-up.
    pub fn catch_up(&mut self, now: Instant) {
        let Some(anchor) = self.anchor else {
            self.anchor = Some(now);
            return;
        };
        let elapsed = now.saturating_duration_since(anchor).as_secs();
        if elapsed == 0 {
            return;
        }
        let steps = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.remaining = self.remaining.saturating_sub(steps);
        self.anchor = Some(anchor + Duration::from_secs(elapsed));
    }

    pub fn reset(&mut self, now: Instant) {
        self.remaining = self.total;
        self.anchor = Some(now);
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}
