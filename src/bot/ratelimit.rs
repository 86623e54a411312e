//! Per-user cooldown with a violation threshold.
//!
//! State lives in memory only, keyed by user id; a restart forgets
//! everything. No eviction: the map grows with the set of users seen.

use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Outside the cooldown window; proceed with the AI call.
    Allowed,
    /// Inside the window, below (or past) the notice threshold; the
    /// message is still logged, only the AI call is skipped.
    Silent,
    /// Violations just reached the threshold; send one throttle notice.
    Notify,
}

struct RateState {
    last_call_millis: i64,
    violations: u32,
}

pub struct RateLimiter {
    cooldown_millis: i64,
    threshold: u32,
    states: HashMap<i64, RateState>,
}

impl RateLimiter {
    pub fn new(cooldown: Duration, threshold: u32) -> Self {
        Self {
            cooldown_millis: cooldown.as_millis() as i64,
            threshold,
            states: HashMap::new(),
        }
    }

    /// Record a call from `user_id` at `now_millis` and judge it.
    /// The window is fixed from the last allowed call; violations inside
    /// it do not extend it.
    pub fn check(&mut self, user_id: i64, now_millis: i64) -> Verdict {
        if let Some(state) = self.states.get_mut(&user_id)
            && now_millis - state.last_call_millis < self.cooldown_millis
        {
            state.violations += 1;
            return if state.violations == self.threshold {
                Verdict::Notify
            } else {
                Verdict::Silent
            };
        }

        self.states.insert(
            user_id,
            RateState { last_call_millis: now_millis, violations: 0 },
        );
        Verdict::Allowed
    }
}
