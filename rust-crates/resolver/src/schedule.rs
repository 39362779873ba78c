//! Attempt budgets and backoff of the polling and verify strategies.

use crate::config::{
    PollPolicy,
    VerifyPolicy,
};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptResult {
    /// The receipt was missing or carried no outcome.
    Empty,
    FetchError,
}

#[derive(Clone, Debug)]
pub struct PollSchedule {
    policy: PollPolicy,
    degraded: bool,
    attempts: u32,
}

impl PollSchedule {
    pub fn new(policy: &PollPolicy, degraded: bool) -> Self {
        Self {
            policy: policy.clone(),
            degraded,
            attempts: 0,
        }
    }

    pub fn base(&self) -> Duration {
        self.policy.base(self.degraded)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Switches to the degraded base. Attempts already made still count.
    pub fn degrade(&mut self) {
        self.degraded = true;
    }

    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Delay until the next attempt, `None` once the budget is spent.
    pub fn next_delay(&self, result: AttemptResult) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }
        let step = match result {
            AttemptResult::Empty => self.policy.empty_step_ms,
            AttemptResult::FetchError => self.policy.error_step_ms,
        };
        Some(self.base() + Duration::from_millis(step) * self.attempts)
    }
}

/// One bounded run of receipt verification.
#[derive(Clone, Debug)]
pub struct VerifyRun {
    policy: VerifyPolicy,
    attempts: u32,
    terminal: bool,
}

impl VerifyRun {
    pub fn new(policy: &VerifyPolicy, terminal: bool) -> Self {
        Self {
            policy: policy.clone(),
            attempts: 0,
            terminal,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// A terminal run ends the resolution when it finds nothing.
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn mark_terminal(&mut self) {
        self.terminal = true;
    }

    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    pub fn next_delay(&self, result: AttemptResult) -> Option<Duration> {
        if self.attempts >= self.policy.max_attempts {
            return None;
        }
        let base = match result {
            AttemptResult::Empty => self.policy.empty_retry_ms,
            AttemptResult::FetchError => self.policy.error_retry_ms,
        };
        let step = self.policy.retry_step_ms * u64::from(self.attempts);
        Some(Duration::from_millis(base + step))
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn next_delay__grows_by_half_a_second_per_empty_attempt() {
        // given
        let mut schedule = PollSchedule::new(&PollPolicy::default(), false);

        // when
        let mut delays = Vec::new();
        while !schedule.is_exhausted() {
            schedule.begin_attempt();
            delays.extend(schedule.next_delay(AttemptResult::Empty));
        }

        // then
        let expected: Vec<_> = (1..10).map(|n| ms(3_000 + n * 500)).collect();
        assert_eq!(delays, expected);
        assert_eq!(schedule.attempts(), 10);
        assert_eq!(schedule.next_delay(AttemptResult::Empty), None);
    }

    #[test]
    fn next_delay__grows_by_a_second_after_errors() {
        let mut schedule = PollSchedule::new(&PollPolicy::default(), true);

        schedule.begin_attempt();
        schedule.begin_attempt();

        assert_eq!(schedule.next_delay(AttemptResult::FetchError), Some(ms(3_000)));
        assert_eq!(schedule.next_delay(AttemptResult::Empty), Some(ms(2_000)));
    }

    #[test]
    fn degrade__keeps_attempt_count() {
        let mut schedule = PollSchedule::new(&PollPolicy::default(), false);
        schedule.begin_attempt();

        schedule.degrade();

        assert_eq!(schedule.base(), ms(1_000));
        assert_eq!(schedule.attempts(), 1);
        assert_eq!(schedule.next_delay(AttemptResult::Empty), Some(ms(1_500)));
    }

    #[test]
    fn verify_run__allows_three_attempts_with_growing_retries() {
        // given
        let mut run = VerifyRun::new(&VerifyPolicy::default(), false);

        // when
        run.begin_attempt();
        let after_empty = run.next_delay(AttemptResult::Empty);
        run.begin_attempt();
        let after_error = run.next_delay(AttemptResult::FetchError);
        run.begin_attempt();
        let after_last = run.next_delay(AttemptResult::Empty);

        // then
        assert_eq!(after_empty, Some(ms(3_000)));
        assert_eq!(after_error, Some(ms(5_000)));
        assert_eq!(after_last, None);
    }

    #[test]
    fn mark_terminal__upgrades_running_safety_net() {
        let mut run = VerifyRun::new(&VerifyPolicy::default(), false);
        run.begin_attempt();

        run.mark_terminal();

        assert!(run.is_terminal());
        assert_eq!(run.attempts(), 1);
    }
}
