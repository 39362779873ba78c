use serde::{
    Deserialize,
    Serialize,
};
use std::time::Duration;

/// Timings of outcome resolution, in milliseconds where not stated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Blocks to wait for before resolution starts.
    pub confirmations: usize,
    pub failure_cooldown_ms: u64,
    pub poll: PollPolicy,
    pub verify: VerifyPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            confirmations: 1,
            failure_cooldown_ms: 3_000,
            poll: PollPolicy::default(),
            verify: VerifyPolicy::default(),
        }
    }
}

impl ResolverConfig {
    pub fn failure_cooldown(&self) -> Duration {
        Duration::from_millis(self.failure_cooldown_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollPolicy {
    pub optimistic_base_ms: u64,
    pub degraded_base_ms: u64,
    /// Added per completed attempt when the receipt had no outcome.
    pub empty_step_ms: u64,
    /// Added per completed attempt when the fetch failed.
    pub error_step_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            optimistic_base_ms: 3_000,
            degraded_base_ms: 1_000,
            empty_step_ms: 500,
            error_step_ms: 1_000,
            max_attempts: 10,
        }
    }
}

impl PollPolicy {
    pub fn base(&self, degraded: bool) -> Duration {
        if degraded {
            Duration::from_millis(self.degraded_base_ms)
        } else {
            Duration::from_millis(self.optimistic_base_ms)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyPolicy {
    /// Safety-net delay after confirmation when filters work.
    pub optimistic_grace_ms: u64,
    pub degraded_grace_ms: u64,
    pub empty_retry_ms: u64,
    pub error_retry_ms: u64,
    pub retry_step_ms: u64,
    pub max_attempts: u32,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self {
            optimistic_grace_ms: 5_000,
            degraded_grace_ms: 2_000,
            empty_retry_ms: 2_000,
            error_retry_ms: 3_000,
            retry_step_ms: 1_000,
            max_attempts: 3,
        }
    }
}

impl VerifyPolicy {
    pub fn grace(&self, degraded: bool) -> Duration {
        if degraded {
            Duration::from_millis(self.degraded_grace_ms)
        } else {
            Duration::from_millis(self.optimistic_grace_ms)
        }
    }
}
