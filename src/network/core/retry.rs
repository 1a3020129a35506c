//! Retry policy shared by every strategy pass of the executor.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::RetrySettings;

/// Attempt budget, escalating-then-capped delay schedule and block statuses.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    delays: Vec<Duration>,
    block_codes: HashSet<u16>,
}

impl RetryPolicy {
    /// `delays` must not be empty; `max_retries` is raised to at least one attempt.
    pub fn new(max_retries: u32, delays: Vec<Duration>, block_codes: impl IntoIterator<Item = u16>) -> Self {
        let delays = if delays.is_empty() {
            vec![Duration::ZERO]
        } else {
            delays
        };
        Self {
            max_retries: max_retries.max(1),
            delays,
            block_codes: block_codes.into_iter().collect(),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay after the given 1-based attempt, clamped to the last schedule entry.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt.saturating_sub(1) as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    pub fn is_block(&self, status: u16) -> bool {
        self.block_codes.contains(&status)
    }

    /// Only a plain 200 ends a logical request.
    pub fn is_success(status: u16) -> bool {
        status == 200
    }
}

impl From<&RetrySettings> for RetryPolicy {
    fn from(settings: &RetrySettings) -> Self {
        RetryPolicy::new(
            settings.max_retries,
            settings
                .delays_secs
                .iter()
                .map(|secs| Duration::from_secs_f64(secs.max(0.0)))
                .collect(),
            settings.block_codes.iter().copied(),
        )
    }
}
