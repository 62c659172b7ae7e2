use std::time::Duration;

/// Restart timing constants for the speech engine.
#[derive(Debug, Clone)]
pub struct RestartPolicy {
    /// Delay before the first restart attempt
    pub base_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Attempts before the controller enters a cooldown and resets the counter
    pub max_attempts: u32,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_attempts: 6,
        }
    }
}

impl RestartPolicy {
    /// Delay for a given 1-based attempt: `min(base * 2^(attempt-1), max)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Tracks consecutive engine failures and produces the next restart delay.
///
/// The controller never gives up: once `max_attempts` is reached the counter
/// resets and one more restart is scheduled after a full `max_delay` cooldown,
/// after which the progression starts over from `base_delay`.
#[derive(Debug)]
pub struct RestartBackoff {
    policy: RestartPolicy,
    attempts: u32,
}

impl RestartBackoff {
    pub fn new(policy: RestartPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Number of restarts scheduled since the last successful start or result.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Record one more scheduled restart and return the delay to wait.
    pub fn next_delay(&mut self) -> Duration {
        if self.attempts >= self.policy.max_attempts {
            // Cooldown: reset the counter and wait the full cap once more.
            self.attempts = 0;
            return self.policy.max_delay;
        }

        self.attempts += 1;
        self.policy.delay_for_attempt(self.attempts)
    }

    /// Called on a successful engine start or recognized speech.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
