/// Capped exponential reconnect schedule for the live channel.
///
/// `attempts` counts reconnects scheduled since the last successful open and
/// never exceeds `max_attempts`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base_ms: u32,
    cap_ms: u32,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_ms: u32, cap_ms: u32) -> Self {
        Self { attempts: 0, max_attempts, base_ms, cap_ms }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Delay before reconnect attempt `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> u32 {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = (self.base_ms as u64).saturating_mul(factor);
        delay.min(self.cap_ms as u64) as u32
    }

    /// Count one more attempt and return its delay, or `None` once the
    /// budget is spent.
    pub fn next_delay(&mut self) -> Option<u32> {
        if self.exhausted() {
            return None;
        }
        self.attempts += 1;
        Some(self.delay_for(self.attempts))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(5, 1_000, 30_000)
    }
}
