//! Backoff delays between write attempts of a batch.

use std::time::Duration;

/// Delay policy applied between consecutive write attempts of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Wait the same delay before every retry.
    Fixed(Duration),
    /// Start at `initial` and double before each retry, capped at `max`.
    Exponential { initial: Duration, max: Duration },
    /// Retry immediately.
    None,
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Fixed(Duration::from_secs(600))
    }
}

impl BackoffStrategy {
    /// Delay to wait before retry number `retry` (1-based).
    pub fn delay(&self, retry: u32) -> Duration {
        match self {
            Self::Fixed(delay) => *delay,
            Self::Exponential { initial, max } => {
                let factor = 1u32
                    .checked_shl(retry.saturating_sub(1))
                    .unwrap_or(u32::MAX);
                initial
                    .checked_mul(factor)
                    .map_or(*max, |delay| delay.min(*max))
            }
            Self::None => Duration::ZERO,
        }
    }
}
