use std::time::Duration;

/// Delays between retries of the same candidate after a quota (429) rejection.
///
/// Zero retries (the default) makes a 429 immediately fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaBackoff {
    retries: usize,
    base_delay: Duration,
    linear: bool,
}

impl QuotaBackoff {
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// `retries` waits of `delay` each.
    pub fn fixed(retries: usize, delay: Duration) -> Self {
        Self {
            retries,
            base_delay: delay,
            linear: false,
        }
    }

    /// `retries` waits of `delay`, `2 * delay`, `3 * delay`, ...
    pub fn linear(retries: usize, delay: Duration) -> Self {
        Self {
            retries,
            base_delay: delay,
            linear: true,
        }
    }

    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Delay schedule, one entry per retry, in the shape `tokio_retry` expects.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let base = self.base_delay;
        let linear = self.linear;
        (1..=self.retries as u32).map(move |n| if linear { base * n } else { base })
    }
}

impl Default for QuotaBackoff {
    fn default() -> Self {
        Self::none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_has_no_delays() {
        assert_eq!(QuotaBackoff::none().delays().count(), 0);
    }

    #[test]
    fn test_fixed_delays() {
        let delays: Vec<Duration> = QuotaBackoff::fixed(3, Duration::from_secs(2))
            .delays()
            .collect();
        assert_eq!(delays, vec![Duration::from_secs(2); 3]);
    }

    #[test]
    fn test_linear_delays() {
        let delays: Vec<Duration> = QuotaBackoff::linear(3, Duration::from_millis(500))
            .delays()
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(1500)
            ]
        );
    }
}
