//! Runtime configuration of the checkout core.

use crate::domain::route::Terminal;
use crate::domain::session::DEFAULT_MAX_RETRIES;
use std::time::Duration;

/// Polling cadence of the verification poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    pub pending_interval: Duration,
    pub success_interval: Duration,
    pub failed_interval: Duration,
    /// Wall-clock budget from poll start before a pending transaction counts as timed out.
    pub deadline: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            pending_interval: Duration::from_secs(2),
            success_interval: Duration::from_secs(5),
            failed_interval: Duration::from_secs(3),
            deadline: Duration::from_secs(300),
        }
    }
}

impl PollConfig {
    /// Interval used by the poller hosted on the given screen.
    pub fn interval_for(&self, screen: Terminal) -> Duration {
        match screen {
            Terminal::Pending => self.pending_interval,
            Terminal::Success => self.success_interval,
            Terminal::Failed => self.failed_interval,
        }
    }

    /// Uses the same interval on every screen.
    pub fn with_uniform_interval(mut self, interval: Duration) -> Self {
        self.pending_interval = interval;
        self.success_interval = interval;
        self.failed_interval = interval;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutConfig {
    pub max_retries: u32,
    pub provider_timeout: Duration,
    pub channel_timeout: Duration,
    pub poll: PollConfig,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            provider_timeout: Duration::from_secs(30),
            channel_timeout: Duration::from_secs(10),
            poll: PollConfig::default(),
        }
    }
}

impl CheckoutConfig {
    /// Reads overrides from `CHECKOUT_*` environment variables; unset or unparsable values
    /// keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());
        let defaults = Self::default();

        let mut poll = defaults.poll.clone();
        if let Some(ms) = parse("CHECKOUT_POLL_INTERVAL_MS") {
            poll = poll.with_uniform_interval(Duration::from_millis(ms));
        }
        if let Some(secs) = parse("CHECKOUT_POLL_DEADLINE_SECS") {
            poll.deadline = Duration::from_secs(secs);
        }

        Self {
            max_retries: parse("CHECKOUT_MAX_RETRIES")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.max_retries),
            provider_timeout: parse("CHECKOUT_PROVIDER_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.provider_timeout),
            channel_timeout: parse("CHECKOUT_CHANNEL_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.channel_timeout),
            poll,
        }
    }
}
