//! Run configuration.
//!
//! [`MonitorConfig`] is built once from the command line (see
//! [`crate::cli`]) and shared read-only with the poller for the lifetime of
//! the process.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::time::Duration;

use crate::policy::ComparisonPolicy;

/// Default poll interval in seconds.
pub const DEFAULT_DELAY_SECS: u64 = 30;

/// Everything one monitoring run needs to know.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub url: String,
    pub policy: ComparisonPolicy,
    /// Wait between the end of one tick and the start of the next.
    pub interval: Duration,
    pub alert_sound: Option<PathBuf>,
    pub init_retry: RetryPolicy,
    pub playback: PlaybackMode,
    pub on_change: OnChange,
}

impl MonitorConfig {
    /// A whole-text, keep-polling configuration with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        let interval = Duration::from_secs(DEFAULT_DELAY_SECS);
        Self {
            url: url.into(),
            policy: ComparisonPolicy::WholeText,
            interval,
            alert_sound: None,
            init_retry: RetryPolicy::unlimited(interval),
            playback: PlaybackMode::default(),
            on_change: OnChange::default(),
        }
    }
}

/// How the first, baseline-establishing fetch is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// `None` retries forever.
    pub max_attempts: Option<NonZeroU32>,
    /// Pause between failed attempts.
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn unlimited(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
        }
    }

    pub fn limited(max_attempts: NonZeroU32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(max_attempts),
            delay,
        }
    }

    /// Whether another attempt is allowed after `attempts` have failed.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max.get())
    }
}

/// Whether the poll loop waits for the alert sound to finish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackMode {
    /// Play to completion before the next interval starts.
    #[default]
    Blocking,
    /// Start playback and carry on polling immediately.
    Detached,
}

/// What the poller does after a confirmed change has been delivered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnChange {
    /// Keep polling against the new baseline.
    #[default]
    Continue,
    /// End the run once the alert has been delivered.
    Stop,
}
