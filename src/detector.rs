//! The change detector.
//!
//! [`ChangeDetector`] owns the baseline snapshot and the comparison policy.
//! It is a small state machine:
//!
//! ```text
//!  Uninitialized ──seed(Success)──► Baseline(snapshot) ──stop()──► Stopped
//!                                    │        ▲
//!                               tick │        │ unchanged: keep snapshot
//!                                    ▼        │ changed:   swap in new one
//!                                  (comparing)┘
//! ```
//!
//! The transitions themselves ([`seed`](ChangeDetector::seed) and
//! [`apply`](ChangeDetector::apply)) are synchronous and do no I/O.  The
//! async [`initialize`](ChangeDetector::initialize) and
//! [`tick`](ChangeDetector::tick) wrap them around a fetch from the
//! [`ContentSource`].  Timing between ticks belongs to [`crate::poll`].

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::RetryPolicy;
use crate::error::{FetchError, InitError};
use crate::policy::ComparisonPolicy;
use crate::source::{ContentSource, PollResult, Snapshot};

/// Where the detector is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorState {
    /// No successful fetch yet.
    Uninitialized,
    /// Holding the snapshot later fetches are compared against.
    Baseline(Snapshot),
    /// The run is over; ticks do nothing.
    Stopped,
}

/// A confirmed change of the monitored page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub url: String,
    /// The text that triggered the change; now the baseline.
    pub snapshot: Snapshot,
}

/// What one tick observed.
#[derive(Debug)]
pub enum TickOutcome {
    Unchanged,
    Changed(ChangeEvent),
    /// The page had no text; baseline kept.
    Empty,
    /// The fetch failed; baseline kept.
    Failed(FetchError),
    /// Not initialized yet, or already stopped.
    Skipped,
}

pub struct ChangeDetector<S> {
    source: S,
    policy: ComparisonPolicy,
    state: DetectorState,
}

impl<S: ContentSource> ChangeDetector<S> {
    pub fn new(source: S, policy: ComparisonPolicy) -> Self {
        Self {
            source,
            policy,
            state: DetectorState::Uninitialized,
        }
    }

    pub fn url(&self) -> &str {
        self.source.url()
    }

    pub fn policy(&self) -> &ComparisonPolicy {
        &self.policy
    }

    pub fn state(&self) -> &DetectorState {
        &self.state
    }

    pub fn baseline(&self) -> Option<&Snapshot> {
        match &self.state {
            DetectorState::Baseline(snap) => Some(snap),
            _ => None,
        }
    }

    /// Enter the terminal state and drop the baseline.
    pub fn stop(&mut self) {
        self.state = DetectorState::Stopped;
    }

    /// Fetch once and classify the result.
    pub async fn poll(&self) -> PollResult {
        PollResult::from(self.source.fetch().await)
    }

    /// Establish the baseline from `result` without comparing.
    ///
    /// Returns `true` once a baseline is in place.  Empty and failed results
    /// never become a baseline, and a stopped detector stays stopped.
    pub fn seed(&mut self, result: PollResult) -> bool {
        if self.state == DetectorState::Stopped {
            return false;
        }
        match result {
            PollResult::Success(text) => {
                debug!(url = %self.url(), text = %text, "baseline captured");
                self.state = DetectorState::Baseline(Snapshot::new(text));
                true
            }
            PollResult::Empty => {
                warn!(url = %self.url(), "initial fetch returned no text");
                false
            }
            PollResult::Failure(e) => {
                warn!(url = %self.url(), error = %e, "initial fetch failed");
                false
            }
        }
    }

    /// Compare `result` with the baseline and update state per the policy.
    pub fn apply(&mut self, result: PollResult) -> TickOutcome {
        let DetectorState::Baseline(baseline) = &self.state else {
            return TickOutcome::Skipped;
        };

        let text = match result {
            PollResult::Success(text) => text,
            PollResult::Empty => {
                warn!(url = %self.url(), "empty page text; keeping baseline");
                return TickOutcome::Empty;
            }
            PollResult::Failure(e) => {
                warn!(url = %self.url(), error = %e, "fetch failed; keeping baseline");
                return TickOutcome::Failed(e);
            }
        };

        debug!(url = %self.url(), text = %text, "current text");

        if !self.policy.is_changed(&baseline.text, &text) {
            info!(url = %self.url(), "page unchanged");
            return TickOutcome::Unchanged;
        }

        info!(url = %self.url(), "web page change detected");
        let snapshot = Snapshot::new(text);
        self.state = DetectorState::Baseline(snapshot.clone());
        TickOutcome::Changed(ChangeEvent {
            url: self.url().to_string(),
            snapshot,
        })
    }

    /// Fetch until a baseline is captured, retrying per `retry`.
    ///
    /// Fails with [`InitError::Cancelled`] as soon as `cancel` fires (also
    /// mid-fetch), or with [`InitError::Exhausted`] once the policy's attempt
    /// limit is used up.
    pub async fn initialize(
        &mut self,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<(), InitError> {
        let mut attempts: u32 = 0;
        loop {
            if self.state == DetectorState::Stopped {
                return Err(InitError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InitError::Cancelled),
                result = self.poll() => result,
            };
            attempts = attempts.saturating_add(1);

            if self.seed(result) {
                info!(url = %self.url(), attempts, "initial page retrieved");
                return Ok(());
            }
            if !retry.allows_retry(attempts) {
                return Err(InitError::Exhausted { attempts });
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(InitError::Cancelled),
                _ = tokio::time::sleep(retry.delay) => {}
            }
        }
    }

    /// One fetch-compare cycle.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.baseline().is_none() {
            return TickOutcome::Skipped;
        }
        let result = self.poll().await;
        self.apply(result)
    }
}
