use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use ratatui::widgets::ListState;

use crate::detector::ChangeEvent;
use crate::poll::{PollMsg, Status, StopReason};
use crate::policy::ComparisonPolicy;

/// How many changes the history list keeps; older ones are dropped.
pub const MAX_HISTORY: usize = 200;

/// What the UI remembers about one change.  The page text itself is not
/// kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub at: DateTime<Utc>,
    pub headline: String,
}

impl From<&ChangeEvent> for ChangeRecord {
    fn from(event: &ChangeEvent) -> Self {
        Self {
            at: event.snapshot.captured_at,
            headline: event.snapshot.headline().to_string(),
        }
    }
}

/// Foreground state.  Fed only by [`PollMsg`]s; never touches the detector.
pub struct App {
    /// The monitored URL.
    pub url: String,
    /// Human-readable comparison policy.
    pub policy: String,
    /// Most recent changes, newest first, at most [`MAX_HISTORY`].
    pub changes: VecDeque<ChangeRecord>,
    /// Changes seen this session, including those dropped from `changes`.
    pub total_changes: usize,
    /// List selection state for scrolling.
    pub list_state: ListState,
    /// Latest change the user has not dismissed yet.
    pub alert: Option<ChangeRecord>,
    /// Last poll status line.
    pub status: String,
    /// Set once the poller has finished.
    pub stopped: Option<StopReason>,
    /// Whether the user has requested to quit.
    pub quit: bool,
}

impl App {
    pub fn new(url: impl Into<String>, policy: &ComparisonPolicy) -> Self {
        Self {
            url: url.into(),
            policy: policy.to_string(),
            changes: VecDeque::new(),
            total_changes: 0,
            list_state: ListState::default(),
            alert: None,
            status: "Starting…".into(),
            stopped: None,
            quit: false,
        }
    }

    /// Apply one message from the poller.  Returns `true` for a new change,
    /// so the caller can ring the bell.
    pub fn handle_msg(&mut self, msg: PollMsg) -> bool {
        match msg {
            PollMsg::Status(update) => {
                if let Status::Stopped(reason) = update.status {
                    self.stopped = Some(reason);
                    // Only an external interrupt cancels the poller behind
                    // our back; follow it out.
                    if reason == StopReason::Cancelled {
                        self.quit = true;
                    }
                }
                self.status = update.to_string();
                false
            }
            PollMsg::Changed(event) => {
                let record = ChangeRecord::from(&event);
                self.changes.push_front(record.clone());
                self.changes.truncate(MAX_HISTORY);
                self.total_changes += 1;
                self.alert = Some(record);
                // Keep the highlight on the same entry as the list grows.
                if let Some(i) = self.list_state.selected() {
                    self.list_state.select(Some((i + 1).min(self.changes.len() - 1)));
                }
                true
            }
        }
    }

    /// Dismiss the alert banner.
    pub fn acknowledge(&mut self) {
        self.alert = None;
    }

    // -- navigation ----------------------------------------------------------

    pub fn select_next(&mut self) {
        if self.changes.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1).min(self.changes.len() - 1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_previous(&mut self) {
        if self.changes.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn select_first(&mut self) {
        if !self.changes.is_empty() {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_last(&mut self) {
        if !self.changes.is_empty() {
            self.list_state.select(Some(self.changes.len() - 1));
        }
    }
}
