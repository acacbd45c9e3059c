//! The data types produced by a fetch.
//!
//! A [`Snapshot`] is the text of the monitored page at one point in time.
//! The detector holds exactly one of them as its baseline and swaps it out
//! wholesale on change; nothing ever edits a snapshot in place.

use chrono::{DateTime, Utc};

use crate::error::FetchError;

/// Extracted page text plus the moment it was captured.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Snapshot {
    /// Newline-joined visible text of the page.
    pub text: String,

    /// When the fetch that produced `text` completed.
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(text: impl Into<String>) -> Self {
        Self::captured(text, Utc::now())
    }

    pub fn captured(text: impl Into<String>, captured_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            captured_at,
        }
    }

    /// First non-blank line, used as a one-line preview in the UI.
    pub fn headline(&self) -> &str {
        self.text
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("")
    }
}

/// Outcome of a single fetch attempt.
#[derive(Debug)]
pub enum PollResult {
    /// The page yielded text.
    Success(String),
    /// The request worked but there was no extractable text.
    Empty,
    /// The request itself failed.
    Failure(FetchError),
}

impl From<Result<String, FetchError>> for PollResult {
    /// Whitespace-only text counts as [`PollResult::Empty`].
    fn from(res: Result<String, FetchError>) -> Self {
        match res {
            Ok(text) if text.trim().is_empty() => PollResult::Empty,
            Ok(text) => PollResult::Success(text),
            Err(e) => PollResult::Failure(e),
        }
    }
}
