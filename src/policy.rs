//! Comparison policies.
//!
//! A policy decides whether freshly fetched text counts as a change relative
//! to the current baseline.  It is chosen once from the configuration and
//! never switches during a run.

use std::fmt;

/// How a new fetch is compared against the baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComparisonPolicy {
    /// Changed when the texts differ at all (case- and whitespace-sensitive).
    WholeText,

    /// Changed when the new text contains the trigger, ignoring case.  The
    /// baseline plays no part, so this fires on every tick where the trigger
    /// is still present.
    Substring {
        trigger: String,
        /// `trigger` lowercased once up front.
        needle: String,
    },
}

impl ComparisonPolicy {
    /// Substring policy for `trigger`.
    pub fn substring(trigger: impl Into<String>) -> Self {
        let trigger = trigger.into();
        let needle = trigger.to_lowercase();
        ComparisonPolicy::Substring { trigger, needle }
    }

    /// Pick the policy implied by an optional `--text-exists` value.
    pub fn from_trigger(trigger: Option<String>) -> Self {
        match trigger {
            Some(t) => Self::substring(t),
            None => ComparisonPolicy::WholeText,
        }
    }

    pub fn is_changed(&self, baseline: &str, current: &str) -> bool {
        match self {
            ComparisonPolicy::WholeText => baseline != current,
            ComparisonPolicy::Substring { needle, .. } => {
                current.to_lowercase().contains(needle.as_str())
            }
        }
    }
}

impl fmt::Display for ComparisonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonPolicy::WholeText => f.write_str("any text change"),
            ComparisonPolicy::Substring { trigger, .. } => {
                write!(f, "text contains \"{trigger}\"")
            }
        }
    }
}
