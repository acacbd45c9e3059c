//! Error types.
//!
//! Every failure the monitor can hit is one of the enums below.  Per-tick
//! errors ([`FetchError`], [`AudioError`]) are recovered at the tick boundary
//! and only surface through logs and the status line; [`ArgumentError`] is
//! fatal and stops the process before any polling starts.

use std::path::PathBuf;

use thiserror::Error;

/// Invalid command-line input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgumentError {
    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported URL scheme `{0}` (expected http or https)")]
    UnsupportedScheme(String),

    #[error("--text-exists must not be empty")]
    EmptyTrigger,

    #[error(
        "cannot play {}: built without audio support (rebuild with `--features audio`)",
        .0.display()
    )]
    AudioUnavailable(PathBuf),
}

/// A fetch attempt that did not produce page text.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered with HTTP {0}")]
    Status(u16),

    #[error("invalid URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Raised by the scripted sources in unit tests.
    #[cfg(test)]
    #[error("{0}")]
    Other(String),
}

/// Decoding or playing the alert sound failed.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("cannot open sound file {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("audio output unavailable: {0}")]
    Device(String),

    #[error("built without audio support (enable the `audio` feature)")]
    Unsupported,
}

/// The poller could not establish a baseline.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InitError {
    #[error("cancelled before a baseline was captured")]
    Cancelled,

    #[error("no usable page text after {attempts} attempt(s)")]
    Exhausted { attempts: u32 },
}
