//! Content source abstraction layer.
//!
//! This module defines the [`ContentSource`] trait and the [`Snapshot`] /
//! [`PollResult`] types.  The one concrete implementation, [`WebSource`],
//! lives in [`web`].
//!
//! The detector only ever sees a `ContentSource`, so tests drive it with
//! scripted sources instead of the network.

mod snapshot;
mod web;

pub use snapshot::{PollResult, Snapshot};
pub use web::WebSource;

use async_trait::async_trait;

use crate::error::FetchError;

/// Anything that can produce the current text of the monitored resource.
///
/// The poll loop calls [`fetch()`](ContentSource::fetch) from its own task,
/// so implementations must be [`Send`] + [`Sync`].
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// The URL (or other label) being monitored.
    fn url(&self) -> &str;

    /// Fetch the resource and return its extracted plain text.
    ///
    /// Failures are returned, never panicked; an empty string is a valid
    /// answer and is classified by the caller.
    async fn fetch(&self) -> Result<String, FetchError>;
}
