//! Change notifications.
//!
//! The poller hands every [`ChangeEvent`] to a [`Notifier`].  The foreground
//! always hears about it through [`ChannelNotifier`]; [`LogNotifier`] adds a
//! log line and, in headless mode, rings the terminal bell.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::detector::ChangeEvent;
use crate::poll::PollMsg;

/// Surfaces a change to the user.  Must return promptly.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &ChangeEvent);
}

/// Forwards change events to the foreground thread.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: UnboundedSender<PollMsg>,
}

impl ChannelNotifier {
    pub fn new(tx: UnboundedSender<PollMsg>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, event: &ChangeEvent) {
        if self.tx.send(PollMsg::Changed(event.clone())).is_err() {
            debug!(url = %event.url, "foreground gone; change notification dropped");
        }
    }
}

/// Logs every change at info level, optionally ringing a bell on `bell`.
pub struct LogNotifier {
    bell: Option<Mutex<Box<dyn Write + Send>>>,
}

impl LogNotifier {
    /// Log only.  Used by the terminal UI, which rings its own bell.
    pub fn silent() -> Self {
        Self { bell: None }
    }

    /// Log and write a BEL character to `out`.
    pub fn with_bell(out: impl Write + Send + 'static) -> Self {
        Self {
            bell: Some(Mutex::new(Box::new(out))),
        }
    }

    /// Log and ring the bell on stdout.
    pub fn stdout() -> Self {
        Self::with_bell(io::stdout())
    }

    fn ring(&self) -> io::Result<()> {
        let Some(out) = &self.bell else {
            return Ok(());
        };
        let mut out = out.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        out.write_all(b"\x07")?;
        out.flush()
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, event: &ChangeEvent) {
        info!(
            url = %event.url,
            headline = event.snapshot.headline(),
            "web page has changed"
        );
        if let Err(e) = self.ring() {
            debug!(error = %e, "could not ring terminal bell");
        }
    }
}

/// Hands each event to every inner notifier, in order.
pub struct Fanout(Vec<Arc<dyn Notifier>>);

impl Fanout {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        Self(notifiers)
    }
}

impl Notifier for Fanout {
    fn notify(&self, event: &ChangeEvent) {
        for notifier in &self.0 {
            notifier.notify(event);
        }
    }
}
