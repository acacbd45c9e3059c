//! Background polling.
//!
//! Runs on a dedicated thread with its own single-threaded tokio runtime,
//! driving a [`ChangeDetector`] on a fixed interval and sending results to
//! the foreground over an unbounded channel.
//!
//! The loop is strictly sequential: fetch, compare, notify, optionally play
//! the alert, and only then start counting down the next interval.  A
//! [`CancellationToken`] is checked at every suspension point so the run can
//! be stopped from the foreground or by Ctrl-C.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::alert::{sound_alert, Alerter};
use crate::config::{MonitorConfig, OnChange};
use crate::detector::{ChangeDetector, ChangeEvent, TickOutcome};
use crate::error::InitError;
use crate::notify::{ChannelNotifier, Fanout, Notifier};
use crate::source::ContentSource;

/// How long shutdown waits for in-flight work after a cancelled run.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Exit status after a second Ctrl-C (128 + SIGINT).
const INTERRUPTED_EXIT: i32 = 130;

/// Messages sent from the poller thread to the foreground.
#[derive(Debug, Clone)]
pub enum PollMsg {
    /// The poller moved to a new state.
    Status(StatusUpdate),
    /// A change was confirmed.
    Changed(ChangeEvent),
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Cancelled,
    /// `--exit-on-change` and a change was delivered.
    ChangeDetected,
    InitFailed { attempts: u32 },
}

/// Latest outcome shown in the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Starting,
    InitialRetrieved,
    Unchanged,
    Changed,
    Empty,
    FetchFailed(String),
    AlertFailed(String),
    Stopped(StopReason),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Starting => f.write_str("Retrieving initial page"),
            Status::InitialRetrieved => f.write_str("Initial page retrieved"),
            Status::Unchanged => f.write_str("Page unchanged"),
            Status::Changed => f.write_str("Page has changed"),
            Status::Empty => f.write_str("Empty page text"),
            Status::FetchFailed(e) => write!(f, "Fetch failed: {e}"),
            Status::AlertFailed(e) => write!(f, "Alert sound failed: {e}"),
            Status::Stopped(StopReason::Cancelled) => f.write_str("Monitoring stopped"),
            Status::Stopped(StopReason::ChangeDetected) => {
                f.write_str("Monitoring stopped after change")
            }
            Status::Stopped(StopReason::InitFailed { attempts }) => {
                write!(f, "Gave up after {attempts} failed initial fetch(es)")
            }
        }
    }
}

/// A [`Status`] stamped with local time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub at: DateTime<Local>,
    pub status: Status,
}

impl StatusUpdate {
    pub fn now(status: Status) -> Self {
        Self {
            at: Local::now(),
            status,
        }
    }
}

impl fmt::Display for StatusUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.at.format("%Y-%m-%d %H:%M:%S"), self.status)
    }
}

/// Handle to the running poller thread.
pub struct Poller {
    /// Drain this on every foreground tick.
    pub rx: UnboundedReceiver<PollMsg>,
    cancel: CancellationToken,
    thread: Option<thread::JoinHandle<()>>,
}

impl Poller {
    /// Ask the poller to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel and wait for the poller thread to exit.
    pub fn shutdown(mut self) {
        self.cancel();
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("poller thread panicked");
            }
        }
    }
}

/// What to do about the `n`th Ctrl-C of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop gracefully at the next suspension point.
    Cancel,
    /// The graceful stop is stuck (e.g. behind a long blocking playback).
    Exit,
}

fn on_interrupt(count: u32) -> Interrupt {
    if count <= 1 {
        Interrupt::Cancel
    } else {
        Interrupt::Exit
    }
}

/// Spawn the background polling thread.
///
/// Every change goes to the returned receiver as [`PollMsg::Changed`] and
/// then to `notifier`.  The first Ctrl-C (SIGINT) cancels the run; the
/// poller then publishes [`Status::Stopped`] and the channel closes.  A
/// second Ctrl-C exits the process immediately.
pub fn spawn<S>(
    config: MonitorConfig,
    source: S,
    notifier: Arc<dyn Notifier>,
    alerter: Arc<dyn Alerter>,
) -> io::Result<Poller>
where
    S: ContentSource + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let token = cancel.clone();
    let thread = thread::Builder::new()
        .name("poller".into())
        .spawn(move || {
            let on_signal = token.clone();
            runtime.spawn(async move {
                let mut count = 0;
                while tokio::signal::ctrl_c().await.is_ok() {
                    count += 1;
                    match on_interrupt(count) {
                        Interrupt::Cancel => {
                            info!("interrupt received; stopping (press Ctrl-C again to force)");
                            on_signal.cancel();
                        }
                        Interrupt::Exit => {
                            warn!("second interrupt; exiting immediately");
                            std::process::exit(INTERRUPTED_EXIT);
                        }
                    }
                }
            });

            let channel: Arc<dyn Notifier> = Arc::new(ChannelNotifier::new(tx.clone()));
            let notifier = Fanout::new(vec![channel, notifier]);
            let mut detector = ChangeDetector::new(source, config.policy.clone());
            runtime.block_on(run(&config, &mut detector, &notifier, alerter, &tx, &token));
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
        })?;

    Ok(Poller {
        rx,
        cancel,
        thread: Some(thread),
    })
}

/// The poll loop: initialize, then tick every `config.interval` until
/// cancelled or, with [`OnChange::Stop`], until the first change.
pub async fn run<S: ContentSource>(
    config: &MonitorConfig,
    detector: &mut ChangeDetector<S>,
    notifier: &dyn Notifier,
    alerter: Arc<dyn Alerter>,
    tx: &UnboundedSender<PollMsg>,
    cancel: &CancellationToken,
) -> StopReason {
    info!(
        url = %detector.url(),
        interval_secs = config.interval.as_secs(),
        policy = %detector.policy(),
        "monitoring started"
    );
    publish(tx, Status::Starting);

    let reason = match detector.initialize(&config.init_retry, cancel).await {
        Ok(()) => {
            publish(tx, Status::InitialRetrieved);
            poll_loop(config, detector, notifier, alerter, tx, cancel).await
        }
        Err(InitError::Cancelled) => StopReason::Cancelled,
        Err(InitError::Exhausted { attempts }) => {
            error!(url = %detector.url(), attempts, "could not capture a baseline; giving up");
            StopReason::InitFailed { attempts }
        }
    };

    detector.stop();
    info!(?reason, "monitoring stopped");
    publish(tx, Status::Stopped(reason));
    reason
}

async fn poll_loop<S: ContentSource>(
    config: &MonitorConfig,
    detector: &mut ChangeDetector<S>,
    notifier: &dyn Notifier,
    alerter: Arc<dyn Alerter>,
    tx: &UnboundedSender<PollMsg>,
    cancel: &CancellationToken,
) -> StopReason {
    // Detached playbacks still running; awaited before a stop-on-change exit.
    let mut playing: Vec<JoinHandle<()>> = Vec::new();

    loop {
        playing.retain(|handle| !handle.is_finished());

        if !pause(config.interval, cancel).await {
            return StopReason::Cancelled;
        }

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return StopReason::Cancelled,
            outcome = detector.tick() => outcome,
        };

        let event = match outcome {
            TickOutcome::Changed(event) => event,
            TickOutcome::Unchanged => {
                publish(tx, Status::Unchanged);
                continue;
            }
            TickOutcome::Empty => {
                publish(tx, Status::Empty);
                continue;
            }
            TickOutcome::Failed(e) => {
                publish(tx, Status::FetchFailed(e.to_string()));
                continue;
            }
            TickOutcome::Skipped => {
                warn!("tick skipped: detector has no baseline");
                continue;
            }
        };

        publish(tx, Status::Changed);
        notifier.notify(&event);

        if let Some(path) = &config.alert_sound {
            if cancel.is_cancelled() {
                return StopReason::Cancelled;
            }
            let handle = sound_alert(Arc::clone(&alerter), path.clone(), config.playback, tx).await;
            playing.extend(handle);
        }

        if config.on_change == OnChange::Stop {
            finish_playback(playing, cancel).await;
            return StopReason::ChangeDetected;
        }
    }
}

/// Sleep for `interval`; `false` if cancelled first.
async fn pause(interval: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(interval) => true,
    }
}

/// Wait for detached alert sounds to end, unless cancelled first.
async fn finish_playback(playing: Vec<JoinHandle<()>>, cancel: &CancellationToken) {
    if playing.is_empty() {
        return;
    }
    debug!(count = playing.len(), "waiting for alert sound before stopping");
    for handle in playing {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = handle => {}
        }
    }
}

pub(crate) fn publish(tx: &UnboundedSender<PollMsg>, status: Status) {
    // A closed channel means the foreground has exited and is about to
    // cancel us; nothing useful to do with the status.
    let _ = tx.send(PollMsg::Status(StatusUpdate::now(status)));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
