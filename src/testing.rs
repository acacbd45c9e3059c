//! Test doubles shared by the unit tests.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::alert::Alerter;
use crate::error::{AudioError, FetchError};
use crate::source::ContentSource;

/// One scripted fetch result.
#[derive(Debug, Clone)]
pub enum Step {
    Text(&'static str),
    Empty,
    Fail(&'static str),
}

/// Shared counter readable after the source has been moved into a detector.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Ordered log of side effects across sources and alerters.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// A [`ContentSource`] that replays a fixed script.  Once the script runs
/// out the last step repeats.
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    last: Mutex<Option<Step>>,
    latency: Duration,
    fetches: Counter,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Counter,
    spans: Arc<Mutex<Vec<(Instant, Instant)>>>,
    journal: Option<Journal>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            latency: Duration::ZERO,
            fetches: Counter::default(),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Counter::default(),
            spans: Arc::new(Mutex::new(Vec::new())),
            journal: None,
            cancel_after: None,
        }
    }

    /// Every fetch takes this long (in tokio time).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Cancel `token` as the `n`th fetch completes.
    pub fn cancel_after(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((n, token));
        self
    }

    pub fn fetch_count(&self) -> Counter {
        self.fetches.clone()
    }

    pub fn max_in_flight(&self) -> Counter {
        self.max_in_flight.clone()
    }

    /// Start and end instants of every completed fetch.
    pub fn spans(&self) -> Arc<Mutex<Vec<(Instant, Instant)>>> {
        Arc::clone(&self.spans)
    }

    fn next_step(&self) -> Step {
        let next = self.steps.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(step) => {
                *last = Some(step.clone());
                step
            }
            None => last.clone().unwrap_or(Step::Fail("script is empty")),
        }
    }
}

#[async_trait]
impl ContentSource for ScriptedSource {
    fn url(&self) -> &str {
        "test://page"
    }

    async fn fetch(&self) -> Result<String, FetchError> {
        let started = Instant::now();
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.0.fetch_max(now_in_flight, Ordering::SeqCst);
        if let Some(journal) = &self.journal {
            journal.push("fetch");
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let step = self.next_step();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.spans.lock().unwrap().push((started, Instant::now()));
        let n = self.fetches.0.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((limit, token)) = &self.cancel_after {
            if n >= *limit {
                token.cancel();
            }
        }

        match step {
            Step::Text(t) => Ok(t.to_string()),
            Step::Empty => Ok(String::new()),
            Step::Fail(msg) => Err(FetchError::Other(msg.to_string())),
        }
    }
}

/// An [`Alerter`] that records what it was asked to play.
#[derive(Default)]
pub struct RecordingAlerter {
    pub played: Mutex<Vec<PathBuf>>,
    /// Real (wall-clock) time each playback takes.
    pub duration: Duration,
    pub fail: bool,
    pub journal: Option<Journal>,
}

impl RecordingAlerter {
    pub fn play_count(&self) -> usize {
        self.played.lock().unwrap().len()
    }
}

impl Alerter for RecordingAlerter {
    fn play(&self, path: &Path) -> Result<(), AudioError> {
        if let Some(journal) = &self.journal {
            journal.push("play-start");
        }
        self.played.lock().unwrap().push(path.to_path_buf());
        if !self.duration.is_zero() {
            std::thread::sleep(self.duration);
        }
        if let Some(journal) = &self.journal {
            journal.push("play-end");
        }
        if self.fail {
            return Err(AudioError::Device("no output device".into()));
        }
        Ok(())
    }
}
