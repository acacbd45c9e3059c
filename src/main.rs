//! pagewatch — watch a web page and alert when its text changes.
//!
//! ## Architecture overview
//!
//! ```text
//!  ┌────────────┐ fetch ┌─────────────┐  PollMsg   ┌──────────┐  draw()  ┌──────────┐
//!  │ source/    │ ◄──── │ detector.rs │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//!  │ (HTTP+DOM) │       │  poll.rs    │ (channel)  │ (state)  │          │ (render) │
//!  └────────────┘       │  (thread)   │            └──────────┘          └──────────┘
//!                       └─────────────┘                 ▲
//!                              │ play()                 │ handle_key_event()
//!                       ┌─────────────┐            ┌──────────┐
//!                       │  alert.rs   │            │ input.rs │
//!                       └─────────────┘            └──────────┘
//! ```
//!
//! * **`source/`** — the `ContentSource` trait and the HTTP implementation
//!   that reduces a page to its visible text.
//! * **`detector`** — owns the baseline snapshot and decides, per
//!   **`policy`**, whether a fetch is a change.
//! * **`poll`** — background thread that initializes the detector, ticks it
//!   on a fixed interval, and dispatches notifications and alert sounds.
//! * **`app`** / **`ui`** / **`input`** — the terminal front end; it only
//!   ever sees messages from the poller.
//! * **`main`** — parses arguments, sets up logging, and runs either the
//!   terminal UI or the headless loop.

mod alert;
mod app;
mod cli;
mod config;
mod detector;
mod error;
mod input;
mod logging;
mod notify;
mod poll;
mod policy;
mod source;
#[cfg(test)]
mod testing;
mod ui;

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::info;

use alert::{Alerter, SoundPlayer};
use app::App;
use cli::Cli;
use config::MonitorConfig;
use logging::LogTarget;
use notify::LogNotifier;
use poll::{PollMsg, Status, StatusUpdate, StopReason};
use source::WebSource;

// ---------------------------------------------------------------------------
// RAII terminal guard
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }

    fn bell(&mut self) -> io::Result<()> {
        let backend = self.terminal.backend_mut();
        backend.write_all(b"\x07")?;
        backend.flush()
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before printing a panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = match cli.monitor_config() {
        Ok(config) => config,
        Err(e) => Cli::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    logging::init(cli.verbose, LogTarget::choose(cli.headless, cli.log_file.clone()))?;

    let source = WebSource::new(config.url.clone())?;
    let alerter: Arc<dyn Alerter> = Arc::new(SoundPlayer);

    println!(
        "Will check URL {} for changes every {}s",
        config.url,
        config.interval.as_secs()
    );

    if cli.headless {
        run_headless(config, source, alerter)
    } else {
        run_tui(config, source, alerter)
    }
}

fn exit_code(reason: Option<StopReason>) -> ExitCode {
    match reason {
        Some(StopReason::InitFailed { .. }) => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

/// Wait for the poller on the main thread.  Changes are reported by the
/// [`LogNotifier`] (log line plus bell), so only the stop reason matters here.
fn run_headless(
    config: MonitorConfig,
    source: WebSource,
    alerter: Arc<dyn Alerter>,
) -> Result<ExitCode> {
    let mut poller = poll::spawn(config, source, Arc::new(LogNotifier::stdout()), alerter)?;
    let mut stopped = None;

    // The channel closes once the poller thread has finished.
    while let Some(msg) = poller.rx.blocking_recv() {
        if let PollMsg::Status(StatusUpdate {
            status: Status::Stopped(reason),
            ..
        }) = msg
        {
            stopped = Some(reason);
        }
    }

    poller.shutdown();
    Ok(exit_code(stopped))
}

fn run_tui(
    config: MonitorConfig,
    source: WebSource,
    alerter: Arc<dyn Alerter>,
) -> Result<ExitCode> {
    install_panic_hook();

    let mut app = App::new(config.url.clone(), &config.policy);
    let mut poller = poll::spawn(config, source, Arc::new(LogNotifier::silent()), alerter)?;
    let mut guard = TerminalGuard::new()?;

    // ~10 fps: drain poller messages, render, then wait up to one tick for
    // keyboard input.
    let tick_rate = Duration::from_millis(100);

    loop {
        while let Ok(msg) = poller.rx.try_recv() {
            if app.handle_msg(msg) {
                guard.bell()?;
            }
        }

        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    drop(guard);
    info!("user quit");
    poller.shutdown();
    Ok(exit_code(app.stopped))
}
