//! Command-line interface.
//!
//! Every option can also be supplied through a `PAGEWATCH_*` environment
//! variable, which is handy when running under a service manager.

use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::config::{MonitorConfig, OnChange, PlaybackMode, RetryPolicy, DEFAULT_DELAY_SECS};
use crate::error::ArgumentError;
use crate::policy::ComparisonPolicy;

/// Poll a web page for changes and alert when one is detected.
#[derive(Parser, Debug)]
#[command(
    name = "pagewatch",
    version,
    after_help = "Examples:\n  \
                  pagewatch https://example.com/product alarm.mp3\n  \
                  pagewatch --text-exists \"in stock\" --delay 60 https://example.com/product\n  \
                  pagewatch --headless --exit-on-change https://example.com/status"
)]
pub struct Cli {
    /// Page to monitor (http or https)
    #[arg(value_name = "URL", env = "PAGEWATCH_URL")]
    pub url: String,

    /// Sound file to play when the page changes
    #[arg(value_name = "SOUND", env = "PAGEWATCH_SOUND")]
    pub sound: Option<PathBuf>,

    /// Alert only while this text is present on the page (case-insensitive)
    #[arg(long, value_name = "TEXT", env = "PAGEWATCH_TEXT_EXISTS")]
    pub text_exists: Option<String>,

    /// Poll interval in seconds
    #[arg(
        long,
        value_name = "SECONDS",
        default_value_t = DEFAULT_DELAY_SECS,
        value_parser = clap::value_parser!(u64).range(1..),
        env = "PAGEWATCH_DELAY"
    )]
    pub delay: u64,

    /// Give up if the first fetch fails this many times (default: never)
    #[arg(long, value_name = "N", env = "PAGEWATCH_INIT_RETRIES")]
    pub init_retries: Option<NonZeroU32>,

    /// Seconds between failed first fetches (default: same as --delay)
    #[arg(
        long,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(1..),
        env = "PAGEWATCH_INIT_RETRY_DELAY"
    )]
    pub init_retry_delay: Option<u64>,

    /// Stop monitoring after the first detected change
    #[arg(long, env = "PAGEWATCH_EXIT_ON_CHANGE")]
    pub exit_on_change: bool,

    /// Keep polling while the alert sound plays
    #[arg(long, env = "PAGEWATCH_DETACH_AUDIO")]
    pub detach_audio: bool,

    /// Log to stderr instead of drawing the terminal UI
    #[arg(long, env = "PAGEWATCH_HEADLESS")]
    pub headless: bool,

    /// Write logs to this file (the terminal UI otherwise discards them)
    #[arg(long, value_name = "PATH", env = "PAGEWATCH_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl Cli {
    /// Validate the arguments and build the run configuration.
    pub fn monitor_config(&self) -> Result<MonitorConfig, ArgumentError> {
        validate_url(&self.url)?;
        if let Some(sound) = &self.sound {
            ensure_playable(sound)?;
        }

        let trigger = match &self.text_exists {
            Some(t) if t.trim().is_empty() => return Err(ArgumentError::EmptyTrigger),
            other => other.clone(),
        };

        let interval = Duration::from_secs(self.delay);
        let retry_delay = self
            .init_retry_delay
            .map(Duration::from_secs)
            .unwrap_or(interval);
        let init_retry = match self.init_retries {
            Some(n) => RetryPolicy::limited(n, retry_delay),
            None => RetryPolicy::unlimited(retry_delay),
        };

        let mut config = MonitorConfig::new(self.url.clone());
        config.policy = ComparisonPolicy::from_trigger(trigger);
        config.interval = interval;
        config.alert_sound = self.sound.clone();
        config.init_retry = init_retry;
        if self.detach_audio {
            config.playback = PlaybackMode::Detached;
        }
        if self.exit_on_change {
            config.on_change = OnChange::Stop;
        }
        Ok(config)
    }
}

#[cfg(feature = "audio")]
fn ensure_playable(_sound: &Path) -> Result<(), ArgumentError> {
    Ok(())
}

/// Without the `audio` feature every playback would fail, so refuse a
/// sound file up front instead of alerting silently.
#[cfg(not(feature = "audio"))]
fn ensure_playable(sound: &Path) -> Result<(), ArgumentError> {
    Err(ArgumentError::AudioUnavailable(sound.to_path_buf()))
}

fn validate_url(raw: &str) -> Result<(), ArgumentError> {
    let parsed = Url::parse(raw).map_err(|e| ArgumentError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ArgumentError::UnsupportedScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Cli {
        let argv = std::iter::once("pagewatch").chain(args.iter().copied());
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn url_only_uses_defaults() {
        let cfg = parse(&["https://example.com"]).monitor_config().unwrap();
        assert_eq!(cfg.url, "https://example.com");
        assert_eq!(cfg.interval, Duration::from_secs(30));
        assert_eq!(cfg.policy, ComparisonPolicy::WholeText);
        assert!(cfg.alert_sound.is_none());
        assert_eq!(cfg.init_retry, RetryPolicy::unlimited(Duration::from_secs(30)));
        assert_eq!(cfg.playback, PlaybackMode::Blocking);
        assert_eq!(cfg.on_change, OnChange::Continue);
    }

    #[test]
    fn flags_are_mapped() {
        let cli = parse(&[
            "--text-exists",
            "In Stock",
            "--delay",
            "5",
            "--exit-on-change",
            "--detach-audio",
            "https://example.com/p",
        ]);
        let cfg = cli.monitor_config().unwrap();
        assert_eq!(cfg.policy, ComparisonPolicy::substring("In Stock"));
        assert_eq!(cfg.interval, Duration::from_secs(5));
        assert_eq!(cfg.playback, PlaybackMode::Detached);
        assert_eq!(cfg.on_change, OnChange::Stop);
    }

    #[cfg(feature = "audio")]
    #[test]
    fn sound_is_mapped() {
        let cfg = parse(&["https://example.com/p", "alarm.mp3"])
            .monitor_config()
            .unwrap();
        assert_eq!(cfg.alert_sound, Some(PathBuf::from("alarm.mp3")));
    }

    #[cfg(not(feature = "audio"))]
    #[test]
    fn sound_without_audio_support_is_rejected() {
        let err = parse(&["https://example.com/p", "alarm.mp3"])
            .monitor_config()
            .unwrap_err();
        assert_eq!(err, ArgumentError::AudioUnavailable(PathBuf::from("alarm.mp3")));
    }

    #[test]
    fn init_retry_options() {
        let cfg = parse(&[
            "--init-retries",
            "4",
            "--init-retry-delay",
            "2",
            "http://example.com",
        ])
        .monitor_config()
        .unwrap();
        assert_eq!(
            cfg.init_retry,
            RetryPolicy::limited(NonZeroU32::new(4).unwrap(), Duration::from_secs(2))
        );
    }

    #[test]
    fn missing_url_is_rejected() {
        let err = Cli::try_parse_from(["pagewatch"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn zero_delay_is_rejected() {
        let err = Cli::try_parse_from(["pagewatch", "--delay", "0", "https://example.com"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn non_numeric_delay_is_rejected() {
        assert!(Cli::try_parse_from(["pagewatch", "--delay", "soon", "https://example.com"]).is_err());
    }

    #[test]
    fn zero_init_retries_is_rejected() {
        assert!(
            Cli::try_parse_from(["pagewatch", "--init-retries", "0", "https://example.com"])
                .is_err()
        );
    }

    #[test]
    fn invalid_url_is_argument_error() {
        let err = parse(&["not a url"]).monitor_config().unwrap_err();
        assert!(matches!(err, ArgumentError::InvalidUrl { .. }));
    }

    #[test]
    fn non_http_scheme_is_argument_error() {
        let err = parse(&["ftp://example.com/file"]).monitor_config().unwrap_err();
        assert_eq!(err, ArgumentError::UnsupportedScheme("ftp".into()));
    }

    #[test]
    fn blank_trigger_is_argument_error() {
        let err = parse(&["--text-exists", "  ", "https://example.com"])
            .monitor_config()
            .unwrap_err();
        assert_eq!(err, ArgumentError::EmptyTrigger);
    }
}
