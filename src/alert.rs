//! Audible alerts.
//!
//! [`Alerter::play`] blocks until the clip has finished; the poll loop
//! decides whether to wait for it (see [`crate::config::PlaybackMode`]).
//! Actual decoding and output go through [`rodio`] when the crate is built
//! with the `audio` feature.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{self, JoinError, JoinHandle};
use tracing::{debug, error, info};

use crate::config::PlaybackMode;
use crate::error::AudioError;
use crate::poll::{publish, PollMsg, Status};

/// Plays a sound file to completion.
pub trait Alerter: Send + Sync {
    fn play(&self, path: &Path) -> Result<(), AudioError>;
}

/// Plays through the default output device.
#[derive(Debug, Default)]
pub struct SoundPlayer;

impl Alerter for SoundPlayer {
    fn play(&self, path: &Path) -> Result<(), AudioError> {
        let file = File::open(path).map_err(|source| AudioError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        render(path, file)
    }
}

#[cfg(feature = "audio")]
fn render(path: &Path, file: File) -> Result<(), AudioError> {
    use std::io::BufReader;

    // `_stream` must outlive the sink or output stops immediately.
    let (_stream, handle) =
        rodio::OutputStream::try_default().map_err(|e| AudioError::Device(e.to_string()))?;
    let sink = rodio::Sink::try_new(&handle).map_err(|e| AudioError::Device(e.to_string()))?;
    let decoder =
        rodio::Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    sink.append(decoder);
    sink.sleep_until_end();
    Ok(())
}

#[cfg(not(feature = "audio"))]
fn render(_path: &Path, _file: File) -> Result<(), AudioError> {
    Err(AudioError::Unsupported)
}

/// Play `path` on the blocking pool.
///
/// In [`PlaybackMode::Blocking`] this returns once the clip is done; in
/// [`PlaybackMode::Detached`] it returns immediately with a handle that
/// resolves when playback ends.  Playback errors never propagate: they are
/// logged and published as [`Status::AlertFailed`] so the monitor keeps
/// running.
pub async fn sound_alert(
    alerter: Arc<dyn Alerter>,
    path: PathBuf,
    mode: PlaybackMode,
    tx: &UnboundedSender<PollMsg>,
) -> Option<JoinHandle<()>> {
    info!(path = %path.display(), ?mode, "playing alert sound");

    let playback = task::spawn_blocking(move || alerter.play(&path));
    match mode {
        PlaybackMode::Blocking => {
            report(playback.await, tx);
            None
        }
        PlaybackMode::Detached => {
            let tx = tx.clone();
            Some(task::spawn(async move { report(playback.await, &tx) }))
        }
    }
}

fn report(outcome: Result<Result<(), AudioError>, JoinError>, tx: &UnboundedSender<PollMsg>) {
    let reason = match outcome {
        Ok(Ok(())) => {
            debug!("alert sound finished");
            return;
        }
        Ok(Err(e)) => {
            error!(error = %e, "alert sound failed");
            e.to_string()
        }
        Err(e) => {
            error!(error = %e, "alert playback task died");
            e.to_string()
        }
    };
    publish(tx, Status::AlertFailed(reason));
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::testing::{Journal, RecordingAlerter};

    #[test]
    fn missing_file_is_open_error() {
        let err = SoundPlayer
            .play(Path::new("/definitely/not/here/alarm.mp3"))
            .unwrap_err();
        assert!(matches!(err, AudioError::Open { .. }));
    }

    #[cfg(not(feature = "audio"))]
    #[test]
    fn existing_file_without_audio_feature_is_unsupported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ID3").unwrap();

        let err = SoundPlayer.play(file.path()).unwrap_err();
        assert!(matches!(err, AudioError::Unsupported));
    }

    #[cfg(feature = "audio")]
    #[test]
    fn garbage_file_fails_without_panicking() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"this is not audio").unwrap();

        // Either no device (CI) or a decode error; both are plain errors.
        let err = SoundPlayer.play(file.path()).unwrap_err();
        assert!(matches!(err, AudioError::Device(_) | AudioError::Decode { .. }));
    }

    fn channel() -> (UnboundedSender<PollMsg>, UnboundedReceiver<PollMsg>) {
        mpsc::unbounded_channel()
    }

    #[tokio::test]
    async fn blocking_mode_waits_for_completion() {
        let journal = Journal::default();
        let alerter = Arc::new(RecordingAlerter {
            duration: Duration::from_millis(50),
            journal: Some(journal.clone()),
            ..Default::default()
        });
        let (tx, mut rx) = channel();

        let handle =
            sound_alert(alerter.clone(), PathBuf::from("a.mp3"), PlaybackMode::Blocking, &tx).await;
        journal.push("returned");

        assert!(handle.is_none());
        assert_eq!(journal.entries(), ["play-start", "play-end", "returned"]);
        assert_eq!(alerter.play_count(), 1);
        assert!(rx.try_recv().is_err(), "success publishes nothing");
    }

    #[tokio::test]
    async fn detached_mode_returns_before_completion() {
        let journal = Journal::default();
        let alerter = Arc::new(RecordingAlerter {
            duration: Duration::from_millis(500),
            journal: Some(journal.clone()),
            ..Default::default()
        });
        let (tx, _rx) = channel();

        let handle =
            sound_alert(alerter, PathBuf::from("a.mp3"), PlaybackMode::Detached, &tx).await;
        journal.push("returned");

        let entries = journal.entries();
        let returned = entries.iter().position(|e| e == "returned").unwrap();
        assert!(
            entries.iter().position(|e| e == "play-end").map_or(true, |end| end > returned),
            "detached playback should not hold up the caller: {entries:?}"
        );

        // The handle resolves once the clip is over.
        handle.expect("detached playback returns a handle").await.unwrap();
        assert_eq!(journal.entries().last().map(String::as_str), Some("play-end"));
    }

    #[tokio::test]
    async fn failed_playback_is_reported_not_raised() {
        let alerter = Arc::new(RecordingAlerter {
            fail: true,
            ..Default::default()
        });
        let (tx, mut rx) = channel();

        sound_alert(alerter.clone(), PathBuf::from("a.mp3"), PlaybackMode::Blocking, &tx).await;

        assert_eq!(alerter.play_count(), 1);
        match rx.try_recv().unwrap() {
            PollMsg::Status(update) => assert_eq!(
                update.status,
                Status::AlertFailed("audio output unavailable: no output device".into())
            ),
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[tokio::test]
    async fn detached_failure_is_reported_when_playback_ends() {
        let alerter = Arc::new(RecordingAlerter {
            fail: true,
            ..Default::default()
        });
        let (tx, mut rx) = channel();

        let handle =
            sound_alert(alerter, PathBuf::from("a.mp3"), PlaybackMode::Detached, &tx).await;
        handle.unwrap().await.unwrap();

        assert!(matches!(
            rx.try_recv(),
            Ok(PollMsg::Status(update)) if matches!(update.status, Status::AlertFailed(_))
        ));
    }
}
