//! Generation and playback control flow, independent of any GUI toolkit.
//!
//! The [`Controller`] owns the only channel between the UI thread and the
//! worker threads. Workers never touch the view: they push a [`TaskSignal`]
//! and the UI thread applies it on its next [`Controller::poll`].

mod speaker;

pub use speaker::Speaker;
#[cfg(feature = "kokoro")]
pub use speaker::KokoroSpeaker;

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::audio::{self, Player};
use crate::error::StudioError;
use crate::voice::Voice;
use crate::SynthesisResult;

/// Message from a worker thread to the UI thread.
#[derive(Debug)]
pub enum TaskSignal {
    /// A generation was dispatched.
    Start,
    /// Generation finished with this waveform.
    Done(SynthesisResult),
    /// Generation failed.
    Error(String),
    /// Playback reached the end of the waveform.
    Played,
    PlaybackError(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Idle,
    /// A generation is in flight; generate, play and save are disabled.
    Busy,
}

/// The widget operations the controller drives.
pub trait View {
    /// Disable or enable the generate/play/save controls and show or hide
    /// the progress indicator.
    fn set_busy(&mut self, busy: bool);
    fn set_status(&mut self, status: &str);
    /// Show a modal error dialog.
    fn show_error(&mut self, title: &str, message: &str);
}

/// Coordinates one speaker, one player and the worker queue.
pub struct Controller<S: Speaker> {
    speaker: Arc<Mutex<S>>,
    player: Arc<dyn Player>,
    tx: Sender<TaskSignal>,
    rx: Receiver<TaskSignal>,
    state: UiState,
    current_audio: Option<Arc<SynthesisResult>>,
}

impl<S: Speaker> Controller<S> {
    pub fn new(speaker: S, player: Arc<dyn Player>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            speaker: Arc::new(Mutex::new(speaker)),
            player,
            tx,
            rx,
            state: UiState::Idle,
            current_audio: None,
        }
    }

    pub fn state(&self) -> UiState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state == UiState::Busy
    }

    /// The most recently generated waveform, if any.
    pub fn current_audio(&self) -> Option<&SynthesisResult> {
        self.current_audio.as_deref()
    }

    pub fn has_audio(&self) -> bool {
        self.current_audio.is_some()
    }

    /// Play and save need finished audio and no generation in flight.
    pub fn can_use_audio(&self) -> bool {
        !self.is_busy() && self.has_audio()
    }

    /// Validate the request and dispatch generation to a worker thread.
    ///
    /// Empty text and unknown voices are rejected here, before the speaker is
    /// ever called. There is no cancellation once the worker is running.
    pub fn request_generate(&mut self, text: &str, voice: &str) -> Result<(), StudioError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StudioError::EmptyText);
        }
        let voice: Voice = voice.parse()?;
        if self.is_busy() {
            return Err(StudioError::Busy);
        }

        self.state = UiState::Busy;
        self.send(TaskSignal::Start);
        log::info!("Generating {} chars with voice {voice}", text.chars().count());

        let speaker = Arc::clone(&self.speaker);
        let tx = self.tx.clone();
        let text = text.to_string();
        let spawned = thread::Builder::new()
            .name("tts-generate".to_string())
            .spawn(move || {
                let signal = match run_generation(&speaker, &text, voice) {
                    Ok(audio) => TaskSignal::Done(audio),
                    Err(e) => {
                        log::warn!("Generation failed: {e}");
                        TaskSignal::Error(e.to_string())
                    }
                };
                // The receiver only goes away with the controller.
                let _ = tx.send(signal);
            });

        if let Err(e) = spawned {
            self.send(TaskSignal::Error(format!("could not start worker: {e}")));
        }
        Ok(())
    }

    /// Apply at most one pending signal to `view`.
    ///
    /// Returns `true` if a signal was processed.
    pub fn poll(&mut self, view: &mut dyn View) -> bool {
        let Ok(signal) = self.rx.try_recv() else {
            return false;
        };

        match signal {
            TaskSignal::Start => {
                view.set_busy(true);
                view.set_status("Generating speech...");
            }
            TaskSignal::Done(audio) => {
                self.state = UiState::Idle;
                let status = format!("Speech generated ({:.1}s)", audio.duration_secs());
                self.current_audio = Some(Arc::new(audio));
                view.set_busy(false);
                view.set_status(&status);
            }
            TaskSignal::Error(message) => {
                self.state = UiState::Idle;
                view.set_busy(false);
                view.set_status("Generation failed");
                view.show_error("Generation error", &message);
            }
            TaskSignal::Played => view.set_status("Playback finished"),
            TaskSignal::PlaybackError(message) => view.show_error("Playback error", &message),
        }
        true
    }

    /// Play the current waveform on a worker thread.
    ///
    /// Returns `Ok(false)` when there is nothing to play.
    pub fn request_play(&self) -> Result<bool, StudioError> {
        if self.is_busy() {
            return Err(StudioError::Busy);
        }
        let Some(audio) = self.current_audio.clone() else {
            return Ok(false);
        };

        let player = Arc::clone(&self.player);
        let tx = self.tx.clone();
        thread::Builder::new()
            .name("tts-playback".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| player.play(&audio)))
                    .unwrap_or_else(|_| {
                        Err(StudioError::Playback("audio output panicked".to_string()))
                    });
                let signal = match outcome {
                    Ok(()) => TaskSignal::Played,
                    Err(e) => {
                        log::warn!("Playback failed: {e}");
                        TaskSignal::PlaybackError(e.to_string())
                    }
                };
                let _ = tx.send(signal);
            })
            .map_err(|e| StudioError::Playback(format!("could not start playback: {e}")))?;
        Ok(true)
    }

    /// Write the current waveform to `path` as WAV.
    ///
    /// Returns the path written (with `.wav` appended if it had no extension),
    /// or `None` when there is nothing to save.
    pub fn save_audio(&self, path: &Path) -> Result<Option<PathBuf>, StudioError> {
        if self.is_busy() {
            return Err(StudioError::Busy);
        }
        match &self.current_audio {
            Some(audio) => audio::save_wav(audio, path).map(Some),
            None => Ok(None),
        }
    }

    fn send(&self, signal: TaskSignal) {
        let _ = self.tx.send(signal);
    }
}

/// Run the speaker, turning a poisoned lock or a panic into an error.
fn run_generation<S: Speaker>(
    speaker: &Mutex<S>,
    text: &str,
    voice: Voice,
) -> Result<SynthesisResult, StudioError> {
    let mut speaker = speaker.lock().map_err(|_| {
        StudioError::Synthesis("speech engine is unavailable after an earlier failure".to_string())
    })?;
    panic::catch_unwind(AssertUnwindSafe(|| speaker.generate_speech(text, voice)))
        .unwrap_or_else(|_| Err(StudioError::Synthesis("speech engine panicked".to_string())))
}
