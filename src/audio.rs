//! Audio output: playback through the default device and WAV export.

use std::path::{Path, PathBuf};

use crate::error::StudioError;
use crate::SynthesisResult;

/// Plays a waveform to completion.
///
/// Implementations block until playback finishes; callers run them on a
/// worker thread.
pub trait Player: Send + Sync {
    fn play(&self, audio: &SynthesisResult) -> Result<(), StudioError>;
}

/// Plays audio on the system's default output device.
#[cfg(feature = "playback")]
#[derive(Debug, Default, Clone, Copy)]
pub struct RodioPlayer;

#[cfg(feature = "playback")]
impl Player for RodioPlayer {
    fn play(&self, audio: &SynthesisResult) -> Result<(), StudioError> {
        use rodio::{buffer::SamplesBuffer, OutputStreamBuilder, Sink};

        // The stream is opened per call so it lives on the playing thread.
        let mut stream = OutputStreamBuilder::from_default_device()
            .and_then(|builder| builder.open_stream())
            .map_err(|e| StudioError::Playback(e.to_string()))?;
        stream.log_on_drop(false);

        let sink = Sink::connect_new(stream.mixer());
        sink.append(SamplesBuffer::new(
            1,
            audio.sample_rate,
            audio.samples.clone(),
        ));
        log::info!("Playing {:.2}s of audio", audio.duration_secs());
        sink.sleep_until_end();
        Ok(())
    }
}

/// The file is always WAV, so any other extension is replaced with `.wav`.
pub fn with_wav_extension(path: &Path) -> PathBuf {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
    if is_wav {
        path.to_path_buf()
    } else {
        path.with_extension("wav")
    }
}

/// Write `audio` to `path` as WAV, returning the path actually written.
pub fn save_wav(audio: &SynthesisResult, path: &Path) -> Result<PathBuf, StudioError> {
    let path = with_wav_extension(path);
    audio.write_wav(&path)?;
    log::info!("Saved {} samples to {}", audio.samples.len(), path.display());
    Ok(path)
}
