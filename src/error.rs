//! Application-level error type.
//!
//! Every failure the studio reports to the user goes through [`StudioError`];
//! the front-end shows it in a modal dialog titled by [`StudioError::title`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("Please enter some text to synthesize.")]
    EmptyText,

    #[error("Invalid voice selection: '{0}'")]
    InvalidVoice(String),

    #[error("A generation is already in progress.")]
    Busy,

    #[error("Model could not be loaded: {0}")]
    ModelLoad(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("No speech was produced for the given text.")]
    NoSpeech,

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl StudioError {
    /// Short dialog title for this error.
    pub fn title(&self) -> &'static str {
        match self {
            StudioError::EmptyText | StudioError::InvalidVoice(_) | StudioError::Busy => {
                "Invalid input"
            }
            StudioError::ModelLoad(_) => "Model error",
            StudioError::Synthesis(_) | StudioError::NoSpeech => "Generation error",
            StudioError::Playback(_) => "Playback error",
            StudioError::Wav(_) | StudioError::Io(_) => "Save error",
            StudioError::Config(_) => "Configuration error",
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for StudioError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        StudioError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;
