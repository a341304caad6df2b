//! The engine seam used by the controller.

use crate::error::StudioError;
use crate::voice::Voice;
use crate::SynthesisResult;

/// Something that can turn text into a waveform for a catalog voice.
///
/// Called from a worker thread; blocks until synthesis completes.
pub trait Speaker: Send + 'static {
    fn generate_speech(&mut self, text: &str, voice: Voice) -> Result<SynthesisResult, StudioError>;
}

#[cfg(feature = "kokoro")]
pub use kokoro::KokoroSpeaker;

#[cfg(feature = "kokoro")]
mod kokoro {
    use super::Speaker;
    use crate::config::StudioConfig;
    use crate::engines::kokoro::{
        KokoroEngine, KokoroInferenceParams, KokoroModelParams, SpeedInput,
    };
    use crate::error::StudioError;
    use crate::speed::SpeedPolicy;
    use crate::voice::Voice;
    use crate::{SynthesisEngine, SynthesisResult};

    /// [`Speaker`] backed by the Kokoro ONNX engine.
    pub struct KokoroSpeaker {
        engine: KokoroEngine,
        speed: SpeedPolicy,
    }

    impl KokoroSpeaker {
        /// Build an engine from `config` without loading the model yet.
        pub fn new(config: &StudioConfig) -> Self {
            Self {
                engine: KokoroEngine::with_espeak(
                    config.espeak_bin.clone(),
                    config.espeak_data.clone(),
                ),
                speed: config.speed,
            }
        }

        /// Load the model named by `config.model_dir`.
        pub fn load(&mut self, config: &StudioConfig) -> Result<(), StudioError> {
            let params = KokoroModelParams {
                num_threads: config.num_threads,
                optimized_model_cache_path: config.optimized_model_cache_path.clone(),
            };
            self.engine
                .load_model_with_params(&config.model_dir, params)
                .map_err(|e| {
                    StudioError::ModelLoad(format!("{}: {e}", config.model_dir.display()))
                })?;
            log::info!(
                "Kokoro model ready ({} voices)",
                self.engine.list_voices().len()
            );

            let missing = missing_catalog_voices(|id| self.engine.has_voice(id));
            if !missing.is_empty() {
                let ids: Vec<String> = missing.iter().map(Voice::id).collect();
                log::warn!(
                    "Voice archive lacks {} catalog voices: {}",
                    ids.len(),
                    ids.join(", ")
                );
            }
            if let Some(input) = self.engine.speed_input() {
                if let Some(msg) = speed_warning(self.speed, input) {
                    log::warn!("{msg}");
                }
            }
            Ok(())
        }
    }

    /// Catalog voices the loaded archive does not provide.
    fn missing_catalog_voices(has_voice: impl Fn(&str) -> bool) -> Vec<Voice> {
        Voice::all().filter(|voice| !has_voice(&voice.id())).collect()
    }

    /// Integer speed exports round every rate, so fractional speeds are lost.
    fn speed_warning(policy: SpeedPolicy, input: SpeedInput) -> Option<String> {
        if input.is_fractional() {
            return None;
        }
        match policy {
            SpeedPolicy::Dynamic => Some(
                "Model takes an integer speed; dynamic speech rate is rounded to 1.0".to_string(),
            ),
            SpeedPolicy::Fixed(speed) if speed.fract() != 0.0 => Some(format!(
                "Model takes an integer speed; speed {speed} is rounded to {}",
                SpeedInput::as_int(speed)
            )),
            SpeedPolicy::Fixed(_) => None,
        }
    }

    impl Speaker for KokoroSpeaker {
        fn generate_speech(
            &mut self,
            text: &str,
            voice: Voice,
        ) -> Result<SynthesisResult, StudioError> {
            let params = KokoroInferenceParams {
                voice: voice.id(),
                speed: self.speed,
                style_index: None,
            };
            let result = self
                .engine
                .synthesize(text, Some(params))
                .map_err(|e| StudioError::Synthesis(e.to_string()))?;
            if result.is_empty() {
                return Err(StudioError::NoSpeech);
            }
            Ok(result)
        }
    }

}
