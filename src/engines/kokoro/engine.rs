use std::path::{Path, PathBuf};

use crate::speed::SpeedPolicy;
use crate::{SynthesisEngine, SynthesisResult};

use super::model::{KokoroError, KokoroModel, SpeedInput, SAMPLE_RATE};
use super::phonemizer::EspeakConfig;

/// Parameters for configuring Kokoro model loading.
#[derive(Debug, Clone, Default)]
pub struct KokoroModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
    /// Path for caching the Level3-optimized ONNX graph.
    ///
    /// Must be writable; the first load writes the optimized graph here and
    /// later loads reuse it.
    pub optimized_model_cache_path: Option<PathBuf>,
}

/// Parameters for configuring a Kokoro synthesis request.
#[derive(Debug, Clone)]
pub struct KokoroInferenceParams {
    /// Voice name (e.g. `"zf_001"`, `"zm_003"`, `"af_heart"`).
    pub voice: String,
    /// Speech speed. Fixed multipliers range 0.5–2.0; default `Fixed(1.0)`.
    pub speed: SpeedPolicy,
    /// Override the style vector index. `None` = auto (uses phoneme token count).
    pub style_index: Option<usize>,
}

impl Default for KokoroInferenceParams {
    fn default() -> Self {
        Self {
            voice: "zf_001".to_string(),
            speed: SpeedPolicy::default(),
            style_index: None,
        }
    }
}

/// Kokoro text-to-speech engine.
///
/// Uses the Kokoro-82M ONNX model. Requires espeak-ng for phonemization.
///
/// ```rust,no_run
/// use tts_studio::{SynthesisEngine, engines::kokoro::KokoroEngine};
/// use std::path::PathBuf;
///
/// // Uses system espeak-ng from PATH
/// let mut engine = KokoroEngine::new();
/// engine.load_model(&PathBuf::from("models/kokoro-v1.1-zh"))?;
/// let result = engine.synthesize("你好", None)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct KokoroEngine {
    model: Option<KokoroModel>,
    espeak: EspeakConfig,
}

impl Default for KokoroEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl KokoroEngine {
    /// Create a new engine that uses `espeak-ng` from PATH.
    pub fn new() -> Self {
        Self {
            model: None,
            espeak: EspeakConfig::default(),
        }
    }

    /// Create a new engine with explicit espeak-ng binary and data paths.
    ///
    /// Use this when bundling espeak-ng with your application. Either path
    /// can be `None` to fall back to the system default.
    pub fn with_espeak(
        bin_path: Option<PathBuf>,
        data_path: Option<PathBuf>,
    ) -> Self {
        Self {
            model: None,
            espeak: EspeakConfig { bin_path, data_path },
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// List all available voice names (requires model to be loaded).
    pub fn list_voices(&self) -> Vec<&str> {
        self.model
            .as_ref()
            .map(|m| m.list_voices())
            .unwrap_or_default()
    }

    /// Whether the loaded voice archive has `voice`. False when unloaded.
    pub fn has_voice(&self, voice: &str) -> bool {
        self.model.as_ref().is_some_and(|m| m.has_voice(voice))
    }

    /// How the loaded export takes its speed input.
    pub fn speed_input(&self) -> Option<SpeedInput> {
        self.model.as_ref().map(KokoroModel::speed_input)
    }
}

impl Drop for KokoroEngine {
    fn drop(&mut self) {
        self.unload_model();
    }
}

impl SynthesisEngine for KokoroEngine {
    type SynthesisParams = KokoroInferenceParams;
    type ModelParams = KokoroModelParams;

    fn load_model_with_params(
        &mut self,
        model_path: &Path,
        params: Self::ModelParams,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let model = KokoroModel::load(
            model_path,
            params.num_threads,
            params.optimized_model_cache_path.as_deref(),
        )?;
        self.model = Some(model);
        Ok(())
    }

    fn unload_model(&mut self) {
        self.model = None;
    }

    fn synthesize(
        &mut self,
        text: &str,
        params: Option<Self::SynthesisParams>,
    ) -> Result<SynthesisResult, Box<dyn std::error::Error>> {
        let model = self.model.as_mut().ok_or(KokoroError::ModelNotLoaded)?;

        let p = params.unwrap_or_default();
        log::debug!("Synthesizing {} chars with voice {}", text.chars().count(), p.voice);
        let samples =
            model.synthesize_text(text, &p.voice, p.speed, p.style_index, &self.espeak)?;

        Ok(SynthesisResult {
            samples,
            sample_rate: SAMPLE_RATE,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{KokoroEngine, KokoroInferenceParams};
    use crate::speed::SpeedPolicy;
    use crate::SynthesisEngine;

    #[test]
    fn synthesize_without_model_reports_not_loaded() {
        let mut engine = KokoroEngine::new();
        assert!(!engine.is_loaded());
        assert!(engine.list_voices().is_empty());
        assert!(!engine.has_voice("zf_001"));
        assert_eq!(engine.speed_input(), None);

        let err = engine
            .synthesize("你好", None)
            .expect_err("synthesis needs a model");
        assert!(err.to_string().contains("Model not loaded"));
    }

    #[test]
    fn default_params_use_first_mandarin_voice() {
        let params = KokoroInferenceParams::default();
        assert_eq!(params.voice, "zf_001");
        assert_eq!(params.speed, SpeedPolicy::Fixed(1.0));
        assert!(params.style_index.is_none());
    }

    #[test]
    fn loading_missing_directory_fails() {
        let mut engine = KokoroEngine::new();
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(engine.load_model(&dir.path().join("missing")).is_err());
        assert!(!engine.is_loaded());
    }
}
