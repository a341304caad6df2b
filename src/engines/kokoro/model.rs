use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::lexicon::Lexicon;
use super::phonemizer::{phonemize, voice_lang, EspeakConfig};
use super::voices::VoiceStore;
use crate::speed::SpeedPolicy;

/// Maximum number of phoneme tokens per chunk (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

/// Output sample rate from the Kokoro model.
pub const SAMPLE_RATE: u32 = 24000;

/// Crossfade (in samples) used when concatenating chunk audio.
const CHUNK_CROSSFADE_SAMPLES: usize = 240; // 10ms @ 24kHz

/// ONNX exports tried before scanning the directory, most specific first.
const PREFERRED_ONNX: &[&str] = &["kokoro-v1.1-zh.onnx", "kokoro-quant-convinteger.onnx"];

/// Voice archives tried in order.
const VOICE_ARCHIVES: &[&str] = &["voices-v1.1-zh.bin", "voices-v1.0.bin"];

/// Punctuation a long sequence may be split after.
const CHUNK_BOUNDARY_CHARS: &[char] = &[';', ':', ',', '.', '!', '?'];

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voice '{0}' not found. Call list_voices() to see available voices.")]
    VoiceNotFound(String),
    #[error("Model not loaded. Call load_model() first.")]
    ModelNotLoaded,
    #[error("Invalid model configuration: {0}")]
    Config(String),
    #[error("Failed to parse voice file: {0}")]
    VoiceParse(String),
}

/// The files a model directory must (or may) provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub onnx: PathBuf,
    pub voices: PathBuf,
    /// `config.json`; its `vocab` is specific to each Kokoro release.
    pub config: PathBuf,
    pub lexicon: Option<PathBuf>,
}

impl ModelFiles {
    /// Resolve the model files inside `model_dir`.
    pub fn locate(model_dir: &Path) -> Result<Self, KokoroError> {
        let missing = |what: &str| {
            KokoroError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{what} not found in {}", model_dir.display()),
            ))
        };

        let onnx = find_onnx_file(model_dir)?;
        let voices = VOICE_ARCHIVES
            .iter()
            .map(|name| model_dir.join(name))
            .find(|path| path.exists())
            .ok_or_else(|| missing("Voice archive (voices-v1.1-zh.bin or voices-v1.0.bin)"))?;
        let config = model_dir.join("config.json");
        if !config.exists() {
            return Err(missing("config.json (the model's phoneme vocabulary)"));
        }
        let lexicon = Some(model_dir.join("lexicon.json")).filter(|path| path.exists());

        Ok(Self {
            onnx,
            voices,
            config,
            lexicon,
        })
    }
}

/// Element type of the model's `speed` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedInput {
    Float32,
    /// Integer exports cannot express fractional rates.
    Int32,
}

impl SpeedInput {
    /// The integer an `Int32` export receives for `speed`.
    pub fn as_int(speed: f32) -> i32 {
        (speed.round() as i32).max(1)
    }

    pub fn is_fractional(self) -> bool {
        self == SpeedInput::Float32
    }
}

/// Internal Kokoro ONNX model state.
pub struct KokoroModel {
    session: Session,
    voice_store: VoiceStore,
    vocab: HashMap<char, i64>,
    lexicon: Lexicon,
    /// Token ids of [`CHUNK_BOUNDARY_CHARS`] in this model's vocab.
    boundary_ids: Vec<i64>,
    /// Detected input name: "input_ids" or "tokens"
    tokens_input_name: String,
    speed_input: SpeedInput,
}

impl KokoroModel {
    /// Load the Kokoro model from a directory laid out as [`ModelFiles`] expects.
    pub fn load(
        model_dir: &Path,
        num_threads: Option<usize>,
        optimized_cache_path: Option<&Path>,
    ) -> Result<Self, KokoroError> {
        let files = ModelFiles::locate(model_dir)?;
        log::info!("Loading Kokoro model from {}", files.onnx.display());

        // Cheap files first so a broken directory fails before ORT spins up.
        let vocab = super::vocab::load_vocab(&files.config)?;
        let voice_store = VoiceStore::load(&files.voices)?;
        let mut lexicon = Lexicon::builtin();
        if let Some(path) = &files.lexicon {
            lexicon.extend(Lexicon::load(path)?);
            log::info!("Loaded lexicon overrides ({} entries)", lexicon.len());
        }

        let session = init_session(&files.onnx, num_threads, optimized_cache_path)?;
        let tokens_input_name = detect_tokens_input(&session);
        let speed_input = detect_speed_input(&session);
        log::info!("Detected: tokens_input='{tokens_input_name}', speed={speed_input:?}");

        Ok(Self {
            session,
            voice_store,
            boundary_ids: boundary_ids(&vocab),
            vocab,
            lexicon,
            tokens_input_name,
            speed_input,
        })
    }

    /// Synthesize audio from text using the given voice and speed policy.
    ///
    /// The speed is resolved per chunk from that chunk's phoneme count.
    pub fn synthesize_text(
        &mut self,
        text: &str,
        voice_name: &str,
        speed: SpeedPolicy,
        style_idx_override: Option<usize>,
        espeak: &EspeakConfig,
    ) -> Result<Vec<f32>, KokoroError> {
        // Unknown voices fail before espeak-ng runs.
        if !self.voice_store.contains(voice_name) {
            return Err(KokoroError::VoiceNotFound(voice_name.to_string()));
        }

        let lang = voice_lang(voice_name);
        let ids = phonemize(text, lang, &self.vocab, &self.lexicon, espeak)?;
        if ids.is_empty() {
            log::warn!("No phoneme tokens produced for text: {text:?}");
            return Ok(vec![]);
        }

        // One style index for the whole text keeps prosody stable across chunks.
        let style_idx = style_idx_override.unwrap_or(ids.len());
        let style = self.voice_store.get_style(voice_name, style_idx)?;
        let chunks = split_chunks(&ids, &self.boundary_ids);
        if chunks.len() > 1 {
            log::debug!("{} phoneme tokens split into {} chunks", ids.len(), chunks.len());
        }

        let mut combined = Vec::with_capacity(ids.len() * 300);
        for chunk_ids in &chunks {
            let chunk_speed = speed.resolve(chunk_ids.len());
            log::debug!(
                "Synthesizing chunk of {} tokens at speed {chunk_speed:.3}",
                chunk_ids.len()
            );
            let audio = self.synthesize_chunk(chunk_ids, &style, chunk_speed)?;
            append_with_crossfade(&mut combined, &audio, CHUNK_CROSSFADE_SAMPLES);
        }

        Ok(combined)
    }

    /// Run ONNX inference on a single chunk of phoneme token IDs.
    fn synthesize_chunk(
        &mut self,
        tokens: &[i64],
        style: &[f32; STYLE_DIM],
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        // [[0, t1..tN, 0]]
        let padded: Vec<i64> = std::iter::once(0)
            .chain(tokens.iter().copied())
            .chain(std::iter::once(0))
            .collect();
        let tokens_arr = Array2::from_shape_vec((1, padded.len()), padded)?;
        let style_view = ndarray::ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;
        let tokens_name = self.tokens_input_name.as_str();

        let output = match self.speed_input {
            SpeedInput::Int32 => {
                let speed_arr = ndarray::arr1(&[SpeedInput::as_int(speed)]);
                self.session.run(inputs![
                    tokens_name => TensorRef::from_array_view(tokens_arr.view())?,
                    "style" => TensorRef::from_array_view(style_view)?,
                    "speed" => TensorRef::from_array_view(speed_arr.view())?,
                ])?
            }
            SpeedInput::Float32 => {
                let speed_arr = ndarray::arr1(&[speed]);
                self.session.run(inputs![
                    tokens_name => TensorRef::from_array_view(tokens_arr.view())?,
                    "style" => TensorRef::from_array_view(style_view)?,
                    "speed" => TensorRef::from_array_view(speed_arr.view())?,
                ])?
            }
        };

        let (_, value) = output
            .iter()
            .next()
            .ok_or_else(|| KokoroError::Ort(ort::Error::new("No output from model")))?;
        let waveform = value.try_extract_array::<f32>()?;
        Ok(waveform.iter().copied().collect())
    }

    /// List all available voice names.
    pub fn list_voices(&self) -> Vec<&str> {
        self.voice_store.list_voices()
    }

    pub fn has_voice(&self, voice: &str) -> bool {
        self.voice_store.contains(voice)
    }

    pub fn speed_input(&self) -> SpeedInput {
        self.speed_input
    }
}

/// Find the ONNX model file in the given directory.
///
/// Tries [`PREFERRED_ONNX`] first, then the alphabetically first `.onnx` file.
fn find_onnx_file(model_dir: &Path) -> Result<PathBuf, KokoroError> {
    if let Some(path) = PREFERRED_ONNX
        .iter()
        .map(|name| model_dir.join(name))
        .find(|path| path.exists())
    {
        return Ok(path);
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(model_dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("onnx"))
        .collect();
    candidates.sort();

    let path = candidates.into_iter().next().ok_or_else(|| {
        KokoroError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("No .onnx file found in {}", model_dir.display()),
        ))
    })?;
    log::info!("Using ONNX file: {}", path.display());
    Ok(path)
}

/// Initialize an ONNX session with optional on-disk graph caching.
///
/// With a cache path, the first load runs Level3 optimization and writes the
/// optimized graph there; later loads read it back with optimization disabled.
/// Without one, every load runs Level3.
fn init_session(
    onnx_path: &Path,
    num_threads: Option<usize>,
    optimized_cache_path: Option<&Path>,
) -> Result<Session, KokoroError> {
    let providers = vec![CPUExecutionProvider::default().build()];

    let (load_path, opt_level, write_cache) = match optimized_cache_path {
        Some(cache) if cache.exists() => {
            log::info!("Loading pre-optimized Kokoro graph from {}", cache.display());
            (cache, GraphOptimizationLevel::Disable, false)
        }
        Some(cache) => {
            log::info!(
                "Running Level3 optimization, caching graph at {}",
                cache.display()
            );
            (onnx_path, GraphOptimizationLevel::Level3, true)
        }
        None => (onnx_path, GraphOptimizationLevel::Level3, false),
    };

    let mut builder = Session::builder()?
        .with_optimization_level(opt_level)?
        .with_execution_providers(providers)?
        .with_parallel_execution(true)?;

    if let (true, Some(cache)) = (write_cache, optimized_cache_path) {
        builder = builder.with_optimized_model_path(cache)?;
    }

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(load_path)?)
}

/// The token input is named "input_ids" or "tokens" depending on the export.
fn detect_tokens_input(session: &Session) -> String {
    session
        .inputs()
        .iter()
        .map(|input| input.name())
        .find(|name| *name == "input_ids" || *name == "tokens")
        .unwrap_or("input_ids")
        .to_string()
}

/// Missing or unrecognised speed inputs are treated as int32, the common case.
fn detect_speed_input(session: &Session) -> SpeedInput {
    let Some(input) = session.inputs().iter().find(|input| input.name() == "speed") else {
        return SpeedInput::Int32;
    };
    let dtype = format!("{:?}", input.dtype()).to_ascii_lowercase();
    if dtype.contains("float32") || dtype.contains("f32") {
        SpeedInput::Float32
    } else {
        SpeedInput::Int32
    }
}

fn boundary_ids(vocab: &HashMap<char, i64>) -> Vec<i64> {
    CHUNK_BOUNDARY_CHARS
        .iter()
        .filter_map(|ch| vocab.get(ch).copied())
        .collect()
}

/// Split phoneme IDs into chunks of at most `MAX_PHONEME_LEN`, cutting after
/// the last boundary id in each window when there is one.
fn split_chunks(ids: &[i64], boundary_ids: &[i64]) -> Vec<Vec<i64>> {
    let mut chunks = Vec::new();
    let mut rest = ids;

    while rest.len() > MAX_PHONEME_LEN {
        let window = &rest[..MAX_PHONEME_LEN];
        let cut = window
            .iter()
            .rposition(|id| boundary_ids.contains(id))
            .map_or(MAX_PHONEME_LEN, |i| i + 1);
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk.to_vec());
        rest = tail;
    }
    if !rest.is_empty() {
        chunks.push(rest.to_vec());
    }

    chunks
}

/// Append `src` to `dst`, blending the first `crossfade_samples` of `src`
/// into the tail of `dst` with a linear ramp.
fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade_samples: usize) {
    let overlap = crossfade_samples.min(dst.len()).min(src.len());
    let dst_start = dst.len() - overlap;
    for (i, (left, right)) in dst[dst_start..].iter_mut().zip(src).enumerate() {
        let t = (i + 1) as f32 / (overlap as f32 + 1.0);
        *left = *left * (1.0 - t) + right * t;
    }
    dst.extend_from_slice(&src[overlap..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engines::kokoro::vocab::test_vocab;

    const PUNCT: &[i64] = &[1, 2, 3, 4, 5, 6];

    fn model_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in files {
            std::fs::write(dir.path().join(name), b"").expect("write fixture");
        }
        dir
    }

    #[test]
    fn short_sequences_are_a_single_chunk() {
        let ids: Vec<i64> = (0..100).map(|i| 50 + i % 10).collect();
        assert_eq!(split_chunks(&ids, PUNCT), vec![ids.clone()]);
    }

    #[test]
    fn long_sequences_split_after_last_punctuation() {
        let mut ids = vec![50i64; MAX_PHONEME_LEN + 100];
        ids[300] = 4; // '.'
        let chunks = split_chunks(&ids, PUNCT);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 301);
        assert_eq!(chunks[0].last(), Some(&4));
        assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), ids.len());
    }

    #[test]
    fn long_sequences_without_punctuation_split_at_limit() {
        let ids = vec![50i64; MAX_PHONEME_LEN * 2 + 1];
        let chunks = split_chunks(&ids, PUNCT);
        let lens: Vec<usize> = chunks.iter().map(Vec::len).collect();
        assert_eq!(lens, vec![MAX_PHONEME_LEN, MAX_PHONEME_LEN, 1]);
    }

    #[test]
    fn boundary_ids_come_from_the_loaded_vocab() {
        let mut vocab = test_vocab();
        vocab.insert('.', 99);
        let ids = boundary_ids(&vocab);
        assert!(ids.contains(&99));
        assert!(!ids.contains(&4));
    }

    #[test]
    fn crossfade_overlaps_tail_and_head() {
        let mut dst = vec![1.0f32; 10];
        append_with_crossfade(&mut dst, &[0.0f32; 10], 4);
        assert_eq!(dst.len(), 16);
        assert_eq!(dst[5], 1.0);
        assert!(dst[6] < 1.0 && dst[6] > dst[9]);
        assert_eq!(dst[15], 0.0);
    }

    #[test]
    fn crossfade_into_empty_buffer_appends() {
        let mut dst = Vec::new();
        append_with_crossfade(&mut dst, &[0.5f32, 0.25], 240);
        assert_eq!(dst, vec![0.5, 0.25]);
    }

    #[test]
    fn integer_speed_collapses_dynamic_range() {
        assert_eq!(SpeedInput::as_int(1.1), 1);
        assert_eq!(SpeedInput::as_int(0.88), 1);
        assert_eq!(SpeedInput::as_int(2.0), 2);
        assert!(!SpeedInput::Int32.is_fractional());
        assert!(SpeedInput::Float32.is_fractional());
    }

    #[test]
    fn locates_zh_files_first() {
        let dir = model_dir(&[
            "kokoro-v1.1-zh.onnx",
            "kokoro-quant-convinteger.onnx",
            "voices-v1.0.bin",
            "voices-v1.1-zh.bin",
            "config.json",
        ]);
        let files = ModelFiles::locate(dir.path()).expect("complete directory");
        assert_eq!(files.onnx, dir.path().join("kokoro-v1.1-zh.onnx"));
        assert_eq!(files.voices, dir.path().join("voices-v1.1-zh.bin"));
        assert_eq!(files.lexicon, None);
    }

    #[test]
    fn falls_back_to_any_onnx_and_finds_lexicon() {
        let dir = model_dir(&[
            "model_b.onnx",
            "model_a.onnx",
            "voices-v1.0.bin",
            "config.json",
            "lexicon.json",
        ]);
        let files = ModelFiles::locate(dir.path()).expect("complete directory");
        assert_eq!(files.onnx, dir.path().join("model_a.onnx"));
        assert_eq!(files.lexicon, Some(dir.path().join("lexicon.json")));
    }

    #[test]
    fn missing_config_json_is_an_error() {
        let dir = model_dir(&["kokoro-v1.1-zh.onnx", "voices-v1.1-zh.bin"]);
        let err = ModelFiles::locate(dir.path()).expect_err("config.json is required");
        assert!(err.to_string().contains("config.json"));
    }

    #[test]
    fn missing_voices_is_an_error() {
        let dir = model_dir(&["kokoro-v1.1-zh.onnx", "config.json"]);
        assert!(ModelFiles::locate(dir.path()).is_err());
    }
}
