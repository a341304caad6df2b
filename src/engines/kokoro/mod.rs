//! Kokoro-82M text-to-speech engine implementation.
//!
//! Runs the Kokoro-82M ONNX model through ONNX Runtime, with espeak-ng for
//! phonemization. The studio ships the Mandarin v1.1-zh voices, but any
//! Kokoro voice archive works.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! # Model Directory Layout
//!
//! ```text
//! models/kokoro-v1.1-zh/
//! ├── kokoro-v1.1-zh.onnx             # or any other .onnx export
//! ├── voices-v1.1-zh.bin              # or voices-v1.0.bin (.npz format)
//! ├── config.json                     # required, provides `vocab`
//! └── lexicon.json                    # optional, word → IPA overrides
//! ```
//!
//! Latin words inside Mandarin text are phonemized as American English.
//!
//! # Language Support
//!
//! | Voice prefix | Language | espeak-ng code |
//! |---|---|---|
//! | `zf_`, `zm_` | Mandarin Chinese | `cmn` |
//! | `af_`, `am_` | American English | `en-us` |
//! | `bf_`, `bm_` | British English | `en-gb` |
//! | `ef_`, `em_` | Spanish | `es` |
//! | `ff_` | French | `fr` |
//! | `hf_`, `hm_` | Hindi | `hi` |
//! | `if_`, `im_` | Italian | `it` |
//! | `jf_`, `jm_` | Japanese | `ja` |
//! | `pf_`, `pm_` | Brazilian Portuguese | `pt-br` |
//!
//! # Example
//!
//! ```rust,no_run
//! use tts_studio::{SpeedPolicy, SynthesisEngine, engines::kokoro::{KokoroEngine, KokoroInferenceParams}};
//! use std::path::PathBuf;
//!
//! let mut engine = KokoroEngine::new();
//! engine.load_model(&PathBuf::from("models/kokoro-v1.1-zh"))?;
//!
//! let params = KokoroInferenceParams {
//!     voice: "zm_002".to_string(),
//!     speed: SpeedPolicy::Dynamic,
//!     ..Default::default()
//! };
//!
//! engine.synthesize_to_file("我叫Kokoro。", &PathBuf::from("out.wav"), Some(params))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;
pub mod lexicon;
pub mod model;
pub mod phonemizer;
pub mod vocab;
pub mod voices;

pub use engine::{KokoroEngine, KokoroInferenceParams, KokoroModelParams};
pub use lexicon::Lexicon;
pub use model::{KokoroError, ModelFiles, SpeedInput};
pub use phonemizer::EspeakConfig;
