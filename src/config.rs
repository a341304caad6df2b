//! Studio configuration.
//!
//! Nothing is persisted: the binary starts from [`StudioConfig::default`], and
//! embedders can adjust it with [`StudioConfigBuilder`].

use std::path::PathBuf;
use std::time::Duration;

use derive_builder::Builder;

use crate::speed::SpeedPolicy;

/// Default location of the Kokoro v1.1-zh model directory.
pub const DEFAULT_MODEL_DIR: &str = "models/kokoro-v1.1-zh";

/// Default interval at which the UI drains the worker queue.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Builder)]
#[builder(default, build_fn(error = "crate::error::StudioError"))]
pub struct StudioConfig {
    /// Directory holding the `.onnx` model and `voices-v1.0.bin`.
    #[builder(setter(into))]
    pub model_dir: PathBuf,
    /// ORT intra/inter thread count. `None` uses the ORT default.
    #[builder(setter(strip_option))]
    pub num_threads: Option<usize>,
    /// Where to cache the optimized ONNX graph between launches.
    #[builder(setter(into, strip_option))]
    pub optimized_model_cache_path: Option<PathBuf>,
    /// Explicit espeak-ng binary. `None` resolves `espeak-ng` from PATH.
    #[builder(setter(into, strip_option))]
    pub espeak_bin: Option<PathBuf>,
    /// Explicit espeak-ng data directory.
    #[builder(setter(into, strip_option))]
    pub espeak_data: Option<PathBuf>,
    pub speed: SpeedPolicy,
    pub poll_interval: Duration,
    #[builder(setter(into))]
    pub window_title: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            num_threads: None,
            optimized_model_cache_path: None,
            espeak_bin: None,
            espeak_data: None,
            speed: SpeedPolicy::Dynamic,
            poll_interval: DEFAULT_POLL_INTERVAL,
            window_title: "Kokoro Speech Studio".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_dynamic_speed_and_100ms_poll() {
        let config = StudioConfig::default();
        assert_eq!(config.speed, SpeedPolicy::Dynamic);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
        assert_eq!(config.model_dir, PathBuf::from(DEFAULT_MODEL_DIR));
    }

    #[test]
    fn builder_overrides_only_given_fields() {
        let config = StudioConfigBuilder::default()
            .model_dir("/opt/kokoro")
            .num_threads(2)
            .build()
            .expect("builder should succeed");
        assert_eq!(config.model_dir, PathBuf::from("/opt/kokoro"));
        assert_eq!(config.num_threads, Some(2));
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
        assert!(config.espeak_bin.is_none());
    }
}
