use std::path::PathBuf;
use std::time::Instant;

use tts_studio::{
    engines::kokoro::{KokoroEngine, KokoroInferenceParams, KokoroModelParams},
    SpeedPolicy, SynthesisEngine, Voice,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut engine = KokoroEngine::new();
    let model_path = PathBuf::from("models/kokoro-v1.1-zh");

    let load_start = Instant::now();
    engine.load_model_with_params(&model_path, KokoroModelParams::default())?;
    println!("Model loaded in {:.2?}", load_start.elapsed());

    let missing: Vec<String> = Voice::all()
        .map(|v| v.id())
        .filter(|id| !engine.has_voice(id))
        .collect();
    println!("Catalog voices missing from archive: {missing:?}");

    let text = "你好！我叫Kokoro，是一个支持中文的语音合成模型。\
                这段话比较长，所以语速会自动放慢一点。";

    let params = KokoroInferenceParams {
        voice: Voice::default().id(),
        speed: SpeedPolicy::Dynamic,
        ..Default::default()
    };

    let synth_start = Instant::now();
    let result = engine.synthesize(text, Some(params.clone()))?;
    let synth_dur = synth_start.elapsed();

    let speedup = result.duration_secs() / synth_dur.as_secs_f64();
    println!(
        "Synthesized {:.2}s audio in {:.2?} ({:.1}x real-time)",
        result.duration_secs(),
        synth_dur,
        speedup
    );

    engine.synthesize_to_file(text, &PathBuf::from("output.wav"), Some(params))?;
    println!("Saved to output.wav");

    engine.unload_model();
    Ok(())
}
