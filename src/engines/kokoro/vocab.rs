//! Phoneme vocabulary loading.
//!
//! Kokoro releases ship different symbol tables (the v1.1 Mandarin export adds
//! zhuyin and tone symbols), so the vocab always comes from the model's own
//! `config.json`. There is no built-in table to fall back on.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use super::model::KokoroError;

#[derive(Debug, Deserialize)]
struct ModelConfig {
    vocab: Option<HashMap<String, i64>>,
    n_token: Option<i64>,
}

/// Load the phoneme vocabulary from a model's `config.json`.
///
/// Keys must be single characters and ids must be non-negative. When the
/// config declares `n_token`, every id must fall below it.
pub fn load_vocab(config_path: &Path) -> Result<HashMap<char, i64>, KokoroError> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        KokoroError::Config(format!(
            "cannot read {}: {e}. The model's config.json is required",
            config_path.display()
        ))
    })?;
    parse_vocab(&content)
}

fn parse_vocab(content: &str) -> Result<HashMap<char, i64>, KokoroError> {
    let config: ModelConfig = serde_json::from_str(content)
        .map_err(|e| KokoroError::Config(format!("Failed to parse JSON: {e}")))?;
    let raw = config
        .vocab
        .ok_or_else(|| KokoroError::Config("Missing 'vocab' field".to_string()))?;
    if raw.is_empty() {
        return Err(KokoroError::Config("'vocab' is empty".to_string()));
    }

    let mut vocab = HashMap::with_capacity(raw.len());
    for (key, id) in raw {
        let mut chars = key.chars();
        let (Some(ch), None) = (chars.next(), chars.next()) else {
            return Err(KokoroError::Config(format!(
                "vocab key {key:?} is not a single character"
            )));
        };
        let in_range = id >= 0 && config.n_token.map_or(true, |n| id < n);
        if !in_range {
            return Err(KokoroError::Config(format!(
                "vocab id {id} for {key:?} is out of range"
            )));
        }
        vocab.insert(ch, id);
    }

    Ok(vocab)
}

/// The subset of the v1.0 symbol table that unit tests need.
#[cfg(test)]
pub(crate) fn test_vocab() -> HashMap<char, i64> {
    [
        (';', 1),
        (':', 2),
        (',', 3),
        ('.', 4),
        ('!', 5),
        ('?', 6),
        ('(', 12),
        (')', 13),
        (' ', 16),
        ('O', 31),
        ('a', 43),
        ('e', 47),
        ('i', 51),
        ('k', 53),
        ('l', 54),
        ('m', 55),
        ('n', 56),
        ('o', 57),
        ('s', 61),
        ('t', 62),
        ('w', 65),
        ('ə', 83),
        ('ɹ', 123),
        ('ʌ', 138),
        ('ˈ', 156),
    ]
    .into_iter()
    .collect()
}
