use std::collections::HashMap;
use std::path::Path;

use super::model::KokoroError;

/// Word → IPA overrides applied before espeak-ng sees the text.
///
/// Lookups are exact and case-sensitive. Only runs of ASCII letters and
/// digits are considered words, so overrides target Latin words embedded
/// in otherwise non-Latin text.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize)]
#[serde(transparent)]
pub struct Lexicon {
    entries: HashMap<String, String>,
}

impl Lexicon {
    /// The pronunciations espeak-ng gets wrong for this model.
    pub fn builtin() -> Self {
        let mut lexicon = Self::default();
        lexicon.insert("Kokoro", "kˈOkəɹO");
        lexicon.insert("Sol", "sˈOl");
        lexicon
    }

    /// Load overrides from a JSON object of `"word": "ipa"` pairs.
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| KokoroError::Config(format!("Failed to parse {}: {e}", path.display())))
    }

    pub fn insert(&mut self, word: impl Into<String>, ipa: impl Into<String>) {
        self.entries.insert(word.into(), ipa.into());
    }

    /// Merge `other` into `self`; entries in `other` win.
    pub fn extend(&mut self, other: Lexicon) {
        self.entries.extend(other.entries);
    }

    pub fn lookup(&self, word: &str) -> Option<&str> {
        self.entries.get(word).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Lexicon;
    use std::io::Write;

    #[test]
    fn builtin_knows_kokoro() {
        let lexicon = Lexicon::builtin();
        assert_eq!(lexicon.lookup("Kokoro"), Some("kˈOkəɹO"));
        assert_eq!(lexicon.lookup("kokoro"), None);
    }

    #[test]
    fn loaded_entries_override_builtin() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"Sol": "sˈɔl", "Rust": "ɹˈʌst"}}"#).expect("write");

        let mut lexicon = Lexicon::builtin();
        lexicon.extend(Lexicon::load(file.path()).expect("lexicon should parse"));

        assert_eq!(lexicon.len(), 3);
        assert_eq!(lexicon.lookup("Sol"), Some("sˈɔl"));
        assert_eq!(lexicon.lookup("Rust"), Some("ɹˈʌst"));
    }

    #[test]
    fn rejects_non_string_values() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"Sol": 3}}"#).expect("write");
        assert!(Lexicon::load(file.path()).is_err());
    }
}
