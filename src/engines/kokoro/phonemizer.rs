use std::borrow::Cow;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::lexicon::Lexicon;
use super::model::KokoroError;

/// Location of the espeak-ng binary and its data directory.
///
/// Both default to `None`, meaning `espeak-ng` is resolved from PATH and uses
/// its compiled-in data path.
#[derive(Debug, Clone, Default)]
pub struct EspeakConfig {
    pub bin_path: Option<PathBuf>,
    pub data_path: Option<PathBuf>,
}

impl EspeakConfig {
    fn command(&self) -> Command {
        let mut cmd = match &self.bin_path {
            Some(bin) => Command::new(bin),
            None => Command::new("espeak-ng"),
        };
        if let Some(data) = &self.data_path {
            cmd.env("ESPEAK_DATA_PATH", data);
        }
        cmd
    }
}

/// Map a voice name prefix to an espeak-ng language code.
///
/// Voice names follow the pattern `{prefix}_{name}` where the two-character
/// prefix encodes the language.
pub fn voice_lang(voice: &str) -> &'static str {
    let prefix = voice.get(..2).unwrap_or(voice);
    match prefix {
        "af" | "am" => "en-us",
        "bf" | "bm" => "en-gb",
        "ef" | "em" => "es",
        "ff" => "fr",
        "hf" | "hm" => "hi",
        "if" | "im" => "it",
        "jf" | "jm" => "ja",
        "pf" | "pm" => "pt-br",
        "zf" | "zm" => "cmn",
        _ => "en-us",
    }
}

/// Language used for Latin words embedded in non-Latin text.
pub const EMBEDDED_LATIN_LANG: &str = "en-us";

/// Convert text to Kokoro phoneme token IDs via espeak-ng.
///
/// # Arguments
/// - `text`: The input text to phonemize
/// - `lang`: espeak-ng language code (e.g. `"cmn"`, `"en-us"`, `"ja"`)
/// - `vocab`: Mapping from IPA characters to token IDs
/// - `lexicon`: Word overrides that bypass espeak-ng
/// - `espeak`: Which espeak-ng to run
///
/// For Mandarin, Latin words that are not in the lexicon are phonemized with
/// `en-us` in a separate batch instead of letting espeak-ng switch languages
/// mid-line.
///
/// # Returns
/// A `Vec<i64>` of token IDs. Characters not in the vocab are silently dropped.
pub fn phonemize(
    text: &str,
    lang: &str,
    vocab: &HashMap<char, i64>,
    lexicon: &Lexicon,
    espeak: &EspeakConfig,
) -> Result<Vec<i64>, KokoroError> {
    let mut parts = apply_lexicon(split_text_parts(text), lexicon);
    if separates_latin_words(lang) {
        parts = split_latin_words(parts);
    }
    if parts.is_empty() {
        return Ok(Vec::new());
    }

    let native_ids = phonemize_parts(&parts, lang, vocab, espeak, |part| match part {
        TextPart::Text(segment) => Some(segment.as_str()),
        _ => None,
    })?;
    let latin_ids = phonemize_parts(&parts, EMBEDDED_LATIN_LANG, vocab, espeak, |part| {
        match part {
            TextPart::Latin(word) => Some(word.as_str()),
            _ => None,
        }
    })?;

    let mut native = native_ids.into_iter();
    let mut latin = latin_ids.into_iter();
    let mut ids = Vec::new();
    for part in parts {
        match part {
            TextPart::Text(_) => ids.extend(native.next().unwrap_or_default()),
            TextPart::Latin(_) => ids.extend(latin.next().unwrap_or_default()),
            TextPart::Punct(ch) => {
                if let Some(&id) = vocab.get(&ch) {
                    ids.push(id);
                }
            }
            TextPart::Ipa(ipa) => ids.extend(ipa_to_ids(&ipa, vocab)),
        }
    }

    Ok(ids)
}

fn separates_latin_words(lang: &str) -> bool {
    lang == "cmn"
}

/// Phonemize the parts picked by `select` with one batched espeak-ng call.
fn phonemize_parts<'a>(
    parts: &'a [TextPart],
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &EspeakConfig,
    select: impl Fn(&'a TextPart) -> Option<&'a str>,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let segments: Vec<&str> = parts.iter().filter_map(select).collect();
    if segments.is_empty() {
        return Ok(Vec::new());
    }
    phonemize_segments_batch(&segments, lang, vocab, espeak)
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TextPart {
    Text(String),
    Punct(char),
    /// Pre-phonemized IPA from the lexicon.
    Ipa(String),
    /// A Latin word inside non-Latin text.
    Latin(String),
}

fn split_text_parts(text: &str) -> Vec<TextPart> {
    let mut parts = Vec::new();
    let mut current = String::new();

    for (idx, ch) in text.char_indices() {
        let ch_len = ch.len_utf8();
        if let Some(punct) = map_boundary_punctuation(ch) {
            if !is_numeric_connector_between_digits(text, idx, ch_len, ch) {
                flush_text_part(&mut parts, &mut current);
                parts.push(TextPart::Punct(punct));
                continue;
            }
        }

        if ch.is_whitespace() {
            if !current.is_empty() && !current.ends_with(' ') {
                current.push(' ');
            }
            continue;
        }

        current.push(ch);
    }

    flush_text_part(&mut parts, &mut current);
    parts
}

fn flush_text_part(parts: &mut Vec<TextPart>, current: &mut String) {
    let trimmed = current.trim();
    if trimmed.is_empty() {
        current.clear();
        return;
    }
    parts.push(TextPart::Text(trimmed.to_string()));
    current.clear();
}

/// Sentence-level punctuation. Full-width CJK marks fold to their ASCII
/// counterparts so they land on the same vocab ids.
fn map_boundary_punctuation(ch: char) -> Option<char> {
    match ch {
        '.' | '!' | '?' | ',' | ';' | ':' | '—' | '…' | '"' | '(' | ')' | '\u{201c}'
        | '\u{201d}' => Some(ch),
        '。' => Some('.'),
        '，' | '、' => Some(','),
        '！' => Some('!'),
        '？' => Some('?'),
        '；' => Some(';'),
        '：' => Some(':'),
        '（' => Some('('),
        '）' => Some(')'),
        '\n' | '\r' => Some('.'),
        _ => None,
    }
}

fn is_numeric_connector_between_digits(text: &str, idx: usize, ch_len: usize, ch: char) -> bool {
    if !matches!(ch, '.' | ',') {
        return false;
    }

    let prev = text[..idx].chars().next_back();
    let next = text[idx + ch_len..].chars().next();

    matches!(
        (prev, next),
        (Some(left), Some(right)) if left.is_ascii_digit() && right.is_ascii_digit()
    )
}

fn apply_lexicon(parts: Vec<TextPart>, lexicon: &Lexicon) -> Vec<TextPart> {
    if lexicon.is_empty() {
        return parts;
    }
    split_ascii_words(parts, |word| {
        lexicon
            .lookup(word)
            .map(|ipa| TextPart::Ipa(ipa.to_string()))
    })
}

/// Pull runs containing an ASCII letter out of the surrounding text.
/// Digit-only runs stay in place so numbers are read in the text's language.
fn split_latin_words(parts: Vec<TextPart>) -> Vec<TextPart> {
    split_ascii_words(parts, |word| {
        word.bytes()
            .any(|b| b.is_ascii_alphabetic())
            .then(|| TextPart::Latin(word.to_string()))
    })
}

/// Replace ASCII alphanumeric runs inside text parts with whatever `classify`
/// returns for them. Runs it returns `None` for stay in the text.
///
/// Segments coming from [`split_text_parts`] only contain single spaces, which
/// are kept as `' '` punctuation around a replaced word.
fn split_ascii_words(
    parts: Vec<TextPart>,
    classify: impl Fn(&str) -> Option<TextPart>,
) -> Vec<TextPart> {
    let mut out = Vec::with_capacity(parts.len());
    for part in parts {
        let TextPart::Text(segment) = part else {
            out.push(part);
            continue;
        };

        let mut plain_start = 0;
        let mut chars = segment.char_indices().peekable();
        while let Some((start, ch)) = chars.next() {
            if !ch.is_ascii_alphanumeric() {
                continue;
            }
            let mut end = start + ch.len_utf8();
            while let Some(&(idx, next)) = chars.peek() {
                if !next.is_ascii_alphanumeric() {
                    break;
                }
                end = idx + next.len_utf8();
                chars.next();
            }

            if let Some(replacement) = classify(&segment[start..end]) {
                push_plain(&segment[plain_start..start], &mut out);
                out.push(replacement);
                plain_start = end;
            }
        }
        push_plain(&segment[plain_start..], &mut out);
    }
    out
}

fn push_plain(text: &str, out: &mut Vec<TextPart>) {
    if text.is_empty() {
        return;
    }
    if text.starts_with(' ') && !out.is_empty() {
        out.push(TextPart::Punct(' '));
    }
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(TextPart::Text(trimmed.to_string()));
        if text.ends_with(' ') {
            out.push(TextPart::Punct(' '));
        }
    }
}

fn phonemize_segments_batch(
    segments: &[&str],
    lang: &str,
    vocab: &HashMap<char, i64>,
    espeak: &EspeakConfig,
) -> Result<Vec<Vec<i64>>, KokoroError> {
    let batched_input = segments.join("\n");
    let output = run_espeak(&batched_input, lang, espeak)?;
    let lines: Vec<&str> = output.lines().collect();

    // espeak-ng should emit one line per input line for stdin mode.
    // If this assumption breaks, fall back to per-segment invocation.
    if lines.len() != segments.len() {
        log::debug!(
            "espeak-ng returned {} lines for {} segments, phonemizing one by one",
            lines.len(),
            segments.len()
        );
        return segments
            .iter()
            .map(|segment| {
                let output = run_espeak(segment, lang, espeak)?;
                Ok(ipa_to_ids(&output, vocab))
            })
            .collect();
    }

    Ok(lines.iter().map(|line| ipa_to_ids(line, vocab)).collect())
}

fn run_espeak(input: &str, lang: &str, espeak: &EspeakConfig) -> Result<String, KokoroError> {
    let mut child = espeak
        .command()
        .args(["--ipa", "--stdin", "-q", "-v", lang])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                KokoroError::EspeakNotFound
            } else {
                KokoroError::Io(e)
            }
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        // espeak-ng reads stdin line by line; an unterminated last line can
        // lose its final token.
        let stdin_payload = canonicalize_espeak_stdin_payload(input);
        stdin
            .write_all(stdin_payload.as_bytes())
            .map_err(KokoroError::Io)?;
    }

    let output = child.wait_with_output().map_err(KokoroError::Io)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(KokoroError::PhonemizerFailed(format!(
            "espeak-ng exited with code {:?}: {stderr}",
            output.status.code()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn canonicalize_espeak_stdin_payload(input: &str) -> Cow<'_, str> {
    if input.ends_with('\n') {
        Cow::Borrowed(input)
    } else {
        Cow::Owned(format!("{input}\n"))
    }
}

/// Map espeak-ng IPA output to token IDs.
///
/// Language-switch flags such as `(en)` or `(cmn)` are dropped: every `(` or
/// `)` in the input text was split off as punctuation before espeak-ng ran,
/// so any bracket in its output belongs to a flag.
fn ipa_to_ids(ipa: &str, vocab: &HashMap<char, i64>) -> Vec<i64> {
    let mut ids = Vec::new();
    for line in ipa.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut in_flag = false;
        for ch in line.chars() {
            match ch {
                '(' => in_flag = true,
                ')' => in_flag = false,
                _ if in_flag || ch == '_' => {}
                _ => {
                    if let Some(&id) = vocab.get(&ch) {
                        ids.push(id);
                    }
                }
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::{
        apply_lexicon, canonicalize_espeak_stdin_payload, ipa_to_ids, phonemize, run_espeak,
        split_latin_words, split_text_parts, voice_lang, EspeakConfig, TextPart,
    };
    use crate::engines::kokoro::lexicon::Lexicon;
    use crate::engines::kokoro::vocab::test_vocab;
    use std::process::Command;

    fn espeak_available() -> bool {
        Command::new("espeak-ng").arg("--version").output().is_ok()
    }

    #[test]
    fn mandarin_voices_use_cmn() {
        assert_eq!(voice_lang("zf_001"), "cmn");
        assert_eq!(voice_lang("zm_010"), "cmn");
        assert_eq!(voice_lang("bf_emma"), "en-gb");
        assert_eq!(voice_lang("x"), "en-us");
    }

    #[test]
    fn splits_text_and_punctuation_parts() {
        let parts = split_text_parts("Hello, world. Testing!");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Hello".to_string()),
                TextPart::Punct(','),
                TextPart::Text("world".to_string()),
                TextPart::Punct('.'),
                TextPart::Text("Testing".to_string()),
                TextPart::Punct('!'),
            ]
        );
    }

    #[test]
    fn folds_full_width_punctuation() {
        let parts = split_text_parts("你好，世界。");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("你好".to_string()),
                TextPart::Punct(','),
                TextPart::Text("世界".to_string()),
                TextPart::Punct('.'),
            ]
        );
    }

    #[test]
    fn keeps_decimal_and_thousands_separators_inside_text() {
        let parts = split_text_parts("Version 2.0 reached 1,000 users.");
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Version 2.0 reached 1,000 users".to_string()),
                TextPart::Punct('.'),
            ]
        );
    }

    #[test]
    fn lexicon_words_become_ipa_with_spacing() {
        let parts = apply_lexicon(split_text_parts("I am Kokoro now"), &Lexicon::builtin());
        assert_eq!(
            parts,
            vec![
                TextPart::Text("I am".to_string()),
                TextPart::Punct(' '),
                TextPart::Ipa("kˈOkəɹO".to_string()),
                TextPart::Punct(' '),
                TextPart::Text("now".to_string()),
            ]
        );
    }

    #[test]
    fn lexicon_words_inside_cjk_text() {
        let parts = apply_lexicon(split_text_parts("我叫Kokoro。"), &Lexicon::builtin());
        assert_eq!(
            parts,
            vec![
                TextPart::Text("我叫".to_string()),
                TextPart::Ipa("kˈOkəɹO".to_string()),
                TextPart::Punct('.'),
            ]
        );
    }

    #[test]
    fn lexicon_matches_whole_words_only() {
        let parts = apply_lexicon(split_text_parts("Solar Sol"), &Lexicon::builtin());
        assert_eq!(
            parts,
            vec![
                TextPart::Text("Solar".to_string()),
                TextPart::Punct(' '),
                TextPart::Ipa("sˈOl".to_string()),
            ]
        );
    }

    #[test]
    fn ipa_to_ids_skips_unknown_and_separators() {
        let vocab = test_vocab();
        let ids = ipa_to_ids("kˈO_k\u{2603}", &vocab);
        assert_eq!(ids, vec![53, 156, 31, 53]);
    }

    #[test]
    fn ipa_to_ids_drops_language_flags() {
        let vocab = test_vocab();
        assert_eq!(
            ipa_to_ids("(en)ɹˈʌst(cmn)", &vocab),
            vec![123, 156, 138, 61, 62]
        );
        assert!(!ipa_to_ids("wˈo (en)ɹˈʌst(cmn)", &vocab)
            .iter()
            .any(|id| *id == 12 || *id == 13));
    }

    #[test]
    fn latin_words_split_out_of_cjk_text() {
        let parts = split_latin_words(split_text_parts("我用Rust写了2个demo app"));
        assert_eq!(
            parts,
            vec![
                TextPart::Text("我用".to_string()),
                TextPart::Latin("Rust".to_string()),
                TextPart::Text("写了2个".to_string()),
                TextPart::Latin("demo".to_string()),
                TextPart::Punct(' '),
                TextPart::Latin("app".to_string()),
            ]
        );
    }

    #[test]
    fn lexicon_words_are_not_treated_as_latin() {
        let parts = split_latin_words(apply_lexicon(
            split_text_parts("我叫Kokoro"),
            &Lexicon::builtin(),
        ));
        assert_eq!(
            parts,
            vec![
                TextPart::Text("我叫".to_string()),
                TextPart::Ipa("kˈOkəɹO".to_string()),
            ]
        );
    }

    /// Writes a stand-in espeak-ng that logs `lang:line` for every input line
    /// and answers `ɹˈʌst` for English and `wˈo` otherwise.
    #[cfg(unix)]
    fn fake_espeak(dir: &std::path::Path) -> (EspeakConfig, std::path::PathBuf) {
        use std::os::unix::fs::PermissionsExt;

        let log = dir.join("calls.log");
        let script = dir.join("espeak-ng");
        let body = format!(
            "#!/bin/sh\n\
             lang=\"$5\"\n\
             while IFS= read -r line; do\n\
             echo \"$lang:$line\" >> '{}'\n\
             if [ \"$lang\" = en-us ]; then echo 'ɹˈʌst'; else echo 'wˈo'; fi\n\
             done\n",
            log.display()
        );
        std::fs::write(&script, body).expect("write script");
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755))
            .expect("chmod script");
        let espeak = EspeakConfig {
            bin_path: Some(script),
            data_path: None,
        };
        (espeak, log)
    }

    #[cfg(unix)]
    #[test]
    fn mandarin_routes_latin_words_to_english() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (espeak, log) = fake_espeak(dir.path());

        let ids = phonemize("我爱Rust", "cmn", &test_vocab(), &Lexicon::builtin(), &espeak)
            .expect("fake espeak succeeds");
        assert_eq!(ids, vec![65, 156, 57, 123, 156, 138, 61, 62]);

        let calls = std::fs::read_to_string(log).expect("read call log");
        let calls: Vec<&str> = calls.lines().collect();
        assert_eq!(calls, vec!["cmn:我爱", "en-us:Rust"]);
    }

    #[cfg(unix)]
    #[test]
    fn english_voices_keep_latin_words_inline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (espeak, log) = fake_espeak(dir.path());

        phonemize("hello Rust", "en-us", &test_vocab(), &Lexicon::default(), &espeak)
            .expect("fake espeak succeeds");
        let calls = std::fs::read_to_string(log).expect("read call log");
        assert_eq!(calls.trim(), "en-us:hello Rust");
    }

    #[test]
    fn lexicon_only_input_needs_no_espeak() {
        let vocab = test_vocab();
        let espeak = EspeakConfig {
            bin_path: Some("/nonexistent/espeak-ng".into()),
            data_path: None,
        };
        let ids = phonemize("Kokoro!", "cmn", &vocab, &Lexicon::builtin(), &espeak)
            .expect("no espeak call should be made");
        assert_eq!(ids.last(), Some(&5));
        assert_eq!(ids.first(), Some(&53));
    }

    #[test]
    fn missing_espeak_binary_is_reported() {
        let espeak = EspeakConfig {
            bin_path: Some("/nonexistent/espeak-ng".into()),
            data_path: None,
        };
        assert!(matches!(
            run_espeak("hello", "en-us", &espeak),
            Err(crate::engines::kokoro::KokoroError::EspeakNotFound)
        ));
    }

    #[test]
    fn appends_trailing_newline_for_espeak_stdin() {
        assert_eq!(canonicalize_espeak_stdin_payload("America"), "America\n");
        assert_eq!(canonicalize_espeak_stdin_payload("America\n"), "America\n");
    }

    #[test]
    fn espeak_output_is_stable_with_or_without_trailing_newline() {
        if !espeak_available() {
            return;
        }

        let espeak = EspeakConfig::default();
        let without_newline =
            run_espeak("America", "en-us", &espeak).expect("espeak should succeed");
        let with_newline =
            run_espeak("America\n", "en-us", &espeak).expect("espeak should succeed");
        assert_eq!(without_newline.trim(), with_newline.trim());
    }

    #[test]
    fn phonemize_keeps_terminal_schwa_for_america() {
        if !espeak_available() {
            return;
        }

        let vocab = test_vocab();
        let ids = phonemize(
            "America",
            "en-us",
            &vocab,
            &Lexicon::default(),
            &EspeakConfig::default(),
        )
        .expect("phonemize should succeed");
        let schwa_id = *vocab
            .get(&'ə')
            .expect("vocab should include schwa");
        assert_eq!(ids.last(), Some(&schwa_id));
    }
}
