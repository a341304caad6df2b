use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::model::{KokoroError, STYLE_DIM};

/// Storage for all loaded voice style vectors.
///
/// Each voice is a list of 256-float style vectors indexed by phoneme token
/// count.
pub struct VoiceStore {
    voices: HashMap<String, Vec<[f32; STYLE_DIM]>>,
}

impl VoiceStore {
    /// Load all voices from a .npz (numpy zip) file.
    ///
    /// The file should be a standard .npz archive where each entry is a
    /// .npy file named after the voice (e.g., `af_heart.npy`).
    pub fn load(path: &Path) -> Result<Self, KokoroError> {
        let file = File::open(path)?;
        let mut zip = zip::ZipArchive::new(file)
            .map_err(|e| KokoroError::VoiceParse(format!("Failed to open zip archive: {e}")))?;

        let mut voices = HashMap::new();

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|e| {
                KokoroError::VoiceParse(format!("Failed to read zip entry {i}: {e}"))
            })?;

            let raw_name = entry.name().to_string();
            // Voice name is the entry name without the .npy extension
            let voice_name = raw_name
                .trim_end_matches('/')
                .trim_end_matches(".npy")
                .to_string();

            if voice_name.is_empty() || raw_name.ends_with('/') {
                continue;
            }

            let mut data = Vec::new();
            entry
                .read_to_end(&mut data)
                .map_err(|e| KokoroError::VoiceParse(format!("Failed to read {raw_name}: {e}")))?;

            let style_vectors = parse_npy(&data, &raw_name)?;
            voices.insert(voice_name, style_vectors);
        }

        log::info!("Loaded {} voices", voices.len());
        Ok(Self { voices })
    }

    /// Get the style vector for a voice at the given index.
    ///
    /// The index is clamped to the valid range, so any index is safe.
    pub fn get_style(&self, voice: &str, idx: usize) -> Result<[f32; STYLE_DIM], KokoroError> {
        let styles = self
            .voices
            .get(voice)
            .ok_or_else(|| KokoroError::VoiceNotFound(voice.to_string()))?;

        let clamped = idx.min(styles.len().saturating_sub(1));
        Ok(styles[clamped])
    }

    pub fn contains(&self, voice: &str) -> bool {
        self.voices.contains_key(voice)
    }

    /// List all available voice names in sorted order.
    pub fn list_voices(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.voices.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// Parse a numpy .npy file into a list of style vectors.
///
/// Expects a 2D float32 array of shape `[N, 256]` in little-endian format.
fn parse_npy(data: &[u8], name: &str) -> Result<Vec<[f32; STYLE_DIM]>, KokoroError> {
    // Verify numpy magic bytes: \x93NUMPY
    if data.len() < 10 {
        return Err(KokoroError::VoiceParse(format!(
            "{name}: file too short ({} bytes)",
            data.len()
        )));
    }

    if &data[0..6] != b"\x93NUMPY" {
        return Err(KokoroError::VoiceParse(format!(
            "{name}: invalid numpy magic bytes"
        )));
    }

    // major version at [6], minor at [7], header_len at [8..10] (little-endian u16)
    let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
    let data_offset = 10 + header_len;

    if data.len() < data_offset {
        return Err(KokoroError::VoiceParse(format!(
            "{name}: header truncated (need {data_offset} bytes, got {})",
            data.len()
        )));
    }

    let float_data = &data[data_offset..];
    if float_data.len() % 4 != 0 {
        return Err(KokoroError::VoiceParse(format!(
            "{name}: float data length {} is not a multiple of 4",
            float_data.len()
        )));
    }

    let n_floats = float_data.len() / 4;
    if n_floats == 0 {
        return Err(KokoroError::VoiceParse(format!("{name}: no style vectors")));
    }
    if n_floats % STYLE_DIM != 0 {
        return Err(KokoroError::VoiceParse(format!(
            "{name}: float count {n_floats} is not a multiple of {STYLE_DIM} (style vector dim)"
        )));
    }

    let result = float_data
        .chunks_exact(STYLE_DIM * 4)
        .map(|row| {
            let mut vec = [0f32; STYLE_DIM];
            for (dst, bytes) in vec.iter_mut().zip(row.chunks_exact(4)) {
                *dst = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            vec
        })
        .collect();

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::{parse_npy, KokoroError, VoiceStore, STYLE_DIM};
    use std::io::Write;

    /// Minimal little-endian float32 `.npy` with `rows` style vectors; row `i`
    /// is filled with the value `i`.
    fn npy_bytes(rows: usize) -> Vec<u8> {
        let header = format!(
            "{{'descr': '<f4', 'fortran_order': False, 'shape': ({rows}, {STYLE_DIM}), }}\n"
        );
        let mut data = b"\x93NUMPY\x01\x00".to_vec();
        data.extend_from_slice(&(header.len() as u16).to_le_bytes());
        data.extend_from_slice(header.as_bytes());
        for i in 0..rows {
            for _ in 0..STYLE_DIM {
                data.extend_from_slice(&(i as f32).to_le_bytes());
            }
        }
        data
    }

    #[test]
    fn parses_style_rows() {
        let styles = parse_npy(&npy_bytes(3), "zf_001.npy").expect("valid npy");
        assert_eq!(styles.len(), 3);
        assert_eq!(styles[2][0], 2.0);
        assert_eq!(styles[2][STYLE_DIM - 1], 2.0);
    }

    #[test]
    fn rejects_bad_magic_and_ragged_data() {
        assert!(parse_npy(b"not a numpy file", "x").is_err());

        let mut ragged = npy_bytes(1);
        ragged.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(parse_npy(&ragged, "x").is_err());
    }

    #[test]
    fn rejects_voice_without_style_rows() {
        assert!(matches!(
            parse_npy(&npy_bytes(0), "zf_003.npy"),
            Err(KokoroError::VoiceParse(msg)) if msg.contains("no style vectors")
        ));
    }

    #[test]
    fn archive_with_empty_voice_fails_to_load() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        {
            let mut zip = zip::ZipWriter::new(file.reopen().expect("reopen"));
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("zf_001.npy", options).expect("start entry");
            zip.write_all(&npy_bytes(2)).expect("write entry");
            zip.start_file("zf_002.npy", options).expect("start entry");
            zip.write_all(&npy_bytes(0)).expect("write entry");
            zip.finish().expect("finish zip");
        }

        assert!(matches!(
            VoiceStore::load(file.path()),
            Err(KokoroError::VoiceParse(_))
        ));
    }

    #[test]
    fn loads_archive_and_clamps_style_index() {
        let file = tempfile::NamedTempFile::new().expect("tempfile");
        {
            let mut zip = zip::ZipWriter::new(file.reopen().expect("reopen"));
            let options = zip::write::SimpleFileOptions::default();
            zip.start_file("zf_001.npy", options).expect("start entry");
            zip.write_all(&npy_bytes(4)).expect("write entry");
            zip.start_file("zm_001.npy", options).expect("start entry");
            zip.write_all(&npy_bytes(1)).expect("write entry");
            zip.finish().expect("finish zip");
        }

        let store = VoiceStore::load(file.path()).expect("archive should load");
        assert_eq!(store.list_voices(), vec!["zf_001", "zm_001"]);
        assert!(store.contains("zf_001"));
        assert_eq!(store.get_style("zf_001", 1).expect("style")[0], 1.0);
        assert_eq!(store.get_style("zf_001", 500).expect("style")[0], 3.0);
        assert!(store.get_style("zf_002", 0).is_err());
    }
}
