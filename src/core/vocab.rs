//! Loaders for the GPT-2 vocabulary resources.
//!
//! Two files describe a GPT-2 style BPE model:
//!
//! - `encoder.json`: a JSON object mapping each ByteLevel symbol to its
//!   token id, e.g. `{"!": 0, "Hello": 15496, "Ġworld": 995}`
//! - `vocab.bpe`: one merge per line, `first second`, in training order.
//!   The first line is a `#version: 0.2` header.
//!
//! ```text
//! #version: 0.2
//! Ġ t
//! Ġ a
//! h e
//! ```
//!
//! A merge's rank is its 0-based position in the list (the header and blank
//! lines don't count). Lower ranks are merged first.

use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;

use super::bpe::MergeRanks;

/// Vocabulary table: ByteLevel symbol -> token id.
pub type Vocabulary = FxHashMap<String, u32>;

/// Errors that can occur when loading vocabulary files.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Invalid encoder JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid merge list: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Load a vocabulary from the bytes of an `encoder.json` file.
pub fn load_encoder_json(data: &[u8]) -> Result<Vocabulary, VocabError> {
    let vocabulary: Vocabulary = serde_json::from_slice(data)?;
    log::debug!("Loaded {} vocabulary symbols", vocabulary.len());
    Ok(vocabulary)
}

/// Load a vocabulary from an `encoder.json` file path.
pub fn load_encoder_json_file(path: impl AsRef<Path>) -> Result<Vocabulary, VocabError> {
    let data = std::fs::read(path)?;
    load_encoder_json(&data)
}

/// Load merge ranks from the bytes of a `vocab.bpe` file.
///
/// A leading line starting with `#` is treated as the version header, so a
/// list without one loses no merge. Lines end at `\n` or `\r\n`; a trailing
/// `\r` is never part of the second symbol. If the same pair is listed twice,
/// its first rank is kept.
pub fn load_bpe_merges(data: &[u8]) -> Result<MergeRanks, VocabError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| VocabError::Parse(format!("invalid UTF-8: {}", e)))?;

    let mut ranks = MergeRanks::default();
    let mut rank = 0u32;

    for (idx, line) in text.lines().enumerate() {
        if idx == 0 && line.starts_with('#') {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }

        let mut parts = line.split(' ');
        let (Some(first), Some(second), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(VocabError::Parse(format!(
                "line {}: expected `first second`, got {:?}",
                idx + 1,
                line
            )));
        };
        if first.is_empty() || second.is_empty() {
            return Err(VocabError::Parse(format!(
                "line {}: empty merge symbol in {:?}",
                idx + 1,
                line
            )));
        }

        ranks
            .entry((first.to_string(), second.to_string()))
            .or_insert(rank);
        rank += 1;
    }

    log::debug!("Loaded {} BPE merges", ranks.len());
    Ok(ranks)
}

/// Load merge ranks from a `vocab.bpe` file path.
pub fn load_bpe_merges_file(path: impl AsRef<Path>) -> Result<MergeRanks, VocabError> {
    let data = std::fs::read(path)?;
    load_bpe_merges(&data)
}
