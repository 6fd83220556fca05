//! Shared GPT-2 fixture for the integration tests.
//!
//! A small slice of the GPT-2 `encoder.json` / `vocab.bpe` resources: all 256
//! byte symbols with their real GPT-2 ids, plus the merges needed to build
//! `Hello`, `world`, `Ġworld` and `é`. Merge order follows the relative order
//! needed for those words, not GPT-2's absolute ranks.

#![allow(dead_code)]

use gpt_bpe::{gpt2_special_tokens, ByteUnicodeMap, MergeRanks, Tokenizer, Vocabulary};

pub const HELLO: u32 = 15496;
pub const WORLD: u32 = 6894;
pub const SPACE_WORLD: u32 = 995;
pub const COMMA: u32 = 11;
pub const BANG: u32 = 0;
pub const E_ACUTE: u32 = 2634;

/// Merges in rank order.
pub const MERGES: &[(&str, &str)] = &[
    ("Ġ", "w"),
    ("o", "r"),
    ("l", "d"),
    ("e", "l"),
    ("l", "o"),
    ("H", "el"),
    ("Hel", "lo"),
    ("w", "or"),
    ("wor", "ld"),
    ("Ġw", "or"),
    ("Ġwor", "ld"),
    ("Ã", "©"),
];

/// Merged symbols and their ids.
const MERGED: &[(&str, u32)] = &[
    ("Ġw", 266),
    ("or", 273),
    ("ld", 335),
    ("lo", 404),
    ("el", 417),
    ("Ġwor", 476),
    ("wor", 1476),
    ("Hel", 12621),
    ("Hello", HELLO),
    ("world", WORLD),
    ("Ġworld", SPACE_WORLD),
    ("Ã©", E_ACUTE),
];

/// GPT-2 id of a single byte: printable bytes first, then remapped bytes.
pub fn byte_id(b: u8) -> u32 {
    let map = ByteUnicodeMap::shared();
    let is_direct = |b: u8| map.char_for(b) as u32 == b as u32;
    let direct_count = (0u8..=255).filter(|&b| is_direct(b)).count() as u32;
    if is_direct(b) {
        (0..b).filter(|&x| is_direct(x)).count() as u32
    } else {
        direct_count + (0..b).filter(|&x| !is_direct(x)).count() as u32
    }
}

pub fn vocabulary() -> Vocabulary {
    let map = ByteUnicodeMap::shared();
    let mut vocab: Vocabulary = (0u8..=255)
        .map(|b| (map.char_for(b).to_string(), byte_id(b)))
        .collect();
    for &(symbol, id) in MERGED {
        vocab.insert(symbol.to_string(), id);
    }
    vocab
}

pub fn merge_ranks() -> MergeRanks {
    MERGES
        .iter()
        .enumerate()
        .map(|(rank, &(a, b))| ((a.to_string(), b.to_string()), rank as u32))
        .collect()
}

/// `encoder.json` contents for the fixture.
pub fn encoder_json() -> Vec<u8> {
    serde_json::to_vec(&vocabulary()).unwrap()
}

/// `vocab.bpe` contents for the fixture.
pub fn bpe_merges() -> String {
    let mut text = String::from("#version: 0.2\n");
    for (a, b) in MERGES {
        text.push_str(a);
        text.push(' ');
        text.push_str(b);
        text.push('\n');
    }
    text
}

pub fn create_gpt2_tokenizer() -> Tokenizer {
    Tokenizer::from_bytes(&encoder_json(), bpe_merges().as_bytes(), gpt2_special_tokens())
        .expect("Failed to build GPT-2 fixture tokenizer")
}
