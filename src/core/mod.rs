//! Core tokenization engine for gpt-bpe.
//!
//! This module contains the byte-level BPE encoder used by GPT-2 and GPT-3:
//! - ByteLevel mapping of raw bytes to printable symbol characters
//! - Regex pre-tokenization of text into chunks
//! - Rank-ordered pair merging with a concurrent memoization cache
//! - Loaders for the `encoder.json` / `vocab.bpe` resource files
//!
//! # Architecture
//!
//! - [`Tokenizer`]: Main tokenizer struct with the encoding API, special token
//!   matching and rayon batch encoding
//! - [`ByteUnicodeMap`]: The byte <-> character bijection
//! - [`PreTokenizer`]: Pattern-based chunking (fancy-regex, optional PCRE2)
//! - [`MergeEngine`] / [`byte_pair_merge`]: The merge loop and its cache
//! - [`vocab`]: Vocabulary and merge list loading
//!
//! # Data flow
//!
//! text -> [`PreTokenizer`] -> chunks -> [`ByteUnicodeMap`] -> [`MergeEngine`]
//! -> space-joined symbols -> vocabulary lookup -> token ids

mod bpe;
pub mod byte_level;
mod pretokenize;
mod tokenizer;
pub mod vocab;

pub use bpe::{byte_pair_merge, MergeEngine, MergeRanks};
pub use byte_level::ByteUnicodeMap;
pub use pretokenize::{PreTokenizer, GPT2_PATTERN};
pub use tokenizer::{
    gpt2_special_tokens, Tokenizer, TokenizerError, GPT2_ENDOFTEXT, GPT2_ENDOFTEXT_ID,
};
pub use vocab::{
    load_bpe_merges, load_bpe_merges_file, load_encoder_json, load_encoder_json_file,
    VocabError, Vocabulary,
};
