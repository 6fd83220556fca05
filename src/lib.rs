//! gpt-bpe - byte-level BPE encoder for GPT-2 / GPT-3 vocabularies
//!
//! Produces the same token ids as the reference GPT-2 tokenizer:
//! - ByteLevel byte-to-unicode mapping so any byte sequence is representable
//! - GPT-2 regex pre-tokenization (fancy-regex, or PCRE2 with the `pcre2` feature)
//! - Rank-ordered BPE merging with a concurrent, shared merge cache
//! - Loaders for `encoder.json` and `vocab.bpe`
//! - Aho-Corasick special token matching (`<|endoftext|>`)
//! - Rayon batch encoding across independent texts
//!
//! ```no_run
//! use gpt_bpe::{gpt2_special_tokens, Tokenizer};
//!
//! let tokenizer = Tokenizer::from_files("encoder.json", "vocab.bpe", gpt2_special_tokens())?;
//! let ids = tokenizer.encode("Hello, world!")?;
//! assert_eq!(ids, vec![15496, 11, 995, 0]);
//! # Ok::<(), gpt_bpe::TokenizerError>(())
//! ```

pub mod core;

pub use self::core::{
    byte_pair_merge, gpt2_special_tokens, load_bpe_merges, load_bpe_merges_file,
    load_encoder_json, load_encoder_json_file, ByteUnicodeMap, MergeEngine, MergeRanks,
    PreTokenizer, Tokenizer, TokenizerError, VocabError, Vocabulary, GPT2_ENDOFTEXT,
    GPT2_ENDOFTEXT_ID, GPT2_PATTERN,
};
