use aho_corasick::{AhoCorasick, MatchKind};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

use super::bpe::{MergeEngine, MergeRanks};
use super::byte_level::ByteUnicodeMap;
use super::pretokenize::{PreTokenizer, GPT2_PATTERN};
use super::vocab::{
    load_bpe_merges, load_bpe_merges_file, load_encoder_json, load_encoder_json_file,
    VocabError, Vocabulary,
};

#[derive(Error, Debug)]
pub enum TokenizerError {
    #[error("Regex error (fancy-regex): {0}")]
    Regex(#[from] fancy_regex::Error),
    #[cfg(feature = "pcre2")]
    #[error("Regex error (PCRE2): {0}")]
    Pcre2(#[from] pcre2::Error),
    #[error("PCRE2 feature not enabled. Compile with --features pcre2")]
    Pcre2NotEnabled,
    #[error("Vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("Symbol {symbol:?} (from chunk {chunk:?}) is not in the vocabulary; vocabulary and merges do not match")]
    UnknownSymbol { symbol: String, chunk: String },
    #[error("Aho-Corasick build error: {0}")]
    AhoCorasick(#[from] aho_corasick::BuildError),
}

/// GPT-2 end-of-text marker.
pub const GPT2_ENDOFTEXT: &str = "<|endoftext|>";

/// Token id of [`GPT2_ENDOFTEXT`] in the GPT-2 / GPT-3 vocabulary.
pub const GPT2_ENDOFTEXT_ID: u32 = 50256;

/// Special tokens of the GPT-2 vocabulary.
pub fn gpt2_special_tokens() -> FxHashMap<String, u32> {
    let mut special = FxHashMap::default();
    special.insert(GPT2_ENDOFTEXT.to_string(), GPT2_ENDOFTEXT_ID);
    special
}

/// Byte-level BPE tokenizer for GPT-2 / GPT-3 vocabularies.
///
/// Owns the immutable tables (vocabulary, merge ranks, special tokens), the
/// compiled pre-tokenizer, and a concurrent cache of merge results. All
/// encode methods take `&self`, so one tokenizer can be shared across
/// threads; the tables are never mutated after construction.
///
/// # Example
///
/// ```no_run
/// use gpt_bpe::{gpt2_special_tokens, Tokenizer};
///
/// let tokenizer = Tokenizer::from_files("encoder.json", "vocab.bpe", gpt2_special_tokens())?;
/// assert_eq!(tokenizer.encode("Hello world")?, vec![15496, 995]);
/// # Ok::<(), gpt_bpe::TokenizerError>(())
/// ```
pub struct Tokenizer {
    vocabulary: Arc<Vocabulary>,
    merges: MergeEngine,
    byte_map: &'static ByteUnicodeMap,
    pre_tokenizer: Arc<PreTokenizer>,
    special_tokens: Arc<FxHashMap<String, u32>>,
    special_matcher: Option<SpecialMatcher>,
}

/// Leftmost-longest automaton over the special token strings, with each
/// pattern's token id stored at its pattern index.
#[derive(Clone)]
struct SpecialMatcher {
    automaton: AhoCorasick,
    ids: Vec<u32>,
}

impl SpecialMatcher {
    fn new(special_tokens: &FxHashMap<String, u32>) -> Result<Option<Self>, TokenizerError> {
        if special_tokens.is_empty() {
            return Ok(None);
        }
        let (patterns, ids): (Vec<&str>, Vec<u32>) = special_tokens
            .iter()
            .map(|(token, &id)| (token.as_str(), id))
            .unzip();
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::LeftmostLongest)
            .build(patterns)?;
        Ok(Some(Self { automaton, ids }))
    }
}

impl Tokenizer {
    /// Create a tokenizer with the GPT-2 pattern and no special tokens.
    ///
    /// # Arguments
    /// * `vocabulary` - Map of ByteLevel symbols to token IDs
    /// * `merges` - Map of symbol pairs to merge ranks
    pub fn new(vocabulary: Vocabulary, merges: MergeRanks) -> Result<Self, TokenizerError> {
        Self::with_options(vocabulary, merges, FxHashMap::default(), GPT2_PATTERN)
    }

    /// Create a tokenizer with full configuration options.
    ///
    /// # Arguments
    /// * `vocabulary` - Map of ByteLevel symbols to token IDs
    /// * `merges` - Map of symbol pairs to merge ranks
    /// * `special_tokens` - Map of special token strings to token IDs
    /// * `pattern` - Regex pattern for pre-tokenization
    pub fn with_options(
        vocabulary: Vocabulary,
        merges: MergeRanks,
        special_tokens: FxHashMap<String, u32>,
        pattern: &str,
    ) -> Result<Self, TokenizerError> {
        let pre_tokenizer = PreTokenizer::new(pattern)?;

        let special_matcher = SpecialMatcher::new(&special_tokens)?;

        log::debug!(
            "Built tokenizer: {} symbols, {} merges, {} special tokens, {} backend",
            vocabulary.len(),
            merges.len(),
            special_tokens.len(),
            pre_tokenizer.backend()
        );

        Ok(Self {
            vocabulary: Arc::new(vocabulary),
            merges: MergeEngine::new(Arc::new(merges)),
            byte_map: ByteUnicodeMap::shared(),
            pre_tokenizer: Arc::new(pre_tokenizer),
            special_tokens: Arc::new(special_tokens),
            special_matcher,
        })
    }

    /// Create a tokenizer from the raw bytes of `encoder.json` and `vocab.bpe`.
    pub fn from_bytes(
        encoder_json: &[u8],
        bpe_merges: &[u8],
        special_tokens: FxHashMap<String, u32>,
    ) -> Result<Self, TokenizerError> {
        let vocabulary = load_encoder_json(encoder_json)?;
        let merges = load_bpe_merges(bpe_merges)?;
        Self::with_options(vocabulary, merges, special_tokens, GPT2_PATTERN)
    }

    /// Create a tokenizer from `encoder.json` and `vocab.bpe` files.
    pub fn from_files(
        encoder_path: impl AsRef<Path>,
        merges_path: impl AsRef<Path>,
        special_tokens: FxHashMap<String, u32>,
    ) -> Result<Self, TokenizerError> {
        let vocabulary = load_encoder_json_file(encoder_path)?;
        let merges = load_bpe_merges_file(merges_path)?;
        Self::with_options(vocabulary, merges, special_tokens, GPT2_PATTERN)
    }

    /// Switch to PCRE2 regex backend.
    ///
    /// # Errors
    /// Returns an error if `pcre2` feature is not enabled or regex compilation fails.
    pub fn pcre2(mut self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        let pre_tokenizer = PreTokenizer::new(self.pre_tokenizer.pattern())?.pcre2(use_pcre2)?;
        self.pre_tokenizer = Arc::new(pre_tokenizer);
        Ok(self)
    }

    /// BPE-encode one pre-tokenized chunk, appending its ids to `ids`.
    fn encode_chunk(&self, chunk: &str, ids: &mut Vec<u32>) -> Result<(), TokenizerError> {
        let token = self.byte_map.encode(chunk.as_bytes());
        let merged = self.merges.merge(&token);

        for symbol in merged.split(' ') {
            let &id = self
                .vocabulary
                .get(symbol)
                .ok_or_else(|| TokenizerError::UnknownSymbol {
                    symbol: symbol.to_string(),
                    chunk: chunk.to_string(),
                })?;
            ids.push(id);
        }

        Ok(())
    }

    /// Encode text to token IDs (special tokens are treated as plain text).
    ///
    /// Empty text encodes to an empty vector. A merged symbol missing from
    /// the vocabulary fails the whole call; no partial output is returned.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::with_capacity(text.len() / 3 + 1);
        for chunk in self.pre_tokenizer.split(text)? {
            self.encode_chunk(chunk, &mut ids)?;
        }
        Ok(ids)
    }

    /// Encode optional text; `None` encodes to an empty vector.
    pub fn encode_opt(&self, text: Option<&str>) -> Result<Vec<u32>, TokenizerError> {
        text.map_or_else(|| Ok(Vec::new()), |text| self.encode(text))
    }

    /// Encode a character buffer.
    pub fn encode_chars(&self, chars: &[char]) -> Result<Vec<u32>, TokenizerError> {
        self.encode_iter(chars.iter().copied())
    }

    /// Encode a stream of characters.
    pub fn encode_iter<I>(&self, chars: I) -> Result<Vec<u32>, TokenizerError>
    where
        I: IntoIterator<Item = char>,
    {
        let text: String = chars.into_iter().collect();
        self.encode(&text)
    }

    /// Encode text with special token handling.
    ///
    /// Special tokens in the input are emitted directly without BPE; the
    /// text between them is encoded with [`Tokenizer::encode`].
    pub fn encode_with_special(&self, text: &str) -> Result<Vec<u32>, TokenizerError> {
        let Some(matcher) = &self.special_matcher else {
            return self.encode(text);
        };

        let mut ids = Vec::new();
        let mut cursor = 0;
        for found in matcher.automaton.find_iter(text) {
            // encode("") is empty, so adjacent markers need no guard
            ids.extend(self.encode(&text[cursor..found.start()])?);
            ids.push(matcher.ids[found.pattern().as_usize()]);
            cursor = found.end();
        }
        ids.extend(self.encode(&text[cursor..])?);

        Ok(ids)
    }

    /// Number of tokens `encode` produces for `text`.
    pub fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        self.encode(text).map(|ids| ids.len())
    }

    /// Batch encode multiple texts in parallel.
    ///
    /// Texts are independent; each is encoded sequentially on one worker.
    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<u32>>, TokenizerError> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Batch encode multiple texts with special token handling.
    pub fn encode_batch_with_special(
        &self,
        texts: &[String],
    ) -> Result<Vec<Vec<u32>>, TokenizerError> {
        texts
            .par_iter()
            .map(|text| self.encode_with_special(text))
            .collect()
    }

    /// Get the vocabulary size (number of tokens).
    ///
    /// This returns max_token_id + 1 across the vocabulary and special tokens.
    pub fn vocab_size(&self) -> usize {
        let max_vocab_id = self.vocabulary.values().max().copied();
        let max_special_id = self.special_tokens.values().max().copied();
        max_vocab_id
            .max(max_special_id)
            .map_or(0, |max_id| max_id as usize + 1)
    }

    /// Get the vocabulary map (ByteLevel symbol -> ID).
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Get the merge rank map.
    pub fn merge_ranks(&self) -> &MergeRanks {
        self.merges.ranks()
    }

    /// Get the special tokens map.
    pub fn special_tokens(&self) -> &FxHashMap<String, u32> {
        &self.special_tokens
    }

    /// Get the pre-tokenization pattern.
    pub fn pattern(&self) -> &str {
        self.pre_tokenizer.pattern()
    }

    /// Get the pre-tokenizer.
    pub fn pre_tokenizer(&self) -> &PreTokenizer {
        &self.pre_tokenizer
    }

    /// Clear the merge cache.
    pub fn clear_cache(&self) {
        self.merges.clear_cache();
    }

    /// Get the current cache size.
    pub fn cache_len(&self) -> usize {
        self.merges.cache_len()
    }
}

impl Clone for Tokenizer {
    /// Shares the immutable tables; the clone starts with an empty cache.
    fn clone(&self) -> Self {
        Self {
            vocabulary: Arc::clone(&self.vocabulary),
            merges: MergeEngine::new(self.merges.shared_ranks()),
            byte_map: self.byte_map,
            pre_tokenizer: Arc::clone(&self.pre_tokenizer),
            special_tokens: Arc::clone(&self.special_tokens),
            special_matcher: self.special_matcher.clone(),
        }
    }
}
