//! Rank-ordered byte-pair merging over ByteLevel symbol strings.
//!
//! A chunk (already mapped through [`ByteUnicodeMap`](super::ByteUnicodeMap))
//! starts as one symbol per character. Each round picks the adjacent pair with
//! the lowest merge rank and merges every non-overlapping occurrence of it,
//! left to right. Merging stops when no adjacent pair has a rank or a single
//! symbol is left.

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::sync::Arc;

/// Merge rank table: `(first, second)` -> 0-based position in the merge list.
pub type MergeRanks = FxHashMap<(String, String), u32>;

/// Merge `token` into its final symbols without consulting any cache.
///
/// Tokens with fewer than two characters come back as-is (one symbol, or
/// none for the empty string).
pub fn byte_pair_merge(token: &str, ranks: &MergeRanks) -> Vec<String> {
    let mut word: Vec<String> = token.chars().map(String::from).collect();
    if word.len() < 2 {
        return word;
    }

    while let Some((first, second)) = lowest_ranked_pair(&word, ranks) {
        word = merge_pair(word, &first, &second);
        if word.len() == 1 {
            break;
        }
    }

    word
}

/// Adjacent pair with the minimum rank, or `None` when no pair is ranked.
///
/// Unranked pairs are never candidates, which is the same as giving them an
/// infinite rank.
fn lowest_ranked_pair(word: &[String], ranks: &MergeRanks) -> Option<(String, String)> {
    let mut best: Option<(u32, (String, String))> = None;

    for window in word.windows(2) {
        let pair = (window[0].clone(), window[1].clone());
        let Some(&rank) = ranks.get(&pair) else {
            continue;
        };
        if best.as_ref().is_none_or(|(best_rank, _)| rank < *best_rank) {
            best = Some((rank, pair));
        }
    }

    best.map(|(_, pair)| pair)
}

/// One left-to-right pass merging every non-overlapping `first second`.
fn merge_pair(word: Vec<String>, first: &str, second: &str) -> Vec<String> {
    let mut merged = Vec::with_capacity(word.len());
    let mut symbols = word.into_iter().peekable();

    while let Some(symbol) = symbols.next() {
        if symbol == first && symbols.peek().is_some_and(|next| next == second) {
            symbols.next();
            merged.push(symbol + second);
        } else {
            merged.push(symbol);
        }
    }

    merged
}

/// Memoizing BPE merge engine.
///
/// The cache maps a ByteLevel token to its space-joined merge result. It only
/// grows; entries are never evicted because the result for a token never
/// changes. Concurrent misses on the same token may both compute and insert,
/// which writes the same value twice.
pub struct MergeEngine {
    ranks: Arc<MergeRanks>,
    cache: DashMap<String, String, FxBuildHasher>,
}

impl MergeEngine {
    /// Create an engine over a shared merge rank table with an empty cache.
    pub fn new(ranks: Arc<MergeRanks>) -> Self {
        Self {
            ranks,
            cache: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Merge `token` and return its symbols joined by single spaces.
    pub fn merge(&self, token: &str) -> String {
        if let Some(cached) = self.cache.get(token) {
            return cached.value().clone();
        }

        let result = if token.chars().nth(1).is_none() {
            token.to_string()
        } else {
            log::trace!("BPE cache miss for {:?}", token);
            byte_pair_merge(token, &self.ranks).join(" ")
        };

        self.cache.insert(token.to_string(), result.clone());
        result
    }

    /// The merge rank table.
    pub fn ranks(&self) -> &MergeRanks {
        &self.ranks
    }

    pub(crate) fn shared_ranks(&self) -> Arc<MergeRanks> {
        Arc::clone(&self.ranks)
    }

    /// Number of cached tokens.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
