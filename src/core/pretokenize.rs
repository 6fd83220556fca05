//! Regex pre-tokenization of raw text into BPE chunks.
//!
//! The GPT-2 pattern attaches an optional leading space to the following
//! letter, number, or punctuation run, so `" world"` is one chunk while a run
//! of spaces before a word leaves its last space for that word.

#[cfg(feature = "pcre2")]
use pcre2::bytes::Regex as Pcre2Regex;

use super::tokenizer::TokenizerError;

/// Pre-tokenization pattern for GPT-2 / GPT-3 (r50k/p50k vocabularies).
///
/// Alternatives, in priority order:
/// - contractions `'s 't 're 've 'm 'll 'd`
/// - ` ?\p{L}+` letters, ` ?\p{N}+` numbers, ` ?[^\s\p{L}\p{N}]+` punctuation
/// - `\s+(?!\S)` whitespace not followed by text, then `\s+` as fallback
pub const GPT2_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// [`GPT2_PATTERN`] without the `\s+(?!\S)` look-ahead branch.
///
/// Compiles to a linear-time automaton, so whitespace runs of any length
/// never hit the backtracking stack. [`PreTokenizer::spans`] restores the
/// look-ahead by giving back the last character of a run that is followed
/// by text.
const GPT2_PATTERN_LINEAR: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+";

/// Regex backend enum for switching between fancy-regex (default) and PCRE2 (optional)
enum RegexBackend {
    Fancy(Box<fancy_regex::Regex>),
    #[cfg(feature = "pcre2")]
    Pcre2(Pcre2Regex),
}

impl RegexBackend {
    fn fancy(pattern: &str) -> Result<Self, TokenizerError> {
        Ok(RegexBackend::Fancy(Box::new(fancy_regex::Regex::new(
            pattern,
        )?)))
    }

    #[cfg(feature = "pcre2")]
    fn pcre2(pattern: &str) -> Result<Self, TokenizerError> {
        let mut builder = pcre2::bytes::RegexBuilder::new();
        builder.jit_if_available(true);
        builder.utf(true);
        builder.ucp(true);
        Ok(RegexBackend::Pcre2(builder.build(pattern)?))
    }

    fn name(&self) -> &'static str {
        match self {
            RegexBackend::Fancy(_) => "fancy-regex",
            #[cfg(feature = "pcre2")]
            RegexBackend::Pcre2(_) => "pcre2",
        }
    }

    /// First match at or after `pos`, as (start, end) byte offsets
    fn find_at(&self, text: &str, pos: usize) -> Result<Option<(usize, usize)>, TokenizerError> {
        match self {
            RegexBackend::Fancy(regex) => Ok(regex
                .find_from_pos(text, pos)?
                .map(|m| (m.start(), m.end()))),
            #[cfg(feature = "pcre2")]
            RegexBackend::Pcre2(regex) => Ok(regex
                .find_at(text.as_bytes(), pos)?
                .map(|m| (m.start(), m.end()))),
        }
    }
}

/// Compiled pre-tokenization pattern.
///
/// Chunks are returned left to right. With [`GPT2_PATTERN`] every character
/// of the input belongs to exactly one chunk. A custom pattern that leaves
/// gaps drops the unmatched text, as the GPT-2 encoder does.
pub struct PreTokenizer {
    regex: RegexBackend,
    pattern: String,
    /// Set when `regex` runs [`GPT2_PATTERN_LINEAR`] in place of `pattern`.
    linear_whitespace: bool,
}

impl PreTokenizer {
    /// Compile `pattern` with the default fancy-regex backend.
    pub fn new(pattern: &str) -> Result<Self, TokenizerError> {
        let linear_whitespace = pattern == GPT2_PATTERN;
        let compiled = if linear_whitespace {
            GPT2_PATTERN_LINEAR
        } else {
            pattern
        };
        Ok(Self {
            regex: RegexBackend::fancy(compiled)?,
            pattern: pattern.to_string(),
            linear_whitespace,
        })
    }

    fn compiled_pattern(&self) -> &str {
        if self.linear_whitespace {
            GPT2_PATTERN_LINEAR
        } else {
            &self.pattern
        }
    }

    /// Pre-tokenizer for the GPT-2 pattern.
    pub fn gpt2() -> Result<Self, TokenizerError> {
        Self::new(GPT2_PATTERN)
    }

    /// Recompile the pattern with the PCRE2 backend, or back to fancy-regex.
    #[cfg(feature = "pcre2")]
    pub fn pcre2(mut self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        self.regex = if use_pcre2 {
            RegexBackend::pcre2(self.compiled_pattern())?
        } else {
            RegexBackend::fancy(self.compiled_pattern())?
        };
        Ok(self)
    }

    /// Switch to PCRE2 regex backend (stub when feature not enabled).
    #[cfg(not(feature = "pcre2"))]
    pub fn pcre2(self, use_pcre2: bool) -> Result<Self, TokenizerError> {
        if use_pcre2 {
            Err(TokenizerError::Pcre2NotEnabled)
        } else {
            Ok(self)
        }
    }

    /// Byte offsets of every chunk in `text`.
    pub fn spans(&self, text: &str) -> Result<Vec<(usize, usize)>, TokenizerError> {
        let mut spans = Vec::new();
        let mut pos = 0;

        while pos < text.len() {
            let Some((start, mut end)) = self.regex.find_at(text, pos)? else {
                break;
            };
            if end == start {
                // Empty match: step over one character
                pos = text[start..]
                    .chars()
                    .next()
                    .map_or(text.len(), |c| start + c.len_utf8());
                continue;
            }
            if self.linear_whitespace && end < text.len() {
                end = start + whitespace_run_len(&text[start..end]);
            }
            spans.push((start, end));
            pos = end;
        }

        Ok(spans)
    }

    /// Split `text` into chunks.
    pub fn split<'t>(&self, text: &'t str) -> Result<Vec<&'t str>, TokenizerError> {
        Ok(self
            .spans(text)?
            .into_iter()
            .map(|(start, end)| &text[start..end])
            .collect())
    }

    /// The source pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Name of the active regex backend.
    pub fn backend(&self) -> &'static str {
        self.regex.name()
    }
}

/// Length of `chunk` under the `\s+(?!\S)` rule, given that text follows it.
///
/// A whitespace run of two or more characters leaves its last character to be
/// matched again, where ` ?\p{L}+` and friends can take a space. Any other
/// chunk keeps its length.
fn whitespace_run_len(chunk: &str) -> usize {
    let mut chars = chunk.char_indices();
    match chars.next_back() {
        Some((last, _)) if last > 0 && chunk.chars().all(char::is_whitespace) => last,
        _ => chunk.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(text: &str) -> Vec<&str> {
        PreTokenizer::gpt2().unwrap().split(text).unwrap()
    }

    #[test]
    fn test_empty_input() {
        assert!(split("").is_empty());
    }

    #[test]
    fn test_leading_space_attaches_to_word() {
        assert_eq!(split("Hello world"), vec!["Hello", " world"]);
        assert_eq!(split("Hello, world!"), vec!["Hello", ",", " world", "!"]);
    }

    #[test]
    fn test_contractions() {
        assert_eq!(split("I'm sure they'll"), vec!["I", "'m", " sure", " they", "'ll"]);
        assert_eq!(split("it's"), vec!["it", "'s"]);
    }

    #[test]
    fn test_numbers_and_punctuation() {
        assert_eq!(split("abc 123 ..."), vec!["abc", " 123", " ..."]);
        assert_eq!(split("x=42;"), vec!["x", "=", "42", ";"]);
    }

    #[test]
    fn test_whitespace_runs() {
        // The last space of a run is left for the following word
        assert_eq!(split("a   b"), vec!["a", "  ", " b"]);
        // Trailing whitespace forms its own chunk
        assert_eq!(split("a  "), vec!["a", "  "]);
        assert_eq!(split("line\n\nnext"), vec!["line", "\n", "\n", "next"]);
    }

    #[test]
    fn test_long_whitespace_runs() {
        let spaces = " ".repeat(1_500_000);

        let text = format!("{spaces}word");
        let chunks = split(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 1_499_999);
        assert_eq!(chunks[1], " word");

        let text = format!("word{spaces}");
        assert_eq!(split(&text), vec!["word", spaces.as_str()]);

        let mixed = "\n \t".repeat(500_000);
        let text = format!("{mixed}x");
        assert_eq!(split(&text), vec![&mixed[..mixed.len() - 1], "\t", "x"]);
    }

    #[test]
    fn test_whitespace_before_punctuation_and_contractions() {
        assert_eq!(split("a   !"), vec!["a", "  ", " !"]);
        assert_eq!(split("x  's"), vec!["x", " ", " '", "s"]);
        assert_eq!(split("a\t\t b"), vec!["a", "\t\t", " b"]);
        assert_eq!(split("a \u{3000}b"), vec!["a", " ", "\u{3000}", "b"]);
    }

    #[test]
    fn test_custom_pattern_keeps_its_own_branches() {
        let pre = PreTokenizer::new(r"\w+|\s+").unwrap();
        assert_eq!(pre.split("a   b").unwrap(), vec!["a", "   ", "b"]);
    }

    #[test]
    fn test_unicode_letters() {
        assert_eq!(split("café au lait"), vec!["café", " au", " lait"]);
        assert_eq!(split("日本語 text"), vec!["日本語", " text"]);
    }

    #[test]
    fn test_chunks_cover_input() {
        let pre = PreTokenizer::gpt2().unwrap();
        let inputs = [
            "Hello, world!",
            "  leading and trailing  ",
            "tabs\tand\r\nnewlines\n",
            "mixed 123abc!!! 'quoted' don't",
            "emoji 🦀 and ümlauts",
            "\u{a0}nbsp\u{2003}em space",
        ];
        for text in inputs {
            let chunks = pre.split(text).unwrap();
            assert!(!chunks.is_empty());
            assert!(chunks.iter().all(|c| !c.is_empty()));
            assert_eq!(chunks.concat(), text, "Coverage failed for: {:?}", text);
        }
    }

    #[test]
    fn test_pattern_and_backend() {
        let pre = PreTokenizer::gpt2().unwrap();
        assert_eq!(pre.pattern(), GPT2_PATTERN);
        assert_eq!(pre.backend(), "fancy-regex");
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(PreTokenizer::new("(unclosed").is_err());
    }

    #[cfg(not(feature = "pcre2"))]
    #[test]
    fn test_pcre2_not_enabled() {
        let pre = PreTokenizer::gpt2().unwrap();
        assert!(matches!(pre.pcre2(true), Err(TokenizerError::Pcre2NotEnabled)));
    }

    #[cfg(feature = "pcre2")]
    #[test]
    fn test_pcre2_backend_agrees() {
        let fancy = PreTokenizer::gpt2().unwrap();
        let pcre = PreTokenizer::gpt2().unwrap().pcre2(true).unwrap();
        assert_eq!(pcre.backend(), "pcre2");
        let text = "Hello, world!  It's 2024\n\ncafé";
        assert_eq!(fancy.split(text).unwrap(), pcre.split(text).unwrap());
    }
}
