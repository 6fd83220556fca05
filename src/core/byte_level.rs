//! ByteLevel byte-to-unicode mapping for GPT-2 style BPE.
//!
//! BPE symbols are strings, but the input to the merge engine is arbitrary
//! bytes. Many byte values (control characters, whitespace, the soft hyphen)
//! are unsafe inside regex segmentation and vocabulary keys, so every byte is
//! given a printable stand-in character.
//!
//! # Mapping Strategy
//!
//! - Bytes 33-126 (`!` to `~`): Map to themselves
//! - Bytes 161-172 (`¡` to `¬`): Map to themselves
//! - Bytes 174-255 (`®` to `ÿ`): Map to themselves
//! - Other bytes (0-32, 127-160, 173): Map to U+0100 onwards, in byte order
//!
//! So space (0x20) becomes `Ġ` (U+0120) and newline (0x0A) becomes `Ċ`
//! (U+010A), which is why GPT-2 vocabulary entries look like `Ġworld`.
//!
//! # Example
//!
//! ```
//! use gpt_bpe::ByteUnicodeMap;
//!
//! let map = ByteUnicodeMap::shared();
//! assert_eq!(map.encode(b" hello"), "\u{120}hello");
//! assert_eq!(map.decode("\u{120}hello").unwrap(), b" hello");
//! ```

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Process-wide map, built on first use.
static SHARED: LazyLock<ByteUnicodeMap> = LazyLock::new(ByteUnicodeMap::build);

/// First code point handed out to bytes that are not printable as-is.
const REMAP_START: char = '\u{0100}';

/// Bijection between the 256 byte values and 256 printable characters.
#[derive(Debug, Clone)]
pub struct ByteUnicodeMap {
    byte_to_char: [char; 256],
    char_to_byte: FxHashMap<char, u8>,
}

/// Bytes that are printed as their own Latin-1 code point.
#[inline]
fn is_direct(b: u8) -> bool {
    matches!(b, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF)
}

impl ByteUnicodeMap {
    /// Build the mapping. Pure and infallible; prefer [`ByteUnicodeMap::shared`].
    pub fn build() -> Self {
        let mut byte_to_char = ['\0'; 256];

        for b in (0u8..=255).filter(|&b| is_direct(b)) {
            byte_to_char[b as usize] = char::from(b);
        }

        let remapped = (0u8..=255).filter(|&b| !is_direct(b));
        for (b, ch) in remapped.zip(REMAP_START..) {
            byte_to_char[b as usize] = ch;
        }

        let char_to_byte = byte_to_char
            .iter()
            .enumerate()
            .map(|(byte, &ch)| (ch, byte as u8))
            .collect();

        Self {
            byte_to_char,
            char_to_byte,
        }
    }

    /// The lazily built process-wide instance.
    pub fn shared() -> &'static Self {
        &SHARED
    }

    /// Stand-in character for a byte.
    #[inline]
    pub fn char_for(&self, byte: u8) -> char {
        self.byte_to_char[byte as usize]
    }

    /// Byte represented by a stand-in character, if it is one.
    #[inline]
    pub fn byte_for(&self, ch: char) -> Option<u8> {
        self.char_to_byte.get(&ch).copied()
    }

    /// Map every byte to its stand-in character.
    #[inline]
    pub fn encode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| self.char_for(b)).collect()
    }

    /// Map stand-in characters back to raw bytes.
    ///
    /// Returns `None` if `text` contains a character outside the alphabet.
    pub fn decode(&self, text: &str) -> Option<Vec<u8>> {
        text.chars().map(|ch| self.byte_for(ch)).collect()
    }

    /// Check if a character is part of the alphabet.
    #[inline]
    pub fn contains(&self, ch: char) -> bool {
        self.char_to_byte.contains_key(&ch)
    }
}

impl Default for ByteUnicodeMap {
    fn default() -> Self {
        Self::build()
    }
}
