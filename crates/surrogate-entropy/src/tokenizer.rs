//! Byte-level tokenizer: every byte is its own symbol, framed by BOS/EOS.

use serde::{Deserialize, Serialize};

use crate::symbols::{is_byte, Symbol, SymbolStream, BOS, EOS, PAD};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TokenizerConfig {
    pub add_bos: bool,
    pub add_eos: bool,
    /// Streams longer than this are truncated (framing symbols included).
    pub max_len: Option<usize>,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            add_bos: true,
            add_eos: true,
            max_len: Some(4096),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ByteTokenizer {
    config: TokenizerConfig,
}

impl ByteTokenizer {
    pub fn new(config: TokenizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    pub fn encode(&self, bytes: &[u8]) -> SymbolStream {
        let mut symbols = Vec::with_capacity(bytes.len() + 2);
        if self.config.add_bos {
            symbols.push(BOS);
        }
        symbols.extend(bytes.iter().map(|&b| b as Symbol));
        if self.config.add_eos {
            symbols.push(EOS);
        }
        if let Some(max_len) = self.config.max_len {
            symbols.truncate(max_len);
        }
        SymbolStream::from_trusted(symbols)
    }

    pub fn encode_str(&self, text: &str) -> SymbolStream {
        self.encode(text.as_bytes())
    }

    /// Lossy UTF-8 decode of the byte symbols; control symbols are skipped.
    pub fn decode(&self, symbols: &[Symbol]) -> String {
        let bytes: Vec<u8> = symbols.iter().filter(|&&s| is_byte(s)).map(|&s| s as u8).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Right-pad (or truncate) to exactly `len` symbols with [`PAD`].
    /// Returns the padded symbols and the number of pad symbols added.
    pub fn pad_to(&self, stream: &SymbolStream, len: usize) -> (Vec<Symbol>, usize) {
        let mut symbols: Vec<Symbol> = stream.iter().copied().take(len).collect();
        let pad = len - symbols.len();
        symbols.resize(len, PAD);
        (symbols, pad)
    }

    /// Each decoded character of `text` with its byte offset into the payload.
    pub fn token_offsets(&self, text: &str) -> Vec<(char, usize)> {
        text.char_indices().map(|(offset, c)| (c, offset)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_frames_with_bos_and_eos() {
        let tok = ByteTokenizer::default();
        let s = tok.encode_str("Hi");
        assert_eq!(s.as_slice(), &[BOS, 72, 105, EOS]);
    }

    #[test]
    fn encode_without_framing() {
        let tok = ByteTokenizer::new(TokenizerConfig {
            add_bos: false,
            add_eos: false,
            max_len: None,
        });
        assert_eq!(tok.encode(b"ab").as_slice(), &[97, 98]);
        assert!(tok.encode(b"").is_empty());
    }

    #[test]
    fn encode_truncates_to_max_len() {
        let tok = ByteTokenizer::new(TokenizerConfig {
            max_len: Some(3),
            ..TokenizerConfig::default()
        });
        assert_eq!(tok.encode_str("hello").as_slice(), &[BOS, 104, 101]);
    }

    #[test]
    fn decode_skips_control_symbols() {
        let tok = ByteTokenizer::default();
        let s = tok.encode_str("héllo");
        assert_eq!(tok.decode(&s), "héllo");
    }

    #[test]
    fn decode_is_lossy_on_broken_utf8() {
        let tok = ByteTokenizer::default();
        let s = tok.encode(&[0x66, 0xff, 0x67]);
        assert_eq!(tok.decode(&s), "f\u{fffd}g");
    }

    #[test]
    fn pad_to_reports_pad_count() {
        let tok = ByteTokenizer::default();
        let s = tok.encode_str("ab");
        let (padded, pad) = tok.pad_to(&s, 6);
        assert_eq!(padded, vec![BOS, 97, 98, EOS, PAD, PAD]);
        assert_eq!(pad, 2);

        let (cut, pad) = tok.pad_to(&s, 2);
        assert_eq!(cut, vec![BOS, 97]);
        assert_eq!(pad, 0);
    }

    #[test]
    fn config_rejects_unknown_fields() {
        let cfg: TokenizerConfig =
            serde_json::from_str(r#"{"add_bos":false,"add_eos":true,"max_len":null}"#).unwrap();
        assert!(!cfg.add_bos);
        assert_eq!(cfg.max_len, None);
        assert!(serde_json::from_str::<TokenizerConfig>(
            r#"{"add_bos":true,"add_eos":true,"max_len":8,"lowercase":true}"#
        )
        .is_err());
    }

    #[test]
    fn token_offsets_are_byte_positions() {
        let tok = ByteTokenizer::default();
        assert_eq!(tok.token_offsets("aé b"), vec![('a', 0), ('é', 1), (' ', 3), ('b', 4)]);
    }
}
