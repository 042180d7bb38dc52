//! Symbol alphabet: the 256 byte values plus three control symbols.

use std::ops::Deref;
use std::sync::Arc;

use crate::{EntropyError, Result};

pub type Symbol = u16;

pub const BOS: Symbol = 256;
pub const EOS: Symbol = 257;
pub const PAD: Symbol = 258;

/// Bytes + BOS + EOS + PAD.
pub const ALPHABET_SIZE: usize = 259;

pub fn is_byte(symbol: Symbol) -> bool {
    symbol < 256
}

pub fn is_control(symbol: Symbol) -> bool {
    (BOS..=PAD).contains(&symbol)
}

/// An immutable, validated sequence of symbols. Cloning shares the storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolStream(Arc<[Symbol]>);

impl SymbolStream {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self> {
        if let Some((position, &symbol)) = symbols
            .iter()
            .enumerate()
            .find(|&(_, &s)| s as usize >= ALPHABET_SIZE)
        {
            return Err(EntropyError::InvalidSymbol {
                symbol,
                position,
                alphabet: ALPHABET_SIZE,
            });
        }
        Ok(Self(symbols.into()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.iter().map(|&b| b as Symbol).collect())
    }

    /// Producers that only emit bytes and control symbols skip validation.
    pub(crate) fn from_trusted(symbols: Vec<Symbol>) -> Self {
        debug_assert!(symbols.iter().all(|&s| (s as usize) < ALPHABET_SIZE));
        Self(symbols.into())
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.0
    }

    /// Byte payload with control symbols dropped.
    pub fn bytes(&self) -> Vec<u8> {
        self.0.iter().filter(|&&s| is_byte(s)).map(|&s| s as u8).collect()
    }
}

impl Default for SymbolStream {
    fn default() -> Self {
        Self(Arc::from(Vec::new()))
    }
}

impl Deref for SymbolStream {
    type Target = [Symbol];

    fn deref(&self) -> &[Symbol] {
        &self.0
    }
}

impl AsRef<[Symbol]> for SymbolStream {
    fn as_ref(&self) -> &[Symbol] {
        &self.0
    }
}
