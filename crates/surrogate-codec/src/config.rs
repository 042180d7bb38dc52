//! Configuration for the full codec pipeline.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use surrogate_encoder::EncoderConfig;
use surrogate_entropy::{TokenizerConfig, ALPHABET_SIZE};
use surrogate_numeric::{NumericConfig, Rounding};
use surrogate_patcher::{PatcherConfig, ThresholdMode};
use tracing::warn;

use crate::error::{CodecError, Result};

/// One config per stage. Unknown keys anywhere in the tree are rejected
/// when parsing JSON; missing keys take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CodecConfig {
    // ── Scalars ───────────────────────────────────────────────────────────────
    pub numeric: NumericConfig,

    // ── Payloads ──────────────────────────────────────────────────────────────
    pub tokenizer: TokenizerConfig,
    pub patcher: PatcherConfig,
    pub encoder: EncoderConfig,
}

impl CodecConfig {
    /// Load from environment variables, falling back to defaults.
    ///
    /// | Variable                       | Default    |
    /// |--------------------------------|------------|
    /// | `SURROGATE_PRECISION`          | `6`        |
    /// | `SURROGATE_MIN_EXP`            | `-30`      |
    /// | `SURROGATE_MAX_EXP`            | `30`       |
    /// | `SURROGATE_ROUNDING`           | `half_to_even` |
    /// | `SURROGATE_MAX_PATCH_LEN`      | `16`       |
    /// | `SURROGATE_THRESHOLD_MODE`     | `relative` |
    /// | `SURROGATE_ENTROPY_THRESHOLD`  | `1.0`      |
    /// | `SURROGATE_EMBEDDING_DIM`      | `128`      |
    /// | `SURROGATE_D_MODEL`            | `64`       |
    /// | `SURROGATE_LOCAL_LAYERS`       | `2`        |
    /// | `SURROGATE_LOCAL_HEADS`        | `4`        |
    /// | `SURROGATE_GLOBAL_HEADS`       | `4`        |
    /// | `SURROGATE_POOLING_QUERIES`    | `4`        |
    /// | `SURROGATE_SEED`               | `42`       |
    ///
    /// `SURROGATE_MAX_PATCH_LEN` sets the patcher cap and the encoder's
    /// rotary table together. `SURROGATE_ENTROPY_THRESHOLD` is the threshold
    /// in `global` mode and the delta in `relative` mode. Values that fail to
    /// parse are logged and ignored.
    ///
    /// The result is not validated; call [`CodecConfig::validate`].
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`CodecConfig::from_env`] over an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn read<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
            match lookup(key) {
                None => default,
                Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                    warn!(key, value = %raw, "unparseable environment override, using default");
                    default
                }),
            }
        }

        let mut cfg = Self::default();

        cfg.numeric.precision = read(&lookup, "SURROGATE_PRECISION", cfg.numeric.precision);
        cfg.numeric.min_exp = read(&lookup, "SURROGATE_MIN_EXP", cfg.numeric.min_exp);
        cfg.numeric.max_exp = read(&lookup, "SURROGATE_MAX_EXP", cfg.numeric.max_exp);
        cfg.numeric.rounding = match lookup("SURROGATE_ROUNDING").as_deref().map(str::trim) {
            None => cfg.numeric.rounding,
            Some("half_to_even") => Rounding::HalfToEven,
            Some("truncate") => Rounding::Truncate,
            Some(other) => {
                warn!(key = "SURROGATE_ROUNDING", value = %other, "unknown rounding policy, using default");
                cfg.numeric.rounding
            }
        };

        let max_patch_len = read(&lookup, "SURROGATE_MAX_PATCH_LEN", cfg.patcher.max_patch_len);
        cfg.patcher.max_patch_len = max_patch_len;
        cfg.encoder.max_patch_len = max_patch_len;

        let value = read(&lookup, "SURROGATE_ENTROPY_THRESHOLD", cfg.patcher.threshold.value());
        let mode = lookup("SURROGATE_THRESHOLD_MODE").map(|m| m.trim().to_ascii_lowercase());
        cfg.patcher.threshold = match mode.as_deref() {
            None | Some("relative") => ThresholdMode::Relative { delta: value },
            Some("global") => ThresholdMode::Global { threshold: value },
            Some(other) => {
                warn!(key = "SURROGATE_THRESHOLD_MODE", value = %other, "unknown threshold mode, using relative");
                ThresholdMode::Relative { delta: value }
            }
        };

        let enc = &mut cfg.encoder;
        enc.embedding_dim = read(&lookup, "SURROGATE_EMBEDDING_DIM", enc.embedding_dim);
        enc.d_model = read(&lookup, "SURROGATE_D_MODEL", enc.d_model);
        enc.local_layers = read(&lookup, "SURROGATE_LOCAL_LAYERS", enc.local_layers);
        enc.local_heads = read(&lookup, "SURROGATE_LOCAL_HEADS", enc.local_heads);
        enc.global_heads = read(&lookup, "SURROGATE_GLOBAL_HEADS", enc.global_heads);
        enc.pooling_queries = read(&lookup, "SURROGATE_POOLING_QUERIES", enc.pooling_queries);
        enc.seed = read(&lookup, "SURROGATE_SEED", enc.seed);

        cfg
    }

    /// Parses and validates a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks each stage, then that the stages agree with each other.
    pub fn validate(&self) -> Result<()> {
        self.numeric.validate()?;
        self.patcher.validate()?;
        self.encoder.validate()?;
        if self.encoder.max_patch_len < self.patcher.max_patch_len {
            return Err(CodecError::Config(format!(
                "encoder max_patch_len ({}) is shorter than patcher max_patch_len ({})",
                self.encoder.max_patch_len, self.patcher.max_patch_len
            )));
        }
        if self.encoder.vocab_size < ALPHABET_SIZE {
            return Err(CodecError::Config(format!(
                "encoder vocab_size ({}) cannot hold the {ALPHABET_SIZE}-symbol alphabet",
                self.encoder.vocab_size
            )));
        }
        if self.tokenizer.max_len == Some(0) {
            return Err(CodecError::Config("tokenizer max_len must be at least 1".into()));
        }
        Ok(())
    }
}
