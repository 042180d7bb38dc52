//! Configuration for entropy-driven segmentation.

use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Boundary signal evaluated at each position of the entropy trace.
///
/// A signal at position `i` closes the current patch *after* `i`, so the
/// uncertain symbol is the last one of its patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Cut after `i` when `entropy[i] > threshold`.
    Global { threshold: f32 },
    /// Cut after `i` when `entropy[i] - entropy[i-1] > delta`.
    /// Position 0 never fires.
    Relative { delta: f32 },
}

impl ThresholdMode {
    pub(crate) fn fires(&self, trace: &[f32], i: usize) -> bool {
        match *self {
            ThresholdMode::Global { threshold } => trace[i] > threshold,
            ThresholdMode::Relative { delta } => i > 0 && trace[i] - trace[i - 1] > delta,
        }
    }

    /// The raw threshold or delta value.
    pub fn value(&self) -> f32 {
        match *self {
            ThresholdMode::Global { threshold } => threshold,
            ThresholdMode::Relative { delta } => delta,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ThresholdMode::Global { .. } => "global",
            ThresholdMode::Relative { .. } => "relative",
        }
    }
}

impl Default for ThresholdMode {
    fn default() -> Self {
        ThresholdMode::Relative { delta: 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatcherConfig {
    /// Hard cap on patch length, in symbols. Must be ≥ 1.
    /// Default: `16`
    pub max_patch_len: usize,

    /// Default: `relative` with `delta = 1.0` (bits).
    pub threshold: ThresholdMode,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            max_patch_len: 16,
            threshold:     ThresholdMode::default(),
        }
    }
}

impl PatcherConfig {
    pub fn validate(&self) -> Result<(), PatchError> {
        if self.max_patch_len == 0 {
            return Err(PatchError::InvalidConfig("max_patch_len must be at least 1".into()));
        }
        if !self.threshold.value().is_finite() {
            return Err(PatchError::InvalidConfig(format!(
                "{} threshold must be finite, got {}",
                self.threshold.name(),
                self.threshold.value()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_relative() {
        let cfg = PatcherConfig::default();
        assert_eq!(cfg.max_patch_len, 16);
        assert_eq!(cfg.threshold, ThresholdMode::Relative { delta: 1.0 });
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn mode_is_tagged_in_json() {
        let cfg: PatcherConfig = serde_json::from_str(
            r#"{"max_patch_len":4,"threshold":{"mode":"global","threshold":1.5}}"#,
        )
        .unwrap();
        assert_eq!(cfg.threshold, ThresholdMode::Global { threshold: 1.5 });
        assert!(serde_json::from_str::<PatcherConfig>(
            r#"{"max_patch_len":4,"threshold":{"mode":"adaptive","threshold":1.5}}"#
        )
        .is_err());
    }

    #[test]
    fn rejects_zero_cap_and_nan() {
        let zero = PatcherConfig { max_patch_len: 0, ..Default::default() };
        assert!(zero.validate().is_err());
        let nan = PatcherConfig {
            threshold: ThresholdMode::Global { threshold: f32::NAN },
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn relative_never_fires_at_zero() {
        let mode = ThresholdMode::Relative { delta: 0.0 };
        assert!(!mode.fires(&[100.0, 0.0], 0));
        assert!(!mode.fires(&[100.0, 0.0], 1));
        assert!(mode.fires(&[0.0, 0.5], 1));
    }
}
