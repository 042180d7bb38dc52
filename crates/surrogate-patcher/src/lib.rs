//! # surrogate-patcher
//!
//! Entropy-driven segmentation of a symbol stream into variable-length
//! patches. Predictable stretches collapse into long patches; an uncertain
//! symbol closes the patch it belongs to.
//!
//! ## Quick start
//! ```rust
//! use surrogate_patcher::{DynamicPatcher, PatcherConfig, ThresholdMode};
//!
//! let patcher = DynamicPatcher::new(PatcherConfig {
//!     max_patch_len: 5,
//!     threshold: ThresholdMode::Global { threshold: 1.5 },
//! })?;
//! let trace = [0.2, 0.3, 1.8, 0.1, 0.4, 0.2, 0.1, 2.0, 0.3, 0.2, 0.1, 0.1];
//! let patches = patcher.segment_trace(&trace);
//! assert_eq!(patches.lengths(), vec![3, 5, 4]);
//! # Ok::<(), surrogate_patcher::PatchError>(())
//! ```
//!
//! ## Threshold modes
//! | Mode | Fires at `i` when | Serialized as |
//! |---|---|---|
//! | Global | `entropy[i] > threshold` | `{"mode":"global","threshold":τ}` |
//! | Relative | `entropy[i] - entropy[i-1] > delta` (`i > 0`) | `{"mode":"relative","delta":δ}` |

pub mod config;
pub mod error;
pub mod patch;
pub mod patcher;
pub mod whitespace;

pub use config::{PatcherConfig, ThresholdMode};
pub use error::PatchError;
pub use patch::{Patch, PatchSequence};
pub use patcher::{segment, DynamicPatcher};
pub use whitespace::segment_on_whitespace;
