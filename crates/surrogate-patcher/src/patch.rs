//! Patches and ordered patch sequences.
//!
//! ```text
//!   stream     B  x  0  :     1  .  5  E
//!   patches   [0      3)[3         7)[7 8)
//!   start     1  0  0  1  0  0  0  1
//!   ids       0  0  0  1  1  1  1  2
//! ```

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::PatchError;

/// Half-open index range `[start, end)` into a symbol stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Patch {
    pub start: usize,
    pub end: usize,
}

impl Patch {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }
}

/// Ordered patches covering a stream.
///
/// Sequences produced by the patcher always tile their stream. Sequences built
/// from caller data with [`PatchSequence::from_patches`] are not checked until
/// [`PatchSequence::verify_tiling`] is called.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PatchSequence {
    patches: Vec<Patch>,
}

impl PatchSequence {
    pub fn from_patches(patches: Vec<Patch>) -> Self {
        Self { patches }
    }

    /// Rebuilds patches from per-position start flags. `mask[0]` must be set
    /// for a non-empty mask.
    pub fn from_start_mask(mask: &[bool]) -> Result<Self, PatchError> {
        if let Some(false) = mask.first() {
            return Err(PatchError::TilingViolation {
                index: 0,
                reason: "first position must start a patch".into(),
            });
        }
        let mut patches = Vec::new();
        for (i, _) in mask.iter().enumerate().skip(1).filter(|&(_, &s)| s) {
            let start = patches.last().map_or(0, |p: &Patch| p.end);
            patches.push(Patch::new(start, i));
        }
        if !mask.is_empty() {
            let start = patches.last().map_or(0, |p| p.end);
            patches.push(Patch::new(start, mask.len()));
        }
        Ok(Self { patches })
    }

    pub fn len(&self) -> usize {
        self.patches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Patch> {
        self.patches.iter()
    }

    pub fn as_slice(&self) -> &[Patch] {
        &self.patches
    }

    /// Number of symbols covered, i.e. the end of the last patch.
    pub fn covered(&self) -> usize {
        self.patches.last().map_or(0, |p| p.end)
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.patches.iter().map(Patch::len).collect()
    }

    pub fn longest(&self) -> usize {
        self.patches.iter().map(Patch::len).max().unwrap_or(0)
    }

    /// `true` at every position where a patch begins.
    pub fn start_mask(&self) -> Vec<bool> {
        let len = self.covered();
        let mut mask = vec![false; len];
        for p in self.patches.iter().filter(|p| p.start < len) {
            mask[p.start] = true;
        }
        mask
    }

    /// Patch index of every position: the running count of starts, minus one.
    pub fn patch_ids(&self) -> Vec<usize> {
        self.patches
            .iter()
            .enumerate()
            .flat_map(|(id, p)| std::iter::repeat(id).take(p.len()))
            .collect()
    }

    /// Checks that the patches are contiguous, non-empty, no longer than
    /// `max_patch_len`, start at 0 and end at `stream_len`.
    pub fn verify_tiling(&self, stream_len: usize, max_patch_len: usize) -> Result<(), PatchError> {
        let violation = |index: usize, reason: String| PatchError::TilingViolation { index, reason };
        let mut expected_start = 0;
        for (index, p) in self.patches.iter().enumerate() {
            if p.start != expected_start {
                return Err(violation(
                    index,
                    format!("starts at {} but the previous patch ended at {expected_start}", p.start),
                ));
            }
            if p.is_empty() {
                return Err(violation(index, format!("[{}, {}) is empty", p.start, p.end)));
            }
            if p.len() > max_patch_len {
                return Err(violation(
                    index,
                    format!("length {} exceeds the cap of {max_patch_len}", p.len()),
                ));
            }
            expected_start = p.end;
        }
        if expected_start != stream_len {
            return Err(violation(
                self.patches.len(),
                format!("patches cover {expected_start} of {stream_len} symbols"),
            ));
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a PatchSequence {
    type Item = &'a Patch;
    type IntoIter = std::slice::Iter<'a, Patch>;

    fn into_iter(self) -> Self::IntoIter {
        self.patches.iter()
    }
}
