//! Space-delimited patching: a fixed alternative to the entropy signal.

use surrogate_entropy::Symbol;

use crate::patch::PatchSequence;

const SPACE: Symbol = b' ' as Symbol;

/// A patch starts at position 0, at every ASCII space, and wherever the
/// current patch would otherwise exceed `max_patch_len`.
pub fn segment_on_whitespace(stream: &[Symbol], max_patch_len: usize) -> PatchSequence {
    let max = max_patch_len.max(1);
    let mut mask = Vec::with_capacity(stream.len());
    let mut start = 0;
    for (i, &symbol) in stream.iter().enumerate() {
        let starts = i == 0 || symbol == SPACE || i - start == max;
        if starts {
            start = i;
        }
        mask.push(starts);
    }
    // A leading start is always present, so this cannot fail.
    PatchSequence::from_start_mask(&mask).unwrap_or_default()
}
