//! Name compression state for a single message being encoded.

use crate::MAX_COMPRESSION_OFFSET;
use hashbrown::HashMap;
use smallvec::SmallVec;

/// Maps lowercased name suffixes to the offset where they were first written.
///
/// A table belongs to exactly one message encode; offsets are positions in
/// that message's buffer, counted from the first header byte.
#[derive(Debug, Default, Clone)]
pub struct CompressionTable {
    entries: HashMap<SmallVec<[u8; 64]>, u16>,
}

impl CompressionTable {
    /// Creates an empty table.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the offset of a previously written suffix.
    pub fn lookup(&self, suffix: &[u8]) -> Option<u16> {
        self.entries.get(&lowercase_key(suffix)).copied()
    }

    /// Records `suffix` at `offset` unless it is already known or the offset
    /// is beyond what a pointer can reach.
    pub fn insert(&mut self, suffix: &[u8], offset: usize) {
        if offset > MAX_COMPRESSION_OFFSET {
            return;
        }
        #[allow(clippy::cast_possible_truncation)]
        self.entries
            .entry(lowercase_key(suffix))
            .or_insert(offset as u16);
    }

    /// Returns the number of recorded suffixes.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn lowercase_key(suffix: &[u8]) -> SmallVec<[u8; 64]> {
    suffix.iter().map(u8::to_ascii_lowercase).collect()
}
