//! Free-space tracking for one shared GPU buffer.
//!
//! Allocations are kept as `(offset, size, owner)` entries sorted by offset. The space
//! between consecutive entries is free; the first gap large enough wins. Space before the
//! first entry counts as a gap too, so a range freed at offset 0 can be reused.

use crate::engine_state::voxels::chunk::ChunkKey;

/// One live allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreeListEntry {
    /// Byte offset of the allocation.
    pub offset: u64,
    /// Size in bytes.
    pub size: u64,
    /// The chunk owning the range.
    pub owner: ChunkKey,
}

impl FreeListEntry {
    /// One past the last byte of the allocation.
    pub fn end(&self) -> u64 {
        self.offset + self.size
    }
}

/// Ordered allocation list for one buffer.
#[derive(Debug, Default, Clone)]
pub struct FreeList {
    entries: Vec<FreeListEntry>,
}

impl FreeList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `size` bytes for `owner` and returns the offset.
    ///
    /// Requests are always granted; whether the offset fits the destination buffer is
    /// the caller's concern.
    pub fn allocate(&mut self, size: u64, owner: ChunkKey) -> u64 {
        let mut previous_end = 0;
        let mut position = self.entries.len();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.offset - previous_end >= size {
                position = index;
                break;
            }
            previous_end = entry.end();
        }

        self.entries.insert(
            position,
            FreeListEntry {
                offset: previous_end,
                size,
                owner,
            },
        );
        previous_end
    }

    /// Frees every range owned by `owner`. Returns how many entries were removed.
    pub fn release(&mut self, owner: &ChunkKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.owner != *owner);
        before - self.entries.len()
    }

    /// Live allocations in offset order.
    pub fn entries(&self) -> &[FreeListEntry] {
        &self.entries
    }

    /// End of the last allocation, the high-water mark.
    pub fn end(&self) -> u64 {
        self.entries.last().map_or(0, FreeListEntry::end)
    }

    /// Total bytes currently allocated.
    pub fn used(&self) -> u64 {
        self.entries.iter().map(|entry| entry.size).sum()
    }

    /// Number of live allocations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
