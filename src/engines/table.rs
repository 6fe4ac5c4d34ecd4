use std::mem;

use shakmaty::Move;

/// Larger requests are served with this many megabytes.
const MAX_ALLOCATED_MB: u32 = 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoundType {
    Exact,
    LowerBound,
    UpperBound,
}

#[derive(Clone, Debug)]
pub struct TableEntry {
    pub hash: u64,
    pub depth: u32,
    pub score: i32,
    pub bound_type: BoundType,
    pub best_move: Option<Move>,
}

/// Fixed size, always-replace-if-deeper transposition table.
pub struct TranspositionTable {
    table: Vec<Option<TableEntry>>,
    mask: usize,
    size_mb: u32,
}

impl TranspositionTable {
    #[must_use]
    pub fn new(size_mb: u32) -> Self {
        let entry_size = mem::size_of::<Option<TableEntry>>();
        if size_mb > MAX_ALLOCATED_MB {
            log::warn!("hash size {size_mb} MB capped to {MAX_ALLOCATED_MB} MB");
        }
        let allocated = usize::try_from(size_mb.min(MAX_ALLOCATED_MB)).unwrap_or(1);
        let bytes = allocated * 1024 * 1024;
        let mut num_entries = (bytes / entry_size).next_power_of_two() / 2;
        if num_entries == 0 {
            num_entries = 1024;
        }
        log::debug!("transposition table: {size_mb} MB, {num_entries} entries");

        TranspositionTable {
            table: vec![None; num_entries],
            mask: num_entries - 1,
            size_mb,
        }
    }

    #[must_use]
    pub fn size_mb(&self) -> u32 {
        self.size_mb
    }

    fn index(&self, hash: u64) -> usize {
        // Truncation keeps the low bits, which is all the mask uses.
        (hash as usize) & self.mask
    }

    #[must_use]
    pub fn probe(&self, hash: u64) -> Option<&TableEntry> {
        self.table[self.index(hash)]
            .as_ref()
            .filter(|entry| entry.hash == hash)
    }

    pub fn store(
        &mut self,
        hash: u64,
        depth: u32,
        score: i32,
        bound_type: BoundType,
        best_move: Option<Move>,
    ) {
        let index = self.index(hash);
        let should_replace = match &self.table[index] {
            Some(existing) => depth >= existing.depth,
            None => true,
        };

        if should_replace {
            self.table[index] = Some(TableEntry {
                hash,
                depth,
                score,
                bound_type,
                best_move,
            });
        }
    }

    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(|entry| *entry = None);
    }
}
