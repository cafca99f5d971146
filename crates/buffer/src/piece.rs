// Chunk: docs/chunks/piece_table - Piece table storage engine

//! Arena-allocated piece descriptors.
//!
//! The live document is a doubly-linked chain of pieces bounded by two
//! sentinel nodes. Rather than heap-allocating nodes and juggling raw
//! pointers through the undo/redo swaps, pieces live in a `Vec` arena and
//! link to each other by index. Slots 0 and 1 are permanently reserved for
//! the head and tail sentinels; reclaimed slots go on a free list and are
//! reused by later allocations.

use std::ops::{Index, IndexMut};

/// Index of a piece in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceIdx(u32);

/// Sentinel before the first live piece. `HEAD.next` is `TAIL` when the
/// document chain is empty.
pub const HEAD: PieceIdx = PieceIdx(0);
/// Sentinel after the last live piece.
pub const TAIL: PieceIdx = PieceIdx(1);

impl PieceIdx {
    pub fn is_sentinel(self) -> bool {
        self == HEAD || self == TAIL
    }
}

/// A contiguous slice of one sequence buffer, linked into document order.
///
/// A detached piece (captured into an undo range) keeps its `prev`/`next`
/// fields pointing at the live-list nodes that flanked it at capture time;
/// undo and redo rely on those stale end-links to find the splice point.
#[derive(Debug)]
pub struct Piece {
    /// Id of the backing sequence buffer (index into the table's buffer list).
    pub buffer: usize,
    /// Byte offset of the slice within the backing buffer.
    pub offset: usize,
    /// Byte length of the slice. Sentinels and the setup piece of an empty
    /// document have length zero.
    pub length: usize,
    pub prev: Option<PieceIdx>,
    pub next: Option<PieceIdx>,
}

/// Slab of pieces with a free list.
#[derive(Debug)]
pub struct PieceArena {
    pieces: Vec<Piece>,
    free: Vec<PieceIdx>,
}

impl PieceArena {
    /// Creates an arena holding just the two linked sentinels.
    pub fn new() -> Self {
        let head = Piece {
            buffer: 0,
            offset: 0,
            length: 0,
            prev: None,
            next: Some(TAIL),
        };
        let tail = Piece {
            buffer: 0,
            offset: 0,
            length: 0,
            prev: Some(HEAD),
            next: None,
        };
        Self {
            pieces: vec![head, tail],
            free: Vec::new(),
        }
    }

    /// Allocates an unlinked piece, reusing a freed slot when one exists.
    pub fn alloc(&mut self, buffer: usize, offset: usize, length: usize) -> PieceIdx {
        let piece = Piece {
            buffer,
            offset,
            length,
            prev: None,
            next: None,
        };
        match self.free.pop() {
            Some(idx) => {
                self.pieces[idx.0 as usize] = piece;
                idx
            }
            None => {
                let idx = PieceIdx(self.pieces.len() as u32);
                self.pieces.push(piece);
                idx
            }
        }
    }

    /// Returns a slot to the free list.
    ///
    /// The caller must guarantee nothing reachable still references `idx` —
    /// the slot will be handed out again by a later `alloc`.
    pub fn free(&mut self, idx: PieceIdx) {
        debug_assert!(!idx.is_sentinel(), "attempted to free a sentinel piece");
        debug_assert!(!self.free.contains(&idx), "double free of piece slot");
        self.free.push(idx);
    }

    /// Unlinks `idx` from whatever chain it sits in, joining its neighbors.
    ///
    /// The piece's own links are left untouched (they become stale, exactly
    /// like a captured chain's end-links).
    pub fn unlink(&mut self, idx: PieceIdx) {
        let prev = self[idx].prev.expect("unlink of piece with no prev link");
        let next = self[idx].next.expect("unlink of piece with no next link");
        self[prev].next = Some(next);
        self[next].prev = Some(prev);
    }

    /// Number of live (non-freed) slots, sentinels included. Test aid.
    #[cfg(test)]
    pub fn live_count(&self) -> usize {
        self.pieces.len() - self.free.len()
    }
}

impl Index<PieceIdx> for PieceArena {
    type Output = Piece;

    fn index(&self, idx: PieceIdx) -> &Piece {
        &self.pieces[idx.0 as usize]
    }
}

impl IndexMut<PieceIdx> for PieceArena {
    fn index_mut(&mut self, idx: PieceIdx) -> &mut Piece {
        &mut self.pieces[idx.0 as usize]
    }
}
