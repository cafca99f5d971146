// Chunk: docs/chunks/piece_table - Piece table storage engine

//! Undo/redo capture machinery.
//!
//! The unit of history is a [`PieceRange`]: either a *boundary* (a position
//! between two live pieces, capturing "nothing was here") or a detached run
//! of pieces that used to be in the live chain. Undo and redo swap a range's
//! chain with whatever currently occupies its place in the document, push
//! the range onto the opposite stack, and hand the caller back the metadata
//! that was attached when the range was captured.

use crate::piece::{PieceArena, PieceIdx};

/// A detached run of pieces, or a boundary between two live pieces.
///
/// A boundary chain's `first`/`last` point at the two live pieces flanking
/// an empty gap. A content chain's `first`/`last` are the ends of a detached
/// sub-list whose outer links still point at the live pieces that flanked it
/// at capture time.
#[derive(Debug, Clone, Copy)]
pub struct Chain {
    pub is_boundary: bool,
    pub first: Option<PieceIdx>,
    pub last: Option<PieceIdx>,
}

impl Chain {
    /// A fresh, empty boundary chain.
    pub fn empty() -> Self {
        Self {
            is_boundary: true,
            first: None,
            last: None,
        }
    }

    /// A boundary chain flanked by `before` and `after`.
    pub fn boundary(before: PieceIdx, after: PieceIdx) -> Self {
        Self {
            is_boundary: true,
            first: Some(before),
            last: Some(after),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.first.is_none()
    }

    /// Appends one piece, linking it after the current last.
    ///
    /// The piece's `next` link is left alone; when pieces are captured in
    /// live order during a delete walk, the final piece's stale `next` is
    /// what later locates the restore splice point.
    pub fn push_piece(&mut self, arena: &mut PieceArena, pd: PieceIdx) {
        match self.last {
            None => self.first = Some(pd),
            Some(last) => {
                arena[last].next = Some(pd);
                arena[pd].prev = Some(last);
            }
        }
        self.last = Some(pd);
        self.is_boundary = false;
    }

    /// Appends another chain's content to this one.
    pub fn append(&mut self, arena: &mut PieceArena, other: &Chain) {
        if other.is_boundary {
            return;
        }
        let other_first = other.first.expect("content chain with no first piece");
        let other_last = other.last.expect("content chain with no last piece");
        if self.is_boundary {
            self.first = Some(other_first);
            self.last = Some(other_last);
            self.is_boundary = false;
        } else {
            let last = self.last.expect("content chain with no last piece");
            arena[other_first].prev = Some(last);
            arena[last].next = Some(other_first);
            self.last = Some(other_last);
        }
    }

    /// Prepends another chain's content to this one.
    pub fn prepend(&mut self, arena: &mut PieceArena, other: &Chain) {
        if other.is_boundary {
            return;
        }
        let other_first = other.first.expect("content chain with no first piece");
        let other_last = other.last.expect("content chain with no last piece");
        if self.is_boundary {
            self.first = Some(other_first);
            self.last = Some(other_last);
            self.is_boundary = false;
        } else {
            let first = self.first.expect("content chain with no first piece");
            arena[other_last].next = Some(first);
            arena[first].prev = Some(other_last);
            self.first = Some(other_first);
        }
    }

    /// Walks the chain's pieces in order. No-op for boundary chains.
    ///
    /// The walk is delimited by `last`, never by a `None` link — the end
    /// piece's `next` is stale and points back into the live list.
    pub fn for_each_piece(&self, arena: &PieceArena, mut f: impl FnMut(PieceIdx)) {
        if self.is_boundary {
            return;
        }
        let last = self.last.expect("content chain with no last piece");
        let mut idx = self.first.expect("content chain with no first piece");
        loop {
            let next = arena[idx].next;
            f(idx);
            if idx == last {
                break;
            }
            idx = next.expect("content chain broken before its last piece");
        }
    }
}

/// One undo/redo step: a captured chain plus bookkeeping and the caller's
/// metadata (typically a cursor snapshot).
///
/// `seq_length` holds the document length on the *other* side of this step;
/// restore swaps it with the table's current length, which is what makes
/// repeated undo/redo exactly reversible.
#[derive(Debug)]
pub struct PieceRange<M> {
    pub chain: Chain,
    /// Document offset of the edit group. Bookkeeping only.
    pub index: usize,
    /// Total bytes inserted or deleted by the group.
    pub length: usize,
    pub seq_length: usize,
    pub metadata: M,
}

impl<M> PieceRange<M> {
    pub fn new(index: usize, length: usize, seq_length: usize, metadata: M) -> Self {
        Self {
            chain: Chain::empty(),
            index,
            length,
            seq_length,
            metadata,
        }
    }
}

/// LIFO stack of captured ranges. The piece table owns one for undo and one
/// for redo.
#[derive(Debug)]
pub struct EventStack<M> {
    captures: Vec<PieceRange<M>>,
}

impl<M> EventStack<M> {
    pub fn new() -> Self {
        Self {
            captures: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    pub fn push(&mut self, range: PieceRange<M>) {
        self.captures.push(range);
    }

    pub fn pop(&mut self) -> Option<PieceRange<M>> {
        self.captures.pop()
    }

    pub fn last_mut(&mut self) -> Option<&mut PieceRange<M>> {
        self.captures.last_mut()
    }

    /// Empties the stack, yielding the evicted ranges so the table can
    /// reclaim their pieces.
    pub fn drain(&mut self) -> std::vec::Drain<'_, PieceRange<M>> {
        self.captures.drain(..)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.captures.len()
    }
}
