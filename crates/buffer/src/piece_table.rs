// Chunk: docs/chunks/piece_table - Piece table storage engine

//! The piece table: an offset-addressed, undo-capable text sequence.
//!
//! Document text lives in append-only sequence buffers; the document itself
//! is a doubly-linked chain of pieces referencing slices of those buffers.
//! Edits never rewrite bytes — an insert appends to the current add buffer
//! and splices new pieces into the chain, a delete detaches a sub-chain.
//! Detached sub-chains (or boundary markers, for pure insertions) are pushed
//! onto the undo stack; undo and redo swap them back and forth between the
//! stacks and the live chain.
//!
//! Consecutive compatible edits coalesce: typing a word, or holding
//! backspace, produces a single undo step. [`PieceTable::break_group`] ends
//! the open group explicitly (the editor calls it at word boundaries).
//!
//! Out-of-range offsets are contract violations and panic; the line buffer
//! overlay validates coordinates before they reach this layer.

use crate::history::{Chain, EventStack, PieceRange};
use crate::piece::{PieceArena, PieceIdx, HEAD, TAIL};
use crate::seq_buffer::{ADD_BUFFER_HEADROOM, SeqBuffer};
use crate::types::EditKind;

#[derive(Debug, Clone, Copy)]
enum Direction {
    Undo,
    Redo,
}

/// Piece table over append-only sequence buffers, with coalescing undo/redo.
///
/// `M` is an opaque per-edit metadata value supplied by the caller (the
/// editor passes a cursor snapshot). The metadata captured when an undo
/// group is opened is returned by the `undo`/`redo` that reverts it, which
/// is how the cursor layer repositions itself.
#[derive(Debug)]
pub struct PieceTable<M> {
    arena: PieceArena,
    buffers: Vec<SeqBuffer>,
    undo_stack: EventStack<M>,
    redo_stack: EventStack<M>,
    /// Total byte length of the live chain.
    seq_length: usize,
    /// Id of the sequence buffer currently receiving inserted text.
    add_buffer: usize,
    /// Kind and end offset of the last edit; `None` after setup, a group
    /// break, undo/redo, or add-buffer growth.
    last_event: Option<(EditKind, usize)>,
    /// Leftover left remainder of the last delete's split, kept only as a
    /// same-turn coalescing hint.
    frag_left: Option<PieceIdx>,
    /// Leftover right remainder, likewise.
    frag_right: Option<PieceIdx>,
    /// Net undo groups opened since the last `dirty_reset`; zero means the
    /// document is content-equivalent to its last saved state.
    edits_since_save: i64,
}

impl<M> PieceTable<M> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::from_str("")
    }

    /// Creates a table seeded with `initial`.
    ///
    /// The setup buffer is sized exactly to the text, so the first insert
    /// rolls over to a fresh add buffer and the original bytes are never
    /// appended to again.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(initial: &str) -> Self {
        let mut arena = PieceArena::new();
        let mut setup = SeqBuffer::new(initial.len());
        setup.append(initial.as_bytes());

        let pd = arena.alloc(0, 0, initial.len());
        arena[pd].prev = Some(HEAD);
        arena[pd].next = Some(TAIL);
        arena[HEAD].next = Some(pd);
        arena[TAIL].prev = Some(pd);

        Self {
            arena,
            buffers: vec![setup],
            undo_stack: EventStack::new(),
            redo_stack: EventStack::new(),
            seq_length: initial.len(),
            add_buffer: 0,
            last_event: None,
            frag_left: None,
            frag_right: None,
            edits_since_save: 0,
        }
    }

    /// Total byte length of the document.
    pub fn len(&self) -> usize {
        self.seq_length
    }

    pub fn is_empty(&self) -> bool {
        self.seq_length == 0
    }

    /// True if the document differs structurally from its last saved state.
    ///
    /// Tracked as a signed counter of undo groups, so undoing back to the
    /// save point reports clean again.
    pub fn dirty(&self) -> bool {
        self.edits_since_save != 0
    }

    /// Pins the current state as the new "clean" reference.
    pub fn dirty_reset(&mut self) {
        self.edits_since_save = 0;
    }

    /// Ends the open coalescing group: the next edit starts a fresh undo
    /// step regardless of adjacency.
    pub fn break_group(&mut self) {
        self.last_event = None;
    }

    // ==================== Edits ====================

    /// Inserts `text` before offset `index`.
    ///
    /// Panics if `index > len()`. Empty text is a no-op.
    pub fn insert(&mut self, index: usize, text: &str, metadata: M) {
        assert!(
            index <= self.seq_length,
            "insert offset {} out of bounds (document length {})",
            index,
            self.seq_length
        );
        if text.is_empty() {
            return;
        }
        let length = text.len();

        let (piece_start, piece) = self.piece_at(index);
        let add_offset = self.import_text(text);
        self.purge_redo();

        let insert_offset = index - piece_start;

        if insert_offset == 0 && self.can_coalesce(EditKind::Insert, index) {
            // Typing continues the previous insertion: grow the piece and
            // the open undo group in place. No new piece, no new undo step.
            let prev = self.arena[piece]
                .prev
                .expect("piece at insertion point has no prev link");
            self.arena[prev].length += length;
            self.undo_stack
                .last_mut()
                .expect("coalescing onto an empty undo stack")
                .length += length;
        } else if insert_offset == 0 {
            // At a piece boundary: one new piece, and the undo step records
            // the flanking pair so undo knows the gap was empty.
            self.frag_left = None;
            self.frag_right = None;

            let before = self.arena[piece]
                .prev
                .expect("piece at insertion point has no prev link");
            let mut group = self.open_group(index, length, metadata);
            group.chain = Chain::boundary(before, piece);

            let pd = self.arena.alloc(self.add_buffer, add_offset, length);
            let mut new_chain = Chain::empty();
            new_chain.push_piece(&mut self.arena, pd);

            self.splice(&group.chain, &new_chain);
            self.undo_stack.push(group);
        } else {
            // Mid-piece: split the owner into left + inserted + right, and
            // capture the original piece for undo.
            self.frag_left = None;
            self.frag_right = None;

            let (buffer, offset, piece_len) = {
                let p = &self.arena[piece];
                (p.buffer, p.offset, p.length)
            };

            let mut group = self.open_group(index, length, metadata);
            group.chain.push_piece(&mut self.arena, piece);

            let left = self.arena.alloc(buffer, offset, insert_offset);
            let mid = self.arena.alloc(self.add_buffer, add_offset, length);
            let right = self
                .arena
                .alloc(buffer, offset + insert_offset, piece_len - insert_offset);

            let mut new_chain = Chain::empty();
            new_chain.push_piece(&mut self.arena, left);
            new_chain.push_piece(&mut self.arena, mid);
            new_chain.push_piece(&mut self.arena, right);

            self.splice(&group.chain, &new_chain);
            self.undo_stack.push(group);
        }

        self.seq_length += length;
        self.last_event = Some((EditKind::Insert, index + length));
        self.assert_chain_consistent();
    }

    /// Deletes `length` bytes starting at offset `index`.
    ///
    /// Panics if the range is out of bounds or `length` is zero.
    pub fn delete(&mut self, index: usize, length: usize, kind: EditKind, metadata: M) {
        assert!(length > 0, "delete length must be nonzero");
        assert!(
            length <= self.seq_length && index <= self.seq_length - length,
            "delete range {}..{} out of bounds (document length {})",
            index,
            index + length,
            self.seq_length
        );

        let (piece_start, piece) = self.piece_at(index);
        let piece_end = piece_start + self.arena[piece].length;

        let mut pd = piece;
        let rm_offset = index - piece_start;
        let mut rm_length = length;

        let mut old_chain = Chain::empty();
        let mut new_chain = Chain::empty();

        // Whether the removed run attaches after (forward delete) or before
        // (backspace run) the open group's existing content.
        let append;

        if index == piece_start && self.can_coalesce(kind, index) {
            // Forward delete continuing the previous one: extend the open
            // group and eat into the tracked right remainder first.
            let group = self
                .undo_stack
                .last_mut()
                .expect("coalescing onto an empty undo stack");
            group.length += length;
            append = true;

            if let Some(frag) = self.frag_right {
                if length < self.arena[frag].length {
                    self.arena[frag].length -= length;
                    self.arena[frag].offset += length;
                    self.seq_length -= length;
                    self.last_event = Some((kind, index));
                    return;
                }
                // The fragment is fully consumed; the bytes it referenced
                // are already covered by the group's captured chain.
                rm_length -= self.arena[frag].length;
                pd = self.arena[frag]
                    .next
                    .expect("right fragment has no next link");
                self.arena.unlink(frag);
                self.arena.free(frag);
                self.frag_right = None;
            }
        } else if index + length == piece_end && self.can_coalesce(kind, index + length) {
            // Backward delete (backspace run): same idea against the left
            // remainder, shrinking it from its end.
            let group = self
                .undo_stack
                .last_mut()
                .expect("coalescing onto an empty undo stack");
            group.length += length;
            group.index = index;
            append = false;

            if let Some(frag) = self.frag_left {
                if length < self.arena[frag].length {
                    self.arena[frag].length -= length;
                    self.seq_length -= length;
                    self.last_event = Some((kind, index));
                    return;
                }
                rm_length -= self.arena[frag].length;
                self.arena.unlink(frag);
                self.arena.free(frag);
                self.frag_left = None;
            }
        } else {
            append = true;
            self.frag_left = None;
            self.frag_right = None;
            let group = self.open_group(index, length, metadata);
            self.undo_stack.push(group);
        }

        self.purge_redo();

        // Deletion starts midway through a piece: keep a left remainder,
        // and a right remainder too when the span ends inside it.
        if rm_offset != 0 {
            let (buffer, offset, piece_len) = {
                let p = &self.arena[pd];
                (p.buffer, p.offset, p.length)
            };

            let left = self.arena.alloc(buffer, offset, rm_offset);
            new_chain.push_piece(&mut self.arena, left);
            self.frag_left = Some(left);

            if rm_offset + rm_length < piece_len {
                let right = self.arena.alloc(
                    buffer,
                    offset + rm_offset + rm_length,
                    piece_len - (rm_offset + rm_length),
                );
                new_chain.push_piece(&mut self.arena, right);
                self.frag_right = Some(right);
            }

            rm_length -= rm_length.min(piece_len - rm_offset);

            let next = self.arena[pd].next;
            old_chain.push_piece(&mut self.arena, pd);
            pd = next.expect("live piece has no next link");
        }

        // Walk whole pieces covered by the rest of the span.
        while rm_length > 0 && pd != TAIL {
            let (buffer, offset, piece_len) = {
                let p = &self.arena[pd];
                (p.buffer, p.offset, p.length)
            };

            if rm_length < piece_len {
                let right = self
                    .arena
                    .alloc(buffer, offset + rm_length, piece_len - rm_length);
                new_chain.push_piece(&mut self.arena, right);
                self.frag_right = Some(right);
            }

            rm_length -= rm_length.min(piece_len);

            let next = self.arena[pd].next;
            old_chain.push_piece(&mut self.arena, pd);
            pd = next.expect("live piece has no next link");
        }

        self.splice(&old_chain, &new_chain);
        self.seq_length -= length;

        let group = self
            .undo_stack
            .last_mut()
            .expect("delete finished with no open undo group");
        if append {
            group.chain.append(&mut self.arena, &old_chain);
        } else {
            group.chain.prepend(&mut self.arena, &old_chain);
        }

        self.last_event = Some((kind, index));
        self.assert_chain_consistent();
    }

    // ==================== Undo / redo ====================

    /// Reverts the most recent undo group.
    ///
    /// Returns the metadata captured when the group was opened, or `None`
    /// (leaving the document untouched) if there is nothing to undo.
    pub fn undo(&mut self) -> Option<M>
    where
        M: Clone,
    {
        let metadata = self.transfer(Direction::Undo)?;
        self.edits_since_save -= 1;
        Some(metadata)
    }

    /// Re-applies the most recently undone group.
    pub fn redo(&mut self) -> Option<M>
    where
        M: Clone,
    {
        let metadata = self.transfer(Direction::Redo)?;
        self.edits_since_save += 1;
        Some(metadata)
    }

    fn transfer(&mut self, dir: Direction) -> Option<M>
    where
        M: Clone,
    {
        let mut range = match dir {
            Direction::Undo => self.undo_stack.pop(),
            Direction::Redo => self.redo_stack.pop(),
        }?;

        self.last_event = None;
        self.frag_left = None;
        self.frag_right = None;

        self.restore(&mut range.chain);
        std::mem::swap(&mut range.seq_length, &mut self.seq_length);

        let metadata = range.metadata.clone();
        match dir {
            Direction::Undo => self.redo_stack.push(range),
            Direction::Redo => self.undo_stack.push(range),
        }
        self.assert_chain_consistent();
        Some(metadata)
    }

    // ==================== Read access ====================

    /// Copies `length` bytes starting at offset `index` out of the backing
    /// buffers. O(pieces touched).
    pub fn render(&self, index: usize, length: usize) -> Vec<u8> {
        assert!(
            index + length <= self.seq_length,
            "render range {}..{} out of bounds (document length {})",
            index,
            index + length,
            self.seq_length
        );

        let mut out = Vec::with_capacity(length);
        if length == 0 {
            return out;
        }

        let (piece_start, mut pd) = self.piece_at(index);
        let mut pd_offset = index - piece_start;
        let mut remaining = length;

        while remaining > 0 && pd != TAIL {
            let p = &self.arena[pd];
            let take = (p.length - pd_offset).min(remaining);
            if take > 0 {
                out.extend_from_slice(self.buffers[p.buffer].slice(p.offset + pd_offset, take));
            }
            remaining -= take;
            pd_offset = 0;
            pd = p.next.expect("live piece has no next link");
        }

        out
    }

    // ==================== Internals ====================

    fn can_coalesce(&self, kind: EditKind, index: usize) -> bool {
        self.last_event == Some((kind, index))
    }

    /// Opens a new undo group capturing the pre-edit document length and
    /// the caller's metadata. Moves the dirty counter.
    fn open_group(&mut self, index: usize, length: usize, metadata: M) -> PieceRange<M> {
        self.edits_since_save += 1;
        PieceRange::new(index, length, self.seq_length, metadata)
    }

    /// Appends `text` to the current add buffer, rolling over to a new one
    /// when it is full. Returns the offset of the appended bytes.
    fn import_text(&mut self, text: &str) -> usize {
        if self.buffers[self.add_buffer].would_overflow(text.len()) {
            self.add_buffer = self.buffers.len();
            self.buffers
                .push(SeqBuffer::new(text.len() + ADD_BUFFER_HEADROOM));
            // Growth ends the open group; typing runs never coalesce across
            // an add-buffer roll-over.
            self.last_event = None;
        }
        self.buffers[self.add_buffer].append(text.as_bytes())
    }

    /// Frees everything the redo stack still holds. Called on every fresh
    /// edit: there is no redoing past a diverging edit.
    fn purge_redo(&mut self) {
        if self.redo_stack.is_empty() {
            return;
        }
        let mut doomed = Vec::new();
        for range in self.redo_stack.drain() {
            range.chain.for_each_piece(&self.arena, |idx| doomed.push(idx));
        }
        for idx in doomed {
            self.arena.free(idx);
        }
    }

    /// Finds the piece owning offset `index`.
    ///
    /// Returns `(piece start offset, piece)`; for `index == len()` the
    /// result is `(len(), TAIL)`, the insert-at-end case.
    fn piece_at(&self, index: usize) -> (usize, PieceIdx) {
        let mut curr = 0;
        let mut pd = self.arena[HEAD].next.expect("head sentinel unlinked");
        while pd != TAIL {
            let len = self.arena[pd].length;
            if index >= curr && index < curr + len {
                return (curr, pd);
            }
            curr += len;
            pd = self.arena[pd].next.expect("live piece has no next link");
        }
        if index == curr {
            return (curr, TAIL);
        }
        panic!(
            "offset {} unreachable from the live chain (walked {} bytes)",
            index, curr
        );
    }

    /// Replaces `old`'s position in the live list with the `new` chain.
    ///
    /// `old` may be a boundary (pure insertion) or a detached-run capture
    /// whose end-links still point at its live flanks. Both chains empty is
    /// a no-op (a coalescing delete that exactly consumed a fragment).
    fn splice(&mut self, old: &Chain, new: &Chain) {
        if old.is_boundary {
            let (Some(before), Some(after)) = (old.first, old.last) else {
                debug_assert!(new.is_empty(), "cannot splice a chain into nowhere");
                return;
            };
            if !new.is_boundary {
                let first = new.first.expect("content chain with no first piece");
                let last = new.last.expect("content chain with no last piece");
                self.arena[before].next = Some(first);
                self.arena[after].prev = Some(last);
                self.arena[first].prev = Some(before);
                self.arena[last].next = Some(after);
            }
        } else {
            let first = old.first.expect("content chain with no first piece");
            let last = old.last.expect("content chain with no last piece");
            let before = self.arena[first]
                .prev
                .expect("live chain start has no prev link");
            let after = self.arena[last]
                .next
                .expect("live chain end has no next link");

            if new.is_boundary {
                self.arena[before].next = Some(after);
                self.arena[after].prev = Some(before);
            } else {
                let nfirst = new.first.expect("content chain with no first piece");
                let nlast = new.last.expect("content chain with no last piece");
                self.arena[before].next = Some(nfirst);
                self.arena[after].prev = Some(nlast);
                self.arena[nfirst].prev = Some(before);
                self.arena[nlast].next = Some(after);
            }
        }
    }

    /// Swaps a captured chain with whatever currently occupies its place in
    /// the live list, inverting the chain in the process: a boundary becomes
    /// the run it displaced and vice versa. The heart of undo/redo.
    fn restore(&mut self, chain: &mut Chain) {
        if chain.is_boundary {
            let before = chain.first.expect("boundary chain with no flanks");
            let after = chain.last.expect("boundary chain with no flanks");
            let first = self.arena[before]
                .next
                .expect("flank piece has no next link");
            let last = self.arena[after]
                .prev
                .expect("flank piece has no prev link");

            // Unlink the occupying run from the live list and keep it: the
            // boundary becomes a content chain.
            self.arena[before].next = Some(after);
            self.arena[after].prev = Some(before);
            chain.first = Some(first);
            chain.last = Some(last);
            chain.is_boundary = false;
        } else {
            let first = chain.first.expect("content chain with no first piece");
            let last = chain.last.expect("content chain with no last piece");
            let before = self.arena[first]
                .prev
                .expect("captured chain lost its left flank");
            let after = self.arena[last]
                .next
                .expect("captured chain lost its right flank");

            if self.arena[before].next == Some(after) {
                // The capture point is an empty gap: relink the stored run
                // and remember the flanks as a boundary.
                self.arena[before].next = Some(first);
                self.arena[after].prev = Some(last);
                chain.first = Some(before);
                chain.last = Some(after);
                chain.is_boundary = true;
            } else {
                // Swap the stored run with the run now occupying the gap.
                let cur_first = self.arena[before]
                    .next
                    .expect("flank piece has no next link");
                let cur_last = self.arena[after]
                    .prev
                    .expect("flank piece has no prev link");
                self.arena[before].next = Some(first);
                self.arena[after].prev = Some(last);
                chain.first = Some(cur_first);
                chain.last = Some(cur_last);
            }
        }
    }

    /// Debug check: the live chain's lengths must sum to `seq_length`.
    #[cfg(debug_assertions)]
    fn assert_chain_consistent(&self) {
        let mut total = 0;
        let mut pd = self.arena[HEAD].next.expect("head sentinel unlinked");
        while pd != TAIL {
            total += self.arena[pd].length;
            pd = self.arena[pd].next.expect("live piece has no next link");
        }
        assert_eq!(
            total, self.seq_length,
            "live chain length drifted from seq_length"
        );
    }

    #[cfg(not(debug_assertions))]
    fn assert_chain_consistent(&self) {}
}

impl<M> Default for PieceTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn text<M>(pt: &PieceTable<M>) -> String {
        String::from_utf8(pt.render(0, pt.len())).unwrap()
    }

    #[test]
    fn test_setup_renders_initial() {
        let pt: PieceTable<()> = PieceTable::from_str("hello world");
        assert_eq!(pt.len(), 11);
        assert_eq!(text(&pt), "hello world");
        assert!(!pt.dirty());
    }

    #[test]
    fn test_insert_and_delete_walk() {
        // The reference scenario: two mid-piece inserts, then two deletes
        // spanning several pieces, then undo/redo of the last delete.
        let mut pt: PieceTable<()> = PieceTable::from_str("hello world");

        pt.insert(3, "goodbye", ());
        assert_eq!(text(&pt), "helgoodbyelo world");

        pt.insert(6, "xx", ());
        assert_eq!(text(&pt), "helgooxxdbyelo world");

        pt.delete(3, 9, EditKind::Delete, ());
        assert_eq!(text(&pt), "hello world");

        pt.delete(0, 6, EditKind::Delete, ());
        assert_eq!(text(&pt), "world");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "hello world");

        assert!(pt.redo().is_some());
        assert_eq!(text(&pt), "world");

        pt.insert(5, "   xx", ());
        assert_eq!(text(&pt), "world   xx");

        pt.insert(5, "   yy", ());
        assert_eq!(text(&pt), "world   yy   xx");
    }

    #[test]
    fn test_empty_setup() {
        let mut pt: PieceTable<()> = PieceTable::new();
        assert_eq!(pt.len(), 0);
        assert_eq!(text(&pt), "");

        pt.insert(0, "hello", ());
        assert_eq!(text(&pt), "hello");
    }

    #[test]
    fn test_empty_insert_is_noop() {
        let mut pt: PieceTable<()> = PieceTable::from_str("ab");
        pt.insert(1, "", ());
        assert_eq!(text(&pt), "ab");
        assert!(!pt.dirty());
        assert!(pt.undo().is_none());
    }

    #[test]
    fn test_undo_floor_is_noop() {
        let mut pt: PieceTable<()> = PieceTable::from_str("abc");
        pt.insert(3, "d", ());
        assert!(pt.undo().is_some());
        assert!(pt.undo().is_none());
        assert!(pt.undo().is_none());
        assert_eq!(text(&pt), "abc");
    }

    #[test]
    fn test_typing_coalesces_into_one_group() {
        let mut pt: PieceTable<()> = PieceTable::new();
        pt.insert(0, "a", ());
        pt.insert(1, "b", ());
        pt.insert(2, "c", ());
        assert_eq!(text(&pt), "abc");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "");
        assert!(pt.undo().is_none());
    }

    #[test]
    fn test_break_splits_groups() {
        let mut pt: PieceTable<()> = PieceTable::new();
        pt.insert(0, "a", ());
        pt.insert(1, "b", ());
        pt.break_group();
        pt.insert(2, "c", ());
        pt.insert(3, "d", ());
        assert_eq!(text(&pt), "abcd");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "ab");
        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "");
    }

    #[test]
    fn test_nonadjacent_inserts_do_not_coalesce() {
        let mut pt: PieceTable<()> = PieceTable::from_str("abcd");
        pt.insert(1, "x", ());
        pt.insert(4, "y", ());
        assert_eq!(text(&pt), "axbcyd");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "axbcd");
        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "abcd");
    }

    #[test]
    fn test_forward_delete_coalesces() {
        let mut pt: PieceTable<()> = PieceTable::from_str("abcdef");
        pt.delete(0, 1, EditKind::Delete, ());
        pt.delete(0, 1, EditKind::Delete, ());
        pt.delete(0, 1, EditKind::Delete, ());
        assert_eq!(text(&pt), "def");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "abcdef");
        assert!(pt.undo().is_none());
    }

    #[test]
    fn test_backward_delete_coalesces() {
        let mut pt: PieceTable<()> = PieceTable::from_str("abcdef");
        pt.delete(5, 1, EditKind::Delete, ());
        pt.delete(4, 1, EditKind::Delete, ());
        pt.delete(3, 1, EditKind::Delete, ());
        assert_eq!(text(&pt), "abc");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "abcdef");
        assert!(pt.undo().is_none());
    }

    #[test]
    fn test_delete_gap_breaks_coalescing() {
        let mut pt: PieceTable<()> = PieceTable::from_str("hello world");
        pt.delete(10, 1, EditKind::Delete, ());
        pt.delete(8, 1, EditKind::Delete, ());
        assert_eq!(text(&pt), "hello wol");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "hello worl");
        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "hello world");
    }

    #[test]
    fn test_delete_spanning_many_pieces() {
        let mut pt: PieceTable<()> = PieceTable::new();
        pt.insert(0, "aa", ());
        pt.break_group();
        pt.insert(2, "bb", ());
        pt.break_group();
        pt.insert(4, "cc", ());
        assert_eq!(text(&pt), "aabbcc");

        pt.delete(1, 4, EditKind::Delete, ());
        assert_eq!(text(&pt), "ac");

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "aabbcc");
    }

    #[test]
    fn test_fresh_edit_clears_redo() {
        let mut pt: PieceTable<()> = PieceTable::from_str("abc");
        pt.delete(0, 1, EditKind::Delete, ());
        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "abc");

        pt.insert(3, "z", ());
        assert!(pt.redo().is_none());
        assert_eq!(text(&pt), "abcz");
    }

    #[test]
    fn test_editing_after_purge_stays_consistent() {
        // Clearing the redo stack reclaims piece slots; later edits reuse
        // them. A full undo walk afterwards must still reach the original.
        let mut pt: PieceTable<()> = PieceTable::from_str("base");
        pt.insert(4, " one", ());
        pt.break_group();
        pt.insert(8, " two", ());
        assert!(pt.undo().is_some());
        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "base");

        // Both undone groups sit on the redo stack; this purges them.
        pt.insert(0, ">> ", ());
        assert_eq!(text(&pt), ">> base");

        pt.break_group();
        pt.insert(7, "!", ());
        pt.delete(0, 3, EditKind::Delete, ());
        assert_eq!(text(&pt), "base!");

        while pt.undo().is_some() {}
        assert_eq!(text(&pt), "base");
    }

    #[test]
    fn test_render_subranges() {
        let mut pt: PieceTable<()> = PieceTable::from_str("hello world");
        pt.insert(5, ",", ());
        assert_eq!(pt.render(0, 5), b"hello");
        assert_eq!(pt.render(5, 2), b", ");
        assert_eq!(pt.render(7, 5), b"world");
        assert_eq!(pt.render(12, 0), b"");
    }

    #[test]
    fn test_add_buffer_growth_breaks_coalescing() {
        // An insert large enough to roll over to a fresh add buffer must
        // start its own undo group even when adjacent to the previous one.
        let mut pt: PieceTable<()> = PieceTable::new();
        pt.insert(0, "a", ());
        let big = "x".repeat(ADD_BUFFER_HEADROOM + 1);
        pt.insert(1, &big, ());
        assert_eq!(pt.len(), 1 + big.len());

        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "a");
        assert!(pt.undo().is_some());
        assert_eq!(text(&pt), "");
    }

    #[test]
    fn test_dirty_tracking() {
        let mut pt: PieceTable<()> = PieceTable::from_str("abc");
        assert!(!pt.dirty());

        pt.insert(3, "d", ());
        assert!(pt.dirty());

        assert!(pt.undo().is_some());
        assert!(!pt.dirty());

        assert!(pt.redo().is_some());
        assert!(pt.dirty());

        pt.dirty_reset();
        assert!(!pt.dirty());

        // Undoing past the save point is dirty again; redo returns clean.
        assert!(pt.undo().is_some());
        assert!(pt.dirty());
        assert!(pt.redo().is_some());
        assert!(!pt.dirty());
    }

    #[test]
    fn test_coalesced_typing_is_one_dirty_step() {
        let mut pt: PieceTable<()> = PieceTable::new();
        pt.insert(0, "a", ());
        pt.insert(1, "b", ());
        assert!(pt.dirty());
        assert!(pt.undo().is_some());
        assert!(!pt.dirty());
    }

    #[test]
    fn test_metadata_round_trip() {
        let mut pt: PieceTable<Position> = PieceTable::new();
        pt.insert(0, "one", Position::new(0, 0));
        pt.break_group();
        pt.insert(3, "!", Position::new(0, 3));

        assert_eq!(pt.undo(), Some(Position::new(0, 3)));
        assert_eq!(pt.undo(), Some(Position::new(0, 0)));
        assert_eq!(pt.undo(), None);

        assert_eq!(pt.redo(), Some(Position::new(0, 0)));
        assert_eq!(pt.redo(), Some(Position::new(0, 3)));
        assert_eq!(pt.redo(), None);
    }

    #[test]
    fn test_coalesced_group_keeps_opening_metadata() {
        let mut pt: PieceTable<Position> = PieceTable::new();
        pt.insert(0, "a", Position::new(0, 0));
        pt.insert(1, "b", Position::new(0, 1));
        pt.insert(2, "c", Position::new(0, 2));
        assert_eq!(pt.undo(), Some(Position::new(0, 0)));
    }

    #[test]
    fn test_undo_redo_ping_pong() {
        let mut pt: PieceTable<()> = PieceTable::from_str("hello world");
        pt.delete(0, 6, EditKind::Delete, ());
        for _ in 0..4 {
            assert!(pt.undo().is_some());
            assert_eq!(text(&pt), "hello world");
            assert!(pt.redo().is_some());
            assert_eq!(text(&pt), "world");
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Insert(usize, String),
            Delete(usize, usize),
            Break,
        }

        fn op_strategy() -> impl Strategy<Value = Op> {
            prop_oneof![
                (any::<usize>(), "[a-z\\n]{1,6}").prop_map(|(at, s)| Op::Insert(at, s)),
                (any::<usize>(), 1..5usize).prop_map(|(at, len)| Op::Delete(at, len)),
                Just(Op::Break),
            ]
        }

        /// Applies `op` to both the table and a reference `String` model,
        /// clamping positions into range the same way for both.
        fn apply(pt: &mut PieceTable<()>, model: &mut String, op: &Op) {
            match op {
                Op::Insert(at, s) => {
                    let at = at % (model.len() + 1);
                    pt.insert(at, s, ());
                    model.insert_str(at, s);
                }
                Op::Delete(at, len) => {
                    if model.is_empty() {
                        return;
                    }
                    let at = at % model.len();
                    let len = (*len).min(model.len() - at);
                    pt.delete(at, len, EditKind::Delete, ());
                    model.replace_range(at..at + len, "");
                }
                Op::Break => pt.break_group(),
            }
        }

        proptest! {
            #[test]
            fn edits_match_string_model(
                initial in "[a-z\\n]{0,20}",
                ops in prop::collection::vec(op_strategy(), 0..40),
            ) {
                let mut pt: PieceTable<()> = PieceTable::from_str(&initial);
                let mut model = initial;
                for op in &ops {
                    apply(&mut pt, &mut model, op);
                }
                prop_assert_eq!(text(&pt), model);
            }

            #[test]
            fn full_undo_walk_restores_initial(
                initial in "[a-z\\n]{0,20}",
                ops in prop::collection::vec(op_strategy(), 0..40),
            ) {
                let mut pt: PieceTable<()> = PieceTable::from_str(&initial);
                let mut model = initial.clone();
                for op in &ops {
                    apply(&mut pt, &mut model, op);
                }
                while pt.undo().is_some() {}
                prop_assert_eq!(text(&pt), initial);
            }

            #[test]
            fn undo_then_redo_is_identity(
                initial in "[a-z\\n]{0,20}",
                ops in prop::collection::vec(op_strategy(), 1..40),
            ) {
                let mut pt: PieceTable<()> = PieceTable::from_str(&initial);
                let mut model = initial;
                for op in &ops {
                    apply(&mut pt, &mut model, op);
                }
                let snapshot = text(&pt);
                if pt.undo().is_some() {
                    pt.redo();
                    prop_assert_eq!(text(&pt), snapshot);
                }
            }
        }
    }
}
