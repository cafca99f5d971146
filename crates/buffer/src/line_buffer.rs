// Chunk: docs/chunks/line_buffer - Line-oriented overlay over the piece table

//! Line-addressed view of a [`PieceTable`].
//!
//! The editor thinks in `(line, column)` coordinates; the piece table thinks
//! in flat byte offsets. This overlay keeps a per-line `(start, len)` index
//! over the live document, translating between the two and patching the
//! index incrementally on each edit instead of rescanning the document.
//!
//! A document always has at least one line: the empty document is one empty
//! line, and a document ending in `'\n'` has a trailing empty line after it.
//! Line lengths never include the `'\n'` terminator.
//!
//! Undo and redo rebuild the index wholesale — a restored chain can reshape
//! arbitrarily many lines, and the piece table does not report what changed.

use crate::piece_table::PieceTable;
use crate::types::{EditKind, Position};

/// Byte extent of one line, newline excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub len: usize,
}

/// Line-indexed text buffer with coalescing undo/redo.
///
/// `M` is the per-edit metadata threaded through to the piece table's undo
/// groups; the editor passes the cursor position at the time of the edit.
#[derive(Debug)]
pub struct LineBuffer<M> {
    table: PieceTable<M>,
    line_info: Vec<LineSpan>,
}

impl<M> LineBuffer<M> {
    /// Creates an empty buffer: one empty line.
    pub fn new() -> Self {
        Self::from_str("")
    }

    /// Creates a buffer seeded with `initial`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(initial: &str) -> Self {
        let mut lb = Self {
            table: PieceTable::from_str(initial),
            line_info: Vec::new(),
        };
        lb.refresh();
        lb
    }

    // ==================== Geometry ====================

    /// Number of lines. Always at least one.
    pub fn line_count(&self) -> usize {
        self.line_info.len()
    }

    /// Byte length of line `lineno`, newline excluded.
    pub fn line_len(&self, lineno: usize) -> usize {
        self.span(lineno).len
    }

    /// Byte offset where line `lineno` starts.
    pub fn line_start(&self, lineno: usize) -> usize {
        self.span(lineno).start
    }

    /// Total byte length of the document.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Maps a flat byte offset to `(line, col)`. An offset sitting on a
    /// line's terminating newline belongs to that line, at `col == len`.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        assert!(
            offset <= self.table.len(),
            "offset {} out of bounds (document length {})",
            offset,
            self.table.len()
        );
        let line = self.line_info.partition_point(|s| s.start <= offset) - 1;
        Position::new(line, offset - self.line_info[line].start)
    }

    // ==================== Content ====================

    /// Returns line `lineno` as a string, newline excluded. Bytes that are
    /// not valid UTF-8 render as replacement characters.
    pub fn get_line(&self, lineno: usize) -> String {
        let span = self.span(lineno);
        String::from_utf8_lossy(&self.table.render(span.start, span.len)).into_owned()
    }

    /// Returns the whole document as a string.
    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.table.render(0, self.table.len())).into_owned()
    }

    // ==================== Edits ====================

    /// Inserts `text` at column `x` of line `y`. Newlines in `text` split
    /// the line.
    ///
    /// Panics if `y` is not a line or `x` is past the end of it.
    pub fn insert(&mut self, x: usize, y: usize, text: &str, metadata: M) {
        let old = self.span(y);
        assert!(
            x <= old.len,
            "column {} past the end of line {} (length {})",
            x,
            y,
            old.len
        );
        if text.is_empty() {
            return;
        }

        self.table.insert(old.start + x, text, metadata);

        // Patch the index: line `y` becomes one line per newline plus one,
        // and everything below shifts right.
        let bytes = text.as_bytes();
        let mut replacement = Vec::new();
        let mut seg_start = 0;
        let mut line_start = old.start;
        for (i, b) in bytes.iter().enumerate() {
            if *b == b'\n' {
                let seg = i - seg_start;
                let len = if seg_start == 0 { x + seg } else { seg };
                replacement.push(LineSpan { start: line_start, len });
                line_start += len + 1;
                seg_start = i + 1;
            }
        }
        let tail = bytes.len() - seg_start;
        let last_len = if seg_start == 0 {
            old.len + tail
        } else {
            tail + (old.len - x)
        };
        replacement.push(LineSpan {
            start: line_start,
            len: last_len,
        });

        for span in self.line_info[y + 1..].iter_mut() {
            span.start += bytes.len();
        }
        self.line_info.splice(y..=y, replacement);
        self.assert_line_info_consistent();
    }

    /// Deletes the byte at column `x` of line `y`.
    ///
    /// Panics if `x` is not within the line; the terminating newline is not
    /// addressable here — that is [`LineBuffer::join_lines`].
    pub fn delete(&mut self, x: usize, y: usize, metadata: M) {
        let span = self.span(y);
        assert!(
            x < span.len,
            "column {} not within line {} (length {})",
            x,
            y,
            span.len
        );

        self.table.delete(span.start + x, 1, EditKind::Delete, metadata);

        self.line_info[y].len -= 1;
        for span in self.line_info[y + 1..].iter_mut() {
            span.start -= 1;
        }
        self.assert_line_info_consistent();
    }

    /// Removes the newline ending line `y - 1`, merging line `y` into it.
    ///
    /// Panics if `y` is zero or not a line.
    pub fn join_lines(&mut self, y: usize, metadata: M) {
        assert!(y > 0, "line 0 has no predecessor to join");
        let span = self.span(y);

        self.table
            .delete(span.start - 1, 1, EditKind::Delete, metadata);

        self.line_info[y - 1].len += span.len;
        self.line_info.remove(y);
        for span in self.line_info[y..].iter_mut() {
            span.start -= 1;
        }
        self.assert_line_info_consistent();
    }

    // ==================== History ====================

    /// Reverts the most recent undo group and rebuilds the line index.
    /// Returns the metadata stored with the group, or `None` if there is
    /// nothing to undo.
    pub fn undo(&mut self) -> Option<M>
    where
        M: Clone,
    {
        let metadata = self.table.undo()?;
        self.refresh();
        Some(metadata)
    }

    /// Re-applies the most recently undone group.
    pub fn redo(&mut self) -> Option<M>
    where
        M: Clone,
    {
        let metadata = self.table.redo()?;
        self.refresh();
        Some(metadata)
    }

    /// Ends the open coalescing group (called at word delimiters).
    pub fn break_group(&mut self) {
        self.table.break_group();
    }

    pub fn dirty(&self) -> bool {
        self.table.dirty()
    }

    pub fn dirty_reset(&mut self) {
        self.table.dirty_reset();
    }

    // ==================== Internals ====================

    fn span(&self, lineno: usize) -> LineSpan {
        assert!(
            lineno < self.line_info.len(),
            "line {} out of bounds ({} lines)",
            lineno,
            self.line_info.len()
        );
        self.line_info[lineno]
    }

    /// Rebuilds the line index from the rendered document.
    fn refresh(&mut self) {
        let doc = self.table.render(0, self.table.len());
        self.line_info.clear();
        let mut start = 0;
        for (i, b) in doc.iter().enumerate() {
            if *b == b'\n' {
                self.line_info.push(LineSpan {
                    start,
                    len: i - start,
                });
                start = i + 1;
            }
        }
        self.line_info.push(LineSpan {
            start,
            len: doc.len() - start,
        });
    }

    /// Debug check: the incrementally-patched index must match a rebuild.
    #[cfg(debug_assertions)]
    fn assert_line_info_consistent(&mut self) {
        let patched = std::mem::take(&mut self.line_info);
        self.refresh();
        assert_eq!(
            patched, self.line_info,
            "incremental line index drifted from the document"
        );
        self.line_info = patched;
    }

    #[cfg(not(debug_assertions))]
    fn assert_line_info_consistent(&mut self) {}
}

impl<M> Default for LineBuffer<M> {
    fn default() -> Self {
        Self::new()
    }
}
