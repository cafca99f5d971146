// Chunk: docs/chunks/piece_table - Piece table storage engine

/// Position in the document as (line, column) where both are 0-indexed.
///
/// The storage engine itself is offset-addressed; `Position` is the currency
/// of the [`LineBuffer`](crate::LineBuffer) overlay and of the cursor layer
/// above it, which commonly uses it as the undo metadata type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl PartialOrd for Position {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Position {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.line.cmp(&other.line) {
            std::cmp::Ordering::Equal => self.col.cmp(&other.col),
            ord => ord,
        }
    }
}

/// The kind of structural edit, as tracked for undo-group coalescing.
///
/// The piece table remembers the kind and end index of the last edit; a new
/// edit of the same kind at the matching index extends the open undo group
/// instead of starting a new one. "No last edit" (after setup, a group
/// break, an undo/redo, or backing-buffer growth) is modeled as the absence
/// of a recorded event rather than a dedicated variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    Insert,
    Delete,
}
