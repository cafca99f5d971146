// Chunk: docs/chunks/piece_table - Piece table storage engine
// Chunk: docs/chunks/line_buffer - Line-oriented overlay over the piece table

//! scrive-buffer: Text storage for the scrive editor.
//!
//! This crate provides a piece-table-backed text buffer with coalescing
//! undo/redo and a line-oriented view on top. Document bytes are never
//! rewritten: edits splice descriptors over append-only sequence buffers,
//! which makes unlimited undo cheap and exact.
//!
//! # Overview
//!
//! The main types are:
//! - [`PieceTable`] - the flat, byte-offset-addressed storage engine with
//!   undo/redo stacks and edit coalescing
//! - [`LineBuffer`] - the `(line, column)`-addressed overlay the editor
//!   talks to, maintaining a per-line byte index over the table
//!
//! Both are generic over a metadata type `M` threaded through undo groups;
//! the editor passes cursor positions so undo can restore the caret.
//!
//! # Example
//!
//! ```
//! use scrive_buffer::{LineBuffer, Position};
//!
//! let mut buffer: LineBuffer<Position> = LineBuffer::from_str("hello world");
//!
//! // Typing coalesces into one undo group.
//! buffer.insert(11, 0, "!", Position::new(0, 11));
//! buffer.insert(12, 0, "!", Position::new(0, 12));
//! assert_eq!(buffer.get_line(0), "hello world!!");
//!
//! // One undo reverts the whole run and hands back the stored cursor.
//! assert_eq!(buffer.undo(), Some(Position::new(0, 11)));
//! assert_eq!(buffer.get_line(0), "hello world");
//! ```
//!
//! # Coalescing
//!
//! Consecutive same-kind edits at adjacent offsets merge into a single undo
//! group: typing a word is one undo, and so is holding backspace. The
//! editor calls [`LineBuffer::break_group`] at word delimiters to bound
//! groups; a cursor jump bounds them automatically.

mod history;
mod line_buffer;
mod piece;
mod piece_table;
mod seq_buffer;
mod types;

pub use line_buffer::{LineBuffer, LineSpan};
pub use piece_table::PieceTable;
pub use types::{EditKind, Position};
