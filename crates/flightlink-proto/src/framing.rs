//! Newline framing over a byte stream.
//!
//! Reads arrive in arbitrary chunks: one read may carry several frames, or
//! only part of one. [`LineBuffer`] accumulates bytes and hands back complete
//! lines in arrival order. After every drain it holds nothing but the prefix
//! of a frame whose terminator has not arrived yet.
//!
//! ```text
//! push(b"{..a..}\n{..b")   next_line() -> {..a..}   buffer: {..b
//! push(b"..}\n")           next_line() -> {..b..}   buffer: (empty)
//! ```

use crate::{
    codec::FRAME_DELIMITER,
    errors::{CodecError, Result},
};

/// Upper bound for a single unterminated line (1 MiB).
///
/// A state frame is a few hundred bytes; anything near this limit means the
/// peer is not speaking the protocol.
pub const MAX_LINE_LENGTH: usize = 1 << 20;

/// Reassembly buffer for newline-delimited frames.
#[derive(Debug, Clone)]
pub struct LineBuffer {
    buf: Vec<u8>,
    /// Bytes after the last terminator in `buf`.
    tail: usize,
    max_line_length: usize,
}

impl LineBuffer {
    /// Create an empty buffer with the default line limit.
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    /// Create an empty buffer with a custom line limit.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self { buf: Vec::new(), tail: 0, max_line_length }
    }

    /// Append bytes read from the stream.
    ///
    /// # Errors
    ///
    /// [`CodecError::LineTooLong`] when the unterminated tail exceeds the
    /// limit. The stream cannot be resynchronized after this.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes);

        // Only the new bytes can move the last terminator.
        self.tail = match bytes.iter().rposition(|&b| b == FRAME_DELIMITER) {
            Some(pos) => bytes.len() - pos - 1,
            None => self.tail + bytes.len(),
        };
        if self.tail > self.max_line_length {
            return Err(CodecError::LineTooLong { len: self.tail, max: self.max_line_length });
        }
        Ok(())
    }

    /// Split off the next complete line, without its terminator.
    ///
    /// Returns `None` when no terminator is buffered; the partial frame
    /// stays in place for the next [`push`](Self::push).
    pub fn next_line(&mut self) -> Option<Vec<u8>> {
        if !self.has_line() {
            return None;
        }
        let pos = self.buf.iter().position(|&b| b == FRAME_DELIMITER)?;
        let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
        line.pop();
        Some(line)
    }

    /// Bytes currently buffered.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whether a complete line is ready.
    pub fn has_line(&self) -> bool {
        self.buf.len() > self.tail
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(buffer: &mut LineBuffer) -> Vec<Vec<u8>> {
        std::iter::from_fn(|| buffer.next_line()).collect()
    }

    #[test]
    fn two_frames_in_one_push() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"{\"a\":1}\n{\"b\":2}\n").unwrap();

        assert_eq!(drain(&mut buffer), vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn partial_frame_waits_for_terminator() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"{\"type\":\"st").unwrap();
        assert!(!buffer.has_line());
        assert!(buffer.next_line().is_none());
        assert_eq!(buffer.len(), 11);

        buffer.push(b"ate\"}\n").unwrap();
        assert_eq!(drain(&mut buffer), vec![b"{\"type\":\"state\"}".to_vec()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn remainder_is_kept_after_complete_frame() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"one\ntw").unwrap();
        assert_eq!(buffer.next_line(), Some(b"one".to_vec()));
        assert_eq!(buffer.next_line(), None);
        assert_eq!(buffer.len(), 2);

        buffer.push(b"o\n").unwrap();
        assert_eq!(buffer.next_line(), Some(b"two".to_vec()));
    }

    #[test]
    fn empty_lines_are_returned_empty() {
        let mut buffer = LineBuffer::new();
        buffer.push(b"\n\nx\n").unwrap();
        assert_eq!(drain(&mut buffer), vec![Vec::new(), Vec::new(), b"x".to_vec()]);
    }

    #[test]
    fn byte_at_a_time_reassembly() {
        let mut buffer = LineBuffer::new();
        let mut lines = Vec::new();
        for byte in b"ab\ncd\n" {
            buffer.push(&[*byte]).unwrap();
            lines.extend(drain(&mut buffer));
        }
        assert_eq!(lines, vec![b"ab".to_vec(), b"cd".to_vec()]);
    }

    #[test]
    fn oversized_unterminated_line_is_rejected() {
        let mut buffer = LineBuffer::with_max_line_length(8);
        buffer.push(b"12345678").unwrap();
        let err = buffer.push(b"9").unwrap_err();
        assert!(matches!(err, CodecError::LineTooLong { len: 9, max: 8 }));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn limit_applies_to_tail_only() {
        let mut buffer = LineBuffer::with_max_line_length(4);
        buffer.push(b"1234\n1234").unwrap();
        assert_eq!(buffer.next_line(), Some(b"1234".to_vec()));
    }

    #[test]
    fn tail_length_carries_across_pushes() {
        let mut buffer = LineBuffer::with_max_line_length(8);
        buffer.push(b"12\n345").unwrap();
        buffer.push(b"678").unwrap();
        assert_eq!(buffer.next_line(), Some(b"12".to_vec()));
        assert!(!buffer.has_line());

        buffer.push(b"90").unwrap();
        let err = buffer.push(b"1").unwrap_err();
        assert!(matches!(err, CodecError::LineTooLong { len: 9, max: 8 }));
    }

    #[test]
    fn terminator_in_a_later_push_resets_the_tail() {
        let mut buffer = LineBuffer::with_max_line_length(4);
        for byte in b"abcd" {
            buffer.push(&[*byte]).unwrap();
        }
        buffer.push(b"\nwxyz").unwrap();
        assert!(buffer.has_line());
        assert_eq!(drain(&mut buffer), vec![b"abcd".to_vec()]);
        assert_eq!(buffer.len(), 4);
        assert!(buffer.push(b"!").is_err());
    }
}
