// src/process/lines.rs

//! Turns raw output bytes into lines.
//!
//! Output arrives in arbitrary chunks. Bytes after the last newline are held
//! back until the rest of the line shows up, a trailing `\r` is dropped, and
//! invalid UTF-8 is replaced rather than rejected.

use std::borrow::Cow;

use crate::log_buffer::LINE_CAPACITY;

#[derive(Debug, Default)]
pub struct LineAssembler {
    partial: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, calling `emit` once per completed line.
    ///
    /// A line with no newline in sight is force-broken once it reaches
    /// [`LINE_CAPACITY`] bytes, since the log would truncate it there anyway.
    /// The break never lands inside a multibyte character.
    pub fn feed(&mut self, bytes: &[u8], mut emit: impl FnMut(&str)) {
        for &b in bytes {
            if b == b'\n' {
                self.emit_partial(&mut emit);
                continue;
            }
            self.partial.push(b);
            if self.partial.len() >= LINE_CAPACITY {
                self.break_line(&mut emit);
            }
        }
    }

    /// Emit whatever is held back, without waiting for a newline.
    pub fn flush(&mut self, mut emit: impl FnMut(&str)) {
        if !self.partial.is_empty() {
            self.emit_partial(&mut emit);
        }
    }

    pub fn has_partial(&self) -> bool {
        !self.partial.is_empty()
    }

    fn break_line(&mut self, emit: &mut impl FnMut(&str)) {
        let keep = self.partial.len() - incomplete_tail(&self.partial);
        let tail = self.partial.split_off(keep);
        self.emit_partial(emit);
        self.partial = tail;
    }

    fn emit_partial(&mut self, emit: &mut impl FnMut(&str)) {
        if self.partial.last() == Some(&b'\r') {
            self.partial.pop();
        }
        let line: Cow<'_, str> = String::from_utf8_lossy(&self.partial);
        emit(&line);
        self.partial.clear();
    }
}

/// Number of trailing bytes that start a UTF-8 sequence but do not finish it.
fn incomplete_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let b = bytes[bytes.len() - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let width = match b {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}
