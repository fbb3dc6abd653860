// src/log_buffer.rs

//! Bounded, fixed-width log ring buffer.
//!
//! This is the user-facing log: supervisor messages and the child's captured
//! output both end up here, and a front end renders it. It is not the same
//! thing as the `tracing` diagnostics set up in [`crate::logging`].
//!
//! Layout:
//! - `slots.len() == capacity + 1`, so a full buffer is distinguishable from
//!   an empty one using only `begin` and `end`;
//! - the number of valid lines is `(end - begin) mod slots.len()`;
//! - pushing into a full buffer advances `begin`, dropping the oldest line.
//!
//! Every slot owns a `String` pre-allocated to [`LINE_CAPACITY`] bytes and
//! reused in place. Text longer than that is truncated at the last UTF-8
//! character boundary that fits.

use std::fmt::{self, Write as _};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::LineSource;

/// Number of lines kept by default.
pub const DEFAULT_CAPACITY: usize = 256;

/// Maximum number of bytes stored per line.
pub const LINE_CAPACITY: usize = 2048;

/// A single stored line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    /// Monotonic sequence number, unique per buffer.
    pub seq: u64,
    pub timestamp: SystemTime,
    pub source: LineSource,
    pub text: String,
}

impl LogLine {
    fn empty() -> Self {
        Self {
            seq: 0,
            timestamp: UNIX_EPOCH,
            source: LineSource::Supervisor,
            text: String::with_capacity(LINE_CAPACITY),
        }
    }

    /// Wall-clock time of day (UTC) as `HH:MM:SS.mmm`.
    pub fn clock(&self) -> String {
        let since_epoch = self
            .timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let secs = since_epoch.as_secs() % 86_400;
        format!(
            "{:02}:{:02}:{:02}.{:03}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60,
            since_epoch.subsec_millis()
        )
    }
}

impl fmt::Display for LogLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            LineSource::Supervisor => write!(f, "[{}] [rerun] {}", self.clock(), self.text),
            LineSource::Child => write!(f, "[{}] {}", self.clock(), self.text),
        }
    }
}

#[derive(Debug)]
pub struct LogBuffer {
    slots: Vec<LogLine>,
    begin: usize,
    end: usize,
    next_seq: u64,
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl LogBuffer {
    /// Create a buffer holding at most `capacity` lines (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let slot_count = capacity.max(1) + 1;
        Self {
            slots: (0..slot_count).map(|_| LogLine::empty()).collect(),
            begin: 0,
            end: 0,
            next_seq: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    pub fn len(&self) -> usize {
        (self.end + self.slots.len() - self.begin) % self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Index of the oldest stored line.
    pub fn begin(&self) -> usize {
        self.begin
    }

    /// Index of the slot the next line will be written into.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of physical slots (`capacity + 1`).
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Sequence number the next pushed line will get.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Record a supervisor message.
    pub fn log(&mut self, args: fmt::Arguments<'_>) {
        self.push_fmt(LineSource::Supervisor, args);
    }

    /// Record one line of captured child output.
    pub fn push_child(&mut self, line: &str) {
        self.push(LineSource::Child, line);
    }

    pub fn push(&mut self, source: LineSource, text: &str) {
        let slot = self.claim_slot(source);
        slot.text.push_str(truncate_to_boundary(text, LINE_CAPACITY));
    }

    pub fn push_fmt(&mut self, source: LineSource, args: fmt::Arguments<'_>) {
        let slot = self.claim_slot(source);
        // The writer never fails; overflow is dropped silently.
        let _ = TruncatingWriter { buf: &mut slot.text }.write_fmt(args);
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &LogLine> + '_ {
        let n = self.slots.len();
        (0..self.len()).map(move |i| &self.slots[(self.begin + i) % n])
    }

    /// Owned copy of every stored line, oldest first.
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.iter().cloned().collect()
    }

    /// Owned copy of the stored lines with `seq >= from`.
    ///
    /// Lines that were already evicted are silently missing; compare the
    /// first returned `seq` with `from` to detect a gap.
    pub fn lines_since(&self, from: u64) -> Vec<LogLine> {
        self.iter().filter(|l| l.seq >= from).cloned().collect()
    }

    fn claim_slot(&mut self, source: LineSource) -> &mut LogLine {
        let n = self.slots.len();
        let index = self.end;
        self.end = (self.end + 1) % n;
        if self.end == self.begin {
            self.begin = (self.begin + 1) % n;
        }

        let seq = self.next_seq;
        self.next_seq += 1;

        let slot = &mut self.slots[index];
        slot.seq = seq;
        slot.timestamp = SystemTime::now();
        slot.source = source;
        slot.text.clear();
        slot
    }
}

struct TruncatingWriter<'a> {
    buf: &'a mut String,
}

impl fmt::Write for TruncatingWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let remaining = LINE_CAPACITY.saturating_sub(self.buf.len());
        self.buf.push_str(truncate_to_boundary(s, remaining));
        Ok(())
    }
}

fn truncate_to_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(buf: &LogBuffer) -> Vec<String> {
        buf.iter().map(|l| l.text.clone()).collect()
    }

    #[test]
    fn keeps_last_capacity_lines() {
        let mut buf = LogBuffer::new(256);
        for i in 0..300 {
            buf.log(format_args!("line {i}"));
        }

        assert_eq!(buf.len(), 256);
        let stored = texts(&buf);
        assert_eq!(stored.first().map(String::as_str), Some("line 44"));
        assert_eq!(stored.last().map(String::as_str), Some("line 299"));
        assert!(!stored.iter().any(|t| t == "line 43"));
        assert_eq!(
            (buf.end() + buf.slot_count() - buf.begin()) % buf.slot_count(),
            buf.len()
        );
    }

    #[test]
    fn empty_and_single_line() {
        let mut buf = LogBuffer::new(4);
        assert!(buf.is_empty());
        assert_eq!(buf.len(), 0);

        buf.push_child("hello");
        assert_eq!(buf.len(), 1);
        let line = buf.iter().next().unwrap();
        assert_eq!(line.source, LineSource::Child);
        assert_eq!(line.text, "hello");
    }

    #[test]
    fn long_lines_are_truncated_on_char_boundary() {
        let mut buf = LogBuffer::new(2);
        // 'é' is two bytes; 1025 of them do not fit into 2048 bytes.
        let long = "é".repeat(1025);
        buf.push_child(&long);
        let stored = &buf.snapshot()[0].text;
        assert_eq!(stored.len(), LINE_CAPACITY);
        assert!(stored.chars().all(|c| c == 'é'));

        buf.log(format_args!("{}{}", "x".repeat(2000), "y".repeat(100)));
        assert_eq!(buf.snapshot()[1].text.len(), LINE_CAPACITY);
    }

    #[test]
    fn lines_since_tracks_sequence_numbers() {
        let mut buf = LogBuffer::new(3);
        buf.push_child("a");
        buf.push_child("b");
        let mark = buf.next_seq();
        buf.push_child("c");
        buf.push_child("d");

        let fresh: Vec<_> = buf.lines_since(mark).into_iter().map(|l| l.text).collect();
        assert_eq!(fresh, vec!["c", "d"]);

        // "a" has been evicted, so reading from 0 returns only what is left.
        let all: Vec<_> = buf.lines_since(0).into_iter().map(|l| l.text).collect();
        assert_eq!(all, vec!["b", "c", "d"]);
    }

    #[test]
    fn display_marks_supervisor_lines() {
        let mut buf = LogBuffer::new(2);
        buf.log(format_args!("started"));
        let rendered = buf.snapshot()[0].to_string();
        assert!(rendered.ends_with("[rerun] started"), "{rendered}");
    }
}
