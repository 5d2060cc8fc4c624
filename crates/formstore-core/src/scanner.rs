//! Boundary-delimited body scanning.
//!
//! Multipart bodies are read line by line. A line is a boundary candidate
//! only when it starts with `--`; after trailing whitespace is trimmed it
//! must equal `--boundary` (another part follows) or `--boundary--` (the
//! enclosing multipart is finished). No other boundary matching happens, so
//! boundary-like text in the middle of a line is always data.
//!
//! Lines are consumed in segments of at most [`MAX_SEGMENT`] bytes so a body
//! without newlines cannot force an unbounded read buffer. Only a segment
//! that both starts and ends a line can be a boundary. A `\r\n` split across
//! two segments is still treated as one line ending.

use std::io::{self, BufRead, Read, Write};

/// Largest slice of a line held in memory at once.
pub const MAX_SEGMENT: usize = 8 * 1024;

/// Why a scan stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// A `--boundary` line: another part follows.
    Separator,
    /// A `--boundary--` line: the enclosing multipart is finished.
    Terminal,
    /// The stream ended before any boundary.
    Eof,
    /// A fixed-length read completed; the boundary has not been consumed.
    LengthReached,
}

/// Classification of a single line against a boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Ordinary body content.
    Data,
    /// `--boundary`.
    Separator,
    /// `--boundary--`.
    Terminal,
}

/// Outcome of reading one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scan {
    /// Body bytes written to the sink.
    pub written: usize,
    /// Why reading stopped.
    pub stop: Stop,
}

/// Line scanner bound to one multipart boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryScanner {
    next: Vec<u8>,
    last: Vec<u8>,
}

impl BoundaryScanner {
    /// Scanner for `boundary` (without the leading `--`).
    ///
    /// An empty boundary is allowed: it matches a bare `--` line.
    #[must_use]
    pub fn new(boundary: &str) -> Self {
        let next = format!("--{boundary}").into_bytes();
        let mut last = next.clone();
        last.extend_from_slice(b"--");
        Self { next, last }
    }

    /// Classify one raw line, line ending included.
    #[must_use]
    pub fn classify(&self, line: &[u8]) -> LineKind {
        if !line.starts_with(b"--") {
            return LineKind::Data;
        }
        let stripped = line.trim_ascii_end();
        if stripped == self.next.as_slice() {
            LineKind::Separator
        } else if stripped == self.last.as_slice() {
            LineKind::Terminal
        } else {
            LineKind::Data
        }
    }

    /// Read one body into `sink`.
    ///
    /// With `declared_length >= 0` exactly that many raw bytes are copied
    /// and the scan stops with [`Stop::LengthReached`] (or [`Stop::Eof`] if
    /// the stream runs short); the caller is expected to follow up with
    /// [`skip_to_boundary`](Self::skip_to_boundary).
    ///
    /// Otherwise lines are copied until a boundary line or end of stream.
    /// Line endings are stripped, lines are re-joined with `\n`, and the
    /// boundary line itself is consumed but never written.
    pub fn read_until_boundary<R, W>(
        &self,
        reader: &mut R,
        declared_length: i64,
        sink: &mut W,
    ) -> io::Result<Scan>
    where
        R: BufRead + ?Sized,
        W: Write + ?Sized,
    {
        if let Ok(length) = usize::try_from(declared_length) {
            let written = read_binary(reader, sink, length)?;
            let stop = if written < length {
                Stop::Eof
            } else {
                Stop::LengthReached
            };
            return Ok(Scan { written, stop });
        }

        let mut segment = Vec::with_capacity(256);
        let mut written = 0;
        let mut wrote_line = false;
        let mut at_line_start = true;
        // A `\r` that ended an unterminated segment, not yet known to be
        // part of a `\r\n`.
        let mut held_cr = false;
        loop {
            segment.clear();
            if read_segment(reader, &mut segment, MAX_SEGMENT)? == 0 {
                if held_cr {
                    sink.write_all(b"\r")?;
                    written += 1;
                }
                return Ok(Scan {
                    written,
                    stop: Stop::Eof,
                });
            }
            if std::mem::take(&mut held_cr) {
                if segment == b"\n" {
                    at_line_start = true;
                    continue;
                }
                sink.write_all(b"\r")?;
                written += 1;
            }
            let terminated = segment.ends_with(b"\n");
            if at_line_start && terminated {
                match self.classify(&segment) {
                    LineKind::Separator => {
                        return Ok(Scan {
                            written,
                            stop: Stop::Separator,
                        });
                    }
                    LineKind::Terminal => {
                        return Ok(Scan {
                            written,
                            stop: Stop::Terminal,
                        });
                    }
                    LineKind::Data => {}
                }
            }
            if at_line_start && wrote_line {
                sink.write_all(b"\n")?;
                written += 1;
            }
            let content = if terminated {
                strip_line_ending(&segment)
            } else if let Some(rest) = segment.strip_suffix(b"\r") {
                held_cr = true;
                rest
            } else {
                &segment[..]
            };
            sink.write_all(content)?;
            written += content.len();
            wrote_line = true;
            at_line_start = terminated;
        }
    }

    /// Discard lines up to and including the next boundary line.
    ///
    /// Used for multipart prologues and for whatever trails a body whose
    /// reading stopped before the boundary. Never returns
    /// [`Stop::LengthReached`].
    pub fn skip_to_boundary<R: BufRead + ?Sized>(&self, reader: &mut R) -> io::Result<Stop> {
        let mut segment = Vec::with_capacity(256);
        let mut at_line_start = true;
        loop {
            segment.clear();
            if read_segment(reader, &mut segment, MAX_SEGMENT)? == 0 {
                return Ok(Stop::Eof);
            }
            let terminated = segment.ends_with(b"\n");
            if at_line_start && terminated {
                match self.classify(&segment) {
                    LineKind::Separator => return Ok(Stop::Separator),
                    LineKind::Terminal => return Ok(Stop::Terminal),
                    LineKind::Data => {}
                }
            }
            at_line_start = terminated;
        }
    }
}

/// Copy exactly `length` bytes unless the stream ends first.
///
/// Returns the number of bytes copied.
pub fn read_binary<R, W>(reader: &mut R, sink: &mut W, length: usize) -> io::Result<usize>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let limit = u64::try_from(length).unwrap_or(u64::MAX);
    let copied = io::copy(&mut reader.take(limit), sink)?;
    Ok(usize::try_from(copied).unwrap_or(usize::MAX))
}

/// Copy everything up to end of stream, turning `\r\n` into `\n`.
pub fn read_to_eof<R, W>(reader: &mut R, sink: &mut W) -> io::Result<usize>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    let mut segment = Vec::with_capacity(256);
    let mut written = 0;
    let mut held_cr = false;
    loop {
        segment.clear();
        if read_segment(reader, &mut segment, MAX_SEGMENT)? == 0 {
            if held_cr {
                sink.write_all(b"\r")?;
                written += 1;
            }
            return Ok(written);
        }
        if std::mem::take(&mut held_cr) && segment != b"\n" {
            sink.write_all(b"\r")?;
            written += 1;
        }
        if segment.ends_with(b"\r\n") {
            segment.truncate(segment.len() - 2);
            segment.push(b'\n');
        } else if segment.ends_with(b"\r") {
            segment.pop();
            held_cr = true;
        }
        sink.write_all(&segment)?;
        written += segment.len();
    }
}

/// Append bytes up to and including the next `\n`, or `max` bytes,
/// whichever comes first. Returns 0 only at end of stream.
fn read_segment<R: BufRead + ?Sized>(
    reader: &mut R,
    out: &mut Vec<u8>,
    max: usize,
) -> io::Result<usize> {
    let mut total = 0;
    loop {
        let available = match reader.fill_buf() {
            Ok(buf) => buf,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return Ok(total);
        }
        let room = max - total;
        let window = &available[..available.len().min(room)];
        let (used, done) = match memchr::memchr(b'\n', window) {
            Some(i) => (i + 1, true),
            None => (window.len(), window.len() == room),
        };
        out.extend_from_slice(&window[..used]);
        reader.consume(used);
        total += used;
        if done {
            return Ok(total);
        }
    }
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\r\n") {
        rest
    } else {
        line.strip_suffix(b"\n").unwrap_or(line)
    }
}
