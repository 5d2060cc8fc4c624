//! Header maps and MIME header-block reading.

use std::collections::HashMap;
use std::io::{self, BufRead};

/// Longest header line [`Headers::read_from`] will buffer.
///
/// Bytes beyond this on a single line are discarded.
pub const MAX_HEADER_LINE: usize = 8 * 1024;

/// Case-insensitive header collection.
///
/// Names are stored lower-cased. Inserting a name that is already present
/// replaces its value, so the last occurrence in a header block wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: HashMap<String, String>,
}

impl Headers {
    /// Create empty headers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value by name (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Insert a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .insert(name.into().to_ascii_lowercase(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Returns true if the header is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate over all headers as (name, value) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of headers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// The declared `Content-Length`, or `-1` when absent or not numeric.
    #[must_use]
    pub fn content_length(&self) -> i64 {
        self.get("content-length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(-1)
    }

    /// Read one header block, up to and including the blank line ending it.
    ///
    /// Continuation lines (leading space or tab) are folded into the
    /// previous header. Lines without a `:` are skipped. Returns `None`
    /// when the stream is already exhausted, so callers can tell "no more
    /// parts" from "a part with no headers".
    pub fn read_from<R: BufRead>(reader: &mut R) -> io::Result<Option<Self>> {
        let mut headers = Self::new();
        let mut line = Vec::new();
        let mut current: Option<(String, String)> = None;
        let mut saw_any = false;

        loop {
            line.clear();
            let n = read_line_capped(reader, &mut line, MAX_HEADER_LINE)?;
            if n == 0 {
                if !saw_any {
                    return Ok(None);
                }
                break;
            }
            saw_any = true;

            let text = String::from_utf8_lossy(trim_line_ending(&line));
            if text.is_empty() {
                break;
            }
            if text.starts_with([' ', '\t']) {
                let folded = text.trim();
                if let Some((_, value)) = current.as_mut().filter(|_| !folded.is_empty()) {
                    value.push(' ');
                    value.push_str(folded);
                }
                continue;
            }
            if let Some((name, value)) = current.take() {
                headers.insert(name, value);
            }
            let bytes = text.as_bytes();
            if let Some(colon) = memchr::memchr(b':', bytes) {
                let name = text[..colon].trim();
                if !name.is_empty() {
                    current = Some((name.to_string(), text[colon + 1..].trim().to_string()));
                }
            }
        }

        if let Some((name, value)) = current {
            headers.insert(name, value);
        }
        Ok(Some(headers))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Read a line of at most `max` bytes, discarding the overflow.
fn read_line_capped<R: BufRead>(reader: &mut R, out: &mut Vec<u8>, max: usize) -> io::Result<usize> {
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
        let (used, done) = match memchr::memchr(b'\n', available) {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let room = max.saturating_sub(out.len());
        out.extend_from_slice(&available[..used.min(room)]);
        reader.consume(used);
        total += used;
        if done {
            return Ok(total);
        }
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_is_case_insensitive() {
        let headers = Headers::new().with("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(headers.contains("Content-type"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn content_length_parsing() {
        assert_eq!(Headers::new().content_length(), -1);
        assert_eq!(Headers::new().with("Content-Length", " 42 ").content_length(), 42);
        assert_eq!(Headers::new().with("Content-Length", "many").content_length(), -1);
    }

    #[test]
    fn read_block_stops_at_blank_line() {
        let mut input: &[u8] =
            b"Content-Disposition: form-data; name=\"a\"\r\nContent-Type: text/plain\r\n\r\nbody\r\n";
        let headers = Headers::read_from(&mut input).unwrap().unwrap();
        assert_eq!(headers.get("content-disposition"), Some("form-data; name=\"a\""));
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(input, b"body\r\n");
    }

    #[test]
    fn read_block_folds_continuation_lines() {
        let mut input: &[u8] = b"Content-Disposition: form-data;\n\tname=\"a\"\n\n";
        let headers = Headers::read_from(&mut input).unwrap().unwrap();
        assert_eq!(headers.get("content-disposition"), Some("form-data; name=\"a\""));
    }

    #[test]
    fn whitespace_only_line_does_not_end_block() {
        let mut input: &[u8] = b"X-A: 1\r\n \t\r\nX-B: 2\r\n\r\nbody";
        let headers = Headers::read_from(&mut input).unwrap().unwrap();
        assert_eq!(headers.get("x-a"), Some("1"));
        assert_eq!(headers.get("x-b"), Some("2"));
        assert_eq!(input, b"body");
    }

    #[test]
    fn read_block_at_eof() {
        let mut input: &[u8] = b"";
        assert!(Headers::read_from(&mut input).unwrap().is_none());

        let mut truncated: &[u8] = b"X-One: 1\r\n";
        let headers = Headers::read_from(&mut truncated).unwrap().unwrap();
        assert_eq!(headers.get("x-one"), Some("1"));
    }

    #[test]
    fn read_block_empty_headers() {
        let mut input: &[u8] = b"\r\nrest";
        let headers = Headers::read_from(&mut input).unwrap().unwrap();
        assert!(headers.is_empty());
        assert_eq!(input, b"rest");
    }

    #[test]
    fn read_block_last_duplicate_wins_and_junk_is_skipped() {
        let mut input: &[u8] = b"X-A: 1\r\nnot a header\r\nx-a: 2\r\n\r\n";
        let headers = Headers::read_from(&mut input).unwrap().unwrap();
        assert_eq!(headers.get("x-a"), Some("2"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn overlong_line_is_truncated() {
        let mut raw = b"X-Long: ".to_vec();
        raw.extend(std::iter::repeat_n(b'a', MAX_HEADER_LINE * 2));
        raw.extend_from_slice(b"\r\n\r\n");
        let mut input = raw.as_slice();
        let headers = Headers::read_from(&mut input).unwrap().unwrap();
        let value = headers.get("x-long").unwrap();
        assert!(value.len() < MAX_HEADER_LINE);
        assert!(input.is_empty());
    }
}
