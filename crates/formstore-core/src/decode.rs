//! The recursive part decoder.
//!
//! One [`Decoder`] consumes one request stream. Each call to
//! [`Decoder::decode_part`] reads a single entity whose headers have
//! already been consumed: an urlencoded body (top level only), a nested
//! multipart, or a leaf body. Multiparts recurse, using their own boundary
//! as each child's outer boundary.

use std::io::{self, BufRead, Write};

use formstore_http::{HeaderParams, Headers, parse_header, parse_qsl};

use crate::buffer::{BufferHint, BufferProvider, PartBuffer};
use crate::config::FormConfig;
use crate::error::{FormError, LimitExceeded};
use crate::part::{Done, Field, MiniField, Part, Payload};
use crate::scanner::{BoundaryScanner, Stop, read_binary, read_to_eof};

const URLENCODED: &str = "application/x-www-form-urlencoded";

impl From<Stop> for Done {
    fn from(stop: Stop) -> Self {
        match stop {
            Stop::Separator => Self::NotFinished,
            Stop::Terminal | Stop::LengthReached => Self::Normal,
            Stop::Eof => Self::Eof,
        }
    }
}

impl From<Done> for Stop {
    fn from(done: Done) -> Self {
        match done {
            Done::NotFinished => Self::Separator,
            Done::Normal => Self::Terminal,
            Done::Eof => Self::Eof,
        }
    }
}

/// Decoding state for one request: policy plus running totals.
pub(crate) struct Decoder<'a> {
    config: &'a FormConfig,
    buffers: &'a dyn BufferProvider,
    total: usize,
    fields: usize,
}

impl<'a> Decoder<'a> {
    pub(crate) fn new(config: &'a FormConfig, buffers: &'a dyn BufferProvider) -> Self {
        Self {
            config,
            buffers,
            total: 0,
            fields: 0,
        }
    }

    /// Decode a query string as an urlencoded root.
    pub(crate) fn decode_query(&mut self, qs: &str) -> Result<Part, FormError> {
        let mut root = describe(Headers::new().with("content-type", URLENCODED));
        root.length = i64::try_from(qs.len()).unwrap_or(i64::MAX);
        root.payload = Payload::List(self.mini_fields(qs)?);
        root.done = Done::Normal;
        Ok(root)
    }

    /// Decode a request body. `query` holds fields from the request URL
    /// that are merged into urlencoded and multipart roots.
    pub(crate) fn decode_root<R: BufRead>(
        &mut self,
        reader: &mut R,
        headers: Headers,
        query: Option<&str>,
    ) -> Result<Part, FormError> {
        self.decode_part(reader, headers, None, 0, query)
    }

    fn decode_part<R: BufRead>(
        &mut self,
        reader: &mut R,
        headers: Headers,
        outer: Option<&BoundaryScanner>,
        depth: usize,
        query: Option<&str>,
    ) -> Result<Part, FormError> {
        let mut part = describe(headers);

        if outer.is_none() && part.content_type == URLENCODED {
            self.read_urlencoded(reader, &mut part, query)?;
        } else if part.content_type.starts_with("multipart/") {
            self.read_multi(reader, &mut part, outer, depth, query)?;
        } else {
            self.read_single(reader, &mut part, outer)?;
        }

        tracing::debug!(
            name = ?part.name,
            filename = ?part.filename,
            content_type = %part.content_type,
            length = part.length,
            done = ?part.done,
            depth,
            "decoded part"
        );
        Ok(part)
    }

    fn read_urlencoded<R: BufRead>(
        &mut self,
        reader: &mut R,
        part: &mut Part,
        query: Option<&str>,
    ) -> Result<(), FormError> {
        let mut writer = self.budget(Vec::new());
        let short = match usize::try_from(part.length) {
            Ok(length) => read_binary(reader, &mut writer, length)? < length,
            Err(_) => {
                io::copy(reader, &mut writer)?;
                false
            }
        };
        part.done = if short { Done::Eof } else { Done::Normal };
        let (body, _) = writer.finish();
        let mut qs = String::from_utf8_lossy(&body).into_owned();
        if let Some(extra) = query.filter(|q| !q.is_empty()) {
            qs.push('&');
            qs.push_str(extra);
        }
        part.payload = Payload::List(self.mini_fields(&qs)?);
        Ok(())
    }

    fn read_multi<R: BufRead>(
        &mut self,
        reader: &mut R,
        part: &mut Part,
        outer: Option<&BoundaryScanner>,
        depth: usize,
        query: Option<&str>,
    ) -> Result<(), FormError> {
        let nesting = depth + 1;
        if nesting > self.config.get_max_depth() {
            return Err(FormError::TooDeep {
                depth: nesting,
                max: self.config.get_max_depth(),
            });
        }

        let boundary = part.type_options.get("boundary").unwrap_or_default();
        if boundary.is_empty() {
            tracing::debug!(content_type = %part.content_type, "multipart without boundary");
        }
        let inner = BoundaryScanner::new(boundary);

        let mut children = match query {
            Some(qs) => self.mini_fields(qs)?,
            None => Vec::new(),
        };

        tracing::trace!(depth = nesting, "skipping multipart prologue");
        let mut stop = inner.skip_to_boundary(reader)?;
        while stop == Stop::Separator {
            let Some(headers) = Headers::read_from(reader)? else {
                stop = Stop::Eof;
                break;
            };
            let child = self.decode_part(reader, headers, Some(&inner), nesting, None)?;
            stop = child.done.into();
            children.push(Field::Part(child));
        }

        part.done = match (stop, outer) {
            (Stop::Eof, _) => {
                tracing::warn!(
                    depth = nesting,
                    parts = children.len(),
                    "stream ended before terminal boundary"
                );
                Done::Eof
            }
            (_, Some(outer)) => {
                tracing::trace!(depth = nesting, "skipping multipart epilogue");
                outer.skip_to_boundary(reader)?.into()
            }
            (_, None) => Done::Normal,
        };
        part.payload = Payload::List(children);
        Ok(())
    }

    fn read_single<R: BufRead>(
        &mut self,
        reader: &mut R,
        part: &mut Part,
        outer: Option<&BoundaryScanner>,
    ) -> Result<(), FormError> {
        self.count_field()?;
        let hint = BufferHint {
            declared_length: part.length,
            binary: part.length >= 0,
            filename: part.filename.as_deref(),
        };
        let sink = self.buffers.make_buffer(&hint)?;
        let mut writer = self.budget(sink);

        part.done = match (outer, usize::try_from(part.length)) {
            (Some(scanner), _) => {
                let scan = scanner.read_until_boundary(reader, part.length, &mut writer)?;
                match scan.stop {
                    Stop::LengthReached => scanner.skip_to_boundary(reader)?.into(),
                    stop => stop.into(),
                }
            }
            (None, Ok(length)) => {
                if read_binary(reader, &mut writer, length)? < length {
                    Done::Eof
                } else {
                    Done::Normal
                }
            }
            (None, Err(_)) => {
                read_to_eof(reader, &mut writer)?;
                Done::Eof
            }
        };

        if part.done == Done::Eof && outer.is_some() {
            tracing::warn!(name = ?part.name, "stream ended inside part body");
        }
        let (sink, len) = writer.finish();
        part.payload = Payload::Buffer(PartBuffer::new(sink, len));
        Ok(())
    }

    fn mini_fields(&mut self, qs: &str) -> Result<Vec<Field>, FormError> {
        let mut fields = Vec::new();
        for (name, value) in parse_qsl(qs) {
            self.count_field()?;
            fields.push(Field::Mini(MiniField::new(name, value)));
        }
        Ok(fields)
    }

    fn count_field(&mut self) -> Result<(), FormError> {
        let max = self.config.get_max_fields();
        if self.fields >= max {
            return Err(FormError::TooManyFields {
                count: self.fields + 1,
                max,
            });
        }
        self.fields += 1;
        Ok(())
    }

    fn budget<W: Write>(&mut self, inner: W) -> BudgetWriter<'_, W> {
        BudgetWriter::new(inner, self.config, &mut self.total)
    }
}

/// Build a part's metadata from its header block.
fn describe(headers: Headers) -> Part {
    let (disposition, disposition_options) = headers
        .get("content-disposition")
        .map(parse_header)
        .unwrap_or_default();
    let (content_type, type_options) = headers
        .get("content-type")
        .map_or_else(|| ("text/plain".to_string(), HeaderParams::new()), parse_header);

    Part {
        name: disposition_options.get("name").map(str::to_string),
        filename: disposition_options.get("filename").map(str::to_string),
        content_type,
        type_options,
        disposition,
        disposition_options,
        length: headers.content_length(),
        done: Done::NotFinished,
        headers,
        payload: Payload::Empty,
    }
}

/// Meters bytes written into a body sink against the size policy.
pub(crate) struct BudgetWriter<'t, W> {
    inner: W,
    written: usize,
    max_part: usize,
    total: &'t mut usize,
    max_total: usize,
}

impl<'t, W> BudgetWriter<'t, W> {
    /// `total` is the request-wide running byte count.
    pub(crate) fn new(inner: W, config: &FormConfig, total: &'t mut usize) -> Self {
        Self {
            inner,
            written: 0,
            max_part: config.get_max_part_size(),
            total,
            max_total: config.get_max_total_size(),
        }
    }

    pub(crate) fn finish(self) -> (W, usize) {
        (self.inner, self.written)
    }
}

impl<W: Write> Write for BudgetWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let part_size = self.written.saturating_add(buf.len());
        if part_size > self.max_part {
            return Err(LimitExceeded::Part {
                size: part_size,
                max: self.max_part,
            }
            .into_io());
        }
        let total_size = self.total.saturating_add(buf.len());
        if total_size > self.max_total {
            return Err(LimitExceeded::Total {
                size: total_size,
                max: self.max_total,
            }
            .into_io());
        }
        let n = self.inner.write(buf)?;
        self.written += n;
        *self.total += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::MemoryBuffers;

    fn decode(headers: Headers, body: &[u8], config: &FormConfig) -> Result<Part, FormError> {
        let mut reader = body;
        Decoder::new(config, &MemoryBuffers).decode_root(&mut reader, headers, None)
    }

    fn multipart(boundary: &str) -> Headers {
        Headers::new().with(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
    }

    fn text(field: &Field) -> String {
        field.text().unwrap().unwrap_or_default()
    }

    #[test]
    fn prologue_is_skipped() {
        let body = b"this is a prologue\r\n--b\r\n\
Content-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--b--\r\n";
        let root = decode(multipart("b"), body, &FormConfig::default()).unwrap();
        let fields = root.fields().unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(text(&fields[0]), "1");
        assert_eq!(root.done(), Done::Normal);
    }

    #[test]
    fn child_done_states() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n\
--b\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n2\r\n--b--\r\n";
        let root = decode(multipart("b"), body, &FormConfig::default()).unwrap();
        let parts: Vec<&Part> = root
            .fields()
            .unwrap()
            .iter()
            .filter_map(Field::as_part)
            .collect();
        assert_eq!(parts[0].done(), Done::NotFinished);
        assert_eq!(parts[1].done(), Done::Normal);
    }

    #[test]
    fn declared_length_reads_binary_then_skips() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"bin\"\r\n\
Content-Length: 4\r\n\r\n\x00\r\n\x01trailing junk\r\n--b--\r\n";
        let root = decode(multipart("b"), body, &FormConfig::default()).unwrap();
        let part = root.first("bin").and_then(Field::as_part).unwrap();
        assert_eq!(part.length(), 4);
        assert_eq!(part.bytes().unwrap().unwrap(), b"\x00\r\n\x01");
        assert_eq!(part.done(), Done::Normal);
    }

    #[test]
    fn missing_boundary_matches_bare_dashes() {
        let body = b"--\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nx\r\n----\r\n";
        let headers = Headers::new().with("content-type", "multipart/form-data");
        let root = decode(headers, body, &FormConfig::default()).unwrap();
        assert_eq!(root.fields().unwrap().len(), 1);
        assert_eq!(root.done(), Done::Normal);
    }

    #[test]
    fn eof_after_separator_adds_no_part() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--b\r\n";
        let root = decode(multipart("b"), body, &FormConfig::default()).unwrap();
        assert_eq!(root.fields().unwrap().len(), 1);
        assert_eq!(root.done(), Done::Eof);
    }

    #[test]
    fn urlencoded_root() {
        let headers = Headers::new()
            .with("content-type", URLENCODED)
            .with("content-length", "9");
        let root = decode(headers, b"b=1&a=2&b=3", &FormConfig::default()).unwrap();
        let names: Vec<_> = root.fields().unwrap().iter().filter_map(Field::name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(root.done(), Done::Normal);
    }

    #[test]
    fn urlencoded_merges_query_string() {
        let headers = Headers::new().with("content-type", URLENCODED);
        let mut reader = &b"a=1"[..];
        let config = FormConfig::default();
        let root = Decoder::new(&config, &MemoryBuffers)
            .decode_root(&mut reader, headers, Some("q=2"))
            .unwrap();
        assert_eq!(root.keys().unwrap(), vec!["a", "q"]);
    }

    #[test]
    fn nested_urlencoded_is_a_leaf() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\
Content-Type: application/x-www-form-urlencoded\r\n\r\nx=1\r\n--b--\r\n";
        let root = decode(multipart("b"), body, &FormConfig::default()).unwrap();
        let field = root.single("a").unwrap();
        assert_eq!(text(field), "x=1");
    }

    #[test]
    fn top_level_plain_body_reads_to_eof() {
        let headers = Headers::new().with("content-type", "text/plain");
        let root = decode(headers, b"line one\r\nline two\r\n", &FormConfig::default()).unwrap();
        assert_eq!(root.bytes().unwrap().unwrap(), b"line one\nline two\n");
        assert_eq!(root.done(), Done::Eof);
    }

    #[test]
    fn part_size_limit() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n0123456789\r\n--b--\r\n";
        let config = FormConfig::new().max_part_size(4);
        let err = decode(multipart("b"), body, &config).unwrap_err();
        assert!(matches!(err, FormError::PartTooLarge { max: 4, .. }));
    }

    #[test]
    fn total_size_limit() {
        let body = b"--b\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n0123\r\n\
--b\r\nContent-Disposition: form-data; name=\"b\"\r\n\r\n4567\r\n--b--\r\n";
        let config = FormConfig::new().max_total_size(6);
        let err = decode(multipart("b"), body, &config).unwrap_err();
        assert!(matches!(err, FormError::TotalTooLarge { max: 6, .. }));
    }

    #[test]
    fn field_count_limit() {
        let headers = Headers::new().with("content-type", URLENCODED);
        let config = FormConfig::new().max_fields(2);
        let err = decode(headers, b"a=1&b=2&c=3", &config).unwrap_err();
        assert!(matches!(err, FormError::TooManyFields { count: 3, max: 2 }));
    }

    #[test]
    fn depth_limit() {
        let body = b"--outer\r\nContent-Disposition: form-data; name=\"n\"\r\n\
Content-Type: multipart/mixed; boundary=inner\r\n\r\n--inner\r\n\r\nx\r\n--inner--\r\n--outer--\r\n";
        let config = FormConfig::new().max_depth(1);
        let err = decode(multipart("outer"), body, &config).unwrap_err();
        assert!(matches!(err, FormError::TooDeep { depth: 2, max: 1 }));
    }
}
