//! Flat, one-level form parsing.
//!
//! These functions return a [`FieldMap`] of name to values instead of a
//! part tree. Nested multiparts are not descended into and parts without
//! a `form-data` disposition or a `name` are dropped.

use std::borrow::Cow;
use std::io::{self, BufRead, Read};

use formstore_http::{FieldMap, HeaderParams, Headers, parse_header, parse_qs};

use crate::config::FormConfig;
use crate::decode::BudgetWriter;
use crate::error::FormError;
use crate::part::FileValue;
use crate::request::{FormRequest, Method};
use crate::scanner::{BoundaryScanner, Stop};

/// One value of a flat form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    /// A query-string or urlencoded value.
    Text(String),
    /// The body of a multipart field.
    Bytes(Vec<u8>),
    /// An uploaded file.
    File(FileValue),
}

impl FormValue {
    /// The raw bytes. For files, the file contents.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
            Self::File(file) => &file.data,
        }
    }

    /// The value as text, replacing invalid UTF-8.
    #[must_use]
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            _ => String::from_utf8_lossy(self.as_bytes()),
        }
    }

    /// The upload, if this is one.
    #[must_use]
    pub fn as_file(&self) -> Option<&FileValue> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// Returns true for uploads.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

/// Parse a `multipart/form-data` body one level deep.
///
/// `params` are the `Content-Type` parameters; only `boundary` is used. A
/// part declaring `Content-Length` is read as exactly that many bytes and
/// whatever follows up to the next boundary is discarded. Reading stops at
/// the terminal boundary or end of stream.
///
/// ```
/// use formstore_core::{FormConfig, parse_multipart};
/// use formstore_http::parse_header;
///
/// let (_, params) = parse_header("multipart/form-data; boundary=xx");
/// let body = b"--xx\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\n1\r\n--xx--\r\n";
///
/// let form = parse_multipart(&mut &body[..], &params, &FormConfig::default()).unwrap();
/// assert_eq!(form.first("a").map(|v| v.as_bytes()), Some(&b"1"[..]));
/// ```
pub fn parse_multipart<R: BufRead>(
    reader: &mut R,
    params: &HeaderParams,
    config: &FormConfig,
) -> Result<FieldMap<FormValue>, FormError> {
    let scanner = BoundaryScanner::new(params.get("boundary").unwrap_or_default());
    let mut form = FieldMap::new();
    let mut total = 0;
    let mut count = 0;

    let mut stop = scanner.skip_to_boundary(reader)?;
    while stop == Stop::Separator {
        let Some(headers) = Headers::read_from(reader)? else {
            break;
        };
        let length = headers.content_length();
        let mut writer = BudgetWriter::new(Vec::new(), config, &mut total);
        stop = if length == 0 {
            scanner.skip_to_boundary(reader)?
        } else {
            match scanner.read_until_boundary(reader, length, &mut writer)?.stop {
                Stop::LengthReached => scanner.skip_to_boundary(reader)?,
                stop => stop,
            }
        };
        let (data, _) = writer.finish();

        let Some((name, value)) = flat_value(&headers, data) else {
            continue;
        };
        if count >= config.get_max_fields() {
            return Err(FormError::TooManyFields {
                count: count + 1,
                max: config.get_max_fields(),
            });
        }
        count += 1;
        form.append(name, value);
    }

    if stop == Stop::Eof {
        tracing::warn!(fields = count, "stream ended before terminal boundary");
    }
    Ok(form)
}

/// Name and value for a kept part, `None` for parts that are dropped.
fn flat_value(headers: &Headers, data: Vec<u8>) -> Option<(String, FormValue)> {
    let (disposition, params) = parse_header(headers.get("content-disposition")?);
    if disposition != "form-data" {
        return None;
    }
    let name = params.get("name")?.to_string();
    let value = match params.get("filename") {
        Some(filename) => FormValue::File(FileValue {
            filename: filename.to_string(),
            content_type: headers.get("content-type").map(str::to_string),
            data,
        }),
        None => FormValue::Bytes(data),
    };
    Some((name, value))
}

/// Parse a request into a flat form.
///
/// POST bodies are decoded by content type: multipart bodies with
/// [`parse_multipart`], urlencoded bodies (also assumed when no content
/// type is given) with [`parse_qs`], and anything else yields an empty
/// form. Every other method parses the query string.
pub fn parse<R: BufRead>(
    request: FormRequest<R>,
    config: &FormConfig,
) -> Result<FieldMap<FormValue>, FormError> {
    parse_flat(request, config).map(|(form, _)| form)
}

/// Like [`parse`], also returning the query string the values came from.
///
/// For urlencoded POST bodies that is the body itself.
pub(crate) fn parse_flat<R: BufRead>(
    request: FormRequest<R>,
    config: &FormConfig,
) -> Result<(FieldMap<FormValue>, String), FormError> {
    let mut parts = request.into_parts();
    let query = parts.query_string.unwrap_or_default();

    if parts.method != Method::Post {
        tracing::debug!(method = %parts.method, "parsing flat form from query string");
        return Ok((text_values(&query), query));
    }

    let (ctype, params) = parse_header(
        parts
            .content_type
            .as_deref()
            .unwrap_or("application/x-www-form-urlencoded"),
    );
    tracing::debug!(content_type = %ctype, "parsing flat form from body");
    match ctype.as_str() {
        "multipart/form-data" => Ok((parse_multipart(&mut parts.body, &params, config)?, query)),
        "application/x-www-form-urlencoded" => {
            let body = read_body(&mut parts.body, parts.content_length, config)?;
            Ok((text_values(&body), body))
        }
        _ => Ok((FieldMap::new(), String::new())),
    }
}

fn text_values(qs: &str) -> FieldMap<FormValue> {
    parse_qs(qs).map_values(FormValue::Text)
}

fn read_body<R: BufRead>(
    reader: &mut R,
    length: Option<u64>,
    config: &FormConfig,
) -> Result<String, FormError> {
    let mut total = 0;
    let mut writer = BudgetWriter::new(Vec::new(), config, &mut total);
    match length {
        Some(length) => io::copy(&mut reader.take(length), &mut writer)?,
        None => io::copy(reader, &mut writer)?,
    };
    let (body, _) = writer.finish();
    Ok(String::from_utf8_lossy(&body).into_owned())
}
