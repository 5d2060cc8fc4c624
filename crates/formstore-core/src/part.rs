//! The decoded field tree.
//!
//! A [`Part`] is one decoded entity: the request body itself, or one part
//! of a multipart body. It carries exactly one payload: a byte buffer, a
//! list of child [`Field`]s, or nothing. Children are either nested
//! `Part`s (multipart input) or [`MiniField`]s (urlencoded input), and both
//! answer the same read interface through [`Field`].

use std::io;

use formstore_http::{HeaderParams, Headers};

use crate::buffer::PartBuffer;
use crate::error::FormError;

/// How reading of a part ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Done {
    /// A separator boundary followed: the enclosing multipart continues.
    #[default]
    NotFinished,
    /// The enclosing multipart's terminal boundary was read, or the body
    /// was read completely.
    Normal,
    /// The stream ended first. The partially read body is still kept.
    Eof,
}

impl Done {
    /// Returns true unless another sibling part follows.
    #[must_use]
    pub fn is_finished(self) -> bool {
        !matches!(self, Self::NotFinished)
    }
}

/// The single payload of a [`Part`].
#[derive(Debug, Default)]
pub enum Payload {
    /// A buffered body (plain field, file upload, or other leaf content).
    Buffer(PartBuffer),
    /// Child fields of a multipart or urlencoded body.
    List(Vec<Field>),
    /// No body at all.
    #[default]
    Empty,
}

/// A part's value, by precedence buffer > child list > nothing.
#[derive(Debug)]
pub enum Value<'a> {
    /// The full buffered body.
    Bytes(Vec<u8>),
    /// The child fields.
    List(&'a [Field]),
    /// The part holds no payload.
    Absent,
}

impl Value<'_> {
    /// The bytes, if this is a buffered value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// The bytes as UTF-8, if this is a buffered value holding valid UTF-8.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// The child fields, if this is a list value.
    #[must_use]
    pub fn as_list(&self) -> Option<&[Field]> {
        match self {
            Self::List(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns true if there is no value.
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// An uploaded file: `(filename, declared content-type, bytes)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileValue {
    /// The client-supplied filename.
    pub filename: String,
    /// The declared content-type, if the part declared one.
    pub content_type: Option<String>,
    /// The file's bytes.
    pub data: Vec<u8>,
}

/// One decoded entity of a form submission.
#[derive(Debug)]
pub struct Part {
    pub(crate) name: Option<String>,
    pub(crate) filename: Option<String>,
    pub(crate) content_type: String,
    pub(crate) type_options: HeaderParams,
    pub(crate) disposition: String,
    pub(crate) disposition_options: HeaderParams,
    pub(crate) length: i64,
    pub(crate) done: Done,
    pub(crate) headers: Headers,
    pub(crate) payload: Payload,
}

impl Default for Part {
    /// An empty part: no name, `text/plain`, no declared length.
    fn default() -> Self {
        Self {
            name: None,
            filename: None,
            content_type: "text/plain".to_string(),
            type_options: HeaderParams::default(),
            disposition: String::new(),
            disposition_options: HeaderParams::default(),
            length: -1,
            done: Done::default(),
            headers: Headers::default(),
            payload: Payload::default(),
        }
    }
}

impl Part {
    /// Field name from the `Content-Disposition` `name` parameter.
    ///
    /// A part without one cannot be looked up by name but still shows up
    /// in [`fields`](Self::fields).
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Filename from the `Content-Disposition` `filename` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    /// Lower-cased content-type token, `text/plain` when none was declared.
    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// `Content-Type` parameters.
    #[must_use]
    pub fn type_options(&self) -> &HeaderParams {
        &self.type_options
    }

    /// Lower-cased disposition token, empty when no disposition was sent.
    #[must_use]
    pub fn disposition(&self) -> &str {
        &self.disposition
    }

    /// `Content-Disposition` parameters.
    #[must_use]
    pub fn disposition_options(&self) -> &HeaderParams {
        &self.disposition_options
    }

    /// Declared `Content-Length`, `-1` when absent or not numeric.
    #[must_use]
    pub fn length(&self) -> i64 {
        self.length
    }

    /// How reading of this part ended.
    #[must_use]
    pub fn done(&self) -> Done {
        self.done
    }

    /// The part's own headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The raw payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The buffered body, when the payload is a buffer.
    #[must_use]
    pub fn buffer(&self) -> Option<&PartBuffer> {
        match &self.payload {
            Payload::Buffer(buffer) => Some(buffer),
            _ => None,
        }
    }

    /// Returns true if this part is a file upload (named, with a filename).
    #[must_use]
    pub fn is_file(&self) -> bool {
        self.name.is_some() && self.filename.is_some()
    }

    /// Read the part's value. Repeated calls return identical results.
    pub fn value(&self) -> io::Result<Value<'_>> {
        Ok(match &self.payload {
            Payload::Buffer(buffer) => Value::Bytes(buffer.read_all()?),
            Payload::List(fields) => Value::List(fields),
            Payload::Empty => Value::Absent,
        })
    }

    /// The buffered body's bytes, `None` for list or empty payloads.
    pub fn bytes(&self) -> io::Result<Option<Vec<u8>>> {
        self.buffer().map(PartBuffer::read_all).transpose()
    }

    /// The buffered body as a string, replacing invalid UTF-8.
    pub fn text(&self) -> io::Result<Option<String>> {
        Ok(self
            .bytes()?
            .map(|b| String::from_utf8_lossy(&b).into_owned()))
    }

    /// This part as a [`FileValue`], if it is a file upload.
    pub fn file(&self) -> io::Result<Option<FileValue>> {
        let (Some(_), Some(filename)) = (&self.name, &self.filename) else {
            return Ok(None);
        };
        let data = self.bytes()?.unwrap_or_default();
        let content_type = self.headers.get("content-type").map(|_| self.content_type.clone());
        Ok(Some(FileValue {
            filename: filename.clone(),
            content_type,
            data,
        }))
    }

    /// Returns true if the payload is a child list and name lookups apply.
    #[must_use]
    pub fn is_indexable(&self) -> bool {
        matches!(self.payload, Payload::List(_))
    }

    /// Every child in raw order, unnamed parts included.
    pub fn fields(&self) -> Result<&[Field], FormError> {
        match &self.payload {
            Payload::List(fields) => Ok(fields),
            _ => Err(FormError::NotIndexable),
        }
    }

    /// All immediate children named `name`.
    ///
    /// Lookups never descend into nested multiparts; reach those through
    /// the nested part itself.
    pub fn get(&self, name: &str) -> Result<Vec<&Field>, FormError> {
        let found: Vec<&Field> = self
            .fields()?
            .iter()
            .filter(|field| field.name() == Some(name))
            .collect();
        if found.is_empty() {
            return Err(FormError::KeyNotFound(name.to_string()));
        }
        Ok(found)
    }

    /// The first immediate child named `name`, if any.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&Field> {
        self.fields()
            .ok()?
            .iter()
            .find(|field| field.name() == Some(name))
    }

    /// The only immediate child named `name`.
    ///
    /// Fails with [`FormError::MultipleValues`] when several children share
    /// the name.
    pub fn single(&self, name: &str) -> Result<&Field, FormError> {
        let mut found = self.get(name)?;
        if found.len() > 1 {
            return Err(FormError::MultipleValues {
                name: name.to_string(),
                count: found.len(),
            });
        }
        Ok(found.remove(0))
    }

    /// Returns true if an immediate child is named `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.first(name).is_some()
    }

    /// Text of the first child named `name`.
    pub fn getfirst(&self, name: &str) -> io::Result<Option<String>> {
        match self.first(name) {
            Some(field) => field.text(),
            None => Ok(None),
        }
    }

    /// Text of every child named `name`. Children holding a list are
    /// skipped.
    pub fn getlist(&self, name: &str) -> io::Result<Vec<String>> {
        let mut values = Vec::new();
        for field in self.fields().unwrap_or(&[]) {
            if field.name() == Some(name) {
                values.extend(field.text()?);
            }
        }
        Ok(values)
    }

    /// Distinct child names in first-seen order.
    pub fn keys(&self) -> Result<Vec<&str>, FormError> {
        let mut keys: Vec<&str> = Vec::new();
        for name in self.fields()?.iter().filter_map(Field::name) {
            if !keys.contains(&name) {
                keys.push(name);
            }
        }
        Ok(keys)
    }
}

/// A name/value pair decoded from urlencoded input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniField {
    name: String,
    value: String,
}

impl MiniField {
    /// Create a field.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The field name, exactly as submitted.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The decoded value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

/// A child of a list payload.
#[derive(Debug)]
pub enum Field {
    /// A multipart part.
    Part(Part),
    /// An urlencoded pair.
    Mini(MiniField),
}

impl Field {
    /// The field name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Part(part) => part.name(),
            Self::Mini(mini) => Some(mini.name()),
        }
    }

    /// The filename, for file uploads.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        match self {
            Self::Part(part) => part.filename(),
            Self::Mini(_) => None,
        }
    }

    /// Returns true for file uploads.
    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self, Self::Part(part) if part.is_file())
    }

    /// Read the value. A mini field's value is its string's bytes.
    pub fn value(&self) -> io::Result<Value<'_>> {
        match self {
            Self::Part(part) => part.value(),
            Self::Mini(mini) => Ok(Value::Bytes(mini.value.as_bytes().to_vec())),
        }
    }

    /// The value as a string, replacing invalid UTF-8. `None` for list or
    /// empty payloads.
    pub fn text(&self) -> io::Result<Option<String>> {
        match self {
            Self::Part(part) => part.text(),
            Self::Mini(mini) => Ok(Some(mini.value.clone())),
        }
    }

    /// The nested part, if this is one.
    #[must_use]
    pub fn as_part(&self) -> Option<&Part> {
        match self {
            Self::Part(part) => Some(part),
            Self::Mini(_) => None,
        }
    }

    /// The urlencoded pair, if this is one.
    #[must_use]
    pub fn as_mini(&self) -> Option<&MiniField> {
        match self {
            Self::Mini(mini) => Some(mini),
            Self::Part(_) => None,
        }
    }
}

impl From<Part> for Field {
    fn from(part: Part) -> Self {
        Self::Part(part)
    }
}

impl From<MiniField> for Field {
    fn from(mini: MiniField) -> Self {
        Self::Mini(mini)
    }
}
