//! The decoded form, owned by the request handler.

use std::io::{self, BufRead};

use formstore_http::Headers;

use crate::buffer::{BufferProvider, SpoolingBuffers};
use crate::config::FormConfig;
use crate::decode::Decoder;
use crate::error::FormError;
use crate::part::{Done, Field, Part, Value};
use crate::request::FormRequest;

/// The root of a decoded form submission.
///
/// Built once per request and read-only afterwards. It owns every
/// descendant part and buffer; spooled temporary files are removed when it
/// is dropped.
///
/// # Example
///
/// ```
/// use formstore_core::{FieldStorage, FormRequest, Method};
///
/// let body = "--AaB03x\r\n\
///     Content-Disposition: form-data; name=\"field1\"\r\n\
///     \r\n\
///     value1\r\n\
///     --AaB03x--\r\n";
/// let request = FormRequest::new(Method::Post, body.as_bytes())
///     .content_type("multipart/form-data; boundary=AaB03x");
///
/// let form = FieldStorage::parse(request).unwrap();
/// assert_eq!(form.getfirst("field1").unwrap().as_deref(), Some("value1"));
/// ```
#[derive(Debug)]
pub struct FieldStorage {
    root: Part,
}

impl FieldStorage {
    /// Decode a request with the default configuration.
    pub fn parse<R: BufRead>(request: FormRequest<R>) -> Result<Self, FormError> {
        Self::parse_with(request, &FormConfig::default())
    }

    /// Decode a request, spooling large bodies per `config`.
    pub fn parse_with<R: BufRead>(
        request: FormRequest<R>,
        config: &FormConfig,
    ) -> Result<Self, FormError> {
        let buffers = SpoolingBuffers::new(config.get_spool_threshold());
        Self::parse_with_buffers(request, config, &buffers)
    }

    /// Decode a request, buffering bodies through `buffers`.
    ///
    /// GET and HEAD decode the query string. Every other method decodes
    /// the body; a body without a `Content-Type` is taken as urlencoded.
    pub fn parse_with_buffers<R: BufRead>(
        request: FormRequest<R>,
        config: &FormConfig,
        buffers: &dyn BufferProvider,
    ) -> Result<Self, FormError> {
        let mut parts = request.into_parts();
        let mut decoder = Decoder::new(config, buffers);

        if parts.method.uses_query() {
            tracing::debug!(method = %parts.method, "decoding query string");
            let root = decoder.decode_query(parts.query_string.as_deref().unwrap_or_default())?;
            return Ok(Self { root });
        }

        let content_type = parts
            .content_type
            .unwrap_or_else(|| "application/x-www-form-urlencoded".to_string());
        tracing::debug!(
            method = %parts.method,
            content_type = %content_type,
            content_length = ?parts.content_length,
            "decoding request body"
        );
        let mut headers = Headers::new().with("content-type", content_type);
        if let Some(length) = parts.content_length {
            headers.insert("content-length", length.to_string());
        }
        let root = decoder.decode_root(
            &mut parts.body,
            headers,
            parts.query_string.as_deref(),
        )?;
        Ok(Self { root })
    }

    /// Decode an arbitrary stream described by `headers`.
    ///
    /// The stream is treated as a request body with no outer boundary.
    pub fn from_reader<R: BufRead>(
        mut reader: R,
        headers: Headers,
        config: &FormConfig,
    ) -> Result<Self, FormError> {
        let buffers = SpoolingBuffers::new(config.get_spool_threshold());
        let root = Decoder::new(config, &buffers).decode_root(&mut reader, headers, None)?;
        Ok(Self { root })
    }

    /// The root part.
    #[must_use]
    pub fn root(&self) -> &Part {
        &self.root
    }

    /// Take ownership of the root part.
    #[must_use]
    pub fn into_root(self) -> Part {
        self.root
    }

    /// How reading of the request ended.
    #[must_use]
    pub fn done(&self) -> Done {
        self.root.done()
    }

    /// The root's value.
    pub fn value(&self) -> io::Result<Value<'_>> {
        self.root.value()
    }

    /// Every top-level field in raw order.
    pub fn fields(&self) -> Result<&[Field], FormError> {
        self.root.fields()
    }

    /// All top-level fields named `name`.
    pub fn get(&self, name: &str) -> Result<Vec<&Field>, FormError> {
        self.root.get(name)
    }

    /// The first top-level field named `name`.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&Field> {
        self.root.first(name)
    }

    /// The only top-level field named `name`.
    pub fn single(&self, name: &str) -> Result<&Field, FormError> {
        self.root.single(name)
    }

    /// Returns true if a top-level field is named `name`.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.root.has(name)
    }

    /// Distinct top-level names in first-seen order.
    pub fn keys(&self) -> Result<Vec<&str>, FormError> {
        self.root.keys()
    }

    /// Text of the first top-level field named `name`.
    pub fn getfirst(&self, name: &str) -> io::Result<Option<String>> {
        self.root.getfirst(name)
    }

    /// Text of every top-level field named `name`.
    pub fn getlist(&self, name: &str) -> io::Result<Vec<String>> {
        self.root.getlist(name)
    }
}
