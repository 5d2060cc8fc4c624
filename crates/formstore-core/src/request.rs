//! Request metadata handed to the decoder.
//!
//! Nothing is read from the process environment: the host passes the
//! method, the entity headers, the query string and the body stream
//! explicitly.

use std::fmt;
use std::io::{self, BufRead};

/// HTTP method, as far as form decoding cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET
    Get,
    /// HEAD
    Head,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// Any other method.
    Other,
}

impl Method {
    /// Parse a method name, ignoring ASCII case.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        const KNOWN: [(&str, Method); 7] = [
            ("GET", Method::Get),
            ("HEAD", Method::Head),
            ("POST", Method::Post),
            ("PUT", Method::Put),
            ("PATCH", Method::Patch),
            ("DELETE", Method::Delete),
            ("OPTIONS", Method::Options),
        ];
        KNOWN
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(name))
            .map_or(Self::Other, |&(_, method)| method)
    }

    /// Upper-case method name. `Other` has no name of its own.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Other => "OTHER",
        }
    }

    /// Returns true when form data travels in the query string rather than
    /// the body.
    #[must_use]
    pub fn uses_query(self) -> bool {
        matches!(self, Self::Get | Self::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One form submission: method, entity headers, query string and body.
///
/// ```
/// use formstore_core::{FormRequest, Method};
///
/// let body = &b"a=1&b=2"[..];
/// let request = FormRequest::new(Method::Post, body)
///     .content_type("application/x-www-form-urlencoded")
///     .content_length(7);
/// assert_eq!(request.method(), Method::Post);
/// assert_eq!(request.get_content_length(), Some(7));
/// ```
#[derive(Debug)]
pub struct FormRequest<R> {
    method: Method,
    content_type: Option<String>,
    content_length: Option<u64>,
    query_string: Option<String>,
    body: R,
}

impl<R: BufRead> FormRequest<R> {
    /// Create a request with the given method and body.
    #[must_use]
    pub fn new(method: Method, body: R) -> Self {
        Self {
            method,
            content_type: None,
            content_length: None,
            query_string: None,
            body,
        }
    }

    /// Set the raw `Content-Type` header value.
    #[must_use]
    pub fn content_type(mut self, value: impl Into<String>) -> Self {
        self.content_type = Some(value.into());
        self
    }

    /// Set the `Content-Length` header value.
    #[must_use]
    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    /// Set the query string (without the leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: impl Into<String>) -> Self {
        self.query_string = Some(qs.into());
        self
    }

    /// Get the method.
    #[must_use]
    pub fn method(&self) -> Method {
        self.method
    }

    /// Get the `Content-Type` header value.
    #[must_use]
    pub fn get_content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Get the `Content-Length` header value.
    #[must_use]
    pub fn get_content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Get the query string.
    #[must_use]
    pub fn get_query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    /// Get the body reader.
    pub fn body_mut(&mut self) -> &mut R {
        &mut self.body
    }

    pub(crate) fn into_parts(self) -> RequestParts<R> {
        RequestParts {
            method: self.method,
            content_type: self.content_type,
            content_length: self.content_length,
            query_string: self.query_string,
            body: self.body,
        }
    }
}

impl FormRequest<io::Empty> {
    /// A bodiless GET carrying only a query string.
    ///
    /// ```
    /// use formstore_core::{FormRequest, Method};
    ///
    /// let request = FormRequest::query("q=rust");
    /// assert_eq!(request.method(), Method::Get);
    /// assert_eq!(request.get_query_string(), Some("q=rust"));
    /// ```
    #[must_use]
    pub fn query(qs: impl Into<String>) -> Self {
        Self::new(Method::Get, io::empty()).query_string(qs)
    }
}

pub(crate) struct RequestParts<R> {
    pub(crate) method: Method,
    pub(crate) content_type: Option<String>,
    pub(crate) content_length: Option<u64>,
    pub(crate) query_string: Option<String>,
    pub(crate) body: R,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_ignores_case() {
        assert_eq!(Method::parse("post"), Method::Post);
        assert_eq!(Method::parse("GeT"), Method::Get);
        assert_eq!(Method::parse("BREW"), Method::Other);
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn query_methods() {
        assert!(Method::Get.uses_query());
        assert!(Method::Head.uses_query());
        assert!(!Method::Post.uses_query());
        assert!(!Method::Other.uses_query());
    }

    #[test]
    fn builder_sets_metadata() {
        let request = FormRequest::new(Method::Put, &b""[..])
            .content_type("text/plain")
            .query_string("x=1");
        assert_eq!(request.get_content_type(), Some("text/plain"));
        assert_eq!(request.get_query_string(), Some("x=1"));
        assert_eq!(request.get_content_length(), None);
    }
}
