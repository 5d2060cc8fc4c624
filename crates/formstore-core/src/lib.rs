//! Form decoding core for formstore.
//!
//! This crate turns a form submission into a tree of fields:
//! - [`FieldStorage`] decodes a [`FormRequest`] (query string, urlencoded
//!   body or `multipart/form-data`, nested multiparts included)
//! - [`Part`], [`Field`] and [`MiniField`] make up the decoded tree
//! - [`BufferProvider`] decides where part bodies are buffered
//! - [`parse`], [`parse_multipart`] and [`FormContent`] offer a flat,
//!   dictionary-style view for simple forms
//!
//! # Design Principles
//!
//! - One forward pass over a blocking reader, no backtracking
//! - Bodies are streamed into sinks, never collected line by line
//! - Lenient with malformed input, strict with caller mistakes
//! - Size, field-count and depth limits enforced while reading
//!
//! # Example
//!
//! ```
//! use formstore_core::{FieldStorage, FormRequest, Method};
//!
//! let body = "--AaB03x\r\n\
//!     Content-Disposition: form-data; name=\"file1\"; filename=\"a.txt\"\r\n\
//!     Content-Type: text/plain\r\n\
//!     \r\n\
//!     hello\r\n\
//!     --AaB03x--\r\n";
//! let request = FormRequest::new(Method::Post, body.as_bytes())
//!     .content_type("multipart/form-data; boundary=AaB03x");
//!
//! let form = FieldStorage::parse(request).unwrap();
//! let upload = form.single("file1").unwrap().as_part().unwrap();
//! let file = upload.file().unwrap().unwrap();
//! assert_eq!(file.filename, "a.txt");
//! assert_eq!(file.data, b"hello");
//! ```

#![forbid(unsafe_code)]

mod buffer;
mod config;
mod content;
mod decode;
mod error;
mod legacy;
mod part;
mod request;
pub mod scanner;
mod storage;

pub use buffer::{
    BufferHint, BufferProvider, MemoryBuffers, PartBuffer, PartSink, SpooledSink, SpoolingBuffers,
};
pub use config::{
    DEFAULT_MAX_DEPTH, DEFAULT_MAX_FIELDS, DEFAULT_MAX_PART_SIZE, DEFAULT_MAX_TOTAL_SIZE,
    DEFAULT_SPOOL_THRESHOLD, FormConfig,
};
pub use content::{FormContent, Interpreted};
pub use error::FormError;
pub use legacy::{FormValue, parse, parse_multipart};
pub use part::{Done, Field, FileValue, MiniField, Part, Payload, Value};
pub use request::{FormRequest, Method};
pub use storage::FieldStorage;

// Re-export the wire-level parsers for convenience
pub use formstore_http::{FieldMap, HeaderParams, Headers, parse_header, parse_qs};
