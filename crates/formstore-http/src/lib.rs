//! Wire-level parsing for HTML form submissions.
//!
//! This crate holds the small, allocation-light parsers the form decoder
//! is built on. Nothing here touches request bodies directly except
//! [`Headers::read_from`], which consumes one header block from a stream.
//!
//! # Features
//!
//! - Structured header values (`Content-Type`, `Content-Disposition`)
//! - Query strings and `application/x-www-form-urlencoded` bodies
//! - Case-insensitive header maps read from MIME header blocks
//! - An ordered multimap shared by every flat decoding path
//!
//! # Example
//!
//! ```
//! use formstore_http::{parse_header, parse_qs};
//!
//! let (token, params) = parse_header("form-data; name=\"upload\"");
//! assert_eq!(token, "form-data");
//! assert_eq!(params.get("name"), Some("upload"));
//!
//! let qs = parse_qs("a=1&a=2&b=3");
//! assert_eq!(qs.get("a"), Some(&["1".to_string(), "2".to_string()][..]));
//! ```

#![deny(unsafe_code)]

mod field_map;
mod header;
mod headers;
mod query;

pub use field_map::FieldMap;
pub use header::{HeaderParams, parse_header};
pub use headers::{Headers, MAX_HEADER_LINE};
pub use query::{QueryValues, parse_qs, parse_qsl, percent_decode};
