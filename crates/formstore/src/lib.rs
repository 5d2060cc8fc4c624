//! Streaming decoder for HTML form submissions.
//!
//! formstore decodes the three encodings browsers use to submit forms:
//!
//! - **Query strings** on GET and HEAD requests
//! - **`application/x-www-form-urlencoded`** request bodies
//! - **`multipart/form-data`** request bodies, including file uploads and
//!   nested `multipart/*` parts
//!
//! The result is a read-only tree of fields owned by a [`FieldStorage`].
//! Bodies are streamed into buffers chosen by a [`BufferProvider`]; the
//! default keeps small bodies in memory and spools large uploads to
//! anonymous temporary files.
//!
//! # Quick Start
//!
//! ```
//! use formstore::prelude::*;
//!
//! let body = "--AaB03x\r\n\
//!     Content-Disposition: form-data; name=\"field1\"\r\n\
//!     \r\n\
//!     value1\r\n\
//!     --AaB03x\r\n\
//!     Content-Disposition: form-data; name=\"file1\"; filename=\"a.txt\"\r\n\
//!     Content-Type: text/plain\r\n\
//!     \r\n\
//!     hello\r\n\
//!     --AaB03x--\r\n";
//!
//! let request = FormRequest::new(Method::Post, body.as_bytes())
//!     .content_type("multipart/form-data; boundary=AaB03x");
//! let form = FieldStorage::parse_with(request, &FormConfig::new().max_fields(10))?;
//!
//! assert_eq!(form.getfirst("field1")?.as_deref(), Some("value1"));
//! assert!(form.single("file1")?.is_file());
//! # Ok::<(), FormError>(())
//! ```
//!
//! # Crate Structure
//!
//! - [`formstore_core`]: Boundary scanning, the part decoder, field storage
//! - [`formstore_http`]: Header values, query strings, header blocks

#![forbid(unsafe_code)]

// Re-export crates
pub use formstore_core as core;
pub use formstore_http as http;

// Re-export commonly used types
pub use formstore_core::{
    BufferHint, BufferProvider, Done, Field, FieldStorage, FileValue, FormConfig, FormContent,
    FormError, FormRequest, FormValue, Interpreted, MemoryBuffers, Method, MiniField, Part,
    PartBuffer, PartSink, Payload, SpoolingBuffers, Value, parse, parse_multipart,
};
pub use formstore_http::{
    FieldMap, HeaderParams, Headers, parse_header, parse_qs, parse_qsl, percent_decode,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        Done, Field, FieldStorage, FileValue, FormConfig, FormError, FormRequest, Method,
        MiniField, Part, Value,
    };
}
