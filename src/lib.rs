//! An incremental, push-based parser for `multipart/form-data` streams in Rust.
//!
//! Body chunks are written to a [`MultipartParser`] as they arrive, split at
//! any point. Each part is classified as a field, whose value is buffered and
//! handed over once complete, or a file, whose body is streamed chunk by
//! chunk to a sink returned by the [`Handler`]. Malformed parts and exceeded
//! [`Limits`] are reported through [`Handler::on_error`] without stopping
//! the stream.
//!
//! The building blocks are public too: [`Search`] finds a delimiter across
//! chunk boundaries, [`HeaderParser`] reads a part's header block
//! incrementally and [`parse_params`] splits a header value into its
//! parameters.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
//! use multipasta::{Error, FileChunk, Handler, Limits, MultipartParser, PartInfo};
//!
//! #[derive(Default)]
//! struct Upload {
//!     fields: Vec<(String, String)>,
//!     files: Vec<String>,
//!     errors: Vec<Error>,
//! }
//!
//! impl Handler for Upload {
//!     type Sink = Box<dyn FnMut(FileChunk)>;
//!
//!     fn on_field(&mut self, info: &PartInfo, value: Bytes) {
//!         self.fields.push((info.name().to_owned(), multipasta::decode_field(info, &value)));
//!     }
//!
//!     fn on_file(&mut self, info: &PartInfo) -> Self::Sink {
//!         self.files.push(info.file_name().unwrap_or_default().to_owned());
//!         Box::new(|chunk| {
//!             if let FileChunk::Chunk(bytes) = chunk {
//!                 println!("received {} bytes", bytes.len());
//!             }
//!         })
//!     }
//!
//!     fn on_error(&mut self, error: Error) {
//!         self.errors.push(error);
//!     }
//! }
//!
//! let mut headers = HeaderMap::new();
//! headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data; boundary=X-BOUNDARY"));
//!
//! let mut parser = MultipartParser::new(&headers, Upload::default(), Limits::default());
//!
//! parser.write("--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n");
//! parser.write("\r\nabcd\r\n--X-BOUNDARY\r\n");
//! parser.write("Content-Disposition: form-data; name=\"my_file_field\"; filename=\"a-text-file.txt\"\r\n");
//! parser.write("Content-Type: text/plain\r\n\r\nHello world\r\n--X-BOUNDARY--\r\n");
//! parser.end();
//!
//! let upload = parser.into_handler();
//! assert_eq!(upload.fields, vec![("my_text_field".to_owned(), "abcd".to_owned())]);
//! assert_eq!(upload.files, vec!["a-text-file.txt".to_owned()]);
//! assert!(upload.errors.is_empty());
//! ```
//!
//! ## Optional features
//!
//! * `json`: adds [`decode_json`] to deserialize field values.
//! * `serde`: derives `serde::Deserialize` for [`Limits`], so limits can be read
//!   from an application's configuration file.

use http::header::{HeaderMap, CONTENT_TYPE};

pub use bytes;

pub use error::{Error, HeaderError, HeaderFailure, Limit};
pub use headers::{HeaderParser, HeaderStatus, Headers};
pub use limits::Limits;
pub use multipart::{FileChunk, FileSink, Handler, MultipartParser};
pub use params::{parse_params, Parameters, ParsedValue};
#[cfg(feature = "json")]
pub use part::decode_json;
pub use part::{decode_field, default_is_file, PartInfo};
pub use search::Search;

mod constants;
mod error;
mod headers;
mod helpers;
mod limits;
mod multipart;
mod params;
mod part;
mod search;
mod state;

/// A Result type often returned from methods that can have `multipasta` errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Extracts the boundary from the `Content-Type` header of a request.
///
/// # Examples
///
/// ```
/// use http::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
///
/// let mut headers = HeaderMap::new();
/// headers.insert(CONTENT_TYPE, HeaderValue::from_static("multipart/form-data; boundary=ABCDEFG"));
///
/// assert_eq!(multipasta::parse_boundary(&headers), Some("ABCDEFG".to_owned()));
/// ```
pub fn parse_boundary(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(parse_boundary_str)
}

/// Extracts the `boundary` parameter from a `Content-Type` value.
///
/// The media type itself is not checked.
pub fn parse_boundary_str(content_type: &str) -> Option<String> {
    let m = content_type.parse::<mime::Mime>().ok()?;

    m.get_param(mime::BOUNDARY)
        .map(|name| name.as_str().to_owned())
        .filter(|boundary| !boundary.is_empty())
}
