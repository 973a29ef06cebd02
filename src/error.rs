use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;

use crate::headers::Headers;

/// A set of errors reported while parsing a multipart stream.
///
/// Apart from [`InvalidBoundary`](Error::InvalidBoundary), none of these stop
/// the parser: they are handed to [`Handler::on_error`](crate::Handler::on_error)
/// and parsing continues with the next part.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// No `boundary` parameter found in the `Content-Type` header.
    #[display(fmt = "multipart boundary not found in Content-Type")]
    InvalidBoundary,

    /// A part's header block could not be parsed. The part's body is skipped.
    #[display(fmt = "failed to read part headers: {}", "error.reason")]
    BadHeaders { error: HeaderFailure },

    /// The part's `Content-Disposition` is `form-data` but has no `name`
    /// parameter. The part's body is skipped.
    #[display(fmt = "Content-Disposition `form-data` header has no name parameter")]
    InvalidDisposition,

    /// One of the configured [`Limits`](crate::Limits) was exceeded.
    #[display(fmt = "reached the {} limit", limit)]
    ReachedLimit { limit: Limit },

    /// The stream ended before the closing boundary was seen.
    #[display(fmt = "multipart stream ended before the closing boundary")]
    EndNotReached,

    /// Failed to decode the field data as `JSON` in
    /// [`decode_json`](crate::decode_json).
    #[cfg(feature = "json")]
    #[display(fmt = "failed to decode field data as JSON: {}", _0)]
    DecodeJson(serde_json::Error),
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}

impl From<Limit> for Error {
    fn from(limit: Limit) -> Self {
        Error::ReachedLimit { limit }
    }
}

impl From<HeaderFailure> for Error {
    fn from(error: HeaderFailure) -> Self {
        Error::BadHeaders { error }
    }
}

/// The limit named by [`Error::ReachedLimit`].
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limit {
    #[display(fmt = "max parts")]
    MaxParts,
    #[display(fmt = "max total size")]
    MaxTotalSize,
    #[display(fmt = "max part size")]
    MaxPartSize,
    #[display(fmt = "max field size")]
    MaxFieldSize,
}

/// Why a header block was rejected.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderError {
    #[display(fmt = "too many headers")]
    TooManyHeaders,
    #[display(fmt = "header block too large")]
    HeaderTooLarge,
    #[display(fmt = "invalid header name")]
    InvalidHeaderName,
    #[display(fmt = "invalid header value")]
    InvalidHeaderValue,
}

impl std::error::Error for HeaderError {}

/// A rejected header block together with the headers read before the failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFailure {
    pub reason: HeaderError,
    pub headers: Headers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::InvalidBoundary.to_string(),
            "multipart boundary not found in Content-Type"
        );
        assert_eq!(
            Error::from(Limit::MaxFieldSize).to_string(),
            "reached the max field size limit"
        );

        let err = Error::from(HeaderFailure {
            reason: HeaderError::HeaderTooLarge,
            headers: Headers::new(),
        });
        assert_eq!(err.to_string(), "failed to read part headers: header block too large");
    }

    #[test]
    fn test_error_eq() {
        assert_eq!(Error::EndNotReached, Error::EndNotReached);
        assert_ne!(Error::EndNotReached, Error::InvalidDisposition);
        assert_ne!(Error::from(Limit::MaxParts), Error::from(Limit::MaxPartSize));
    }
}
