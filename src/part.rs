use bytes::Bytes;
#[cfg(feature = "json")]
use serde::de::DeserializeOwned;

use crate::constants;
use crate::headers::Headers;
use crate::helpers;
use crate::params::{self, Parameters};

/// Describes one part of a multipart stream, built once its header block has
/// been read.
///
/// # Examples
///
/// ```
/// use multipasta::{Headers, PartInfo};
///
/// let mut headers = Headers::new();
/// headers.insert(
///     "content-disposition".to_owned(),
///     "form-data; name=\"avatar\"; filename=\"me.png\"".to_owned(),
/// );
///
/// let info = PartInfo::from_headers(headers).unwrap();
/// assert_eq!(info.name(), "avatar");
/// assert_eq!(info.file_name(), Some("me.png"));
/// assert_eq!(info.content_type(), "application/octet-stream");
/// assert!(multipasta::default_is_file(&info));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartInfo {
    name: String,
    file_name: Option<String>,
    content_type: String,
    content_type_params: Parameters,
    content_disposition: String,
    content_disposition_params: Parameters,
    headers: Headers,
}

impl PartInfo {
    /// Builds the descriptor from a part's header map.
    ///
    /// Fails with [`Error::InvalidDisposition`](crate::Error::InvalidDisposition)
    /// if the disposition is `form-data` but has no `name` parameter.
    pub fn from_headers(headers: Headers) -> crate::Result<PartInfo> {
        let content_type = params::parse_params(headers.get("content-type").map_or("", String::as_str), false);
        let disposition = params::parse_params(
            headers.get("content-disposition").map_or("", String::as_str),
            true,
        );

        let name = match disposition.parameters.get("name") {
            Some(name) => name.clone(),
            None if disposition.value == "form-data" => return Err(crate::Error::InvalidDisposition),
            None => String::new(),
        };

        let file_name = disposition
            .parameters
            .get("filename*")
            .and_then(|value| helpers::decode_extended_value(value))
            .or_else(|| disposition.parameters.get("filename").cloned());

        let content_type_value = if !content_type.value.is_empty() {
            content_type.value
        } else if file_name.is_some() {
            constants::DEFAULT_FILE_CONTENT_TYPE.to_owned()
        } else {
            constants::DEFAULT_FIELD_CONTENT_TYPE.to_owned()
        };

        Ok(PartInfo {
            name,
            file_name,
            content_type: content_type_value,
            content_type_params: content_type.parameters,
            content_disposition: disposition.value,
            content_disposition_params: disposition.parameters,
            headers,
        })
    }

    /// The `name` parameter of `Content-Disposition`, or `""` if the part has
    /// no disposition.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file name, taken from `filename*` when it decodes and from
    /// `filename` otherwise.
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// The lower-cased media type without parameters, defaulted when the
    /// part does not declare one.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn content_type_params(&self) -> &Parameters {
        &self.content_type_params
    }

    /// The content type as a [`mime::Mime`], parameters included.
    pub fn mime(&self) -> Option<mime::Mime> {
        let mut raw = self.content_type.clone();
        for (name, value) in &self.content_type_params {
            raw.push_str("; ");
            raw.push_str(name);
            raw.push_str("=\"");
            raw.push_str(&value.replace('\\', "\\\\").replace('"', "\\\""));
            raw.push('"');
        }

        raw.parse().ok()
    }

    pub fn content_disposition(&self) -> &str {
        &self.content_disposition
    }

    pub fn content_disposition_params(&self) -> &Parameters {
        &self.content_disposition_params
    }

    /// All headers of the part, names lower-cased.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Decodes a field value with the part's `charset` parameter, falling back
    /// to UTF-8.
    pub fn decode_text(&self, value: &[u8]) -> String {
        let encoding = helpers::encoding_for(self.content_type_params.get("charset").map(String::as_str));
        let (text, _, _) = encoding.decode(value);
        text.into_owned()
    }
}

/// The classification used when a [`Handler`](crate::Handler) does not
/// override [`is_file`](crate::Handler::is_file): a part is a file if it has
/// a file name or declares `application/octet-stream`.
pub fn default_is_file(info: &PartInfo) -> bool {
    info.file_name.is_some() || info.content_type == constants::DEFAULT_FILE_CONTENT_TYPE
}

/// Decodes a field value as text, honoring the part's `charset`.
pub fn decode_field(info: &PartInfo, value: &Bytes) -> String {
    info.decode_text(value)
}

/// Decodes a field value as `JSON`.
///
/// # Optional
///
/// This requires the optional `json` feature to be enabled.
#[cfg(feature = "json")]
pub fn decode_json<T: DeserializeOwned>(value: &[u8]) -> crate::Result<T> {
    serde_json::from_slice(value).map_err(crate::Error::DecodeJson)
}
