use encoding_rs::{Encoding, UTF_8};
use percent_encoding::percent_decode_str;

/// Decodes UTF-8, replacing malformed sequences.
pub(crate) fn decode_utf8(bytes: &[u8]) -> String {
    let (text, _) = UTF_8.decode_without_bom_handling(bytes);
    text.into_owned()
}

/// Looks up an encoding by its WHATWG label, falling back to UTF-8.
pub(crate) fn encoding_for(label: Option<&str>) -> &'static Encoding {
    label
        .and_then(|label| Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(UTF_8)
}

/// Decodes an RFC 5987 extended value: `charset'language'percent-encoded`.
///
/// Returns `None` unless the value has exactly three `'`-separated pieces
/// and names a known charset.
pub(crate) fn decode_extended_value(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');

    let charset = parts.next()?;
    let _language = parts.next()?;
    let encoded = parts.next()?;

    if encoded.contains('\'') {
        return None;
    }

    let encoding = Encoding::for_label(charset.trim().as_bytes())?;
    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    let (text, _, _) = encoding.decode(&bytes);

    Some(text.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_extended_value() {
        assert_eq!(decode_extended_value("utf-8''n%C3%A4me.txt"), Some("näme.txt".to_owned()));
        assert_eq!(decode_extended_value("UTF-8'de'n%C3%A4me.txt"), Some("näme.txt".to_owned()));
        assert_eq!(decode_extended_value("iso-8859-1''n%E4me.txt"), Some("näme.txt".to_owned()));
        assert_eq!(decode_extended_value("utf-8''plain"), Some("plain".to_owned()));

        assert_eq!(decode_extended_value("n%C3%A4me.txt"), None);
        assert_eq!(decode_extended_value("utf-8'n%C3%A4me.txt"), None);
        assert_eq!(decode_extended_value("utf-8''a'b"), None);
        assert_eq!(decode_extended_value("no-such-charset''abc"), None);
    }

    #[test]
    fn test_encoding_for() {
        assert_eq!(encoding_for(None), UTF_8);
        assert_eq!(encoding_for(Some("utf8")), UTF_8);
        assert_eq!(encoding_for(Some("latin1")).name(), "windows-1252");
        assert_eq!(encoding_for(Some("bogus")), UTF_8);
    }

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_utf8("näme".as_bytes()), "näme");
        assert_eq!(decode_utf8(b"n\xc3"), "n\u{fffd}");
    }
}
