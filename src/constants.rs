pub(crate) const DEFAULT_MAX_PARTS: u64 = std::u64::MAX;
pub(crate) const DEFAULT_MAX_TOTAL_SIZE: u64 = std::u64::MAX;
pub(crate) const DEFAULT_MAX_PART_SIZE: u64 = std::u64::MAX;
pub(crate) const DEFAULT_MAX_FIELD_SIZE: u64 = 1024 * 1024;

/// Maximum number of header pairs in one part's header block.
pub(crate) const MAX_HEADER_PAIRS: usize = 100;
/// Maximum number of bytes in one part's header block.
pub(crate) const MAX_HEADER_SIZE: usize = 16 * 1024;

pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CR: u8 = b'\r';
pub(crate) const LF: u8 = b'\n';
pub(crate) const CRLF: &[u8] = b"\r\n";

pub(crate) const DEFAULT_FIELD_CONTENT_TYPE: &str = "text/plain";
pub(crate) const DEFAULT_FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// Bytes accepted in a header name (RFC 7230 `tchar`), plus the `:` terminator.
pub(crate) static HEADER_NAME_CHARS: [bool; 256] = header_name_chars();

/// Bytes accepted in a header value: visible ASCII, space, tab and obs-text.
/// CR and LF are accepted here and sequenced by the header parser.
pub(crate) static HEADER_VALUE_CHARS: [bool; 256] = header_value_chars();

const fn header_name_chars() -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        table[i] = b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'!' | b'#'
                    | b'$'
                    | b'%'
                    | b'&'
                    | b'\''
                    | b'*'
                    | b'+'
                    | b'-'
                    | b'.'
                    | b'^'
                    | b'_'
                    | b'`'
                    | b'|'
                    | b'~'
                    | b':'
            );
        i += 1;
    }
    table
}

const fn header_value_chars() -> [bool; 256] {
    let mut table = [false; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        table[i] = matches!(b, b'\t' | b'\n' | b'\r') || (b >= 0x20 && b != 0x7f);
        i += 1;
    }
    table
}
