//! Resumable parser for one part's header block.

use std::collections::BTreeMap;
use std::mem;

use crate::constants::{self, CR, LF};
use crate::error::{HeaderError, HeaderFailure};
use crate::helpers;

/// Header map of one part. Names are lower-cased when the block is parsed;
/// a repeated name keeps the last value.
pub type Headers = BTreeMap<String, String>;

/// Outcome of [`HeaderParser::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderStatus {
    /// The block is not complete yet.
    Continue,
    /// The block ended; body bytes start at `end_position` in the chunk.
    Headers { headers: Headers, end_position: usize },
    /// The block was rejected. The parser has been reset.
    Failure(HeaderFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Name,
    Whitespace,
    Value,
}

/// Parses `Name: value` lines up to the blank line that ends a header block.
///
/// The parser keeps its progress between calls, so a block may be split
/// across any number of chunks. After a block completes or fails it is ready
/// for the next one.
#[derive(Debug)]
pub struct HeaderParser {
    state: State,
    headers: Headers,
    name: Vec<u8>,
    value: Vec<u8>,
    /// Progress through `\r\n\r\n`; 2 means "at the start of a line".
    crlf: u8,
    pairs: usize,
    size: usize,
}

impl Default for HeaderParser {
    fn default() -> Self {
        HeaderParser::new()
    }
}

impl HeaderParser {
    pub fn new() -> HeaderParser {
        HeaderParser {
            state: State::Name,
            headers: Headers::new(),
            name: Vec::new(),
            value: Vec::new(),
            crlf: 2,
            pairs: 0,
            size: 0,
        }
    }

    /// Discards any partially read block.
    pub fn reset(&mut self) {
        self.state = State::Name;
        self.headers.clear();
        self.name.clear();
        self.value.clear();
        self.crlf = 2;
        self.pairs = 0;
        self.size = 0;
    }

    /// Returns `true` if no byte of the current block has been consumed.
    pub fn is_idle(&self) -> bool {
        self.size == 0
    }

    /// Feeds `chunk[start..]`.
    pub fn write(&mut self, chunk: &[u8], start: usize) -> HeaderStatus {
        let len = chunk.len();
        let mut pos = start;

        while pos < len {
            match self.state {
                State::Name => {
                    if self.crlf == 3 {
                        if !self.consume(1) {
                            return self.fail(HeaderError::HeaderTooLarge);
                        }
                        if chunk[pos] != LF {
                            return self.fail(HeaderError::InvalidHeaderValue);
                        }
                        return self.complete(pos + 1);
                    }

                    if self.crlf == 2 {
                        if chunk[pos] == CR {
                            if !self.consume(1) {
                                return self.fail(HeaderError::HeaderTooLarge);
                            }
                            self.crlf = 3;
                            pos += 1;
                            continue;
                        }

                        if self.pairs > constants::MAX_HEADER_PAIRS {
                            return self.fail(HeaderError::TooManyHeaders);
                        }
                        self.crlf = 0;
                    }

                    let rest = &chunk[pos..];
                    let span = rest
                        .iter()
                        .position(|b| *b == b':' || !constants::HEADER_NAME_CHARS[*b as usize])
                        .unwrap_or_else(|| rest.len());

                    if !self.consume(span) {
                        return self.fail(HeaderError::HeaderTooLarge);
                    }
                    self.name.extend(rest[..span].iter().map(u8::to_ascii_lowercase));
                    pos += span;

                    if pos == len {
                        break;
                    }

                    if !self.consume(1) {
                        return self.fail(HeaderError::HeaderTooLarge);
                    }
                    if chunk[pos] != b':' || self.name.is_empty() {
                        return self.fail(HeaderError::InvalidHeaderName);
                    }

                    self.state = State::Whitespace;
                    pos += 1;
                }
                State::Whitespace => {
                    let rest = &chunk[pos..];
                    let span = rest
                        .iter()
                        .position(|b| *b != b' ' && *b != b'\t')
                        .unwrap_or_else(|| rest.len());

                    if !self.consume(span) {
                        return self.fail(HeaderError::HeaderTooLarge);
                    }
                    pos += span;

                    if pos < len {
                        self.state = State::Value;
                    }
                }
                State::Value => {
                    if self.crlf == 1 {
                        if !self.consume(1) {
                            return self.fail(HeaderError::HeaderTooLarge);
                        }
                        if chunk[pos] != LF {
                            return self.fail(HeaderError::InvalidHeaderValue);
                        }

                        self.commit_pair();
                        self.crlf = 2;
                        self.state = State::Name;
                        pos += 1;
                        continue;
                    }

                    let rest = &chunk[pos..];
                    let span = memchr::memchr(CR, rest).unwrap_or_else(|| rest.len());
                    let value = &rest[..span];

                    if value
                        .iter()
                        .any(|b| *b == LF || !constants::HEADER_VALUE_CHARS[*b as usize])
                    {
                        return self.fail(HeaderError::InvalidHeaderValue);
                    }
                    if !self.consume(span) {
                        return self.fail(HeaderError::HeaderTooLarge);
                    }
                    self.value.extend_from_slice(value);
                    pos += span;

                    if pos < len {
                        if !self.consume(1) {
                            return self.fail(HeaderError::HeaderTooLarge);
                        }
                        self.crlf = 1;
                        pos += 1;
                    }
                }
            }
        }

        HeaderStatus::Continue
    }

    fn consume(&mut self, n: usize) -> bool {
        self.size += n;
        self.size <= constants::MAX_HEADER_SIZE
    }

    fn commit_pair(&mut self) {
        let name = helpers::decode_utf8(&self.name);
        let value = helpers::decode_utf8(&self.value);

        self.name.clear();
        self.value.clear();
        self.pairs += 1;

        log::trace!("part header: {}: {}", name, value);
        self.headers.insert(name, value);
    }

    fn complete(&mut self, end_position: usize) -> HeaderStatus {
        let headers = mem::take(&mut self.headers);
        self.reset();

        HeaderStatus::Headers { headers, end_position }
    }

    fn fail(&mut self, reason: HeaderError) -> HeaderStatus {
        let headers = mem::take(&mut self.headers);
        self.reset();

        HeaderStatus::Failure(HeaderFailure { reason, headers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn failure(status: HeaderStatus) -> HeaderFailure {
        match status {
            HeaderStatus::Failure(failure) => failure,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_single_chunk() {
        let data = b"Content-Disposition: form-data; name=\"a\"\r\nContent-Type: text/plain\r\n\r\nbody";
        let mut parser = HeaderParser::new();

        assert_eq!(
            parser.write(data, 0),
            HeaderStatus::Headers {
                headers: headers(&[
                    ("content-disposition", "form-data; name=\"a\""),
                    ("content-type", "text/plain"),
                ]),
                end_position: data.len() - 4,
            }
        );
        assert!(parser.is_idle());
    }

    #[test]
    fn test_start_offset() {
        let data = b"\r\nx-a: 1\r\n\r\n";
        let mut parser = HeaderParser::new();

        assert_eq!(
            parser.write(data, 2),
            HeaderStatus::Headers {
                headers: headers(&[("x-a", "1")]),
                end_position: data.len(),
            }
        );
    }

    #[test]
    fn test_every_split_point() {
        let data = "X-Name:\t  spaced \r\nx-utf8: näme\r\nempty:\r\n\r\nrest".as_bytes();
        let expected = headers(&[("x-name", "spaced "), ("x-utf8", "näme"), ("empty", "")]);

        for i in 0..=data.len() {
            let mut parser = HeaderParser::new();

            let (status, offset) = match parser.write(&data[..i], 0) {
                HeaderStatus::Continue => (parser.write(&data[i..], 0), i),
                other => (other, 0),
            };

            match status {
                HeaderStatus::Headers { headers, end_position } => {
                    assert_eq!(headers, expected, "split at {}", i);
                    assert_eq!(&data[offset + end_position..], b"rest", "split at {}", i);
                }
                other => panic!("split at {}: {:?}", i, other),
            }
        }
    }

    #[test]
    fn test_empty_block() {
        let mut parser = HeaderParser::new();
        assert_eq!(
            parser.write(b"\r\nbody", 0),
            HeaderStatus::Headers {
                headers: Headers::new(),
                end_position: 2,
            }
        );
    }

    #[test]
    fn test_continue() {
        let mut parser = HeaderParser::new();
        assert_eq!(parser.write(b"a: b\r\n", 0), HeaderStatus::Continue);
        assert_eq!(parser.write(b"\r", 0), HeaderStatus::Continue);
        assert!(!parser.is_idle());
        assert_eq!(
            parser.write(b"\n", 0),
            HeaderStatus::Headers {
                headers: headers(&[("a", "b")]),
                end_position: 1,
            }
        );
    }

    #[test]
    fn test_repeated_name_keeps_last() {
        let mut parser = HeaderParser::new();
        match parser.write(b"A: 1\r\na: 2\r\n\r\n", 0) {
            HeaderStatus::Headers { headers, .. } => assert_eq!(headers.get("a").map(String::as_str), Some("2")),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_invalid_name() {
        let mut parser = HeaderParser::new();
        let err = failure(parser.write(b"a: 1\r\nbad name: 2\r\n\r\n", 0));
        assert_eq!(err.reason, HeaderError::InvalidHeaderName);
        assert_eq!(err.headers, headers(&[("a", "1")]));

        let err = failure(parser.write(b": value\r\n\r\n", 0));
        assert_eq!(err.reason, HeaderError::InvalidHeaderName);

        let err = failure(parser.write(b"folded: a\r\n b\r\n\r\n", 0));
        assert_eq!(err.reason, HeaderError::InvalidHeaderName);
    }

    #[test]
    fn test_invalid_value() {
        let mut parser = HeaderParser::new();

        let err = failure(parser.write(b"a: b\rc\r\n\r\n", 0));
        assert_eq!(err.reason, HeaderError::InvalidHeaderValue);

        let err = failure(parser.write(b"a: b\nc\r\n\r\n", 0));
        assert_eq!(err.reason, HeaderError::InvalidHeaderValue);

        let err = failure(parser.write(b"a: b\x00\r\n\r\n", 0));
        assert_eq!(err.reason, HeaderError::InvalidHeaderValue);

        let err = failure(parser.write(b"a: b\r\n\rx", 0));
        assert_eq!(err.reason, HeaderError::InvalidHeaderValue);
        assert_eq!(err.headers, headers(&[("a", "b")]));
    }

    #[test]
    fn test_too_large() {
        let mut data = b"x-big: ".to_vec();
        data.extend(std::iter::repeat(b'a').take(constants::MAX_HEADER_SIZE));
        data.extend_from_slice(b"\r\n\r\n");

        let mut parser = HeaderParser::new();
        let err = failure(parser.write(&data, 0));
        assert_eq!(err.reason, HeaderError::HeaderTooLarge);

        let mut parser = HeaderParser::new();
        let mut status = HeaderStatus::Continue;
        for b in data.iter() {
            status = parser.write(std::slice::from_ref(b), 0);
            if status != HeaderStatus::Continue {
                break;
            }
        }
        assert_eq!(failure(status).reason, HeaderError::HeaderTooLarge);
    }

    #[test]
    fn test_too_many_headers() {
        let block = |n: usize| {
            let mut data = String::new();
            for i in 0..n {
                data.push_str(&format!("x-{}: {}\r\n", i, i));
            }
            data.push_str("\r\n");
            data
        };

        let mut parser = HeaderParser::new();
        match parser.write(block(constants::MAX_HEADER_PAIRS + 1).as_bytes(), 0) {
            HeaderStatus::Headers { headers, .. } => assert_eq!(headers.len(), constants::MAX_HEADER_PAIRS + 1),
            other => panic!("{:?}", other),
        }

        let err = failure(parser.write(block(constants::MAX_HEADER_PAIRS + 2).as_bytes(), 0));
        assert_eq!(err.reason, HeaderError::TooManyHeaders);
        assert_eq!(err.headers.len(), constants::MAX_HEADER_PAIRS + 1);
    }

    #[test]
    fn test_reset_after_failure() {
        let mut parser = HeaderParser::new();
        failure(parser.write(b"bad\x01: 1\r\n", 0));

        assert_eq!(
            parser.write(b"ok: 1\r\n\r\n", 0),
            HeaderStatus::Headers {
                headers: headers(&[("ok", "1")]),
                end_position: 9,
            }
        );
    }
}
