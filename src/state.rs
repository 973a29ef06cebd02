use bytes::Bytes;

use crate::headers::HeaderParser;
use crate::part::PartInfo;

#[derive(Debug)]
pub(crate) struct MultipartState<S> {
    pub(crate) stage: StreamingStage,
    pub(crate) headers: HeaderParser,
    pub(crate) body: PartBody<S>,
    pub(crate) info: Option<PartInfo>,
    pub(crate) index: usize,
    pub(crate) parts: u64,
    pub(crate) total_size: u64,
    pub(crate) part_size: u64,
    pub(crate) field_size: u64,
    pub(crate) part_size_reported: bool,
    pub(crate) field_size_reported: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StreamingStage {
    /// Bytes before the first delimiter.
    Preamble,
    /// The two bytes after a delimiter: `\r\n` before a part, `--` at the end.
    ReadingDelimiter { read: usize, dashes: usize },
    ReadingHeaders,
    ReadingBody,
    Eof,
}

/// Where the body bytes of the current part go.
#[derive(Debug)]
pub(crate) enum PartBody<S> {
    Field(Vec<Bytes>),
    File(S),
    Skip,
}

impl<S> MultipartState<S> {
    pub(crate) fn new() -> MultipartState<S> {
        MultipartState {
            stage: StreamingStage::Preamble,
            headers: HeaderParser::new(),
            body: PartBody::Skip,
            info: None,
            index: 0,
            parts: 0,
            total_size: 0,
            part_size: 0,
            field_size: 0,
            part_size_reported: false,
            field_size_reported: false,
        }
    }

    /// Moves to the part following delimiter number `index`.
    pub(crate) fn next_part(&mut self, index: usize) {
        self.index = index;
        self.stage = StreamingStage::ReadingDelimiter { read: 0, dashes: 0 };
        self.body = PartBody::Skip;
        self.info = None;
        self.part_size = 0;
        self.field_size = 0;
        self.part_size_reported = false;
        self.field_size_reported = false;
    }

    /// Forgets everything about the current stream, dropping any open sink.
    pub(crate) fn reset(&mut self) {
        *self = MultipartState::new();
    }
}
