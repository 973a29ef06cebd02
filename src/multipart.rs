use std::mem;

use bytes::{Bytes, BytesMut};
use http::header::HeaderMap;

use crate::constants;
use crate::error::{Error, Limit};
use crate::headers::HeaderStatus;
use crate::limits::Limits;
use crate::part::{self, PartInfo};
use crate::search::Search;
use crate::state::{MultipartState, PartBody, StreamingStage};

/// A message sent to a [`FileSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChunk {
    /// The next run of body bytes.
    Chunk(Bytes),
    /// The part ended. Sent once, after the last chunk.
    End,
}

/// Receives the body of a part classified as a file.
///
/// Any `FnMut(FileChunk)` closure is a sink.
pub trait FileSink {
    fn write(&mut self, chunk: FileChunk);
}

impl<F> FileSink for F
where
    F: FnMut(FileChunk),
{
    fn write(&mut self, chunk: FileChunk) {
        (self)(chunk)
    }
}

/// Callbacks of a [`MultipartParser`].
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use multipasta::{Error, FileChunk, Handler, PartInfo};
///
/// #[derive(Default)]
/// struct Collect {
///     fields: Vec<(String, Bytes)>,
///     errors: Vec<Error>,
/// }
///
/// impl Handler for Collect {
///     type Sink = fn(FileChunk);
///
///     fn on_field(&mut self, info: &PartInfo, value: Bytes) {
///         self.fields.push((info.name().to_owned(), value));
///     }
///
///     fn on_file(&mut self, _info: &PartInfo) -> Self::Sink {
///         |_chunk| {}
///     }
///
///     fn on_error(&mut self, error: Error) {
///         self.errors.push(error);
///     }
/// }
/// ```
pub trait Handler {
    /// The sink returned for every file part.
    type Sink: FileSink;

    /// Called with the complete value of a field once its part ends.
    fn on_field(&mut self, info: &PartInfo, value: Bytes);

    /// Called when a file part starts. Its body is streamed to the returned
    /// sink.
    fn on_file(&mut self, info: &PartInfo) -> Self::Sink;

    /// Called for every problem found in the stream. Parsing continues
    /// unless the error is [`Error::InvalidBoundary`].
    fn on_error(&mut self, error: Error);

    /// Called when the closing delimiter has been read.
    fn on_done(&mut self) {}

    /// Decides whether a part is streamed as a file or buffered as a field.
    fn is_file(&self, info: &PartInfo) -> bool {
        part::default_is_file(info)
    }
}

/// A push parser for `multipart/form-data` bodies.
///
/// Chunks are fed with [`write`](MultipartParser::write) in whatever sizes
/// the transport delivers them; parts are dispatched to the [`Handler`] as
/// soon as they can be. [`end`](MultipartParser::end) finishes the stream and
/// leaves the parser ready for another one.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use multipasta::{Error, FileChunk, Handler, Limits, MultipartParser, PartInfo};
///
/// #[derive(Default)]
/// struct Fields(Vec<(String, Bytes)>);
///
/// impl Handler for Fields {
///     type Sink = fn(FileChunk);
///
///     fn on_field(&mut self, info: &PartInfo, value: Bytes) {
///         self.0.push((info.name().to_owned(), value));
///     }
///
///     fn on_file(&mut self, _info: &PartInfo) -> Self::Sink {
///         |_chunk| {}
///     }
///
///     fn on_error(&mut self, error: Error) {
///         panic!("{}", error);
///     }
/// }
///
/// let mut parser = MultipartParser::with_boundary("X-BOUNDARY", Fields::default(), Limits::default());
/// parser.write("--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\n");
/// parser.write("abcd\r\n--X-BOUNDARY--\r\n");
/// parser.end();
///
/// assert_eq!(parser.handler().0, vec![("my_text_field".to_owned(), Bytes::from("abcd"))]);
/// ```
pub struct MultipartParser<H: Handler> {
    handler: H,
    limits: Limits,
    inner: Option<Inner<H::Sink>>,
}

struct Inner<S> {
    search: Search,
    state: MultipartState<S>,
}

impl<H: Handler> MultipartParser<H> {
    /// Creates a parser for the boundary named in the `Content-Type` of
    /// `headers`.
    ///
    /// If there is no boundary, [`Error::InvalidBoundary`] is reported right
    /// away and the parser ignores everything written to it.
    pub fn new(headers: &HeaderMap, handler: H, limits: Limits) -> MultipartParser<H> {
        match crate::parse_boundary(headers) {
            Some(boundary) => MultipartParser::with_boundary(boundary, handler, limits),
            None => MultipartParser::invalid(handler, limits),
        }
    }

    /// Creates a parser for an already known boundary.
    pub fn with_boundary<B: Into<String>>(boundary: B, handler: H, limits: Limits) -> MultipartParser<H> {
        let boundary = boundary.into();
        if boundary.is_empty() {
            return MultipartParser::invalid(handler, limits);
        }

        let mut search = Search::new(format!("\r\n{}{}", constants::BOUNDARY_EXT, boundary));
        prime(&mut search);

        MultipartParser {
            handler,
            limits,
            inner: Some(Inner {
                search,
                state: MultipartState::new(),
            }),
        }
    }

    fn invalid(mut handler: H, limits: Limits) -> MultipartParser<H> {
        log::warn!("multipart boundary not found, ignoring the stream");
        handler.on_error(Error::InvalidBoundary);

        MultipartParser {
            handler,
            limits,
            inner: None,
        }
    }

    /// Feeds the next chunk of the body.
    pub fn write<B: Into<Bytes>>(&mut self, chunk: B) {
        let chunk = chunk.into();
        let handler = &mut self.handler;
        let limits = &self.limits;

        let Inner { search, state } = match self.inner.as_mut() {
            Some(inner) => inner,
            None => return,
        };

        state.total_size += chunk.len() as u64;
        if state.total_size > limits.max_total_size {
            report(handler, Limit::MaxTotalSize.into());
            return;
        }

        search.write(chunk, |index, segment| state.on_segment(handler, limits, index, segment));
    }

    /// Finishes the stream.
    ///
    /// Reports [`Error::EndNotReached`] unless the closing delimiter was read.
    /// A part still in progress is dropped: a field is never delivered and a
    /// file sink is dropped without [`FileChunk::End`]. The parser can then be
    /// reused for a new stream with the same boundary.
    pub fn end(&mut self) {
        let handler = &mut self.handler;
        let limits = &self.limits;

        let Inner { search, state } = match self.inner.as_mut() {
            Some(inner) => inner,
            None => return,
        };

        search.end(|index, segment| state.on_segment(handler, limits, index, segment));

        if state.stage != StreamingStage::Eof {
            report(handler, Error::EndNotReached);
        }

        log::debug!("multipart stream ended after {} parts", state.parts);
        state.reset();
        prime(search);
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}

/// The first delimiter of a body has no leading line break; feeding one lets
/// every delimiter be found with the same needle.
fn prime(search: &mut Search) {
    search.write(Bytes::from_static(constants::CRLF), |_, _| {});
}

fn report<H: Handler>(handler: &mut H, error: Error) {
    log::debug!("multipart error: {}", error);
    handler.on_error(error);
}

impl<S: FileSink> MultipartState<S> {
    fn on_segment<H>(&mut self, handler: &mut H, limits: &Limits, index: usize, mut segment: Bytes)
    where
        H: Handler<Sink = S>,
    {
        if self.stage == StreamingStage::Eof {
            return;
        }

        if index != self.index {
            log::trace!("crossed multipart delimiter {}", index);
            self.finish_part(handler);
            self.next_part(index);
        }

        if let StreamingStage::ReadingDelimiter { mut read, mut dashes } = self.stage {
            let n = (2 - read).min(segment.len());
            dashes += segment[..n].iter().filter(|b| **b == b'-').count();
            read += n;
            segment = segment.slice(n..);

            if read < 2 {
                self.stage = StreamingStage::ReadingDelimiter { read, dashes };
                return;
            }

            if dashes == 2 {
                log::debug!("closing multipart delimiter read");
                self.stage = StreamingStage::Eof;
                handler.on_done();
                return;
            }

            self.stage = StreamingStage::ReadingHeaders;
        }

        if segment.is_empty() || self.stage == StreamingStage::Preamble {
            return;
        }

        self.part_size += segment.len() as u64;
        if self.part_size > limits.max_part_size && !self.part_size_reported {
            self.part_size_reported = true;
            report(handler, Limit::MaxPartSize.into());
        }

        match self.stage {
            StreamingStage::ReadingHeaders => self.read_headers(handler, limits, segment),
            StreamingStage::ReadingBody => self.read_body(handler, limits, segment),
            _ => {}
        }
    }

    fn read_headers<H>(&mut self, handler: &mut H, limits: &Limits, segment: Bytes)
    where
        H: Handler<Sink = S>,
    {
        let (headers, end_position) = match self.headers.write(&segment, 0) {
            HeaderStatus::Continue => return,
            HeaderStatus::Failure(failure) => {
                self.stage = StreamingStage::ReadingBody;
                report(handler, failure.into());
                return;
            }
            HeaderStatus::Headers { headers, end_position } => (headers, end_position),
        };

        self.stage = StreamingStage::ReadingBody;

        let info = match PartInfo::from_headers(headers) {
            Ok(info) => info,
            Err(err) => {
                report(handler, err);
                return;
            }
        };

        self.parts += 1;
        if self.parts > limits.max_parts {
            report(handler, Limit::MaxParts.into());
        }

        self.body = if handler.is_file(&info) {
            log::trace!("streaming file part {:?}", info.name());
            PartBody::File(handler.on_file(&info))
        } else {
            PartBody::Field(Vec::new())
        };
        self.info = Some(info);

        if end_position < segment.len() {
            self.read_body(handler, limits, segment.slice(end_position..));
        }
    }

    fn read_body<H>(&mut self, handler: &mut H, limits: &Limits, segment: Bytes)
    where
        H: Handler<Sink = S>,
    {
        match &mut self.body {
            PartBody::File(sink) => sink.write(FileChunk::Chunk(segment)),
            PartBody::Field(chunks) => {
                self.field_size += segment.len() as u64;
                chunks.push(segment);

                if self.field_size > limits.max_field_size && !self.field_size_reported {
                    self.field_size_reported = true;
                    report(handler, Limit::MaxFieldSize.into());
                }
            }
            PartBody::Skip => {}
        }
    }

    fn finish_part<H>(&mut self, handler: &mut H)
    where
        H: Handler<Sink = S>,
    {
        match self.stage {
            StreamingStage::ReadingHeaders => {
                if !self.headers.is_idle() {
                    log::debug!("discarding incomplete part headers");
                }
                self.headers.reset();
            }
            StreamingStage::ReadingBody => {
                let info = self.info.take();

                match (mem::replace(&mut self.body, PartBody::Skip), info) {
                    (PartBody::Field(chunks), Some(info)) => {
                        let value = concat(chunks);
                        log::debug!("field {:?} complete, {} bytes", info.name(), value.len());
                        handler.on_field(&info, value);
                    }
                    (PartBody::File(mut sink), info) => {
                        log::debug!("file {:?} complete", info.as_ref().map(PartInfo::name));
                        sink.write(FileChunk::End);
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }
}

fn concat(mut chunks: Vec<Bytes>) -> Bytes {
    if chunks.len() <= 1 {
        return chunks.pop().unwrap_or_default();
    }

    let len = chunks.iter().map(Bytes::len).sum();
    let mut buf = BytesMut::with_capacity(len);
    for chunk in &chunks {
        buf.extend_from_slice(chunk);
    }

    buf.freeze()
}
