#![no_main]

use libfuzzer_sys::fuzz_target;
use multipasta::bytes::Bytes;
use multipasta::{Error, FileChunk, Handler, Limits, MultipartParser, PartInfo};

#[derive(Default)]
struct Sink {
    fields: usize,
    files: usize,
    errors: usize,
}

impl Handler for Sink {
    type Sink = fn(FileChunk);

    fn on_field(&mut self, info: &PartInfo, value: Bytes) {
        let _ = multipasta::decode_field(info, &value);
        self.fields += 1;
    }

    fn on_file(&mut self, _info: &PartInfo) -> Self::Sink {
        self.files += 1;
        |_chunk| {}
    }

    fn on_error(&mut self, _error: Error) {
        self.errors += 1;
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // The first byte picks where the input is split in two.
    let split = data[0] as usize % data.len();
    let body = Bytes::copy_from_slice(&data[1..]);
    let split = split.min(body.len());

    let limits = Limits::new().max_field_size(4096).max_part_size(64 * 1024);
    let mut multipart = MultipartParser::with_boundary("X-BOUNDARY", Sink::default(), limits);

    multipart.write(body.slice(..split));
    multipart.write(body.slice(split..));
    multipart.end();

    // Reusing the parser after `end` must be just as safe.
    multipart.write(body);
    multipart.end();
});
