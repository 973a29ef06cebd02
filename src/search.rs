//! Streaming search for a fixed delimiter across arbitrarily split chunks.

use bytes::{Bytes, BytesMut};

/// Finds every occurrence of a fixed needle in a stream of chunks.
///
/// Bytes between occurrences are handed to a segment callback together with
/// the number of occurrences seen so far. A suffix that could still be the
/// start of an occurrence is held back in a carry buffer until the next
/// [`write`](Search::write) resolves it or [`end`](Search::end) flushes it.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use multipasta::Search;
///
/// let mut segments = Vec::new();
/// let mut search = Search::new("\r\n--X");
///
/// search.write(Bytes::from_static(b"one\r\n-"), |idx, seg| segments.push((idx, seg)));
/// search.write(Bytes::from_static(b"-Xtwo"), |idx, seg| segments.push((idx, seg)));
/// search.end(|idx, seg| segments.push((idx, seg)));
///
/// assert_eq!(segments, vec![(0, Bytes::from("one")), (1, Bytes::from("two"))]);
/// ```
#[derive(Debug)]
pub struct Search {
    needle: Box<[u8]>,
    /// Offsets within the needle at which each byte value occurs, ascending.
    offsets: Box<[Vec<usize>]>,
    first_byte: u8,
    first_variation_idx: usize,
    first_variation: u8,
    /// Remaining `(offset, byte)` pairs checked once the two filter bytes agree.
    checks: Box<[(usize, u8)]>,
    carry: BytesMut,
    match_index: usize,
}

impl Search {
    /// Creates a search for `needle`.
    ///
    /// # Panics
    ///
    /// Panics if `needle` is empty.
    pub fn new<N: AsRef<[u8]>>(needle: N) -> Search {
        let needle: Box<[u8]> = needle.as_ref().into();
        assert!(!needle.is_empty(), "search needle must not be empty");

        let mut offsets = vec![Vec::new(); 256];
        for (idx, b) in needle.iter().enumerate() {
            offsets[*b as usize].push(idx);
        }

        let first_byte = needle[0];
        let first_variation_idx = needle.iter().position(|b| *b != first_byte).unwrap_or(0);
        let first_variation = needle[first_variation_idx];

        let checks = needle
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != 0 && *idx != first_variation_idx)
            .map(|(idx, b)| (idx, *b))
            .collect();

        Search {
            carry: BytesMut::with_capacity(needle.len()),
            needle,
            offsets: offsets.into_boxed_slice(),
            first_byte,
            first_variation_idx,
            first_variation,
            checks,
            match_index: 0,
        }
    }

    /// Number of occurrences confirmed since construction or the last `end`.
    pub fn match_index(&self) -> usize {
        self.match_index
    }

    /// Feeds the next chunk.
    ///
    /// `on_segment` is called once for every non-empty run of bytes that is
    /// known not to belong to an occurrence, with the match index the run
    /// belongs to.
    pub fn write<F>(&mut self, chunk: Bytes, mut on_segment: F)
    where
        F: FnMut(usize, Bytes),
    {
        let data = if self.carry.is_empty() {
            chunk
        } else {
            self.carry.extend_from_slice(&chunk);
            self.carry.split().freeze()
        };

        let len = data.len();
        let needle_len = self.needle.len();

        // Start of the bytes not yet handed out.
        let mut pos = 0;
        let mut cursor = needle_len - 1;

        'scan: while cursor < len {
            // Every occurrence starting at or after `pos` covers exactly one
            // cursor position, so each stride only has to try the offsets at
            // which the byte under the cursor appears in the needle. Larger
            // offsets first, so the earliest candidate start is tried first.
            for &offset in self.offsets[data[cursor] as usize].iter().rev() {
                if offset > cursor - pos {
                    continue;
                }

                let start = cursor - offset;
                if start + needle_len > len {
                    continue;
                }

                if self.is_match(&data, start) {
                    if start > pos {
                        on_segment(self.match_index, data.slice(pos..start));
                    }

                    self.match_index += 1;
                    pos = start + needle_len;
                    cursor = pos + needle_len - 1;

                    continue 'scan;
                }
            }

            cursor += needle_len;
        }

        let keep = self.partial_match_len(&data[pos..]);
        let emit_end = len - keep;

        if emit_end > pos {
            on_segment(self.match_index, data.slice(pos..emit_end));
        }

        if keep > 0 {
            self.carry.extend_from_slice(&data[emit_end..]);
        }
    }

    /// Flushes the carry buffer as a final segment and resets the search so
    /// it can be reused for a new stream.
    pub fn end<F>(&mut self, mut on_segment: F)
    where
        F: FnMut(usize, Bytes),
    {
        if !self.carry.is_empty() {
            let rest = self.carry.split().freeze();
            on_segment(self.match_index, rest);
        }

        self.match_index = 0;
    }

    fn is_match(&self, data: &[u8], start: usize) -> bool {
        data[start] == self.first_byte
            && data[start + self.first_variation_idx] == self.first_variation
            && self.checks.iter().all(|(idx, b)| data[start + idx] == *b)
    }

    /// Length of the longest suffix of `tail` that is a proper prefix of the
    /// needle.
    fn partial_match_len(&self, tail: &[u8]) -> usize {
        let last = match tail.last() {
            Some(b) => *b,
            None => return 0,
        };

        for &offset in self.offsets[last as usize].iter().rev() {
            let len = offset + 1;
            if len >= self.needle.len() || len > tail.len() {
                continue;
            }

            let suffix = &tail[tail.len() - len..];
            if suffix[0] == self.first_byte && suffix == &self.needle[..len] {
                return len;
            }
        }

        0
    }
}
