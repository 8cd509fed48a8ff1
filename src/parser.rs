//! Forward-only, case-insensitive marker scanning over a buffered dump stream.

use crate::config::READ_BUFFER_SIZE;
use anyhow::{Context, Result};
use bzip2::read::MultiBzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::path::Path;

/// Opens a dump for scanning; `.bz2` files are decompressed on the fly.
pub fn open_dump(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    let file = File::open(path).with_context(|| format!("Failed to open dump at: {:?}", path))?;
    let is_bz2 = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("bz2"));

    if is_bz2 {
        Ok(Box::new(BufReader::with_capacity(
            READ_BUFFER_SIZE,
            MultiBzDecoder::new(file),
        )))
    } else {
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, file)))
    }
}

/// Incremental ASCII case-insensitive matcher for one marker (KMP over lowercased bytes).
#[derive(Debug, Clone)]
pub struct Marker {
    needle: Vec<u8>,
    failure: Vec<usize>,
    matched: usize,
}

impl Marker {
    pub fn new(marker: &[u8]) -> Self {
        assert!(!marker.is_empty(), "markers must not be empty");
        let needle: Vec<u8> = marker.iter().map(u8::to_ascii_lowercase).collect();

        let mut failure = vec![0; needle.len()];
        let mut k = 0;
        for i in 1..needle.len() {
            while k > 0 && needle[i] != needle[k] {
                k = failure[k - 1];
            }
            if needle[i] == needle[k] {
                k += 1;
            }
            failure[i] = k;
        }

        Self {
            needle,
            failure,
            matched: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.needle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    fn reset(&mut self) {
        self.matched = 0;
    }

    fn is_idle(&self) -> bool {
        self.matched == 0
    }

    /// Feeds one byte; returns true when the marker has just been completed.
    fn feed(&mut self, byte: u8) -> bool {
        let b = byte.to_ascii_lowercase();
        while self.matched > 0 && self.needle[self.matched] != b {
            self.matched = self.failure[self.matched - 1];
        }
        if self.needle[self.matched] == b {
            self.matched += 1;
        }
        if self.matched == self.needle.len() {
            self.matched = 0;
            true
        } else {
            false
        }
    }
}

/// Markers searched for simultaneously; the first one to complete wins.
#[derive(Debug, Clone)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    leads: Vec<u8>,
}

impl MarkerSet {
    pub fn new(markers: &[&[u8]]) -> Self {
        let markers: Vec<Marker> = markers.iter().map(|m| Marker::new(m)).collect();
        let mut leads = Vec::new();
        for marker in &markers {
            let first = marker.needle[0];
            for b in [first, first.to_ascii_uppercase()] {
                if !leads.contains(&b) {
                    leads.push(b);
                }
            }
        }
        Self { markers, leads }
    }

    fn reset(&mut self) {
        self.markers.iter_mut().for_each(Marker::reset);
    }

    fn is_idle(&self) -> bool {
        self.markers.iter().all(Marker::is_idle)
    }

    /// Offset of the next byte that could start a marker, `None` if there is none.
    fn skip_to_lead(&self, haystack: &[u8]) -> Option<usize> {
        match self.leads.as_slice() {
            [a] => memchr::memchr(*a, haystack),
            [a, b] => memchr::memchr2(*a, *b, haystack),
            [a, b, c] => memchr::memchr3(*a, *b, *c, haystack),
            _ => Some(0),
        }
    }
}

/// Wraps a buffered stream and consumes it marker by marker.
pub struct MarkerReader<R> {
    inner: R,
    offset: u64,
}

impl<R: BufRead> MarkerReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn fill(&mut self) -> io::Result<&[u8]> {
        loop {
            match self.inner.fill_buf() {
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.inner.fill_buf()
    }

    fn advance(&mut self, n: usize) {
        self.inner.consume(n);
        self.offset += n as u64;
    }

    /// Consumes input up to and including the first complete marker of `set`.
    ///
    /// Returns the index of that marker, or `None` when the stream ends first.
    pub fn find_any(&mut self, set: &mut MarkerSet) -> io::Result<Option<usize>> {
        set.reset();
        loop {
            let (consumed, found) = {
                let buf = self.fill()?;
                if buf.is_empty() {
                    return Ok(None);
                }

                let mut i = 0;
                let mut found = None;
                'scan: while i < buf.len() {
                    if set.is_idle() {
                        match set.skip_to_lead(&buf[i..]) {
                            Some(skip) => i += skip,
                            None => {
                                i = buf.len();
                                break;
                            }
                        }
                    }
                    let byte = buf[i];
                    i += 1;
                    for (which, marker) in set.markers.iter_mut().enumerate() {
                        if marker.feed(byte) {
                            found = Some(which);
                            break 'scan;
                        }
                    }
                }
                (i, found)
            };

            self.advance(consumed);
            if found.is_some() {
                return Ok(found);
            }
        }
    }

    /// Reads everything before the next `close` marker into `out` and consumes the marker.
    ///
    /// At most `limit` bytes are buffered. Longer content is skipped up to the marker
    /// and reported as [`Span::Oversized`] with `out` left empty. On
    /// [`Span::Unterminated`] the stream has ended and `out` holds what was left of it.
    pub fn read_to(
        &mut self,
        close: &mut Marker,
        limit: usize,
        out: &mut Vec<u8>,
    ) -> io::Result<Span> {
        out.clear();
        close.reset();
        let cap = limit + close.len();
        let mut oversized = false;
        loop {
            let (consumed, done) = {
                let buf = self.fill()?;
                if buf.is_empty() {
                    return Ok(Span::Unterminated);
                }

                let mut consumed = buf.len();
                let mut done = false;
                for (i, &byte) in buf.iter().enumerate() {
                    if close.feed(byte) {
                        consumed = i + 1;
                        done = true;
                        break;
                    }
                }
                if !oversized {
                    if out.len() + consumed > cap {
                        oversized = true;
                        out.clear();
                    } else {
                        out.extend_from_slice(&buf[..consumed]);
                    }
                }
                (consumed, done)
            };

            self.advance(consumed);
            if done {
                if oversized {
                    return Ok(Span::Oversized);
                }
                out.truncate(out.len() - close.len());
                return Ok(Span::Closed);
            }
        }
    }
}

/// How [`MarkerReader::read_to`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    Closed,
    /// The close marker was found, but the content exceeded the limit.
    Oversized,
    /// The stream ended first.
    Unterminated,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader(text: &str) -> MarkerReader<Cursor<Vec<u8>>> {
        MarkerReader::new(Cursor::new(text.as_bytes().to_vec()))
    }

    /// Serves the input a few bytes at a time so markers straddle buffer refills.
    fn chunked(text: &str, capacity: usize) -> MarkerReader<BufReader<Cursor<Vec<u8>>>> {
        MarkerReader::new(BufReader::with_capacity(
            capacity,
            Cursor::new(text.as_bytes().to_vec()),
        ))
    }

    fn openers() -> MarkerSet {
        MarkerSet::new(&[b"<title>", b"<id>"])
    }

    #[test]
    fn finds_markers_in_order() {
        let mut r = reader("junk <title>A</title> more <id>1</id>");
        let mut set = openers();
        assert_eq!(r.find_any(&mut set).unwrap(), Some(0));
        assert_eq!(r.find_any(&mut set).unwrap(), Some(1));
        assert_eq!(r.find_any(&mut set).unwrap(), None);
    }

    #[test]
    fn matching_ignores_case() {
        let mut set = openers();
        for text in ["<TITLE>", "<Title>", "<title>", "<tItLe>"] {
            let mut r = reader(text);
            assert_eq!(r.find_any(&mut set).unwrap(), Some(0), "{}", text);
        }
        let mut r = reader("<ID>");
        assert_eq!(r.find_any(&mut set).unwrap(), Some(1));
    }

    #[test]
    fn similar_tags_do_not_match() {
        let mut r = reader("<titles> <idx> <i d> </title> </id>");
        let mut set = openers();
        assert_eq!(r.find_any(&mut set).unwrap(), None);
    }

    #[test]
    fn partial_match_restarts_on_lead_byte() {
        let mut r = reader("<ti<title>");
        let mut set = openers();
        assert_eq!(r.find_any(&mut set).unwrap(), Some(0));
        assert_eq!(r.offset(), 10);
    }

    #[test]
    fn kmp_handles_repeated_prefixes() {
        let mut marker = Marker::new(b"aab");
        let mut out = Vec::new();
        let mut r = reader("xaaab-tail");
        assert_eq!(r.read_to(&mut marker, 64, &mut out).unwrap(), Span::Closed);
        assert_eq!(out, b"xa");
    }

    #[test]
    fn read_to_returns_content_and_consumes_close() {
        let mut r = reader("Paris</title><id>42</id>");
        let mut close = Marker::new(b"</title>");
        let mut out = Vec::new();
        assert_eq!(r.read_to(&mut close, 64, &mut out).unwrap(), Span::Closed);
        assert_eq!(out, b"Paris");

        let mut set = openers();
        assert_eq!(r.find_any(&mut set).unwrap(), Some(1));
        let mut id_close = Marker::new(b"</id>");
        assert_eq!(r.read_to(&mut id_close, 64, &mut out).unwrap(), Span::Closed);
        assert_eq!(out, b"42");
    }

    #[test]
    fn read_to_close_marker_ignores_case() {
        let mut r = reader("Paris</TITLE>");
        let mut close = Marker::new(b"</title>");
        let mut out = Vec::new();
        assert_eq!(r.read_to(&mut close, 64, &mut out).unwrap(), Span::Closed);
        assert_eq!(out, b"Paris");
    }

    #[test]
    fn read_to_reports_truncated_input() {
        let mut r = reader("Paris and no close");
        let mut close = Marker::new(b"</title>");
        let mut out = Vec::new();
        assert_eq!(r.read_to(&mut close, 64, &mut out).unwrap(), Span::Unterminated);
        assert_eq!(out, b"Paris and no close");
    }

    #[test]
    fn read_to_skips_oversized_content() {
        let mut r = reader("0123456789</id><title>");
        let mut out = Vec::new();
        assert_eq!(
            r.read_to(&mut Marker::new(b"</id>"), 4, &mut out).unwrap(),
            Span::Oversized
        );
        assert!(out.is_empty());
        assert_eq!(r.offset(), 15);

        let mut set = openers();
        assert_eq!(r.find_any(&mut set).unwrap(), Some(0));
    }

    #[test]
    fn read_to_accepts_content_at_limit() {
        let mut r = chunked("1234</id>", 2);
        let mut out = Vec::new();
        assert_eq!(
            r.read_to(&mut Marker::new(b"</id>"), 4, &mut out).unwrap(),
            Span::Closed
        );
        assert_eq!(out, b"1234");
    }

    #[test]
    fn oversized_content_is_not_buffered() {
        let text = format!("{}</title>", "x".repeat(10_000));
        let mut r = chunked(&text, 64);
        let mut out = Vec::new();
        assert_eq!(
            r.read_to(&mut Marker::new(b"</title>"), 100, &mut out).unwrap(),
            Span::Oversized
        );
        assert!(out.capacity() <= 200);
    }

    #[test]
    fn markers_across_buffer_boundaries() {
        let text = "xxxxxxx<title>Long title text</title>yyyy<id>12345</id>";
        let mut r = chunked(text, 3);
        let mut set = openers();
        let mut out = Vec::new();

        assert_eq!(r.find_any(&mut set).unwrap(), Some(0));
        assert_eq!(r.read_to(&mut Marker::new(b"</title>"), 64, &mut out).unwrap(), Span::Closed);
        assert_eq!(out, b"Long title text");
        assert_eq!(r.find_any(&mut set).unwrap(), Some(1));
        assert_eq!(r.read_to(&mut Marker::new(b"</id>"), 64, &mut out).unwrap(), Span::Closed);
        assert_eq!(out, b"12345");
        assert_eq!(r.offset(), text.len() as u64);
    }

    #[test]
    fn lead_bytes_cover_both_cases() {
        let set = MarkerSet::new(&[b"ab"]);
        assert_eq!(set.skip_to_lead(b"xxAx"), Some(2));
        let set = MarkerSet::new(&[b"ab", b"cd"]);
        assert_eq!(set.skip_to_lead(b"xxAx"), Some(0));
        let set = MarkerSet::new(&[b"<a", b"<b"]);
        assert_eq!(set.leads, vec![b'<']);
    }

    #[test]
    fn open_dump_reads_plain_and_bz2() {
        use bzip2::write::BzEncoder;
        use bzip2::Compression;
        use std::io::{Read, Write};

        let dir = tempfile::TempDir::new().unwrap();

        let plain = dir.path().join("dump.xml");
        std::fs::write(&plain, "<title>A</title>").unwrap();
        let mut text = String::new();
        open_dump(&plain).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "<title>A</title>");

        let compressed = dir.path().join("dump.xml.bz2");
        let mut encoder = BzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(b"<title>B</title>").unwrap();
        std::fs::write(&compressed, encoder.finish().unwrap()).unwrap();
        let mut text = String::new();
        open_dump(&compressed).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "<title>B</title>");
    }

    #[test]
    fn open_dump_missing_file() {
        assert!(open_dump(Path::new("/nonexistent/dump.xml")).is_err());
    }
}
