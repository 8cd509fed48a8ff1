//! Pairs every article title with the first id that follows it.
//!
//! A dump is a sequence of blocks, each opened by `<title>` and followed by one or
//! more `<id>` markers (the page id, then revision and contributor ids). The scanner
//! keeps a single pending entity: a title sets it, the next id consumes it. Ids met
//! while nothing is pending are ignored, which is how revision ids are skipped.

use crate::config::{
    HAS_WIKIPEDIA_ID, ID_CLOSE, ID_OPEN, MAX_ID_LEN, MAX_TITLE_LEN, TITLE_CLOSE, TITLE_OPEN,
};
use crate::decode::decode_entities;
use crate::error::ScanError;
use crate::models::Fact;
use crate::normalize::{TitleNormalizer, Verdict};
use crate::parser::{Marker, MarkerReader, MarkerSet, Span};
use crate::stats::ScanStats;
use std::io::BufRead;
use tracing::{debug, trace};

const TITLE: usize = 0;

#[derive(Debug, Default, PartialEq, Eq)]
enum Pending {
    #[default]
    None,
    Rejected,
    Entity(String),
}

/// Lazy iterator of `<hasWikipediaId>` facts over one dump.
///
/// Facts come out in dump order. The first error ends the iteration.
pub struct BlockScanner<'n, R> {
    reader: MarkerReader<R>,
    normalizer: &'n TitleNormalizer,
    openers: MarkerSet,
    title_close: Marker,
    id_close: Marker,
    pending: Pending,
    buf: Vec<u8>,
    stats: ScanStats,
    finished: bool,
}

impl<'n, R: BufRead> BlockScanner<'n, R> {
    pub fn new(input: R, normalizer: &'n TitleNormalizer) -> Self {
        Self {
            reader: MarkerReader::new(input),
            normalizer,
            openers: MarkerSet::new(&[TITLE_OPEN, ID_OPEN]),
            title_close: Marker::new(TITLE_CLOSE),
            id_close: Marker::new(ID_CLOSE),
            pending: Pending::None,
            buf: Vec::with_capacity(256),
            stats: ScanStats::new(),
            finished: false,
        }
    }

    pub fn stats(&self) -> &ScanStats {
        &self.stats
    }

    /// Bytes of input consumed so far.
    pub fn offset(&self) -> u64 {
        self.reader.offset()
    }

    fn advance(&mut self) -> Result<Option<Fact>, ScanError> {
        loop {
            match self.reader.find_any(&mut self.openers)? {
                None => return Ok(None),
                Some(TITLE) => self.on_title()?,
                Some(_) => {
                    if let Some(fact) = self.on_id()? {
                        return Ok(Some(fact));
                    }
                }
            }
        }
    }

    fn on_title(&mut self) -> Result<(), ScanError> {
        let span = self
            .reader
            .read_to(&mut self.title_close, MAX_TITLE_LEN, &mut self.buf)?;
        self.stats.inc_titles();
        match span {
            Span::Closed => {}
            Span::Oversized => {
                self.stats.inc_rejected();
                debug!(offset = self.reader.offset(), "Title too long, rejected");
                self.pending = Pending::Rejected;
                return Ok(());
            }
            Span::Unterminated => {
                debug!(offset = self.reader.offset(), "Dump ended inside a title");
                self.pending = Pending::None;
                return Ok(());
            }
        }

        let raw = String::from_utf8_lossy(&self.buf);
        let title = decode_entities(&raw);
        self.pending = match self.normalizer.normalize(&title) {
            Verdict::Accepted(entity) => Pending::Entity(entity),
            Verdict::Rejected(reason) => {
                self.stats.inc_rejected();
                debug!(title = %title, ?reason, "Title rejected");
                Pending::Rejected
            }
        };
        Ok(())
    }

    fn on_id(&mut self) -> Result<Option<Fact>, ScanError> {
        let span = self
            .reader
            .read_to(&mut self.id_close, MAX_ID_LEN, &mut self.buf)?;

        let entity = match std::mem::take(&mut self.pending) {
            Pending::Entity(entity) => entity,
            other => {
                self.pending = other;
                self.stats.inc_skipped_ids();
                trace!(offset = self.reader.offset(), "Id without pending title skipped");
                return Ok(None);
            }
        };

        match span {
            Span::Closed => {}
            Span::Oversized => {
                return Err(ScanError::OversizedId {
                    entity,
                    offset: self.reader.offset(),
                    limit: MAX_ID_LEN,
                })
            }
            Span::Unterminated => {
                debug!(entity = %entity, "Dump ended inside an id");
                return Ok(None);
            }
        }

        let text = String::from_utf8_lossy(&self.buf);
        let text = text.trim();
        match text.parse::<u64>() {
            Ok(id) => {
                self.stats.inc_facts();
                Ok(Some(Fact::with_number(entity, HAS_WIKIPEDIA_ID, id)))
            }
            Err(source) => Err(ScanError::Desync {
                entity,
                text: text.to_string(),
                offset: self.reader.offset(),
                source,
            }),
        }
    }
}

impl<R: BufRead> Iterator for BlockScanner<'_, R> {
    type Item = Result<Fact, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.advance() {
            Ok(Some(fact)) => Some(Ok(fact)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: BufRead> std::iter::FusedIterator for BlockScanner<'_, R> {}
