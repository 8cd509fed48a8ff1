//! wikiids: Wikipedia page id extraction for knowledge-base construction
//!
//! This crate streams Wikipedia XML dumps and emits one fact per article, binding the
//! article's normalized entity to its page id:
//!
//! ```text
//! <Paris>      <hasWikipediaId>  "22989"^^xsd:integer
//! <de/Köln>    <hasWikipediaId>  "2657"^^xsd:integer
//! ```
//!
//! # Architecture
//!
//! - **Marker scanning** -- The dump is never parsed as XML. The scanner searches
//!   forward, case-insensitively, for the next `<title>` or `<id>` and pairs each title
//!   with the first id after it; later ids in the same page (revisions, contributors)
//!   are skipped. Input is never loaded into memory as a whole.
//! - **Title normalization** -- Ordered rewrite rules, then a common-noun dictionary or
//!   an entity whitelist, decide whether a title becomes an entity at all.
//! - **Themes** -- Inputs and outputs are TSV fact files addressed by name and
//!   language through an explicit [`theme::ThemeRegistry`].
//! - **Stages** -- The extractor and its translation follow-up declare their themes
//!   as a [`stage::StageSpec`]; [`stage::resolve_order`] finds a runnable order.
//! - **Parallel dumps** -- Independent dumps are scanned concurrently with rayon, all
//!   sharing one read-only set of rewrite rules.
//!
//! # Key Modules
//!
//! - [`scanner`] -- Title/id pairing over a marker stream
//! - [`normalize`] -- Rewrite rules and dictionary gates
//! - [`parser`] -- Dump opening (plain or BZ2) and case-insensitive marker search
//! - [`decode`] -- Character reference decoding for titles
//! - [`extract`] -- The id extraction stage
//! - [`translate`] -- Entity translation follow-up for non-primary languages
//! - [`theme`] -- Theme keys, registry, TSV reading and writing
//! - [`stage`] -- Stage declarations and ordering
//! - [`models`] -- Facts and literal encoding
//! - [`language`] -- Language codes
//! - [`stats`] -- Scan counters
//! - [`error`] -- Configuration and scan errors
//! - [`config`] -- Constants
//!
//! # Example Usage
//!
//! ```bash
//! # English and German dumps, themes (title patterns etc.) in ./themes
//! wikiids -v extract --themes themes/ \
//!     --dump en=enwiki-latest-pages-articles.xml.bz2 \
//!     --dump de=dewiki-latest-pages-articles.xml.bz2
//!
//! # Show the stage order without running anything
//! wikiids plan --themes themes/ --dump de=dewiki.xml.bz2
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod extract;
pub mod language;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod scanner;
pub mod stage;
pub mod stats;
pub mod theme;
pub mod translate;
