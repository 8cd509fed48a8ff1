//! Themes: named, optionally language-specific fact collections stored as TSV files.
//!
//! A theme is addressed by a [`ThemeKey`] of base name and language. The
//! [`ThemeRegistry`] maps keys onto files in a themes directory and carries the
//! human-readable description of every theme it knows. Stages receive the registry
//! explicitly, so separate runs (and tests) never share theme state.

use crate::config::WRITE_BUFFER_SIZE;
use crate::language::Language;
use crate::models::Fact;
use anyhow::{Context, Result};
use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const TITLE_PATTERNS: &str = "titlePatterns";
pub const LANGUAGE_CODE_MAPPING: &str = "languageCodeMapping";
pub const PREFERRED_MEANINGS: &str = "preferredMeanings";
pub const TRANSITIVE_TYPES: &str = "transitiveTypes";
pub const ENTITY_DICTIONARY: &str = "entityDictionary";
pub const WIKIPEDIA_IDS: &str = "wikipediaIds";
pub const WIKIPEDIA_IDS_NEEDS_TRANSLATION: &str = "wikipediaIdsNeedsTranslation";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThemeKey {
    name: String,
    language: Option<Language>,
}

impl ThemeKey {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            language: None,
        }
    }

    pub fn in_language(name: &str, language: &Language) -> Self {
        Self {
            name: name.to_string(),
            language: Some(language.clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language(&self) -> Option<&Language> {
        self.language.as_ref()
    }

    /// File name without extension: `name` or `name_lang`.
    pub fn file_stem(&self) -> String {
        match &self.language {
            Some(lang) => format!("{}_{}", self.name, lang),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for ThemeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_stem())
    }
}

/// Written next to every finished theme file.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ThemeManifest {
    pub name: String,
    pub language: Option<String>,
    pub description: String,
    pub facts: u64,
}

pub struct ThemeRegistry {
    dir: PathBuf,
    descriptions: FxHashMap<String, String>,
}

impl ThemeRegistry {
    /// Registry with no known themes.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            descriptions: FxHashMap::default(),
        }
    }

    /// Registry knowing every theme the id extraction reads or writes.
    pub fn with_defaults(dir: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(dir);
        registry.register(TITLE_PATTERNS, "Ordered rewrite rules applied to article titles");
        registry.register(LANGUAGE_CODE_MAPPING, "Two-letter to three-letter language codes");
        registry.register(PREFERRED_MEANINGS, "Common nouns and their preferred meanings");
        registry.register(TRANSITIVE_TYPES, "Entities with their transitive types");
        registry.register(ENTITY_DICTIONARY, "Foreign entities and their primary-language counterparts");
        registry.register(WIKIPEDIA_IDS, "Extracted IDs from Wikipedia articles pages");
        registry.register(
            WIKIPEDIA_IDS_NEEDS_TRANSLATION,
            "Extracted IDs from Wikipedia articles pages (to be translated)",
        );
        registry
    }

    pub fn register(&mut self, name: &str, description: &str) {
        self.descriptions
            .insert(name.to_string(), description.to_string());
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn description(&self, key: &ThemeKey) -> Option<&str> {
        self.descriptions.get(key.name()).map(String::as_str)
    }

    pub fn path(&self, key: &ThemeKey) -> PathBuf {
        self.dir.join(format!("{}.tsv", key.file_stem()))
    }

    pub fn manifest_path(&self, key: &ThemeKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.file_stem()))
    }

    pub fn is_available(&self, key: &ThemeKey) -> bool {
        self.path(key).is_file()
    }

    /// Streams the facts of a theme in file order.
    pub fn facts(&self, key: &ThemeKey) -> Result<impl Iterator<Item = Result<Fact>>> {
        let path = self.path(key);
        let file = File::open(&path)
            .with_context(|| format!("Failed to open theme {} at {:?}", key, path))?;
        let reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(BufReader::new(file));

        let key = key.clone();
        Ok(reader.into_records().filter_map(move |record| match record {
            Ok(record) => record_to_fact(&record).map(Ok),
            Err(e) => Some(Err(anyhow::Error::new(e).context(format!("Failed to read theme {}", key)))),
        }))
    }

    pub fn load_facts(&self, key: &ThemeKey) -> Result<Vec<Fact>> {
        let facts = self.facts(key)?.collect::<Result<Vec<_>>>()?;
        debug!(theme = %key, facts = facts.len(), "Theme loaded");
        Ok(facts)
    }

    /// Opens an append-only writer, replacing any previous content of the theme.
    pub fn writer(&self, key: &ThemeKey) -> Result<ThemeWriter> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create themes directory: {:?}", self.dir))?;

        // A manifest marks a finished theme; it is written again by `finish`.
        let manifest_path = self.manifest_path(key);
        match fs::remove_file(&manifest_path) {
            Ok(()) => debug!(theme = %key, "Stale manifest removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to remove manifest: {:?}", manifest_path)
                })
            }
        }

        let path = self.path(key);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create theme file: {:?}", path))?;
        let writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_writer(BufWriter::with_capacity(WRITE_BUFFER_SIZE, file));

        let description = match self.description(key) {
            Some(d) => d.to_string(),
            None => {
                warn!(theme = %key, "Writing unregistered theme");
                String::new()
            }
        };

        Ok(ThemeWriter {
            key: key.clone(),
            manifest_path,
            description,
            writer,
            written: 0,
        })
    }
}

/// Three columns are `subject relation object`; four carry a leading fact id.
fn record_to_fact(record: &StringRecord) -> Option<Fact> {
    let offset = match record.len() {
        3 => 0,
        n if n >= 4 => 1,
        _ => return None,
    };
    Some(Fact::new(
        record.get(offset)?.trim(),
        record.get(offset + 1)?.trim(),
        record.get(offset + 2)?.trim(),
    ))
}

pub struct ThemeWriter {
    key: ThemeKey,
    manifest_path: PathBuf,
    description: String,
    writer: csv::Writer<BufWriter<File>>,
    written: u64,
}

impl ThemeWriter {
    pub fn write(&mut self, fact: &Fact) -> Result<()> {
        let subject = sanitize_field(fact.subject());
        let relation = sanitize_field(fact.relation());
        let object = sanitize_field(fact.object());
        self.writer
            .write_record([&*subject, &*relation, &*object])
            .with_context(|| format!("Failed to write to theme {}", self.key))?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes the facts and writes the manifest.
    pub fn finish(mut self) -> Result<ThemeManifest> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush theme {}", self.key))?;

        let manifest = ThemeManifest {
            name: self.key.name().to_string(),
            language: self.key.language().map(|l| l.code().to_string()),
            description: self.description,
            facts: self.written,
        };
        let file = File::create(&self.manifest_path)
            .with_context(|| format!("Failed to create manifest: {:?}", self.manifest_path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &manifest)
            .context("Failed to write theme manifest")?;

        info!(theme = %self.key, facts = manifest.facts, "Theme written");
        Ok(manifest)
    }
}

/// Tabs and line breaks would split a TSV record.
fn sanitize_field(s: &str) -> Cow<'_, str> {
    if s.contains(['\t', '\n', '\r']) {
        Cow::Owned(s.replace(['\t', '\n', '\r'], " "))
    } else {
        Cow::Borrowed(s)
    }
}
