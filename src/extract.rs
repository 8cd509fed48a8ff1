//! The Wikipedia id extraction stage.
//!
//! One [`WikiIdExtractor`] scans one dump of one language edition and writes a fact
//! `<Entity> <hasWikipediaId> "id"^^xsd:integer` for every accepted article. Output
//! for the primary language is final; other languages go to the needs-translation
//! theme and declare an [`EntityTranslator`] follow-up.

use crate::config::PROGRESS_INTERVAL;
use crate::error::ConfigError;
use crate::language::{Language, LanguageCodes};
use crate::normalize::{Gate, RewriteRules, TitleNormalizer};
use crate::parser::open_dump;
use crate::scanner::BlockScanner;
use crate::stage::StageSpec;
use crate::stats::ScanSummary;
use crate::theme::{
    ThemeKey, ThemeRegistry, LANGUAGE_CODE_MAPPING, PREFERRED_MEANINGS, TITLE_PATTERNS,
    WIKIPEDIA_IDS, WIKIPEDIA_IDS_NEEDS_TRANSLATION,
};
use crate::translate::EntityTranslator;
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct WikiIdExtractor {
    language: Language,
    dump: PathBuf,
}

impl WikiIdExtractor {
    pub fn new(language: Language, dump: impl Into<PathBuf>) -> Self {
        Self {
            language,
            dump: dump.into(),
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn dump(&self) -> &Path {
        &self.dump
    }

    pub fn output_theme(&self) -> ThemeKey {
        if self.language.is_primary() {
            ThemeKey::in_language(WIKIPEDIA_IDS, &self.language)
        } else {
            ThemeKey::in_language(WIKIPEDIA_IDS_NEEDS_TRANSLATION, &self.language)
        }
    }

    pub fn follow_ups(&self) -> Vec<EntityTranslator> {
        if self.language.is_primary() {
            Vec::new()
        } else {
            vec![EntityTranslator::for_wikipedia_ids(&self.language)]
        }
    }

    /// The primary language declares whichever dictionary the registry can provide,
    /// falling back to the preferred meanings so that a missing one is reported.
    pub fn spec(&self, registry: &ThemeRegistry) -> StageSpec {
        let mut inputs = vec![
            ThemeKey::new(TITLE_PATTERNS),
            ThemeKey::new(LANGUAGE_CODE_MAPPING),
        ];
        if self.language.is_primary() {
            inputs.push(
                Gate::source(registry, &self.language)
                    .unwrap_or_else(|| ThemeKey::new(PREFERRED_MEANINGS)),
            );
        }

        StageSpec {
            name: format!("WikiIdExtractor({})", self.language),
            inputs,
            outputs: vec![self.output_theme()],
            follow_ups: self.follow_ups().iter().map(EntityTranslator::spec).collect(),
        }
    }

    /// Loads everything the stage needs from the registry and runs it.
    pub fn run(&self, registry: &ThemeRegistry) -> Result<ScanSummary> {
        check_language(registry, &self.language)?;
        let normalizer = TitleNormalizer::from_registry(registry, &self.language)?;
        self.run_with(registry, &normalizer)
    }

    /// Scans the dump with an already built normalizer.
    ///
    /// On a fatal scan error the facts written so far stay in the theme file; no
    /// manifest is written for it.
    pub fn run_with(
        &self,
        registry: &ThemeRegistry,
        normalizer: &TitleNormalizer,
    ) -> Result<ScanSummary> {
        info!(
            language = %self.language,
            dump = ?self.dump,
            "Extracting Wikipedia ids"
        );
        let start = Instant::now();

        let input = open_dump(&self.dump)?;
        let mut scanner = BlockScanner::new(input, normalizer);
        let output = self.output_theme();
        let mut out = registry.writer(&output)?;
        let pb = ProgressBar::new_spinner();

        for fact in scanner.by_ref() {
            let fact = fact.with_context(|| {
                format!("Failed to extract ids from dump: {:?}", self.dump)
            })?;
            out.write(&fact)?;
            if out.written() % PROGRESS_INTERVAL == 0 {
                pb.tick();
            }
        }

        pb.finish_and_clear();
        out.finish()?;

        let summary = scanner.stats().snapshot();
        info!(
            language = %self.language,
            theme = %output,
            titles = summary.titles_seen,
            rejected = summary.titles_rejected,
            skipped_ids = summary.ids_skipped,
            facts = summary.facts_emitted,
            duration_secs = start.elapsed().as_secs_f64(),
            "Wikipedia id extraction complete"
        );
        Ok(summary)
    }
}

fn check_language(registry: &ThemeRegistry, language: &Language) -> Result<()> {
    let key = ThemeKey::new(LANGUAGE_CODE_MAPPING);
    if !registry.is_available(&key) {
        return Err(ConfigError::MissingTheme(key).into());
    }
    let codes = LanguageCodes::from_facts(registry.load_facts(&key)?);
    codes.ensure_known(language)?;
    if let Some(code) = codes.three_letter(language) {
        debug!(language = %language, code, "Language code resolved");
    }
    Ok(())
}

/// Runs several extractors in parallel, one scanner per dump.
///
/// Title patterns are loaded once and shared; every normalizer and every output
/// theme belongs to exactly one extractor. All configuration is checked before the
/// first dump is opened. Results keep the order of `extractors`.
pub fn run_all(
    registry: &ThemeRegistry,
    extractors: &[WikiIdExtractor],
) -> Result<Vec<ScanSummary>> {
    let rules = Arc::new(RewriteRules::load(registry)?);

    let normalizers = extractors
        .iter()
        .map(|extractor| {
            check_language(registry, extractor.language())?;
            TitleNormalizer::with_rules(registry, Arc::clone(&rules), extractor.language())
        })
        .collect::<Result<Vec<_>>>()?;

    extractors
        .par_iter()
        .zip(normalizers.par_iter())
        .map(|(extractor, normalizer)| extractor.run_with(registry, normalizer))
        .collect()
}
