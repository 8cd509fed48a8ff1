//! Follow-up stage mapping language-prefixed subjects onto primary-language entities.

use crate::config::TRANSLATION_RELATION;
use crate::error::ConfigError;
use crate::language::Language;
use crate::models::Fact;
use crate::stage::StageSpec;
use crate::theme::{
    ThemeKey, ThemeManifest, ThemeRegistry, ENTITY_DICTIONARY, WIKIPEDIA_IDS,
    WIKIPEDIA_IDS_NEEDS_TRANSLATION,
};
use anyhow::{Context, Result};
use rustc_hash::FxHashMap;
use tracing::info;

/// Foreign entity to primary-language entity.
#[derive(Debug, Default)]
pub struct EntityDictionary {
    entries: FxHashMap<String, String>,
}

impl EntityDictionary {
    pub fn from_facts(facts: impl IntoIterator<Item = Fact>) -> Self {
        let entries = facts
            .into_iter()
            .filter(|f| f.relation() == TRANSLATION_RELATION)
            .map(|f| (f.subject().to_string(), f.object().to_string()))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities without a counterpart keep their prefixed identifier.
    pub fn translate<'a>(&'a self, entity: &'a str) -> &'a str {
        self.entries.get(entity).map(String::as_str).unwrap_or(entity)
    }

    /// Rewrites the subject only; relation and object pass through untouched.
    pub fn translate_fact(&self, fact: Fact) -> Fact {
        match self.entries.get(fact.subject()) {
            Some(target) => fact.with_subject(target.clone()),
            None => fact,
        }
    }
}

pub struct EntityTranslator {
    input: ThemeKey,
    output: ThemeKey,
    dictionary: ThemeKey,
}

impl EntityTranslator {
    pub fn new(input: ThemeKey, output: ThemeKey, dictionary: ThemeKey) -> Self {
        Self {
            input,
            output,
            dictionary,
        }
    }

    /// Translator turning the language's id facts into final ones.
    pub fn for_wikipedia_ids(language: &Language) -> Self {
        Self::new(
            ThemeKey::in_language(WIKIPEDIA_IDS_NEEDS_TRANSLATION, language),
            ThemeKey::in_language(WIKIPEDIA_IDS, language),
            ThemeKey::in_language(ENTITY_DICTIONARY, language),
        )
    }

    pub fn spec(&self) -> StageSpec {
        StageSpec {
            name: format!("EntityTranslator({})", self.input),
            inputs: vec![self.input.clone(), self.dictionary.clone()],
            outputs: vec![self.output.clone()],
            follow_ups: Vec::new(),
        }
    }

    pub fn run(&self, registry: &ThemeRegistry) -> Result<ThemeManifest> {
        for key in [&self.input, &self.dictionary] {
            if !registry.is_available(key) {
                return Err(ConfigError::MissingTheme(key.clone()).into());
            }
        }

        let dictionary = EntityDictionary::from_facts(registry.load_facts(&self.dictionary)?);
        info!(
            input = %self.input,
            entries = dictionary.len(),
            "Translating entities"
        );

        let mut out = registry.writer(&self.output)?;
        let mut translated = 0u64;
        for fact in registry.facts(&self.input)? {
            let fact = fact?;
            if dictionary.entries.contains_key(fact.subject()) {
                translated += 1;
            }
            out.write(&dictionary.translate_fact(fact))
                .with_context(|| format!("Failed to translate theme {}", self.input))?;
        }

        let manifest = out.finish()?;
        info!(
            output = %self.output,
            facts = manifest.facts,
            translated,
            "Translation complete"
        );
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dictionary() -> EntityDictionary {
        EntityDictionary::from_facts(vec![
            Fact::new("<de/Paris>", TRANSLATION_RELATION, "<Paris>"),
            Fact::new("<de/Köln>", TRANSLATION_RELATION, "<Cologne>"),
            Fact::new("<de/X>", "<otherRelation>", "<Y>"),
        ])
    }

    #[test]
    fn dictionary_reads_only_translations() {
        assert_eq!(dictionary().len(), 2);
    }

    #[test]
    fn translates_known_entities() {
        let dict = dictionary();
        assert_eq!(dict.translate("<de/Köln>"), "<Cologne>");
        assert_eq!(dict.translate("<de/Unbekannt>"), "<de/Unbekannt>");
    }

    #[test]
    fn translate_fact_keeps_object() {
        let dict = dictionary();
        let fact = Fact::with_number("<de/Paris>", "<hasWikipediaId>", 42);
        let translated = dict.translate_fact(fact);
        assert_eq!(translated.subject(), "<Paris>");
        assert_eq!(translated.relation(), "<hasWikipediaId>");
        assert_eq!(translated.number(), Some(42));
    }

    #[test]
    fn spec_declares_themes() {
        let de = Language::new("de");
        let spec = EntityTranslator::for_wikipedia_ids(&de).spec();
        assert_eq!(
            spec.inputs,
            vec![
                ThemeKey::in_language(WIKIPEDIA_IDS_NEEDS_TRANSLATION, &de),
                ThemeKey::in_language(ENTITY_DICTIONARY, &de),
            ]
        );
        assert_eq!(spec.outputs, vec![ThemeKey::in_language(WIKIPEDIA_IDS, &de)]);
        assert!(spec.follow_ups.is_empty());
    }
}
