use crate::config::{PRIMARY_LANGUAGE, THREE_LETTER_CODE_RELATION};
use crate::error::ConfigError;
use crate::models::{unquote, Fact};
use rustc_hash::FxHashMap;
use std::fmt;

/// Two-letter Wikipedia edition code, normalized to lower case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Language(String);

impl Language {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_ascii_lowercase())
    }

    pub fn primary() -> Self {
        Self(PRIMARY_LANGUAGE.to_string())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_primary(&self) -> bool {
        self.0 == PRIMARY_LANGUAGE
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Two-letter to three-letter language code table.
#[derive(Debug, Default)]
pub struct LanguageCodes {
    two_to_three: FxHashMap<String, String>,
}

impl LanguageCodes {
    pub fn from_facts(facts: impl IntoIterator<Item = Fact>) -> Self {
        let two_to_three = facts
            .into_iter()
            .filter(|f| f.relation() == THREE_LETTER_CODE_RELATION)
            .map(|f| {
                (
                    unquote(f.subject()).to_ascii_lowercase(),
                    unquote(f.object()).to_ascii_lowercase(),
                )
            })
            .collect();
        Self { two_to_three }
    }

    pub fn len(&self) -> usize {
        self.two_to_three.len()
    }

    pub fn is_empty(&self) -> bool {
        self.two_to_three.is_empty()
    }

    pub fn three_letter(&self, language: &Language) -> Option<&str> {
        self.two_to_three.get(language.code()).map(String::as_str)
    }

    /// An empty table accepts every language.
    pub fn ensure_known(&self, language: &Language) -> Result<(), ConfigError> {
        if self.is_empty() || self.two_to_three.contains_key(language.code()) {
            Ok(())
        } else {
            Err(ConfigError::UnknownLanguage(language.code().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes() -> LanguageCodes {
        LanguageCodes::from_facts(vec![
            Fact::new("\"de\"", THREE_LETTER_CODE_RELATION, "\"deu\""),
            Fact::new("\"fr\"", THREE_LETTER_CODE_RELATION, "\"fra\""),
            Fact::new("\"xx\"", "<somethingElse>", "\"xxx\""),
        ])
    }

    #[test]
    fn language_normalizes_case() {
        assert_eq!(Language::new(" DE ").code(), "de");
    }

    #[test]
    fn primary_language() {
        assert!(Language::primary().is_primary());
        assert!(Language::new("EN").is_primary());
        assert!(!Language::new("de").is_primary());
    }

    #[test]
    fn mapping_reads_only_code_relation() {
        let codes = codes();
        assert_eq!(codes.len(), 2);
        assert_eq!(codes.three_letter(&Language::new("de")), Some("deu"));
        assert_eq!(codes.three_letter(&Language::new("xx")), None);
    }

    #[test]
    fn ensure_known_rejects_unlisted() {
        let codes = codes();
        assert!(codes.ensure_known(&Language::new("fr")).is_ok());
        let err = codes.ensure_known(&Language::new("zz")).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownLanguage(code) if code == "zz"));
    }

    #[test]
    fn empty_mapping_accepts_everything() {
        let codes = LanguageCodes::default();
        assert!(codes.ensure_known(&Language::new("zz")).is_ok());
    }
}
