//! Decides whether an article title denotes an entity, and which one.
//!
//! A title passes through three gates, in order:
//!
//! 1. **Rewrite rules** -- ordered regex replacements loaded from the title patterns
//!    theme. A rule whose replacement is `NIL` rejects any title it matches
//!    (disambiguation pages, categories, lists, ...).
//! 2. **Common nouns** -- for the primary language without a whitelist, titles whose
//!    lower-cased form is a preferred meaning of a common noun are rejected, so that
//!    an article like "Table" does not become an entity.
//! 3. **Whitelist** -- when the transitive types are available, only entities that
//!    already carry a type are accepted.
//!
//! The normalizer is immutable after construction and can be shared by any number
//! of scanners.

use crate::config::{PREFERRED_MEANING_RELATION, REJECT_SENTINEL, TITLE_REPLACE_RELATION};
use crate::error::ConfigError;
use crate::language::Language;
use crate::models::{entity_for_title, unquote, Fact};
use crate::theme::{ThemeKey, ThemeRegistry, PREFERRED_MEANINGS, TITLE_PATTERNS, TRANSITIVE_TYPES};
use anyhow::Result;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
enum RuleAction {
    Replace(String),
    Reject,
}

#[derive(Debug, Clone)]
pub struct RewriteRule {
    pattern: Regex,
    action: RuleAction,
}

impl RewriteRule {
    pub fn new(pattern: &str, replacement: &str) -> Result<Self, ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let action = if replacement == REJECT_SENTINEL {
            RuleAction::Reject
        } else {
            RuleAction::Replace(replacement.to_string())
        };
        Ok(Self {
            pattern: regex,
            action,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RewriteRules {
    rules: Vec<RewriteRule>,
}

impl RewriteRules {
    pub fn new(rules: Vec<RewriteRule>) -> Self {
        Self { rules }
    }

    /// Builds rules from `"pattern" <_titleReplace> "replacement"` facts, keeping file order.
    pub fn from_facts(facts: impl IntoIterator<Item = Fact>) -> Result<Self, ConfigError> {
        let rules = facts
            .into_iter()
            .filter(|f| f.relation() == TITLE_REPLACE_RELATION)
            .map(|f| RewriteRule::new(&unquote(f.subject()), &unquote(f.object())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    pub fn load(registry: &ThemeRegistry) -> Result<Self> {
        let key = ThemeKey::new(TITLE_PATTERNS);
        if !registry.is_available(&key) {
            return Err(ConfigError::MissingTheme(key).into());
        }
        let rules = Self::from_facts(registry.load_facts(&key)?)?;
        info!(rules = rules.len(), "Title patterns loaded");
        Ok(rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies every rule in order, stopping at the first rejecting rule that matches.
    pub fn apply(&self, title: &str) -> Result<String, Rejection> {
        let mut current = title.to_string();
        for (index, rule) in self.rules.iter().enumerate() {
            match &rule.action {
                RuleAction::Reject => {
                    if rule.pattern.is_match(&current) {
                        return Err(Rejection::Rule(index));
                    }
                }
                RuleAction::Replace(replacement) => {
                    let replaced = match rule.pattern.replace_all(&current, replacement.as_str()) {
                        Cow::Borrowed(_) => continue,
                        Cow::Owned(s) => s,
                    };
                    current = replaced;
                }
            }
        }
        Ok(current)
    }
}

/// Dictionary check applied after the rewrite rules.
#[derive(Debug, Default)]
pub enum Gate {
    /// No dictionary; only allowed for non-primary languages.
    #[default]
    Open,
    /// Lower-cased common nouns that must not become entities.
    CommonNouns(FxHashSet<String>),
    /// Entity identifiers that are known to be valid.
    Whitelist(FxHashSet<String>),
}

impl Gate {
    pub fn common_nouns<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::CommonNouns(words.into_iter().map(|w| w.as_ref().to_lowercase()).collect())
    }

    pub fn whitelist<I, S>(entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Whitelist(entities.into_iter().map(Into::into).collect())
    }

    /// Theme the gate for `language` would be loaded from: the whitelist when it is
    /// available, the preferred meanings otherwise. Non-primary languages need none.
    pub fn source(registry: &ThemeRegistry, language: &Language) -> Option<ThemeKey> {
        if !language.is_primary() {
            return None;
        }
        [TRANSITIVE_TYPES, PREFERRED_MEANINGS]
            .into_iter()
            .map(ThemeKey::new)
            .find(|key| registry.is_available(key))
    }

    pub fn load(registry: &ThemeRegistry, language: &Language) -> Result<Self> {
        if !language.is_primary() {
            return Ok(Self::Open);
        }
        let Some(key) = Self::source(registry, language) else {
            return Err(ConfigError::UngatedPrimaryLanguage {
                language: language.code().to_string(),
            }
            .into());
        };

        let gate = if key.name() == TRANSITIVE_TYPES {
            let subjects = registry
                .facts(&key)?
                .map(|fact| fact.map(|f| f.subject().to_string()))
                .collect::<Result<FxHashSet<_>>>()?;
            info!(entities = subjects.len(), "Entity whitelist loaded");
            Self::Whitelist(subjects)
        } else {
            let mut words = FxHashSet::default();
            for fact in registry.facts(&key)? {
                let fact = fact?;
                if fact.relation() == PREFERRED_MEANING_RELATION {
                    words.insert(unquote(fact.object()).to_lowercase());
                }
            }
            info!(words = words.len(), "Common nouns loaded");
            Self::CommonNouns(words)
        };
        Ok(gate)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Rejecting rewrite rule at this position matched.
    Rule(usize),
    /// Nothing left after rewriting.
    Empty,
    CommonNoun,
    NotWhitelisted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted(String),
    Rejected(Rejection),
}

#[derive(Debug)]
pub struct TitleNormalizer {
    rules: Arc<RewriteRules>,
    gate: Gate,
    language: Language,
}

impl TitleNormalizer {
    /// Fails when the primary language is requested without a dictionary gate.
    pub fn new(rules: Arc<RewriteRules>, language: Language, gate: Gate) -> Result<Self, ConfigError> {
        if language.is_primary() && matches!(gate, Gate::Open) {
            return Err(ConfigError::UngatedPrimaryLanguage {
                language: language.code().to_string(),
            });
        }
        Ok(Self {
            rules,
            gate,
            language,
        })
    }

    /// Loads rules and the language's gate from the registry.
    pub fn from_registry(registry: &ThemeRegistry, language: &Language) -> Result<Self> {
        let rules = Arc::new(RewriteRules::load(registry)?);
        Self::with_rules(registry, rules, language)
    }

    /// Like [`from_registry`](Self::from_registry) but reuses already loaded rules.
    pub fn with_rules(
        registry: &ThemeRegistry,
        rules: Arc<RewriteRules>,
        language: &Language,
    ) -> Result<Self> {
        let gate = Gate::load(registry, language)?;
        Ok(Self::new(rules, language.clone(), gate)?)
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn normalize(&self, raw_title: &str) -> Verdict {
        let rewritten = match self.rules.apply(raw_title) {
            Ok(title) => title,
            Err(rejection) => return Verdict::Rejected(rejection),
        };
        let title = rewritten.trim();
        if title.is_empty() {
            return Verdict::Rejected(Rejection::Empty);
        }

        if let Gate::CommonNouns(words) = &self.gate {
            if words.contains(&title.to_lowercase()) {
                return Verdict::Rejected(Rejection::CommonNoun);
            }
        }

        let entity = entity_for_title(title, &self.language);

        if let Gate::Whitelist(entities) = &self.gate {
            if !entities.contains(&entity) {
                return Verdict::Rejected(Rejection::NotWhitelisted);
            }
        }

        Verdict::Accepted(entity)
    }
}
