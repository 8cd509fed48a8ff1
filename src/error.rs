use crate::theme::ThemeKey;
use std::num::ParseIntError;
use thiserror::Error;

/// Problems detected before any dump record is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required theme {0} is not available")]
    MissingTheme(ThemeKey),

    #[error(
        "normalizing {language} titles requires either a transitive-type whitelist or a \
         preferred-meanings dictionary, otherwise common nouns (such as 'table') become entities"
    )]
    UngatedPrimaryLanguage { language: String },

    #[error("language code {0:?} is not listed in the language code mapping")]
    UnknownLanguage(String),

    #[error("invalid title pattern {pattern:?}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("stages cannot be ordered, unsatisfied inputs: {0}")]
    UnsatisfiedInputs(String),
}

/// Fatal conditions raised while scanning a dump.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to read dump")]
    Io(#[from] std::io::Error),

    #[error("id {text:?} for {entity} near byte {offset} is not a non-negative integer")]
    Desync {
        entity: String,
        text: String,
        offset: u64,
        #[source]
        source: ParseIntError,
    },

    #[error("id for {entity} near byte {offset} is longer than {limit} bytes")]
    OversizedId {
        entity: String,
        offset: u64,
        limit: usize,
    },
}
