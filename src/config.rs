/// Language whose entities are unprefixed and need no translation pass
pub const PRIMARY_LANGUAGE: &str = "en";

/// Relation binding an article entity to its page id
pub const HAS_WIKIPEDIA_ID: &str = "<hasWikipediaId>";

/// Relation under which title rewrite rules are stored
pub const TITLE_REPLACE_RELATION: &str = "<_titleReplace>";

/// Replacement value that turns a rewrite rule into a rejection
pub const REJECT_SENTINEL: &str = "NIL";

/// Relation linking a common-noun meaning to the word it is preferred for
pub const PREFERRED_MEANING_RELATION: &str = "<isPreferredMeaningOf>";

/// Relation mapping a two-letter language code to its three-letter form
pub const THREE_LETTER_CODE_RELATION: &str = "<hasThreeLetterLanguageCode>";

/// Relation mapping a language-prefixed entity to its primary-language entity
pub const TRANSLATION_RELATION: &str = "<_hasTranslation>";

/// Datatype attached to numeric literals
pub const XSD_INTEGER: &str = "xsd:integer";

pub const TITLE_OPEN: &[u8] = b"<title>";
pub const TITLE_CLOSE: &[u8] = b"</title>";
pub const ID_OPEN: &[u8] = b"<id>";
pub const ID_CLOSE: &[u8] = b"</id>";

/// Longest title text kept in memory; longer titles are rejected
pub const MAX_TITLE_LEN: usize = 4096;

/// Longest id text kept in memory
pub const MAX_ID_LEN: usize = 64;

/// Read buffer for dump input (256KB)
pub const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Write buffer for theme output (128KB)
pub const WRITE_BUFFER_SIZE: usize = 128 * 1024;

/// Progress update interval (tick every N facts)
pub const PROGRESS_INTERVAL: u64 = 1000;
