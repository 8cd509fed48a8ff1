use crate::config::XSD_INTEGER;
use crate::language::Language;

/// A single (subject, relation, object) triple.
///
/// Objects are stored in their literal encoding (`"42"^^xsd:integer`, `"text"`, or an
/// entity such as `<Paris>`). Facts are never mutated once built; translating a fact
/// produces a new one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fact {
    subject: String,
    relation: String,
    object: String,
}

impl Fact {
    pub fn new(
        subject: impl Into<String>,
        relation: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            relation: relation.into(),
            object: object.into(),
        }
    }

    pub fn with_number(subject: impl Into<String>, relation: impl Into<String>, n: u64) -> Self {
        Self::new(subject, relation, number_literal(n))
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn relation(&self) -> &str {
        &self.relation
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// Numeric value of the object, if it is an integer literal.
    pub fn number(&self) -> Option<u64> {
        parse_number_literal(&self.object)
    }

    /// Same relation and object, different subject.
    pub fn with_subject(self, subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            ..self
        }
    }
}

/// Encodes `n` as `"n"^^xsd:integer`.
pub fn number_literal(n: u64) -> String {
    let mut buf = itoa::Buffer::new();
    let digits = buf.format(n);
    let mut literal = String::with_capacity(digits.len() + XSD_INTEGER.len() + 4);
    literal.push('"');
    literal.push_str(digits);
    literal.push_str("\"^^");
    literal.push_str(XSD_INTEGER);
    literal
}

pub fn parse_number_literal(s: &str) -> Option<u64> {
    if s.starts_with('"') {
        unquote(s).parse().ok()
    } else {
        s.parse().ok()
    }
}

/// Builds the entity identifier for a title.
///
/// Spaces become underscores. Titles from the primary language map to `<Title>`,
/// all others to `<lang/Title>` so that identically named articles from different
/// editions cannot collide.
pub fn entity_for_title(title: &str, language: &Language) -> String {
    let name = title.trim().replace(' ', "_");
    if language.is_primary() {
        format!("<{}>", name)
    } else {
        format!("<{}/{}>", language.code(), name)
    }
}

/// Strips a string literal down to its text.
///
/// Accepts `"text"` with an optional `@lang` or `^^type` suffix and resolves backslash
/// escapes. Anything that does not start with a quote is returned unchanged.
pub fn unquote(s: &str) -> String {
    let Some(body) = s.strip_prefix('"') else {
        return s.to_string();
    };

    let mut result = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => break,
            '\\' => match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        Some(decoded) => result.push(decoded),
                        None => {
                            result.push_str("\\u");
                            result.push_str(&hex);
                        }
                    }
                }
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            },
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_literal_format() {
        assert_eq!(number_literal(42), "\"42\"^^xsd:integer");
        assert_eq!(number_literal(0), "\"0\"^^xsd:integer");
    }

    #[test]
    fn fact_number_reads_back_literal() {
        let fact = Fact::with_number("<Paris>", "<hasWikipediaId>", 42);
        assert_eq!(fact.object(), "\"42\"^^xsd:integer");
        assert_eq!(fact.number(), Some(42));
    }

    #[test]
    fn fact_number_none_for_entities() {
        let fact = Fact::new("<Paris>", "rdf:type", "<wordnet_city>");
        assert_eq!(fact.number(), None);
    }

    #[test]
    fn with_subject_keeps_object() {
        let fact = Fact::with_number("<de/Paris>", "<hasWikipediaId>", 7);
        let translated = fact.with_subject("<Paris>");
        assert_eq!(translated.subject(), "<Paris>");
        assert_eq!(translated.relation(), "<hasWikipediaId>");
        assert_eq!(translated.number(), Some(7));
    }

    #[test]
    fn entity_primary_language_unprefixed() {
        let en = Language::new("en");
        assert_eq!(entity_for_title("New York City", &en), "<New_York_City>");
    }

    #[test]
    fn entity_foreign_language_prefixed() {
        let de = Language::new("de");
        assert_eq!(entity_for_title("Köln", &de), "<de/Köln>");
    }

    #[test]
    fn entity_trims_whitespace() {
        let en = Language::new("en");
        assert_eq!(entity_for_title("  Paris ", &en), "<Paris>");
    }

    #[test]
    fn unquote_plain_literal() {
        assert_eq!(unquote("\"table\""), "table");
    }

    #[test]
    fn unquote_with_suffixes() {
        assert_eq!(unquote("\"table\"@eng"), "table");
        assert_eq!(unquote("\"42\"^^xsd:integer"), "42");
    }

    #[test]
    fn unquote_escapes() {
        assert_eq!(unquote(r#""a\"b\\c""#), "a\"b\\c");
        assert_eq!(unquote(r#""café""#), "café");
        assert_eq!(unquote(r#""^\(.*\)$""#), r"^\(.*\)$");
    }

    #[test]
    fn unquote_leaves_entities_alone() {
        assert_eq!(unquote("<Paris>"), "<Paris>");
    }
}
