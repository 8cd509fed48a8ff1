use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::borrow::Cow;

static CHAR_REF_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap()
});

/// Resolves character references (`&amp;`, `&#233;`, `&#xE9;`) in dump text.
///
/// Single pass: `&amp;amp;` decodes to `&amp;`. Unknown names and code points that are
/// not valid characters are left as written.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }
    CHAR_REF_REGEX.replace_all(text, |caps: &Captures| match resolve_reference(&caps[1]) {
        Some(c) => c.to_string(),
        None => caps[0].to_string(),
    })
}

fn resolve_reference(body: &str) -> Option<char> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code);
    }

    let c = match body {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => '\u{a0}',
        "ndash" => '\u{2013}',
        "mdash" => '\u{2014}',
        "lsquo" => '\u{2018}',
        "rsquo" => '\u{2019}',
        "ldquo" => '\u{201c}',
        "rdquo" => '\u{201d}',
        "hellip" => '\u{2026}',
        "times" => '\u{d7}',
        _ => return None,
    };
    Some(c)
}
