//! Mapping name and documentation sanitizing.
//!
//! The helpers here follow the Java Language Specification. Where a doc
//! comment mentions unicode escapes it refers to JLS §3.3: a backslash,
//! one or more `u`s and exactly four hex digits denoting a code unit.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Matches `*` directly followed by `/`, where either character may appear
/// literally or as a unicode escape. Only the slash is captured so the
/// asterisk survives the replacement untouched.
static COMMENT_TO_REPLACE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\*|\\u+(?i:002a))(?P<to_replace>/|\\u+(?i:002f))").expect("comment pattern")
});

static UNICODE_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\u+(?P<code_point>[0-9a-fA-F]{4})").expect("escape pattern"));

/// HTML character reference for `/`.
const COMMENT_REPLACEMENT: &str = "&#x2f;";

/// Reserved words of the target language; none of them is a valid mapping
/// even though they lex as identifiers.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];

/// Runs `pattern` over `input` and rebuilds the string, letting `replace`
/// pick the replaced sub-range per match. Returning `None` keeps the match
/// unchanged.
fn replace_ranges(
    input: &str,
    pattern: &Regex,
    mut replace: impl FnMut(&Captures) -> Option<(usize, usize, String)>,
) -> String {
    let mut transformed = String::with_capacity(input.len());
    let mut previous_end = 0;

    for caps in pattern.captures_iter(input) {
        if let Some((start, end, replacement)) = replace(&caps) {
            transformed.push_str(&input[previous_end..start]);
            transformed.push_str(&replacement);
            previous_end = end;
        }
    }

    // Remaining piece behind the last match
    transformed.push_str(&input[previous_end..]);
    transformed
}

/// Escapes block comment content to prevent it from prematurely ending the
/// comment. Replaces the slash of every `*/` occurrence with its HTML
/// character reference, leaving everything else unchanged. Unicode-escaped
/// forms of both characters are recognized as well.
///
/// The content passed here should be the text placed inside a `/* … */`
/// block; after escaping it can no longer terminate the block.
pub fn escape_comment_content(content: &str) -> String {
    replace_ranges(content, &COMMENT_TO_REPLACE, |caps| {
        let slash = caps.name("to_replace")?;
        Some((slash.start(), slash.end(), COMMENT_REPLACEMENT.to_string()))
    })
}

/// Decodes unicode escapes of the given string. Substrings that are not an
/// escape pass through unchanged, so the operation is idempotent on input
/// without escapes. An escape denoting a surrogate code unit is not a
/// character and is left as-is.
pub fn unescape_unicode_escapes(escaped: &str) -> String {
    replace_ranges(escaped, &UNICODE_ESCAPE, |caps| {
        let whole = caps.get(0)?;
        let digits = caps.name("code_point")?;
        let code_point = u32::from_str_radix(digits.as_str(), 16).ok()?;
        let character = char::from_u32(code_point)?;
        Some((whole.start(), whole.end(), character.to_string()))
    })
}

/// Returns whether `name` is a valid identifier of the target language:
/// identifier-start followed by identifier-parts, and not a reserved word.
/// With `unescape` set, unicode escapes are decoded before checking.
pub fn is_valid_identifier(name: &str, unescape: bool) -> bool {
    let unescaped;
    let name = if unescape {
        unescaped = unescape_unicode_escapes(name);
        unescaped.as_str()
    } else {
        name
    };

    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    is_identifier_start(first)
        && chars.all(is_identifier_part)
        && !RESERVED_WORDS.contains(&name)
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_numeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_literal_comment_end() {
        assert_eq!(escape_comment_content("abc*/"), "abc*&#x2f;");
        assert_eq!(escape_comment_content("*/*a"), "*&#x2f;*a");
    }

    #[test]
    fn test_escape_leaves_harmless_content() {
        assert_eq!(escape_comment_content("abc* /"), "abc* /");
        assert_eq!(escape_comment_content("/*abc"), "/*abc");
        assert_eq!(escape_comment_content(""), "");
    }

    #[test]
    fn test_escape_unicode_escaped_forms() {
        // Escaped slash, extra u's, upper case hex
        assert_eq!(escape_comment_content("abc*\\u002f"), "abc*&#x2f;");
        assert_eq!(escape_comment_content("abc*\\uuuu002f"), "abc*&#x2f;");
        assert_eq!(escape_comment_content("abc*\\u002F"), "abc*&#x2f;");

        // Escaped asterisk stays as written, only the slash form is replaced
        assert_eq!(escape_comment_content("abc\\u002a\\u002f"), "abc\\u002a&#x2f;");
        assert_eq!(escape_comment_content("abc\\u002A\\u002F"), "abc\\u002A&#x2f;");
    }

    #[test]
    fn test_escape_output_cannot_end_comment() {
        for input in [
            "*/",
            "**//",
            "a*/b*/c",
            "*\\u002f",
            "\\u002a/",
            "\\u002a\\u002f",
        ] {
            let escaped = escape_comment_content(input);
            assert!(!escaped.contains("*/"), "{escaped:?} still ends a comment");
            assert!(!COMMENT_TO_REPLACE.is_match(&escaped));
        }
    }

    #[test]
    fn test_unescape_basic() {
        assert_eq!(unescape_unicode_escapes("\\u006eewa"), "newa");
        assert_eq!(unescape_unicode_escapes("\\uuuu006eewa"), "newa");
        assert_eq!(unescape_unicode_escapes("abc"), "abc");
    }

    #[test]
    fn test_unescape_round_trip_without_escapes() {
        for input in ["", "plain", "with spaces", "tr\u{00e4}ns", "a*b/c"] {
            assert_eq!(unescape_unicode_escapes(input), input);
        }
    }

    #[test]
    fn test_unescape_ignores_malformed_and_surrogate() {
        // Too few digits
        assert_eq!(unescape_unicode_escapes("\\u00e"), "\\u00e");
        // Surrogate code unit is not a character
        assert_eq!(unescape_unicode_escapes("\\ud800"), "\\ud800");
    }

    #[test]
    fn test_identifier_validity() {
        assert!(is_valid_identifier("newa", false));
        assert!(is_valid_identifier("maxHealth", false));
        assert!(is_valid_identifier("_under", false));
        assert!(is_valid_identifier("$dollar", false));
        assert!(is_valid_identifier("x2", false));

        assert!(!is_valid_identifier("", false));
        assert!(!is_valid_identifier("2x", false));
        assert!(!is_valid_identifier("with space", false));
        assert!(!is_valid_identifier("new", false));
        assert!(!is_valid_identifier("null", false));
    }

    #[test]
    fn test_identifier_validity_with_unescaping() {
        // Decodes to "newa" which is fine
        assert!(is_valid_identifier("\\u006eewa", true));
        // Decodes to the reserved word "new"
        assert!(!is_valid_identifier("\\u006eew", true));
        // Without decoding the backslash makes it invalid
        assert!(!is_valid_identifier("\\u006eewa", false));
    }
}
