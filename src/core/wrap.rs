//! Paragraph reflowing for injected documentation blocks.
//!
//! Every emitted line starts with the configured prefix and stays within
//! the maximum length where a space allows breaking. Preserving the prefix
//! matters more than strict width: a line without any usable break point is
//! emitted overlong rather than torn apart.

use std::collections::VecDeque;

#[derive(Debug, thiserror::Error)]
#[error("line prefix '{prefix}' is not shorter than the maximum line length {max_line_length}")]
pub struct WrapError {
    prefix: String,
    max_line_length: usize,
}

pub struct TextWrapper<'a> {
    max_line_length: usize,
    line_prefix: &'a str,
    line_break: &'a str,
}

impl<'a> TextWrapper<'a> {
    pub fn new(
        max_line_length: usize,
        line_prefix: &'a str,
        line_break: &'a str,
    ) -> Result<Self, WrapError> {
        if line_prefix.len() >= max_line_length {
            return Err(WrapError {
                prefix: line_prefix.to_string(),
                max_line_length,
            });
        }

        Ok(Self {
            max_line_length,
            line_prefix,
            line_break,
        })
    }

    /// Reflows `input`, treating embedded `\n` as logical line boundaries.
    pub fn transform(&self, input: &str) -> String {
        self.transform_lines(input.split('\n').map(str::to_string).collect())
    }

    pub fn transform_lines(&self, input_lines: Vec<String>) -> String {
        let length_sum: usize = input_lines.iter().map(String::len).sum();
        let mut unprocessed: VecDeque<String> = input_lines.into();
        let mut transformed = String::with_capacity(length_sum);

        while let Some(next) = unprocessed.pop_front() {
            let mut line = String::with_capacity(self.line_prefix.len() + next.len());
            line.push_str(self.line_prefix);
            line.push_str(&next);

            if line.len() > self.max_line_length {
                if let Some(rest) = self.split_line(&mut line) {
                    // The remainder is re-prefixed on the next iteration
                    unprocessed.push_front(rest);
                }
            }

            transformed.push_str(&line);
            transformed.push_str(self.line_break);
        }

        // Remove the trailing line break
        transformed.truncate(transformed.len().saturating_sub(self.line_break.len()));
        transformed
    }

    /// Splits an overlong line at a wrap character, returning the remainder
    /// without the prefix. The wrap character stays on the first line.
    fn split_line(&self, line: &mut String) -> Option<String> {
        let index = self.find_wrap_index(line)?;
        Some(line.split_off(index + 1))
    }

    fn find_wrap_index(&self, line: &str) -> Option<usize> {
        let bytes = line.as_bytes();

        // Backward from the length limit, never into the prefix
        for index in (self.line_prefix.len()..self.max_line_length).rev() {
            if can_wrap_at(bytes[index]) {
                return Some(index);
            }
        }

        // No wrap point in front of the limit; settle for the next one after
        // it, as long as the remainder would be non-empty
        for index in self.max_line_length..bytes.len() {
            if can_wrap_at(bytes[index]) && index < bytes.len() - 1 {
                return Some(index);
            }
        }

        None
    }
}

fn can_wrap_at(byte: u8) -> bool {
    byte == b' '
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_must_be_shorter_than_max() {
        assert!(TextWrapper::new(4, "long prefix", "\n").is_err());
        assert!(TextWrapper::new(4, "abcd", "\n").is_err());
        assert!(TextWrapper::new(4, "abc", "\n").is_ok());
    }

    #[test]
    fn test_short_line_is_only_prefixed() {
        let wrapper = TextWrapper::new(80, " * ", "\n").unwrap();
        assert_eq!(wrapper.transform("short"), " * short");
    }

    #[test]
    fn test_logical_lines_are_kept() {
        let wrapper = TextWrapper::new(80, " * ", "\r\n").unwrap();
        assert_eq!(
            wrapper.transform("first\nsecond"),
            " * first\r\n * second"
        );
    }

    #[test]
    fn test_wraps_backward_at_space() {
        let wrapper = TextWrapper::new(10, "> ", "\n").unwrap();
        // "> one two three" is too long; the break lands after "one "
        assert_eq!(wrapper.transform("one two three"), "> one two \n> three");
    }

    #[test]
    fn test_forward_fallback_for_long_word() {
        let wrapper = TextWrapper::new(8, "> ", "\n").unwrap();
        // No space before the limit; the first one after it is used
        assert_eq!(
            wrapper.transform("unbreakable rest"),
            "> unbreakable \n> rest"
        );
    }

    #[test]
    fn test_unsplittable_line_is_emitted_as_is() {
        let wrapper = TextWrapper::new(8, "> ", "\n").unwrap();
        assert_eq!(wrapper.transform("unbreakable"), "> unbreakable");
        // A trailing space would leave an empty remainder; not worth a split
        assert_eq!(wrapper.transform("unbreakable "), "> unbreakable ");
    }

    #[test]
    fn test_no_trailing_line_break() {
        let wrapper = TextWrapper::new(20, " * ", "\r\n").unwrap();
        let wrapped = wrapper.transform("several words that need wrapping");
        assert!(!wrapped.ends_with("\r\n"));
    }

    #[test]
    fn test_width_is_respected_for_wrappable_text() {
        let wrapper = TextWrapper::new(20, " * ", "\n").unwrap();
        let wrapped =
            wrapper.transform("these are all small words which wrap very well indeed here");

        for line in wrapped.split('\n') {
            assert!(line.len() <= 20, "line too long: {line:?}");
            assert!(line.starts_with(" * "), "prefix missing: {line:?}");
        }
    }

    #[test]
    fn test_empty_input_is_just_the_prefix() {
        let wrapper = TextWrapper::new(10, " * ", "\n").unwrap();
        assert_eq!(wrapper.transform(""), " * ");
    }
}
