//! Hand-rolled reader for RFC 4180-style tabular data.
//!
//! Parses characters in CSV format as described in RFC 4180 section 2 (but
//! not the ABNF grammar). Additionally it
//! - considers an empty line as containing the empty string,
//! - requires that the closing quote of a quoted value is followed by a
//!   separator, a line break or the end of the characters.
//!
//! It does not enforce that all rows have the same number of columns, and it
//! never materializes the whole input: characters are pulled from a
//! [`ChunkSource`] into a small look-ahead buffer on demand.
//!
//! There are side-effect-free methods for peeking at the following content
//! ([`CsvReader::has_more`], [`CsvReader::is_next_value`],
//! [`CsvReader::is_next_new_row`], [`CsvReader::is_trailing_empty_row`]) and
//! consuming methods ([`CsvReader::next_row`], [`CsvReader::read_value`],
//! [`CsvReader::skip_value`]). Using a consuming method when it is not
//! applicable, for example reading a value at the end of a row, is a
//! [`CsvError::Parse`]. Row-oriented callers should usually drive the reader
//! through [`CsvReader::peek_or_consume_next`].

use std::collections::VecDeque;
use std::io;

use crate::infra::io::ChunkedReader;

const SEPARATOR: &str = ",";
const QUOTATION: &str = "\"";
const LINE_BREAK: &str = "\r\n";

/// Supplies chunks of characters to the reader. A chunk may have any length;
/// `None` signals the end of the input, after which the source is not asked
/// again.
pub trait ChunkSource {
    fn next_chunk(&mut self) -> io::Result<Option<String>>;
}

impl<R: io::Read> ChunkSource for ChunkedReader<R> {
    fn next_chunk(&mut self) -> io::Result<Option<String>> {
        ChunkedReader::next_chunk(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    /// Malformed tabular data, with the reader position at the time of the
    /// failure. All indices are zero-based; `char_index` counts consumed
    /// characters from the start of the input.
    #[error("{message}; at char {char_index}, row {row_index}, column {column_index}")]
    Parse {
        message: String,
        char_index: usize,
        row_index: usize,
        column_index: usize,
    },

    /// The underlying character source failed.
    #[error("reading characters failed")]
    Source(#[from] io::Error),
}

/// What the reader is looking at next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataType {
    Value,
    Row,
    End,
}

impl DataType {
    /// Whether this data type means that the current row is finished.
    pub fn is_row_finished(self) -> bool {
        matches!(self, DataType::Row | DataType::End)
    }
}

pub struct CsvReader<S> {
    source: S,
    /// Look-ahead characters fetched but not yet consumed.
    buffer: VecDeque<char>,
    reached_end: bool,
    char_index: usize,
    row_index: usize,
    /// Number of values consumed in the current row. Zero means the next
    /// operation must be either reading the row's (possibly empty) leading
    /// value or nothing; advancing the row requires at least one value.
    column_index: usize,
}

impl<S: ChunkSource> CsvReader<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: VecDeque::new(),
            reached_end: false,
            char_index: 0,
            row_index: 0,
            column_index: 0,
        }
    }

    fn parse_error(&self, message: impl Into<String>) -> CsvError {
        CsvError::Parse {
            message: message.into(),
            char_index: self.char_index,
            row_index: self.row_index,
            column_index: self.column_index,
        }
    }

    /// Pulls chunks until the look-ahead buffer holds at least `len`
    /// characters or the source is exhausted.
    fn ensure_buffer(&mut self, len: usize) -> Result<(), CsvError> {
        while !self.reached_end && self.buffer.len() < len {
            match self.source.next_chunk()? {
                Some(chunk) => self.buffer.extend(chunk.chars()),
                None => self.reached_end = true,
            }
        }
        Ok(())
    }

    fn expect_str(&mut self, expected: &str) -> Result<bool, CsvError> {
        // The expected tokens are ASCII, so byte length equals char count
        self.ensure_buffer(expected.len())?;

        if self.buffer.len() < expected.len() {
            return Ok(false);
        }
        Ok(expected
            .chars()
            .enumerate()
            .all(|(index, expected_char)| self.buffer[index] == expected_char))
    }

    /// Whether the next content ends a value: a separator, a row break, or
    /// the end of the input.
    fn is_at_value_end(&mut self) -> Result<bool, CsvError> {
        if !self.has_more_unprocessed()? {
            return Ok(true);
        }
        Ok(self.expect_str(SEPARATOR)? || self.expect_str(LINE_BREAK)?)
    }

    fn consume_from_buffer(&mut self, amount: usize) {
        self.buffer.drain(..amount);
        self.char_index += amount;
    }

    fn consume_char(&mut self, sink: Option<&mut String>) {
        if let Some(character) = self.buffer.pop_front() {
            if let Some(sink) = sink {
                sink.push(character);
            }
            self.char_index += 1;
        }
    }

    fn consume_if_expected(&mut self, expected: &str) -> Result<bool, CsvError> {
        if self.expect_str(expected)? {
            self.consume_from_buffer(expected.len());
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn consume_expected(&mut self, expected: &str) -> Result<(), CsvError> {
        if self.consume_if_expected(expected)? {
            Ok(())
        } else {
            Err(self.parse_error(format!(
                "Expected string '{}' was not found",
                expected.escape_debug()
            )))
        }
    }

    fn has_more_unprocessed(&mut self) -> Result<bool, CsvError> {
        self.ensure_buffer(1)?;
        Ok(!self.buffer.is_empty())
    }

    pub fn has_more(&mut self) -> Result<bool, CsvError> {
        Ok(self.column_index == 0 || self.has_more_unprocessed()?)
    }

    pub fn is_next_value(&mut self) -> Result<bool, CsvError> {
        Ok(self.column_index == 0 || self.expect_str(SEPARATOR)?)
    }

    pub fn is_next_new_row(&mut self) -> Result<bool, CsvError> {
        self.expect_str(LINE_BREAK)
    }

    /// Whether the reader stands at the start of a row with no characters
    /// left, i.e. an empty row at the end of the input. Useful when a
    /// trailing empty line should be ignored rather than read as an empty
    /// value.
    pub fn is_trailing_empty_row(&mut self) -> Result<bool, CsvError> {
        Ok(self.column_index == 0 && !self.has_more_unprocessed()?)
    }

    pub fn next_row(&mut self) -> Result<(), CsvError> {
        if self.column_index == 0 {
            return Err(self.parse_error("Have to consume empty value at row start first"));
        }
        self.consume_expected(LINE_BREAK)?;
        self.row_index += 1;
        self.column_index = 0;
        Ok(())
    }

    /// Reads a value, pushing its characters into `sink`. Nothing is pushed
    /// for an empty value.
    pub fn read_value(&mut self, sink: &mut String) -> Result<(), CsvError> {
        self.consume_value(Some(sink))
    }

    pub fn skip_value(&mut self) -> Result<(), CsvError> {
        self.consume_value(None)
    }

    fn consume_value(&mut self, mut sink: Option<&mut String>) -> Result<(), CsvError> {
        // Any value after the row's first one is preceded by a separator
        if self.column_index != 0 {
            self.consume_expected(SEPARATOR)?;
        }

        if self.consume_if_expected(QUOTATION)? {
            loop {
                if self.consume_if_expected(QUOTATION)? {
                    if self.is_at_value_end()? {
                        // Was the closing quote
                        break;
                    }
                    // A doubled quote encodes one literal quote; anything
                    // else directly after a quote is malformed.
                    self.consume_expected(QUOTATION)?;
                    if let Some(sink) = sink.as_deref_mut() {
                        sink.push('"');
                    }
                } else if self.has_more_unprocessed()? {
                    self.consume_char(sink.as_deref_mut());
                } else {
                    return Err(self.parse_error("Quoted value is missing closing quote"));
                }
            }
        } else {
            while !self.is_at_value_end()? {
                if self.expect_str(QUOTATION)? {
                    return Err(self.parse_error("Found unexpected quotation mark"));
                }
                self.consume_char(sink.as_deref_mut());
            }
        }

        self.column_index += 1;
        Ok(())
    }

    pub fn peek_next(&mut self) -> Result<DataType, CsvError> {
        if self.is_next_value()? {
            return Ok(DataType::Value);
        }
        if self.is_next_new_row()? {
            return Ok(DataType::Row);
        }
        if !self.has_more()? {
            return Ok(DataType::End);
        }
        Err(self.parse_error("Malformed data"))
    }

    /// Peeks at the next data and, if a row break is next, already consumes
    /// it. With `expect_trailing_empty_row` set, a consumed row break that
    /// leaves only an empty trailing row behind is promoted to
    /// [`DataType::End`].
    pub fn peek_or_consume_next(
        &mut self,
        expect_trailing_empty_row: bool,
    ) -> Result<DataType, CsvError> {
        let data_type = self.peek_next()?;

        if data_type == DataType::Row {
            self.next_row()?;

            if expect_trailing_empty_row && self.is_trailing_empty_row()? {
                return Ok(DataType::End);
            }
        }

        Ok(data_type)
    }
}
