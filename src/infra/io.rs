//! Chunked UTF-8 reading.
//!
//! The rewriter and the tabular reader both consume text in chunks of
//! arbitrary size. Reading a fixed number of bytes can cut a multi-byte
//! UTF-8 sequence in half; [`ChunkedReader`] carries such an incomplete
//! trailing sequence over into the next chunk so every returned chunk is
//! valid UTF-8 and no character is ever split.

use std::io::{self, Read};

/// Default chunk size for source files.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

pub struct ChunkedReader<R> {
    reader: R,
    chunk_size: usize,
    /// Incomplete trailing UTF-8 sequence from the previous read; a sequence
    /// is at most four bytes, so at most three can be left dangling.
    carry: [u8; 4],
    carry_len: usize,
}

impl<R: Read> ChunkedReader<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(4),
            carry: [0; 4],
            carry_len: 0,
        }
    }

    pub fn with_default_chunk_size(reader: R) -> Self {
        Self::new(reader, DEFAULT_CHUNK_SIZE)
    }

    /// Returns the next decoded chunk, or `None` once the input is
    /// exhausted. Invalid UTF-8, including a sequence truncated by the end
    /// of the input, is an [`io::ErrorKind::InvalidData`] error.
    pub fn next_chunk(&mut self) -> io::Result<Option<String>> {
        let mut bytes = Vec::with_capacity(self.carry_len + self.chunk_size);
        bytes.extend_from_slice(&self.carry[..self.carry_len]);

        let fresh_start = bytes.len();
        bytes.resize(fresh_start + self.chunk_size, 0);
        let read = self.reader.read(&mut bytes[fresh_start..])?;
        bytes.truncate(fresh_start + read);

        if read == 0 && bytes.is_empty() {
            return Ok(None);
        }

        let (valid_len, carry_len) = match std::str::from_utf8(&bytes) {
            Ok(_) => (bytes.len(), 0),
            // An incomplete sequence at the very end is completed by the
            // next read; everything else is genuinely malformed.
            Err(err) if err.error_len().is_none() && read > 0 => {
                (err.valid_up_to(), bytes.len() - err.valid_up_to())
            }
            Err(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "input is not valid UTF-8",
                ));
            }
        };

        self.carry_len = carry_len;
        self.carry[..carry_len].copy_from_slice(&bytes[valid_len..]);
        bytes.truncate(valid_len);

        match String::from_utf8(bytes) {
            Ok(chunk) => Ok(Some(chunk)),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "input is not valid UTF-8",
            )),
        }
    }
}
