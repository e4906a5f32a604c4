//! Streaming record tokenizer.
//!
//! Reads delimiter-separated lines with quoted-field support, either from a
//! whole file or from a byte-offset-bounded range of physical lines. A row that
//! cannot be tokenized is reported in place and never stops the stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

use encoding_rs::{Encoding, UTF_8};
use memchr::memchr;

use super::error::RecordError;

/// Raw fields of one line. Empty unquoted fields are `None`.
pub type Fields = Vec<Option<String>>;

const READ_BUFFER_SIZE: usize = 256 * 1024;

#[derive(Debug, Clone, Copy)]
pub struct TokenizerOptions {
    pub delimiter: u8,
    pub quote: u8,
    /// Largest accepted field in bytes.
    pub max_field_size: usize,
    pub encoding: &'static Encoding,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            max_field_size: 128 * 1024 * 1024,
            encoding: UTF_8,
        }
    }
}

/// One physical line and its tokenized fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Zero-based line number within the file.
    pub line: usize,
    pub fields: Result<Fields, RecordError>,
}

pub struct RecordReader<R> {
    reader: R,
    options: TokenizerOptions,
    buf: Vec<u8>,
    line: usize,
    remaining: Option<usize>,
    at_file_start: bool,
}

impl RecordReader<BufReader<File>> {
    /// Read every line of a file.
    pub fn open(path: &Path, options: TokenizerOptions) -> io::Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(
            BufReader::with_capacity(READ_BUFFER_SIZE, file),
            options,
        ))
    }

    /// Read `line_count` lines starting at byte `offset`.
    ///
    /// `offset` must be the start of line `first_line`.
    pub fn open_range(
        path: &Path,
        offset: u64,
        first_line: usize,
        line_count: usize,
        options: TokenizerOptions,
    ) -> io::Result<Self> {
        let mut file = File::open(path)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut reader = Self::new(BufReader::with_capacity(READ_BUFFER_SIZE, file), options);
        reader.line = first_line;
        reader.remaining = Some(line_count);
        reader.at_file_start = offset == 0;
        Ok(reader)
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(reader: R, options: TokenizerOptions) -> Self {
        Self {
            reader,
            options,
            buf: Vec::new(),
            line: 0,
            remaining: None,
            at_file_start: true,
        }
    }

    fn next_record(&mut self) -> io::Result<Option<RawRecord>> {
        if self.remaining == Some(0) {
            return Ok(None);
        }
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }

        let mut bytes = self.buf.as_slice();
        if let Some(stripped) = bytes.strip_suffix(b"\n") {
            bytes = stripped;
        }
        if let Some(stripped) = bytes.strip_suffix(b"\r") {
            bytes = stripped;
        }

        let (text, had_errors) = if self.at_file_start {
            self.options.encoding.decode_with_bom_removal(bytes)
        } else {
            self.options.encoding.decode_without_bom_handling(bytes)
        };
        if had_errors {
            tracing::debug!(line = self.line, "Replaced malformed byte sequences while decoding");
        }
        self.at_file_start = false;

        let record = RawRecord {
            line: self.line,
            fields: split_record(&text, &self.options),
        };
        self.line += 1;
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= 1;
        }
        Ok(Some(record))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = io::Result<RawRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

/// Tokenize a single decoded line.
///
/// An empty line yields no fields. A trailing delimiter yields a final `None`.
pub fn split_record(line: &str, options: &TokenizerOptions) -> Result<Fields, RecordError> {
    if line.is_empty() {
        return Ok(Vec::new());
    }
    let bytes = line.as_bytes();
    let mut fields = Vec::new();
    let mut pos = 0;
    loop {
        if bytes.get(pos) == Some(&options.quote) {
            let (value, next) = read_quoted(line, pos, options.quote)?;
            check_size(value.len(), options)?;
            fields.push(Some(value));
            match bytes.get(next) {
                None => break,
                Some(&b) if b == options.delimiter => pos = next + 1,
                Some(_) => return Err(RecordError::TrailingAfterQuote(next)),
            }
        } else {
            let end = memchr(options.delimiter, &bytes[pos..]).map_or(bytes.len(), |i| pos + i);
            let raw = &line[pos..end];
            check_size(raw.len(), options)?;
            fields.push((!raw.is_empty()).then(|| raw.to_string()));
            if end == bytes.len() {
                break;
            }
            pos = end + 1;
        }
    }
    Ok(fields)
}

/// Read a quoted field starting at `start`. Returns the unescaped value and the
/// position right after the closing quote.
fn read_quoted(line: &str, start: usize, quote: u8) -> Result<(String, usize), RecordError> {
    let bytes = line.as_bytes();
    let mut value = String::new();
    let mut cursor = start + 1;
    loop {
        let Some(offset) = memchr(quote, &bytes[cursor..]) else {
            return Err(RecordError::UnterminatedQuote(start));
        };
        let closing = cursor + offset;
        value.push_str(&line[cursor..closing]);
        if bytes.get(closing + 1) == Some(&quote) {
            // Doubled quote is an escaped literal
            value.push(quote as char);
            cursor = closing + 2;
        } else {
            return Ok((value, closing + 1));
        }
    }
}

fn check_size(size: usize, options: &TokenizerOptions) -> Result<(), RecordError> {
    if size > options.max_field_size {
        return Err(RecordError::FieldTooLarge {
            size,
            limit: options.max_field_size,
        });
    }
    Ok(())
}
