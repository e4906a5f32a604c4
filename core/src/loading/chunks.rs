//! Line-range partitioning and the line-index pre-pass.

use std::fs::File;
use std::io;
use std::path::Path;

use memchr::memchr_iter;
use memmap2::Mmap;

/// Half-open range `[begin, end)` of zero-based line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub begin: usize,
    pub end: usize,
}

impl LineRange {
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// A chunk of lines and the byte offset of its first line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Position of the chunk in file order.
    pub index: usize,
    pub lines: LineRange,
    pub offset: u64,
}

/// Split `[0, total_lines)` into contiguous ranges.
///
/// The chunk count is clamped to `1..=total_lines`; the last range absorbs the
/// remainder.
pub fn partition(total_lines: usize, chunk_count: usize) -> Vec<LineRange> {
    if total_lines == 0 {
        return Vec::new();
    }
    let count = chunk_count.clamp(1, total_lines);
    let size = total_lines / count;
    (0..count)
        .map(|i| {
            let begin = i * size;
            let end = if i + 1 == count { total_lines } else { begin + size };
            LineRange { begin, end }
        })
        .collect()
}

/// Number of physical lines. A final line without a newline still counts.
pub fn count_lines(bytes: &[u8]) -> usize {
    let newlines = memchr_iter(b'\n', bytes).count();
    match bytes.last() {
        Some(&b'\n') | None => newlines,
        Some(_) => newlines + 1,
    }
}

/// Byte offset of each range's first line, found in one forward scan.
pub fn chunk_offsets(bytes: &[u8], ranges: &[LineRange]) -> Vec<ChunkMetadata> {
    let mut newlines = memchr_iter(b'\n', bytes);
    let mut line = 0usize;
    let mut line_start = 0u64;
    ranges
        .iter()
        .enumerate()
        .map(|(index, range)| {
            while line < range.begin {
                let Some(pos) = newlines.next() else {
                    break;
                };
                line += 1;
                line_start = pos as u64 + 1;
            }
            ChunkMetadata {
                index,
                lines: *range,
                offset: line_start,
            }
        })
        .collect()
}

/// Line count and chunk boundaries of a log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    pub line_count: usize,
    pub chunks: Vec<ChunkMetadata>,
}

impl LineIndex {
    pub fn build(path: &Path, chunk_count: usize) -> io::Result<Self> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(Self::from_bytes(&[], chunk_count));
        }
        // SAFETY: the mapping is read-only and dropped before this returns.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self::from_bytes(&mmap, chunk_count))
    }

    pub fn from_bytes(bytes: &[u8], chunk_count: usize) -> Self {
        let line_count = count_lines(bytes);
        let ranges = partition(line_count, chunk_count);
        Self {
            line_count,
            chunks: chunk_offsets(bytes, &ranges),
        }
    }
}
