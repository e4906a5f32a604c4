//! File loading: sequential or chunked-parallel parsing, then per-log
//! construction.

pub mod chunks;
pub mod parallel;

use std::io;
use std::mem;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::combat_log::{Event, EventKind, RecordReader, TokenizerOptions, event_from_record};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::log::{EncounterLog, LogError};

pub use chunks::{ChunkMetadata, LineIndex, LineRange, partition};
pub use parallel::{CancellationToken, parse_chunk, parse_chunks};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{path} is not a file")]
    NotAFile { path: PathBuf },
    #[error("parsing cancelled after {completed} of {total} chunks")]
    Cancelled { completed: usize, total: usize },
    #[error("a chunk worker failed after {completed} of {total} chunks")]
    WorkerFailed { completed: usize, total: usize },
    #[error("chunk {chunk} could not be read: {source}")]
    ChunkFailed {
        chunk: usize,
        #[source]
        source: io::Error,
    },
    #[error("failed to start chunk workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    #[error(transparent)]
    Log(#[from] LogError),
}

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub workers: usize,
    pub chunks: usize,
    /// Files with fewer lines are parsed sequentially.
    pub parallel_threshold_lines: usize,
    /// Split the file at every `END_LOG`.
    pub multiple_logs: bool,
    pub tokenizer: TokenizerOptions,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            chunks: 64,
            parallel_threshold_lines: 50_000,
            multiple_logs: false,
            tokenizer: TokenizerOptions::default(),
        }
    }
}

pub fn default_workers() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    Sequential,
    Parallel { chunks: usize, workers: usize },
}

/// A sub-log that failed construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLog {
    /// File line of the sub-log's first event.
    pub first_line: usize,
    pub event_count: usize,
    pub error: LogError,
}

#[derive(Debug)]
pub struct LoadedFile {
    pub path: PathBuf,
    pub line_count: usize,
    pub mode: ParseMode,
    pub logs: Vec<EncounterLog>,
    pub rejected: Vec<RejectedLog>,
    pub diagnostics: Diagnostics,
}

/// Events of one sub-log, re-based to start at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct SubLog {
    pub first_line: usize,
    pub events: Vec<Event>,
}

pub struct LogLoader {
    path: PathBuf,
    options: LoadOptions,
    cancel: CancellationToken,
}

impl LogLoader {
    pub fn new(path: impl Into<PathBuf>, options: LoadOptions) -> Self {
        Self {
            path: path.into(),
            options,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    fn io_error(&self, source: io::Error) -> LoadError {
        LoadError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn check_file(&self) -> Result<(), LoadError> {
        let metadata = std::fs::metadata(&self.path).map_err(|e| self.io_error(e))?;
        if !metadata.is_file() {
            return Err(LoadError::NotAFile {
                path: self.path.clone(),
            });
        }
        Ok(())
    }

    /// Parse the whole file into one event stream with global sequence ids.
    ///
    /// Picks the parallel path when the file is large enough and more than
    /// one worker is configured.
    pub fn read_events(&self) -> Result<(Vec<Event>, usize, ParseMode), LoadError> {
        self.check_file()?;
        let index =
            LineIndex::build(&self.path, self.options.chunks).map_err(|e| self.io_error(e))?;

        let parallel = self.options.workers > 1
            && index.chunks.len() > 1
            && index.line_count >= self.options.parallel_threshold_lines;
        if !parallel {
            let events = self.read_sequential()?;
            return Ok((events, index.line_count, ParseMode::Sequential));
        }

        let workers = self.options.workers.min(index.chunks.len());
        let events = parse_chunks(
            &self.path,
            &index.chunks,
            workers,
            self.options.tokenizer,
            &self.cancel,
        )?;
        let mode = ParseMode::Parallel {
            chunks: index.chunks.len(),
            workers,
        };
        Ok((events, index.line_count, mode))
    }

    /// Parse on the calling thread.
    pub fn read_sequential(&self) -> Result<Vec<Event>, LoadError> {
        self.check_file()?;
        let reader =
            RecordReader::open(&self.path, self.options.tokenizer).map_err(|e| self.io_error(e))?;
        let mut events = Vec::new();
        for (sequence_id, record) in reader.enumerate() {
            let record = record.map_err(|e| self.io_error(e))?;
            events.push(event_from_record(sequence_id, record.fields));
        }
        Ok(events)
    }

    /// Parse with an explicit chunk count, regardless of file size.
    pub fn read_parallel(&self, chunks: usize) -> Result<Vec<Event>, LoadError> {
        self.check_file()?;
        let index = LineIndex::build(&self.path, chunks).map_err(|e| self.io_error(e))?;
        let workers = self.options.workers.clamp(1, index.chunks.len().max(1));
        parse_chunks(
            &self.path,
            &index.chunks,
            workers,
            self.options.tokenizer,
            &self.cancel,
        )
    }

    /// Parse the file and build every log it contains.
    pub fn load(&self) -> Result<LoadedFile, LoadError> {
        let started = Instant::now();
        let (events, line_count, mode) = self.read_events()?;

        let mut diagnostics = Diagnostics::new();
        let sub_logs = split_logs(events, self.options.multiple_logs, &mut diagnostics);
        let (logs, rejected) = build_logs(sub_logs, &mut diagnostics);

        tracing::info!(
            path = %self.path.display(),
            lines = line_count,
            ?mode,
            logs = logs.len(),
            rejected = rejected.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Loaded combat log"
        );
        Ok(LoadedFile {
            path: self.path.clone(),
            line_count,
            mode,
            logs,
            rejected,
            diagnostics,
        })
    }

    /// Parse the file as exactly one log.
    pub fn load_single(&self, diagnostics: &mut Diagnostics) -> Result<EncounterLog, LoadError> {
        let (events, _, _) = self.read_events()?;
        let mut sub_logs = split_logs(events, false, diagnostics);
        let events = sub_logs.pop().map(|sub| sub.events).unwrap_or_default();
        Ok(EncounterLog::from_events(events, diagnostics)?)
    }
}

/// Cut a global event stream at `END_LOG` markers.
///
/// Every sub-log is re-based so its sequence ids start at zero. In single-log
/// mode the stream ends at the first `END_LOG` and anything after it is
/// discarded.
pub fn split_logs(
    events: Vec<Event>,
    multiple: bool,
    diagnostics: &mut Diagnostics,
) -> Vec<SubLog> {
    let mut logs = Vec::new();
    let mut current: Vec<Event> = Vec::new();
    let mut first_line = 0;
    let mut events = events.into_iter();

    while let Some(mut event) = events.next() {
        if current.is_empty() {
            first_line = event.sequence_id;
        }
        let line = event.sequence_id;
        let is_end = matches!(event.kind, EventKind::EndLog);
        event.sequence_id = current.len();
        current.push(event);
        if !is_end {
            continue;
        }

        logs.push(SubLog {
            first_line,
            events: mem::take(&mut current),
        });
        if !multiple {
            let discarded = events.len();
            if discarded > 0 {
                diagnostics.info(
                    DiagnosticKind::TrailingEvents,
                    None,
                    format!("{discarded} events after END_LOG at line {line} were discarded"),
                );
            }
            break;
        }
    }

    if !current.is_empty() {
        logs.push(SubLog {
            first_line,
            events: current,
        });
    }
    logs
}

/// Construct a log from each sub-log, keeping failures aside.
pub fn build_logs(
    sub_logs: Vec<SubLog>,
    diagnostics: &mut Diagnostics,
) -> (Vec<EncounterLog>, Vec<RejectedLog>) {
    let mut logs = Vec::new();
    let mut rejected = Vec::new();
    for SubLog { first_line, events } in sub_logs {
        let event_count = events.len();
        match EncounterLog::from_events(events, diagnostics) {
            Ok(log) => logs.push(log),
            Err(error) => {
                diagnostics.error(
                    DiagnosticKind::LogRejected,
                    None,
                    format!("log starting at line {first_line} rejected: {error}"),
                );
                rejected.push(RejectedLog {
                    first_line,
                    event_count,
                    error,
                });
            }
        }
    }
    (logs, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn stream(lines: &[String]) -> Vec<Event> {
        parse_events(lines)
    }

    #[test]
    fn single_mode_discards_trailing_events() {
        let events = stream(&[
            begin_log(1),
            begin_combat(2),
            end_combat(3),
            end_log(4),
            begin_combat(5),
        ]);
        let mut diagnostics = Diagnostics::new();
        let logs = split_logs(events, false, &mut diagnostics);
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].events.len(), 4);
        assert_eq!(diagnostics.count(DiagnosticKind::TrailingEvents), 1);
    }

    #[test]
    fn multiple_mode_rebases_each_log() {
        let events = stream(&[
            begin_log(1),
            end_log(2),
            begin_log(10),
            begin_combat(11),
            end_log(12),
        ]);
        let mut diagnostics = Diagnostics::new();
        let logs = split_logs(events, true, &mut diagnostics);
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[1].first_line, 2);
        let ids: Vec<_> = logs[1].events.iter().map(|e| e.sequence_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn unterminated_trailing_log_is_rejected() {
        let events = stream(&[begin_log(1), end_log(2), begin_log(10), begin_combat(11)]);
        let mut diagnostics = Diagnostics::new();
        let sub_logs = split_logs(events, true, &mut diagnostics);
        let (logs, rejected) = build_logs(sub_logs, &mut diagnostics);
        assert_eq!(logs.len(), 1);
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].first_line, 2);
        assert_eq!(rejected[0].event_count, 2);
        assert_eq!(rejected[0].error, LogError::MissingEndLog);
        assert_eq!(diagnostics.count(DiagnosticKind::LogRejected), 1);
    }

    #[test]
    fn empty_stream_has_no_logs() {
        let mut diagnostics = Diagnostics::new();
        assert!(split_logs(Vec::new(), true, &mut diagnostics).is_empty());
    }
}
