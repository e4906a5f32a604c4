//! Chunked multi-worker parsing.
//!
//! Workers pull chunks from a shared queue, tokenize and convert their lines
//! in isolation, and send each result back over a channel. The orchestrator
//! waits for exactly one result per chunk, then concatenates them in chunk
//! order. Any failure or cancellation discards every partial result.

use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::combat_log::{Event, RecordReader, TokenizerOptions, event_from_record};

use super::LoadError;
use super::chunks::ChunkMetadata;

/// How often the orchestrator checks for cancellation while waiting.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shared flag that abandons outstanding chunks when set.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

enum ChunkOutcome {
    Parsed(Vec<Event>),
    Failed(io::Error),
    Panicked,
}

/// Parse one chunk. Sequence ids are chunk-local.
pub fn parse_chunk(
    path: &Path,
    chunk: &ChunkMetadata,
    options: TokenizerOptions,
) -> io::Result<Vec<Event>> {
    let reader = RecordReader::open_range(
        path,
        chunk.offset,
        chunk.lines.begin,
        chunk.lines.len(),
        options,
    )?;
    let mut events = Vec::with_capacity(chunk.lines.len());
    for (position, record) in reader.enumerate() {
        events.push(event_from_record(position, record?.fields));
    }
    Ok(events)
}

/// Parse every chunk on a pool of `workers` threads and merge in chunk order.
///
/// Returned events carry global sequence ids.
pub fn parse_chunks(
    path: &Path,
    chunks: &[ChunkMetadata],
    workers: usize,
    options: TokenizerOptions,
    cancel: &CancellationToken,
) -> Result<Vec<Event>, LoadError> {
    if chunks.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, chunks.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("aegis-chunk-{i}"))
        .build()?;

    let queue: Mutex<VecDeque<&ChunkMetadata>> = Mutex::new(chunks.iter().collect());
    let abort = AtomicBool::new(false);
    let (sender, receiver) = mpsc::channel();

    let results = pool.in_place_scope(|scope| {
        for _ in 0..workers {
            let sender = sender.clone();
            let (queue, abort) = (&queue, &abort);
            scope.spawn(move |_| run_worker(path, queue, sender, options, cancel, abort));
        }
        drop(sender);
        let results = collect_results(&receiver, chunks.len(), cancel);
        if results.is_err() {
            abort.store(true, Ordering::SeqCst);
        }
        results
    })?;

    let mut events: Vec<Event> = results.into_iter().flatten().collect();
    for (sequence_id, event) in events.iter_mut().enumerate() {
        event.sequence_id = sequence_id;
    }
    tracing::debug!(
        chunks = chunks.len(),
        workers,
        events = events.len(),
        "Merged chunk results"
    );
    Ok(events)
}

fn run_worker(
    path: &Path,
    queue: &Mutex<VecDeque<&ChunkMetadata>>,
    sender: Sender<(usize, ChunkOutcome)>,
    options: TokenizerOptions,
    cancel: &CancellationToken,
    abort: &AtomicBool,
) {
    loop {
        if cancel.is_cancelled() || abort.load(Ordering::SeqCst) {
            return;
        }
        let next = match queue.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(_) => return,
        };
        let Some(chunk) = next else {
            return;
        };

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| {
            parse_chunk(path, chunk, options)
        })) {
            Ok(Ok(events)) => ChunkOutcome::Parsed(events),
            Ok(Err(e)) => ChunkOutcome::Failed(e),
            Err(_) => ChunkOutcome::Panicked,
        };
        if sender.send((chunk.index, outcome)).is_err() {
            return;
        }
    }
}

fn collect_results(
    receiver: &Receiver<(usize, ChunkOutcome)>,
    total: usize,
    cancel: &CancellationToken,
) -> Result<Vec<Vec<Event>>, LoadError> {
    let mut slots: Vec<Option<Vec<Event>>> = (0..total).map(|_| None).collect();
    let mut completed = 0;

    while completed < total {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled { completed, total });
        }
        match receiver.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok((index, ChunkOutcome::Parsed(events))) => {
                if let Some(slot) = slots.get_mut(index)
                    && slot.replace(events).is_none()
                {
                    completed += 1;
                }
            }
            Ok((chunk, ChunkOutcome::Failed(source))) => {
                return Err(LoadError::ChunkFailed { chunk, source });
            }
            Ok((chunk, ChunkOutcome::Panicked)) => {
                tracing::error!(chunk, "Chunk worker panicked");
                return Err(LoadError::WorkerFailed { completed, total });
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                if cancel.is_cancelled() {
                    return Err(LoadError::Cancelled { completed, total });
                }
                return Err(LoadError::WorkerFailed { completed, total });
            }
        }
    }

    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::chunks::LineIndex;

    fn write_log(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Encounter.log");
        std::fs::write(&path, lines.join("\n")).unwrap();
        (dir, path)
    }

    #[test]
    fn chunk_sequence_ids_are_local() {
        let (_dir, path) = write_log(&["1,END_COMBAT", "2,BEGIN_COMBAT", "3,END_COMBAT"]);
        let index = LineIndex::from_bytes(&std::fs::read(&path).unwrap(), 2);
        let second = parse_chunk(&path, &index.chunks[1], TokenizerOptions::default()).unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].sequence_id, 0);
        assert_eq!(second[0].raw_event_id, Some(2));
    }

    #[test]
    fn merged_ids_are_global() {
        let lines: Vec<String> = (0..20).map(|i| format!("{i},BEGIN_COMBAT")).collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let (_dir, path) = write_log(&lines);
        let index = LineIndex::build(&path, 6).unwrap();
        let events = parse_chunks(
            &path,
            &index.chunks,
            3,
            TokenizerOptions::default(),
            &CancellationToken::new(),
        )
        .unwrap();
        assert_eq!(events.len(), 20);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.sequence_id, i);
            assert_eq!(event.raw_event_id, Some(i as i64));
        }
    }

    #[test]
    fn cancelled_token_fails_cleanly() {
        let (_dir, path) = write_log(&["1,BEGIN_COMBAT", "2,END_COMBAT", "3,BEGIN_COMBAT"]);
        let index = LineIndex::build(&path, 3).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = parse_chunks(&path, &index.chunks, 2, TokenizerOptions::default(), &cancel);
        assert!(matches!(
            result,
            Err(LoadError::Cancelled { completed: 0, total: 3 })
        ));
    }

    #[test]
    fn missing_file_fails_the_whole_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.log");
        let chunks = LineIndex::from_bytes(b"1,A\n2,B\n", 2).chunks;
        let result = parse_chunks(
            &path,
            &chunks,
            2,
            TokenizerOptions::default(),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(LoadError::ChunkFailed { .. })));
    }
}
