pub mod ipc;

pub use ipc::{LogSummary, ParseWorkerOutput, RejectedLogSummary, WorkerPlayerInfo};
