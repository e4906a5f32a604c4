pub mod combat_log;
pub mod context;
pub mod diagnostics;
pub mod encounter;
pub mod loading;
pub mod log;
pub mod resolve;
pub mod state;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use combat_log::{Event, EventKind, EventType, SequenceId};
pub use context::{ConfigError, LoaderConfig};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use encounter::{CombatEncounter, segment};
pub use loading::{CancellationToken, LoadError, LoadOptions, LoadedFile, LogLoader};
pub use log::{EncounterLog, EventSpan, LogError};
pub use resolve::{ResolutionReport, ResolveError, resolve};
pub use state::ParseWorkerOutput;
