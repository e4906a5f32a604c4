use thiserror::Error;

/// Row-level tokenizer failures. These never abort the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("unterminated quoted field starting at byte {0}")]
    UnterminatedQuote(usize),
    #[error("unexpected character after closing quote at byte {0}")]
    TrailingAfterQuote(usize),
    #[error("field of {size} bytes exceeds the {limit} byte limit")]
    FieldTooLarge { size: usize, limit: usize },
}

/// A single field could not be converted into its typed representation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("missing field '{0}'")]
    Missing(&'static str),
    #[error("field '{field}': invalid integer '{value}'")]
    InvalidInteger { field: &'static str, value: String },
    #[error("field '{field}': expected 'T' or 'F', got '{value}'")]
    InvalidBoolean { field: &'static str, value: String },
    #[error("field '{field}': expected 'current/max', got '{value}'")]
    InvalidResource { field: &'static str, value: String },
    #[error("field '{field}': unknown {kind} value '{value}'")]
    UnknownVariant {
        field: &'static str,
        kind: &'static str,
        value: String,
    },
    #[error("field '{field}': epoch timestamp '{value}' is out of range")]
    InvalidTimestamp { field: &'static str, value: String },
    #[error("field '{field}': unbalanced brackets")]
    UnbalancedBrackets { field: &'static str },
}

/// Reasons the event factory could not build a typed event from a row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    #[error("empty record")]
    EmptyRecord,
    #[error("missing event id")]
    MissingEventId,
    #[error("invalid event id '{0}'")]
    InvalidEventId(String),
    #[error("missing event type tag")]
    MissingTag,
    #[error("unrecognized event type '{0}'")]
    UnrecognizedType(String),
    #[error("{tag}: {source}")]
    Field {
        tag: &'static str,
        #[source]
        source: FieldError,
    },
    #[error(transparent)]
    Record(#[from] RecordError),
}

/// An event's derived time may only be assigned once.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeError {
    #[error("time of event {sequence_id} is already set")]
    AlreadySet { sequence_id: usize },
}
