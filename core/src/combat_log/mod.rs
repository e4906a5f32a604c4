pub mod enums;
pub mod error;
pub mod event;
pub mod factory;
pub mod fields;
pub mod tokenizer;


pub use enums::*;
pub use error::{FactoryError, FieldError, RecordError, TimeError};
pub use event::*;
pub use factory::{create, event_from_record, event_type_for_tag};
pub use fields::Resource;
pub use tokenizer::{Fields, RawRecord, RecordReader, TokenizerOptions, split_record};
