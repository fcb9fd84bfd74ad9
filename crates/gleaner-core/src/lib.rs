pub mod assemble;
pub mod config;
pub mod error;
pub mod extract;
pub mod models;
pub mod normalize;
pub mod schema;
pub mod service;
pub mod sink;
pub mod traits;

#[cfg(test)]
pub mod testutil;

pub use assemble::{RecordAssembler, RunState};
pub use config::ExtractionConfig;
pub use error::AppError;
pub use extract::FieldExtractor;
pub use models::{
    Cardinality, ExtractionResult, FieldFailure, FieldSpec, FieldValue, Locator, Outcome, Record,
    WaitPolicy,
};
pub use normalize::{Postprocess, normalize};
pub use schema::FieldSchema;
pub use service::{ExtractionService, RunReport};
pub use sink::JsonFileSink;
pub use traits::{Document, DocumentProvider, NullSink, RecordSink};
