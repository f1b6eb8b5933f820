pub mod command;
pub mod common;
pub mod io;
pub mod pipeline;
pub mod primer;
pub mod runtime;

pub use common::SeqRecord;
pub use pipeline::{run_pipeline, PipelineConfig, PipelineSummary};
pub use primer::{MaskConfig, Matcher, PrimerMatcher, PrimerSet};
