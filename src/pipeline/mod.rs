pub mod manager;
pub mod result;
pub mod sink;
pub mod worker;

pub use manager::{run_pipeline, FeedItem, PipelineConfig, PipelineSummary};
pub use result::{ReadLog, WorkerResult};
pub use sink::{FileSink, MemorySink, ResultSink};
pub use worker::{process_record, process_record_with};
