//! Feeder, worker pool and collector connected by bounded queues.
//!
//! The feeder sends one `None` per worker after the last record. A worker
//! forwards a `None` of its own when it sees one and exits, and the collector
//! stops after it has seen a `None` from every worker. Dropped channel ends
//! stop the stages as well, so a panicking or failing stage cannot leave the
//! others blocked.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::Receiver;
use log::{debug, info, warn};

use crate::common::SeqRecord;
use crate::pipeline::{process_record_with, ResultSink, WorkerResult};
use crate::primer::{MaskConfig, MatchScratch, Matcher};
use crate::runtime::Error;

/// More consecutive unreadable records than this means the input itself is
/// unreadable.
pub const MAX_CONSECUTIVE_MALFORMED: usize = 64;

pub const PROGRESS_INTERVAL: usize = 100_000;

/// Worker pool and queue sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig::new(None, None)
    }
}

impl PipelineConfig {
    /// Unset worker count means one per available core; unset queue capacity
    /// means twice the worker count.
    pub fn new(worker_count: Option<usize>, queue_capacity: Option<usize>) -> Self {
        let worker_count = resolve_worker_count(worker_count);
        PipelineConfig {
            worker_count,
            queue_capacity: queue_capacity.unwrap_or(2 * worker_count),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.worker_count == 0 {
            return Err(Error::invalid_config("worker_count", Some("must be positive")));
        }
        if self.queue_capacity == 0 {
            return Err(Error::invalid_config("queue_capacity", Some("must be positive")));
        }
        Ok(())
    }
}

fn resolve_worker_count(requested: Option<usize>) -> usize {
    if let Some(n) = requested {
        return n;
    }
    match std::thread::available_parallelism() {
        Ok(n) => n.get(),
        Err(_) => {
            warn!("Could not autodetect the number of threads available, using 1");
            1
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
}

/// Unit of work for a worker: a read with its input position, or the reason
/// the record at that position could not be read.
#[derive(Debug)]
pub enum FeedItem {
    Record(usize, SeqRecord),
    Malformed(usize, String),
}

struct CollectorOutcome<S> {
    summary: PipelineSummary,
    sink: S,
    error: Option<Error>,
}

/// Run every record of `input` through `matcher` and the masking transform,
/// handing results to `sink` in completion order.
///
/// On success the sink is returned with the final counts. A fatal failure
/// (unreadable input, sink error, panicked thread) stops all stages and is
/// reported as an error carrying the counts collected so far. Results
/// already handed to the sink stay there.
pub fn run_pipeline<I, S>(
    input: I,
    matcher: Arc<Matcher>,
    config: Arc<MaskConfig>,
    params: &PipelineConfig,
    sink: S,
) -> Result<(PipelineSummary, S), Error>
where
    I: IntoIterator<Item = Result<SeqRecord, String>>,
    I::IntoIter: Send + 'static,
    S: ResultSink + Send + 'static,
{
    params.validate()?;
    info!(
        "Starting pipeline with {} workers (queue capacity {})",
        params.worker_count, params.queue_capacity
    );

    let halt = Arc::new(AtomicBool::new(false));
    let (work_rx, feeder_handle) = spawn_feeder(
        input.into_iter(),
        params.worker_count,
        params.queue_capacity,
        Arc::clone(&halt),
    );
    let (result_rx, worker_handles) = spawn_workers(
        work_rx,
        matcher,
        config,
        params.worker_count,
        params.queue_capacity,
        Arc::clone(&halt),
    );
    let collector_handle = spawn_collector(result_rx, params.worker_count, sink, Arc::clone(&halt));

    let feeder_result = feeder_handle.join();
    let n_panicked = worker_handles
        .into_iter()
        .map(|h| h.join())
        .filter(|r| r.is_err())
        .count();
    let outcome = collector_handle
        .join()
        .map_err(|_| Error::thread_panicked("collector"))?;

    let summary = outcome.summary;
    info!(
        "Processed {} reads: {} pass, {} fail",
        summary.total, summary.pass, summary.fail
    );

    match feeder_result {
        Err(_) => return Err(Error::thread_panicked("feeder")),
        Ok(Err(reason)) => return Err(Error::pipeline_halted(summary, reason)),
        Ok(Ok(n_fed)) => debug!("Feeder finished after {} records", n_fed),
    }
    if n_panicked > 0 {
        return Err(Error::thread_panicked("worker"));
    }
    if let Some(e) = outcome.error {
        return Err(Error::pipeline_halted(summary, e.to_string()));
    }
    Ok((summary, outcome.sink))
}

fn spawn_feeder<I>(
    input: I,
    worker_count: usize,
    queue_capacity: usize,
    halt: Arc<AtomicBool>,
) -> (Receiver<Option<FeedItem>>, JoinHandle<Result<usize, String>>)
where
    I: Iterator<Item = Result<SeqRecord, String>> + Send + 'static,
{
    let (tx, rx) = crossbeam::channel::bounded::<Option<FeedItem>>(queue_capacity);

    let handle = std::thread::spawn(move || {
        let mut n_fed = 0;
        let mut n_malformed_in_row = 0;
        let mut outcome = Ok(());

        for (index, item) in input.enumerate() {
            if halt.load(Ordering::Relaxed) {
                debug!("Feeder stopping early");
                break;
            }

            let item = match item {
                Ok(record) => {
                    n_malformed_in_row = 0;
                    FeedItem::Record(index, record)
                }
                Err(reason) => {
                    warn!("Malformed input record {}: {}", index, reason);
                    n_malformed_in_row += 1;
                    if n_malformed_in_row > MAX_CONSECUTIVE_MALFORMED {
                        halt.store(true, Ordering::Relaxed);
                        outcome = Err(format!(
                            "input stream unreadable ({} consecutive malformed records, last: {})",
                            n_malformed_in_row, reason
                        ));
                        break;
                    }
                    FeedItem::Malformed(index, reason)
                }
            };

            // blocks while the queue is full
            if tx.send(Some(item)).is_err() {
                break;
            }
            n_fed += 1;
        }

        for _ in 0..worker_count {
            let _ = tx.send(None);
        }
        outcome.map(|_| n_fed)
    });

    (rx, handle)
}

fn spawn_workers(
    rx: Receiver<Option<FeedItem>>,
    matcher: Arc<Matcher>,
    config: Arc<MaskConfig>,
    worker_count: usize,
    queue_capacity: usize,
    halt: Arc<AtomicBool>,
) -> (Receiver<Option<WorkerResult>>, Vec<JoinHandle<()>>) {
    let (tx, result_rx) = crossbeam::channel::bounded::<Option<WorkerResult>>(queue_capacity);
    let mut thread_handles = Vec::with_capacity(worker_count);

    for tidx in 0..worker_count {
        let rx = rx.clone();
        let tx = tx.clone();
        let matcher = Arc::clone(&matcher);
        let config = Arc::clone(&config);
        let halt = Arc::clone(&halt);

        debug!("Starting worker thread {}", tidx);
        let thread_handle = std::thread::spawn(move || {
            let mut scratch = MatchScratch::new();
            while let Ok(Some(item)) = rx.recv() {
                // keep draining so the feeder never blocks, but do no more work
                if halt.load(Ordering::Relaxed) {
                    continue;
                }
                let result = match item {
                    FeedItem::Record(index, record) => {
                        process_record_with(index, record, &matcher, &config, &mut scratch)
                    }
                    FeedItem::Malformed(index, reason) => WorkerResult::malformed(index, &reason),
                };
                if tx.send(Some(result)).is_err() {
                    break;
                }
            }
            let _ = tx.send(None);
        });
        thread_handles.push(thread_handle);
    }

    drop(tx);
    (result_rx, thread_handles)
}

fn spawn_collector<S>(
    rx: Receiver<Option<WorkerResult>>,
    worker_count: usize,
    mut sink: S,
    halt: Arc<AtomicBool>,
) -> JoinHandle<CollectorOutcome<S>>
where
    S: ResultSink + Send + 'static,
{
    std::thread::spawn(move || {
        let mut summary = PipelineSummary::default();
        let mut error = None;
        let mut n_done = 0;

        loop {
            match rx.recv() {
                Ok(Some(result)) => {
                    let valid = result.valid;
                    if let Err(e) = sink.accept(result) {
                        halt.store(true, Ordering::Relaxed);
                        error = Some(e);
                        break;
                    }
                    summary.total += 1;
                    if valid {
                        summary.pass += 1;
                    } else {
                        summary.fail += 1;
                    }
                    if summary.total % PROGRESS_INTERVAL == 0 {
                        info!(
                            "{} reads collected ({} pass, {} fail)",
                            summary.total, summary.pass, summary.fail
                        );
                    }
                }
                Ok(None) => {
                    n_done += 1;
                    if n_done == worker_count {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
        drop(rx);

        if let Err(e) = sink.finish() {
            error.get_or_insert(e);
        }
        CollectorOutcome {
            summary,
            sink,
            error,
        }
    })
}
