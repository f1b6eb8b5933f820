use std::path::{Path, PathBuf};

use crate::common::SeqRecord;
use crate::io::{AuditWriter, SeqFormat, SeqWriter};
use crate::pipeline::{ReadLog, WorkerResult};
use crate::runtime::Error;

/// Destination of collected results. Only the collector thread touches a
/// sink, so implementations need no locking.
pub trait ResultSink {
    fn accept(&mut self, result: WorkerResult) -> Result<(), Error>;

    fn finish(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

/// Keeps everything in memory, in collection order.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub pass: Vec<SeqRecord>,
    pub fail: Vec<SeqRecord>,
    pub logs: Vec<(usize, ReadLog)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultSink for MemorySink {
    fn accept(&mut self, result: WorkerResult) -> Result<(), Error> {
        self.logs.push((result.index, result.log));
        if result.valid {
            if let Some(masked) = result.masked {
                self.pass.push(masked);
            }
        } else if let Some(original) = result.original {
            self.fail.push(original);
        }
        Ok(())
    }
}

struct OutputFile {
    path: PathBuf,
    writer: SeqWriter,
}

impl OutputFile {
    fn create(path: &Path, format: SeqFormat) -> Result<Self, Error> {
        Ok(OutputFile {
            path: path.to_path_buf(),
            writer: SeqWriter::create(path, format)?,
        })
    }

    fn write(&mut self, record: &SeqRecord) -> Result<(), Error> {
        self.writer
            .write(record)
            .map_err(|e| Error::file_not_valid(&self.path, Some(e.to_string())))
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.writer
            .finish()
            .map_err(|e| Error::file_not_valid(&self.path, Some(e.to_string())))
    }
}

/// Writes the pass stream, and optionally the fail stream and the per-read
/// log, to files.
pub struct FileSink {
    pass: OutputFile,
    fail: Option<OutputFile>,
    log: Option<AuditWriter>,
}

impl FileSink {
    pub fn create(
        pass_path: &Path,
        fail_path: Option<&Path>,
        log_path: Option<&Path>,
        format: SeqFormat,
    ) -> Result<Self, Error> {
        Ok(FileSink {
            pass: OutputFile::create(pass_path, format)?,
            fail: fail_path
                .map(|p| OutputFile::create(p, format))
                .transpose()?,
            log: log_path.map(AuditWriter::create).transpose()?,
        })
    }

    pub fn pass_path(&self) -> &Path {
        &self.pass.path
    }

    pub fn fail_path(&self) -> Option<&Path> {
        self.fail.as_ref().map(|f| f.path.as_path())
    }
}

impl ResultSink for FileSink {
    fn accept(&mut self, result: WorkerResult) -> Result<(), Error> {
        if let Some(log) = &mut self.log {
            log.write(&result.log)?;
        }

        if result.valid {
            if let Some(masked) = &result.masked {
                self.pass.write(masked)?;
            }
        } else if let (Some(fail), Some(original)) = (&mut self.fail, &result.original) {
            fail.write(original)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Error> {
        self.pass.finish()?;
        if let Some(fail) = &mut self.fail {
            fail.finish()?;
        }
        if let Some(log) = &mut self.log {
            log.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Read;

    fn gunzip(path: &Path) -> String {
        let bytes = std::fs::read(path).unwrap();
        let mut text = String::new();
        flate2::read::GzDecoder::new(bytes.as_slice())
            .read_to_string(&mut text)
            .unwrap();
        text
    }

    #[test]
    fn test_finish_completes_gz_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let pass_path = dir.path().join("pass.fasta.gz");
        let fail_path = dir.path().join("fail.fasta.gz");
        let mut sink =
            FileSink::create(&pass_path, Some(&fail_path), None, SeqFormat::Fasta).unwrap();

        let read = SeqRecord::new("r1", b"ACGT");
        sink.accept(WorkerResult {
            index: 0,
            id: read.id.clone(),
            original: Some(read.clone()),
            masked: Some(read.clone()),
            valid: true,
            log: ReadLog::new(),
        })
        .unwrap();
        sink.accept(WorkerResult::failed(1, SeqRecord::new("r2", b"TTTT"), ReadLog::new()))
            .unwrap();
        sink.finish().unwrap();

        // both streams decode in full before the sink is dropped
        assert_eq!(gunzip(&pass_path), ">r1\nACGT\n");
        assert_eq!(gunzip(&fail_path), ">r2\nTTTT\n");
        assert_eq!(sink.pass_path(), pass_path.as_path());
    }
}
