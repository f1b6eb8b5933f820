use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::io::create_text_writer;
use crate::pipeline::ReadLog;
use crate::runtime::Error;

/// Per-read log file: one `KEY> value` block per read, blocks separated by
/// an empty line.
pub struct AuditWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AuditWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let writer = create_text_writer(&path)?;
        Ok(AuditWriter { path, writer })
    }

    pub fn write(&mut self, log: &ReadLog) -> Result<(), Error> {
        writeln!(self.writer, "{}", log).map_err(|e| self.write_error(e))
    }

    pub fn flush(&mut self) -> Result<(), Error> {
        self.writer.flush().map_err(|e| self.write_error(e))
    }

    fn write_error(&self, e: std::io::Error) -> Error {
        Error::file_not_valid(&self.path, Some(e.to_string()))
    }
}
