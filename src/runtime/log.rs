use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use log::LevelFilter;

use crate::runtime::Error;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LogLevel(pub LevelFilter);
impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.to_lowercase().as_str() {
            "trace" => LevelFilter::Trace,
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" | "warning" => LevelFilter::Warn,
            "error" | "critical" | "crit" => LevelFilter::Error,
            "off" => LevelFilter::Off,
            _ => return Err(format!("Invalid log level: {}", s)),
        };
        Ok(LogLevel(level))
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LogMode {
    Both,
    Path,
    Terminal,
    Discard,
}
impl std::str::FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mode = match s.to_lowercase().as_str() {
            "both" => LogMode::Both,
            "path" | "file" => LogMode::Path,
            "terminal" | "term" | "cli" => LogMode::Terminal,
            "discard" | "none" => LogMode::Discard,
            _ => return Err(format!("Invalid log mode: {}", s)),
        };
        Ok(mode)
    }
}

/// Writes every log line to stderr and to a file. env_logger accepts a
/// single target, so `both` mode duplicates the stream here.
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()?;
        self.file.flush()
    }
}

fn open_log_file(log_path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
        .map_err(|e| Error::file_not_valid(log_path, Some(e.to_string())))
}

pub fn setup_global_logger(
    log_level: LogLevel,
    log_output: LogMode,
    log_path: &Path,
) -> Result<(), Error> {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(log_level.0).format_timestamp_secs();

    match log_output {
        LogMode::Discard => {
            builder.filter_level(LevelFilter::Off);
        }
        LogMode::Terminal => {
            builder.target(env_logger::Target::Stderr);
        }
        LogMode::Path => {
            let file = open_log_file(log_path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        LogMode::Both => {
            let file = open_log_file(log_path)?;
            builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
        }
    };

    // A second initialisation (e.g. from tests) keeps the first logger.
    let _ = builder.try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_log_level() {
        assert_eq!("INFO".parse::<LogLevel>(), Ok(LogLevel(LevelFilter::Info)));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel(LevelFilter::Warn)));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_parse_log_mode() {
        assert_eq!("file".parse::<LogMode>(), Ok(LogMode::Path));
        assert_eq!("cli".parse::<LogMode>(), Ok(LogMode::Terminal));
        assert!("somewhere".parse::<LogMode>().is_err());
    }
}
