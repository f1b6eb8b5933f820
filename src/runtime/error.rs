use thiserror::Error;

use crate::pipeline::PipelineSummary;

#[derive(Error, Debug)]
pub enum Error {
    #[error("File at {:?} not found.", path)]
    FileNotFound { path: std::path::PathBuf },

    #[error("File at {:?} is invalid{}.", path, Error::format_msg_as_detail(msg))]
    FileNotValid {
        path: std::path::PathBuf,
        msg: Option<String>,
    },

    #[error("Failed parsing {}{}", context, Error::format_msg_as_detail(msg))]
    ParseError {
        context: String,
        msg: Option<String>,
    },

    #[error("Invalid configuration for '{}'{}", param, Error::format_msg_as_detail(msg))]
    InvalidConfig { param: String, msg: Option<String> },

    #[error("Pipeline halted after {} reads ({} pass, {} fail): {}", summary.total, summary.pass, summary.fail, reason)]
    PipelineHalted {
        summary: PipelineSummary,
        reason: String,
    },

    #[error("Pipeline {} thread panicked", role)]
    ThreadPanicked { role: String },
}

impl Error {
    #[cold]
    pub fn file_not_found<P: AsRef<std::path::Path>>(path: P) -> Self {
        Error::FileNotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[cold]
    pub fn file_not_valid<P: AsRef<std::path::Path>, M: Into<String>>(
        path: P,
        msg: Option<M>,
    ) -> Self {
        Error::FileNotValid {
            path: path.as_ref().to_path_buf(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn parse_error<C: Into<String>, M: Into<String>>(context: C, msg: Option<M>) -> Self {
        Error::ParseError {
            context: context.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn invalid_config<P: Into<String>, M: Into<String>>(param: P, msg: Option<M>) -> Self {
        Error::InvalidConfig {
            param: param.into(),
            msg: msg.map(|m| m.into()),
        }
    }

    #[cold]
    pub fn pipeline_halted<R: Into<String>>(summary: PipelineSummary, reason: R) -> Self {
        Error::PipelineHalted {
            summary,
            reason: reason.into(),
        }
    }

    #[cold]
    pub fn thread_panicked<R: Into<String>>(role: R) -> Self {
        Error::ThreadPanicked { role: role.into() }
    }

    pub fn format_msg_as_detail(msg: &Option<String>) -> String {
        match msg {
            Some(m) => format!(" ({})", m),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_detail() {
        let err = Error::invalid_config("max_error", Some("must be within [0, 1]"));
        assert_eq!(
            err.to_string(),
            "Invalid configuration for 'max_error' (must be within [0, 1])"
        );

        let err = Error::parse_error("primer file", None::<String>);
        assert_eq!(err.to_string(), "Failed parsing primer file");
    }

    #[test]
    fn test_halted_reports_partial_counts() {
        let summary = PipelineSummary {
            total: 10,
            pass: 7,
            fail: 3,
        };
        let err = Error::pipeline_halted(summary, "input stream unreadable");
        assert_eq!(
            err.to_string(),
            "Pipeline halted after 10 reads (7 pass, 3 fail): input stream unreadable"
        );
    }
}
