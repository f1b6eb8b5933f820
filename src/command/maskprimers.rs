use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use anyhow::Result;
use clap::Args;
use log::info;

use crate::io::{self, SeqFormat, SeqReader};
use crate::pipeline::{run_pipeline, FileSink, PipelineConfig, PipelineSummary};
use crate::primer::config::{
    DEFAULT_BARCODE_FIELD, DEFAULT_MAX_ERROR, DEFAULT_MAX_LEN, DEFAULT_PRIMER_FIELD, DEFAULT_START,
};
use crate::primer::{GapPenalty, MaskConfig, MaskMode, MatcherKind, PrimerSet};

pub const OUTPUT_LABEL: &str = "primers";

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Input FASTA or FASTQ files, optionally gzipped
    #[arg(short = 's', value_parser, num_args = 1.., required = true)]
    pub path_in: Vec<PathBuf>,

    /// Output files for passing reads, one per input
    #[arg(short = 'o', value_parser, num_args = 1..)]
    pub path_out: Vec<PathBuf>,

    /// Directory for output files; defaults to the input directory
    #[arg(long = "outdir", value_parser)]
    pub out_dir: Option<PathBuf>,

    /// Output file name prefix; defaults to the input file name
    #[arg(long = "outname")]
    pub out_name: Option<String>,

    /// Per-read log file
    #[arg(long = "log", value_parser)]
    pub path_log: Option<PathBuf>,

    /// Also write reads that failed
    #[arg(long = "failed")]
    pub failed: bool,

    /// Write FASTA regardless of input format
    #[arg(long = "fasta")]
    pub fasta: bool,

    /// Number of worker threads; defaults to the number of cores
    #[arg(long = "nproc", value_parser = clap::value_parser!(usize))]
    pub nproc: Option<usize>,

    /// Capacity of the work and result queues; defaults to twice the workers
    #[arg(long = "queue-size", value_parser = clap::value_parser!(usize))]
    pub queue_size: Option<usize>,

    /// One of cut, mask, trim or tag
    #[arg(long = "mode", default_value = "mask")]
    pub mode: MaskMode,

    /// Annotate reads with the sequence preceding the primer
    #[arg(long = "barcode")]
    pub barcode: bool,

    /// Name of the barcode annotation field
    #[arg(long = "bf", default_value = DEFAULT_BARCODE_FIELD)]
    pub barcode_field: String,

    /// Name of the primer annotation field
    #[arg(long = "pf", default_value = DEFAULT_PRIMER_FIELD)]
    pub primer_field: String,
}

impl CommonArgs {
    fn mask_config(&self, matcher: MatcherKind) -> MaskConfig {
        MaskConfig {
            matcher,
            mode: self.mode,
            barcode: self.barcode,
            barcode_field: self.barcode_field.clone(),
            primer_field: self.primer_field.clone(),
            ..MaskConfig::default()
        }
    }
}

#[derive(Args)]
pub struct AlignCMD {
    #[command(flatten)]
    pub common: CommonArgs,

    /// FASTA file of primer sequences
    #[arg(short = 'p', value_parser)]
    pub path_primers: PathBuf,

    /// Maximum allowed error rate
    #[arg(long = "maxerror", default_value_t = DEFAULT_MAX_ERROR)]
    pub max_error: f64,

    /// Length of the read head (or tail) searched for primers
    #[arg(long = "maxlen", default_value_t = DEFAULT_MAX_LEN)]
    pub max_len: usize,

    /// Gap open and extend penalties
    #[arg(long = "gap", num_args = 2, value_names = ["OPEN", "EXTEND"], default_values_t = [1, 1])]
    pub gap: Vec<i32>,

    /// Primers are reverse complemented and searched at the read tail
    #[arg(long = "revpr")]
    pub rev_primer: bool,

    /// Do not search the reverse complement of reads
    #[arg(long = "skiprc")]
    pub skip_rc: bool,
}

impl AlignCMD {
    /// Run the commandline option.
    /// Local alignment of primers against the start (or end) of every read
    pub fn try_execute(&mut self) -> Result<()> {
        let (open, extend) = match self.gap.as_slice() {
            [open, extend] => (*open, *extend),
            _ => bail!("--gap takes exactly two values"),
        };
        let config = MaskConfig {
            max_error: self.max_error,
            max_len: self.max_len,
            gap_penalty: GapPenalty { open, extend },
            rev_primer: self.rev_primer,
            skip_rc: self.skip_rc,
            ..self.common.mask_config(MatcherKind::Local)
        };
        MaskPrimers::from_args(&self.common, config, Some(self.path_primers.clone()))?.run()?;
        Ok(())
    }
}

#[derive(Args)]
pub struct ScoreCMD {
    #[command(flatten)]
    pub common: CommonArgs,

    /// FASTA file of primer sequences
    #[arg(short = 'p', value_parser)]
    pub path_primers: PathBuf,

    /// Position where the primer starts
    #[arg(long = "start", default_value_t = DEFAULT_START)]
    pub start: usize,

    /// Maximum allowed error rate
    #[arg(long = "maxerror", default_value_t = DEFAULT_MAX_ERROR)]
    pub max_error: f64,

    /// Primers are reverse complemented and scored relative to the read tail
    #[arg(long = "revpr")]
    pub rev_primer: bool,
}

impl ScoreCMD {
    /// Run the commandline option.
    /// Ungapped scoring of primers at a fixed position
    pub fn try_execute(&mut self) -> Result<()> {
        let config = MaskConfig {
            start: self.start,
            max_error: self.max_error,
            rev_primer: self.rev_primer,
            ..self.common.mask_config(MatcherKind::FixedPosition)
        };
        MaskPrimers::from_args(&self.common, config, Some(self.path_primers.clone()))?.run()?;
        Ok(())
    }
}

#[derive(Args)]
pub struct ExtractCMD {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Position where the region starts
    #[arg(long = "start", default_value_t = DEFAULT_START)]
    pub start: usize,

    /// Length of the region
    #[arg(long = "len")]
    pub length: usize,

    /// Region is taken relative to the read tail
    #[arg(long = "revpr")]
    pub rev_primer: bool,
}

impl ExtractCMD {
    /// Run the commandline option.
    /// Extracts a fixed region from every read
    pub fn try_execute(&mut self) -> Result<()> {
        let config = MaskConfig {
            start: self.start,
            length: self.length,
            rev_primer: self.rev_primer,
            ..self.common.mask_config(MatcherKind::FixedRegion)
        };
        MaskPrimers::from_args(&self.common, config, None)?.run()?;
        Ok(())
    }
}

/// Output locations for one input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub pass: PathBuf,
    pub fail: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub format: SeqFormat,
}

////////////////
/// Parameters of a run over one or more input files
pub struct MaskPrimers {
    pub path_in: Vec<PathBuf>,
    pub path_out: Vec<PathBuf>,
    pub path_primers: Option<PathBuf>,
    pub out_dir: Option<PathBuf>,
    pub out_name: Option<String>,
    pub path_log: Option<PathBuf>,
    pub failed: bool,
    pub fasta: bool,
    pub config: MaskConfig,
    pub pipeline: PipelineConfig,
}

impl MaskPrimers {
    pub fn from_args(
        common: &CommonArgs,
        config: MaskConfig,
        path_primers: Option<PathBuf>,
    ) -> Result<Self> {
        Ok(MaskPrimers {
            path_in: common.path_in.clone(),
            path_out: common.path_out.clone(),
            path_primers,
            out_dir: common.out_dir.clone(),
            out_name: common.out_name.clone(),
            path_log: common.path_log.clone(),
            failed: common.failed,
            fasta: common.fasta,
            config,
            pipeline: PipelineConfig::new(common.nproc, common.queue_size),
        })
    }

    /// Process every input file in turn. Returns the pass output of each.
    pub fn run(&self) -> Result<Vec<PathBuf>> {
        if !self.path_out.is_empty() && self.path_out.len() != self.path_in.len() {
            bail!(
                "Got {} output files for {} input files",
                self.path_out.len(),
                self.path_in.len()
            );
        }
        if self.out_name.is_some() && self.path_in.len() > 1 {
            bail!("--outname can only be used with a single input file");
        }
        self.pipeline.validate()?;

        let primers = match &self.path_primers {
            Some(path) => Some(PrimerSet::from_fasta(path)?),
            None => None,
        };
        // fails early on bad settings, before any file is touched
        let matcher = Arc::new(self.config.build_matcher(primers)?);
        let config = Arc::new(self.config.clone());

        let mut outputs = Vec::with_capacity(self.path_in.len());
        for (idx, path_in) in self.path_in.iter().enumerate() {
            self.log_parameters(path_in);

            let paths = self.output_paths(idx, path_in)?;
            let reader = SeqReader::from_path(path_in)?;
            let sink = FileSink::create(
                &paths.pass,
                paths.fail.as_deref(),
                paths.log.as_deref(),
                paths.format,
            )?;

            let (summary, _) = run_pipeline(
                reader,
                Arc::clone(&matcher),
                Arc::clone(&config),
                &self.pipeline,
                sink,
            )?;
            log_summary(&paths, &summary);
            outputs.push(paths.pass);
        }
        Ok(outputs)
    }

    pub fn output_paths(&self, idx: usize, path_in: &Path) -> Result<OutputPaths> {
        let Some(in_format) = io::detect_format(path_in) else {
            bail!("Cannot determine the sequence format of {}", path_in.display());
        };
        let format = if self.fasta { SeqFormat::Fasta } else { in_format };

        let out_dir = match &self.out_dir {
            Some(dir) => dir.clone(),
            None => path_in
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        };
        let stem = match &self.out_name {
            Some(name) => name.clone(),
            None => file_stem(path_in),
        };
        let labelled = |suffix: &str| {
            out_dir.join(format!(
                "{}_{}-{}.{}",
                stem,
                OUTPUT_LABEL,
                suffix,
                format.extension()
            ))
        };

        let pass = match self.path_out.get(idx) {
            Some(path) => path.clone(),
            None => labelled("pass"),
        };
        let fail = self.failed.then(|| labelled("fail"));
        let log = self.path_log.as_ref().map(|log| {
            if self.path_in.len() == 1 {
                log.clone()
            } else {
                let name = log
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                log.with_file_name(format!("{}_{}", file_stem(path_in), name))
            }
        });

        Ok(OutputPaths {
            pass,
            fail,
            log,
            format,
        })
    }

    fn log_parameters(&self, path_in: &Path) {
        let config = &self.config;
        info!("START> MaskPrimers");
        info!("COMMAND> {}", config.matcher);
        info!("SEQ_FILE> {}", display_name(path_in));
        if let Some(path) = &self.path_primers {
            info!("PRIMER_FILE> {}", display_name(path));
        }
        info!("MODE> {}", config.mode);
        match config.matcher {
            MatcherKind::Local => {
                info!("MAX_ERROR> {}", config.max_error);
                info!("MAX_LEN> {}", config.max_len);
                info!("REV_PRIMER> {}", config.rev_primer);
                info!("SKIP_RC> {}", config.skip_rc);
                info!(
                    "GAP_PENALTY> {}, {}",
                    config.gap_penalty.open, config.gap_penalty.extend
                );
            }
            MatcherKind::FixedPosition => {
                info!("MAX_ERROR> {}", config.max_error);
                info!("START_POS> {}", config.start);
                info!("REV_PRIMER> {}", config.rev_primer);
            }
            MatcherKind::FixedRegion => {
                info!("START_POS> {}", config.start);
                info!("LENGTH> {}", config.length);
                info!("REV_PRIMER> {}", config.rev_primer);
            }
        }
        info!("BARCODE> {}", config.barcode);
        if config.barcode {
            info!("BARCODE_FIELD> {}", config.barcode_field);
        }
        info!("PRIMER_FIELD> {}", config.primer_field);
        info!("NPROC> {}", self.pipeline.worker_count);
    }
}

fn log_summary(paths: &OutputPaths, summary: &PipelineSummary) {
    info!("OUTPUT> {}", display_name(&paths.pass));
    if let Some(fail) = &paths.fail {
        info!("FAILED> {}", display_name(fail));
    }
    info!("SEQUENCES> {}", summary.total);
    info!("PASS> {}", summary.pass);
    info!("FAIL> {}", summary.fail);
    info!("END> MaskPrimers");
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// File name without a `.gz` suffix and without the sequence extension.
fn file_stem(path: &Path) -> String {
    let name = display_name(path);
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}
