//! FASTA/FASTQ input and output, optionally gzip compressed.
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use bio::io::{fasta, fastq};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use itertools::Itertools;

use crate::common::{dna, Annotations, SeqRecord};
use crate::runtime::Error;

const GZ_BUF_SIZE: usize = 1 << 22;

/// Field separator in annotated read names: `ID|KEY=value|KEY=value`.
pub const FIELD_DELIMITER: char = '|';
pub const VALUE_DELIMITER: char = '=';

/// Quality written for bases that carry none when FASTQ output is requested.
const DEFAULT_QUAL: u8 = b'I';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeqFormat {
    Fasta,
    Fastq,
}

impl SeqFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SeqFormat::Fasta => "fasta",
            SeqFormat::Fastq => "fastq",
        }
    }
}

pub fn is_gzipped<P: AsRef<Path>>(p: P) -> bool {
    p.as_ref()
        .extension()
        .is_some_and(|ext| ext == "gz")
}

/// Sequence format from the file name, ignoring a trailing `.gz`.
pub fn detect_format<P: AsRef<Path>>(p: P) -> Option<SeqFormat> {
    let name = p.as_ref().file_name()?.to_string_lossy().to_lowercase();
    let name = name.strip_suffix(".gz").unwrap_or(&name);

    if name.ends_with(".fastq") || name.ends_with(".fq") {
        Some(SeqFormat::Fastq)
    } else if name.ends_with(".fasta")
        || name.ends_with(".fa")
        || name.ends_with(".fna")
        || name.ends_with(".fas")
    {
        Some(SeqFormat::Fasta)
    } else {
        None
    }
}

/// Open a (possibly gzipped) file into a BufReader.
pub fn open_with_gz<P: AsRef<Path>>(p: P) -> Result<Box<dyn BufRead + Send>, Error> {
    let path = p.as_ref();
    let r = File::open(path).map_err(|_| Error::file_not_found(path))?;

    if is_gzipped(path) {
        let gz = MultiGzDecoder::new(r);
        Ok(Box::new(BufReader::with_capacity(GZ_BUF_SIZE, gz)))
    } else {
        Ok(Box::new(BufReader::with_capacity(32 * 1024, r)))
    }
}

/// Split an annotated read name into the bare id and its annotations. Names
/// that are not entirely `KEY=value` fields after the id are kept whole.
pub fn parse_header(name: &str) -> (String, Annotations) {
    let mut parts = name.split(FIELD_DELIMITER);
    let id = parts.next().unwrap_or_default();

    let mut annotations = Annotations::new();
    for field in parts {
        match field.split_once(VALUE_DELIMITER) {
            Some((key, value)) if !key.is_empty() => annotations.insert(key, value),
            _ => return (name.to_string(), Annotations::new()),
        }
    }
    (id.to_string(), annotations)
}

/// Inverse of [`parse_header`].
pub fn flatten_header(record: &SeqRecord) -> String {
    std::iter::once(record.id.clone())
        .chain(
            record
                .annotations
                .iter()
                .map(|(key, value)| format!("{}{}{}", key, VALUE_DELIMITER, value)),
        )
        .join(&FIELD_DELIMITER.to_string())
}

fn to_record(
    name: &str,
    desc: Option<&str>,
    seq: &[u8],
    qual: Option<&[u8]>,
) -> Result<SeqRecord, String> {
    if let Some((pos, c)) = dna::find_invalid_base(seq) {
        return Err(format!(
            "invalid character '{}' at position {}",
            c as char, pos
        ));
    }
    let (id, annotations) = parse_header(name);
    Ok(SeqRecord {
        id,
        desc: desc.map(|d| d.to_string()),
        seq: seq.to_ascii_uppercase(),
        qual: qual.map(|q| q.to_vec()),
        annotations,
    })
}

enum Records {
    Fasta(fasta::Records<BufReader<Box<dyn BufRead + Send>>>),
    Fastq(fastq::Records<BufReader<Box<dyn BufRead + Send>>>),
}

/// Streams records from a FASTA or FASTQ file. An `Err` item is a single
/// unreadable record; iteration may continue past it.
pub struct SeqReader {
    records: Records,
}

impl SeqReader {
    pub fn from_path<P: AsRef<Path>>(p: P) -> Result<Self, Error> {
        let path = p.as_ref();
        let format = detect_format(path).ok_or_else(|| {
            Error::file_not_valid(path, Some("expected a .fasta or .fastq file"))
        })?;
        let reader = open_with_gz(path)?;
        Ok(Self::new(reader, format))
    }

    pub fn new(reader: Box<dyn BufRead + Send>, format: SeqFormat) -> Self {
        let records = match format {
            SeqFormat::Fasta => Records::Fasta(fasta::Reader::new(reader).records()),
            SeqFormat::Fastq => Records::Fastq(fastq::Reader::new(reader).records()),
        };
        SeqReader { records }
    }
}

impl Iterator for SeqReader {
    type Item = Result<SeqRecord, String>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = match &mut self.records {
            Records::Fasta(records) => match records.next()? {
                Ok(rec) => rec
                    .check()
                    .map_err(|e| e.to_string())
                    .and_then(|_| to_record(rec.id(), rec.desc(), rec.seq(), None)),
                Err(e) => Err(e.to_string()),
            },
            Records::Fastq(records) => match records.next()? {
                Ok(rec) => rec
                    .check()
                    .map_err(|e| e.to_string())
                    .and_then(|_| to_record(rec.id(), rec.desc(), rec.seq(), Some(rec.qual()))),
                Err(e) => Err(e.to_string()),
            },
        };
        Some(item)
    }
}

/// Byte stream under a [`SeqWriter`]. A gzip stream needs its trailer
/// written before the file is complete, which dropping does not report.
enum OutputStream {
    Plain(BufWriter<Box<dyn Write + Send>>),
    Gz(GzEncoder<BufWriter<File>>),
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            OutputStream::Plain(w) => w.write(buf),
            OutputStream::Gz(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            OutputStream::Plain(w) => w.flush(),
            OutputStream::Gz(w) => w.flush(),
        }
    }
}

/// Writes records with their annotations flattened into the read name.
/// Call [`SeqWriter::finish`] once all records are written.
pub struct SeqWriter {
    stream: OutputStream,
    format: SeqFormat,
}

impl SeqWriter {
    pub fn create<P: AsRef<Path>>(p: P, format: SeqFormat) -> Result<Self, Error> {
        let path = p.as_ref();
        let file =
            File::create(path).map_err(|e| Error::file_not_valid(path, Some(e.to_string())))?;

        if is_gzipped(path) {
            let gz = GzEncoder::new(BufWriter::new(file), Compression::default());
            Ok(SeqWriter {
                stream: OutputStream::Gz(gz),
                format,
            })
        } else {
            Ok(Self::new(Box::new(file), format))
        }
    }

    pub fn new(sink: Box<dyn Write + Send>, format: SeqFormat) -> Self {
        SeqWriter {
            stream: OutputStream::Plain(BufWriter::new(sink)),
            format,
        }
    }

    pub fn write(&mut self, record: &SeqRecord) -> std::io::Result<()> {
        let name = flatten_header(record);
        let desc = record.desc.as_deref();
        // bio formats records as text
        let ascii = record.seq.is_ascii() && record.qual.as_ref().map_or(true, |q| q.is_ascii());
        if !ascii {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("record {} is not ASCII", record.id),
            ));
        }

        match self.format {
            SeqFormat::Fasta => write!(
                self.stream,
                "{}",
                fasta::Record::with_attrs(&name, desc, &record.seq)
            ),
            SeqFormat::Fastq => {
                let default_qual;
                let qual = match &record.qual {
                    Some(qual) => qual.as_slice(),
                    None => {
                        default_qual = vec![DEFAULT_QUAL; record.len()];
                        default_qual.as_slice()
                    }
                };
                write!(
                    self.stream,
                    "{}",
                    fastq::Record::with_attrs(&name, desc, &record.seq, qual)
                )
            }
        }
    }

    /// Flush everything and, for gzip output, write the trailer. The file is
    /// complete once this returns; records written afterwards are an error
    /// for gzip output.
    pub fn finish(&mut self) -> std::io::Result<()> {
        match &mut self.stream {
            OutputStream::Plain(w) => w.flush(),
            OutputStream::Gz(w) => {
                w.try_finish()?;
                w.get_mut().flush()
            }
        }
    }
}

/// Buffered writer for plain text side outputs.
pub fn create_text_writer<P: AsRef<Path>>(p: P) -> Result<BufWriter<File>, Error> {
    let path = p.as_ref();
    File::create(path)
        .map(BufWriter::new)
        .map_err(|e| Error::file_not_valid(path, Some(e.to_string())))
}
