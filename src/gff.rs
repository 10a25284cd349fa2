//! GFF3 gene annotation reader and writer.
//!
//! Only the columns needed to build gene intervals are interpreted; the rest
//! travel along as a [`GffRecord`] payload so unchanged genes can be written
//! back as they came in.

use crate::genome::Genome;
use crate::interval::{Interval, Position, Strand};
use log::{debug, warn};
use memchr::memchr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during GFF parsing.
#[derive(Error, Debug)]
pub enum GffError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type Result<T> = std::result::Result<T, GffError>;

/// Columns of a GFF line that are not part of the interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GffRecord {
    pub source: String,
    pub feature: String,
    pub score: String,
    pub phase: String,
    /// Raw attribute column, `key=value` pairs separated by `;`.
    pub attributes: String,
}

impl GffRecord {
    /// Look up an attribute value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        attribute(&self.attributes, key)
    }
}

/// Find `key` in a `key=value;key=value` attribute column.
pub fn attribute<'a>(attributes: &'a str, key: &str) -> Option<&'a str> {
    attributes.split(';').find_map(|pair| {
        let pair = pair.trim();
        let eq = memchr(b'=', pair.as_bytes())?;
        (&pair[..eq] == key).then(|| &pair[eq + 1..])
    })
}

/// One parsed GFF line.
#[derive(Debug, Clone, PartialEq)]
pub struct GffEntry {
    pub seq_id: String,
    pub start: Position,
    pub end: Position,
    /// `None` for `.` and `?`
    pub strand: Option<Strand>,
    pub record: GffRecord,
}

/// Which entries become gene intervals and where their names come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffFilter {
    pub feature: String,
    pub id_attribute: String,
    pub name_attribute: String,
}

impl Default for GffFilter {
    fn default() -> Self {
        Self {
            feature: "gene".to_string(),
            id_attribute: "locus_tag".to_string(),
            name_attribute: "Name".to_string(),
        }
    }
}

/// A streaming GFF3 reader.
///
/// Malformed lines are reported and skipped; only I/O errors end reading.
pub struct GffReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
    skipped: usize,
    sequence_regions: Genome,
    in_fasta: bool,
}

impl GffReader<File> {
    /// Open a GFF file from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> GffReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
            skipped: 0,
            sequence_regions: Genome::new(),
            in_fasta: false,
        }
    }

    /// Read the next well-formed entry.
    pub fn read_entry(&mut self) -> Result<Option<GffEntry>> {
        loop {
            if self.in_fasta {
                return Ok(None);
            }
            self.buffer.clear();
            let bytes_read = self.reader.read_line(&mut self.buffer)?;
            if bytes_read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }
            if let Some(pragma) = line.strip_prefix("##") {
                let pragma = pragma.to_owned();
                self.handle_pragma(&pragma);
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            match self.parse_line(line) {
                Ok(entry) => return Ok(Some(entry)),
                Err(e) => {
                    warn!("Skipping GFF line: {}", e);
                    self.skipped += 1;
                }
            }
        }
    }

    fn handle_pragma(&mut self, pragma: &str) {
        if pragma.starts_with("FASTA") {
            self.in_fasta = true;
            return;
        }
        let mut fields = pragma.split_whitespace();
        if fields.next() != Some("sequence-region") {
            return;
        }
        let seq_id = fields.next();
        let end = fields.nth(1).and_then(|s| s.parse::<u64>().ok());
        match (seq_id, end) {
            (Some(seq_id), Some(end)) => self.sequence_regions.insert(seq_id.to_string(), end),
            _ => warn!(
                "Ignoring malformed sequence-region pragma at line {}",
                self.line_number
            ),
        }
    }

    /// Parse a single GFF line.
    fn parse_line(&self, line: &str) -> Result<GffEntry> {
        let fields: Vec<&str> = line.split('\t').collect();

        if fields.len() < 9 {
            return Err(GffError::Parse {
                line: self.line_number,
                message: format!("Expected 9 fields, got {}", fields.len()),
            });
        }

        let start = self.parse_position(fields[3], "start")?;
        let end = self.parse_position(fields[4], "end")?;
        let strand = match fields[6] {
            "." | "?" => None,
            s => Some(Strand::parse(s).ok_or_else(|| GffError::Parse {
                line: self.line_number,
                message: format!("Invalid strand: '{}'", s),
            })?),
        };

        Ok(GffEntry {
            seq_id: fields[0].to_string(),
            start,
            end,
            strand,
            record: GffRecord {
                source: fields[1].to_string(),
                feature: fields[2].to_string(),
                score: fields[5].to_string(),
                phase: fields[7].to_string(),
                attributes: fields[8].to_string(),
            },
        })
    }

    fn parse_position(&self, s: &str, field_name: &str) -> Result<Position> {
        s.trim().parse().map_err(|_| GffError::Parse {
            line: self.line_number,
            message: format!("Invalid {} position: '{}'", field_name, s),
        })
    }

    /// Number of malformed lines skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Sequence lengths declared by `##sequence-region` pragmas so far.
    pub fn sequence_regions(&self) -> &Genome {
        &self.sequence_regions
    }

    /// Get an iterator over all entries.
    pub fn entries(self) -> GffEntryIter<R> {
        GffEntryIter { reader: self }
    }
}

/// Iterator over GFF entries.
pub struct GffEntryIter<R: Read> {
    reader: GffReader<R>,
}

impl<R: Read> Iterator for GffEntryIter<R> {
    type Item = Result<GffEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_entry().transpose()
    }
}

/// Genes read from a GFF file, with the sequence lengths it declares.
#[derive(Debug, Clone, Default)]
pub struct GeneAnnotation {
    pub genes: Vec<Interval<GffRecord>>,
    pub genome: Genome,
    pub skipped: usize,
}

/// Collect gene intervals from a GFF source.
///
/// Sequence lengths come from `##sequence-region` pragmas and `region`
/// features. Selected entries without a strand are skipped.
pub fn read_genes_from<R: Read>(reader: R, filter: &GffFilter) -> Result<GeneAnnotation> {
    let mut reader = GffReader::new(reader);
    let mut annotation = GeneAnnotation::default();

    while let Some(entry) = reader.read_entry()? {
        if entry.record.feature == "region" {
            annotation
                .genome
                .insert(entry.seq_id.clone(), entry.end.max(0) as u64);
        }
        if entry.record.feature != filter.feature {
            continue;
        }
        let Some(strand) = entry.strand else {
            warn!(
                "Skipping unstranded {} {}:{}-{}",
                entry.record.feature, entry.seq_id, entry.start, entry.end
            );
            annotation.skipped += 1;
            continue;
        };

        let identity = entry.record.attribute(&filter.id_attribute).unwrap_or("");
        let label = entry.record.attribute(&filter.name_attribute).unwrap_or("");
        let gene = Interval::new(entry.seq_id, identity, label, entry.start, entry.end, strand)
            .with_payload(entry.record);
        annotation.genes.push(gene);
    }

    annotation.genome.fill_missing(reader.sequence_regions());
    annotation.skipped += reader.skipped();

    debug!(
        "Read {} {} features, {} lines skipped",
        annotation.genes.len(),
        filter.feature,
        annotation.skipped
    );
    Ok(annotation)
}

/// Collect gene intervals from a GFF file.
pub fn read_genes<P: AsRef<Path>>(path: P, filter: &GffFilter) -> Result<GeneAnnotation> {
    let file = File::open(path)?;
    read_genes_from(file, filter)
}

/// GFF3 writer with zero-allocation integer formatting.
pub struct GffWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
}

impl<W: Write> GffWriter<W> {
    /// Create a writer and emit the version header.
    pub fn new(output: W) -> Result<Self> {
        let mut writer = Self {
            writer: BufWriter::with_capacity(256 * 1024, output),
            itoa_buf: itoa::Buffer::new(),
        };
        writer.writer.write_all(b"##gff-version 3\n")?;
        Ok(writer)
    }

    /// Write one feature line.
    pub fn write_feature(
        &mut self,
        seq_id: &str,
        record: &GffRecord,
        start: Position,
        end: Position,
        strand: Option<Strand>,
    ) -> Result<()> {
        let strand = strand.map(Strand::as_char).unwrap_or('.');
        let w = &mut self.writer;
        w.write_all(seq_id.as_bytes())?;
        w.write_all(b"\t")?;
        w.write_all(record.source.as_bytes())?;
        w.write_all(b"\t")?;
        w.write_all(record.feature.as_bytes())?;
        w.write_all(b"\t")?;
        w.write_all(self.itoa_buf.format(start).as_bytes())?;
        w.write_all(b"\t")?;
        w.write_all(self.itoa_buf.format(end).as_bytes())?;
        writeln!(w, "\t{}\t{}\t{}\t{}", record.score, strand, record.phase, record.attributes)?;
        Ok(())
    }

    /// Write a gene interval.
    ///
    /// Intervals without a GFF payload (fused genes) are written with source
    /// `merged`, feature type `feature` and their identity and label as
    /// `ID`/`Name` attributes.
    pub fn write_interval(&mut self, interval: &Interval<GffRecord>, feature: &str) -> Result<()> {
        match &interval.payload {
            Some(record) => self.write_feature(
                &interval.sequence_id,
                record,
                interval.start(),
                interval.end(),
                Some(interval.strand),
            ),
            None => {
                let record = GffRecord {
                    source: "merged".to_string(),
                    feature: feature.to_string(),
                    score: ".".to_string(),
                    phase: ".".to_string(),
                    attributes: format!("ID={};Name={}", interval.identity, interval.label),
                };
                self.write_feature(
                    &interval.sequence_id,
                    &record,
                    interval.start(),
                    interval.end(),
                    Some(interval.strand),
                )
            }
        }
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
