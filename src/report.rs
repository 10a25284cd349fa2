//! Tab-separated TSS classification report.

use crate::commands::classify::{TssGeneMap, TssStatus};
use crate::format::{Classification, BINARY_HEADER};
use crate::interval::{Interval, PointFeature};
use log::debug;
use std::io::{self, BufWriter, Write};

/// Columns before and after the binary flags.
const LEADING_COLUMNS: [&str; 8] = [
    "TSS pos",
    "TSS strand",
    "Gene id",
    "Gene name",
    "Gene start",
    "Gene end",
    "Gene strand",
    "Gene length",
];
const TRAILING_COLUMNS: [&str; 2] = ["Status", "UTR length"];

/// Placeholder for columns without a value.
const MISSING: &[u8] = b"-";

/// Writes one row per (TSS, gene) association and one per orphan TSS.
///
/// Rows are ordered by TSS position, then by gene start. Equal keys keep
/// input order.
pub struct ReportWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    rows: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(256 * 1024, output),
            itoa_buf: itoa::Buffer::new(),
            rows: 0,
        }
    }

    fn write_header(&mut self) -> io::Result<()> {
        let header: Vec<&str> = LEADING_COLUMNS
            .iter()
            .chain(BINARY_HEADER.iter())
            .chain(TRAILING_COLUMNS.iter())
            .copied()
            .collect();
        self.writer.write_all(header.join("\t").as_bytes())?;
        self.writer.write_all(b"\n")
    }

    /// Write the header and every row of `map`.
    ///
    /// `points` and `genes` must be the slices `map` was computed from.
    pub fn write_report<P, Q>(
        &mut self,
        points: &[PointFeature<Q>],
        genes: &[Interval<P>],
        map: &TssGeneMap,
    ) -> io::Result<usize> {
        self.write_header()?;

        let mut order: Vec<usize> = (0..points.len()).collect();
        order.sort_by_key(|&i| points[i].position);

        let mut skipped = 0;
        for point_idx in order {
            let point = &points[point_idx];
            match map.get(point_idx) {
                None | Some(TssStatus::Orphan) => {
                    self.write_row(point, None::<&Interval<P>>, Classification::Orphan)?;
                }
                Some(TssStatus::Associated(hits)) => {
                    let mut hits: Vec<_> = hits.iter().collect();
                    hits.sort_by_key(|hit| genes[hit.gene].start());
                    for hit in hits {
                        let classification = Classification::Gene(&hit.association);
                        if classification.binary().is_none() {
                            skipped += 1;
                            continue;
                        }
                        self.write_row(point, Some(&genes[hit.gene]), classification)?;
                    }
                }
            }
        }

        if skipped > 0 {
            debug!("{} associations without a binary encoding not written", skipped);
        }
        self.writer.flush()?;
        Ok(self.rows)
    }

    fn write_row<P, Q>(
        &mut self,
        point: &PointFeature<Q>,
        gene: Option<&Interval<P>>,
        classification: Classification<'_>,
    ) -> io::Result<()> {
        let Some(flags) = classification.binary() else {
            return Ok(());
        };
        let w = &mut self.writer;

        w.write_all(self.itoa_buf.format(point.position).as_bytes())?;
        write!(w, "\t{}\t", point.strand)?;

        match gene {
            Some(gene) => {
                w.write_all(gene.identity.as_bytes())?;
                w.write_all(b"\t")?;
                w.write_all(gene.label.as_bytes())?;
                w.write_all(b"\t")?;
                w.write_all(self.itoa_buf.format(gene.start()).as_bytes())?;
                w.write_all(b"\t")?;
                w.write_all(self.itoa_buf.format(gene.end()).as_bytes())?;
                write!(w, "\t{}\t", gene.strand)?;
                w.write_all(self.itoa_buf.format(gene.length()).as_bytes())?;
            }
            None => {
                for i in 0..6 {
                    if i > 0 {
                        w.write_all(b"\t")?;
                    }
                    w.write_all(MISSING)?;
                }
            }
        }

        for flag in flags {
            w.write_all(b"\t")?;
            w.write_all(self.itoa_buf.format(flag).as_bytes())?;
        }

        w.write_all(b"\t")?;
        w.write_all(classification.label().as_bytes())?;
        w.write_all(b"\t")?;
        match classification {
            Classification::Gene(association) if association.is_five_prime() => {
                match association.distance {
                    Some(distance) => w.write_all(self.itoa_buf.format(distance).as_bytes())?,
                    None => w.write_all(MISSING)?,
                }
            }
            _ => w.write_all(MISSING)?,
        }
        w.write_all(b"\n")?;

        self.rows += 1;
        Ok(())
    }
}

/// Write a full report to `output`. Returns the number of rows written.
pub fn write_report<W: Write, P, Q>(
    output: W,
    points: &[PointFeature<Q>],
    genes: &[Interval<P>],
    map: &TssGeneMap,
) -> io::Result<usize> {
    ReportWriter::new(output).write_report(points, genes, map)
}
