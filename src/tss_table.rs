//! TSS table reader.
//!
//! Tab-separated rows `position<TAB>strand[<TAB>sequence_id]`. Header lines,
//! comments and malformed rows are skipped with a warning. Rows without a
//! sequence id are compared against genes on every sequence.

use crate::interval::{PointFeature, Position, Strand};
use log::{debug, warn};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// TSS read from a table, with the number of rows that were dropped.
#[derive(Debug, Clone, Default)]
pub struct TssTable {
    pub points: Vec<PointFeature>,
    pub skipped: usize,
}

fn parse_row(line: &str) -> Option<PointFeature> {
    let mut fields = line.split('\t');
    let position: Position = fields.next()?.trim().parse().ok()?;
    let strand = Strand::parse(fields.next()?.trim())?;
    let sequence_id = fields.next().map(str::trim).unwrap_or("");
    Some(PointFeature::new(sequence_id, position, strand))
}

/// Read a TSS table from any reader.
pub fn read_tss_from<R: Read>(reader: R) -> io::Result<TssTable> {
    let reader = BufReader::new(reader);
    let mut table = TssTable::default();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_row(line) {
            Some(point) => table.points.push(point),
            None => {
                // A non-numeric first row is a header, not worth a warning
                if line_num == 0 {
                    debug!("Skipping TSS table header: {}", line);
                } else {
                    warn!("Skipping malformed TSS row at line {}: {}", line_num + 1, line);
                }
                table.skipped += 1;
            }
        }
    }

    Ok(table)
}

/// Read a TSS table from a file.
pub fn read_tss_table<P: AsRef<Path>>(path: P) -> io::Result<TssTable> {
    let file = File::open(path)?;
    read_tss_from(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_rows() {
        let content = "Pos\tStrand\n120\t+\tNC_1\n# comment\n\n880\t-\n";
        let table = read_tss_from(content.as_bytes()).unwrap();

        assert_eq!(table.points.len(), 2);
        assert_eq!(table.points[0].position, 120);
        assert_eq!(table.points[0].strand, Strand::Plus);
        assert_eq!(table.points[0].sequence_id, "NC_1");
        assert_eq!(table.points[1].sequence_id, "");
        assert_eq!(table.skipped, 1);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let content = "100\t+\n200\t.\nabc\t-\n300\n400\t-\n";
        let table = read_tss_from(content.as_bytes()).unwrap();

        let positions: Vec<Position> = table.points.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![100, 400]);
        assert_eq!(table.skipped, 3);
    }

    #[test]
    fn test_read_from_file() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "42\t-\tchr").unwrap();

        let table = read_tss_table(file.path()).unwrap();
        assert_eq!(table.points[0].strand, Strand::Minus);
    }
}
