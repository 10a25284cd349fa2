//! Intergenic region finder.
//!
//! Returns the stretches of each sequence not covered by any gene on either
//! strand. Single sweep per sequence over genes sorted by start.

use crate::genome::Genome;
use crate::gff::{GffRecord, GffWriter, Result};
use crate::interval::{Interval, Position, Strand};
use log::debug;
use rustc_hash::FxHashMap;
use std::io::Write;

/// Feature type and source written for intergenic regions.
pub const IGR_FEATURE: &str = "IGR";

/// A maximal uncovered run, inclusive coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntergenicRegion {
    pub sequence_id: String,
    pub start: Position,
    pub end: Position,
}

impl IntergenicRegion {
    /// `IGR_<seq>_<start>_to_<end>`
    pub fn id(&self) -> String {
        format!("IGR_{}_{}_to_{}", self.sequence_id, self.start, self.end)
    }

    pub fn length(&self) -> u64 {
        (self.end - self.start + 1) as u64
    }
}

#[derive(Debug, Clone, Default)]
pub struct IgrCommand;

impl IgrCommand {
    pub fn new() -> Self {
        Self
    }

    /// Find intergenic regions in `[1, length]` of every sequence in `genome`.
    ///
    /// Sequences come out in genome order. Genes on sequences without a
    /// known length are ignored.
    pub fn find<P>(&self, genes: &[Interval<P>], genome: &Genome) -> Vec<IntergenicRegion> {
        let mut by_sequence: FxHashMap<&str, Vec<(Position, Position)>> = FxHashMap::default();
        for gene in genes {
            if !genome.has_sequence(&gene.sequence_id) {
                debug!("No length known for {}, ignoring gene {}", gene.sequence_id, gene.identity);
                continue;
            }
            by_sequence
                .entry(gene.sequence_id.as_str())
                .or_default()
                .push((gene.start(), gene.end()));
        }

        let mut regions = Vec::new();
        for (seq_id, length) in genome.iter() {
            let length = length as Position;
            let mut spans = by_sequence.remove(seq_id).unwrap_or_default();
            spans.sort_unstable();

            // First position not yet known to be covered
            let mut cursor: Position = 1;
            for (start, end) in spans {
                if start > cursor {
                    regions.push(IntergenicRegion {
                        sequence_id: seq_id.to_string(),
                        start: cursor,
                        end: (start - 1).min(length),
                    });
                }
                cursor = cursor.max(end + 1);
                if cursor > length {
                    break;
                }
            }
            if cursor <= length {
                regions.push(IntergenicRegion {
                    sequence_id: seq_id.to_string(),
                    start: cursor,
                    end: length,
                });
            }
        }

        regions.retain(|r| r.start <= r.end);
        regions
    }

    /// Write regions as GFF, one entry per strand.
    pub fn write_gff<W: Write>(
        &self,
        regions: &[IntergenicRegion],
        writer: &mut GffWriter<W>,
    ) -> Result<()> {
        for region in regions {
            let record = GffRecord {
                source: IGR_FEATURE.to_string(),
                feature: IGR_FEATURE.to_string(),
                score: ".".to_string(),
                phase: ".".to_string(),
                attributes: format!("ID={}", region.id()),
            };
            for strand in [Strand::Plus, Strand::Minus] {
                writer.write_feature(
                    &region.sequence_id,
                    &record,
                    region.start,
                    region.end,
                    Some(strand),
                )?;
            }
        }
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genome(sizes: &[(&str, u64)]) -> Genome {
        let mut genome = Genome::new();
        for (seq, size) in sizes {
            genome.insert(seq.to_string(), *size);
        }
        genome
    }

    fn spans(regions: &[IntergenicRegion]) -> Vec<(Position, Position)> {
        regions.iter().map(|r| (r.start, r.end)).collect()
    }

    #[test]
    fn test_gaps_between_genes() {
        let genes = vec![
            Interval::new("chr", "a", "", 10, 20, Strand::Plus),
            Interval::new("chr", "b", "", 30, 40, Strand::Minus),
        ];
        let regions = IgrCommand::new().find(&genes, &genome(&[("chr", 50)]));

        assert_eq!(spans(&regions), vec![(1, 9), (21, 29), (41, 50)]);
        assert_eq!(regions[1].id(), "IGR_chr_21_to_29");
        assert_eq!(regions[1].length(), 9);
    }

    #[test]
    fn test_overlapping_and_edge_genes() {
        let genes = vec![
            Interval::new("chr", "b", "", 15, 30, Strand::Minus),
            Interval::new("chr", "a", "", 1, 20, Strand::Plus),
            Interval::new("chr", "c", "", 31, 60, Strand::Plus),
        ];
        let regions = IgrCommand::new().find(&genes, &genome(&[("chr", 50)]));

        assert!(regions.is_empty());
    }

    #[test]
    fn test_adjacent_genes_leave_no_gap() {
        let genes = vec![
            Interval::new("chr", "a", "", 5, 10, Strand::Plus),
            Interval::new("chr", "b", "", 11, 20, Strand::Plus),
        ];
        let regions = IgrCommand::new().find(&genes, &genome(&[("chr", 25)]));

        assert_eq!(spans(&regions), vec![(1, 4), (21, 25)]);
    }

    #[test]
    fn test_sequence_without_genes() {
        let genes = vec![Interval::new("chr", "a", "", 5, 10, Strand::Plus)];
        let regions = IgrCommand::new().find(&genes, &genome(&[("plasmid", 8), ("chr", 10)]));

        assert_eq!(regions[0].sequence_id, "plasmid");
        assert_eq!(spans(&regions), vec![(1, 8), (1, 4)]);
    }

    #[test]
    fn test_write_gff_both_strands() {
        let regions = vec![IntergenicRegion {
            sequence_id: "chr".to_string(),
            start: 21,
            end: 29,
        }];
        let mut out = Vec::new();
        {
            let mut writer = GffWriter::new(&mut out).unwrap();
            IgrCommand::new().write_gff(&regions, &mut writer).unwrap();
        }
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "chr\tIGR\tIGR\t21\t29\t.\t+\t.\tID=IGR_chr_21_to_29");
        assert_eq!(lines[2], "chr\tIGR\tIGR\t21\t29\t.\t-\t.\tID=IGR_chr_21_to_29");
    }
}
