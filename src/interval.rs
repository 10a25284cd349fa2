//! Core record types for gene and TSS annotations.
//!
//! Coordinates are closed on both ends. Whether they are 0- or 1-based is a
//! property of the caller's data; nothing here adds or subtracts an implicit
//! offset beyond the inclusive length formula.

use log::warn;
use std::cmp::Ordering;
use std::fmt;

/// Signed coordinate type. Search windows may extend below zero.
pub type Position = i64;

/// Strand orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Plus),
            '-' => Some(Strand::Minus),
            _ => None,
        }
    }

    /// Parse a strand column. Only `+` and `-` are accepted.
    pub fn parse(s: &str) -> Option<Self> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c),
            _ => None,
        }
    }

    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Strand::Plus => Strand::Minus,
            Strand::Minus => Strand::Plus,
        }
    }

    #[inline]
    pub fn as_char(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Overlap length of two closed ranges.
///
/// Values `<= 0` mean the ranges are disjoint. Ranges sharing a single
/// coordinate overlap by exactly 1.
#[inline]
pub fn overlap(a_start: Position, a_end: Position, b_start: Position, b_end: Position) -> Position {
    a_end.min(b_end) - a_start.max(b_start) + 1
}

/// Express an overlap as a percentage of a length.
///
/// A zero length cannot carry any relative overlap: it is reported and
/// counted as 0% instead of dividing by zero.
pub fn overlap_percentage(overlap: Position, length: u64) -> f64 {
    if length == 0 {
        warn!("Zero length interval in overlap percentage computation, using 0%");
        return 0.0;
    }
    overlap as f64 / length as f64 * 100.0
}

/// A gene, transcript or any other stranded feature with a span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval<P = ()> {
    pub sequence_id: String,
    pub identity: String,
    pub label: String,
    start: Position,
    end: Position,
    pub strand: Strand,
    pub payload: Option<P>,
}

impl Interval {
    /// Create an interval without payload. The bounds may be given in any order.
    pub fn new(
        sequence_id: impl Into<String>,
        identity: impl Into<String>,
        label: impl Into<String>,
        start: Position,
        end: Position,
        strand: Strand,
    ) -> Self {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        Self {
            sequence_id: sequence_id.into(),
            identity: identity.into(),
            label: label.into(),
            start,
            end,
            strand,
            payload: None,
        }
    }
}

impl<P> Interval<P> {
    /// Attach a payload, replacing any previous one.
    pub fn with_payload<Q>(self, payload: Q) -> Interval<Q> {
        Interval {
            sequence_id: self.sequence_id,
            identity: self.identity,
            label: self.label,
            start: self.start,
            end: self.end,
            strand: self.strand,
            payload: Some(payload),
        }
    }

    /// Drop the payload, keeping the coordinates and names.
    pub fn without_payload<Q>(self) -> Interval<Q> {
        Interval {
            sequence_id: self.sequence_id,
            identity: self.identity,
            label: self.label,
            start: self.start,
            end: self.end,
            strand: self.strand,
            payload: None,
        }
    }

    #[inline]
    pub fn start(&self) -> Position {
        self.start
    }

    #[inline]
    pub fn end(&self) -> Position {
        self.end
    }

    /// Inclusive length, `end - start + 1`.
    #[inline]
    pub fn length(&self) -> u64 {
        (self.end - self.start + 1) as u64
    }

    /// Overlap length with another interval, ignoring sequence and strand.
    #[inline]
    pub fn overlap_with<Q>(&self, other: &Interval<Q>) -> Position {
        overlap(self.start, self.end, other.start, other.end)
    }

    /// The overlap as a percentage of this interval's length.
    #[inline]
    pub fn overlap_percentage(&self, overlap: Position) -> f64 {
        overlap_percentage(overlap, self.length())
    }

    /// True if both intervals live on the same sequence and strand.
    #[inline]
    pub fn same_partition<Q>(&self, other: &Interval<Q>) -> bool {
        self.strand == other.strand && self.sequence_id == other.sequence_id
    }

    /// True if `other`'s span lies within this interval.
    #[inline]
    pub fn contains_span<Q>(&self, other: &Interval<Q>) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    #[inline]
    pub fn contains_position(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// Order by sequence, strand, start and end.
    pub fn cmp_coordinates<Q>(&self, other: &Interval<Q>) -> Ordering {
        self.sequence_id
            .cmp(&other.sequence_id)
            .then(self.strand.cmp(&other.strand))
            .then(self.start.cmp(&other.start))
            .then(self.end.cmp(&other.end))
    }
}

impl<P> fmt::Display for Interval<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.sequence_id, self.identity, self.label, self.start, self.end, self.strand
        )
    }
}

/// A point feature such as a transcription start site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PointFeature<P = ()> {
    /// Empty when the sequence is unknown; such a point matches every sequence.
    pub sequence_id: String,
    pub position: Position,
    pub strand: Strand,
    pub payload: Option<P>,
}

impl PointFeature {
    pub fn new(sequence_id: impl Into<String>, position: Position, strand: Strand) -> Self {
        Self {
            sequence_id: sequence_id.into(),
            position,
            strand,
            payload: None,
        }
    }
}

impl<P> PointFeature<P> {
    pub fn with_payload<Q>(self, payload: Q) -> PointFeature<Q> {
        PointFeature {
            sequence_id: self.sequence_id,
            position: self.position,
            strand: self.strand,
            payload: Some(payload),
        }
    }

    /// True if the point may be related to features on `sequence_id`.
    #[inline]
    pub fn matches_sequence(&self, sequence_id: &str) -> bool {
        self.sequence_id.is_empty() || self.sequence_id == sequence_id
    }
}

impl<P> fmt::Display for PointFeature<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{}\t{}", self.sequence_id, self.position, self.strand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_are_sorted() {
        let gene = Interval::new("chr1", "gene_2342", "hacY", 1000, 5, Strand::Plus);
        assert_eq!(gene.start(), 5);
        assert_eq!(gene.end(), 1000);
    }

    #[test]
    fn test_inclusive_length() {
        let a = Interval::new("chr1", "a", "b", 1, 10, Strand::Plus);
        let b = Interval::new("chr1", "a", "b", 10, 20, Strand::Plus);
        let single = Interval::new("chr1", "a", "b", 7, 7, Strand::Minus);

        assert_eq!(a.length(), 10);
        assert_eq!(b.length(), 11);
        assert_eq!(single.length(), 1);
    }

    #[test]
    fn test_overlap() {
        assert_eq!(overlap(1, 100, 50, 99), 50);
        assert_eq!(overlap(50, 99, 1, 100), 50);
        assert_eq!(overlap(0, 100, 100, 200), 1); // Touching
        assert_eq!(overlap(0, 100, 101, 300), 0); // Adjacent, no shared base
        assert!(overlap(0, 100, 200, 300) < 0);
    }

    #[test]
    fn test_overlap_symmetry() {
        let spans = [(1, 100), (50, 150), (100, 100), (151, 300), (-20, 5)];
        for &(a_start, a_end) in &spans {
            for &(b_start, b_end) in &spans {
                assert_eq!(
                    overlap(a_start, a_end, b_start, b_end),
                    overlap(b_start, b_end, a_start, a_end)
                );
            }
        }
    }

    #[test]
    fn test_overlap_percentage() {
        let gene = Interval::new("genomeX", "g", "g", 1, 100, Strand::Plus);
        assert_eq!(gene.overlap_percentage(50), 50.0);
        assert_eq!(overlap_percentage(10, 0), 0.0);
    }

    #[test]
    fn test_strand_parse() {
        assert_eq!(Strand::parse("+"), Some(Strand::Plus));
        assert_eq!(Strand::parse(" - "), Some(Strand::Minus));
        assert_eq!(Strand::parse("."), None);
        assert_eq!(Strand::parse("+-"), None);
        assert_eq!(Strand::Plus.opposite(), Strand::Minus);
    }

    #[test]
    fn test_payload() {
        let gene = Interval::new("chr2", "gene_0005", "hacZ", 15, 30, Strand::Minus)
            .with_payload("mope");
        assert_eq!(gene.payload, Some("mope"));
        assert_eq!(gene.start(), 15);

        let tss = PointFeature::new("chr2", 12, Strand::Minus).with_payload(7u32);
        assert_eq!(tss.payload, Some(7));
    }

    #[test]
    fn test_point_sequence_wildcard() {
        let anywhere = PointFeature::new("", 10, Strand::Plus);
        let pinned = PointFeature::new("chr1", 10, Strand::Plus);

        assert!(anywhere.matches_sequence("chr1"));
        assert!(anywhere.matches_sequence("plasmid"));
        assert!(pinned.matches_sequence("chr1"));
        assert!(!pinned.matches_sequence("plasmid"));
    }

    #[test]
    fn test_coordinate_ordering() {
        let mut genes = [
            Interval::new("chr2", "c", "", 100, 200, Strand::Plus),
            Interval::new("chr1", "b", "", 200, 300, Strand::Plus),
            Interval::new("chr1", "a", "", 100, 200, Strand::Plus),
        ];
        genes.sort_by(|a, b| a.cmp_coordinates(b));

        assert_eq!(genes[0].identity, "a");
        assert_eq!(genes[1].identity, "b");
        assert_eq!(genes[2].sequence_id, "chr2");
    }
}
