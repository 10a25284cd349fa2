//! Range index for candidate lookup.
//!
//! Intervals are bucketed by sequence and strand, each bucket sorted by start.
//! A query binary-searches the first start that can still reach the query
//! window (using the longest interval in the bucket) and scans forward.

use crate::interval::{Interval, Position, Strand};
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
struct Bucket {
    /// (start, end, input index), sorted by start
    entries: Vec<(Position, Position, usize)>,
    max_span: Position,
}

impl Bucket {
    fn push(&mut self, start: Position, end: Position, idx: usize) {
        self.max_span = self.max_span.max(end - start);
        self.entries.push((start, end, idx));
    }

    fn finish(&mut self) {
        self.entries
            .sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)).then(a.2.cmp(&b.2)));
    }

    fn collect_range(&self, lo: Position, hi: Position, out: &mut Vec<usize>) {
        // Nothing starting before this can end at or after `lo`
        let first_start = lo.saturating_sub(self.max_span);
        let from = self.entries.partition_point(|&(start, _, _)| start < first_start);

        for &(start, end, idx) in &self.entries[from..] {
            if start > hi {
                break;
            }
            if end >= lo {
                out.push(idx);
            }
        }
    }
}

#[derive(Debug, Default)]
struct StrandBuckets {
    plus: Bucket,
    minus: Bucket,
}

impl StrandBuckets {
    fn get(&self, strand: Strand) -> &Bucket {
        match strand {
            Strand::Plus => &self.plus,
            Strand::Minus => &self.minus,
        }
    }

    fn get_mut(&mut self, strand: Strand) -> &mut Bucket {
        match strand {
            Strand::Plus => &mut self.plus,
            Strand::Minus => &mut self.minus,
        }
    }
}

/// An index over a slice of intervals, answering with positions in that slice.
#[derive(Debug, Default)]
pub struct IntervalIndex {
    by_sequence: FxHashMap<String, StrandBuckets>,
    len: usize,
}

impl IntervalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from a collection of intervals.
    pub fn from_intervals<P>(intervals: &[Interval<P>]) -> Self {
        let mut by_sequence: FxHashMap<String, StrandBuckets> = FxHashMap::default();

        for (idx, interval) in intervals.iter().enumerate() {
            by_sequence
                .entry(interval.sequence_id.clone())
                .or_default()
                .get_mut(interval.strand)
                .push(interval.start(), interval.end(), idx);
        }

        for buckets in by_sequence.values_mut() {
            buckets.plus.finish();
            buckets.minus.finish();
        }

        Self {
            by_sequence,
            len: intervals.len(),
        }
    }

    /// Indices of intervals on `strand` whose span intersects `[lo, hi]`.
    ///
    /// `sequence_id = None` searches every sequence. Indices are returned in
    /// ascending (input) order.
    pub fn find_in_range(
        &self,
        sequence_id: Option<&str>,
        strand: Strand,
        lo: Position,
        hi: Position,
    ) -> Vec<usize> {
        let mut results = Vec::new();
        if lo > hi {
            return results;
        }

        match sequence_id {
            Some(seq) => {
                if let Some(buckets) = self.by_sequence.get(seq) {
                    buckets.get(strand).collect_range(lo, hi, &mut results);
                }
            }
            None => {
                for buckets in self.by_sequence.values() {
                    buckets.get(strand).collect_range(lo, hi, &mut results);
                }
            }
        }

        results.sort_unstable();
        results
    }

    /// Indices of intervals on the same sequence and strand overlapping `query`.
    pub fn find_overlaps<P>(&self, query: &Interval<P>) -> Vec<usize> {
        self.find_in_range(
            Some(&query.sequence_id),
            query.strand,
            query.start(),
            query.end(),
        )
    }

    /// Get all sequences in the index.
    pub fn sequences(&self) -> impl Iterator<Item = &str> {
        self.by_sequence.keys().map(|s| s.as_str())
    }

    /// Get the total number of intervals.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_intervals() -> Vec<Interval> {
        vec![
            Interval::new("chr1", "a", "", 100, 200, Strand::Plus),
            Interval::new("chr1", "b", "", 150, 250, Strand::Plus),
            Interval::new("chr1", "c", "", 300, 400, Strand::Plus),
            Interval::new("chr1", "d", "", 100, 200, Strand::Minus),
            Interval::new("chr2", "e", "", 100, 200, Strand::Plus),
        ]
    }

    #[test]
    fn test_build_index() {
        let index = IntervalIndex::from_intervals(&sample_intervals());
        assert_eq!(index.len(), 5);
        assert!(!index.is_empty());

        let mut seqs: Vec<_> = index.sequences().collect();
        seqs.sort_unstable();
        assert_eq!(seqs, vec!["chr1", "chr2"]);
    }

    #[test]
    fn test_find_overlaps_is_strand_specific() {
        let intervals = sample_intervals();
        let index = IntervalIndex::from_intervals(&intervals);

        let query = Interval::new("chr1", "q", "", 175, 225, Strand::Plus);
        assert_eq!(index.find_overlaps(&query), vec![0, 1]);

        let query = Interval::new("chr1", "q", "", 175, 225, Strand::Minus);
        assert_eq!(index.find_overlaps(&query), vec![3]);
    }

    #[test]
    fn test_closed_bounds() {
        let index = IntervalIndex::from_intervals(&sample_intervals());

        assert_eq!(index.find_in_range(Some("chr1"), Strand::Plus, 250, 250), vec![1]);
        assert_eq!(index.find_in_range(Some("chr1"), Strand::Plus, 251, 299), Vec::<usize>::new());
        assert_eq!(index.find_in_range(Some("chr1"), Strand::Plus, 251, 300), vec![2]);
    }

    #[test]
    fn test_nested_intervals_are_found() {
        let intervals = vec![
            Interval::new("chr1", "long", "", 1, 10_000, Strand::Plus),
            Interval::new("chr1", "short1", "", 50, 60, Strand::Plus),
            Interval::new("chr1", "short2", "", 70, 80, Strand::Plus),
        ];
        let index = IntervalIndex::from_intervals(&intervals);

        assert_eq!(index.find_in_range(Some("chr1"), Strand::Plus, 5_000, 5_001), vec![0]);
        assert_eq!(index.find_in_range(Some("chr1"), Strand::Plus, 75, 75), vec![0, 2]);
    }

    #[test]
    fn test_any_sequence() {
        let index = IntervalIndex::from_intervals(&sample_intervals());
        assert_eq!(index.find_in_range(None, Strand::Plus, 120, 130), vec![0, 4]);
        assert!(index.find_in_range(Some("chr3"), Strand::Plus, 0, 1000).is_empty());
    }

    #[test]
    fn test_negative_window() {
        let intervals = vec![Interval::new("chr1", "a", "", 0, 5, Strand::Minus)];
        let index = IntervalIndex::from_intervals(&intervals);
        assert_eq!(index.find_in_range(Some("chr1"), Strand::Minus, -100, 0), vec![0]);
    }
}
