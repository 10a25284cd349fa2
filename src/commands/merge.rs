//! Gene list reconciliation.
//!
//! Every incoming interval is compared against the intervals already accepted
//! on the same sequence and strand. Sufficiently overlapping intervals are fused
//! into one spanning interval, or the newcomer is dropped when merging is
//! disabled. Partitions never interact, so they are processed independently.

use crate::config::{MergeConfig, MERGE_SEPARATOR};
use crate::interval::{Interval, Position};
use crate::parallel::{group_by_partition, process_partitions, PartitionKey};
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

/// Decide whether two intervals overlap enough to be reconciled.
///
/// Without a threshold any positive overlap qualifies. With a threshold the
/// overlap must cover more than `min_percentage` of *each* interval, or the
/// whole interval. Sequence and strand are not checked here.
pub fn has_sufficient_overlap<P, Q>(
    a: &Interval<P>,
    b: &Interval<Q>,
    min_percentage: Option<f64>,
) -> bool {
    let overlap = a.overlap_with(b);
    if overlap <= 0 {
        return false;
    }
    match min_percentage {
        None => true,
        Some(min) => covers(a, overlap, min) && covers(b, overlap, min),
    }
}

#[inline]
fn covers<P>(interval: &Interval<P>, overlap: Position, min_percentage: f64) -> bool {
    overlap as u64 >= interval.length() || interval.overlap_percentage(overlap) > min_percentage
}

/// Counters collected during a merge run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub intervals_read: usize,
    pub duplicates_skipped: usize,
    pub intervals_fused: usize,
    pub intervals_discarded: usize,
    pub intervals_written: usize,
}

impl MergeStats {
    fn absorb(&mut self, other: &MergeStats) {
        self.intervals_read += other.intervals_read;
        self.duplicates_skipped += other.duplicates_skipped;
        self.intervals_fused += other.intervals_fused;
        self.intervals_discarded += other.intervals_discarded;
        self.intervals_written += other.intervals_written;
    }
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Read: {}, Duplicates: {}, Fused: {}, Discarded: {}, Written: {}",
            self.intervals_read,
            self.duplicates_skipped,
            self.intervals_fused,
            self.intervals_discarded,
            self.intervals_written
        )
    }
}

/// Accepted intervals of a single (sequence, strand) partition.
struct PartitionMerger<P> {
    accepted: Vec<Interval<P>>,
    /// identity, label, start, end
    seen: FxHashSet<(String, String, Position, Position)>,
    stats: MergeStats,
}

impl<P> PartitionMerger<P> {
    fn new() -> Self {
        Self {
            accepted: Vec::new(),
            seen: FxHashSet::default(),
            stats: MergeStats::default(),
        }
    }

    fn insert(&mut self, query: Interval<P>, config: &MergeConfig) {
        self.stats.intervals_read += 1;

        let key = (
            query.identity.clone(),
            query.label.clone(),
            query.start(),
            query.end(),
        );
        if !self.seen.insert(key) {
            self.stats.duplicates_skipped += 1;
            return;
        }

        let mut hits = self.sufficient_overlaps(&query, config);
        if hits.is_empty() {
            self.accepted.push(query);
            return;
        }

        if !config.perform_merging() {
            debug!(
                "Discarding '{}' ({}..{}), overlaps previously seen '{}'",
                query.identity,
                query.start(),
                query.end(),
                self.accepted[hits[0]].identity
            );
            self.stats.intervals_discarded += 1;
            return;
        }

        let mut fused = query;
        while !hits.is_empty() {
            // `hits` is ascending; remove back to front, then restore acceptance order
            let mut constituents: Vec<Interval<P>> =
                hits.iter().rev().map(|&i| self.accepted.remove(i)).collect();
            constituents.reverse();
            self.stats.intervals_fused += constituents.len();
            fused = fuse(fused, &constituents);
            hits = self.sufficient_overlaps(&fused, config);
        }
        self.accepted.push(fused);
    }

    /// Positions of accepted intervals reconcilable with `query`, ascending.
    fn sufficient_overlaps(&self, query: &Interval<P>, config: &MergeConfig) -> Vec<usize> {
        self.accepted
            .iter()
            .enumerate()
            .filter(|(_, accepted)| {
                has_sufficient_overlap(query, accepted, config.min_overlap_percentage())
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn into_parts(mut self) -> (Vec<Interval<P>>, MergeStats) {
        self.stats.intervals_written = self.accepted.len();
        (self.accepted, self.stats)
    }
}

/// Fuse `head` with `rest` into one interval spanning all of them.
///
/// Names are joined in order, `head` first. The result carries no payload.
fn fuse<P>(head: Interval<P>, rest: &[Interval<P>]) -> Interval<P> {
    let mut start = head.start();
    let mut end = head.end();
    let mut identity = head.identity;
    let mut label = head.label;

    for other in rest {
        start = start.min(other.start());
        end = end.max(other.end());
        identity.push_str(MERGE_SEPARATOR);
        identity.push_str(&other.identity);
        label.push_str(MERGE_SEPARATOR);
        label.push_str(&other.label);
    }

    Interval::new(head.sequence_id, identity, label, start, end, head.strand).without_payload()
}

/// Batch merge command.
#[derive(Debug, Clone, Default)]
pub struct MergeCommand {
    pub config: MergeConfig,
}

impl MergeCommand {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    /// Merge intervals, returning the reconciled set.
    pub fn merge<P: Send>(&self, intervals: Vec<Interval<P>>) -> Vec<Interval<P>> {
        self.merge_with_stats(intervals).0
    }

    /// Merge intervals and report what happened to them.
    ///
    /// Partitions come out in first-seen order, intervals inside a partition
    /// in acceptance order.
    pub fn merge_with_stats<P: Send>(
        &self,
        intervals: Vec<Interval<P>>,
    ) -> (Vec<Interval<P>>, MergeStats) {
        let groups = group_by_partition(intervals);
        debug!("Merging {} sequence/strand partitions", groups.len());

        let results = process_partitions(groups, |_, intervals| {
            let mut merger = PartitionMerger::new();
            for interval in intervals {
                merger.insert(interval, &self.config);
            }
            merger.into_parts()
        });

        let mut stats = MergeStats::default();
        let mut merged = Vec::new();
        for (accepted, partition_stats) in results {
            stats.absorb(&partition_stats);
            merged.extend(accepted);
        }
        (merged, stats)
    }
}

/// Merge `intervals` under `config`.
pub fn merge<P: Send>(intervals: Vec<Interval<P>>, config: &MergeConfig) -> Vec<Interval<P>> {
    MergeCommand::new(config.clone()).merge(intervals)
}

/// Incremental merger: intervals can be added in several batches, e.g. one
/// annotation source after the other.
pub struct GeneMerger<P = ()> {
    config: MergeConfig,
    partitions: Vec<(PartitionKey, PartitionMerger<P>)>,
    slots: FxHashMap<PartitionKey, usize>,
}

impl<P> GeneMerger<P> {
    pub fn new(config: MergeConfig) -> Self {
        Self {
            config,
            partitions: Vec::new(),
            slots: FxHashMap::default(),
        }
    }

    pub fn add_interval(&mut self, interval: Interval<P>) {
        let key = (interval.sequence_id.clone(), interval.strand);
        let slot = match self.slots.get(&key) {
            Some(&slot) => slot,
            None => {
                self.partitions.push((key.clone(), PartitionMerger::new()));
                self.slots.insert(key, self.partitions.len() - 1);
                self.partitions.len() - 1
            }
        };
        self.partitions[slot].1.insert(interval, &self.config);
    }

    pub fn add_intervals<I: IntoIterator<Item = Interval<P>>>(&mut self, intervals: I) {
        for interval in intervals {
            self.add_interval(interval);
        }
    }

    /// The current reconciled set.
    pub fn merged_intervals(&self) -> Vec<Interval<P>>
    where
        P: Clone,
    {
        self.partitions
            .iter()
            .flat_map(|(_, merger)| merger.accepted.iter().cloned())
            .collect()
    }

    pub fn stats(&self) -> MergeStats {
        let mut stats = MergeStats::default();
        for (_, merger) in &self.partitions {
            stats.absorb(&merger.stats);
        }
        stats.intervals_written = self.partitions.iter().map(|(_, m)| m.accepted.len()).sum();
        stats
    }

    pub fn into_merged(self) -> Vec<Interval<P>> {
        self.partitions
            .into_iter()
            .flat_map(|(_, merger)| merger.accepted)
            .collect()
    }
}
