//! Parallel processing utilities using Rayon.

use crate::interval::{Interval, Strand};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

/// Minimum number of records before enabling parallelization.
/// Below this threshold, sequential processing is faster due to
/// thread spawn overhead.
pub const PARALLEL_THRESHOLD: usize = 10_000;

/// Identifies an independent (sequence, strand) partition.
pub type PartitionKey = (String, Strand);

/// Group intervals by sequence and strand.
///
/// Partitions come out in first-seen order and keep input order inside.
pub fn group_by_partition<P>(intervals: Vec<Interval<P>>) -> Vec<(PartitionKey, Vec<Interval<P>>)> {
    let mut slots: FxHashMap<PartitionKey, usize> = FxHashMap::default();
    let mut groups: Vec<(PartitionKey, Vec<Interval<P>>)> = Vec::new();

    for interval in intervals {
        let key = (interval.sequence_id.clone(), interval.strand);
        let slot = *slots.entry(key).or_insert_with_key(|key| {
            groups.push((key.clone(), Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(interval);
    }

    groups
}

/// Run `f` over every partition, in parallel once the input is large enough.
///
/// Results keep the partition order.
pub fn process_partitions<P, T, F>(groups: Vec<(PartitionKey, Vec<Interval<P>>)>, f: F) -> Vec<T>
where
    P: Send,
    T: Send,
    F: Fn(&PartitionKey, Vec<Interval<P>>) -> T + Sync + Send,
{
    let total: usize = groups.iter().map(|(_, v)| v.len()).sum();

    if total < PARALLEL_THRESHOLD || groups.len() < 2 {
        groups
            .into_iter()
            .map(|(key, intervals)| f(&key, intervals))
            .collect()
    } else {
        groups
            .into_par_iter()
            .map(|(key, intervals)| f(&key, intervals))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_partition() {
        let intervals = vec![
            Interval::new("chr1", "a", "", 100, 200, Strand::Plus),
            Interval::new("chr2", "b", "", 100, 200, Strand::Plus),
            Interval::new("chr1", "c", "", 300, 400, Strand::Minus),
            Interval::new("chr1", "d", "", 500, 600, Strand::Plus),
        ];

        let groups = group_by_partition(intervals);

        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0].0, ("chr1".to_string(), Strand::Plus));
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[1].identity, "d");
        assert_eq!(groups[1].0, ("chr2".to_string(), Strand::Plus));
        assert_eq!(groups[2].0, ("chr1".to_string(), Strand::Minus));
    }

    #[test]
    fn test_process_partitions_keeps_order() {
        let intervals: Vec<Interval> = (0..PARALLEL_THRESHOLD as i64 + 10)
            .map(|i| {
                let seq = format!("seq{}", i % 7);
                Interval::new(seq, "", "", i, i + 1, Strand::Plus)
            })
            .collect();

        let groups = group_by_partition(intervals);
        let keys: Vec<String> = groups.iter().map(|(k, _)| k.0.clone()).collect();
        let seen = process_partitions(groups, |key, _| key.0.clone());

        assert_eq!(seen, keys);
    }
}
