//! TSS to gene classification.
//!
//! The positional relationships that are told apart:
//!
//! ```text
//!     secondary   primary  internal
//!     +--->       +--->    +--->
//!     |           |        |
//! ----+-----------+---=====+=====>------
//!                          |
//!                      <---+
//!                      antisense
//! ```
//!
//! Every (TSS, gene) pair is classified on its own first. Two reconciliation
//! passes follow: the closest 5' TSS of each gene becomes its primary TSS,
//! and a TSS that reaches several genes in the 5' role keeps only the
//! closest of them.

use crate::config::ClassifyConfig;
use crate::index::IntervalIndex;
use crate::interval::{Interval, PointFeature, Position, Strand};
use crate::parallel::PARALLEL_THRESHOLD;
use log::debug;
use rayon::prelude::*;
use std::fmt;

/// Where a TSS sits relative to a gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TssLocation {
    /// Same strand, upstream of the gene or on its first base.
    FivePrime,
    /// Same strand, from the second to the last base of the gene.
    Internal,
    /// Opposite strand, inside the gene or in its flanks.
    Antisense,
}

impl TssLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TssLocation::FivePrime => "5' region",
            TssLocation::Internal => "internal",
            TssLocation::Antisense => "antisense",
        }
    }
}

impl fmt::Display for TssLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rank of a 5' TSS among all 5' TSS of the same gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TssType {
    Primary,
    Secondary,
    Unset,
}

impl TssType {
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            TssType::Primary => Some("primary"),
            TssType::Secondary => Some("secondary"),
            TssType::Unset => None,
        }
    }
}

/// Classification of one (TSS, gene) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Association {
    pub location: TssLocation,
    /// Length of the 5' leader; only set for [`TssLocation::FivePrime`].
    pub distance: Option<Position>,
    pub tss_type: TssType,
}

impl Association {
    fn five_prime(distance: Position) -> Self {
        Self {
            location: TssLocation::FivePrime,
            distance: Some(distance),
            tss_type: TssType::Unset,
        }
    }

    fn other(location: TssLocation) -> Self {
        Self {
            location,
            distance: None,
            tss_type: TssType::Unset,
        }
    }

    #[inline]
    pub fn is_five_prime(&self) -> bool {
        self.location == TssLocation::FivePrime
    }
}

/// An association to the gene at position `gene` of the classified gene slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneHit {
    pub gene: usize,
    pub association: Association,
}

/// Final state of one TSS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TssStatus {
    /// No gene within any of the windows.
    Orphan,
    /// Associated genes in gene input order; never empty.
    Associated(Vec<GeneHit>),
}

impl TssStatus {
    #[inline]
    pub fn is_orphan(&self) -> bool {
        matches!(self, TssStatus::Orphan)
    }

    pub fn hits(&self) -> &[GeneHit] {
        match self {
            TssStatus::Orphan => &[],
            TssStatus::Associated(hits) => hits,
        }
    }

    pub fn association(&self, gene: usize) -> Option<&Association> {
        self.hits()
            .iter()
            .find(|hit| hit.gene == gene)
            .map(|hit| &hit.association)
    }
}

/// Classification result, one status per TSS in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TssGeneMap {
    statuses: Vec<TssStatus>,
}

impl TssGeneMap {
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Status of the TSS at position `point` of the classified TSS slice.
    pub fn get(&self, point: usize) -> Option<&TssStatus> {
        self.statuses.get(point)
    }

    pub fn statuses(&self) -> &[TssStatus] {
        &self.statuses
    }

    /// Association between a TSS and a gene, both given by input position.
    pub fn association(&self, point: usize, gene: usize) -> Option<&Association> {
        self.statuses.get(point)?.association(gene)
    }

    /// Iterate `(point, status)` pairs in input order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &TssStatus)> {
        self.statuses.iter().enumerate()
    }

    /// All TSS associated with `gene`, with their classification.
    pub fn points_for_gene(&self, gene: usize) -> Vec<(usize, &Association)> {
        self.iter()
            .filter_map(|(point, status)| status.association(gene).map(|a| (point, a)))
            .collect()
    }

    pub fn summary(&self) -> ClassificationSummary {
        let mut summary = ClassificationSummary {
            points: self.statuses.len(),
            ..Default::default()
        };
        for status in &self.statuses {
            if status.is_orphan() {
                summary.orphans += 1;
            }
            for hit in status.hits() {
                match (hit.association.location, hit.association.tss_type) {
                    (TssLocation::FivePrime, TssType::Primary) => summary.primary += 1,
                    (TssLocation::FivePrime, _) => summary.secondary += 1,
                    (TssLocation::Internal, _) => summary.internal += 1,
                    (TssLocation::Antisense, _) => summary.antisense += 1,
                }
            }
        }
        summary
    }
}

/// Association counts of a classification run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationSummary {
    pub points: usize,
    pub orphans: usize,
    pub primary: usize,
    pub secondary: usize,
    pub internal: usize,
    pub antisense: usize,
}

impl fmt::Display for ClassificationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TSS: {}, Orphan: {}, Primary: {}, Secondary: {}, Internal: {}, Antisense: {}",
            self.points, self.orphans, self.primary, self.secondary, self.internal, self.antisense
        )
    }
}

/// Signed distance from a TSS to the 5' end of a gene.
///
/// Positive upstream of the gene, 0 on its first base, negative downstream.
#[inline]
pub fn five_prime_distance<P, Q>(point: &PointFeature<Q>, gene: &Interval<P>) -> Position {
    match gene.strand {
        Strand::Plus => gene.start() - point.position,
        Strand::Minus => point.position - gene.end(),
    }
}

/// TSS classifier.
#[derive(Debug, Clone, Default)]
pub struct TssClassifier {
    pub config: ClassifyConfig,
}

impl TssClassifier {
    pub fn new(config: ClassifyConfig) -> Self {
        Self { config }
    }

    /// Classify a single pair, without looking at any other gene or TSS.
    ///
    /// The sequence is not compared here; see [`TssClassifier::classify`].
    pub fn associate<P, Q>(&self, point: &PointFeature<Q>, gene: &Interval<P>) -> Option<Association> {
        if point.strand == gene.strand {
            let distance = five_prime_distance(point, gene);
            if (0..=self.config.max_dist_5_prime()).contains(&distance) {
                return Some(Association::five_prime(distance));
            }
            if Self::is_internal(point, gene) {
                return Some(Association::other(TssLocation::Internal));
            }
            None
        } else {
            let flank = self.config.max_dist_antisense();
            let pos = point.position;
            let lo = gene.start().saturating_sub(flank);
            let hi = gene.end().saturating_add(flank);
            if lo <= pos && pos <= hi {
                Some(Association::other(TssLocation::Antisense))
            } else {
                None
            }
        }
    }

    /// The first base belongs to the 5' region (leaderless TSS).
    #[inline]
    fn is_internal<P, Q>(point: &PointFeature<Q>, gene: &Interval<P>) -> bool {
        let pos = point.position;
        match gene.strand {
            Strand::Plus => gene.start() < pos && pos <= gene.end(),
            Strand::Minus => gene.start() <= pos && pos < gene.end(),
        }
    }

    /// Classify every TSS against every gene on the same sequence.
    ///
    /// A TSS without a sequence id is compared with genes on all sequences.
    pub fn classify<P: Sync, Q: Sync>(
        &self,
        points: &[PointFeature<Q>],
        genes: &[Interval<P>],
    ) -> TssGeneMap {
        let index = IntervalIndex::from_intervals(genes);

        let mut hits: Vec<Vec<GeneHit>> = if points.len() < PARALLEL_THRESHOLD {
            points
                .iter()
                .map(|point| self.pair_hits(point, genes, &index))
                .collect()
        } else {
            points
                .par_iter()
                .map(|point| self.pair_hits(point, genes, &index))
                .collect()
        };

        Self::rank_five_prime(&mut hits, genes.len());
        Self::drop_distant_five_prime(&mut hits);
        // A TSS without sequence id can take a primary away to another
        // sequence; rank the surviving 5' TSS again
        Self::rank_five_prime(&mut hits, genes.len());

        let statuses: Vec<TssStatus> = hits
            .into_iter()
            .map(|hits| {
                if hits.is_empty() {
                    TssStatus::Orphan
                } else {
                    TssStatus::Associated(hits)
                }
            })
            .collect();

        let map = TssGeneMap { statuses };
        debug!("{}", map.summary());
        map
    }

    /// All genes a single TSS is associated with, in gene input order.
    fn pair_hits<P, Q>(
        &self,
        point: &PointFeature<Q>,
        genes: &[Interval<P>],
        index: &IntervalIndex,
    ) -> Vec<GeneHit> {
        let sequence = if point.sequence_id.is_empty() {
            None
        } else {
            Some(point.sequence_id.as_str())
        };
        let pos = point.position;
        let sense_reach = self.config.max_dist_5_prime();
        let antisense_reach = self.config.max_dist_antisense();

        let mut candidates =
            index.find_in_range(
                sequence,
                point.strand,
                pos.saturating_sub(sense_reach),
                pos.saturating_add(sense_reach),
            );
        candidates.extend(index.find_in_range(
            sequence,
            point.strand.opposite(),
            pos.saturating_sub(antisense_reach),
            pos.saturating_add(antisense_reach),
        ));
        candidates.sort_unstable();

        candidates
            .into_iter()
            .filter_map(|gene| {
                self.associate(point, &genes[gene])
                    .map(|association| GeneHit { gene, association })
            })
            .collect()
    }

    /// Mark the closest 5' TSS of every gene as primary, the others as secondary.
    ///
    /// Ties go to the TSS seen first.
    fn rank_five_prime(hits: &mut [Vec<GeneHit>], gene_count: usize) {
        // gene -> (distance, point, position in the point's hit list)
        let mut by_gene: Vec<Vec<(Position, usize, usize)>> = vec![Vec::new(); gene_count];

        for (point, point_hits) in hits.iter().enumerate() {
            for (slot, hit) in point_hits.iter().enumerate() {
                if let Some(distance) = hit.association.distance {
                    by_gene[hit.gene].push((distance, point, slot));
                }
            }
        }

        for mut group in by_gene {
            // Stable: equal distances keep point order
            group.sort_by_key(|&(distance, _, _)| distance);
            for (rank, &(_, point, slot)) in group.iter().enumerate() {
                hits[point][slot].association.tss_type = if rank == 0 {
                    TssType::Primary
                } else {
                    TssType::Secondary
                };
            }
        }
    }

    /// A TSS with several 5' genes keeps only the closest one.
    ///
    /// Internal and antisense associations are left alone. Ties go to the gene
    /// seen first.
    fn drop_distant_five_prime(hits: &mut [Vec<GeneHit>]) {
        for point_hits in hits.iter_mut().filter(|h| h.len() > 1) {
            let mut closest: Option<(Position, usize)> = None;
            for hit in point_hits.iter() {
                if let Some(distance) = hit.association.distance {
                    if closest.is_none_or(|(best, _)| distance < best) {
                        closest = Some((distance, hit.gene));
                    }
                }
            }

            if let Some((_, keep)) = closest {
                point_hits.retain(|hit| !hit.association.is_five_prime() || hit.gene == keep);
            }
        }
    }
}

/// Classify `points` against `genes` under `config`.
pub fn classify<P: Sync, Q: Sync>(
    points: &[PointFeature<Q>],
    genes: &[Interval<P>],
    config: ClassifyConfig,
) -> TssGeneMap {
    TssClassifier::new(config).classify(points, genes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tss(pos: Position, strand: Strand) -> PointFeature {
        PointFeature::new("genomeX", pos, strand)
    }

    fn gene(start: Position, end: Position, strand: Strand) -> Interval {
        Interval::new("genomeX", "g", "g", start, end, strand)
    }

    fn location(point: &PointFeature, gene: &Interval) -> Option<TssLocation> {
        TssClassifier::default()
            .associate(point, gene)
            .map(|a| a.location)
    }

    #[test]
    fn test_five_prime_distance() {
        let plus = gene(10, 100, Strand::Plus);
        let minus = gene(10, 100, Strand::Minus);

        assert_eq!(five_prime_distance(&tss(5, Strand::Plus), &plus), 5);
        assert_eq!(five_prime_distance(&tss(105, Strand::Plus), &plus), -95);
        assert_eq!(five_prime_distance(&tss(2, Strand::Minus), &minus), -98);
        assert_eq!(five_prime_distance(&tss(120, Strand::Minus), &minus), 20);
    }

    #[test]
    fn test_five_prime_association() {
        use TssLocation::*;
        let plus = gene(10, 100, Strand::Plus);
        let minus = gene(10, 100, Strand::Minus);

        assert_eq!(location(&tss(3, Strand::Plus), &plus), Some(FivePrime));
        assert_eq!(location(&tss(200, Strand::Plus), &plus), None);
        assert_eq!(location(&tss(10, Strand::Plus), &plus), Some(FivePrime));
        assert_eq!(location(&tss(10, Strand::Plus), &gene(1000, 1100, Strand::Plus)), None);
        assert_eq!(location(&tss(105, Strand::Minus), &minus), Some(FivePrime));
        assert_eq!(location(&tss(5, Strand::Minus), &minus), None);
        assert_eq!(location(&tss(100, Strand::Minus), &minus), Some(FivePrime));
        assert_eq!(location(&tss(1500, Strand::Plus), &gene(100, 100, Strand::Plus)), None);
    }

    #[test]
    fn test_leaderless_has_zero_distance() {
        let classifier = TssClassifier::default();
        let plus = classifier.associate(&tss(10, Strand::Plus), &gene(10, 100, Strand::Plus));
        let minus = classifier.associate(&tss(100, Strand::Minus), &gene(10, 100, Strand::Minus));

        assert_eq!(plus.unwrap().distance, Some(0));
        assert_eq!(minus.unwrap().distance, Some(0));
    }

    #[test]
    fn test_internal_association() {
        use TssLocation::*;
        let plus = gene(10, 100, Strand::Plus);
        let minus = gene(10, 100, Strand::Minus);

        assert_eq!(location(&tss(20, Strand::Plus), &plus), Some(Internal));
        assert_eq!(location(&tss(150, Strand::Plus), &plus), None);
        assert_eq!(location(&tss(100, Strand::Plus), &plus), Some(Internal));
        assert_eq!(location(&tss(10, Strand::Minus), &minus), Some(Internal));
        assert_eq!(location(&tss(20, Strand::Plus), &minus), Some(Antisense));
    }

    #[test]
    fn test_antisense_association() {
        use TssLocation::*;
        let minus = gene(10, 100, Strand::Minus);
        let far_minus = gene(1000, 1100, Strand::Minus);
        let plus = gene(10, 100, Strand::Plus);
        let far_plus = gene(1000, 1100, Strand::Plus);

        assert_eq!(location(&tss(50, Strand::Plus), &minus), Some(Antisense));
        assert_eq!(location(&tss(900, Strand::Plus), &far_minus), Some(Antisense));
        assert_eq!(location(&tss(200, Strand::Plus), &minus), Some(Antisense));
        assert_eq!(location(&tss(899, Strand::Plus), &far_minus), None);
        assert_eq!(location(&tss(201, Strand::Plus), &minus), None);
        assert_eq!(location(&tss(50, Strand::Minus), &plus), Some(Antisense));
        assert_eq!(location(&tss(900, Strand::Minus), &far_plus), Some(Antisense));
        assert_eq!(location(&tss(899, Strand::Minus), &far_plus), None);
        assert_eq!(location(&tss(201, Strand::Minus), &plus), None);
    }

    #[test]
    fn test_primary_and_secondary() {
        let genes = vec![gene(50, 100, Strand::Plus)];
        let points = vec![tss(30, Strand::Plus), tss(40, Strand::Plus)];

        let map = TssClassifier::default().classify(&points, &genes);

        assert_eq!(map.association(1, 0).unwrap().tss_type, TssType::Primary);
        assert_eq!(map.association(0, 0).unwrap().tss_type, TssType::Secondary);
    }

    #[test]
    fn test_equal_distance_first_seen_is_primary() {
        let genes = vec![gene(50, 100, Strand::Plus)];
        let points = vec![tss(40, Strand::Plus), tss(40, Strand::Plus)];

        let map = TssClassifier::default().classify(&points, &genes);

        assert_eq!(map.association(0, 0).unwrap().tss_type, TssType::Primary);
        assert_eq!(map.association(1, 0).unwrap().tss_type, TssType::Secondary);
    }

    #[test]
    fn test_only_closest_five_prime_gene_kept() {
        // TSS at 90 is 10 upstream of g0 and 160 upstream of g1, which starts inside g0
        let genes = vec![
            Interval::new("genomeX", "g0", "", 100, 400, Strand::Plus),
            Interval::new("genomeX", "g1", "", 250, 500, Strand::Plus),
            Interval::new("genomeX", "g2", "", 50, 150, Strand::Minus),
        ];
        let points = vec![tss(90, Strand::Plus)];

        let map = TssClassifier::default().classify(&points, &genes);
        let hits = map.get(0).unwrap().hits();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].gene, 0);
        assert_eq!(hits[0].association.distance, Some(10));
        assert_eq!(hits[1].gene, 2);
        assert_eq!(hits[1].association.location, TssLocation::Antisense);
    }

    #[test]
    fn test_internal_kept_next_to_five_prime() {
        let genes = vec![
            Interval::new("genomeX", "up", "", 10, 100, Strand::Plus),
            Interval::new("genomeX", "down", "", 120, 300, Strand::Plus),
        ];
        let points = vec![tss(80, Strand::Plus)];

        let map = TssClassifier::default().classify(&points, &genes);
        let status = map.get(0).unwrap();

        assert_eq!(status.association(0).unwrap().location, TssLocation::Internal);
        assert_eq!(status.association(1).unwrap().location, TssLocation::FivePrime);
        assert_eq!(status.association(1).unwrap().tss_type, TssType::Primary);
    }

    #[test]
    fn test_orphan() {
        let genes = vec![gene(1000, 2000, Strand::Plus)];
        let points = vec![tss(10, Strand::Plus), tss(10, Strand::Minus)];

        let map = TssClassifier::default().classify(&points, &genes);

        assert!(map.get(0).unwrap().is_orphan());
        assert!(map.get(1).unwrap().is_orphan());
        assert!(map.get(0).unwrap().hits().is_empty());
        assert_eq!(map.summary().orphans, 2);
    }

    #[test]
    fn test_sequences_are_respected() {
        let genes = vec![Interval::new("plasmid", "p", "", 10, 100, Strand::Plus)];
        let points = vec![
            PointFeature::new("chromosome", 5, Strand::Plus),
            PointFeature::new("plasmid", 5, Strand::Plus),
            PointFeature::new("", 5, Strand::Plus),
        ];

        let map = TssClassifier::default().classify(&points, &genes);

        assert!(map.get(0).unwrap().is_orphan());
        assert!(!map.get(1).unwrap().is_orphan());
        assert!(!map.get(2).unwrap().is_orphan());
    }

    #[test]
    fn test_primary_moves_when_unplaced_tss_goes_elsewhere() {
        let genes = vec![
            Interval::new("chr1", "G", "", 1000, 1500, Strand::Plus),
            Interval::new("chr2", "H", "", 910, 1500, Strand::Plus),
        ];
        let points = vec![
            PointFeature::new("", 900, Strand::Plus),
            PointFeature::new("chr1", 800, Strand::Plus),
        ];

        let map = TssClassifier::default().classify(&points, &genes);

        // The unplaced TSS is closer to H and leaves G
        assert_eq!(map.association(0, 0), None);
        assert_eq!(map.association(0, 1).unwrap().tss_type, TssType::Primary);

        let for_g = map.points_for_gene(0);
        assert_eq!(for_g.len(), 1);
        assert_eq!(for_g[0].0, 1);
        assert_eq!(for_g[0].1.distance, Some(200));
        assert_eq!(for_g[0].1.tss_type, TssType::Primary);
    }

    #[test]
    fn test_unbounded_windows() {
        let config = ClassifyConfig::new()
            .with_max_dist_5_prime(Position::MAX)
            .unwrap()
            .with_max_dist_antisense(Position::MAX)
            .unwrap();
        let genes = vec![gene(1000, 1500, Strand::Plus)];
        let points = vec![tss(900, Strand::Plus), tss(-5, Strand::Minus)];

        let map = TssClassifier::new(config).classify(&points, &genes);

        let sense = map.association(0, 0).unwrap();
        assert_eq!(sense.location, TssLocation::FivePrime);
        assert_eq!(sense.distance, Some(100));
        assert_eq!(sense.tss_type, TssType::Primary);
        assert_eq!(map.association(1, 0).unwrap().location, TssLocation::Antisense);
    }

    #[test]
    fn test_custom_windows() {
        let config = ClassifyConfig::new()
            .with_max_dist_5_prime(10)
            .unwrap()
            .with_max_dist_antisense(0)
            .unwrap();
        let classifier = TssClassifier::new(config);
        let plus = gene(100, 200, Strand::Plus);

        assert!(classifier.associate(&tss(90, Strand::Plus), &plus).is_some());
        assert!(classifier.associate(&tss(89, Strand::Plus), &plus).is_none());
        assert!(classifier.associate(&tss(100, Strand::Minus), &plus).is_some());
        assert!(classifier.associate(&tss(99, Strand::Minus), &plus).is_none());
        assert!(classifier.associate(&tss(201, Strand::Minus), &plus).is_none());
    }
}
