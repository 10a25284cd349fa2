//! Command implementations for tss-mapper.

pub mod classify;
pub mod igr;
pub mod merge;

pub use classify::{
    Association, ClassificationSummary, GeneHit, TssClassifier, TssGeneMap, TssLocation,
    TssStatus, TssType,
};
pub use igr::{IgrCommand, IntergenicRegion};
pub use merge::{GeneMerger, MergeCommand, MergeStats};
