// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! tss-mapper: gene annotation reconciliation and TSS classification.
//!
//! Gene intervals from one or more annotation sources are reconciled into a
//! canonical set, then every transcriptional start site (TSS) is related to
//! the genes around it as a 5' (primary or secondary), internal or antisense
//! TSS, or marked as orphan.
//!
//! # Features
//!
//! - **Overlap-threshold merging**: duplicates collapse, sufficiently
//!   overlapping genes fuse into one interval carrying both names
//! - **Indexed classification**: candidate genes are found through a
//!   per-sequence, per-strand index
//! - **Parallel processing**: Uses Rayon for large inputs
//!
//! # Example
//!
//! ```rust,no_run
//! use tss_mapper::prelude::*;
//!
//! let annotation = read_genes("genes.gff", &GffFilter::default()).unwrap();
//! let table = read_tss_table("tss.tsv").unwrap();
//!
//! let genes = MergeCommand::new(MergeConfig::new()).merge(annotation.genes);
//! let map = TssClassifier::new(ClassifyConfig::default()).classify(&table.points, &genes);
//! write_report(std::io::stdout(), &table.points, &genes, &map).unwrap();
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod format;
pub mod genome;
pub mod gff;
pub mod index;
pub mod interval;
pub mod parallel;
pub mod report;
pub mod tss_table;

// Re-export commonly used types
pub use commands::classify::classify;
pub use commands::merge::merge;
pub use error::{Error, Result};
pub use index::IntervalIndex;
pub use interval::{Interval, PointFeature, Position, Strand};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::commands::{
        GeneMerger, IgrCommand, MergeCommand, TssClassifier, TssGeneMap, TssLocation, TssStatus,
        TssType,
    };
    pub use crate::config::{ClassifyConfig, MergeConfig};
    pub use crate::format::Classification;
    pub use crate::genome::Genome;
    pub use crate::gff::{read_genes, GffFilter, GffRecord, GffWriter};
    pub use crate::index::IntervalIndex;
    pub use crate::interval::{Interval, PointFeature, Position, Strand};
    pub use crate::report::write_report;
    pub use crate::tss_table::read_tss_table;
}
