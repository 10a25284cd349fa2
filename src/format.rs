//! Categorical encodings of TSS classifications.

use crate::commands::classify::{Association, TssLocation, TssType};

/// Column order of the binary encoding.
pub const BINARY_HEADER: [&str; 4] = ["Primary", "Secondary", "Internal", "Antisense"];

/// Text rendered for a TSS without any gene.
pub const ORPHAN_LABEL: &str = "orphan";

/// Placed between location and TSS type in the text form.
pub const TYPE_SEPARATOR: &str = " - ";

/// What a report row describes: an orphan TSS or one (TSS, gene) association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    Orphan,
    Gene(&'a Association),
}

impl Classification<'_> {
    /// Flags in [`BINARY_HEADER`] order.
    ///
    /// A 5' association whose type was never set has no encoding.
    pub fn binary(&self) -> Option<[u8; 4]> {
        let association = match self {
            Classification::Orphan => return Some([0, 0, 0, 0]),
            Classification::Gene(association) => association,
        };
        match (association.location, association.tss_type) {
            (TssLocation::FivePrime, TssType::Primary) => Some([1, 0, 0, 0]),
            (TssLocation::FivePrime, TssType::Secondary) => Some([0, 1, 0, 0]),
            (TssLocation::FivePrime, TssType::Unset) => None,
            (TssLocation::Internal, _) => Some([0, 0, 1, 0]),
            (TssLocation::Antisense, _) => Some([0, 0, 0, 1]),
        }
    }

    /// Human readable form, e.g. `5' region - primary`.
    pub fn label(&self) -> String {
        match self {
            Classification::Orphan => ORPHAN_LABEL.to_string(),
            Classification::Gene(association) => match association.tss_type.as_str() {
                Some(tss_type) => format!(
                    "{}{}{}",
                    association.location.as_str(),
                    TYPE_SEPARATOR,
                    tss_type
                ),
                None => association.location.as_str().to_string(),
            },
        }
    }
}
