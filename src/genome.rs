//! Sequence lengths for the intergenic region finder.
//!
//! Lengths come from GFF `##sequence-region` pragmas and `region` features, or
//! from a sizes file with one `seq_id<TAB>length` row per sequence.

use log::warn;
use memchr::memchr;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Sequence lengths, kept in the order sequences were first declared.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    lengths: Vec<(String, u64)>,
    slots: FxHashMap<String, usize>,
}

impl Genome {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a sizes file. Rows that are not `seq_id<TAB>length` are skipped
    /// with a warning.
    pub fn from_reader<R: Read>(reader: R) -> io::Result<Self> {
        let mut genome = Self::new();

        for (line_num, line) in BufReader::new(reader).lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match parse_sizes_row(line) {
                Some((seq_id, length)) => genome.insert(seq_id.to_string(), length),
                None => warn!("Skipping sizes row at line {}: {}", line_num + 1, line),
            }
        }

        Ok(genome)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::from_reader(File::open(path)?)
    }

    /// Length of a sequence.
    #[inline]
    pub fn size(&self, seq_id: &str) -> Option<u64> {
        self.slots.get(seq_id).map(|&slot| self.lengths[slot].1)
    }

    #[inline]
    pub fn has_sequence(&self, seq_id: &str) -> bool {
        self.slots.contains_key(seq_id)
    }

    /// `(seq_id, length)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.lengths.iter().map(|(seq_id, len)| (seq_id.as_str(), *len))
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Set the length of a sequence. A redeclared sequence keeps its position.
    pub fn insert(&mut self, seq_id: String, length: u64) {
        match self.slots.get(&seq_id) {
            Some(&slot) => self.lengths[slot].1 = length,
            None => {
                self.slots.insert(seq_id.clone(), self.lengths.len());
                self.lengths.push((seq_id, length));
            }
        }
    }

    /// Take over lengths from `other` for sequences not declared here.
    pub fn fill_missing(&mut self, other: &Genome) {
        for (seq_id, length) in other.iter() {
            if !self.has_sequence(seq_id) {
                self.insert(seq_id.to_string(), length);
            }
        }
    }
}

fn parse_sizes_row(line: &str) -> Option<(&str, u64)> {
    let tab = memchr(b'\t', line.as_bytes())?;
    let seq_id = &line[..tab];
    let rest = &line[tab + 1..];
    let length = match memchr(b'\t', rest.as_bytes()) {
        Some(end) => &rest[..end],
        None => rest,
    };
    if seq_id.is_empty() {
        return None;
    }
    Some((seq_id, length.trim().parse().ok()?))
}
