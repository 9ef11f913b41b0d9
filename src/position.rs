//! Relative positions and the per-position variant table.
//!
//! A position is a `(residue, offset)` pair: offset 0 exists in the wild type
//! sequence, offsets above 0 are insertions after that residue. Positions sort
//! by residue first, then by offset, so insertions follow the residue they
//! are inserted after.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Proteoform, VariantCall, WILD_TYPE_ID};

/// Track holding the wild type content of the gene (always upper case).
pub const WILD_TYPE_GENE_TRACK: &str = "Wild Type Gene";
/// Track holding the wild type content confidently part of the translated protein.
pub const WILD_TYPE_PROTEIN_TRACK: &str = "Wild Type Protein";

/// Errors raised when parsing a serialized position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("expected '<residue>+<offset>', got '{0}'")]
    InvalidFormat(String),

    #[error("invalid residue position '{0}'")]
    InvalidResidue(String),

    #[error("invalid insertion offset '{0}'")]
    InvalidOffset(String),
}

/// A column of the variant heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// 1-based residue position in the wild type sequence
    pub residue: u32,
    /// 0 for wild type residues, > 0 for inserted positions
    pub offset: u32,
}

impl Position {
    pub fn new(residue: u32, offset: u32) -> Self {
        Self { residue, offset }
    }

    pub fn is_insertion(&self) -> bool {
        self.offset > 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}+{}", self.residue, self.offset)
    }
}

impl FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (residue, offset) = s
            .trim()
            .split_once('+')
            .ok_or_else(|| PositionError::InvalidFormat(s.to_string()))?;
        let residue = residue
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|r| *r >= 1)
            .ok_or_else(|| PositionError::InvalidResidue(residue.to_string()))?;
        let offset = offset
            .trim()
            .parse::<u32>()
            .map_err(|_| PositionError::InvalidOffset(offset.to_string()))?;
        Ok(Self { residue, offset })
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Position {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Per-position content of each track (proteoform or wild type track).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionVariantTable {
    entries: BTreeMap<Position, BTreeMap<String, char>>,
}

impl PositionVariantTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `content` for `track` at `position`. The first write wins; returns
    /// false when an entry already existed.
    pub fn insert(&mut self, position: Position, track: &str, content: char) -> bool {
        let tracks = self.entries.entry(position).or_default();
        if tracks.contains_key(track) {
            return false;
        }
        tracks.insert(track.to_string(), content);
        true
    }

    /// Explicit content of `track` at `position`, without fallback.
    pub fn get(&self, position: &Position, track: &str) -> Option<char> {
        self.entries.get(position)?.get(track).copied()
    }

    /// Wild type gene content; absent for insertions.
    pub fn wild_type(&self, position: &Position) -> Option<char> {
        self.get(position, WILD_TYPE_GENE_TRACK)
    }

    /// Content of `track`, falling back to the wild type gene content.
    pub fn resolve(&self, position: &Position, track: &str) -> Option<char> {
        self.get(position, track).or_else(|| self.wild_type(position))
    }

    pub fn contains(&self, position: &Position) -> bool {
        self.entries.contains_key(position)
    }

    /// All positions ever inserted, in canonical order.
    pub fn ordered_positions(&self) -> Vec<Position> {
        self.entries.keys().copied().collect()
    }

    /// Number of distinct inserted positions.
    pub fn insertion_count(&self) -> usize {
        self.entries.keys().filter(|p| p.is_insertion()).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Calls of a proteoform in file order. With truncation enabled, calls after the
/// first termination are dropped. Malformed calls are logged and skipped.
pub fn effective_calls(
    proteoform_id: &str,
    proteoform: &Proteoform,
    truncate_after_first_termination: bool,
) -> Vec<VariantCall> {
    let mut calls = Vec::new();
    for call in proteoform.iter_calls() {
        let call = match call {
            Ok(call) => call,
            Err(e) => {
                warn!(proteoform = proteoform_id, error = %e, "skipping variant call");
                continue;
            }
        };
        calls.push(call);
        if truncate_after_first_termination && call.is_termination() {
            break;
        }
    }
    calls
}

/// Builds the per-position table for one chain.
///
/// The wild type sequence seeds the gene track at every residue (upper-cased)
/// and the protein track where the source symbol is already upper case. Each
/// proteoform then adds its calls under its own identifier. The `WildType`
/// proteoform itself contributes no calls.
pub fn build_position_table<'a, I>(
    wild_type_sequence: &str,
    proteoforms: I,
    truncate_after_first_termination: bool,
) -> PositionVariantTable
where
    I: IntoIterator<Item = (&'a str, &'a Proteoform)>,
{
    let mut table = PositionVariantTable::new();

    for (index, content) in wild_type_sequence.chars().enumerate() {
        let position = Position::new(index as u32 + 1, 0);
        let upper = content.to_ascii_uppercase();
        table.insert(position, WILD_TYPE_GENE_TRACK, upper);
        if content == upper {
            table.insert(position, WILD_TYPE_PROTEIN_TRACK, content);
        }
    }

    for (id, proteoform) in proteoforms {
        if id == WILD_TYPE_ID {
            continue;
        }
        let calls = effective_calls(id, proteoform, truncate_after_first_termination);
        let mut kept = 0usize;
        for call in &calls {
            if table.insert(call.position, id, call.content) {
                kept += 1;
            }
        }
        debug!(proteoform = id, calls = calls.len(), kept, "indexed proteoform");
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProteoformAnnotations;

    fn proteoform(samples: usize, variants: &str) -> Proteoform {
        Proteoform {
            samples: (0..samples).map(|i| format!("s{}", i)).collect(),
            annotations: ProteoformAnnotations {
                variants: variants.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_position_ordering() {
        let mut positions = vec![
            Position::new(10, 0),
            Position::new(2, 1),
            Position::new(2, 0),
            Position::new(9, 3),
            Position::new(2, 2),
        ];
        positions.sort();
        let labels: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["2+0", "2+1", "2+2", "9+3", "10+0"]);
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("12+3".parse::<Position>().unwrap(), Position::new(12, 3));
        assert!(matches!("12".parse::<Position>(), Err(PositionError::InvalidFormat(_))));
        assert!(matches!("0+0".parse::<Position>(), Err(PositionError::InvalidResidue(_))));
        assert!(matches!("1+-1".parse::<Position>(), Err(PositionError::InvalidOffset(_))));
    }

    #[test]
    fn test_position_serializes_as_string() {
        let json = serde_json::to_string(&Position::new(4, 1)).unwrap();
        assert_eq!(json, "\"4+1\"");
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Position::new(4, 1));
    }

    #[test]
    fn test_wild_type_only() {
        let table = build_position_table("MaGv", Vec::<(&str, &Proteoform)>::new(), true);
        let positions = table.ordered_positions();
        assert_eq!(positions.len(), 4);
        assert!(positions.iter().all(|p| p.offset == 0));

        let gene: String = positions.iter().filter_map(|p| table.wild_type(p)).collect();
        assert_eq!(gene, "MAGV");

        assert_eq!(table.get(&Position::new(1, 0), WILD_TYPE_PROTEIN_TRACK), Some('M'));
        assert_eq!(table.get(&Position::new(2, 0), WILD_TYPE_PROTEIN_TRACK), None);
        assert_eq!(table.get(&Position::new(3, 0), WILD_TYPE_PROTEIN_TRACK), Some('G'));
        assert_eq!(table.get(&Position::new(4, 0), WILD_TYPE_PROTEIN_TRACK), None);
    }

    #[test]
    fn test_first_writer_wins() {
        let pf = proteoform(1, "A@2+0|L@2+0");
        let table = build_position_table("MAGV", vec![("PF1", &pf)], true);
        assert_eq!(table.get(&Position::new(2, 0), "PF1"), Some('A'));
    }

    #[test]
    fn test_insertions_interleave() {
        let pf1 = proteoform(1, "K@3+1|R@3+2");
        let pf2 = proteoform(1, "W@1+1|E@3+1");
        let table = build_position_table("MAGV", vec![("PF1", &pf1), ("PF2", &pf2)], true);

        let labels: Vec<String> = table.ordered_positions().iter().map(|p| p.to_string()).collect();
        assert_eq!(labels, vec!["1+0", "1+1", "2+0", "3+0", "3+1", "3+2", "4+0"]);
        assert_eq!(table.insertion_count(), 3);
        assert_eq!(table.wild_type(&Position::new(3, 1)), None);
        assert_eq!(table.get(&Position::new(3, 1), "PF2"), Some('E'));
        assert_eq!(table.ordered_positions()[5], Position::new(3, 2));
    }

    #[test]
    fn test_truncation_after_termination() {
        let pf = proteoform(1, "*@2+0|A@3+0|L@4+0");
        let truncated = build_position_table("MAGV", vec![("PF1", &pf)], true);
        assert_eq!(truncated.get(&Position::new(2, 0), "PF1"), Some('*'));
        assert_eq!(truncated.get(&Position::new(3, 0), "PF1"), None);
        // Falls back to the wild type past the stop
        assert_eq!(truncated.resolve(&Position::new(3, 0), "PF1"), Some('G'));

        let full = build_position_table("MAGV", vec![("PF1", &pf)], false);
        assert_eq!(full.get(&Position::new(4, 0), "PF1"), Some('L'));
    }

    #[test]
    fn test_wild_type_proteoform_and_malformed_calls_skipped() {
        let wt = proteoform(2, "A@1+0");
        let pf = proteoform(1, "broken|C@4+0");
        let table = build_position_table("MAGV", vec![("WildType", &wt), ("PF1", &pf)], true);
        assert_eq!(table.get(&Position::new(1, 0), "WildType"), None);
        assert_eq!(table.get(&Position::new(4, 0), "PF1"), Some('C'));
    }
}
