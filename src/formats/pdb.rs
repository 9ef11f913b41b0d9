//! PDB residue assignment reader.
//!
//! Only the facts needed for residue records are extracted:
//! - `ATOM` records give the residue type of each (chain, residue number); the
//!   first atom of a residue wins
//! - `HELIX` and `SHEET` records give secondary structure ranges
//!
//! Residues outside any range are coil. Columns follow the fixed-width PDB layout.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, trace};

use crate::codec::{Residue, SecondaryStructure};
use crate::structure::{StructureLookup, StructureResidue};

/// Errors that can occur during PDB parsing.
#[derive(Error, Debug)]
pub enum PdbError {
    #[error("No ATOM records found")]
    NoAtoms,

    #[error("Line {line}: record too short for {record}")]
    TruncatedRecord { line: usize, record: String },

    #[error("Line {line}: invalid residue number '{value}'")]
    InvalidResidueNumber { line: usize, value: String },
}

/// Result type for PDB operations.
pub type PdbResult<T> = Result<T, PdbError>;

/// Residue assignments of all chains of a structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdbStructure {
    chain_order: Vec<String>,
    chains: BTreeMap<String, BTreeMap<i32, StructureResidue>>,
}

/// Fixed-width column slice, empty when the line is too short.
fn columns(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("").trim()
}

fn residue_number(line: &str, start: usize, end: usize, line_no: usize) -> PdbResult<i32> {
    let value = columns(line, start, end);
    value.parse().map_err(|_| PdbError::InvalidResidueNumber {
        line: line_no,
        value: value.to_string(),
    })
}

fn chain_id(line: &str, column: usize) -> String {
    columns(line, column, column + 1).to_string()
}

/// A secondary structure range from a HELIX or SHEET record.
struct Range {
    chain: String,
    start: i32,
    end: i32,
    class: SecondaryStructure,
}

/// Parses PDB content from a string.
pub fn parse_pdb_str(content: &str) -> PdbResult<PdbStructure> {
    let mut structure = PdbStructure::default();
    let mut ranges = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line_no = index + 1;
        let record = columns(line, 0, 6);
        match record {
            "ATOM" => {
                if line.len() < 26 {
                    return Err(PdbError::TruncatedRecord {
                        line: line_no,
                        record: record.to_string(),
                    });
                }
                let name = columns(line, 17, 20);
                let chain = chain_id(line, 21);
                let number = residue_number(line, 22, 26, line_no)?;
                let residue = Residue::from_name(name).unwrap_or_else(|_| {
                    trace!(line = line_no, residue = name, "non-standard residue name");
                    Residue::Any
                });
                structure.add_residue(chain, number, residue);
            }
            "HELIX" => {
                if line.len() < 37 {
                    return Err(PdbError::TruncatedRecord {
                        line: line_no,
                        record: record.to_string(),
                    });
                }
                ranges.push(Range {
                    chain: chain_id(line, 19),
                    start: residue_number(line, 21, 25, line_no)?,
                    end: residue_number(line, 33, 37, line_no)?,
                    class: SecondaryStructure::Helix,
                });
            }
            "SHEET" => {
                if line.len() < 37 {
                    return Err(PdbError::TruncatedRecord {
                        line: line_no,
                        record: record.to_string(),
                    });
                }
                ranges.push(Range {
                    chain: chain_id(line, 21),
                    start: residue_number(line, 22, 26, line_no)?,
                    end: residue_number(line, 33, 37, line_no)?,
                    class: SecondaryStructure::Sheet,
                });
            }
            // Only the first model is read
            "ENDMDL" => break,
            _ => {}
        }
    }

    if structure.chains.is_empty() {
        return Err(PdbError::NoAtoms);
    }

    for range in ranges.iter().filter(|r| r.start <= r.end) {
        if let Some(residues) = structure.chains.get_mut(&range.chain) {
            for (_, residue) in residues.range_mut(range.start..=range.end) {
                residue.secondary_structure = range.class;
            }
        }
    }

    debug!(
        chains = structure.chain_order.len(),
        ranges = ranges.len(),
        "parsed structure"
    );
    Ok(structure)
}

impl PdbStructure {
    fn add_residue(&mut self, chain: String, index: i32, residue: Residue) {
        if !self.chains.contains_key(&chain) {
            self.chain_order.push(chain.clone());
        }
        self.chains
            .entry(chain)
            .or_default()
            .entry(index)
            .or_insert(StructureResidue {
                index,
                residue,
                secondary_structure: SecondaryStructure::Coil,
            });
    }

    pub fn residue_count(&self) -> usize {
        self.chains.values().map(BTreeMap::len).sum()
    }
}

impl StructureLookup for PdbStructure {
    fn chain_identifiers(&self) -> Vec<String> {
        self.chain_order.clone()
    }

    fn chain_residues(&self, chain: &str) -> Vec<StructureResidue> {
        self.chains
            .get(chain)
            .map(|residues| residues.values().copied().collect())
            .unwrap_or_default()
    }

    fn residue(&self, chain: &str, index: i32) -> Option<StructureResidue> {
        self.chains.get(chain)?.get(&index).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
HEADER    TEST PROTEIN
HELIX    1   1 MET A    1  ALA A    2  1                                   2
SHEET    1   A 2 GLY A   3  VAL A   4  0
ATOM      1  N   MET A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  CA  MET A   1      11.639   6.071  -5.147  1.00  0.00           C
ATOM      3  N   ALA A   2      10.000   5.000  -4.000  1.00  0.00           N
ATOM      4  N   GLY A   3       9.000   4.000  -3.000  1.00  0.00           N
ATOM      5  N   VAL A   4       8.000   3.000  -2.000  1.00  0.00           N
ATOM      6  N   MSE A   5       7.000   2.000  -1.000  1.00  0.00           N
ATOM      7  N   LYS B  10       1.000   1.000   1.000  1.00  0.00           N
END
";

    #[test]
    fn test_parse_residues_and_ranges() {
        let structure = parse_pdb_str(SAMPLE).unwrap();
        assert_eq!(structure.chain_identifiers(), vec!["A", "B"]);
        assert_eq!(structure.residue_count(), 6);

        let chain_a = structure.chain_residues("A");
        let symbols: String = chain_a.iter().map(|r| r.residue.symbol()).collect();
        assert_eq!(symbols, "MAGVX");

        let classes: Vec<SecondaryStructure> =
            chain_a.iter().map(|r| r.secondary_structure).collect();
        assert_eq!(
            classes,
            vec![
                SecondaryStructure::Helix,
                SecondaryStructure::Helix,
                SecondaryStructure::Sheet,
                SecondaryStructure::Sheet,
                SecondaryStructure::Coil,
            ]
        );

        let lys = structure.residue("B", 10).unwrap();
        assert_eq!(lys.residue, Residue::Lys);
        assert_eq!(lys.secondary_structure, SecondaryStructure::Coil);
        assert!(structure.residue("B", 11).is_none());
    }

    #[test]
    fn test_no_atoms() {
        assert!(matches!(parse_pdb_str("HEADER only\n"), Err(PdbError::NoAtoms)));
    }

    #[test]
    fn test_invalid_residue_number() {
        let content = "ATOM      1  N   MET A   x      11.104   6.134  -6.504  1.00  0.00           N\n";
        assert!(matches!(
            parse_pdb_str(content),
            Err(PdbError::InvalidResidueNumber { line: 1, .. })
        ));
    }

    #[test]
    fn test_truncated_record() {
        assert!(matches!(
            parse_pdb_str("ATOM      1  N   MET\n"),
            Err(PdbError::TruncatedRecord { line: 1, .. })
        ));
    }
}
