//! Per-residue records of a protein structure.
//!
//! A structure source is anything that can list the residues of a chain with
//! their type and secondary structure, see [`StructureLookup`]. Residue records
//! combine that with the smoothed hydropathicity of the chain and, for residues
//! superposed onto a wild type position, the variability of that position.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use crate::aggregate::{position_composition, TrackAxis};
use crate::codec::{Residue, SecondaryStructure};
use crate::config::ViewSettings;
use crate::position::{Position, PositionVariantTable};
use crate::stats::{compute_variability, round_to, scaled_hydropathicity};

/// A residue as assigned by a structure file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StructureResidue {
    /// Residue sequence number within the chain
    pub index: i32,
    pub residue: Residue,
    pub secondary_structure: SecondaryStructure,
}

/// Read access to per-chain residue assignments.
pub trait StructureLookup {
    /// Chain identifiers in file order.
    fn chain_identifiers(&self) -> Vec<String>;

    /// Residues of `chain` in ascending index order; empty for unknown chains.
    fn chain_residues(&self, chain: &str) -> Vec<StructureResidue>;

    fn residue(&self, chain: &str, index: i32) -> Option<StructureResidue> {
        self.chain_residues(chain)
            .into_iter()
            .find(|r| r.index == index)
    }
}

fn serialize_residue<S: Serializer>(residue: &Residue, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(residue.name())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResidueRecord {
    pub chain: String,
    pub index: i32,
    #[serde(serialize_with = "serialize_residue")]
    pub residue: Residue,
    pub secondary_structure: SecondaryStructure,
    /// Scaled hydropathicity, absent for non-standard residues
    pub hydropathicity: Option<f64>,
    /// Variability of the superposed position
    pub variability: Option<f64>,
    /// Wild type position the residue is superposed onto
    pub position: Option<Position>,
}

/// Builds the residue records of one chain.
///
/// Residue `i` is superposed onto position `i+0` when the table holds that position.
pub fn build_residue_records(
    structure: &dyn StructureLookup,
    chain: &str,
    table: &PositionVariantTable,
    axis: &TrackAxis,
    settings: &ViewSettings,
) -> Vec<ResidueRecord> {
    let residues = structure.chain_residues(chain);
    let by_index: BTreeMap<i32, Residue> = residues.iter().map(|r| (r.index, r.residue)).collect();

    residues
        .iter()
        .map(|r| {
            let position = u32::try_from(r.index)
                .ok()
                .filter(|&index| index >= 1)
                .map(|index| Position::new(index, 0))
                .filter(|p| table.contains(p));
            let variability = position.map(|p| {
                let composition = position_composition(&p, axis, table);
                round_to(compute_variability(&composition, settings.ambiguity_mode), 2)
            });
            ResidueRecord {
                chain: chain.to_string(),
                index: r.index,
                residue: r.residue,
                secondary_structure: r.secondary_structure,
                hydropathicity: scaled_hydropathicity(
                    &by_index,
                    r.index,
                    settings.hydropathicity_window,
                    settings.hydropathicity_edge_weight,
                ),
                variability,
                position,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmbiguityMode;
    use crate::model::{AllocatedProtein, OrderedMap, Proteoform, ProteoformAnnotations};
    use crate::position::build_position_table;

    struct FixedChain(Vec<StructureResidue>);

    impl StructureLookup for FixedChain {
        fn chain_identifiers(&self) -> Vec<String> {
            vec!["A".to_string()]
        }

        fn chain_residues(&self, chain: &str) -> Vec<StructureResidue> {
            if chain == "A" {
                self.0.clone()
            } else {
                Vec::new()
            }
        }
    }

    fn residue(index: i32, symbol: char, ss: SecondaryStructure) -> StructureResidue {
        StructureResidue {
            index,
            residue: Residue::from_char(symbol).unwrap(),
            secondary_structure: ss,
        }
    }

    #[test]
    fn test_residue_records() {
        let variant = Proteoform {
            samples: vec!["s1".to_string(), "s2".to_string()],
            annotations: ProteoformAnnotations {
                variants: "g@2+0".to_string(),
                ..Default::default()
            },
        };
        let wild_type = Proteoform {
            samples: vec!["s3".to_string(), "s4".to_string()],
            ..Default::default()
        };
        let proteoforms: OrderedMap<Proteoform> =
            vec![("WildType", wild_type), ("PF1", variant)].into_iter().collect();
        let protein = AllocatedProtein {
            proteoforms,
            ..Default::default()
        };
        let selected = vec!["PF1".to_string()];
        let axis = TrackAxis::new(&protein, &selected);
        let table = build_position_table(
            "MAG",
            vec![("PF1", protein.proteoforms.get("PF1").unwrap())],
            true,
        );

        let structure = FixedChain(vec![
            residue(0, 'S', SecondaryStructure::Coil),
            residue(1, 'M', SecondaryStructure::Helix),
            residue(2, 'A', SecondaryStructure::Helix),
            residue(3, 'G', SecondaryStructure::Sheet),
        ]);

        let masked = build_residue_records(&structure, "A", &table, &axis, &ViewSettings::default());
        assert_eq!(masked.len(), 4);
        assert_eq!(masked[0].position, None);
        assert_eq!(masked[0].variability, None);
        assert_eq!(masked[1].position, Some(Position::new(1, 0)));
        assert_eq!(masked[1].secondary_structure, SecondaryStructure::Helix);
        assert_eq!(masked[2].variability, Some(0.0));
        assert!(masked.iter().all(|r| r.hydropathicity.is_some()));

        let shown = build_residue_records(
            &structure,
            "A",
            &table,
            &axis,
            &ViewSettings {
                ambiguity_mode: AmbiguityMode::Show,
                ..Default::default()
            },
        );
        assert_eq!(shown[2].variability, Some(0.22));

        assert!(build_residue_records(&structure, "B", &table, &axis, &ViewSettings::default()).is_empty());
        assert_eq!(structure.residue("A", 3).map(|r| r.residue), Some(Residue::Gly));
    }

    #[test]
    fn test_record_serialization() {
        let record = ResidueRecord {
            chain: "A".to_string(),
            index: 7,
            residue: Residue::Trp,
            secondary_structure: SecondaryStructure::Sheet,
            hydropathicity: Some(0.4),
            variability: None,
            position: Some(Position::new(7, 0)),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["residue"], "TRP");
        assert_eq!(json["secondary_structure"], "sheet");
        assert_eq!(json["position"], "7+0");
    }
}
