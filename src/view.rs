//! Derived views.
//!
//! A [`ViewModel`] is an immutable value computed from a dictionary, a selection
//! and the view settings. Callers re-derive it when any input changes; nothing
//! in it is updated in place.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregate::{
    build_heatmap, summarize_feature, variable_columns, FeatureSummary, Heatmap, TrackAxis,
};
use crate::config::{ConfigError, ViewSettings};
use crate::filter::select_proteoforms;
use crate::formats::pdb::parse_pdb_str;
use crate::model::VariantDictionary;
use crate::position::build_position_table;
use crate::stats::{ks_uniformity_test, UniformityTest};
use crate::structure::{build_residue_records, ResidueRecord, StructureLookup};

/// Errors raised when a selection cannot be turned into a view.
#[derive(Error, Debug)]
pub enum ViewError {
    #[error("Unknown feature: {0}")]
    UnknownFeature(String),

    #[error("Feature '{0}' has no allocated protein")]
    NoAllocatedProtein(String),

    #[error("Feature '{feature}' has no chain '{chain}'")]
    UnknownChain { feature: String, chain: String },

    #[error("Feature '{0}' has no chain sequences")]
    NoChains(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] ConfigError),
}

/// What the user is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Selection {
    pub feature: String,
    /// Chain identifier; the first chain of the protein when absent
    pub chain: Option<String>,
}

impl Selection {
    pub fn new(feature: impl Into<String>, chain: Option<String>) -> Self {
        Self {
            feature: feature.into(),
            chain,
        }
    }
}

/// Everything the presentation layer needs for one feature and chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewModel {
    pub feature: String,
    pub chain: String,
    pub settings: ViewSettings,
    /// Selected proteoforms in display order
    pub proteoforms: Vec<String>,
    pub heatmap: Heatmap,
    pub summary: FeatureSummary,
    /// Spacing of variable heatmap columns
    pub uniformity: UniformityTest,
    pub residues: Vec<ResidueRecord>,
}

/// Derives the view of `selection`, reading residue assignments from the
/// structure embedded in the dictionary when there is one.
pub fn derive_view(
    dictionary: &VariantDictionary,
    selection: &Selection,
    settings: &ViewSettings,
) -> Result<ViewModel, ViewError> {
    derive_view_with_structure(dictionary, selection, settings, None)
}

/// Derives the view of `selection`. An explicit `structure` takes precedence
/// over the one embedded in the dictionary.
pub fn derive_view_with_structure(
    dictionary: &VariantDictionary,
    selection: &Selection,
    settings: &ViewSettings,
    structure: Option<&dyn StructureLookup>,
) -> Result<ViewModel, ViewError> {
    settings.validate()?;

    let feature_name = selection.feature.as_str();
    let feature = dictionary
        .feature(feature_name)
        .ok_or_else(|| ViewError::UnknownFeature(feature_name.to_string()))?;
    let protein = feature
        .allocated_protein
        .as_ref()
        .ok_or_else(|| ViewError::NoAllocatedProtein(feature_name.to_string()))?;

    let chain = match &selection.chain {
        Some(chain) => chain.clone(),
        None => protein
            .chain_identifiers()
            .next()
            .map(str::to_string)
            .ok_or_else(|| ViewError::NoChains(feature_name.to_string()))?,
    };
    let sequence = protein
        .chain_sequences
        .get(&chain)
        .ok_or_else(|| ViewError::UnknownChain {
            feature: feature_name.to_string(),
            chain: chain.clone(),
        })?;

    let selected = select_proteoforms(protein, &settings.filter);
    let truncate = settings.truncate_after_first_termination;
    let table = build_position_table(
        sequence,
        selected
            .iter()
            .filter_map(|id| protein.proteoforms.get(id).map(|p| (id.as_str(), p))),
        truncate,
    );
    let axis = TrackAxis::new(protein, &selected);

    let heatmap = build_heatmap(&table, &axis, settings.ambiguity_mode);
    let summary = summarize_feature(protein, sequence, &axis, truncate);
    let variable = variable_columns(&table, &axis, settings.ambiguity_mode);
    let uniformity = ks_uniformity_test(heatmap.positions.len() as u64, &variable);

    let embedded = match (structure, protein.pdb.as_deref()) {
        (None, Some(pdb)) => match parse_pdb_str(pdb) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!(feature = feature_name, error = %e, "ignoring embedded structure");
                None
            }
        },
        _ => None,
    };
    let lookup: Option<&dyn StructureLookup> = match structure {
        Some(structure) => Some(structure),
        None => embedded.as_ref().map(|s| s as &dyn StructureLookup),
    };
    let residues = match lookup {
        Some(lookup) => build_residue_records(lookup, &chain, &table, &axis, settings),
        None => {
            debug!(feature = feature_name, "no structure available");
            Vec::new()
        }
    };

    info!(
        feature = feature_name,
        chain = %chain,
        proteoforms = selected.len(),
        positions = heatmap.positions.len(),
        variable_columns = variable.len(),
        residues = residues.len(),
        "derived view"
    );

    Ok(ViewModel {
        feature: feature_name.to_string(),
        chain,
        settings: settings.clone(),
        proteoforms: selected,
        heatmap,
        summary,
        uniformity,
        residues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterSettings;
    use crate::formats::dictionary::parse_dictionary_str;
    use crate::formats::schema::StructuralValidator;

    const DOCUMENT: &str = r#"{
        "chromosome": "chr1",
        "samples": {"s1": {}, "s2": {}, "s3": {}, "s4": {}, "s5": {}},
        "features": {
            "geneA": {
                "annotations": {"class": "core"},
                "allocatedProtein": {
                    "chainSequences": {"A": "MAGV", "B": "MK"},
                    "proteoforms": {
                        "WildType": {"samples": ["s5"], "annotations": {"VP": 0, "PT": "false", "vSwab": ""}},
                        "PF1": {"samples": ["s1", "s2", "s3"], "annotations": {"VP": 25, "PT": "false", "vSwab": "L@2+0"}},
                        "PF2": {"samples": ["s4"], "annotations": {"VP": 50, "PT": "true", "vSwab": "*@3+0"}}
                    }
                }
            },
            "geneB": {"allocatedProtein": {}}
        }
    }"#;

    fn dictionary() -> VariantDictionary {
        parse_dictionary_str(DOCUMENT, &StructuralValidator).unwrap()
    }

    #[test]
    fn test_derive_view_defaults_to_first_chain() {
        let view = derive_view(&dictionary(), &Selection::new("geneA", None), &ViewSettings::default()).unwrap();
        assert_eq!(view.chain, "A");
        assert_eq!(view.proteoforms, vec!["PF2", "PF1"]);
        assert_eq!(view.heatmap.positions.len(), 4);
        assert_eq!(view.summary.total_samples, 5);
        assert!(view.residues.is_empty());
        // Columns 2 and 3 are variable
        assert!(matches!(view.uniformity, UniformityTest::Tested(_)));
    }

    #[test]
    fn test_derive_view_is_idempotent() {
        let dictionary = dictionary();
        let selection = Selection::new("geneA", Some("A".to_string()));
        let settings = ViewSettings::default();
        let first = serde_json::to_string(&derive_view(&dictionary, &selection, &settings).unwrap()).unwrap();
        let second = serde_json::to_string(&derive_view(&dictionary, &selection, &settings).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_filter_leaves_wild_type_rows() {
        let settings = ViewSettings {
            filter: FilterSettings {
                min_sample_count: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        let view = derive_view(&dictionary(), &Selection::new("geneA", None), &settings).unwrap();
        assert!(view.proteoforms.is_empty());
        assert_eq!(view.heatmap.tracks.len(), 2);
        assert_eq!(
            view.uniformity,
            UniformityTest::InsufficientData { variable_positions: 0 }
        );
    }

    #[test]
    fn test_selection_errors() {
        let dictionary = dictionary();
        let settings = ViewSettings::default();
        assert!(matches!(
            derive_view(&dictionary, &Selection::new("geneZ", None), &settings),
            Err(ViewError::UnknownFeature(_))
        ));
        assert!(matches!(
            derive_view(&dictionary, &Selection::new("geneB", None), &settings),
            Err(ViewError::NoAllocatedProtein(_))
        ));
        assert!(matches!(
            derive_view(&dictionary, &Selection::new("geneA", Some("C".to_string())), &settings),
            Err(ViewError::UnknownChain { .. })
        ));

        let invalid = ViewSettings {
            hydropathicity_window: 2,
            ..Default::default()
        };
        assert!(matches!(
            derive_view(&dictionary, &Selection::new("geneA", None), &invalid),
            Err(ViewError::InvalidSettings(_))
        ));
    }

    #[test]
    fn test_embedded_structure_yields_residues() {
        let mut dictionary = dictionary();
        let pdb = "\
ATOM      1  N   MET A   1      11.104   6.134  -6.504  1.00  0.00           N
ATOM      2  N   ALA A   2      10.000   5.000  -4.000  1.00  0.00           N
ATOM      3  N   GLY A   3       9.000   4.000  -3.000  1.00  0.00           N
";
        let protein = dictionary
            .features
            .values()
            .next()
            .and_then(|f| f.allocated_protein.clone())
            .unwrap();
        let feature = dictionary.feature("geneA").cloned().unwrap();
        dictionary.features.insert(
            "geneA",
            crate::model::Feature {
                allocated_protein: Some(crate::model::AllocatedProtein {
                    pdb: Some(pdb.to_string()),
                    ..protein
                }),
                ..feature
            },
        );

        let view = derive_view(&dictionary, &Selection::new("geneA", None), &ViewSettings::default()).unwrap();
        assert_eq!(view.residues.len(), 3);
        assert!(view.residues.iter().all(|r| r.position.is_some()));
        assert!(view.residues[1].variability.unwrap() > 0.0);
    }
}
