//! Aggregation of the position table over the proteoform axis.
//!
//! Everything here is a pure function of the position table, the track axis and
//! the settings:
//! - per-position composition (sample-weighted content counts)
//! - the sparse heatmap matrix with its per-column and per-row series
//! - feature level summaries
//! - the chromosome / class / feature overview tree

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::Residue;
use crate::config::AmbiguityMode;
use crate::model::{AllocatedProtein, VariantDictionary, WILD_TYPE_ID};
use crate::position::{
    effective_calls, Position, PositionVariantTable, WILD_TYPE_GENE_TRACK, WILD_TYPE_PROTEIN_TRACK,
};
use crate::stats::{compute_variability, round_to};

/// Composition of one position: content symbol to number of samples.
pub type Composition = BTreeMap<char, usize>;

/// Rows of the heatmap: selected proteoforms followed by the two wild type tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackAxis {
    tracks: Vec<String>,
    sample_counts: Vec<usize>,
}

impl TrackAxis {
    /// Builds the axis from an ordered selection. The wild type gene track carries
    /// the samples of `WildType`; the wild type protein track carries none.
    pub fn new(protein: &AllocatedProtein, selected: &[String]) -> Self {
        let mut tracks = Vec::with_capacity(selected.len() + 2);
        let mut sample_counts = Vec::with_capacity(selected.len() + 2);

        for id in selected {
            let count = match protein.proteoform(id) {
                Ok(proteoform) => proteoform.sample_count(),
                Err(e) => {
                    warn!(error = %e, "selected proteoform has no record");
                    0
                }
            };
            tracks.push(id.clone());
            sample_counts.push(count);
        }

        let wild_type_samples = protein.wild_type().map(|p| p.sample_count()).unwrap_or(0);
        tracks.push(WILD_TYPE_GENE_TRACK.to_string());
        sample_counts.push(wild_type_samples);
        tracks.push(WILD_TYPE_PROTEIN_TRACK.to_string());
        sample_counts.push(0);

        Self {
            tracks,
            sample_counts,
        }
    }

    pub fn tracks(&self) -> &[String] {
        &self.tracks
    }

    /// `(track, sample count)` pairs in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.tracks
            .iter()
            .map(String::as_str)
            .zip(self.sample_counts.iter().copied())
    }

    /// Selected proteoforms, without the wild type tracks.
    pub fn proteoform_ids(&self) -> impl Iterator<Item = &str> {
        self.tracks
            .iter()
            .map(String::as_str)
            .filter(|t| !is_wild_type_track(t))
    }

    pub fn row(&self, track: &str) -> Option<usize> {
        self.tracks.iter().position(|t| t == track)
    }

    pub fn sample_count(&self, track: &str) -> usize {
        self.row(track).map(|row| self.sample_counts[row]).unwrap_or(0)
    }

    pub fn total_samples(&self) -> usize {
        self.sample_counts.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

fn is_wild_type_track(track: &str) -> bool {
    track == WILD_TYPE_GENE_TRACK || track == WILD_TYPE_PROTEIN_TRACK
}

/// Sample-weighted content counts at `position`.
///
/// Each track except the wild type protein track contributes its sample count to
/// the bucket of its content; tracks without an entry fall back to the wild type
/// gene content. Tracks without any content (insertions) are left out.
pub fn position_composition(
    position: &Position,
    axis: &TrackAxis,
    table: &PositionVariantTable,
) -> Composition {
    let mut composition = Composition::new();
    for (track, samples) in axis.iter() {
        if track == WILD_TYPE_PROTEIN_TRACK {
            continue;
        }
        if let Some(content) = table.resolve(position, track) {
            *composition.entry(content).or_insert(0) += samples;
        }
    }
    composition
}

/// One explicit entry of the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HeatmapCell {
    /// Column: rank of the position
    pub x: usize,
    /// Row: rank of the track
    pub y: usize,
    /// Codec code of the upper-cased content
    pub code: u8,
    /// The source call was lower case
    pub ambiguous: bool,
}

/// Sparse heatmap with its per-column and per-row series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heatmap {
    /// Column labels
    pub positions: Vec<Position>,
    /// Row labels
    pub tracks: Vec<String>,
    pub cells: Vec<HeatmapCell>,
    /// Number of distinct content states per column
    pub variant_state_counts: Vec<usize>,
    pub compositions: Vec<Composition>,
    /// Variability per column, 2 decimals
    pub variability: Vec<f64>,
    /// Share of samples per row, 4 decimals
    pub sample_proportions: Vec<f64>,
}

/// Builds the heatmap. Cells are emitted column by column, in row order within a
/// column, and only where the table has an explicit entry.
pub fn build_heatmap(
    table: &PositionVariantTable,
    axis: &TrackAxis,
    ambiguity_mode: AmbiguityMode,
) -> Heatmap {
    let positions = table.ordered_positions();
    let mut cells = Vec::new();
    let mut variant_state_counts = Vec::with_capacity(positions.len());
    let mut compositions = Vec::with_capacity(positions.len());
    let mut variability = Vec::with_capacity(positions.len());

    for (x, position) in positions.iter().enumerate() {
        for (y, (track, _)) in axis.iter().enumerate() {
            let Some(content) = table.get(position, track) else {
                continue;
            };
            match Residue::from_char(content) {
                Ok(residue) => cells.push(HeatmapCell {
                    x,
                    y,
                    code: residue.code(),
                    ambiguous: content.is_lowercase(),
                }),
                Err(e) => {
                    warn!(%position, track, error = %e, "skipping heatmap cell");
                }
            }
        }

        let composition = position_composition(position, axis, table);
        variant_state_counts.push(composition.len());
        variability.push(round_to(compute_variability(&composition, ambiguity_mode), 2));
        compositions.push(composition);
    }

    let total = axis.total_samples();
    let sample_proportions = axis
        .iter()
        .map(|(_, samples)| {
            if total == 0 {
                0.0
            } else {
                round_to(samples as f64 / total as f64, 4)
            }
        })
        .collect();

    debug!(
        columns = positions.len(),
        rows = axis.len(),
        cells = cells.len(),
        "built heatmap"
    );

    Heatmap {
        positions,
        tracks: axis.tracks().to_vec(),
        cells,
        variant_state_counts,
        compositions,
        variability,
        sample_proportions,
    }
}

/// 1-based column ranks at which a selected proteoform differs from the wild type gene.
///
/// Lower-case entries only count in [`AmbiguityMode::Show`]. Inserted columns have no
/// wild type content, so any entry there counts.
pub fn variable_columns(
    table: &PositionVariantTable,
    axis: &TrackAxis,
    ambiguity_mode: AmbiguityMode,
) -> Vec<u64> {
    table
        .ordered_positions()
        .iter()
        .enumerate()
        .filter(|(_, position)| {
            let wild_type = table.wild_type(position);
            axis.proteoform_ids().any(|id| match table.get(position, id) {
                Some(content) if content.is_lowercase() && ambiguity_mode != AmbiguityMode::Show => {
                    false
                }
                Some(content) => Some(content.to_ascii_uppercase()) != wild_type,
                None => false,
            })
        })
        .map(|(rank, _)| rank as u64 + 1)
        .collect()
}

/// Feature level summary statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureSummary {
    /// Wild type residues plus distinct inserted positions
    pub total_positions: usize,
    /// Distinct positions carrying a call in any proteoform
    pub variable_positions: usize,
    pub percent_variable_positions: f64,
    /// Samples over the selected proteoforms and the wild type
    pub total_samples: usize,
    /// Sample-weighted mean of the proteoform VP annotations
    pub mean_variable_percentage: f64,
    /// Share of samples whose proteoform terminates prematurely
    pub premature_termination_rate: f64,
}

/// Summarizes a feature.
///
/// Variable positions are counted over all proteoforms of the protein, with each
/// proteoform's calls cut at its first termination when truncation is on. The
/// sample-weighted means run over the selected proteoforms and `WildType`.
pub fn summarize_feature(
    protein: &AllocatedProtein,
    wild_type_sequence: &str,
    axis: &TrackAxis,
    truncate_after_first_termination: bool,
) -> FeatureSummary {
    let mut variable: BTreeSet<Position> = BTreeSet::new();
    for (id, proteoform) in protein.variant_proteoforms() {
        for call in effective_calls(id, proteoform, truncate_after_first_termination) {
            variable.insert(call.position);
        }
    }
    let insertions = variable.iter().filter(|p| p.is_insertion()).count();
    let total_positions = wild_type_sequence.chars().count() + insertions;
    let percent_variable_positions = if total_positions == 0 {
        0.0
    } else {
        100.0 * variable.len() as f64 / total_positions as f64
    };

    let mut weighted_vp = 0.0;
    let mut terminated = 0usize;
    for (track, samples) in axis.iter() {
        let id = match track {
            WILD_TYPE_PROTEIN_TRACK => continue,
            WILD_TYPE_GENE_TRACK => WILD_TYPE_ID,
            other => other,
        };
        let Ok(proteoform) = protein.proteoform(id) else {
            continue;
        };
        weighted_vp += samples as f64 * proteoform.annotations.variable_percentage;
        if proteoform.annotations.premature_termination {
            terminated += samples;
        }
    }

    let total_samples = axis.total_samples();
    let (mean_variable_percentage, premature_termination_rate) = if total_samples == 0 {
        (0.0, 0.0)
    } else {
        (
            weighted_vp / total_samples as f64,
            terminated as f64 / total_samples as f64,
        )
    };

    FeatureSummary {
        total_positions,
        variable_positions: variable.len(),
        percent_variable_positions,
        total_samples,
        mean_variable_percentage,
        premature_termination_rate,
    }
}

/// Unweighted mean VP over the non-reference proteoforms, 1 decimal; 0 when there are none.
pub fn mean_proteoform_vp(protein: &AllocatedProtein) -> f64 {
    let values: Vec<f64> = protein
        .variant_proteoforms()
        .map(|(_, p)| p.annotations.variable_percentage)
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    round_to(values.iter().sum::<f64>() / values.len() as f64, 1)
}

/// Node of the feature overview tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewNode {
    pub name: String,
    /// Mean VP for features with an allocated protein
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OverviewNode>,
}

impl OverviewNode {
    fn new(name: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            name: name.into(),
            value,
            children: Vec::new(),
        }
    }

    /// Child with `name`, created at the end when missing.
    fn child_mut(&mut self, name: &str) -> &mut OverviewNode {
        let index = match self.children.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.children.push(OverviewNode::new(name, None));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Chromosome, class and feature levels; features without a class go under `default_class`.
pub fn feature_overview(dictionary: &VariantDictionary, default_class: &str) -> OverviewNode {
    let mut root = OverviewNode::new(dictionary.chromosome.clone(), None);
    for (name, feature) in dictionary.features.iter() {
        let class = feature.class().unwrap_or(default_class);
        let value = feature.allocated_protein.as_ref().map(mean_proteoform_vp);
        root.child_mut(class)
            .children
            .push(OverviewNode::new(name, value));
    }
    root
}
