//! Per-position statistics.
//!
//! - Variability: Shannon entropy of a position's composition, log base 23
//! - Scaled Kyte-Doolittle hydropathicity over an edge-decayed sliding window
//! - Kolmogorov-Smirnov test of the spacing between variable positions

use std::collections::BTreeMap;

use serde::Serialize;

use crate::codec::{Residue, ALPHABET_SIZE, INCOMPLETE_MARKER};
use crate::config::AmbiguityMode;

/// Rounds to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    // Avoid reporting -0.0
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Normalized entropy of a composition.
///
/// Lower-case (ambiguous) states are dropped unless `mode` is [`AmbiguityMode::Show`];
/// kept states are upper-cased and the incomplete marker counts as "any". Returns
/// 0 for compositions with fewer than two states, otherwise a value in (0, 1].
pub fn compute_variability(composition: &BTreeMap<char, usize>, mode: AmbiguityMode) -> f64 {
    let mut counts: BTreeMap<char, usize> = BTreeMap::new();
    for (&content, &count) in composition {
        if content.is_lowercase() && mode != AmbiguityMode::Show {
            continue;
        }
        let mut state = content.to_ascii_uppercase();
        if state == INCOMPLETE_MARKER {
            state = Residue::Any.symbol();
        }
        *counts.entry(state).or_insert(0) += count;
    }

    let total: usize = counts.values().sum();
    let observed = counts.values().filter(|c| **c > 0).count();
    if total == 0 || observed < 2 {
        return 0.0;
    }

    let base = (ALPHABET_SIZE as f64).ln();
    let entropy: f64 = counts
        .values()
        .filter(|c| **c > 0)
        .map(|&c| {
            let p = c as f64 / total as f64;
            p * p.ln() / base
        })
        .sum();
    -entropy
}

/// Weight of a neighbor at distance `distance` from the window center.
fn window_weight(distance: u32, shift: u32, edge_weight: f64) -> f64 {
    if distance == 0 || shift == 0 {
        return 1.0;
    }
    edge_weight + ((1.0 - edge_weight) / shift as f64) * (shift - distance) as f64
}

/// Window-smoothed scaled hydropathicity of the residue at `center`.
///
/// `residues` maps structural residue numbers to residue types. Neighbors are
/// looked up by number; a missing number or a non-standard residue is left out
/// of both the weighted sum and the normalization. Near the chain ends the window
/// is truncated and renormalized. Returns `None` when the center residue itself
/// has no scale value. The result is rounded to 2 decimals.
pub fn scaled_hydropathicity(
    residues: &BTreeMap<i32, Residue>,
    center: i32,
    window: usize,
    edge_weight: f64,
) -> Option<f64> {
    let center_value = residues.get(&center)?.scaled_hydropathicity()?;
    let shift = (window.saturating_sub(1) / 2) as u32;

    let mut sum = center_value;
    let mut norm = 1.0;
    for distance in 1..=shift {
        let weight = window_weight(distance, shift, edge_weight);
        for neighbor in [center - distance as i32, center + distance as i32] {
            if let Some(value) = residues
                .get(&neighbor)
                .and_then(|residue| residue.scaled_hydropathicity())
            {
                sum += value * weight;
                norm += weight;
            }
        }
    }

    Some(round_to(sum / norm, 2))
}

/// Outcome of a uniformity test that could be run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UniformityResult {
    /// Maximum distance between the two empirical distribution functions
    pub d: f64,
    /// Asymptotic p-value
    pub p: f64,
    /// Gap expected between uniformly spaced variable positions
    pub uniform_gap_size: u64,
    /// Invariant positions between consecutive variable positions
    pub observed_gaps: Vec<u64>,
}

/// Kolmogorov-Smirnov test of variable position spacing against uniform spacing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UniformityTest {
    Tested(UniformityResult),
    /// Fewer than two variable positions, so there are no gaps to compare
    InsufficientData { variable_positions: usize },
}

impl UniformityTest {
    pub fn result(&self) -> Option<&UniformityResult> {
        match self {
            UniformityTest::Tested(result) => Some(result),
            UniformityTest::InsufficientData { .. } => None,
        }
    }
}

/// Compares the gaps between `variable_positions` (1-based) with the gaps expected
/// when the same number of positions is spread evenly over `total_length`.
///
/// With `n` variable positions the expected gap size is `floor(total_length / (n + 1))`.
/// Observed gaps count the invariant positions strictly between two variable
/// positions, so the theoretical sample holds the same count for evenly spaced
/// positions, i.e. one less than the gap size.
///
/// The theoretical sample is `uniform_gap_size - 1`, not `uniform_gap_size`.
/// Comparing against the raw gap size gives `d = 1` for perfectly even spacing.
pub fn ks_uniformity_test(total_length: u64, variable_positions: &[u64]) -> UniformityTest {
    let mut positions = variable_positions.to_vec();
    positions.sort_unstable();
    positions.dedup();

    if positions.len() < 2 {
        return UniformityTest::InsufficientData {
            variable_positions: positions.len(),
        };
    }

    let uniform_gap_size = total_length / (positions.len() as u64 + 1);
    let observed_gaps: Vec<u64> = positions
        .windows(2)
        .map(|pair| pair[1].saturating_sub(pair[0] + 1))
        .collect();

    let mut observed: Vec<f64> = observed_gaps.iter().map(|&g| g as f64).collect();
    observed.sort_by(|a, b| a.total_cmp(b));
    let theoretical = vec![uniform_gap_size.saturating_sub(1) as f64; observed.len()];

    let (d, p) = ks_two_sample(&observed, &theoretical);
    UniformityTest::Tested(UniformityResult {
        d,
        p,
        uniform_gap_size,
        observed_gaps,
    })
}

/// Two-sample Kolmogorov-Smirnov statistic and p-value. Both samples must be sorted.
pub fn ks_two_sample(first: &[f64], second: &[f64]) -> (f64, f64) {
    if first.is_empty() || second.is_empty() {
        return (0.0, 1.0);
    }
    let n1 = first.len() as f64;
    let n2 = second.len() as f64;

    let (mut i, mut j) = (0usize, 0usize);
    let (mut f1, mut f2) = (0.0f64, 0.0f64);
    let mut d = 0.0f64;
    while i < first.len() && j < second.len() {
        let (x1, x2) = (first[i], second[j]);
        if x1 <= x2 {
            i += 1;
            f1 = i as f64 / n1;
        }
        if x2 <= x1 {
            j += 1;
            f2 = j as f64 / n2;
        }
        d = d.max((f2 - f1).abs());
    }

    let effective = (n1 * n2 / (n1 + n2)).sqrt();
    let lambda = (effective + 0.12 + 0.11 / effective) * d;
    (d, kolmogorov_probability(lambda))
}

/// Complementary Kolmogorov distribution `Q_KS(lambda)`.
fn kolmogorov_probability(lambda: f64) -> f64 {
    const EPS1: f64 = 0.001;
    const EPS2: f64 = 1.0e-8;

    if lambda < 1.0e-6 {
        return 1.0;
    }
    let a2 = -2.0 * lambda * lambda;
    let mut factor = 2.0;
    let mut sum = 0.0;
    let mut previous = 0.0;
    for j in 1..=100 {
        let j = j as f64;
        let term = factor * (a2 * j * j).exp();
        sum += term;
        if term.abs() <= EPS1 * previous || term.abs() <= EPS2 * sum {
            return sum.clamp(0.0, 1.0);
        }
        factor = -factor;
        previous = term.abs();
    }
    // No convergence
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composition(entries: &[(char, usize)]) -> BTreeMap<char, usize> {
        entries.iter().copied().collect()
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.12345, 2), 0.12);
        assert_eq!(round_to(0.125, 4), 0.125);
        assert_eq!(round_to(-0.0001, 2), 0.0);
        assert!(round_to(-0.0001, 2).is_sign_positive());
    }

    #[test]
    fn test_variability_single_state() {
        assert_eq!(compute_variability(&composition(&[('A', 10)]), AmbiguityMode::Mask), 0.0);
        assert_eq!(compute_variability(&BTreeMap::new(), AmbiguityMode::Mask), 0.0);
    }

    #[test]
    fn test_variability_two_states() {
        let value = compute_variability(&composition(&[('A', 5), ('G', 5)]), AmbiguityMode::Mask);
        let expected = 2.0f64.ln() / 23.0f64.ln();
        assert!((value - expected).abs() < 1e-12);
        assert!(value > 0.0);

        // Relabeling states does not change the score
        let swapped = compute_variability(&composition(&[('W', 5), ('C', 5)]), AmbiguityMode::Mask);
        assert!((value - swapped).abs() < 1e-12);
    }

    #[test]
    fn test_variability_uniform_alphabet_is_one() {
        let all: BTreeMap<char, usize> = Residue::ALL.iter().map(|r| (r.symbol(), 1)).collect();
        let value = compute_variability(&all, AmbiguityMode::Mask);
        assert!((value - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_variability_ambiguity_mode() {
        let counts = composition(&[('A', 3), ('g', 1)]);
        assert_eq!(compute_variability(&counts, AmbiguityMode::Mask), 0.0);
        assert!(compute_variability(&counts, AmbiguityMode::Show) > 0.0);

        // Ambiguous content merges with its confident counterpart
        let merged = composition(&[('A', 3), ('a', 1)]);
        assert_eq!(compute_variability(&merged, AmbiguityMode::Show), 0.0);

        // The incomplete marker counts as "any"
        let incomplete = composition(&[('X', 2), ('u', 2)]);
        assert_eq!(compute_variability(&incomplete, AmbiguityMode::Show), 0.0);
    }

    fn chain(sequence: &str) -> BTreeMap<i32, Residue> {
        sequence
            .chars()
            .enumerate()
            .map(|(i, c)| (i as i32 + 1, Residue::from_char(c).unwrap()))
            .collect()
    }

    #[test]
    fn test_hydropathicity_window_one_is_scale_value() {
        let residues = chain("IRV");
        assert_eq!(scaled_hydropathicity(&residues, 1, 1, 0.5), Some(1.0));
        assert_eq!(scaled_hydropathicity(&residues, 2, 1, 0.5), Some(0.0));
    }

    #[test]
    fn test_hydropathicity_weights() {
        // Window 3, edge weight 0.5: (0.0 * 0.5 + 1.0 * 1 + 0.0 * 0.5) / 2
        let residues = chain("RIR");
        assert_eq!(scaled_hydropathicity(&residues, 2, 3, 0.5), Some(0.5));

        // Truncated at the chain start: (0.0 + 1.0 * 0.5) / 1.5
        assert_eq!(scaled_hydropathicity(&residues, 1, 3, 0.5), Some(0.33));
        assert_eq!(scaled_hydropathicity(&chain("IR"), 1, 3, 0.5), Some(0.67));
    }

    #[test]
    fn test_hydropathicity_window_five() {
        // shift 2: weights 0.5, 0.75, 1, 0.75, 0.5
        let residues = chain("IRRRR");
        // center 3: (1.0 * 0.5) / (0.5 + 0.75 + 1 + 0.75 + 0.5)
        assert_eq!(scaled_hydropathicity(&residues, 3, 5, 0.5), Some(0.14));
    }

    #[test]
    fn test_hydropathicity_non_standard() {
        let residues = chain("I*I");
        assert_eq!(scaled_hydropathicity(&residues, 2, 3, 0.5), None);
        // Stop codon neighbor is skipped
        assert_eq!(scaled_hydropathicity(&residues, 1, 3, 0.5), Some(1.0));
        assert_eq!(scaled_hydropathicity(&residues, 10, 3, 0.5), None);
    }

    #[test]
    fn test_ks_uniform_spacing() {
        let positions: Vec<u64> = (1..=9).map(|i| i * 10).collect();
        let test = ks_uniformity_test(100, &positions);
        let result = test.result().unwrap();
        assert_eq!(result.uniform_gap_size, 10);
        assert_eq!(result.observed_gaps, vec![9; 8]);
        // Even spacing matches the theoretical sample exactly
        assert!(result.observed_gaps.iter().all(|&g| g == result.uniform_gap_size - 1));
        assert!(result.d.abs() < 1e-12);
        assert!(result.p > 0.05);
    }

    #[test]
    fn test_ks_clustered() {
        let positions = [1, 2, 3, 4, 5, 95, 96, 97, 98, 99];
        let test = ks_uniformity_test(100, &positions);
        let result = test.result().unwrap();
        assert_eq!(result.uniform_gap_size, 9);
        assert_eq!(result.observed_gaps, vec![0, 0, 0, 0, 89, 0, 0, 0, 0]);
        assert!(result.d > 0.8);
        assert!(result.p < 0.05);
    }

    #[test]
    fn test_ks_insufficient_data() {
        assert_eq!(
            ks_uniformity_test(100, &[]),
            UniformityTest::InsufficientData { variable_positions: 0 }
        );
        assert_eq!(
            ks_uniformity_test(100, &[42]),
            UniformityTest::InsufficientData { variable_positions: 1 }
        );
        assert!(ks_uniformity_test(100, &[42, 42]).result().is_none());
    }

    #[test]
    fn test_kolmogorov_probability_bounds() {
        assert_eq!(kolmogorov_probability(0.0), 1.0);
        let p = kolmogorov_probability(1.36);
        assert!((p - 0.05).abs() < 0.01);
        assert!(kolmogorov_probability(3.0) < 1e-6);
    }
}
