//! Proteoform selection and ordering.
//!
//! A proteoform takes part in a view when it passes the numeric predicates of
//! [`FilterSettings`], or, when an allow-list is given, when it is named in the
//! proteoform list or carries a listed sample. Selected proteoforms are ordered
//! by ascending sample count; ties keep dictionary order.

use tracing::debug;

use crate::config::FilterSettings;
use crate::model::{AllocatedProtein, Proteoform, WILD_TYPE_ID};

/// Whether a single proteoform passes the filter.
pub fn passes_filter(id: &str, proteoform: &Proteoform, filter: &FilterSettings) -> bool {
    if filter.has_allow_list() {
        return filter.proteoform_ids.iter().any(|allowed| allowed == id)
            || filter.sample_ids.iter().any(|sample| proteoform.has_sample(sample));
    }

    let annotations = &proteoform.annotations;
    if filter.exclude_premature_termination && annotations.premature_termination {
        return false;
    }
    if proteoform.sample_count() < filter.min_sample_count {
        return false;
    }
    if annotations.variable_percentage < filter.min_variable_position_percent {
        return false;
    }
    true
}

/// Selects and orders the proteoforms of a view. `WildType` is never included.
pub fn select_proteoforms(protein: &AllocatedProtein, filter: &FilterSettings) -> Vec<String> {
    let mut selected: Vec<(&str, &Proteoform)> = protein
        .proteoforms
        .iter()
        .filter(|(id, _)| *id != WILD_TYPE_ID)
        .filter(|(id, proteoform)| passes_filter(id, proteoform, filter))
        .collect();

    // Stable: equal sample counts keep dictionary order.
    selected.sort_by_key(|(_, proteoform)| proteoform.sample_count());

    debug!(
        total = protein.proteoforms.len(),
        selected = selected.len(),
        allow_list = filter.has_allow_list(),
        "selected proteoforms"
    );

    selected.into_iter().map(|(id, _)| id.to_string()).collect()
}
