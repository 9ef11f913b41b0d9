//! Data model for variant dictionaries.
//!
//! This module contains all data structures for representing:
//! - Samples and genomic features
//! - Proteins allocated to features, with their chain sequences
//! - Proteoforms, their sample assignments, annotations and variant calls
//!
//! Maps keep the order in which entries appear in the source document, since
//! that order breaks ties when proteoforms are sorted for display.

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::Position;

/// Identifier of the reference proteoform every allocated protein carries.
pub const WILD_TYPE_ID: &str = "WildType";

/// Symbol of a termination call.
pub const TERMINATION_SYMBOL: char = '*';

/// Errors raised while interpreting dictionary content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Malformed variant call '{call}': {reason}")]
    MalformedCall { call: String, reason: String },

    #[error("Unknown proteoform: {0}")]
    UnknownProteoform(String),
}

/// A string-keyed map that remembers insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderedMap<V> {
    entries: IndexMap<String, V>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    /// Inserts a value; an existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Accepts a JSON number or a numeric string.
fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| de::Error::custom("number out of range")),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::custom(format!("expected a number, got '{}'", s))),
        serde_json::Value::Null => Ok(0.0),
        other => Err(de::Error::custom(format!("expected a number, got {}", other))),
    }
}

/// Accepts a JSON bool or the strings `"true"` / `"false"`.
fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => Ok(b),
        serde_json::Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(de::Error::custom(format!("expected a boolean, got '{}'", s))),
        },
        serde_json::Value::Null => Ok(false),
        other => Err(de::Error::custom(format!("expected a boolean, got {}", other))),
    }
}

/// An empty object stands for "no allocated protein".
fn optional_protein<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<AllocatedProtein>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(ref map)) if map.is_empty() => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(de::Error::custom),
    }
}

fn default_sense() -> bool {
    true
}

/// A single amino acid level variant call of a proteoform, e.g. `A@2+0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantCall {
    /// Alternate content, case preserved (lower case marks an ambiguous call)
    pub content: char,
    /// Position of the call relative to the wild type sequence
    pub position: Position,
}

impl VariantCall {
    /// Parses `<content>@<residue>+<offset>`.
    pub fn parse(call: &str) -> Result<Self, ModelError> {
        let malformed = |reason: &str| ModelError::MalformedCall {
            call: call.to_string(),
            reason: reason.to_string(),
        };

        let (content, position) = call
            .trim()
            .split_once('@')
            .ok_or_else(|| malformed("missing '@'"))?;

        let mut chars = content.chars();
        let content = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(malformed("content must be a single symbol")),
        };

        let position = position
            .parse::<Position>()
            .map_err(|e| malformed(&e.to_string()))?;

        Ok(Self { content, position })
    }

    pub fn is_termination(&self) -> bool {
        self.content == TERMINATION_SYMBOL
    }

    /// Lower-case content marks an ambiguous, low-confidence call.
    pub fn is_ambiguous(&self) -> bool {
        self.content.is_lowercase()
    }
}

/// Scalar annotations of a proteoform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProteoformAnnotations {
    /// Percentage of variable positions
    #[serde(rename = "VP", default, deserialize_with = "lenient_f64")]
    pub variable_percentage: f64,
    /// Whether the proteoform terminates before the reference stop
    #[serde(rename = "PT", default, deserialize_with = "lenient_bool")]
    pub premature_termination: bool,
    /// Pipe-delimited variant calls
    #[serde(rename = "vSwab", default)]
    pub variants: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// A distinct protein sequence observed across samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Proteoform {
    #[serde(default)]
    pub samples: Vec<String>,
    #[serde(default)]
    pub annotations: ProteoformAnnotations,
}

impl Proteoform {
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Parses the variant annotation call by call, in file order. Empty segments are skipped.
    pub fn iter_calls(&self) -> impl Iterator<Item = Result<VariantCall, ModelError>> + '_ {
        self.annotations
            .variants
            .split('|')
            .filter(|call| !call.trim().is_empty())
            .map(VariantCall::parse)
    }

    /// All variant calls, failing on the first malformed one.
    pub fn variant_calls(&self) -> Result<Vec<VariantCall>, ModelError> {
        self.iter_calls().collect()
    }

    pub fn has_sample(&self, sample: &str) -> bool {
        self.samples.iter().any(|s| s == sample)
    }
}

/// Protein data attached to a feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedProtein {
    /// Structure file payload (PDB format)
    #[serde(default, alias = "structure", skip_serializing_if = "Option::is_none")]
    pub pdb: Option<String>,
    /// Wild type sequence per chain identifier
    #[serde(default)]
    pub chain_sequences: OrderedMap<String>,
    #[serde(default)]
    pub proteoforms: OrderedMap<Proteoform>,
}

impl AllocatedProtein {
    /// The reference proteoform.
    pub fn wild_type(&self) -> Option<&Proteoform> {
        self.proteoforms.get(WILD_TYPE_ID)
    }

    pub fn proteoform(&self, id: &str) -> Result<&Proteoform, ModelError> {
        self.proteoforms
            .get(id)
            .ok_or_else(|| ModelError::UnknownProteoform(id.to_string()))
    }

    /// Proteoforms other than the wild type, in file order.
    pub fn variant_proteoforms(&self) -> impl Iterator<Item = (&str, &Proteoform)> {
        self.proteoforms.iter().filter(|(id, _)| *id != WILD_TYPE_ID)
    }

    pub fn chain_identifiers(&self) -> impl Iterator<Item = &str> {
        self.chain_sequences.keys()
    }
}

/// Free-form feature annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureAnnotations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A genomic region of interest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub end: i64,
    #[serde(default = "default_sense", alias = "sense")]
    pub is_sense: bool,
    #[serde(default, alias = "sequence")]
    pub nucleotide_sequence: String,
    #[serde(default)]
    pub annotations: FeatureAnnotations,
    #[serde(
        default,
        deserialize_with = "optional_protein",
        skip_serializing_if = "Option::is_none"
    )]
    pub allocated_protein: Option<AllocatedProtein>,
}

impl Feature {
    pub fn class(&self) -> Option<&str> {
        self.annotations.class.as_deref()
    }

    pub fn has_protein(&self) -> bool {
        self.allocated_protein.is_some()
    }
}

/// The complete analysis result loaded from a dictionary file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VariantDictionary {
    #[serde(default)]
    pub chromosome: String,
    /// Sample identifiers with opaque metadata
    #[serde(default)]
    pub samples: OrderedMap<serde_json::Value>,
    #[serde(default)]
    pub features: OrderedMap<Feature>,
}

impl VariantDictionary {
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }
}
