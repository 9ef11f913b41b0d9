//! Structural validation of variant dictionary documents.
//!
//! Validation runs on the raw JSON document before it is turned into the model,
//! so that a rejected file reports where it went wrong instead of a serde message.
//! Violations carry a breadcrumb path such as
//! `features › geneA › allocatedProtein › proteoforms › PF1 › samples › [*]`;
//! array indices are replaced by `[*]`.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{VariantCall, WILD_TYPE_ID};

/// Separator between breadcrumb segments.
pub const PATH_SEPARATOR: &str = " › ";
/// Placeholder for array indices in breadcrumbs.
pub const INDEX_PLACEHOLDER: &str = "[*]";

/// A document that does not match the expected structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at {path})")]
pub struct SchemaViolation {
    /// Breadcrumb path of the offending value; empty for the document root
    pub path: String,
    pub message: String,
}

impl SchemaViolation {
    fn new(path: &[&str], message: impl Into<String>) -> Self {
        let path = if path.is_empty() {
            "document root".to_string()
        } else {
            path.join(PATH_SEPARATOR)
        };
        Self {
            path,
            message: message.into(),
        }
    }
}

/// A black-box check of a raw dictionary document.
pub trait SchemaValidator {
    fn validate(&self, document: &Value) -> Result<(), SchemaViolation>;
}

/// Checks the keys and value types the model relies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralValidator;

type Check = Result<(), SchemaViolation>;

fn expect_object<'a>(value: &'a Value, path: &[&str]) -> Result<&'a Map<String, Value>, SchemaViolation> {
    value
        .as_object()
        .ok_or_else(|| SchemaViolation::new(path, format!("expected an object, got {}", type_name(value))))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn required<'a>(object: &'a Map<String, Value>, key: &str, path: &[&str]) -> Result<&'a Value, SchemaViolation> {
    object
        .get(key)
        .ok_or_else(|| SchemaViolation::new(path, format!("missing required key '{}'", key)))
}

fn child<'a>(path: &[&'a str], segment: &'a str) -> Vec<&'a str> {
    let mut child = path.to_vec();
    child.push(segment);
    child
}

impl StructuralValidator {
    fn check_feature(&self, feature: &Value, path: &[&str]) -> Check {
        let feature = expect_object(feature, path)?;

        for key in ["start", "end"] {
            if let Some(value) = feature.get(key) {
                if !value.is_i64() && !value.is_u64() {
                    return Err(SchemaViolation::new(&child(path, key), "expected an integer"));
                }
            }
        }
        for key in ["isSense", "sense"] {
            if let Some(value) = feature.get(key) {
                if !value.is_boolean() {
                    return Err(SchemaViolation::new(&child(path, key), "expected a boolean"));
                }
            }
        }
        if let Some(annotations) = feature.get("annotations") {
            expect_object(annotations, &child(path, "annotations"))?;
        }

        match feature.get("allocatedProtein") {
            None | Some(Value::Null) => Ok(()),
            Some(protein) => self.check_protein(protein, &child(path, "allocatedProtein")),
        }
    }

    fn check_protein(&self, protein: &Value, path: &[&str]) -> Check {
        let protein = expect_object(protein, path)?;
        if protein.is_empty() {
            return Ok(());
        }

        if let Some(chains) = protein.get("chainSequences") {
            let chains_path = child(path, "chainSequences");
            for (chain, sequence) in expect_object(chains, &chains_path)? {
                if !sequence.is_string() {
                    return Err(SchemaViolation::new(&child(&chains_path, chain), "expected a string"));
                }
            }
        }

        let proteoforms_path = child(path, "proteoforms");
        let proteoforms = expect_object(required(protein, "proteoforms", path)?, &proteoforms_path)?;
        if !proteoforms.contains_key(WILD_TYPE_ID) {
            return Err(SchemaViolation::new(
                &proteoforms_path,
                format!("missing required key '{}'", WILD_TYPE_ID),
            ));
        }
        for (id, proteoform) in proteoforms {
            self.check_proteoform(proteoform, &child(&proteoforms_path, id))?;
        }
        Ok(())
    }

    fn check_proteoform(&self, proteoform: &Value, path: &[&str]) -> Check {
        let proteoform = expect_object(proteoform, path)?;

        if let Some(samples) = proteoform.get("samples") {
            let samples_path = child(path, "samples");
            let samples = samples
                .as_array()
                .ok_or_else(|| SchemaViolation::new(&samples_path, "expected an array"))?;
            if samples.iter().any(|s| !s.is_string()) {
                return Err(SchemaViolation::new(
                    &child(&samples_path, INDEX_PLACEHOLDER),
                    "expected a string",
                ));
            }
        }

        let Some(annotations) = proteoform.get("annotations") else {
            return Ok(());
        };
        let annotations_path = child(path, "annotations");
        let annotations = expect_object(annotations, &annotations_path)?;

        if let Some(vp) = annotations.get("VP") {
            let numeric = match vp {
                Value::Number(_) | Value::Null => true,
                Value::String(s) => s.trim().parse::<f64>().is_ok(),
                _ => false,
            };
            if !numeric {
                return Err(SchemaViolation::new(&child(&annotations_path, "VP"), "expected a number"));
            }
        }
        if let Some(pt) = annotations.get("PT") {
            let boolean = match pt {
                Value::Bool(_) | Value::Null => true,
                Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "false"),
                _ => false,
            };
            if !boolean {
                return Err(SchemaViolation::new(&child(&annotations_path, "PT"), "expected a boolean"));
            }
        }
        if let Some(variants) = annotations.get("vSwab") {
            let variants_path = child(&annotations_path, "vSwab");
            let variants = variants
                .as_str()
                .ok_or_else(|| SchemaViolation::new(&variants_path, "expected a string"))?;
            for call in variants.split('|').filter(|c| !c.trim().is_empty()) {
                VariantCall::parse(call).map_err(|e| SchemaViolation::new(&variants_path, e.to_string()))?;
            }
        }
        Ok(())
    }
}

impl SchemaValidator for StructuralValidator {
    fn validate(&self, document: &Value) -> Check {
        let root = expect_object(document, &[])?;

        if !required(root, "chromosome", &[])?.is_string() {
            return Err(SchemaViolation::new(&["chromosome"], "expected a string"));
        }
        expect_object(required(root, "samples", &[])?, &["samples"])?;

        let features = expect_object(required(root, "features", &[])?, &["features"])?;
        for (name, feature) in features {
            self.check_feature(feature, &["features", name.as_str()])?;
        }
        Ok(())
    }
}

/// Accepts every document.
#[derive(Debug, Clone, Copy, Default)]
pub struct PermissiveValidator;

impl SchemaValidator for PermissiveValidator {
    fn validate(&self, _document: &Value) -> Check {
        Ok(())
    }
}
