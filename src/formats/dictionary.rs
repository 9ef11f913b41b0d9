//! Variant dictionary (JSON) reader.

use serde_json::Value;
use tracing::{debug, info};

use super::schema::SchemaValidator;
use super::{LoadError, LoadResult};
use crate::model::VariantDictionary;

/// Parses and validates a dictionary document.
///
/// The document is checked by `validator` before it is turned into the model,
/// so a rejected document reports the breadcrumb of the offending value.
pub fn parse_dictionary_str(
    content: &str,
    validator: &dyn SchemaValidator,
) -> LoadResult<VariantDictionary> {
    let document: Value = serde_json::from_str(content).map_err(LoadError::JsonError)?;
    validator.validate(&document)?;
    debug!("dictionary document passed validation");

    let dictionary: VariantDictionary =
        serde_json::from_value(document).map_err(LoadError::JsonError)?;

    let proteins = dictionary
        .features
        .values()
        .filter(|f| f.has_protein())
        .count();
    info!(
        chromosome = %dictionary.chromosome,
        samples = dictionary.sample_count(),
        features = dictionary.features.len(),
        proteins,
        "loaded variant dictionary"
    );
    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::schema::{PermissiveValidator, StructuralValidator};

    const DOCUMENT: &str = r#"{
        "chromosome": "chr1",
        "samples": {"s1": {}, "s2": {}},
        "features": {
            "geneA": {
                "allocatedProtein": {
                    "chainSequences": {"A": "MAGV"},
                    "proteoforms": {
                        "WildType": {"samples": ["s2"], "annotations": {"VP": 0, "PT": "false", "vSwab": ""}},
                        "PF_z": {"samples": ["s1"], "annotations": {"VP": 25, "PT": "false", "vSwab": "L@2+0"}},
                        "PF_a": {"samples": [], "annotations": {"VP": 0, "PT": "false", "vSwab": ""}}
                    }
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_keeps_document_order() {
        let dictionary = parse_dictionary_str(DOCUMENT, &StructuralValidator).unwrap();
        let protein = dictionary
            .feature("geneA")
            .and_then(|f| f.allocated_protein.as_ref())
            .unwrap();
        let ids: Vec<&str> = protein.proteoforms.keys().collect();
        assert_eq!(ids, vec!["WildType", "PF_z", "PF_a"]);
    }

    #[test]
    fn test_schema_violation_is_reported() {
        let broken = DOCUMENT.replace("\"L@2+0\"", "\"L2+0\"");
        match parse_dictionary_str(&broken, &StructuralValidator) {
            Err(LoadError::SchemaViolation(v)) => {
                assert!(v.path.starts_with("features › geneA › allocatedProtein"));
            }
            other => panic!("expected a schema violation, got {:?}", other),
        }
        // A permissive validator defers to the model, which keeps malformed calls as text
        assert!(parse_dictionary_str(&broken, &PermissiveValidator).is_ok());
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_dictionary_str("{\"chromosome\": ", &StructuralValidator),
            Err(LoadError::JsonError(_))
        ));
    }
}
