//! Input file loading.
//!
//! Supports:
//! - Variant dictionaries (.json), validated before use
//! - Protein structures (.pdb, .ent)
//! - Residue distance maps and variant annotation tables (legacy .tsv)
//!
//! Every file is read to completion before it is parsed; nothing is streamed.
//! File kind detection priority:
//! 1. File extension (and, for .tsv, the file name)
//! 2. Content-based detection

pub mod annotation_table;
pub mod dictionary;
pub mod distance_map;
pub mod pdb;
pub mod schema;

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::model::VariantDictionary;
use annotation_table::AnnotationTable;
use distance_map::DistanceMap;
use pdb::PdbStructure;
use schema::SchemaValidator;

/// Kind of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Dictionary,
    Structure,
    DistanceMap,
    AnnotationTable,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Dictionary => write!(f, "variant dictionary"),
            FileKind::Structure => write!(f, "PDB structure"),
            FileKind::DistanceMap => write!(f, "residue distance map"),
            FileKind::AnnotationTable => write!(f, "variant annotation table"),
        }
    }
}

/// Errors that can occur while loading input files.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty file")]
    EmptyFile,

    #[error("Could not determine the kind of '{0}'")]
    UnknownKind(String),

    #[error("Expected a {expected}, found a {found}")]
    UnexpectedKind { expected: FileKind, found: FileKind },

    #[error("Invalid JSON: {0}")]
    JsonError(serde_json::Error),

    #[error("Schema violation: {0}")]
    SchemaViolation(#[from] schema::SchemaViolation),

    #[error("PDB error: {0}")]
    PdbError(#[from] pdb::PdbError),

    #[error("Distance map error: {0}")]
    DistanceMapError(#[from] distance_map::DistanceMapError),

    #[error("Annotation table error: {0}")]
    AnnotationTableError(#[from] annotation_table::AnnotationTableError),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Reads a whole file into memory.
pub fn read_file<P: AsRef<Path>>(path: P) -> LoadResult<String> {
    let file = File::open(&path)?;
    let file_size = file.metadata()?.len() as usize;
    if file_size == 0 {
        return Err(LoadError::EmptyFile);
    }

    let mut reader = BufReader::with_capacity(1024 * 1024, file);
    let mut content = String::with_capacity(file_size);
    reader.read_to_string(&mut content)?;
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }
    debug!(path = %path.as_ref().display(), bytes = content.len(), "read file");
    Ok(content)
}

/// Detects the file kind from its extension and name.
pub fn detect_kind_from_path<P: AsRef<Path>>(path: P) -> Option<FileKind> {
    let path = path.as_ref();
    let ext = path.extension().and_then(OsStr::to_str)?;
    match ext.to_lowercase().as_str() {
        "json" => Some(FileKind::Dictionary),
        "pdb" | "ent" => Some(FileKind::Structure),
        "tsv" | "txt" => {
            let stem = path.file_stem().and_then(OsStr::to_str)?.to_lowercase();
            if stem.contains("distance") {
                Some(FileKind::DistanceMap)
            } else if stem.contains("annotation") {
                Some(FileKind::AnnotationTable)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Detects the file kind by examining the content.
///
/// Only dictionaries and structures can be recognized; the two tables share a layout.
pub fn detect_kind_from_content(content: &str) -> Option<FileKind> {
    let first = content.lines().map(str::trim).find(|line| !line.is_empty())?;
    if first.starts_with('{') {
        return Some(FileKind::Dictionary);
    }
    const PDB_RECORDS: [&str; 7] = ["HEADER", "TITLE", "COMPND", "REMARK", "CRYST1", "ATOM", "MODEL"];
    if PDB_RECORDS.iter().any(|record| first.starts_with(record)) {
        return Some(FileKind::Structure);
    }
    None
}

/// Detects the kind of `path`, falling back to its content.
pub fn detect_kind<P: AsRef<Path>>(path: P, content: &str) -> LoadResult<FileKind> {
    detect_kind_from_path(&path)
        .or_else(|| detect_kind_from_content(content))
        .ok_or_else(|| LoadError::UnknownKind(path.as_ref().display().to_string()))
}

/// Loads and validates a variant dictionary.
///
/// The file must be recognized as a dictionary by its name or its content.
pub fn load_dictionary<P: AsRef<Path>>(
    path: P,
    validator: &dyn SchemaValidator,
) -> LoadResult<VariantDictionary> {
    let content = read_file(&path)?;
    let kind = detect_kind(&path, &content)?;
    if kind != FileKind::Dictionary {
        return Err(LoadError::UnexpectedKind {
            expected: FileKind::Dictionary,
            found: kind,
        });
    }
    dictionary::parse_dictionary_str(&content, validator)
}

/// Loads a PDB structure.
pub fn load_structure<P: AsRef<Path>>(path: P) -> LoadResult<PdbStructure> {
    let content = read_file(path)?;
    Ok(pdb::parse_pdb_str(&content)?)
}

/// Loads a legacy residue distance map.
pub fn load_distance_map<P: AsRef<Path>>(path: P) -> LoadResult<DistanceMap> {
    let content = read_file(path)?;
    Ok(distance_map::parse_distance_map_str(&content)?)
}

/// Loads a legacy variant annotation table for a feature on the given strand.
pub fn load_annotation_table<P: AsRef<Path>>(path: P, is_sense: bool) -> LoadResult<AnnotationTable> {
    let content = read_file(path)?;
    Ok(annotation_table::parse_annotation_table_str(&content, is_sense)?)
}

/// File name without extension; the class of features that declare none.
pub fn file_stem<P: AsRef<Path>>(path: P) -> String {
    path.as_ref()
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("dictionary")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_from_path() {
        assert_eq!(detect_kind_from_path("run/vdict.json"), Some(FileKind::Dictionary));
        assert_eq!(detect_kind_from_path("model.PDB"), Some(FileKind::Structure));
        assert_eq!(detect_kind_from_path("residueDistanceMap.tsv"), Some(FileKind::DistanceMap));
        assert_eq!(
            detect_kind_from_path("variantAnnotationTable.tsv"),
            Some(FileKind::AnnotationTable)
        );
        assert_eq!(detect_kind_from_path("other.tsv"), None);
        assert_eq!(detect_kind_from_path("noext"), None);
    }

    #[test]
    fn test_detect_from_content() {
        assert_eq!(detect_kind_from_content("\n  {\"a\": 1}"), Some(FileKind::Dictionary));
        assert_eq!(detect_kind_from_content("HEADER    X\nATOM"), Some(FileKind::Structure));
        assert_eq!(detect_kind_from_content("pos\tref\n"), None);
        assert!(matches!(
            detect_kind("data.bin", "???"),
            Err(LoadError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(read_file(file.path()), Err(LoadError::EmptyFile)));

        let mut blank = tempfile::NamedTempFile::new().unwrap();
        writeln!(blank, "   ").unwrap();
        assert!(matches!(read_file(blank.path()), Err(LoadError::EmptyFile)));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_file("/nonexistent/vdict.json"),
            Err(LoadError::IoError(_))
        ));
    }

    #[test]
    fn test_load_dictionary_checks_kind() {
        let validator = schema::PermissiveValidator;

        let mut structure = tempfile::Builder::new().suffix(".pdb").tempfile().unwrap();
        writeln!(structure, "{{\"chromosome\": \"chr1\"}}").unwrap();
        assert!(matches!(
            load_dictionary(structure.path(), &validator),
            Err(LoadError::UnexpectedKind {
                expected: FileKind::Dictionary,
                found: FileKind::Structure
            })
        ));

        let mut unnamed = tempfile::Builder::new().suffix(".dat").tempfile().unwrap();
        writeln!(unnamed, "chromosome\tchr1").unwrap();
        assert!(matches!(
            load_dictionary(unnamed.path(), &validator),
            Err(LoadError::UnknownKind(_))
        ));

        let mut by_content = tempfile::Builder::new().suffix(".dat").tempfile().unwrap();
        writeln!(by_content, "{{\"chromosome\": \"chr1\"}}").unwrap();
        let dictionary = load_dictionary(by_content.path(), &validator).unwrap();
        assert_eq!(dictionary.chromosome, "chr1");
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("/data/run_1.json"), "run_1");
    }
}
