//! Per-position variant annotation table (legacy TSV).
//!
//! Layout: a preamble line, a header line, then one row per genomic position.
//! The first two columns of every row are key columns; the remaining ones are
//! annotations named by the header. Positions of the form `p+1` are rows for
//! the insertion after `p` and are keyed `pI`; other `p+k` rows are skipped.
//! For anti-sense features positions are negated.

use thiserror::Error;
use tracing::debug;

use crate::model::OrderedMap;

/// Number of leading key columns in every row.
const KEY_COLUMNS: usize = 2;

/// Errors that can occur while reading an annotation table.
#[derive(Error, Debug)]
pub enum AnnotationTableError {
    #[error("Missing header line")]
    MissingHeader,

    #[error("Line {line}: invalid position '{value}'")]
    InvalidPosition { line: usize, value: String },
}

/// Result type for annotation table operations.
pub type AnnotationTableResult<T> = Result<T, AnnotationTableError>;

/// Annotations keyed by normalized position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationTable {
    pub columns: Vec<String>,
    pub rows: OrderedMap<OrderedMap<String>>,
}

impl AnnotationTable {
    pub fn get(&self, position: &str) -> Option<&OrderedMap<String>> {
        self.rows.get(position)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalizes a position key. Returns `None` for rows that are skipped.
fn normalize_position(raw: &str, is_sense: bool, line: usize) -> AnnotationTableResult<Option<String>> {
    let invalid = || AnnotationTableError::InvalidPosition {
        line,
        value: raw.to_string(),
    };
    let (base, offset) = match raw.split_once('+') {
        Some((base, offset)) => (base, Some(offset.trim())),
        None => (raw, None),
    };
    let base: i64 = base.trim().parse().map_err(|_| invalid())?;
    let base = if is_sense { base } else { -base };

    match offset {
        None => Ok(Some(base.to_string())),
        Some("1") => Ok(Some(format!("{}I", base))),
        Some(other) if other.parse::<u32>().is_ok() => Ok(None),
        Some(_) => Err(invalid()),
    }
}

/// Parses an annotation table from a string.
pub fn parse_annotation_table_str(content: &str, is_sense: bool) -> AnnotationTableResult<AnnotationTable> {
    let mut lines = content.lines().enumerate().skip(1);
    let (_, header) = lines.next().ok_or(AnnotationTableError::MissingHeader)?;
    let columns: Vec<String> = header
        .split('\t')
        .skip(KEY_COLUMNS)
        .map(|c| c.trim().to_string())
        .collect();

    let mut rows = OrderedMap::new();
    let mut skipped = 0usize;
    for (index, line) in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() <= 1 {
            continue;
        }
        let Some(position) = normalize_position(fields[0], is_sense, index + 1)? else {
            skipped += 1;
            continue;
        };
        let values: OrderedMap<String> = columns
            .iter()
            .zip(fields.iter().skip(KEY_COLUMNS))
            .map(|(column, value)| (column.clone(), value.trim().to_string()))
            .collect();
        rows.insert(position, values);
    }

    debug!(rows = rows.len(), skipped, "parsed annotation table");
    Ok(AnnotationTable { columns, rows })
}
