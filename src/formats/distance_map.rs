//! Residue distance matrix (legacy TSV).
//!
//! Layout:
//! ```text
//! <preamble line>
//! <corner>  R1   R2   R3
//! R1        0.0  4.2  9.8
//! R2        4.2  0.0  3.1
//! ```
//! The first line is a preamble and is skipped. Only pairs at most
//! [`CONTACT_DISTANCE`] apart are kept, and a residue is never its own contact.

use thiserror::Error;
use tracing::debug;

/// Largest distance at which two residues are in contact.
pub const CONTACT_DISTANCE: f64 = 5.0;

/// Errors that can occur while reading a distance map.
#[derive(Error, Debug)]
pub enum DistanceMapError {
    #[error("Missing header line")]
    MissingHeader,

    #[error("Line {line}: invalid distance '{value}'")]
    InvalidDistance { line: usize, value: String },

    #[error("Line {line}: {found} values for {expected} residues")]
    RowLengthMismatch {
        line: usize,
        expected: usize,
        found: usize,
    },
}

/// Result type for distance map operations.
pub type DistanceMapResult<T> = Result<T, DistanceMapError>;

/// A residue within contact distance of another one.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub residue: String,
    pub distance: f64,
}

/// Contact lists per residue, in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceMap {
    residues: Vec<String>,
    contacts: Vec<Vec<Contact>>,
}

impl DistanceMap {
    pub fn residues(&self) -> &[String] {
        &self.residues
    }

    /// Contacts of `residue`, in row order; `None` for residues not in the header.
    pub fn contacts(&self, residue: &str) -> Option<&[Contact]> {
        let index = self.residues.iter().position(|r| r == residue)?;
        Some(&self.contacts[index])
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.iter().map(Vec::len).sum()
    }
}

/// Parses a distance map from a string.
pub fn parse_distance_map_str(content: &str) -> DistanceMapResult<DistanceMap> {
    let mut lines = content.lines().enumerate().skip(1);
    let (_, header) = lines.next().ok_or(DistanceMapError::MissingHeader)?;

    let residues: Vec<String> = header
        .split('\t')
        .skip(1)
        .map(|r| r.trim().to_string())
        .collect();
    let mut contacts = vec![Vec::new(); residues.len()];

    for (index, line) in lines {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() <= 1 {
            continue;
        }
        let row_residue = fields[0].trim();
        let values = &fields[1..];
        if values.len() > residues.len() {
            return Err(DistanceMapError::RowLengthMismatch {
                line: index + 1,
                expected: residues.len(),
                found: values.len(),
            });
        }

        for (column, value) in values.iter().enumerate() {
            let value = value.trim();
            let distance: f64 = value.parse().map_err(|_| DistanceMapError::InvalidDistance {
                line: index + 1,
                value: value.to_string(),
            })?;
            if distance <= CONTACT_DISTANCE && residues[column] != row_residue {
                contacts[column].push(Contact {
                    residue: row_residue.to_string(),
                    distance,
                });
            }
        }
    }

    let map = DistanceMap { residues, contacts };
    debug!(
        residues = map.residues.len(),
        contacts = map.contact_count(),
        "parsed distance map"
    );
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_contacts() {
        let content = "residue distances\r\n\tA1\tA2\tA3\r\nA1\t0.0\t4.2\t9.8\r\nA2\t4.2\t0.0\t5.0\r\nA3\t9.8\t5.0\t0.0\r\n\r\n";
        let map = parse_distance_map_str(content).unwrap();
        assert_eq!(map.residues(), &["A1", "A2", "A3"]);

        let a2: Vec<&str> = map
            .contacts("A2")
            .unwrap()
            .iter()
            .map(|c| c.residue.as_str())
            .collect();
        assert_eq!(a2, vec!["A1", "A3"]);
        assert_eq!(map.contacts("A1").unwrap()[0].distance, 4.2);
        assert_eq!(map.contact_count(), 4);
        assert!(map.contacts("B7").is_none());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_distance_map_str("only a preamble"),
            Err(DistanceMapError::MissingHeader)
        ));
        assert!(matches!(
            parse_distance_map_str("x\n\tA1\nA1\tfar\n"),
            Err(DistanceMapError::InvalidDistance { line: 3, .. })
        ));
        assert!(matches!(
            parse_distance_map_str("x\n\tA1\nA1\t0.0\t1.0\n"),
            Err(DistanceMapError::RowLengthMismatch { line: 3, .. })
        ));
    }
}
