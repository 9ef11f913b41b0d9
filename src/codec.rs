//! Residue symbol tables.
//!
//! This module provides:
//! - The 23-symbol amino acid alphabet with heatmap codes (1-23)
//! - Display designations, colors and physicochemical groups
//! - Scaled Kyte-Doolittle hydropathicity values
//! - Secondary-structure classes used by the structure view

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Size of the residue alphabet: 20 standard residues, any, termination and gap.
pub const ALPHABET_SIZE: usize = 23;

/// Symbol marking an incomplete codon in variant calls. It is counted as [`Residue::Any`].
pub const INCOMPLETE_MARKER: char = 'U';

/// Errors raised when decoding symbols.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Unknown residue symbol: '{0}'")]
    UnknownSymbol(char),

    #[error("Unknown residue code: {0}")]
    UnknownCode(u8),

    #[error("Unknown three-letter residue name: '{0}'")]
    UnknownName(String),
}

/// Physicochemical group of a residue, used for legend pieces of the heatmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidueGroup {
    PolarPositive,
    PolarNegative,
    PolarNeutral,
    Cysteine,
    Aromatic,
    Aliphatic,
    Any,
    Termination,
    Gap,
}

impl ResidueGroup {
    /// Legend label of the group.
    pub fn label(&self) -> &'static str {
        match self {
            ResidueGroup::PolarPositive => "Polar, Positive",
            ResidueGroup::PolarNegative => "Polar, Negative",
            ResidueGroup::PolarNeutral => "Polar, Neutral",
            ResidueGroup::Cysteine => "Cysteine",
            ResidueGroup::Aromatic => "Aromatic",
            ResidueGroup::Aliphatic => "Aliphatic",
            ResidueGroup::Any => "Unknown/Any",
            ResidueGroup::Termination => "Termination",
            ResidueGroup::Gap => "Gap",
        }
    }
}

/// One symbol of the amino acid alphabet.
///
/// Variants are declared in code order, so `Residue::ALL[code - 1]` is the residue with `code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Residue {
    His,
    Lys,
    Arg,
    Asp,
    Glu,
    Ser,
    Thr,
    Asn,
    Gln,
    Cys,
    Phe,
    Trp,
    Tyr,
    Ala,
    Val,
    Leu,
    Ile,
    Met,
    Pro,
    Gly,
    Any,
    Termination,
    Gap,
}

/// Static properties of a residue.
struct ResidueInfo {
    symbol: char,
    name: &'static str,
    designation: &'static str,
    color: &'static str,
    group: ResidueGroup,
    scaled_hydropathicity: Option<f64>,
}

const fn entry(
    symbol: char,
    name: &'static str,
    designation: &'static str,
    color: &'static str,
    group: ResidueGroup,
    scaled_hydropathicity: Option<f64>,
) -> ResidueInfo {
    ResidueInfo {
        symbol,
        name,
        designation,
        color,
        group,
        scaled_hydropathicity,
    }
}

// Indexed by code - 1.
static RESIDUE_TABLE: [ResidueInfo; ALPHABET_SIZE] = [
    entry('H', "HIS", "His (H)", "#69b8e2", ResidueGroup::PolarPositive, Some(0.144)),
    entry('K', "LYS", "Lys (K)", "#7ec2e7", ResidueGroup::PolarPositive, Some(0.067)),
    entry('R', "ARG", "Arg (R)", "#94cceb", ResidueGroup::PolarPositive, Some(0.000)),
    entry('D', "ASP", "Asp (D)", "#ff6670", ResidueGroup::PolarNegative, Some(0.111)),
    entry('E', "GLU", "Glu (E)", "#ff8088", ResidueGroup::PolarNegative, Some(0.111)),
    entry('S', "SER", "Ser (S)", "#8fb082", ResidueGroup::PolarNeutral, Some(0.411)),
    entry('T', "THR", "Thr (T)", "#9dba91", ResidueGroup::PolarNeutral, Some(0.422)),
    entry('N', "ASN", "Asn (N)", "#abc4a1", ResidueGroup::PolarNeutral, Some(0.111)),
    entry('Q', "GLN", "Gln (Q)", "#b9ceb1", ResidueGroup::PolarNeutral, Some(0.111)),
    entry('C', "CYS", "Cys (C)", "#ffee80", ResidueGroup::Cysteine, Some(0.778)),
    entry('F', "PHE", "Phe (F)", "#b08ed7", ResidueGroup::Aromatic, Some(0.811)),
    entry('W', "TRP", "Trp (W)", "#bda1de", ResidueGroup::Aromatic, Some(0.400)),
    entry('Y', "TYR", "Tyr (Y)", "#a37bd1", ResidueGroup::Aromatic, Some(0.356)),
    entry('A', "ALA", "Ala (A)", "#4d9099", ResidueGroup::Aliphatic, Some(0.700)),
    entry('V', "VAL", "Val (V)", "#55a0aa", ResidueGroup::Aliphatic, Some(0.967)),
    entry('L', "LEU", "Leu (L)", "#66a9b2", ResidueGroup::Aliphatic, Some(0.922)),
    entry('I', "ILE", "Ile (I)", "#77b3bb", ResidueGroup::Aliphatic, Some(1.000)),
    entry('M', "MET", "Met (M)", "#88bcc3", ResidueGroup::Aliphatic, Some(0.711)),
    entry('P', "PRO", "Pro (P)", "#99c6cc", ResidueGroup::Aliphatic, Some(0.322)),
    entry('G', "GLY", "Gly (G)", "#aacfd4", ResidueGroup::Aliphatic, Some(0.456)),
    entry('X', "ANY", "Any (X)", "#a89471", ResidueGroup::Any, None),
    entry('*', "TER", "Ter.", "#FF0099", ResidueGroup::Termination, None),
    entry('-', "DEL", "Gap", "#3c3c3c", ResidueGroup::Gap, None),
];

impl Residue {
    /// All residues in code order.
    pub const ALL: [Residue; ALPHABET_SIZE] = [
        Residue::His,
        Residue::Lys,
        Residue::Arg,
        Residue::Asp,
        Residue::Glu,
        Residue::Ser,
        Residue::Thr,
        Residue::Asn,
        Residue::Gln,
        Residue::Cys,
        Residue::Phe,
        Residue::Trp,
        Residue::Tyr,
        Residue::Ala,
        Residue::Val,
        Residue::Leu,
        Residue::Ile,
        Residue::Met,
        Residue::Pro,
        Residue::Gly,
        Residue::Any,
        Residue::Termination,
        Residue::Gap,
    ];

    fn info(&self) -> &'static ResidueInfo {
        &RESIDUE_TABLE[*self as usize]
    }

    /// Heatmap code of the residue (1-23).
    pub fn code(&self) -> u8 {
        *self as u8 + 1
    }

    /// One-letter symbol.
    pub fn symbol(&self) -> char {
        self.info().symbol
    }

    /// Three-letter name as used in structure files (e.g. `ALA`).
    pub fn name(&self) -> &'static str {
        self.info().name
    }

    /// Human-readable designation, e.g. `Ala (A)`.
    pub fn designation(&self) -> &'static str {
        self.info().designation
    }

    /// Display color as a hex string.
    pub fn color(&self) -> &'static str {
        self.info().color
    }

    pub fn group(&self) -> ResidueGroup {
        self.info().group
    }

    /// Scaled Kyte-Doolittle hydropathicity in [0, 1]; `None` for non-standard symbols.
    pub fn scaled_hydropathicity(&self) -> Option<f64> {
        self.info().scaled_hydropathicity
    }

    /// True for the 20 standard amino acids.
    pub fn is_standard(&self) -> bool {
        self.scaled_hydropathicity().is_some()
    }

    /// Decodes a one-letter symbol, case-insensitively.
    ///
    /// The incomplete-codon marker decodes to [`Residue::Any`].
    pub fn from_char(c: char) -> Result<Self, CodecError> {
        let upper = c.to_ascii_uppercase();
        if upper == INCOMPLETE_MARKER {
            return Ok(Residue::Any);
        }
        Residue::ALL
            .iter()
            .copied()
            .find(|r| r.symbol() == upper)
            .ok_or(CodecError::UnknownSymbol(c))
    }

    /// Decodes a heatmap code (1-23).
    pub fn from_code(code: u8) -> Result<Self, CodecError> {
        match code {
            1..=23 => Ok(Residue::ALL[code as usize - 1]),
            _ => Err(CodecError::UnknownCode(code)),
        }
    }

    /// Decodes a three-letter name (`ALA`, ..., `ANY`, `TER`, `DEL`; `INC` maps to any).
    pub fn from_name(name: &str) -> Result<Self, CodecError> {
        let upper = name.trim().to_ascii_uppercase();
        if upper == "INC" {
            return Ok(Residue::Any);
        }
        Residue::ALL
            .iter()
            .copied()
            .find(|r| r.name() == upper)
            .ok_or(CodecError::UnknownName(name.to_string()))
    }
}

impl fmt::Display for Residue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Secondary structure class of a structural residue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecondaryStructure {
    #[default]
    Coil,
    Sheet,
    Helix,
}

impl fmt::Display for SecondaryStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecondaryStructure::Coil => write!(f, "coil"),
            SecondaryStructure::Sheet => write!(f, "sheet"),
            SecondaryStructure::Helix => write!(f, "helix"),
        }
    }
}
