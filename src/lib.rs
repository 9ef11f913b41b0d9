//! # proteoscope - Proteoform Variant Explorer
//!
//! Derives heatmaps, compositions and summary statistics from a precomputed
//! variant dictionary.
//!
//! ## Architecture
//!
//! The data flows through pure transformations:
//! - `formats`: File loading and validation (JSON dictionary, PDB, legacy TSV)
//! - `model`: Samples, features, allocated proteins and proteoforms
//! - `position`: Relative positions and the per-position variant table
//! - `filter`: Proteoform selection and ordering
//! - `aggregate`: Compositions, heatmap matrix, feature summaries
//! - `stats`: Variability, hydropathicity and the spacing uniformity test
//! - `structure`: Per-residue records of a protein structure
//! - `view`: The immutable view model and its derivation
//! - `controller`: The session holding the current dictionary and selection
//! - `codec`, `config`: Residue alphabet and view settings

pub mod aggregate;
pub mod codec;
pub mod config;
pub mod controller;
pub mod filter;
pub mod formats;
pub mod model;
pub mod position;
pub mod stats;
pub mod structure;
pub mod view;
