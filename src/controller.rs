//! Session controller.
//!
//! This module holds the single current view state:
//! - The loaded dictionary (and optional external structure and legacy tables)
//! - The current selection and settings
//! - The last derived view, reused while its inputs are unchanged
//!
//! Loading is all-or-nothing: a file that fails to load or validate leaves the
//! previous state untouched.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::aggregate::{feature_overview, OverviewNode};
use crate::config::{ConfigError, ViewSettings};
use crate::formats::annotation_table::AnnotationTable;
use crate::formats::distance_map::DistanceMap;
use crate::formats::pdb::PdbStructure;
use crate::formats::schema::{SchemaValidator, StructuralValidator};
use crate::formats::{self, LoadError};
use crate::model::VariantDictionary;
use crate::structure::StructureLookup;
use crate::view::{derive_view_with_structure, Selection, ViewError, ViewModel};

/// Errors raised by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No dictionary loaded")]
    NoDictionary,

    #[error("No feature selected")]
    NoFeatureSelected,

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

struct CachedView {
    selection: Selection,
    settings: ViewSettings,
    view: ViewModel,
}

/// The current dictionary, selection, settings and derived view.
pub struct Session {
    validator: Box<dyn SchemaValidator>,
    dictionary: Option<VariantDictionary>,
    source: Option<PathBuf>,
    structure: Option<PdbStructure>,
    distance_map: Option<DistanceMap>,
    annotation_table: Option<AnnotationTable>,
    feature: Option<String>,
    chain: Option<String>,
    settings: ViewSettings,
    cache: Option<CachedView>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ViewSettings::default())
    }
}

impl Session {
    /// Creates an empty session validating dictionaries structurally.
    pub fn new(settings: ViewSettings) -> Self {
        Self::with_validator(settings, Box::new(StructuralValidator))
    }

    pub fn with_validator(settings: ViewSettings, validator: Box<dyn SchemaValidator>) -> Self {
        Self {
            validator,
            dictionary: None,
            source: None,
            structure: None,
            distance_map: None,
            annotation_table: None,
            feature: None,
            chain: None,
            settings,
            cache: None,
        }
    }

    /// Loads a dictionary file. On failure the current state is kept.
    ///
    /// A successful load clears the selection and every file tied to the
    /// previous dictionary.
    pub fn load_dictionary<P: AsRef<Path>>(&mut self, path: P) -> SessionResult<&VariantDictionary> {
        let dictionary = formats::load_dictionary(&path, self.validator.as_ref())?;
        self.install_dictionary(dictionary, path.as_ref().to_path_buf());
        self.dictionary.as_ref().ok_or(SessionError::NoDictionary)
    }

    fn install_dictionary(&mut self, dictionary: VariantDictionary, source: PathBuf) {
        info!(features = dictionary.features.len(), "installing dictionary");
        self.dictionary = Some(dictionary);
        self.source = Some(source);
        self.structure = None;
        self.distance_map = None;
        self.annotation_table = None;
        self.feature = None;
        self.chain = None;
        self.cache = None;
    }

    /// Loads a structure file used instead of the embedded one.
    pub fn load_structure<P: AsRef<Path>>(&mut self, path: P) -> SessionResult<()> {
        let structure = formats::load_structure(path)?;
        self.structure = Some(structure);
        self.cache = None;
        Ok(())
    }

    pub fn load_distance_map<P: AsRef<Path>>(&mut self, path: P) -> SessionResult<&DistanceMap> {
        let map = formats::load_distance_map(path)?;
        Ok(self.distance_map.insert(map))
    }

    /// Loads an annotation table for the selected feature's strand (sense when none is selected).
    pub fn load_annotation_table<P: AsRef<Path>>(&mut self, path: P) -> SessionResult<&AnnotationTable> {
        let is_sense = self
            .feature
            .as_deref()
            .and_then(|name| self.dictionary.as_ref()?.feature(name))
            .map(|feature| feature.is_sense)
            .unwrap_or(true);
        let table = formats::load_annotation_table(path, is_sense)?;
        Ok(self.annotation_table.insert(table))
    }

    pub fn dictionary(&self) -> Option<&VariantDictionary> {
        self.dictionary.as_ref()
    }

    pub fn distance_map(&self) -> Option<&DistanceMap> {
        self.distance_map.as_ref()
    }

    pub fn annotation_table(&self) -> Option<&AnnotationTable> {
        self.annotation_table.as_ref()
    }

    pub fn settings(&self) -> &ViewSettings {
        &self.settings
    }

    /// Selects a feature and resets the chain to the protein's first one.
    pub fn select_feature(&mut self, feature: &str) -> SessionResult<()> {
        let dictionary = self.dictionary.as_ref().ok_or(SessionError::NoDictionary)?;
        let found = dictionary
            .feature(feature)
            .ok_or_else(|| ViewError::UnknownFeature(feature.to_string()))?;
        if !found.has_protein() {
            return Err(ViewError::NoAllocatedProtein(feature.to_string()).into());
        }
        self.feature = Some(feature.to_string());
        self.chain = None;
        Ok(())
    }

    pub fn select_chain(&mut self, chain: &str) -> SessionResult<()> {
        let feature = self.feature.as_deref().ok_or(SessionError::NoFeatureSelected)?;
        let known = self
            .dictionary
            .as_ref()
            .and_then(|d| d.feature(feature))
            .and_then(|f| f.allocated_protein.as_ref())
            .map(|p| p.chain_sequences.contains_key(chain))
            .unwrap_or(false);
        if !known {
            return Err(ViewError::UnknownChain {
                feature: feature.to_string(),
                chain: chain.to_string(),
            }
            .into());
        }
        self.chain = Some(chain.to_string());
        Ok(())
    }

    /// Replaces the settings after validating them.
    pub fn update_settings(&mut self, settings: ViewSettings) -> SessionResult<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    pub fn selection(&self) -> Option<Selection> {
        self.feature
            .as_ref()
            .map(|feature| Selection::new(feature.clone(), self.chain.clone()))
    }

    /// The view of the current selection, re-derived only when the selection or
    /// settings changed since the last call.
    pub fn view(&mut self) -> SessionResult<&ViewModel> {
        let dictionary = self.dictionary.as_ref().ok_or(SessionError::NoDictionary)?;
        let selection = self.selection().ok_or(SessionError::NoFeatureSelected)?;

        let fresh = matches!(
            &self.cache,
            Some(cached) if cached.selection == selection && cached.settings == self.settings
        );
        if !fresh {
            let structure = self.structure.as_ref().map(|s| s as &dyn StructureLookup);
            let view = derive_view_with_structure(dictionary, &selection, &self.settings, structure)?;
            self.cache = Some(CachedView {
                selection,
                settings: self.settings.clone(),
                view,
            });
        } else {
            debug!("reusing derived view");
        }

        self.cache
            .as_ref()
            .map(|cached| &cached.view)
            .ok_or(SessionError::NoFeatureSelected)
    }

    /// Chromosome / class / feature tree; features without a class are grouped
    /// under the dictionary file name.
    pub fn overview(&self) -> SessionResult<OverviewNode> {
        let dictionary = self.dictionary.as_ref().ok_or(SessionError::NoDictionary)?;
        let default_class = self
            .source
            .as_ref()
            .map(formats::file_stem)
            .unwrap_or_else(|| "dictionary".to_string());
        Ok(feature_overview(dictionary, &default_class))
    }
}
