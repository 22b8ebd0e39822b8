//! Cell type discovery across EcoTyper results directories.

use crate::error::Result;
use crate::settings;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// The cell types found in one or more EcoTyper results directories.
///
/// Each cell type maps to the data directories it was found in; the same
/// cell type may appear under several results roots. Built once at command
/// invocation and read-only afterwards.
#[derive(Debug, Clone)]
pub struct CellTypeCollection {
    cell_types: IndexMap<String, Vec<PathBuf>>,
}

impl CellTypeCollection {
    /// Scan results directories for cell type subdirectories, excluding the
    /// reserved `Ecotypes` folder.
    pub fn scan<P: AsRef<Path>>(directories: &[P]) -> Result<Self> {
        let mut cell_types: IndexMap<String, Vec<PathBuf>> = IndexMap::new();
        for directory in directories {
            for entry in fs::read_dir(directory.as_ref())? {
                let entry = entry?;
                if !entry.path().is_dir() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().into_owned();
                if name == settings::ECOTYPES_FOLDER {
                    continue;
                }
                cell_types.entry(name).or_default().push(entry.path());
            }
        }
        Ok(Self { cell_types })
    }

    /// Cell type names in discovery order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cell_types.keys().map(String::as_str)
    }

    /// The data directories of a cell type.
    pub fn get(&self, cell_type: &str) -> Option<&[PathBuf]> {
        self.cell_types.get(cell_type).map(Vec::as_slice)
    }

    /// Iterate over (cell type, directories) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.cell_types
            .iter()
            .map(|(name, dirs)| (name.as_str(), dirs.as_slice()))
    }

    /// Number of distinct cell types.
    pub fn len(&self) -> usize {
        self.cell_types.len()
    }

    /// True when no cell type was found.
    pub fn is_empty(&self) -> bool {
        self.cell_types.is_empty()
    }

    /// True if a cell type of this name was found.
    pub fn contains(&self, cell_type: &str) -> bool {
        self.cell_types.contains_key(cell_type)
    }
}
