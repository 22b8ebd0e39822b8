//! Ecotype composition loaded from EcoTyper results directories.

use crate::collections::cell_states::gene_set_filename;
use crate::data::Table;
use crate::error::Result;
use crate::settings;
use indexmap::IndexMap;
use log::warn;
use std::path::Path;

/// A named group of (cell type, state) pairs contributing to one ecotype.
#[derive(Debug, Clone, PartialEq)]
pub struct Ecotype {
    label: String,
    members: Vec<(String, String)>,
}

impl Ecotype {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            members: Vec::new(),
        }
    }

    /// The ecotype label (E1, E2, ...).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Add a contributing (cell type, state) pair.
    pub fn add(&mut self, cell_type: &str, state: &str) {
        self.members
            .push((cell_type.to_string(), state.to_string()));
    }

    /// Remove a contributing (cell type, state) pair.
    pub fn remove(&mut self, cell_type: &str, state: &str) {
        self.members
            .retain(|(ct, st)| !(ct == cell_type && st == state));
    }

    /// The contributing (cell type, state) pairs, in composition order.
    pub fn members(&self) -> &[(String, String)] {
        &self.members
    }

    /// The gene set filenames of the contributing pairs.
    pub fn gene_set_filenames(&self) -> Vec<String> {
        self.members
            .iter()
            .map(|(ct, st)| gene_set_filename(ct, st))
            .collect()
    }
}

/// The ecotypes of one or more EcoTyper runs, keyed by label.
///
/// Each run contributes an `Ecotypes/ecotypes.txt` composition file;
/// directories without one produce a warning and no entries.
#[derive(Debug, Clone)]
pub struct EcotypeCollection {
    ecotypes: IndexMap<String, Ecotype>,
    n_runs: usize,
}

impl EcotypeCollection {
    /// Scan results directories for their ecotype composition files.
    pub fn scan<P: AsRef<Path>>(directories: &[P]) -> Result<Self> {
        let mut ecotypes: IndexMap<String, Ecotype> = IndexMap::new();
        let mut n_runs = 0;

        for directory in directories {
            let composition = directory
                .as_ref()
                .join(settings::ECOTYPES_FOLDER)
                .join(settings::ECOTYPES_COMPOSITION_FILE);
            if !composition.exists() {
                warn!(
                    "no {}/{} in {}; skipping",
                    settings::ECOTYPES_FOLDER,
                    settings::ECOTYPES_COMPOSITION_FILE,
                    directory.as_ref().display()
                );
                continue;
            }
            n_runs += 1;

            let table = Table::read(&composition, b'\t', false)?;
            let labels = table.column(settings::ECOTYPE_COL)?;
            let cell_types = table.column(settings::CELL_TYPE_COL)?;
            let states = table.column(settings::STATE_COL)?;

            for ((label, cell_type), state) in labels.iter().zip(cell_types).zip(states) {
                let label = label.to_text();
                ecotypes
                    .entry(label.clone())
                    .or_insert_with(|| Ecotype::new(&label))
                    .add(&cell_type.to_text(), &state.to_text());
            }
        }

        Ok(Self { ecotypes, n_runs })
    }

    /// Number of runs (directories) a composition file was loaded from.
    pub fn n_runs(&self) -> usize {
        self.n_runs
    }

    /// Number of distinct ecotypes.
    pub fn len(&self) -> usize {
        self.ecotypes.len()
    }

    /// True when no ecotype was loaded.
    pub fn is_empty(&self) -> bool {
        self.ecotypes.is_empty()
    }

    /// An ecotype by label.
    pub fn get(&self, label: &str) -> Option<&Ecotype> {
        self.ecotypes.get(label)
    }

    /// Iterate over the ecotypes in composition order.
    pub fn iter(&self) -> impl Iterator<Item = &Ecotype> {
        self.ecotypes.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn make_run_dir() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let ecotypes = dir.path().join("Ecotypes");
        fs::create_dir(&ecotypes).unwrap();
        fs::write(
            ecotypes.join("ecotypes.txt"),
            "CellType\tState\tEcotype\nFibroblasts\tS01\tE1\nMonocytes\tS02\tE1\nFibroblasts\tS03\tE2\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_scan_groups_by_label() {
        let dir = make_run_dir();
        let collection = EcotypeCollection::scan(&[dir.path()]).unwrap();

        assert_eq!(collection.n_runs(), 1);
        assert_eq!(collection.len(), 2);

        let e1 = collection.get("E1").unwrap();
        assert_eq!(
            e1.members(),
            &[
                ("Fibroblasts".to_string(), "S01".to_string()),
                ("Monocytes".to_string(), "S02".to_string())
            ]
        );
        assert_eq!(
            e1.gene_set_filenames(),
            vec!["Fibroblasts_S01.txt", "Monocytes_S02.txt"]
        );
    }

    #[test]
    fn test_missing_composition_warns_not_fails() {
        let dir = tempdir().unwrap();
        let collection = EcotypeCollection::scan(&[dir.path()]).unwrap();
        assert_eq!(collection.n_runs(), 0);
        assert!(collection.is_empty());
    }

    #[test]
    fn test_two_runs_counted() {
        let a = make_run_dir();
        let b = make_run_dir();
        let collection = EcotypeCollection::scan(&[a.path(), b.path()]).unwrap();
        assert_eq!(collection.n_runs(), 2);
    }

    #[test]
    fn test_add_remove() {
        let mut ecotype = Ecotype::new("E1");
        ecotype.add("Fibroblasts", "S01");
        ecotype.add("Monocytes", "S02");
        ecotype.remove("Fibroblasts", "S01");
        assert_eq!(
            ecotype.members(),
            &[("Monocytes".to_string(), "S02".to_string())]
        );
    }
}
