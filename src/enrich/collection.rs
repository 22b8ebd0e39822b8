//! Loading finished enrichment result files back from disk.
//!
//! An enrichment output directory either holds per-cell-type result files
//! directly ("celltype" resolution) or one `E*` subdirectory per ecotype
//! ("ecotype" resolution), in either enrichr or prerank form. Both axes
//! are auto-detected from the directory contents and must be unambiguous.

use crate::data::{Table, Value};
use crate::error::{EcoError, Result};
use crate::settings;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Whether result files are keyed by cell type or by ecotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    CellType,
    Ecotype,
}

/// Which of the two supported enrichment outputs a directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Enrichr,
    Prerank,
}

impl ResultKind {
    fn suffix(self) -> &'static str {
        match self {
            ResultKind::Enrichr => settings::ENRICHR_RESULTS_SUFFIX,
            ResultKind::Prerank => settings::PRERANK_RESULTS_SUFFIX,
        }
    }
}

/// Enrichment results loaded from a source directory, keyed by cell type
/// or ecotype label.
#[derive(Debug, Clone)]
pub struct EnrichmentCollection {
    directory: PathBuf,
    resolution: Resolution,
    kind: ResultKind,
    data: IndexMap<String, Table>,
}

impl EnrichmentCollection {
    /// Load enrichment result files, auto-detecting whatever of
    /// `resolution` / `kind` is not given.
    pub fn load<P: AsRef<Path>>(
        directory: P,
        resolution: Option<Resolution>,
        kind: Option<ResultKind>,
    ) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        let resolution = match resolution {
            Some(res) => res,
            None => detect_resolution(&directory)?,
        };
        let kind = match kind {
            Some(kind) => kind,
            None => detect_kind(&directory, resolution)?,
        };

        let mut collection = Self {
            directory,
            resolution,
            kind,
            data: IndexMap::new(),
        };
        match resolution {
            Resolution::CellType => collection.load_celltype()?,
            Resolution::Ecotype => collection.load_ecotype()?,
        }
        Ok(collection)
    }

    /// The detected or requested resolution.
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The detected or requested result kind.
    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    /// The source directory.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Keys (cell types or ecotype labels) in load order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    /// The result table of one key.
    pub fn get(&self, key: &str) -> Option<&Table> {
        self.data.get(key)
    }

    /// Iterate over (key, table) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.data.iter().map(|(k, t)| (k.as_str(), t))
    }

    /// Number of loaded entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split prerank `Term` values of the form `<gene set>__<term>` into a
    /// trailing `Gene_set` column and a bare `Term`.
    ///
    /// Enrichr results already carry a separate gene set column.
    pub fn split_terms(&mut self) -> Result<()> {
        if self.kind != ResultKind::Prerank {
            return Ok(());
        }
        for table in self.data.values_mut() {
            let terms = table.column("Term")?.to_vec();
            let mut gene_sets = Vec::with_capacity(terms.len());
            let mut bare_terms = Vec::with_capacity(terms.len());
            for term in &terms {
                let text = term.to_text();
                match text.split_once("__") {
                    Some((gene_set, bare)) => {
                        gene_sets.push(Value::Text(gene_set.to_string()));
                        bare_terms.push(Value::Text(bare.to_string()));
                    }
                    None => {
                        gene_sets.push(Value::Text(String::new()));
                        bare_terms.push(term.clone());
                    }
                }
            }
            *table.column_mut("Term")? = bare_terms;
            let position = table.n_cols();
            table.insert_column(position, "Gene_set", gene_sets)?;
        }
        Ok(())
    }

    fn load_celltype(&mut self) -> Result<()> {
        for (key, path) in result_files(&self.directory, self.kind)? {
            let mut table = Table::read(&path, b'\t', false)?;
            let labels = vec![Value::Text(key.clone()); table.n_rows()];
            table.insert_column(0, settings::CELL_TYPE_COL, labels)?;
            self.data.insert(key, table);
        }
        Ok(())
    }

    fn load_ecotype(&mut self) -> Result<()> {
        for subdir in ecotype_subdirs(&self.directory)? {
            let label = subdir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut tables = Vec::new();
            for (key, path) in result_files(&subdir, self.kind)? {
                let mut table = Table::read(&path, b'\t', false)?;
                let labels = vec![Value::Text(key.clone()); table.n_rows()];
                table.insert_column(0, settings::CELL_TYPE_COL, labels)?;
                tables.push(table);
            }
            if tables.is_empty() {
                continue;
            }
            self.data.insert(label, Table::concat(&tables)?);
        }
        Ok(())
    }
}

/// Result files of a kind within a directory, with the key each encodes.
///
/// The key is the filename with the kind suffix removed and anything from
/// a `.txt` onwards cut off.
fn result_files(directory: &Path, kind: ResultKind) -> Result<Vec<(String, PathBuf)>> {
    let suffix = kind.suffix();
    let mut files: Vec<(String, PathBuf)> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            let stripped = name.strip_suffix(suffix)?;
            let key = stripped.split(".txt").next().unwrap_or(stripped);
            Some((key.to_string(), path))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Subdirectories holding per-ecotype results (names starting with `E`).
fn ecotype_subdirs(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut subdirs: Vec<PathBuf> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_dir()
                && path
                    .file_name()
                    .is_some_and(|n| n.to_string_lossy().starts_with('E'))
        })
        .collect();
    subdirs.sort();
    Ok(subdirs)
}

fn detect_resolution(directory: &Path) -> Result<Resolution> {
    let mut has_files = false;
    for entry in fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_file() {
            has_files = true;
        }
    }
    let has_subdirs = !ecotype_subdirs(directory)?.is_empty();

    match (has_files, has_subdirs) {
        (true, true) => Err(EcoError::Ambiguous(format!(
            "{} contains both result files and ecotype subdirectories; specify the resolution",
            directory.display()
        ))),
        (true, false) => Ok(Resolution::CellType),
        (false, true) => Ok(Resolution::Ecotype),
        (false, false) => Err(EcoError::EmptyData(format!(
            "{} contains neither result files nor ecotype subdirectories",
            directory.display()
        ))),
    }
}

fn detect_kind(directory: &Path, resolution: Resolution) -> Result<ResultKind> {
    let probe_dir = match resolution {
        Resolution::CellType => directory.to_path_buf(),
        Resolution::Ecotype => ecotype_subdirs(directory)?
            .into_iter()
            .next()
            .ok_or_else(|| {
                EcoError::EmptyData(format!(
                    "no ecotype subdirectories in {}",
                    directory.display()
                ))
            })?,
    };

    let has_enrichr = !result_files(&probe_dir, ResultKind::Enrichr)?.is_empty();
    let has_prerank = !result_files(&probe_dir, ResultKind::Prerank)?.is_empty();
    match (has_enrichr, has_prerank) {
        (true, true) => Err(EcoError::Ambiguous(format!(
            "{} contains both enrichr and prerank results; specify which to load",
            directory.display()
        ))),
        (true, false) => Ok(ResultKind::Enrichr),
        (false, true) => Ok(ResultKind::Prerank),
        (false, false) => Err(EcoError::EmptyData(format!(
            "no enrichment result files found in {}",
            probe_dir.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_result(dir: &Path, name: &str, term: &str) {
        fs::write(
            dir.join(name),
            format!("State\tTerm\tP-value\nS01\t{}\t0.01\n", term),
        )
        .unwrap();
    }

    #[test]
    fn test_load_celltype_resolution() {
        let dir = tempdir().unwrap();
        write_result(dir.path(), "Fibroblasts.enrichr.txt", "pathway a");
        write_result(dir.path(), "Monocytes.enrichr.txt", "pathway b");

        let collection = EnrichmentCollection::load(dir.path(), None, None).unwrap();
        assert_eq!(collection.resolution(), Resolution::CellType);
        assert_eq!(collection.kind(), ResultKind::Enrichr);
        assert_eq!(collection.len(), 2);

        let table = collection.get("Fibroblasts").unwrap();
        assert_eq!(table.columns()[0], "CellType");
        assert_eq!(
            table.column("CellType").unwrap()[0],
            Value::Text("Fibroblasts".into())
        );
    }

    #[test]
    fn test_load_ecotype_resolution() {
        let dir = tempdir().unwrap();
        let e1 = dir.path().join("E1");
        fs::create_dir(&e1).unwrap();
        write_result(&e1, "Fibroblasts_S01.txt.prerank.txt", "pathway a");
        write_result(&e1, "Monocytes_S02.txt.prerank.txt", "pathway b");

        let collection = EnrichmentCollection::load(dir.path(), None, None).unwrap();
        assert_eq!(collection.resolution(), Resolution::Ecotype);
        assert_eq!(collection.kind(), ResultKind::Prerank);
        assert_eq!(collection.len(), 1);

        let table = collection.get("E1").unwrap();
        assert_eq!(table.n_rows(), 2);
        let cell_types: Vec<String> = table
            .column("CellType")
            .unwrap()
            .iter()
            .map(|v| v.to_text())
            .collect();
        assert_eq!(cell_types, vec!["Fibroblasts_S01", "Monocytes_S02"]);
    }

    #[test]
    fn test_mixed_kinds_are_ambiguous() {
        let dir = tempdir().unwrap();
        write_result(dir.path(), "Fibroblasts.enrichr.txt", "pathway a");
        write_result(dir.path(), "Fibroblasts.prerank.txt", "pathway b");

        let result = EnrichmentCollection::load(dir.path(), None, None);
        assert!(matches!(result, Err(EcoError::Ambiguous(_))));

        // an explicit kind resolves the ambiguity
        let collection =
            EnrichmentCollection::load(dir.path(), None, Some(ResultKind::Prerank)).unwrap();
        assert_eq!(collection.kind(), ResultKind::Prerank);
    }

    #[test]
    fn test_mixed_layout_is_ambiguous() {
        let dir = tempdir().unwrap();
        write_result(dir.path(), "Fibroblasts.enrichr.txt", "pathway a");
        fs::create_dir(dir.path().join("E1")).unwrap();

        let result = EnrichmentCollection::load(dir.path(), None, None);
        assert!(matches!(result, Err(EcoError::Ambiguous(_))));
    }

    #[test]
    fn test_split_terms() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("Fibroblasts.prerank.txt"),
            "Term\tNES\nKEGG_2021_Human__Apoptosis\t1.5\n",
        )
        .unwrap();

        let mut collection = EnrichmentCollection::load(dir.path(), None, None).unwrap();
        collection.split_terms().unwrap();

        let table = collection.get("Fibroblasts").unwrap();
        assert_eq!(
            table.column("Term").unwrap()[0],
            Value::Text("Apoptosis".into())
        );
        assert_eq!(
            table.column("Gene_set").unwrap()[0],
            Value::Text("KEGG_2021_Human".into())
        );
    }
}
