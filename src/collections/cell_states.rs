//! Cell state discovery and gene-set extraction for enrichment analysis.

use crate::collections::CellTypeCollection;
use crate::data::{Table, Value};
use crate::error::{EcoError, Result};
use crate::settings;
use indexmap::IndexMap;
use log::warn;
use std::fs;
use std::io::Write;
use std::path::Path;

/// The per-state gene tables of every cell type in one or more EcoTyper
/// results directories.
///
/// Each cell type directory carries a `gene_info.txt` with the genes, their
/// state assignments, and their max fold changes. Directories without one
/// produce a warning and an empty entry rather than a failure.
#[derive(Debug, Clone)]
pub struct CellStateCollection {
    /// cell type → state → (gene, max fold change) rows
    states: IndexMap<String, IndexMap<String, Vec<(String, f64)>>>,
}

impl CellStateCollection {
    /// Scan results directories, loading each cell type's `gene_info.txt`.
    pub fn scan<P: AsRef<Path>>(directories: &[P]) -> Result<Self> {
        let cell_types = CellTypeCollection::scan(directories)?;
        let mut states = IndexMap::new();

        for (cell_type, dirs) in cell_types.iter() {
            let mut by_state: IndexMap<String, Vec<(String, f64)>> = IndexMap::new();
            let gene_info = dirs
                .iter()
                .map(|d| d.join(settings::GENE_INFO_FILE))
                .find(|p| p.exists());
            match gene_info {
                Some(path) => Self::load_gene_info(&path, &mut by_state)?,
                None => warn!(
                    "no {} found for cell type {}",
                    settings::GENE_INFO_FILE,
                    cell_type
                ),
            }
            states.insert(cell_type.to_string(), by_state);
        }
        Ok(Self { states })
    }

    fn load_gene_info(
        path: &Path,
        by_state: &mut IndexMap<String, Vec<(String, f64)>>,
    ) -> Result<()> {
        let table = Table::read(path, b'\t', false)?;
        let genes = table.column(settings::GENE_COL)?;
        let state_values = table.column(settings::STATE_COL)?;
        let fold_changes = table.column(settings::REL_EXPR_COL)?;

        for ((gene, state), fold_change) in genes.iter().zip(state_values).zip(fold_changes) {
            let rank = match fold_change {
                Value::Text(_) => 0.0,
                numeric => numeric.as_f64().unwrap_or(0.0),
            };
            by_state
                .entry(state.to_text())
                .or_default()
                .push((gene.to_text(), rank));
        }
        Ok(())
    }

    /// Cell type names in discovery order.
    pub fn cell_types(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// The states of a cell type, in file order.
    pub fn states(&self, cell_type: &str) -> Option<impl Iterator<Item = &str>> {
        self.states
            .get(cell_type)
            .map(|by_state| by_state.keys().map(String::as_str))
    }

    /// The (gene, max fold change) rows of one cell state.
    pub fn genes(&self, cell_type: &str, state: &str) -> Option<&[(String, f64)]> {
        self.states
            .get(cell_type)?
            .get(state)
            .map(Vec::as_slice)
    }

    /// Number of cell types.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// True when no cell type was found.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Export per-cell-state gene set files for enrichment analysis.
    ///
    /// Enrichr inputs (one gene per line) go to `<outdir>/gseapy_enrichr/`,
    /// prerank inputs (gene TAB rank) to `<outdir>/gseapy_prerank/`; each
    /// file is named `<celltype>_<state>.txt`.
    pub fn export_gene_sets<P: AsRef<Path>>(
        &self,
        outdir: P,
        enrichr: bool,
        prerank: bool,
    ) -> Result<()> {
        if !enrichr && !prerank {
            return Err(EcoError::Config(
                "neither enrichr nor prerank export was requested".into(),
            ));
        }
        let enrichr_dir = outdir.as_ref().join(settings::ENRICHR_OUTDIR);
        let prerank_dir = outdir.as_ref().join(settings::PRERANK_OUTDIR);
        if enrichr {
            fs::create_dir_all(&enrichr_dir)?;
        }
        if prerank {
            fs::create_dir_all(&prerank_dir)?;
        }

        for (cell_type, by_state) in &self.states {
            for (state, genes) in by_state {
                let filename = gene_set_filename(cell_type, state);
                if enrichr {
                    let mut file = fs::File::create(enrichr_dir.join(&filename))?;
                    for (gene, _) in genes {
                        writeln!(file, "{}", gene)?;
                    }
                }
                if prerank {
                    let mut file = fs::File::create(prerank_dir.join(&filename))?;
                    for (gene, rank) in genes {
                        writeln!(file, "{}\t{}", gene, rank)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// The gene set filename of one cell type and state.
pub fn gene_set_filename(cell_type: &str, state: &str) -> String {
    format!("{}_{}.txt", cell_type, state)
}
