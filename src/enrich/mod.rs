//! Gene set enrichment orchestration over EcoTyper results.
//!
//! The analysis itself is done by the external `gseapy` tool; this module
//! extracts per-cell-state gene sets, drives gseapy over every extracted
//! file, and merges the raw outputs into per-state and per-cell-type
//! result files. Individual per-file failures are logged and skipped so a
//! single bad input cannot sink the batch; the skip count is reported back
//! to the caller.

pub mod collection;
pub mod notebook;

pub use collection::{EnrichmentCollection, Resolution, ResultKind};

use crate::collections::{CellStateCollection, CellTypeCollection, EcotypeCollection};
use crate::data::{Table, Value};
use crate::error::{EcoError, Result};
use crate::settings;
use crate::terminal;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// The two supported enrichment methods and their raw output conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Enrichr,
    Prerank,
}

impl Method {
    /// Suffix of the per-input result files this method produces.
    pub fn results_suffix(self) -> &'static str {
        match self {
            Method::Enrichr => settings::ENRICHR_RESULTS_SUFFIX,
            Method::Prerank => settings::PRERANK_RESULTS_SUFFIX,
        }
    }

    /// Subdirectory the gene-set extraction places this method's inputs in.
    pub fn gene_sets_subdir(self) -> &'static str {
        match self {
            Method::Enrichr => settings::ENRICHR_OUTDIR,
            Method::Prerank => settings::PRERANK_OUTDIR,
        }
    }

    /// Extension and delimiter of the raw fragments gseapy writes.
    fn fragment_format(self) -> (&'static str, u8) {
        match self {
            // enrichr writes tab-delimited .txt reports
            Method::Enrichr => ("txt", b'\t'),
            // prerank writes comma-delimited .csv reports
            Method::Prerank => ("csv", b','),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Method::Enrichr => "enrichr",
            Method::Prerank => "prerank",
        }
    }
}

/// Prerank-only tuning knobs.
#[derive(Debug, Clone)]
pub struct PrerankSettings {
    pub min_size: u32,
    pub max_size: u32,
    pub permutations: u32,
}

impl Default for PrerankSettings {
    fn default() -> Self {
        Self {
            min_size: 5,
            max_size: 500,
            permutations: 1000,
        }
    }
}

/// Extract per-cell-state gene set files from an EcoTyper results directory.
pub fn collect_gene_sets<P: AsRef<Path>, Q: AsRef<Path>>(
    results_dir: P,
    outdir: Q,
    enrichr: bool,
    prerank: bool,
) -> Result<()> {
    let collection = CellStateCollection::scan(&[results_dir])?;
    collection.export_gene_sets(outdir, enrichr, prerank)
}

/// Run `gseapy enrichr` over every extracted gene set file.
///
/// Returns the number of inputs that were skipped after a failure.
pub fn run_enrichr<P: AsRef<Path>>(
    directory: P,
    outdir: P,
    gene_sets: &[String],
    organism: &str,
) -> Result<usize> {
    let gene_sets = gene_sets.join(",");
    let organism = organism.to_string();
    run_batch(Method::Enrichr, directory, outdir, move |infile, tmpdir| {
        let infile = infile.to_string_lossy().into_owned();
        let tmpdir = tmpdir.to_string_lossy().into_owned();
        let status = terminal::run(
            "gseapy",
            &[
                "enrichr",
                "--input-list",
                infile.as_str(),
                "--gene-sets",
                gene_sets.as_str(),
                "--organism",
                organism.as_str(),
                "--outdir",
                tmpdir.as_str(),
                "--no-plot",
            ],
        )?;
        if !status.success() {
            return Err(EcoError::Subprocess {
                command: "gseapy enrichr".to_string(),
                reason: format!("exited with status {}", status),
            });
        }
        Ok(())
    })
}

/// Run `gseapy prerank` over every extracted gene set file.
///
/// Returns the number of inputs that were skipped after a failure.
pub fn run_prerank<P: AsRef<Path>>(
    directory: P,
    outdir: P,
    gene_sets: &[String],
    organism: &str,
    prerank: &PrerankSettings,
) -> Result<usize> {
    let gene_sets = gene_sets.join(",");
    let organism = organism.to_string();
    let min_size = prerank.min_size.to_string();
    let max_size = prerank.max_size.to_string();
    let permutations = prerank.permutations.to_string();
    run_batch(Method::Prerank, directory, outdir, move |infile, tmpdir| {
        let infile = infile.to_string_lossy().into_owned();
        let tmpdir = tmpdir.to_string_lossy().into_owned();
        let status = terminal::run(
            "gseapy",
            &[
                "prerank",
                "--rnk",
                infile.as_str(),
                "--gene-sets",
                gene_sets.as_str(),
                "--organism",
                organism.as_str(),
                "--min-size",
                min_size.as_str(),
                "--max-size",
                max_size.as_str(),
                "--permutation-num",
                permutations.as_str(),
                "--outdir",
                tmpdir.as_str(),
                "--no-plot",
            ],
        )?;
        if !status.success() {
            return Err(EcoError::Subprocess {
                command: "gseapy prerank".to_string(),
                reason: format!("exited with status {}", status),
            });
        }
        Ok(())
    })
}

/// Drive one method over every file of the extracted gene set directory.
fn run_batch<P: AsRef<Path>, F>(
    method: Method,
    directory: P,
    outdir: P,
    invoke: F,
) -> Result<usize>
where
    F: Fn(&Path, &Path) -> Result<()>,
{
    let (input_dir, outdir) = prep_directories(method, directory.as_ref(), outdir.as_ref())?;

    let mut files: Vec<PathBuf> = fs::read_dir(&input_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut skipped = 0;
    for infile in files {
        let filename = infile
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let outfile = outdir.join(format!("{}{}", filename, method.results_suffix()));
        info!("performing gseapy {} on {}", method.name(), infile.display());

        let tmpdir = tempfile::Builder::new()
            .prefix("__tmp")
            .tempdir_in(&outdir)?;
        let result = invoke(&infile, tmpdir.path())
            .and_then(|_| merge_fragments(method, tmpdir.path(), &outfile));
        if let Err(error) = result {
            warn!(
                "gseapy {} failed on {}: {}",
                method.name(),
                infile.display(),
                error
            );
            skipped += 1;
        }
        // the temp directory is removed when it goes out of scope
    }
    if skipped > 0 {
        warn!("{} input file(s) skipped after failures", skipped);
    }
    Ok(skipped)
}

/// Resolve the extracted-inputs directory and the results directory.
///
/// Descends into the method's gene-set subdirectory when present, and nests
/// the results under `gseapy_results` when input and output coincide.
fn prep_directories(
    method: Method,
    directory: &Path,
    outdir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    let subdir = directory.join(method.gene_sets_subdir());
    let input_dir = if subdir.is_dir() {
        subdir
    } else {
        directory.to_path_buf()
    };

    let outdir = if outdir == input_dir {
        outdir.join(settings::GSEAPY_OUTDIR)
    } else {
        outdir.to_path_buf()
    };
    fs::create_dir_all(&outdir)?;
    Ok((input_dir, outdir))
}

/// Concatenate the raw fragments gseapy produced for one input file.
fn merge_fragments(method: Method, tmpdir: &Path, outfile: &Path) -> Result<()> {
    let (extension, delimiter) = method.fragment_format();
    let mut fragments: Vec<PathBuf> = fs::read_dir(tmpdir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension)
        })
        .collect();
    fragments.sort();

    if fragments.is_empty() {
        return Err(EcoError::EmptyData(format!(
            "gseapy produced no .{} fragments in {}",
            extension,
            tmpdir.display()
        )));
    }

    let tables = fragments
        .iter()
        .map(|path| Table::read(path, delimiter, false))
        .collect::<Result<Vec<Table>>>()?;
    let merged = Table::concat(&tables)?;
    merged.write(outfile, b'\t', false)
}

/// Merge the per-state enrichr result files of each cell type into one
/// file carrying a `State` column.
pub fn assemble_enrichr_results<P: AsRef<Path>>(
    directory: P,
    cell_types: &CellTypeCollection,
    outdir: Option<&Path>,
    remove_raw: bool,
) -> Result<()> {
    assemble_results(Method::Enrichr, directory.as_ref(), cell_types, outdir, remove_raw)
}

/// Merge the per-state prerank result files of each cell type into one
/// file carrying a `State` column.
pub fn assemble_prerank_results<P: AsRef<Path>>(
    directory: P,
    cell_types: &CellTypeCollection,
    outdir: Option<&Path>,
    remove_raw: bool,
) -> Result<()> {
    assemble_results(Method::Prerank, directory.as_ref(), cell_types, outdir, remove_raw)
}

fn assemble_results(
    method: Method,
    directory: &Path,
    cell_types: &CellTypeCollection,
    outdir: Option<&Path>,
    remove_raw: bool,
) -> Result<()> {
    let outdir = outdir.unwrap_or(directory);
    fs::create_dir_all(outdir)?;

    for cell_type in cell_types.names() {
        let files = state_result_files(directory, cell_type, method)?;
        if files.is_empty() {
            warn!(
                "no {} results to assemble for cell type {}",
                method.name(),
                cell_type
            );
            continue;
        }

        let mut tables = Vec::with_capacity(files.len());
        for (state, path) in &files {
            let mut table = Table::read(path, b'\t', false)?;
            let states = vec![Value::Text(state.clone()); table.n_rows()];
            table.insert_column(0, settings::STATE_COL, states)?;
            tables.push(table);
        }
        let merged = Table::concat(&tables)?;
        let outfile = outdir.join(format!("{}{}", cell_type, method.results_suffix()));
        merged.write(&outfile, b'\t', false)?;

        if remove_raw {
            for (_, path) in &files {
                fs::remove_file(path)?;
            }
        }
    }
    Ok(())
}

/// The per-state result files of one cell type, with their state labels.
///
/// Files are named `<celltype>_<state>.txt<method suffix>`; the state is
/// everything between the last underscore and the first dot.
fn state_result_files(
    directory: &Path,
    cell_type: &str,
    method: Method,
) -> Result<Vec<(String, PathBuf)>> {
    let prefix = format!("{}_", cell_type);
    let suffix = method.results_suffix();

    let mut files: Vec<(String, PathBuf)> = fs::read_dir(directory)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().into_owned();
            if !name.starts_with(&prefix) || !name.ends_with(suffix) {
                return None;
            }
            let tail = &name[name.rfind('_')? + 1..];
            let state = tail.split('.').next()?.to_string();
            Some((state, path))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Run enrichr restricted to the cell states contributing to ecotypes.
///
/// Each ecotype gets a results subdirectory of its own. Only a single
/// EcoTyper run's worth of ecotypes may be loaded.
pub fn run_enrichr_ecotypes<P: AsRef<Path>>(
    directory: P,
    outdir: P,
    ecotypes: &EcotypeCollection,
    gene_sets: &[String],
    organism: &str,
) -> Result<()> {
    run_ecotypes(
        Method::Enrichr,
        directory.as_ref(),
        outdir.as_ref(),
        ecotypes,
        |staged, ecotype_outdir| {
            run_enrichr(staged, ecotype_outdir, gene_sets, organism).map(|_| ())
        },
    )
}

/// Run prerank restricted to the cell states contributing to ecotypes.
pub fn run_prerank_ecotypes<P: AsRef<Path>>(
    directory: P,
    outdir: P,
    ecotypes: &EcotypeCollection,
    gene_sets: &[String],
    organism: &str,
    prerank: &PrerankSettings,
) -> Result<()> {
    run_ecotypes(
        Method::Prerank,
        directory.as_ref(),
        outdir.as_ref(),
        ecotypes,
        |staged, ecotype_outdir| {
            run_prerank(staged, ecotype_outdir, gene_sets, organism, prerank).map(|_| ())
        },
    )
}

fn run_ecotypes<F>(
    method: Method,
    directory: &Path,
    outdir: &Path,
    ecotypes: &EcotypeCollection,
    run: F,
) -> Result<()>
where
    F: Fn(&Path, &Path) -> Result<()>,
{
    if ecotypes.n_runs() > 1 {
        return Err(EcoError::Config(
            "ecotype enrichment is only available for a single EcoTyper run".into(),
        ));
    }

    let (input_dir, outdir) = prep_directories(method, directory, outdir)?;
    let staging = tempfile::Builder::new()
        .prefix("__ecotype_subset")
        .tempdir_in(&outdir)?;

    for ecotype in ecotypes.iter() {
        info!("[Ecotype] {}", ecotype.label());

        // reset the staging directory for this ecotype's file subset
        for entry in fs::read_dir(staging.path())? {
            fs::remove_file(entry?.path())?;
        }

        let ecotype_outdir = outdir.join(ecotype.label());
        fs::create_dir_all(&ecotype_outdir)?;

        for filename in ecotype.gene_set_filenames() {
            let source = input_dir.join(&filename);
            if !source.exists() {
                warn!(
                    "gene set file {} of ecotype {} is missing",
                    source.display(),
                    ecotype.label()
                );
                continue;
            }
            fs::hard_link(&source, staging.path().join(&filename))?;
        }

        run(staging.path(), &ecotype_outdir)?;
    }
    Ok(())
}
