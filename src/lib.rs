//! ecoprep — a toolbox for preparing and post-processing EcoTyper datasets
//!
//! EcoTyper consumes expression matrices and sample annotations with strict
//! naming and format requirements, and produces per-cell-type state and
//! ecotype assignments. This library covers the plumbing on both sides:
//!
//! - **convert**: tabular (csv/tsv/txt) ↔ Matrix Market conversion, plus
//!   extraction from SeuratObject RDS files via an Rscript helper
//! - **normalise**: raw counts to TPM (log-space) or CPM
//! - **format**: regex reformatting of identifiers and headers, with a
//!   streaming variant for matrices too large to load
//! - **drop**: removing entries from paired annotation/expression datasets
//! - **enrich**: gene set enrichment over EcoTyper cell states via gseapy,
//!   with result assembly and an optional analysis notebook
//!
//! Every operation is a single-shot batch transform over local files; the
//! `ecoprep` CLI binary is a thin layer over this crate.
//!
//! # Example
//!
//! ```no_run
//! use ecoprep::normalise::NormTable;
//!
//! let mut counts = NormTable::read("counts.tsv", b'\t').unwrap();
//! counts.set_lengths("lengths.tsv", None, None).unwrap();
//! counts.to_tpm(5, false).unwrap();
//! counts.save("counts.tpm.tsv", false).unwrap();
//! ```

pub mod collections;
pub mod convert;
pub mod data;
pub mod drop;
pub mod enrich;
pub mod error;
pub mod format;
pub mod normalise;
pub mod settings;
pub mod terminal;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::collections::{
        CellStateCollection, CellTypeCollection, Ecotype, EcotypeCollection,
    };
    pub use crate::convert::{convert, ConvertOptions};
    pub use crate::data::{Dataset, Table, Value};
    pub use crate::drop::{drop_celltypes, drop_from_column, drop_ids, drop_samples};
    pub use crate::enrich::{
        assemble_enrichr_results, assemble_prerank_results, collect_gene_sets, run_enrichr,
        run_enrichr_ecotypes, run_prerank, run_prerank_ecotypes, EnrichmentCollection,
        PrerankSettings, Resolution, ResultKind,
    };
    pub use crate::error::{EcoError, Result};
    pub use crate::format::{pseudo::reformat_stream, FormatRules, Formatter};
    pub use crate::normalise::NormTable;
}
