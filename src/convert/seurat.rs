//! Bridge to the Rscript helper that extracts data and metadata tables
//! from a SeuratObject stored in an RDS file.
//!
//! The helper performs the actual extraction and tabular writing; this
//! module only marshals arguments and blocks on the subprocess. The exit
//! status is returned to the caller but not otherwise inspected.

use crate::error::Result;
use std::env;
use std::path::Path;
use std::process::ExitStatus;

/// File suffixes interpreted as storing a SeuratObject.
pub const SUPPORTED_FORMATS: [&str; 2] = ["rds", "seurat"];

/// The data slot extracted when none is requested.
pub const DEFAULT_DATA: &str = "counts";

/// The metadata slot extracted when none is requested.
pub const DEFAULT_METADATA: &str = "meta.data";

/// Environment variable overriding the helper script location.
pub const SCRIPT_ENV: &str = "ECOPREP_SEURAT_SCRIPT";

/// Fallback helper script name resolved on `PATH`.
pub const SCRIPT_NAME: &str = "seurat_rds_to_tabular.R";

/// True if the (lowercased) format token denotes a SeuratObject file.
pub fn is_seurat(format: &str) -> bool {
    SUPPORTED_FORMATS.contains(&format)
}

/// Extract tables from a SeuratObject into files sharing `output` as base name.
///
/// `metadata` slots are passed as repeated tokens. Blocks until the Rscript
/// process exits and returns its exit status.
pub fn to_tabular<P: AsRef<Path>>(
    filename: P,
    output: P,
    sep: u8,
    data_slot: Option<&str>,
    metadata: &[String],
    index: bool,
) -> Result<ExitStatus> {
    let script = env::var(SCRIPT_ENV).unwrap_or_else(|_| SCRIPT_NAME.to_string());
    let sep = (sep as char).to_string();
    let input = filename.as_ref().to_string_lossy().into_owned();
    let output = output.as_ref().to_string_lossy().into_owned();
    let data_slot = data_slot.unwrap_or(DEFAULT_DATA);

    let mut args: Vec<&str> = vec![
        script.as_str(),
        input.as_str(),
        "--output",
        output.as_str(),
        "--separator",
        sep.as_str(),
    ];
    if index {
        args.push("-i");
    }
    args.push("--data");
    args.push(data_slot);
    args.push("--metadata");
    let default_metadata = [DEFAULT_METADATA.to_string()];
    let metadata = if metadata.is_empty() {
        &default_metadata[..]
    } else {
        metadata
    };
    for slot in metadata {
        args.push(slot);
    }

    crate::terminal::run("Rscript", &args)
}
