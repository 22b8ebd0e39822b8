//! Shared column names, reserved file names, and output-file suffixes for
//! working with EcoTyper results directories.

/// The data column holding the state assignment.
pub const STATE_COL: &str = "State";

/// The data column holding the cell type assignment.
pub const CELL_TYPE_COL: &str = "CellType";

/// The data column holding gene names or identifiers.
pub const GENE_COL: &str = "Gene";

/// The data column holding the relative expression (max fold change).
pub const REL_EXPR_COL: &str = "MaxFC";

/// The data column holding the ecotype assignment.
pub const ECOTYPE_COL: &str = "Ecotype";

/// Per-celltype file with gene info, max fold changes, and state assignments.
pub const GENE_INFO_FILE: &str = "gene_info.txt";

/// The folder containing the Ecotypes of an EcoTyper run.
pub const ECOTYPES_FOLDER: &str = "Ecotypes";

/// The composition file of an EcoTyper run's Ecotypes.
pub const ECOTYPES_COMPOSITION_FILE: &str = "ecotypes.txt";

/// Output subdirectory for extracted prerank gene sets.
pub const PRERANK_OUTDIR: &str = "gseapy_prerank";

/// Output subdirectory for extracted enrichr gene sets.
pub const ENRICHR_OUTDIR: &str = "gseapy_enrichr";

/// Output directory for gseapy results.
pub const GSEAPY_OUTDIR: &str = "gseapy_results";

/// Output directory for extracted gene set files.
pub const GENE_SETS_OUTDIR: &str = "gene_sets";

/// Suffix for gseapy enrichr result files.
pub const ENRICHR_RESULTS_SUFFIX: &str = ".enrichr.txt";

/// Suffix for gseapy prerank result files.
pub const PRERANK_RESULTS_SUFFIX: &str = ".prerank.txt";
