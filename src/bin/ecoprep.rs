//! ecoprep - EcoTyper preparation toolbox CLI
//!
//! Command-line interface for converting, normalising, reformatting, and
//! enriching EcoTyper datasets.

use clap::{Parser, Subcommand, ValueEnum};
use ecoprep::collections::{CellTypeCollection, EcotypeCollection};
use ecoprep::convert::{self, ConvertOptions};
use ecoprep::data::Dataset;
use ecoprep::drop::drop_from_column;
use ecoprep::enrich::{
    self, notebook::EnrichmentNotebook, notebook::NotebookConfig, PrerankSettings,
};
use ecoprep::error::{EcoError, Result};
use ecoprep::format::{pseudo::reformat_stream, FormatRules, Formatter};
use ecoprep::normalise::{gtf, NormTable};
use ecoprep::settings;
use std::path::{Path, PathBuf};

/// Normalisation units offered by the `normalise` subcommand.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum NormKind {
    /// Transcripts per million (needs feature lengths)
    Tpm,
    /// Counts per million
    Cpm,
}

/// Tabular separators selectable by format token.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SepToken {
    Tsv,
    Csv,
    Txt,
}

impl SepToken {
    fn as_str(self) -> &'static str {
        match self {
            SepToken::Tsv => "tsv",
            SepToken::Csv => "csv",
            SepToken::Txt => "txt",
        }
    }
}

/// A command-line toolbox for data pre-processing streamlined to work with
/// the EcoTyper framework
#[derive(Parser)]
#[command(name = "ecoprep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert between tabular formats, mtx, and SeuratObject RDS files
    Convert {
        /// Input file
        input: PathBuf,

        /// Output file; by default the input with its suffix swapped
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Treat the output as a directory rather than a target file
        #[arg(short, long)]
        recursive: bool,

        /// The input format in case it is not evident from the file suffix
        #[arg(long = "from")]
        fmt_in: Option<String>,

        /// The output format in case it is not evident from the file suffix
        #[arg(long = "to")]
        fmt_out: Option<String>,

        /// Also save the index (rownames) to tabular output files
        #[arg(short, long)]
        index: bool,

        /// [Seurat-RDS only] The data slot to extract (default: counts)
        #[arg(short, long)]
        data: Option<String>,

        /// [Seurat-RDS only] Metadata slots to extract (default: meta.data)
        #[arg(short, long, num_args = 1..)]
        metadata: Vec<String>,
    },

    /// Remove entries from an EcoTyper dataset
    Drop {
        /// The file storing the annotations
        annotation: PathBuf,

        /// The file storing the expression matrix
        expression: PathBuf,

        /// The samples whose entries to drop
        #[arg(short, long, num_args = 1..)]
        samples: Vec<String>,

        /// The cell-types whose entries to drop
        #[arg(short, long, num_args = 1..)]
        celltypes: Vec<String>,

        /// Specific entries to drop
        #[arg(short, long, num_args = 1..)]
        ids: Vec<String>,

        /// Output basename, generating <basename>.annotation.tsv and
        /// <basename>.expression.tsv; by default '.drop' is appended to
        /// the input filenames
        #[arg(short, long)]
        output: Option<String>,

        /// The column containing the sample annotations
        #[arg(long = "samplecol", default_value = "Sample")]
        sample_col: String,

        /// The column containing the cell-type annotations
        #[arg(long = "celltypecol", default_value = "CellType")]
        celltype_col: String,

        /// The column containing the entry identifiers
        #[arg(long = "idcol", default_value = "ID")]
        id_col: String,
    },

    /// Reformat index, headers, and columns of tabular data files
    Format {
        /// The input file
        input: PathBuf,

        /// The output path; by default the input file is overwritten
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// A rules file of regex replacements, or a preset name (EcoTyper)
        #[arg(short, long)]
        format: Option<String>,

        /// A suffix to add to the output filename (format unaffected)
        #[arg(short, long)]
        suffix: Option<String>,

        /// Reformat the index
        #[arg(short, long)]
        index: bool,

        /// Turn the index into a data column of this name
        #[arg(long)]
        indexname: Option<String>,

        /// Do not write the index to the output file
        #[arg(long)]
        noindex: bool,

        /// Reformat the column names (headers)
        #[arg(short, long)]
        names: bool,

        /// Columns whose values to reformat
        #[arg(short, long, num_args = 1..)]
        columns: Vec<String>,

        /// Only pseudo-read the file (header and index), saving memory on
        /// large matrices
        #[arg(short, long)]
        pseudo: bool,

        /// Separator to use instead of guessing from the file suffix
        #[arg(long)]
        separator: Option<SepToken>,

        /// Preset for expression matrices: --index --names --pseudo
        #[arg(short, long)]
        expression: bool,

        /// Preset for EcoTyper expression matrices: --expression plus the
        /// EcoTyper rules
        #[arg(long)]
        ecoexpression: bool,

        /// Preset for EcoTyper annotation files: --index --indexname ID
        /// --columns CellType Sample plus the EcoTyper rules
        #[arg(short, long)]
        annotation: bool,
    },

    /// Normalise raw counts to TPM or CPM
    Normalise {
        /// The type of normalisation to perform
        #[arg(value_enum)]
        norm: NormKind,

        /// Input file
        input: PathBuf,

        /// Output file; by default the input with an added '.tpm' or
        /// '.cpm' before the suffix
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lengths file; extracted from the GTF file when not provided
        #[arg(short, long)]
        lengths: Option<PathBuf>,

        /// Reference GTF file for transcript lengths and gene names
        #[arg(short, long)]
        gtf: Option<PathBuf>,

        /// When extracting lengths from a GTF, use gene names as primary
        /// identifiers (swaps the id and name columns)
        #[arg(short, long)]
        swap: bool,

        /// Replace gene ids with gene names in the output file
        #[arg(short, long)]
        names: bool,

        /// The number of digits to round the values to
        #[arg(short, long, default_value_t = 5)]
        digits: u32,

        /// Log-scale the normalised values
        #[arg(long)]
        logscale: bool,
    },

    /// Gene set enrichment analysis on EcoTyper results via gseapy
    Enrich {
        /// The directory storing the EcoTyper results (or, with
        /// --notebook, the notebook filename to generate)
        input: PathBuf,

        /// Output directory; by default '<input>_gseapy_results' next to
        /// the input
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Reference gene sets for the enrichment analysis
        #[arg(short, long, num_args = 1..)]
        gene_sets: Vec<String>,

        /// Perform gseapy prerank analysis
        #[arg(short, long)]
        prerank: bool,

        /// Perform gseapy enrichr analysis
        #[arg(short, long)]
        enrichr: bool,

        /// Merge all cell-state files of a cell type into a single file,
        /// removing the individual ones
        #[arg(short, long)]
        assemble: bool,

        /// Only analyse cell-types and states contributing to Ecotypes,
        /// with one results subdirectory per Ecotype
        #[arg(short = 'E', long)]
        ecotypes: bool,

        /// Generate a jupyter notebook for analysing the results; the
        /// input argument then names the notebook file
        #[arg(short, long)]
        notebook: bool,

        /// Configuration file for the notebook generation
        #[arg(long)]
        notebook_config: Option<PathBuf>,

        /// The reference organism
        #[arg(long, default_value = "human")]
        organism: String,

        /// [prerank only] Minimum and maximum gene matches per set
        #[arg(long, num_args = 2, default_values_t = [5, 500])]
        size: Vec<u32>,

        /// [prerank only] Number of permutations
        #[arg(long, default_value_t = 1000)]
        permutations: u32,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            recursive,
            fmt_in,
            fmt_out,
            index,
            data,
            metadata,
        } => cmd_convert(
            &input, output, fmt_in, fmt_out, recursive, index, data, metadata,
        ),

        Commands::Drop {
            annotation,
            expression,
            samples,
            celltypes,
            ids,
            output,
            sample_col,
            celltype_col,
            id_col,
        } => cmd_drop(
            &annotation,
            &expression,
            &ids,
            &samples,
            &celltypes,
            output.as_deref(),
            &sample_col,
            &celltype_col,
            &id_col,
        ),

        Commands::Format {
            input,
            output,
            format,
            suffix,
            index,
            indexname,
            noindex,
            names,
            columns,
            pseudo,
            separator,
            expression,
            ecoexpression,
            annotation,
        } => cmd_format(FormatArgs {
            input,
            output,
            format,
            suffix,
            index,
            indexname,
            noindex,
            names,
            columns,
            pseudo,
            separator,
            expression,
            ecoexpression,
            annotation,
        }),

        Commands::Normalise {
            norm,
            input,
            output,
            lengths,
            gtf,
            swap,
            names,
            digits,
            logscale,
        } => cmd_normalise(norm, &input, output, lengths, gtf, swap, names, digits, logscale),

        Commands::Enrich {
            input,
            output,
            gene_sets,
            prerank,
            enrichr,
            assemble,
            ecotypes,
            notebook,
            notebook_config,
            organism,
            size,
            permutations,
        } => cmd_enrich(
            &input,
            output,
            &gene_sets,
            enrichr,
            prerank,
            assemble,
            ecotypes,
            notebook,
            notebook_config.as_deref(),
            &organism,
            &size,
            permutations,
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_convert(
    input: &Path,
    output: Option<PathBuf>,
    fmt_in: Option<String>,
    fmt_out: Option<String>,
    recursive: bool,
    index: bool,
    data: Option<String>,
    metadata: Vec<String>,
) -> Result<()> {
    let options = ConvertOptions {
        output,
        fmt_in,
        fmt_out,
        recursive,
        index,
        data,
        metadata,
    };
    let written = convert::convert(input, &options)?;
    eprintln!("Wrote {}", written.display());
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn cmd_drop(
    annotation: &Path,
    expression: &Path,
    ids: &[String],
    samples: &[String],
    celltypes: &[String],
    output: Option<&str>,
    sample_col: &str,
    celltype_col: &str,
    id_col: &str,
) -> Result<()> {
    eprintln!("Loading dataset...");
    let mut dataset = Dataset::read(annotation, expression)?;
    eprintln!(
        "Loaded {} annotation rows x {} expression columns",
        dataset.annotation.n_rows(),
        dataset.expression.n_cols()
    );

    if !ids.is_empty() {
        dataset = drop_from_column(&dataset, ids, id_col)?;
    }
    if !samples.is_empty() {
        dataset = drop_from_column(&dataset, samples, sample_col)?;
    }
    if !celltypes.is_empty() {
        dataset = drop_from_column(&dataset, celltypes, celltype_col)?;
    }

    let (annotation_out, expression_out) = match output {
        Some(base) => (
            PathBuf::from(format!("{}.annotation.tsv", base)),
            PathBuf::from(format!("{}.expression.tsv", base)),
        ),
        None => (
            PathBuf::from(format!("{}.drop", annotation.display())),
            PathBuf::from(format!("{}.drop", expression.display())),
        ),
    };
    dataset.write(&annotation_out, &expression_out)?;
    eprintln!(
        "Kept {} entries; wrote {} and {}",
        dataset.annotation.n_rows(),
        annotation_out.display(),
        expression_out.display()
    );
    Ok(())
}

struct FormatArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<String>,
    suffix: Option<String>,
    index: bool,
    indexname: Option<String>,
    noindex: bool,
    names: bool,
    columns: Vec<String>,
    pseudo: bool,
    separator: Option<SepToken>,
    expression: bool,
    ecoexpression: bool,
    annotation: bool,
}

fn cmd_format(mut args: FormatArgs) -> Result<()> {
    if args.input.is_dir() {
        return Err(EcoError::Config(
            "the 'format' command does not support directories".into(),
        ));
    }

    // presets first, explicit flags stay untouched
    if args.expression {
        args.index = true;
        args.names = true;
        args.pseudo = true;
    } else if args.ecoexpression {
        args.index = true;
        args.names = true;
        args.pseudo = true;
        args.format = Some("EcoTyper".into());
    } else if args.annotation {
        args.index = true;
        args.indexname = Some("ID".into());
        args.columns = vec!["CellType".into(), "Sample".into()];
        args.format = Some("EcoTyper".into());
    }

    let rules = match &args.format {
        Some(name) => FormatRules::resolve(name)?,
        None => return Err(EcoError::Config("no formats are specified".into())),
    };

    let output = args.output.clone().unwrap_or_else(|| args.input.clone());

    if args.pseudo {
        if !args.columns.is_empty() || args.indexname.is_some() {
            return Err(EcoError::Config(
                "pseudo mode can only reformat the index and headers".into(),
            ));
        }
        let sep_token = args.separator.map(SepToken::as_str);
        let sep = resolve_separator(&args.input, sep_token)?;
        let target = match &args.suffix {
            Some(suffix) => PathBuf::from(format!("{}{}", output.display(), suffix)),
            None => output,
        };
        eprintln!("Pseudo-reformatting {}...", args.input.display());
        reformat_stream(&args.input, &target, sep, &rules, args.index, args.names)?;
        eprintln!("Wrote {}", target.display());
        return Ok(());
    }

    eprintln!("Reading {}...", args.input.display());
    let mut formatter = Formatter::new(rules);
    formatter.read_table(&args.input, args.separator.map(SepToken::as_str))?;
    formatter.reformat(args.index, args.names, &args.columns)?;

    if let Some(indexname) = &args.indexname {
        formatter.index_to_column(indexname)?;
        args.noindex = true;
    }

    formatter.write_table(&output, args.suffix.as_deref(), !args.noindex)?;
    eprintln!("Wrote {}", output.display());
    Ok(())
}

fn resolve_separator(path: &Path, token: Option<&str>) -> Result<u8> {
    use ecoprep::convert::tabular;
    match token {
        Some(fmt) => tabular::separator(fmt),
        None => {
            let name = path.to_string_lossy();
            let suffix = convert::file_suffix(&name).unwrap_or("");
            tabular::separator(suffix).map_err(|_| {
                EcoError::Config(format!(
                    "could not guess the separator for {}; specify it manually",
                    path.display()
                ))
            })
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_normalise(
    norm: NormKind,
    input: &Path,
    output: Option<PathBuf>,
    mut lengths: Option<PathBuf>,
    gtf_file: Option<PathBuf>,
    swap: bool,
    names: bool,
    digits: u32,
    logscale: bool,
) -> Result<()> {
    let is_tpm = matches!(norm, NormKind::Tpm);

    if is_tpm && lengths.is_none() && gtf_file.is_none() {
        return Err(EcoError::Config(
            "a lengths file or GTF file must be provided for TPM normalisation".into(),
        ));
    }
    if names && lengths.is_none() && gtf_file.is_none() {
        return Err(EcoError::Config(
            "a lengths file or GTF file must be provided to get gene names".into(),
        ));
    }

    let output = output.unwrap_or_else(|| default_norm_output(input, norm));

    // extract lengths from the GTF when they are needed but not provided
    let need_lengths_for_tpm = is_tpm && lengths.is_none() && gtf_file.is_some();
    let need_names_for_cpm = !is_tpm && lengths.is_none() && names;
    if need_lengths_for_tpm || need_names_for_cpm {
        let gtf_file = gtf_file.as_ref().unwrap();
        let lengths_file = PathBuf::from(format!("{}.lengths", gtf_file.display()));
        eprintln!("Extracting feature lengths from {}...", gtf_file.display());
        gtf::call_gtftools(gtf_file, &lengths_file, "l")?;
        gtf::add_gtf_gene_names(gtf_file, &lengths_file, swap)?;
        lengths = Some(lengths_file);
    }

    eprintln!("Reading counts from {}...", input.display());
    let mut table = NormTable::read(input, b'\t')?;

    if let Some(lengths) = &lengths {
        eprintln!("Aligning feature lengths from {}...", lengths.display());
        table.set_lengths(lengths, None, None)?;
    }

    match norm {
        NormKind::Tpm => {
            eprintln!("Converting to TPM...");
            table.to_tpm(digits, logscale)?;
        }
        NormKind::Cpm => {
            eprintln!("Converting to CPM...");
            table.to_cpm(digits, logscale)?;
        }
    }

    table.save(&output, names)?;
    eprintln!("Wrote {}", output.display());
    Ok(())
}

/// The input path with `.tpm` / `.cpm` inserted before the suffix.
fn default_norm_output(input: &Path, norm: NormKind) -> PathBuf {
    let kind = match norm {
        NormKind::Tpm => "tpm",
        NormKind::Cpm => "cpm",
    };
    let name = input.to_string_lossy();
    match name.rfind('.') {
        Some(loc) => PathBuf::from(format!("{}.{}{}", &name[..loc], kind, &name[loc..])),
        None => PathBuf::from(format!("{}.{}", name, kind)),
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_enrich(
    input: &Path,
    output: Option<PathBuf>,
    gene_sets: &[String],
    enrichr: bool,
    prerank: bool,
    assemble: bool,
    ecotypes: bool,
    notebook: bool,
    notebook_config: Option<&Path>,
    organism: &str,
    size: &[u32],
    permutations: u32,
) -> Result<()> {
    if notebook {
        let config_path = notebook_config.ok_or_else(|| {
            EcoError::Config("a notebook configuration file is required for generation".into())
        })?;
        eprintln!("Generating notebook from {}...", config_path.display());
        let config = NotebookConfig::from_file(config_path)?;
        let generated = EnrichmentNotebook::new(&config);
        generated.save(input)?;
        eprintln!("Wrote {}", input.display());
        return Ok(());
    }

    if gene_sets.is_empty() {
        return Err(EcoError::Config("no gene sets were specified".into()));
    }
    if !enrichr && !prerank {
        return Err(EcoError::Config(
            "no analysis selected; specify --prerank and/or --enrichr".into(),
        ));
    }

    let output = output.unwrap_or_else(|| default_enrich_output(input));
    std::fs::create_dir_all(&output)?;
    let gene_sets_dir = output.join(settings::GENE_SETS_OUTDIR);
    std::fs::create_dir_all(&gene_sets_dir)?;

    eprintln!("Collecting gene sets from {}...", input.display());
    enrich::collect_gene_sets(input, &gene_sets_dir, enrichr, prerank)?;

    let prerank_settings = PrerankSettings {
        min_size: size.first().copied().unwrap_or(5),
        max_size: size.get(1).copied().unwrap_or(500),
        permutations,
    };

    if !ecotypes {
        if enrichr {
            eprintln!("Running gseapy enrichr...");
            let skipped = enrich::run_enrichr(&gene_sets_dir, &output, gene_sets, organism)?;
            report_skipped(skipped);
            if assemble {
                eprintln!("Assembling enrichr results per cell type...");
                let cell_types = CellTypeCollection::scan(&[input])?;
                enrich::assemble_enrichr_results(&output, &cell_types, None, true)?;
            }
        }
        if prerank {
            eprintln!("Running gseapy prerank...");
            let skipped = enrich::run_prerank(
                &gene_sets_dir,
                &output,
                gene_sets,
                organism,
                &prerank_settings,
            )?;
            report_skipped(skipped);
            if assemble {
                eprintln!("Assembling prerank results per cell type...");
                let cell_types = CellTypeCollection::scan(&[input])?;
                enrich::assemble_prerank_results(&output, &cell_types, None, true)?;
            }
        }
    } else {
        let ecotype_collection = EcotypeCollection::scan(&[input])?;
        eprintln!(
            "Restricting to {} ecotype(s)...",
            ecotype_collection.len()
        );
        if enrichr {
            enrich::run_enrichr_ecotypes(
                &gene_sets_dir,
                &output,
                &ecotype_collection,
                gene_sets,
                organism,
            )?;
        }
        if prerank {
            enrich::run_prerank_ecotypes(
                &gene_sets_dir,
                &output,
                &ecotype_collection,
                gene_sets,
                organism,
                &prerank_settings,
            )?;
        }
    }

    eprintln!("Done! Results in {}", output.display());
    Ok(())
}

fn report_skipped(skipped: usize) {
    if skipped > 0 {
        eprintln!("  {} input file(s) skipped after failures", skipped);
    }
}

/// The default enrichment output directory next to the input.
fn default_enrich_output(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = format!("{}_{}", name, settings::GSEAPY_OUTDIR);
    match input.parent() {
        Some(parent) => parent.join(base),
        None => PathBuf::from(base),
    }
}
