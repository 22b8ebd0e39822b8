//! Conversion between tabular formats, Matrix Market files, and
//! SeuratObject RDS extractions.
//!
//! Supported routes: tabular ↔ tabular, tabular ↔ mtx, rds/seurat → tabular.

pub mod mtx;
pub mod seurat;
pub mod tabular;

use crate::error::{EcoError, Result};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for a single conversion, mirroring the `convert` subcommand flags.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Output path; derived from the input when not given.
    pub output: Option<PathBuf>,
    /// Input format token overriding the file suffix.
    pub fmt_in: Option<String>,
    /// Output format token overriding the file suffix.
    pub fmt_out: Option<String>,
    /// Treat the output path as a directory to place the converted file in.
    pub recursive: bool,
    /// Also write the index to tabular outputs.
    pub index: bool,
    /// Seurat data slot to extract.
    pub data: Option<String>,
    /// Seurat metadata slots to extract.
    pub metadata: Vec<String>,
}

/// The file suffix (after the last dot), if any.
pub fn file_suffix(name: &str) -> Option<&str> {
    name.rfind('.').map(|loc| &name[loc + 1..])
}

/// The input name with its suffix swapped for `fmt_out`.
fn assemble_outfile_name(input: &str, fmt_out: &str) -> String {
    match input.rfind('.') {
        Some(loc) => format!("{}.{}", &input[..loc], fmt_out),
        None => format!("{}.{}", input, fmt_out),
    }
}

/// Resolve formats and output path, then perform the conversion.
///
/// Returns the path the converted file was written to.
pub fn convert<P: AsRef<Path>>(input: P, options: &ConvertOptions) -> Result<PathBuf> {
    let input = input.as_ref();
    let input_name = input.to_string_lossy().into_owned();

    let mut output = options.output.clone();
    let mut fmt_out = options.fmt_out.clone();

    if fmt_out.is_none() && output.is_none() {
        return Err(EcoError::Config(
            "an output file is required if no output format is specified, or vice versa".into(),
        ));
    }
    if output.is_none() && options.recursive {
        return Err(EcoError::Config(
            "cannot create a non-specified output directory".into(),
        ));
    }
    if fmt_out.is_none() && options.recursive {
        return Err(EcoError::Config(
            "an output format is required when specifying an output directory".into(),
        ));
    }
    if fmt_out.is_none() {
        let name = output.as_ref().unwrap().to_string_lossy().into_owned();
        match file_suffix(&name) {
            Some(suffix) => fmt_out = Some(suffix.to_string()),
            None => {
                return Err(EcoError::Config(
                    "no output format specified and no output file suffix found".into(),
                ))
            }
        }
    }
    let fmt_out = fmt_out.unwrap().to_lowercase();

    let output = match output {
        Some(path) if options.recursive => {
            fs::create_dir_all(&path)?;
            let outfile = assemble_outfile_name(&input_name, &fmt_out);
            let basename = Path::new(&outfile)
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(outfile.clone()));
            path.join(basename)
        }
        Some(path) => path,
        None => PathBuf::from(assemble_outfile_name(&input_name, &fmt_out)),
    };

    let fmt_in = match &options.fmt_in {
        Some(fmt) => fmt.to_lowercase(),
        None => file_suffix(&input_name)
            .ok_or_else(|| {
                EcoError::Config("no input format specified and no input file suffix found".into())
            })?
            .to_lowercase(),
    };

    dispatch(input, &output, &fmt_in, &fmt_out, options)?;
    Ok(output)
}

fn dispatch(
    input: &Path,
    output: &Path,
    fmt_in: &str,
    fmt_out: &str,
    options: &ConvertOptions,
) -> Result<()> {
    let unsupported = || EcoError::UnsupportedConversion {
        from: fmt_in.to_string(),
        to: fmt_out.to_string(),
    };

    if tabular::is_tabular(fmt_in) {
        let sep_in = tabular::separator(fmt_in)?;
        if tabular::is_tabular(fmt_out) {
            // a pure separator change: every file column stays a data column
            let sep_out = tabular::separator(fmt_out)?;
            let table = crate::data::Table::read(input, sep_in, false)?;
            tabular::write(&table, output, sep_out, options.index)
        } else if fmt_out == "mtx" {
            // the first column holds the row labels of the matrix
            let table = tabular::read(input, sep_in)?;
            mtx::write(&table, output)
        } else {
            Err(unsupported())
        }
    } else if fmt_in == "mtx" {
        if tabular::is_tabular(fmt_out) {
            let sep_out = tabular::separator(fmt_out)?;
            let table = mtx::read(input)?;
            // index labels survive the conversion whenever they are not
            // plain integers
            let include_index = options.index || !table.has_numeric_index();
            tabular::write(&table, output, sep_out, include_index)
        } else {
            Err(unsupported())
        }
    } else if seurat::is_seurat(fmt_in) {
        if tabular::is_tabular(fmt_out) {
            let sep_out = tabular::separator(fmt_out)?;
            let status = seurat::to_tabular(
                input,
                output,
                sep_out,
                options.data.as_deref(),
                &options.metadata,
                options.index,
            )?;
            if !status.success() {
                warn!("Rscript exited with status {}", status);
            }
            Ok(())
        } else {
            Err(unsupported())
        }
    } else {
        Err(unsupported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_requires_output_or_format() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "data.tsv", "ID\tS1\na\t1\n");
        let result = convert(&input, &ConvertOptions::default());
        assert!(matches!(result, Err(EcoError::Config(_))));
    }

    #[test]
    fn test_directory_output_needs_format() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "data.tsv", "ID\tS1\na\t1\n");
        let options = ConvertOptions {
            output: Some(dir.path().join("out")),
            recursive: true,
            ..Default::default()
        };
        assert!(matches!(convert(&input, &options), Err(EcoError::Config(_))));
    }

    #[test]
    fn test_suffix_swap_output() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "data.tsv", "ID\tS1\tS2\na\t1\t2\n");
        let options = ConvertOptions {
            fmt_out: Some("csv".into()),
            ..Default::default()
        };
        let out = convert(&input, &options).unwrap();
        assert_eq!(out, dir.path().join("data.csv"));
        // a separator change keeps every column intact
        let content = fs::read_to_string(out).unwrap();
        assert_eq!(content, "ID,S1,S2\na,1,2\n");
    }

    #[test]
    fn test_directory_output() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "data.tsv", "ID\tS1\na\t1\n");
        let outdir = dir.path().join("converted");
        let options = ConvertOptions {
            output: Some(outdir.clone()),
            fmt_out: Some("csv".into()),
            recursive: true,
            ..Default::default()
        };
        let out = convert(&input, &options).unwrap();
        assert_eq!(out, outdir.join("data.csv"));
        assert!(out.exists());
    }

    #[test]
    fn test_tabular_to_mtx_and_back() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "expr.tsv", "ID\tS1\tS2\ngeneA\t1\t0\ngeneB\t0\t2\n");

        let options = ConvertOptions {
            fmt_out: Some("mtx".into()),
            ..Default::default()
        };
        let mtx_path = convert(&input, &options).unwrap();
        assert!(dir.path().join("expr.mtx_rows").exists());

        let options = ConvertOptions {
            fmt_out: Some("tsv".into()),
            output: Some(dir.path().join("back.tsv")),
            ..Default::default()
        };
        let back = convert(&mtx_path, &options).unwrap();
        let table = tabular::read(&back, b'\t').unwrap();
        assert_eq!(
            table.index(),
            &[
                crate::data::Value::Text("geneA".into()),
                crate::data::Value::Text("geneB".into())
            ]
        );
    }

    #[test]
    fn test_unsupported_pair() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "data.tsv", "ID\tS1\na\t1\n");
        let options = ConvertOptions {
            fmt_out: Some("rds".into()),
            ..Default::default()
        };
        assert!(matches!(
            convert(&input, &options),
            Err(EcoError::UnsupportedConversion { .. })
        ));
    }
}
