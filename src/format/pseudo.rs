//! Streaming ("pseudo-read") reformatting of large tabular files.
//!
//! Expression matrices can be too large to load, yet only their header line
//! and index column ever need rewriting. This module streams the file once:
//! the header line is rewritten in memory, every following line has its
//! first field rewritten and the rest passed through untouched. No data
//! cell is ever parsed or stored.
//!
//! Tab and newline characters produced inside a rewritten label are
//! stripped before writing, so a substitution can never break the column
//! layout. Separator characters already embedded inside *data* values are
//! not detected; such files were malformed to begin with.

use crate::format::FormatRules;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{EcoError, Result};

/// Rewrite the header line and/or index column of a delimited file without
/// materializing its data.
///
/// Produces the same header and index values as a full
/// [`Formatter`](crate::format::Formatter) pass over the same file.
pub fn reformat_stream<P: AsRef<Path>>(
    input: P,
    output: P,
    sep: u8,
    rules: &FormatRules,
    index: bool,
    names: bool,
) -> Result<()> {
    // in-place rewrites go through a sibling temp file
    let in_place = input.as_ref() == output.as_ref();
    let target = if in_place {
        let mut name = output.as_ref().as_os_str().to_owned();
        name.push(".tmpfile");
        std::path::PathBuf::from(name)
    } else {
        output.as_ref().to_path_buf()
    };

    let sep_char = sep as char;
    let reader = BufReader::new(File::open(input.as_ref())?);
    let mut writer = BufWriter::new(File::create(&target)?);

    let mut lines = reader.lines();

    // header line
    match lines.next() {
        Some(line) => {
            let line = line?;
            if names {
                let rewritten: Vec<String> = line
                    .split(sep_char)
                    .map(|field| strip_delims(&rules.apply(field)))
                    .collect();
                writeln!(writer, "{}", rewritten.join(&sep_char.to_string()))?;
            } else {
                writeln!(writer, "{}", line)?;
            }
        }
        None => {
            return Err(EcoError::EmptyData(format!(
                "{} has no header line",
                input.as_ref().display()
            )))
        }
    }

    // remaining lines: rewrite the first field, pass the rest through
    for line in lines {
        let line = line?;
        if index {
            match line.split_once(sep_char) {
                Some((first, rest)) => {
                    let first = strip_delims(&rules.apply(first));
                    writeln!(writer, "{}{}{}", first, sep_char, rest)?;
                }
                None => {
                    writeln!(writer, "{}", strip_delims(&rules.apply(&line)))?;
                }
            }
        } else {
            writeln!(writer, "{}", line)?;
        }
    }

    writer.flush()?;
    drop(writer);
    if in_place {
        std::fs::rename(&target, output.as_ref())?;
    }
    Ok(())
}

/// Remove delimiter characters a substitution may have introduced.
fn strip_delims(label: &str) -> String {
    label.replace(['\t', '\n'], "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Table, Value};
    use crate::format::Formatter;
    use std::io::Write as _;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    #[test]
    fn test_stream_reformats_header_and_index() {
        let dir = tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "expr.tsv",
            "ID\tSample-1\tSample-2\ngene A\t5\t10\ngene-B\t0\t3\n",
        );
        let output = dir.path().join("out.tsv");

        let rules = FormatRules::ecotyper();
        reformat_stream(&input, &output, b'\t', &rules, true, true).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            "ID\tSample.1\tSample.2\ngene_A\t5\t10\ngene.B\t0\t3\n"
        );
    }

    #[test]
    fn test_stream_matches_full_read() {
        let dir = tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "expr.tsv",
            "ID\tSample-1\tSample 2\ngene A\t5\t10\ngene-B\t0\t3\nother gene\t7\t8\n",
        );

        let streamed = dir.path().join("streamed.tsv");
        let rules = FormatRules::ecotyper();
        reformat_stream(&input, &streamed, b'\t', &rules, true, true).unwrap();

        let mut formatter = Formatter::new(FormatRules::ecotyper());
        formatter.read_table(&input, None).unwrap();
        formatter.reformat(true, true, &[]).unwrap();
        let full = formatter.table().unwrap();

        let streamed = Table::read(&streamed, b'\t', true).unwrap();
        assert_eq!(streamed.columns(), full.columns());
        assert_eq!(streamed.index(), full.index());
    }

    #[test]
    fn test_stream_leaves_data_untouched() {
        let dir = tempdir().unwrap();
        let input = write_file(
            dir.path(),
            "expr.tsv",
            "ID\tS1\ngene-A\t1.23450\n",
        );
        let output = dir.path().join("out.tsv");
        reformat_stream(&input, &output, b'\t', &FormatRules::ecotyper(), true, true).unwrap();

        // the data cell keeps its exact formatting, trailing zero included
        let content = std::fs::read_to_string(&output).unwrap();
        assert!(content.contains("gene.A\t1.23450"));
    }

    #[test]
    fn test_stream_strips_introduced_delimiters() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "expr.tsv", "ID\tS1\ngene A\t1\n");
        let output = dir.path().join("out.tsv");

        // a replacement that would inject a tab gets stripped back out
        let rules = FormatRules::from_pairs([(" ", "\t")]).unwrap();
        reformat_stream(&input, &output, b'\t', &rules, true, false).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content, "ID\tS1\ngeneA\t1\n");
    }

    #[test]
    fn test_stream_index_only() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "expr.tsv", "ID\tSample-1\ngene-A\t1\n");
        let output = dir.path().join("out.tsv");
        reformat_stream(&input, &output, b'\t', &FormatRules::ecotyper(), true, false).unwrap();

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(content, "ID\tSample-1\ngene.A\t1\n");
    }

    #[test]
    fn test_stream_in_place() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "expr.tsv", "ID\tS1\ngene-A\t1\n");
        reformat_stream(&input, &input, b'\t', &FormatRules::ecotyper(), true, true).unwrap();

        let content = std::fs::read_to_string(&input).unwrap();
        assert_eq!(content, "ID\tS1\ngene.A\t1\n");
        assert!(!dir.path().join("expr.tsv.tmpfile").exists());
    }

    #[test]
    fn test_value_types_preserved() {
        let dir = tempdir().unwrap();
        let input = write_file(dir.path(), "expr.tsv", "ID\tS1\ngene-A\t5\n");
        let output = dir.path().join("out.tsv");
        reformat_stream(&input, &output, b'\t', &FormatRules::ecotyper(), true, true).unwrap();

        let table = Table::read(&output, b'\t', true).unwrap();
        assert_eq!(table.column("S1").unwrap()[0], Value::Int(5));
    }
}
