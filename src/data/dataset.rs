//! An EcoTyper dataset: a paired annotation table and expression matrix.

use crate::data::Table;
use crate::error::Result;
use log::warn;
use std::path::Path;

/// Annotation columns EcoTyper expects to find.
pub const BENCHMARK_COLS: [&str; 3] = ["ID", "CellType", "Sample"];

/// A paired annotation table and expression matrix.
///
/// Annotation rows correspond to expression columns through the shared
/// sample identifiers.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub annotation: Table,
    pub expression: Table,
}

impl Dataset {
    pub fn new(annotation: Table, expression: Table) -> Self {
        Self {
            annotation,
            expression,
        }
    }

    /// Read an annotation and expression file pair (both tab-delimited,
    /// first column as index).
    pub fn read<P: AsRef<Path>>(annotation: P, expression: P) -> Result<Self> {
        let annotation = read_annotation(annotation)?;
        let expression = Table::read(expression, b'\t', true)?;
        Ok(Self {
            annotation,
            expression,
        })
    }

    /// Write both tables tab-delimited, keeping their indices.
    pub fn write<P: AsRef<Path>>(&self, annotation: P, expression: P) -> Result<()> {
        self.annotation.write(annotation, b'\t', true)?;
        self.expression.write(expression, b'\t', true)?;
        Ok(())
    }
}

/// Read an annotation table, warning about missing EcoTyper benchmark columns.
pub fn read_annotation<P: AsRef<Path>>(path: P) -> Result<Table> {
    let table = Table::read(path.as_ref(), b'\t', true)?;
    for col in BENCHMARK_COLS {
        if !table.has_column(col) && table.index_name() != Some(col) {
            warn!(
                "annotation file {} is not EcoTyper-friendly (yet): column {} not found",
                path.as_ref().display(),
                col
            );
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn annotation_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID\tCellType\tSample").unwrap();
        writeln!(file, "cell1\tFibroblasts\tS1").unwrap();
        writeln!(file, "cell2\tMonocytes\tS2").unwrap();
        file.flush().unwrap();
        file
    }

    fn expression_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Gene\tcell1\tcell2").unwrap();
        writeln!(file, "geneA\t5\t10").unwrap();
        writeln!(file, "geneB\t0\t3").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_dataset() {
        let ann = annotation_file();
        let expr = expression_file();
        let dataset = Dataset::read(ann.path(), expr.path()).unwrap();

        assert_eq!(dataset.annotation.n_rows(), 2);
        assert_eq!(dataset.expression.columns(), &["cell1", "cell2"]);
    }

    #[test]
    fn test_write_roundtrip() {
        let ann = annotation_file();
        let expr = expression_file();
        let dataset = Dataset::read(ann.path(), expr.path()).unwrap();

        let ann_out = NamedTempFile::new().unwrap();
        let expr_out = NamedTempFile::new().unwrap();
        dataset.write(ann_out.path(), expr_out.path()).unwrap();

        let back = Dataset::read(ann_out.path(), expr_out.path()).unwrap();
        assert_eq!(back.annotation, dataset.annotation);
        assert_eq!(back.expression, dataset.expression);
    }
}
