//! Read and write Matrix Market (mtx) coordinate files.
//!
//! Row and column labels travel in side-car files sharing the matrix base
//! name with the `.mtx_rows` / `.mtx_cols` suffixes, one label per line.
//! Side-car lengths are not validated against the matrix dimensions; a
//! mismatched side-car silently misaligns the labels.

use crate::data::{Table, Value};
use crate::error::{EcoError, Result};
use sprs::io::{read_matrix_market, write_matrix_market};
use sprs::TriMat;
use std::fs;
use std::path::{Path, PathBuf};

/// Read an mtx file (and its side-car label files, when present) into a
/// dense-equivalent [`Table`].
pub fn read<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let tri: TriMat<f64> =
        read_matrix_market(path).map_err(|e| EcoError::MatrixMarket(e.to_string()))?;

    let (n_rows, n_cols) = (tri.rows(), tri.cols());
    let columns: Vec<String> = (0..n_cols).map(|c| c.to_string()).collect();
    let mut data: Vec<Vec<Value>> = vec![vec![Value::Float(0.0); n_rows]; n_cols];
    for (value, (row, col)) in tri.triplet_iter() {
        data[col][row] = Value::Float(*value);
    }

    let mut table = Table::new(columns, data)?;
    attach_names(&mut table, path)?;
    Ok(table)
}

/// Write a [`Table`] as an mtx file, emitting a row/column side-car only
/// when the respective first label is non-numeric text.
pub fn write<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let (n_rows, n_cols) = (table.n_rows(), table.n_cols());

    let mut tri = TriMat::new((n_rows, n_cols));
    for (col_idx, name) in table.columns().iter().enumerate() {
        for (row_idx, value) in table.column(name)?.iter().enumerate() {
            let value = value.as_f64().ok_or_else(|| {
                EcoError::Numerical(format!(
                    "non-numeric cell in column '{}' cannot be written to mtx",
                    name
                ))
            })?;
            if value != 0.0 {
                tri.add_triplet(row_idx, col_idx, value);
            }
        }
    }
    write_matrix_market(path, &tri).map_err(|e| EcoError::MatrixMarket(e.to_string()))?;

    if !table.has_numeric_columns() {
        fs::write(sidecar_path(path, "cols"), table.columns().join("\n"))?;
    }
    if !table.has_numeric_index() {
        let labels: Vec<String> = table.index().iter().map(|v| v.to_text()).collect();
        fs::write(sidecar_path(path, "rows"), labels.join("\n"))?;
    }
    Ok(())
}

/// Assign labels from `<base>.mtx_rows` / `<base>.mtx_cols` in file order.
fn attach_names(table: &mut Table, path: &Path) -> Result<()> {
    let cols = sidecar_path(path, "cols");
    if cols.exists() {
        let names: Vec<String> = read_labels(&cols)?;
        table.set_columns(names)?;
    }

    let rows = sidecar_path(path, "rows");
    if rows.exists() {
        let labels: Vec<Value> = read_labels(&rows)?
            .into_iter()
            .map(Value::Text)
            .collect();
        table.set_index(labels)?;
    }
    Ok(())
}

/// One label per line; only the first tab-delimited field counts.
fn read_labels(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(|line| line.split('\t').next().unwrap_or("").to_string())
        .collect())
}

fn sidecar_path(path: &Path, kind: &str) -> PathBuf {
    let name = path.to_string_lossy();
    if let Some(stripped) = name.strip_suffix(".mtx") {
        PathBuf::from(format!("{}.mtx_{}", stripped, kind))
    } else {
        PathBuf::from(format!("{}.mtx_{}", name, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn labelled_table() -> Table {
        let columns = vec!["Sample1".to_string(), "Sample2".to_string()];
        let data = vec![
            vec![Value::Float(1.0), Value::Float(0.0)],
            vec![Value::Float(0.0), Value::Float(2.5)],
        ];
        let mut table = Table::new(columns, data).unwrap();
        table
            .set_index(vec![Value::Text("geneA".into()), Value::Text("geneB".into())])
            .unwrap();
        table
    }

    #[test]
    fn test_roundtrip_with_labels() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("matrix.mtx");

        let table = labelled_table();
        write(&table, &path).unwrap();

        assert!(dir.path().join("matrix.mtx_rows").exists());
        assert!(dir.path().join("matrix.mtx_cols").exists());

        let back = read(&path).unwrap();
        assert_eq!(back.columns(), table.columns());
        assert_eq!(back.index(), table.index());
        assert_eq!(back.column("Sample2").unwrap()[1], Value::Float(2.5));
    }

    #[test]
    fn test_numeric_labels_produce_no_sidecars() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("numeric.mtx");

        // numeric column names and default integer index
        let columns = vec!["0".to_string(), "1".to_string()];
        let data = vec![
            vec![Value::Float(1.0), Value::Float(2.0)],
            vec![Value::Float(3.0), Value::Float(4.0)],
        ];
        let table = Table::new(columns, data).unwrap();
        write(&table, &path).unwrap();

        assert!(!dir.path().join("numeric.mtx_rows").exists());
        assert!(!dir.path().join("numeric.mtx_cols").exists());
    }

    #[test]
    fn test_row_labels_only() {
        // two non-numeric row labels, numeric column indices: the column
        // side-car must be omitted and the row labels preserved
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows_only.mtx");

        let columns = vec!["0".to_string(), "1".to_string()];
        let data = vec![
            vec![Value::Float(5.0), Value::Float(0.0)],
            vec![Value::Float(0.0), Value::Float(7.0)],
        ];
        let mut table = Table::new(columns, data).unwrap();
        table
            .set_index(vec![Value::Text("geneA".into()), Value::Text("geneB".into())])
            .unwrap();
        write(&table, &path).unwrap();

        assert!(dir.path().join("rows_only.mtx_rows").exists());
        assert!(!dir.path().join("rows_only.mtx_cols").exists());

        let back = read(&path).unwrap();
        assert_eq!(
            back.index(),
            &[Value::Text("geneA".into()), Value::Text("geneB".into())]
        );
    }

    #[test]
    fn test_text_cells_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.mtx");
        let table = Table::new(
            vec!["S1".to_string()],
            vec![vec![Value::Text("not a number".into())]],
        )
        .unwrap();
        assert!(write(&table, &path).is_err());
    }
}
