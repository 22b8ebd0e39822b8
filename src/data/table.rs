//! A lightweight in-memory table of named columns over a shared row index.
//!
//! Disk files are the persistence layer; a `Table` only lives for the
//! duration of one command. Cells are promoted to numeric types on read and
//! re-stringified by consumers that need text (e.g. the reformatter).

use crate::error::{EcoError, Result};
use std::fmt;
use std::path::Path;

/// A single cell value: text, integer, or float.
///
/// Numeric-looking strings become numeric cells when a file is read.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Value {
    /// Parse a raw field, promoting numeric-looking strings.
    pub fn parse(raw: &str) -> Self {
        if let Ok(i) = raw.parse::<i64>() {
            return Value::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Text(raw.to_string())
    }

    /// True for `Int` and `Float` cells.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Value::Text(_))
    }

    /// Numeric view of the cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(_) => None,
        }
    }

    /// Text view of the cell (numbers are formatted).
    pub fn to_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{}", s),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

/// An ordered sequence of named columns over a shared row index.
///
/// No uniqueness constraint is enforced on index values.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    index_name: Option<String>,
    index: Vec<Value>,
    columns: Vec<String>,
    /// Column-major cell storage, parallel to `columns`.
    data: Vec<Vec<Value>>,
}

impl Table {
    /// Create a table from column names and column-major data.
    ///
    /// The index defaults to `0..n_rows` integers with no name.
    pub fn new(columns: Vec<String>, data: Vec<Vec<Value>>) -> Result<Self> {
        if columns.len() != data.len() {
            return Err(EcoError::InvalidParameter(format!(
                "{} column names for {} data columns",
                columns.len(),
                data.len()
            )));
        }
        let n_rows = data.first().map_or(0, |c| c.len());
        if let Some(bad) = data.iter().find(|c| c.len() != n_rows) {
            return Err(EcoError::InvalidParameter(format!(
                "ragged columns: expected {} rows, found {}",
                n_rows,
                bad.len()
            )));
        }
        let index = (0..n_rows as i64).map(Value::Int).collect();
        Ok(Self {
            index_name: None,
            index,
            columns,
            data,
        })
    }

    /// Read a delimited file, treating `#`-prefixed lines as comments.
    ///
    /// With `index_col` the first column becomes the row index and its
    /// header becomes the index name.
    pub fn read<P: AsRef<Path>>(path: P, sep: u8, index_col: bool) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(sep)
            .comment(Some(b'#'))
            .flexible(true)
            .from_path(path.as_ref())?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        if headers.is_empty() {
            return Err(EcoError::EmptyData(format!(
                "no header in {}",
                path.as_ref().display()
            )));
        }

        let (index_name, columns) = if index_col {
            let name = headers[0].clone();
            let name = if name.is_empty() { None } else { Some(name) };
            (name, headers[1..].to_vec())
        } else {
            (None, headers)
        };

        let n_cols = columns.len();
        let offset = usize::from(index_col);
        let mut index = Vec::new();
        let mut data: Vec<Vec<Value>> = vec![Vec::new(); n_cols];

        for record in reader.records() {
            let record = record?;
            if index_col {
                index.push(Value::parse(record.get(0).unwrap_or("")));
            }
            // short rows are padded with empty text so columns stay rectangular
            for (i, col) in data.iter_mut().enumerate() {
                col.push(Value::parse(record.get(i + offset).unwrap_or("")));
            }
        }

        if !index_col {
            let n_rows = data.first().map_or(0, |c| c.len());
            index = (0..n_rows as i64).map(Value::Int).collect();
        }

        Ok(Self {
            index_name,
            index,
            columns,
            data,
        })
    }

    /// Write the table as a delimited file.
    pub fn write<P: AsRef<Path>>(&self, path: P, sep: u8, include_index: bool) -> Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(sep)
            .from_path(path.as_ref())?;

        let mut header: Vec<String> = Vec::with_capacity(self.columns.len() + 1);
        if include_index {
            header.push(self.index_name.clone().unwrap_or_default());
        }
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for row in 0..self.n_rows() {
            let mut record: Vec<String> = Vec::with_capacity(header.len());
            if include_index {
                record.push(self.index[row].to_text());
            }
            for col in &self.data {
                record.push(col[row].to_text());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Number of data rows.
    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    /// Number of data columns (index excluded).
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Replace the column names.
    pub fn set_columns(&mut self, names: Vec<String>) -> Result<()> {
        if names.len() != self.columns.len() {
            return Err(EcoError::InvalidParameter(format!(
                "{} names for {} columns",
                names.len(),
                self.columns.len()
            )));
        }
        self.columns = names;
        Ok(())
    }

    /// Row index values in order.
    pub fn index(&self) -> &[Value] {
        &self.index
    }

    /// Replace the row index values.
    pub fn set_index(&mut self, index: Vec<Value>) -> Result<()> {
        if index.len() != self.n_rows() {
            return Err(EcoError::InvalidParameter(format!(
                "{} index values for {} rows",
                index.len(),
                self.n_rows()
            )));
        }
        self.index = index;
        Ok(())
    }

    /// Name of the index column, if any.
    pub fn index_name(&self) -> Option<&str> {
        self.index_name.as_deref()
    }

    /// Set or clear the index name.
    pub fn set_index_name(&mut self, name: Option<String>) {
        self.index_name = name;
    }

    /// True if a column with this name exists.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    fn column_position(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| EcoError::MissingColumn(name.to_string()))
    }

    /// Values of a named column.
    pub fn column(&self, name: &str) -> Result<&[Value]> {
        let pos = self.column_position(name)?;
        Ok(&self.data[pos])
    }

    /// Mutable values of a named column.
    pub fn column_mut(&mut self, name: &str) -> Result<&mut Vec<Value>> {
        let pos = self.column_position(name)?;
        Ok(&mut self.data[pos])
    }

    /// Insert a column at a position.
    pub fn insert_column(&mut self, pos: usize, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.n_rows() {
            return Err(EcoError::InvalidParameter(format!(
                "{} values for {} rows",
                values.len(),
                self.n_rows()
            )));
        }
        let pos = pos.min(self.columns.len());
        self.columns.insert(pos, name.to_string());
        self.data.insert(pos, values);
        Ok(())
    }

    /// Remove columns by name; names without a matching column are ignored.
    pub fn drop_columns(&mut self, names: &[String]) {
        let keep: Vec<bool> = self.columns.iter().map(|c| !names.contains(c)).collect();
        let mut idx = 0;
        self.columns.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
        let mut idx = 0;
        self.data.retain(|_| {
            let k = keep[idx];
            idx += 1;
            k
        });
    }

    /// Keep only the rows where `mask` is true.
    pub fn filter_rows(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.n_rows() {
            return Err(EcoError::InvalidParameter(format!(
                "mask of {} entries for {} rows",
                mask.len(),
                self.n_rows()
            )));
        }
        let index = self
            .index
            .iter()
            .zip(mask)
            .filter(|(_, &m)| m)
            .map(|(v, _)| v.clone())
            .collect();
        let data = self
            .data
            .iter()
            .map(|col| {
                col.iter()
                    .zip(mask)
                    .filter(|(_, &m)| m)
                    .map(|(v, _)| v.clone())
                    .collect()
            })
            .collect();
        Ok(Self {
            index_name: self.index_name.clone(),
            index,
            columns: self.columns.clone(),
            data,
        })
    }

    /// Stack tables on top of each other, aligning columns by name.
    ///
    /// The column order is that of first appearance; cells missing from a
    /// table are filled with empty text.
    pub fn concat(tables: &[Table]) -> Result<Table> {
        if tables.is_empty() {
            return Err(EcoError::EmptyData("no tables to concatenate".to_string()));
        }
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for col in &table.columns {
                if !columns.contains(col) {
                    columns.push(col.clone());
                }
            }
        }

        let n_rows: usize = tables.iter().map(|t| t.n_rows()).sum();
        let mut index = Vec::with_capacity(n_rows);
        let mut data: Vec<Vec<Value>> = vec![Vec::with_capacity(n_rows); columns.len()];

        for table in tables {
            index.extend(table.index.iter().cloned());
            for (pos, name) in columns.iter().enumerate() {
                match table.column(name) {
                    Ok(values) => data[pos].extend(values.iter().cloned()),
                    Err(_) => data[pos]
                        .extend(std::iter::repeat(Value::Text(String::new())).take(table.n_rows())),
                }
            }
        }

        Ok(Table {
            index_name: tables[0].index_name.clone(),
            index,
            columns,
            data,
        })
    }

    /// True when the first index label is numeric (or the table is empty).
    pub fn has_numeric_index(&self) -> bool {
        self.index.first().map_or(true, |v| v.is_numeric())
    }

    /// True when the first column name parses as a number (or there are none).
    pub fn has_numeric_columns(&self) -> bool {
        self.columns
            .first()
            .map_or(true, |c| c.parse::<f64>().is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_tsv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_value_parse_promotion() {
        assert_eq!(Value::parse("42"), Value::Int(42));
        assert_eq!(Value::parse("4.25"), Value::Float(4.25));
        assert_eq!(Value::parse("gene-A"), Value::Text("gene-A".to_string()));
    }

    #[test]
    fn test_read_with_index() {
        let file = write_tsv("ID\tS1\tS2\ngeneA\t5\t10\ngeneB\t0\t3\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();

        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.index_name(), Some("ID"));
        assert_eq!(table.columns(), &["S1", "S2"]);
        assert_eq!(table.index()[0], Value::Text("geneA".to_string()));
        assert_eq!(table.column("S2").unwrap()[1], Value::Int(3));
    }

    #[test]
    fn test_read_skips_comments() {
        let file = write_tsv("# a comment line\nID\tS1\ngeneA\t5\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();
        assert_eq!(table.n_rows(), 1);
        assert_eq!(table.columns(), &["S1"]);
    }

    #[test]
    fn test_write_read_roundtrip_with_index() {
        let file = write_tsv("ID\tS1\tS2\ngeneA\t5\t10\ngeneB\t0\t3\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();

        let out = NamedTempFile::new().unwrap();
        table.write(out.path(), b',', true).unwrap();
        let back = Table::read(out.path(), b',', true).unwrap();

        assert_eq!(back, table);
    }

    #[test]
    fn test_write_without_index() {
        let file = write_tsv("ID\tS1\ngeneA\t5\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();

        let out = NamedTempFile::new().unwrap();
        table.write(out.path(), b'\t', false).unwrap();
        let content = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(content, "S1\n5\n");
    }

    #[test]
    fn test_missing_column_errors() {
        let file = write_tsv("ID\tS1\ngeneA\t5\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();
        assert!(matches!(
            table.column("nope"),
            Err(EcoError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_filter_rows() {
        let file = write_tsv("ID\tS1\na\t1\nb\t2\nc\t3\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();
        let kept = table.filter_rows(&[true, false, true]).unwrap();
        assert_eq!(kept.n_rows(), 2);
        assert_eq!(kept.index()[1], Value::Text("c".to_string()));
        assert_eq!(kept.column("S1").unwrap()[1], Value::Int(3));
    }

    #[test]
    fn test_drop_columns() {
        let file = write_tsv("ID\tS1\tS2\tS3\na\t1\t2\t3\n");
        let mut table = Table::read(file.path(), b'\t', true).unwrap();
        table.drop_columns(&["S2".to_string()]);
        assert_eq!(table.columns(), &["S1", "S3"]);
        assert_eq!(table.column("S3").unwrap()[0], Value::Int(3));
    }

    #[test]
    fn test_insert_column() {
        let file = write_tsv("ID\tS1\na\t1\nb\t2\n");
        let mut table = Table::read(file.path(), b'\t', true).unwrap();
        table
            .insert_column(0, "State", vec!["S01".into(), "S02".into()])
            .unwrap();
        assert_eq!(table.columns(), &["State", "S1"]);
    }

    #[test]
    fn test_concat_aligns_columns() {
        let a = write_tsv("ID\tTerm\tScore\na\tx\t1\n");
        let b = write_tsv("ID\tTerm\tScore\nb\ty\t2\n");
        let a = Table::read(a.path(), b'\t', true).unwrap();
        let b = Table::read(b.path(), b'\t', true).unwrap();
        let merged = Table::concat(&[a, b]).unwrap();
        assert_eq!(merged.n_rows(), 2);
        assert_eq!(merged.column("Term").unwrap()[1], Value::Text("y".into()));
    }

    #[test]
    fn test_numeric_index_probe() {
        let file = write_tsv("ID\tS1\ngeneA\t5\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();
        assert!(!table.has_numeric_index());

        let file = write_tsv("ID\tS1\n7\t5\n");
        let table = Table::read(file.path(), b'\t', true).unwrap();
        assert!(table.has_numeric_index());
    }
}
