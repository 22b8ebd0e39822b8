//! Normalisation of raw count tables to TPM or CPM.
//!
//! TPM is computed in log-space: with large counts the per-feature
//! `count / length` products overflow long before their column sum does,
//! so each column is shifted by its log-sum before exponentiating.

pub mod gtf;

use crate::data::{Table, Value};
use crate::error::{EcoError, Result};
use log::info;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;

const MILLION_LOG: f64 = 13.815510557964274; // ln(1e6)

/// A raw counts table plus optional aligned feature lengths, normalisable
/// to TPM or CPM.
#[derive(Debug, Clone)]
pub struct NormTable {
    index_name: Option<String>,
    ids: Vec<String>,
    sample_names: Vec<String>,
    counts: DMatrix<f64>,
    normalized: Option<DMatrix<f64>>,
    lengths: Option<Vec<f64>>,
    names: Option<Vec<String>>,
}

impl NormTable {
    /// Read a counts table (first column as index, `#` comments skipped).
    pub fn read<P: AsRef<Path>>(path: P, sep: u8) -> Result<Self> {
        let table = Table::read(path.as_ref(), sep, true)?;
        Self::from_table(&table)
    }

    /// Build from an in-memory table of numeric counts.
    pub fn from_table(table: &Table) -> Result<Self> {
        let n_rows = table.n_rows();
        let n_cols = table.n_cols();
        if n_rows == 0 || n_cols == 0 {
            return Err(EcoError::EmptyData("counts table is empty".to_string()));
        }

        let mut counts = DMatrix::zeros(n_rows, n_cols);
        for (j, name) in table.columns().iter().enumerate() {
            for (i, value) in table.column(name)?.iter().enumerate() {
                counts[(i, j)] = value.as_f64().ok_or_else(|| {
                    EcoError::Numerical(format!(
                        "non-numeric count '{}' in column '{}'",
                        value, name
                    ))
                })?;
            }
        }

        Ok(Self {
            index_name: table.index_name().map(String::from),
            ids: table.index().iter().map(|v| v.to_text()).collect(),
            sample_names: table.columns().to_vec(),
            counts,
            normalized: None,
            lengths: None,
            names: None,
        })
    }

    /// Load a feature-lengths table and align it with the counts.
    ///
    /// Features missing from either side are dropped (inner join) and both
    /// are reordered to the shared counts order. The length column defaults
    /// to the last column, the name column to the first data column.
    pub fn set_lengths<P: AsRef<Path>>(
        &mut self,
        path: P,
        length_col: Option<&str>,
        name_col: Option<&str>,
    ) -> Result<()> {
        let lengths_table = Table::read(path.as_ref(), b'\t', true)?;
        let columns = lengths_table.columns();
        if columns.is_empty() {
            return Err(EcoError::EmptyData(format!(
                "no length columns in {}",
                path.as_ref().display()
            )));
        }

        let length_col = match length_col {
            Some(name) => {
                if !lengths_table.has_column(name) {
                    return Err(EcoError::MissingColumn(format!(
                        "{} (in {})",
                        name,
                        path.as_ref().display()
                    )));
                }
                name.to_string()
            }
            None => columns.last().unwrap().clone(),
        };
        let name_col = match name_col {
            Some(name) => name.to_string(),
            None => columns.first().unwrap().clone(),
        };

        // position of every length row by feature id
        let mut positions: HashMap<String, usize> = HashMap::new();
        for (pos, id) in lengths_table.index().iter().enumerate() {
            positions.entry(id.to_text()).or_insert(pos);
        }

        let mut kept_rows: Vec<usize> = Vec::new();
        let mut length_rows: Vec<usize> = Vec::new();
        for (row, id) in self.ids.iter().enumerate() {
            if let Some(&pos) = positions.get(id) {
                kept_rows.push(row);
                length_rows.push(pos);
            }
        }
        let n_dropped = self.ids.len() - kept_rows.len();
        if n_dropped > 0 {
            info!(
                "{} features without a reference length were dropped",
                n_dropped
            );
        }
        if kept_rows.is_empty() {
            return Err(EcoError::EmptyData(
                "no feature of the counts table has a reference length".to_string(),
            ));
        }

        // crop counts to features with a known length, preserving order
        self.ids = kept_rows.iter().map(|&r| self.ids[r].clone()).collect();
        self.counts = DMatrix::from_fn(kept_rows.len(), self.sample_names.len(), |i, j| {
            self.counts[(kept_rows[i], j)]
        });

        let length_values = lengths_table.column(&length_col)?;
        let lengths = length_rows
            .iter()
            .map(|&pos| {
                length_values[pos].as_f64().ok_or_else(|| {
                    EcoError::Numerical(format!(
                        "non-numeric length '{}' in column '{}'",
                        length_values[pos], length_col
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        self.lengths = Some(lengths);

        let name_values = lengths_table.column(&name_col)?;
        self.names = Some(
            length_rows
                .iter()
                .map(|&pos| name_values[pos].to_text())
                .collect(),
        );
        Ok(())
    }

    /// True once feature lengths have been set.
    pub fn has_lengths(&self) -> bool {
        self.lengths.is_some()
    }

    /// Normalise the raw counts to TPM.
    pub fn to_tpm(&mut self, digits: u32, log: bool) -> Result<()> {
        let lengths = self.lengths.as_ref().ok_or_else(|| {
            EcoError::Config("the table does not have lengths; TPM needs a lengths file".into())
        })?;
        let log_lengths: Vec<f64> = lengths.iter().map(|l| l.ln()).collect();

        let (n_rows, n_cols) = self.counts.shape();
        let columns: Vec<Vec<f64>> = (0..n_cols)
            .into_par_iter()
            .map(|j| {
                // log-space: exponentiate only after subtracting the
                // column's log-sum
                let shifted: Vec<f64> = (0..n_rows)
                    .map(|i| self.counts[(i, j)].ln() - log_lengths[i])
                    .collect();
                let colsum = shifted.iter().map(|x| x.exp()).sum::<f64>().ln();
                shifted
                    .iter()
                    .map(|x| round_to((x - colsum + MILLION_LOG).exp(), digits))
                    .map(|v| if log { (v + 1.0).ln() } else { v })
                    .collect()
            })
            .collect();

        self.normalized = Some(matrix_from_columns(n_rows, &columns));
        Ok(())
    }

    /// Normalise the raw counts to CPM.
    pub fn to_cpm(&mut self, digits: u32, log: bool) -> Result<()> {
        let (n_rows, n_cols) = self.counts.shape();
        let columns: Vec<Vec<f64>> = (0..n_cols)
            .into_par_iter()
            .map(|j| {
                let colsum: f64 = (0..n_rows).map(|i| self.counts[(i, j)]).sum();
                (0..n_rows)
                    .map(|i| round_to(self.counts[(i, j)] / colsum * 1e6, digits))
                    .map(|v| if log { (v + 1.0).ln() } else { v })
                    .collect()
            })
            .collect();

        self.normalized = Some(matrix_from_columns(n_rows, &columns));
        Ok(())
    }

    /// The normalised values, if a normalisation has been run.
    pub fn normalized(&self) -> Option<&DMatrix<f64>> {
        self.normalized.as_ref()
    }

    /// The raw counts (cropped to features with a length, once set).
    pub fn counts(&self) -> &DMatrix<f64> {
        &self.counts
    }

    /// Feature identifiers, in row order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    /// Feature names from the lengths table, in row order.
    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }

    /// Aligned feature lengths, in row order.
    pub fn lengths(&self) -> Option<&[f64]> {
        self.lengths.as_deref()
    }

    /// Sample (column) names.
    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    /// Write the normalised table tab-delimited, index included.
    ///
    /// With `use_names` the feature names from the lengths table replace
    /// the identifiers in the first column.
    pub fn save<P: AsRef<Path>>(&self, path: P, use_names: bool) -> Result<()> {
        let normalized = self
            .normalized
            .as_ref()
            .ok_or_else(|| EcoError::Config("no normalisation has been performed yet".into()))?;

        let index: Vec<Value> = if use_names {
            let names = self.names.as_ref().ok_or_else(|| {
                EcoError::Config("no names available; set a lengths file first".into())
            })?;
            names.iter().map(|n| Value::Text(n.clone())).collect()
        } else {
            self.ids.iter().map(|i| Value::Text(i.clone())).collect()
        };

        let data: Vec<Vec<Value>> = (0..normalized.ncols())
            .map(|j| {
                (0..normalized.nrows())
                    .map(|i| Value::Float(normalized[(i, j)]))
                    .collect()
            })
            .collect();
        let mut table = Table::new(self.sample_names.clone(), data)?;
        table.set_index(index)?;
        table.set_index_name(self.index_name.clone());
        table.write(path, b'\t', true)
    }
}

fn matrix_from_columns(n_rows: usize, columns: &[Vec<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(n_rows, columns.len(), |i, j| columns[j][i])
}

/// Round half away from zero to a number of decimal digits.
fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits as i32);
    (value * factor).round() / factor
}
