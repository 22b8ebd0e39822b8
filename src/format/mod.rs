//! Regex-based reformatting of identifiers, headers, and columns of
//! tabular data files.
//!
//! Downstream tools constrain the characters allowed in headers and
//! identifiers (EcoTyper, for instance, accepts neither spaces nor minuses).
//! A [`Formatter`] applies an ordered list of pattern → replacement rules to
//! the index, the column headers, and/or named columns of a file.

pub mod pseudo;

use crate::convert::{file_suffix, tabular};
use crate::data::{Table, Value};
use crate::error::{EcoError, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

/// An ordered list of regex substitution rules.
///
/// Later rules apply to the already-rewritten text, so order matters.
#[derive(Debug, Clone)]
pub struct FormatRules {
    rules: Vec<(Regex, String)>,
}

impl FormatRules {
    /// Build rules from ordered (pattern, replacement) pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, S)>,
        S: AsRef<str>,
    {
        let mut rules = Vec::new();
        for (pattern, replacement) in pairs {
            let regex = Regex::new(pattern.as_ref()).map_err(|e| {
                EcoError::InvalidParameter(format!(
                    "invalid pattern '{}': {}",
                    pattern.as_ref(),
                    e
                ))
            })?;
            rules.push((regex, replacement.as_ref().to_string()));
        }
        Ok(Self { rules })
    }

    /// The default substitutions making headers and index conform to
    /// EcoTyper requirements.
    pub fn ecotyper() -> Self {
        Self::from_pairs([("-", "."), (" ", "_")]).expect("preset patterns are valid")
    }

    /// Resolve a `--format` argument: a rules file path, else a preset name.
    pub fn resolve(name: &str) -> Result<Self> {
        if Path::new(name).exists() {
            return Self::from_file(name);
        }
        match name {
            "EcoTyper" => Ok(Self::ecotyper()),
            other => Err(EcoError::Config(format!(
                "the format '{}' is not available; define your own rules file instead",
                other
            ))),
        }
    }

    /// Read rules from a file of `pattern : replacement` lines.
    ///
    /// Empty lines and lines starting with `#` are skipped.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut pairs = Vec::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once(':').ok_or_else(|| {
                EcoError::Config(format!("malformed rules line '{}': expected 'key : value'", line))
            })?;
            pairs.push((key.trim().to_string(), value.trim().to_string()));
        }
        Self::from_pairs(pairs)
    }

    /// Apply every rule, in order, to a piece of text.
    pub fn apply(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (regex, replacement) in &self.rules {
            result = regex
                .replace_all(&result, replacement.as_str())
                .into_owned();
        }
        result
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True when there are no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Reads a tabular file, rewrites index / headers / columns with a set of
/// [`FormatRules`], and writes the result back out.
#[derive(Debug)]
pub struct Formatter {
    rules: FormatRules,
    table: Option<Table>,
    read_sep: Option<u8>,
    index_was_set_to_column: bool,
}

impl Formatter {
    pub fn new(rules: FormatRules) -> Self {
        Self {
            rules,
            table: None,
            read_sep: None,
            index_was_set_to_column: false,
        }
    }

    /// The table read by [`read_table`](Self::read_table), if any.
    pub fn table(&self) -> Option<&Table> {
        self.table.as_ref()
    }

    /// Resolve the separator for a file from an explicit format token or
    /// the file suffix.
    fn resolve_sep(path: &Path, format: Option<&str>) -> Result<u8> {
        match format {
            Some(fmt) => tabular::separator(fmt),
            None => {
                let name = path.to_string_lossy();
                let suffix = file_suffix(&name).unwrap_or("");
                tabular::separator(suffix).map_err(|_| {
                    EcoError::Config(format!(
                        "could not guess the separator for {}; specify it manually",
                        path.display()
                    ))
                })
            }
        }
    }

    /// Read a tabular data file, first column as index.
    pub fn read_table<P: AsRef<Path>>(&mut self, path: P, format: Option<&str>) -> Result<()> {
        let sep = Self::resolve_sep(path.as_ref(), format)?;
        self.read_sep = Some(sep);
        self.table = Some(Table::read(path, sep, true)?);
        self.index_was_set_to_column = false;
        Ok(())
    }

    fn table_mut(&mut self) -> Result<&mut Table> {
        self.table
            .as_mut()
            .ok_or_else(|| EcoError::Config("no table has been read".into()))
    }

    /// Reformat the selected parts of the table.
    pub fn reformat(&mut self, index: bool, names: bool, columns: &[String]) -> Result<()> {
        if index {
            self.reformat_index()?;
        }
        if names {
            self.reformat_names()?;
        }
        for column in columns {
            self.reformat_column(column)?;
        }
        Ok(())
    }

    fn reformat_index(&mut self) -> Result<()> {
        let rules = self.rules.clone();
        let table = self.table_mut()?;
        let index = table
            .index()
            .iter()
            .map(|v| Value::Text(rules.apply(&v.to_text())))
            .collect();
        table.set_index(index)
    }

    fn reformat_names(&mut self) -> Result<()> {
        let rules = self.rules.clone();
        let table = self.table_mut()?;
        let names = table
            .columns()
            .iter()
            .map(|c| rules.apply(c))
            .collect();
        table.set_columns(names)?;
        let index_name = table.index_name().map(|name| rules.apply(name));
        if index_name.is_some() {
            table.set_index_name(index_name);
        }
        Ok(())
    }

    fn reformat_column(&mut self, column: &str) -> Result<()> {
        let rules = self.rules.clone();
        let table = self.table_mut()?;
        let values = table.column_mut(column)?;
        for value in values.iter_mut() {
            *value = Value::Text(rules.apply(&value.to_text()));
        }
        Ok(())
    }

    /// Turn the index into a leading data column with the given name.
    ///
    /// The (replacement integer) index will not be written afterwards.
    pub fn index_to_column(&mut self, name: &str) -> Result<()> {
        let table = self.table_mut()?;
        let index = table.index().to_vec();
        table.insert_column(0, name, index)?;
        let fresh = (0..table.n_rows() as i64).map(Value::Int).collect();
        table.set_index(fresh)?;
        table.set_index_name(None);
        self.index_was_set_to_column = true;
        Ok(())
    }

    /// Write the table; the separator is inferred from the output suffix,
    /// falling back to the separator the file was read with.
    ///
    /// `suffix` is appended to the filename verbatim and does not affect
    /// the data format.
    pub fn write_table<P: AsRef<Path>>(
        &self,
        path: P,
        suffix: Option<&str>,
        include_index: bool,
    ) -> Result<()> {
        let table = self
            .table
            .as_ref()
            .ok_or_else(|| EcoError::Config("no table has been read".into()))?;

        let name = format!(
            "{}{}",
            path.as_ref().to_string_lossy(),
            suffix.unwrap_or("")
        );
        let sep = file_suffix(&name)
            .and_then(|s| tabular::separator(s).ok())
            .or(self.read_sep)
            .ok_or_else(|| EcoError::Config("no separator known for the output file".into()))?;

        let include_index = include_index && !self.index_was_set_to_column;
        table.write(&name, sep, include_index)
    }
}
