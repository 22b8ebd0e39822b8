//! Read and write the supported tabular data formats:
//! CSV (comma), TSV (tab), and TXT (space separated).

use crate::data::Table;
use crate::error::{EcoError, Result};
use std::path::Path;

/// The supported tabular data formats (file suffixes).
pub const SUPPORTED_FORMATS: [&str; 3] = ["csv", "tsv", "txt"];

/// The separator byte for a supported tabular format.
pub fn separator(format: &str) -> Result<u8> {
    match format {
        "csv" => Ok(b','),
        "tsv" => Ok(b'\t'),
        "txt" => Ok(b' '),
        other => Err(EcoError::UnknownFormat(other.to_string())),
    }
}

/// True if the (lowercased) format token is a tabular format.
pub fn is_tabular(format: &str) -> bool {
    SUPPORTED_FORMATS.contains(&format)
}

/// Read a delimited file into a [`Table`], first column as index.
pub fn read<P: AsRef<Path>>(path: P, sep: u8) -> Result<Table> {
    Table::read(path, sep, true)
}

/// Write a [`Table`] to a delimited file.
pub fn write<P: AsRef<Path>>(table: &Table, path: P, sep: u8, include_index: bool) -> Result<()> {
    table.write(path, sep, include_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_separators() {
        assert_eq!(separator("csv").unwrap(), b',');
        assert_eq!(separator("tsv").unwrap(), b'\t');
        assert_eq!(separator("txt").unwrap(), b' ');
        assert!(separator("mtx").is_err());
    }

    #[test]
    fn test_roundtrip_all_formats() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID\tS1\tS2").unwrap();
        writeln!(file, "geneA\t1\t2").unwrap();
        writeln!(file, "geneB\t3\t4.5").unwrap();
        file.flush().unwrap();
        let table = read(file.path(), b'\t').unwrap();

        for format in SUPPORTED_FORMATS {
            let sep = separator(format).unwrap();
            let out = NamedTempFile::new().unwrap();
            write(&table, out.path(), sep, true).unwrap();
            let back = read(out.path(), sep).unwrap();
            assert_eq!(back, table, "roundtrip failed for {}", format);
        }
    }
}
