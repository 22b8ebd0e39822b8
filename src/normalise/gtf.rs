//! Feature-length extraction from a reference GTF.
//!
//! The length computation itself is delegated to the external `gtftools`
//! utility; this module drives it and then annotates the produced lengths
//! file with gene names pulled from the GTF attributes.

use crate::data::{Table, Value};
use crate::error::{EcoError, Result};
use crate::terminal;
use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Run `gtftools -<mode> <output> <gtf>`; mode `l` computes gene lengths.
pub fn call_gtftools<P: AsRef<Path>>(gtf: P, output: P, mode: &str) -> Result<()> {
    let flag = format!("-{}", mode);
    let gtf = gtf.as_ref().to_string_lossy().into_owned();
    let output = output.as_ref().to_string_lossy().into_owned();
    let status = terminal::run("gtftools", &[flag.as_str(), output.as_str(), gtf.as_str()])?;
    if !status.success() {
        return Err(EcoError::Subprocess {
            command: "gtftools".to_string(),
            reason: format!("exited with status {}", status),
        });
    }
    Ok(())
}

/// Extract the gene id → gene name mapping from a GTF's attribute column.
///
/// Rows without both attributes are skipped; first occurrence wins.
pub fn gene_names_from_gtf<P: AsRef<Path>>(gtf: P) -> Result<IndexMap<String, String>> {
    let name_pattern = Regex::new(r#"gene_name "([A-Za-z0-9-.]+)""#).expect("valid pattern");
    let id_pattern = Regex::new(r#"gene_id "([A-Za-z0-9-.]+)""#).expect("valid pattern");

    let content = fs::read_to_string(gtf.as_ref())?;
    let mut mapping = IndexMap::new();
    for line in content.lines() {
        if line.starts_with('#') {
            continue;
        }
        let attributes = match line.split('\t').nth(8) {
            Some(attrs) => attrs,
            None => continue,
        };
        let id = id_pattern.captures(attributes).map(|c| c[1].to_string());
        let name = name_pattern.captures(attributes).map(|c| c[1].to_string());
        if let (Some(id), Some(name)) = (id, name) {
            mapping.entry(id).or_insert(name);
        }
    }
    if mapping.is_empty() {
        return Err(EcoError::EmptyData(format!(
            "no gene_id/gene_name attributes found in {}",
            gtf.as_ref().display()
        )));
    }
    Ok(mapping)
}

/// Annotate a gtftools lengths file with gene names from the GTF.
///
/// The name column lands in second position (first with `swap`, for data
/// that uses gene names as primary identifiers), keeping the last column a
/// length column as the normaliser expects. The id → name mapping is also
/// written next to the GTF as `<gtf>.names`.
pub fn add_gtf_gene_names<P: AsRef<Path>>(gtf: P, lengths_file: P, swap: bool) -> Result<()> {
    let mapping = gene_names_from_gtf(gtf.as_ref())?;

    // the lengths file has no index column of its own
    let lengths = Table::read(lengths_file.as_ref(), b'\t', false)?;
    if lengths.n_cols() == 0 {
        return Err(EcoError::EmptyData(format!(
            "no columns in {}",
            lengths_file.as_ref().display()
        )));
    }
    let id_col = lengths.columns()[0].clone();
    let ids = lengths.column(&id_col)?.to_vec();

    // inner join on the id column
    let keep: Vec<bool> = ids
        .iter()
        .map(|id| mapping.contains_key(&id.to_text()))
        .collect();
    let mut merged = lengths.filter_rows(&keep)?;
    let names: Vec<Value> = ids
        .iter()
        .zip(&keep)
        .filter(|(_, &k)| k)
        .map(|(id, _)| Value::Text(mapping[&id.to_text()].clone()))
        .collect();
    let position = if swap { 0 } else { 1 };
    merged.insert_column(position, "gene_name", names)?;
    merged.write(lengths_file.as_ref(), b'\t', false)?;

    // keep the id-to-name assignment around, it is convenient later
    let names_path = format!("{}.names", gtf.as_ref().to_string_lossy());
    let mut content = String::from("gene_id\tgene_name\n");
    for (id, name) in &mapping {
        content.push_str(&format!("{}\t{}\n", id, name));
    }
    fs::write(names_path, content)?;
    Ok(())
}
