//! Generation of a parameterized analysis notebook for enrichment results.
//!
//! A YAML configuration names the EcoTyper run, the enrichment output
//! directory, and the term categories to scan for; the generated notebook
//! (nbformat 4) loads the results and sets up one analysis section per
//! category. Execution is delegated to `jupyter nbconvert`.

use crate::error::{EcoError, Result};
use crate::terminal;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{json, Value as Json};
use std::env;
use std::fs;
use std::path::Path;

/// Directory settings of a notebook configuration.
///
/// Values may reference `{user}`, resolved from the `USER` environment
/// variable.
#[derive(Debug, Clone, Deserialize)]
pub struct NotebookDirectories {
    /// The EcoTyper results directory the enrichment was run on.
    pub ecotyper: String,
    /// The enrichment results directory.
    pub output: String,
}

/// Analysis settings of a notebook configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NotebookAnalysis {
    #[serde(default)]
    pub enrichr: bool,
    #[serde(default)]
    pub prerank: bool,
    #[serde(default)]
    pub gene_sets: Vec<String>,
}

/// The YAML configuration driving notebook generation.
#[derive(Debug, Clone, Deserialize)]
pub struct NotebookConfig {
    pub directories: NotebookDirectories,
    pub analysis: NotebookAnalysis,
    /// Category label → list of term patterns to scan for.
    #[serde(default)]
    pub categories: IndexMap<String, Vec<String>>,
}

impl NotebookConfig {
    /// Read and template a configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: NotebookConfig = serde_yaml::from_str(&content)?;
        config.directories.ecotyper = resolve_user(&config.directories.ecotyper)?;
        config.directories.output = resolve_user(&config.directories.output)?;
        Ok(config)
    }
}

/// Expand `{user}` from the `USER` environment variable.
fn resolve_user(path: &str) -> Result<String> {
    if !path.contains("{user}") {
        return Ok(path.to_string());
    }
    let user = env::var("USER").map_err(|_| {
        EcoError::Config("the path references {user} but USER is not set".into())
    })?;
    Ok(path.replace("{user}", &user))
}

/// An nbformat-4 notebook assembled from a configuration.
#[derive(Debug)]
pub struct EnrichmentNotebook {
    cells: Vec<Json>,
}

impl EnrichmentNotebook {
    /// Build the notebook cells for a configuration.
    pub fn new(config: &NotebookConfig) -> Self {
        let mut notebook = Self { cells: Vec::new() };

        notebook.markdown_cell(&format!(
            "# Enrichment analysis\n\nResults of `{}`, analysed per {}.",
            config.directories.ecotyper,
            if config.analysis.prerank {
                "prerank run"
            } else {
                "enrichr run"
            }
        ));
        notebook.code_cell(concat!(
            "import pandas as pd\n",
            "import seaborn as sns\n",
            "import matplotlib.pyplot as plt",
        ));

        let which = if config.analysis.prerank {
            "prerank"
        } else {
            "enrichr"
        };
        notebook.code_cell(&format!(
            "results_dir = \"{}\"\nwhich = \"{}\"\ngene_sets = {:?}",
            config.directories.output, which, config.analysis.gene_sets
        ));
        notebook.code_cell(concat!(
            "import glob, os\n",
            "results = {\n",
            "    os.path.basename(f).split(\".\")[0]: pd.read_csv(f, sep=\"\\t\", comment=\"#\")\n",
            "    for f in glob.glob(os.path.join(results_dir, f\"*.{which}.txt\"))\n",
            "}\n",
            "sorted(results)",
        ));

        for (label, patterns) in &config.categories {
            notebook.markdown_cell(&format!("## {}", label));
            let patterns = patterns
                .iter()
                .map(|p| format!("{:?}", p))
                .collect::<Vec<_>>()
                .join(", ");
            notebook.code_cell(&format!(
                concat!(
                    "patterns = [{}]\n",
                    "hits = {{\n",
                    "    key: df[df[\"Term\"].str.contains(\"|\".join(patterns), case=False)]\n",
                    "    for key, df in results.items()\n",
                    "}}\n",
                    "{{key: len(df) for key, df in hits.items()}}",
                ),
                patterns
            ));
        }

        notebook
    }

    /// Append a markdown cell.
    pub fn markdown_cell(&mut self, source: &str) {
        self.cells.push(json!({
            "cell_type": "markdown",
            "metadata": {},
            "source": split_source(source),
        }));
    }

    /// Append a code cell.
    pub fn code_cell(&mut self, source: &str) {
        self.cells.push(json!({
            "cell_type": "code",
            "execution_count": null,
            "metadata": {},
            "outputs": [],
            "source": split_source(source),
        }));
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when the notebook has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The notebook as an nbformat-4 JSON document.
    pub fn to_json(&self) -> Json {
        json!({
            "cells": self.cells,
            "metadata": {
                "kernelspec": {
                    "display_name": "Python 3",
                    "language": "python",
                    "name": "python3",
                },
                "language_info": { "name": "python" },
            },
            "nbformat": 4,
            "nbformat_minor": 5,
        })
    }

    /// Write the notebook to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let document = serde_json::to_string_pretty(&self.to_json())?;
        fs::write(path, document)?;
        Ok(())
    }

    /// Save and execute the notebook via `jupyter nbconvert`.
    pub fn execute<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save(path.as_ref())?;
        let target = path.as_ref().to_string_lossy().into_owned();
        let status = terminal::run(
            "jupyter",
            &["nbconvert", "--execute", "--to", "notebook", target.as_str()],
        )?;
        if !status.success() {
            return Err(EcoError::Subprocess {
                command: "jupyter nbconvert".to_string(),
                reason: format!("exited with status {}", status),
            });
        }
        // nbconvert writes <name>.nbconvert.ipynb; move it back over the target
        let executed = target.replace(".ipynb", ".nbconvert.ipynb");
        if executed != target && Path::new(&executed).exists() {
            fs::rename(&executed, &target)?;
        }
        Ok(())
    }
}

/// nbformat stores cell sources as lists of newline-terminated lines.
fn split_source(source: &str) -> Vec<String> {
    let mut lines: Vec<String> = source.split('\n').map(|l| format!("{}\n", l)).collect();
    if let Some(last) = lines.last_mut() {
        last.pop();
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CONFIG: &str = concat!(
        "directories:\n",
        "  ecotyper: /data/run1\n",
        "  output: /data/run1_gseapy_results\n",
        "analysis:\n",
        "  enrichr: true\n",
        "  gene_sets: [KEGG_2021_Human]\n",
        "categories:\n",
        "  interferon: [\"Interferon\", \"IFN\"]\n",
        "  cell_cycle: [\"Cell Cycle\"]\n",
    );

    #[test]
    fn test_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, CONFIG).unwrap();

        let config = NotebookConfig::from_file(&path).unwrap();
        assert!(config.analysis.enrichr);
        assert!(!config.analysis.prerank);
        assert_eq!(config.categories.len(), 2);
        assert_eq!(config.categories["interferon"], vec!["Interferon", "IFN"]);
    }

    #[test]
    fn test_user_templating() {
        env::set_var("USER", "jdoe");
        assert_eq!(
            resolve_user("/scratch/{user}/runs").unwrap(),
            "/scratch/jdoe/runs"
        );
        assert_eq!(resolve_user("/plain/path").unwrap(), "/plain/path");
    }

    #[test]
    fn test_notebook_structure() {
        let config: NotebookConfig = serde_yaml::from_str(CONFIG).unwrap();
        let notebook = EnrichmentNotebook::new(&config);

        // title + setup + two config/load cells + 2 * (markdown + code)
        assert_eq!(notebook.len(), 8);

        let document = notebook.to_json();
        assert_eq!(document["nbformat"], 4);
        let cells = document["cells"].as_array().unwrap();
        assert_eq!(cells[0]["cell_type"], "markdown");
        assert_eq!(cells[1]["cell_type"], "code");
    }

    #[test]
    fn test_save_produces_valid_json() {
        let config: NotebookConfig = serde_yaml::from_str(CONFIG).unwrap();
        let notebook = EnrichmentNotebook::new(&config);

        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.ipynb");
        notebook.save(&path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let parsed: Json = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed["cells"].as_array().unwrap().len(), notebook.len());
    }
}
