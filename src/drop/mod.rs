//! Removal of entries from EcoTyper datasets by column-value membership.

use crate::data::{Dataset, Value};
use crate::error::{EcoError, Result};

/// Drop annotation rows whose `column` value is in `values`, and the
/// matching expression columns.
///
/// For `column == "ID"` without an `ID` column, the annotation index is
/// matched instead. Returns a new [`Dataset`]; the input is not mutated.
pub fn drop_from_column(dataset: &Dataset, values: &[String], column: &str) -> Result<Dataset> {
    let annotation = &dataset.annotation;

    let drop_mask: Vec<bool> = if column == "ID" && !annotation.has_column("ID") {
        annotation
            .index()
            .iter()
            .map(|v| values.contains(&v.to_text()))
            .collect()
    } else {
        annotation
            .column(column)
            .map_err(|_| EcoError::MissingColumn(format!("{} (in annotation file)", column)))?
            .iter()
            .map(|v| values.contains(&v.to_text()))
            .collect()
    };

    let ids_to_drop: Vec<String> = annotation
        .index()
        .iter()
        .zip(&drop_mask)
        .filter(|(_, &dropped)| dropped)
        .map(|(id, _)| id.to_text())
        .collect();

    let keep_mask: Vec<bool> = drop_mask.iter().map(|&d| !d).collect();
    let annotation = annotation.filter_rows(&keep_mask)?;

    let mut expression = dataset.expression.clone();
    expression.drop_columns(&ids_to_drop);

    Ok(Dataset::new(annotation, expression))
}

/// Drop entries belonging to the given samples (via the `Sample` column).
pub fn drop_samples(dataset: &Dataset, samples: &[String]) -> Result<Dataset> {
    drop_from_column(dataset, samples, "Sample")
}

/// Drop entries belonging to the given cell types (via the `CellType` column).
pub fn drop_celltypes(dataset: &Dataset, celltypes: &[String]) -> Result<Dataset> {
    drop_from_column(dataset, celltypes, "CellType")
}

/// Drop specific entries (via the `ID` column or the annotation index).
pub fn drop_ids(dataset: &Dataset, ids: &[String]) -> Result<Dataset> {
    drop_from_column(dataset, ids, "ID")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Table;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn test_dataset() -> Dataset {
        let mut ann = NamedTempFile::new().unwrap();
        writeln!(ann, "ID\tCellType\tSample").unwrap();
        writeln!(ann, "cell1\tFibroblasts\tS1").unwrap();
        writeln!(ann, "cell2\tMonocytes\tS1").unwrap();
        writeln!(ann, "cell3\tFibroblasts\tS2").unwrap();
        ann.flush().unwrap();

        let mut expr = NamedTempFile::new().unwrap();
        writeln!(expr, "Gene\tcell1\tcell2\tcell3").unwrap();
        writeln!(expr, "geneA\t1\t2\t3").unwrap();
        writeln!(expr, "geneB\t4\t5\t6").unwrap();
        expr.flush().unwrap();

        Dataset::read(ann.path(), expr.path()).unwrap()
    }

    #[test]
    fn test_drop_celltypes() {
        let dataset = test_dataset();
        let cropped = drop_celltypes(&dataset, &["Fibroblasts".to_string()]).unwrap();

        assert_eq!(cropped.annotation.n_rows(), 1);
        assert_eq!(
            cropped.annotation.index(),
            &[Value::Text("cell2".to_string())]
        );
        assert_eq!(cropped.expression.columns(), &["cell2"]);
    }

    #[test]
    fn test_drop_ids_against_index() {
        let dataset = test_dataset();
        let cropped = drop_ids(&dataset, &["cell2".to_string()]).unwrap();

        assert_eq!(cropped.annotation.n_rows(), 2);
        assert_eq!(cropped.expression.columns(), &["cell1", "cell3"]);
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let dataset = test_dataset();
        let result = drop_from_column(&dataset, &["x".to_string()], "Tissue");
        assert!(matches!(result, Err(EcoError::MissingColumn(_))));
    }

    #[test]
    fn test_drop_is_idempotent() {
        let dataset = test_dataset();
        let once = drop_samples(&dataset, &["S1".to_string()]).unwrap();
        let twice = drop_samples(&once, &["S1".to_string()]).unwrap();

        assert_eq!(once.annotation, twice.annotation);
        assert_eq!(once.expression, twice.expression);
    }

    #[test]
    fn test_expression_matches_retained_annotation() {
        let dataset = test_dataset();
        let cropped = drop_samples(&dataset, &["S2".to_string()]).unwrap();

        let retained: Vec<String> = cropped
            .annotation
            .index()
            .iter()
            .map(|v| v.to_text())
            .collect();
        assert_eq!(cropped.expression.columns(), retained.as_slice());
    }

    #[test]
    fn test_sequential_filters() {
        let dataset = test_dataset();
        let cropped = drop_ids(&dataset, &["cell1".to_string()]).unwrap();
        let cropped = drop_celltypes(&cropped, &["Monocytes".to_string()]).unwrap();

        assert_eq!(cropped.annotation.n_rows(), 1);
        assert_eq!(cropped.expression.columns(), &["cell3"]);
    }

    #[test]
    fn test_returns_new_dataset() {
        let dataset = test_dataset();
        let _ = drop_samples(&dataset, &["S1".to_string()]).unwrap();
        // the input is untouched
        assert_eq!(dataset.annotation.n_rows(), 3);
        assert_eq!(dataset.expression.n_cols(), 3);
    }

    #[test]
    fn test_id_column_preferred_over_index() {
        // when an explicit ID column exists it is matched instead of the index
        let columns = vec!["ID".to_string()];
        let data = vec![vec![Value::Text("a".into()), Value::Text("b".into())]];
        let mut annotation = Table::new(columns, data).unwrap();
        annotation
            .set_index(vec![Value::Text("x".into()), Value::Text("y".into())])
            .unwrap();

        let expression = Table::new(
            vec!["x".to_string(), "y".to_string()],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        )
        .unwrap();

        let dataset = Dataset::new(annotation, expression);
        let cropped = drop_ids(&dataset, &["a".to_string()]).unwrap();
        assert_eq!(cropped.annotation.n_rows(), 1);
        // the dropped row's index value names the expression column to remove
        assert_eq!(cropped.expression.columns(), &["y"]);
    }
}
