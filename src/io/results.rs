use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::evaluation::ResultsTable;
use crate::stats::RocCurve;

/// Delimiter implied by a path's extension: tab for `.tsv`, comma otherwise.
fn delimiter_for(path: &Path) -> u8 {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") => b'\t',
        _ => b',',
    }
}

fn create_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    Ok(csv::WriterBuilder::new()
        .delimiter(delimiter_for(path))
        .from_writer(BufWriter::new(file)))
}

/// Write the results table as CSV, or TSV when the path ends in `.tsv`.
pub fn write_results<P: AsRef<Path>>(table: &ResultsTable, output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {:?}", path))?;
    write_results_to(table, BufWriter::new(file), delimiter_for(path))?;
    log::info!("Wrote {} result rows to {:?}", table.len(), path);
    Ok(())
}

pub fn write_results_to<W: Write>(table: &ResultsTable, writer: W, delimiter: u8) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    for record in table.records() {
        writer.serialize(record)?;
    }
    // An empty table still gets its header row.
    if table.is_empty() {
        writer.write_record(["model_id", "accuracy", "error_rate", "auc"])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write one ROC curve per model as `model_id, threshold, fpr, tpr` rows.
pub fn write_roc_points<P: AsRef<Path>>(curves: &[(String, RocCurve)], output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let mut writer = create_writer(path)?;
    writer.write_record(["model_id", "threshold", "fpr", "tpr"])?;
    for (model_id, curve) in curves {
        for p in &curve.points {
            writer.write_record(&[
                model_id.clone(),
                p.threshold.to_string(),
                format!("{:.6}", p.fpr),
                format!("{:.6}", p.tpr),
            ])?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write `(feature, importance)` pairs in the order given.
pub fn write_importance<P: AsRef<Path>>(ranked: &[(String, f64)], output_path: P) -> Result<()> {
    let path = output_path.as_ref();
    let mut writer = create_writer(path)?;
    writer.write_record(["feature", "importance"])?;
    for (name, value) in ranked {
        writer.write_record(&[name.clone(), format!("{:.6}", value)])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationRecord;

    #[test]
    fn results_csv_has_header_and_one_row_per_model() {
        let mut table = ResultsTable::new();
        for id in ["decision_tree", "knn_k10"] {
            table.push(EvaluationRecord {
                model_id: id.to_string(),
                accuracy: 0.75,
                error_rate: 0.25,
                auc: 0.8,
            });
        }
        let mut buf = Vec::new();
        write_results_to(&table, &mut buf, b',').unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "model_id,accuracy,error_rate,auc");
        assert_eq!(lines[1], "decision_tree,0.75,0.25,0.8");
    }

    #[test]
    fn empty_table_writes_header_only() {
        let mut buf = Vec::new();
        write_results_to(&ResultsTable::new(), &mut buf, b'\t').unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "model_id\taccuracy\terror_rate\tauc\n");
    }
}
