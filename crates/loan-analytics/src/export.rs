//! CSV export of query results.

use std::io::Write;

use serde_json::Value;

use crate::types::{AnalyticsError, AnalyticsResult, QueryResult};

/// Render a result as CSV text: a header row, then one line per row.
pub fn to_csv(result: &QueryResult) -> AnalyticsResult<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, result)?;
    String::from_utf8(buf).map_err(|e| AnalyticsError::Export(e.to_string()))
}

/// Stream a result as CSV into `writer`.
pub fn write_csv<W: Write>(writer: W, result: &QueryResult) -> AnalyticsResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(result.columns.iter().map(|c| c.name.as_str()))?;
    for row in &result.rows {
        out.write_record(row.iter().map(cell))?;
    }
    out.flush()?;
    Ok(())
}

/// Write a result to a file path.
pub fn write_csv_file(path: &std::path::Path, result: &QueryResult) -> AnalyticsResult<()> {
    let file = std::fs::File::create(path)?;
    write_csv(file, result)?;
    tracing::info!("Wrote {} rows to {}", result.row_count(), path.display());
    Ok(())
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Column;
    use serde_json::json;

    fn sample() -> QueryResult {
        QueryResult::new(
            vec![Column::new("purpose"), Column::new("loan_count"), Column::new("avg_rate")],
            vec![
                vec![json!("debt_consolidation"), json!(120), json!(13.5)],
                vec![json!("home, improvement"), json!(7), Value::Null],
                vec![json!("say \"hi\""), json!(1), json!(true)],
            ],
        )
    }

    #[test]
    fn test_to_csv_quoting_and_nulls() {
        let text = to_csv(&sample()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "purpose,loan_count,avg_rate");
        assert_eq!(lines[1], "debt_consolidation,120,13.5");
        assert_eq!(lines[2], "\"home, improvement\",7,");
        assert_eq!(lines[3], "\"say \"\"hi\"\"\",1,true");
    }

    #[test]
    fn test_empty_result_has_header_only() {
        let result = QueryResult::new(vec![Column::new("a")], vec![]);
        assert_eq!(to_csv(&result).unwrap(), "a\n");
    }

    #[test]
    fn test_write_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_csv_file(&path, &sample()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("purpose,loan_count,avg_rate\n"));
        assert_eq!(text.lines().count(), 4);
    }
}
