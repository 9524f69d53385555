//! Delimited-text datasets and row materialization

use plotgraph_core::{Error, Result, Row};
use serde_json::{Number, Value};

/// Raw tabular data: a header row plus trimmed string cells.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
}

impl Dataset {
    /// Parse CSV text with a header row. Blank lines are skipped, quoted
    /// cells may contain commas, and short records are padded with empty cells.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| Error::Dataset(e.to_string()))?
            .iter()
            .map(|h| h.to_string())
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Ok(Self::default());
        }

        let mut records = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::Dataset(e.to_string()))?;
            // whitespace-only line
            if record.len() == 1 && record.get(0) == Some("") {
                continue;
            }
            let mut cells: Vec<String> = record.iter().map(|c| c.to_string()).collect();
            cells.resize(headers.len(), String::new());
            records.push(cells);
        }

        Ok(Self { headers, records })
    }

    pub fn row_count(&self) -> usize {
        self.records.len()
    }

    /// Cells of one column, in record order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .map(move |r| r.get(index).map(|s| s.as_str()).unwrap_or(""))
    }

    /// Materialize rows. Every row carries every header; empty cells are
    /// null and numeric cells are JSON numbers.
    pub fn rows(&self) -> Vec<Row> {
        self.records
            .iter()
            .map(|record| {
                self.headers
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (h.clone(), cell_value(record.get(i).map(|s| s.as_str()).unwrap_or(""))))
                    .collect()
            })
            .collect()
    }
}

/// Finite decimal number, as accepted by the profiler.
pub fn parse_number(raw: &str) -> Option<f64> {
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn cell_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Number(i.into());
    }
    match parse_number(raw).and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(raw.to_string()),
    }
}
