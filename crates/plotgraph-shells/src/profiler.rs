//! Dataset profiler: semantic type and cardinality per column

use crate::dataset::{parse_number, Dataset};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use plotgraph_core::{DatasetProfile, FieldProfile, SemanticType};
use std::collections::HashSet;
use tracing::debug;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d %b %Y", "%b %d %Y"];

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
enum Observed {
    Number,
    Date,
    Text,
}

/// Profile every column. A column is quantitative when every non-empty cell
/// is numeric, temporal when every non-empty cell is date-like, and nominal
/// otherwise (including columns with no values at all). Ordinal is never
/// inferred.
pub fn profile(dataset: &Dataset) -> DatasetProfile {
    let mut out = DatasetProfile::new(dataset.row_count());

    for (index, header) in dataset.headers.iter().enumerate() {
        let mut distinct: HashSet<&str> = HashSet::new();
        let mut observed: HashSet<Observed> = HashSet::new();

        for raw in dataset.column(index).filter(|c| !c.is_empty()) {
            distinct.insert(raw);
            observed.insert(classify(raw));
        }

        let field_type = match (observed.len(), observed.iter().next()) {
            (1, Some(Observed::Number)) => SemanticType::Quantitative,
            (1, Some(Observed::Date)) => SemanticType::Temporal,
            _ => SemanticType::Nominal,
        };
        out.fields
            .insert(header.clone(), FieldProfile::new(field_type, distinct.len()));
    }

    debug!(columns = out.fields.len(), rows = out.row_count, "profiled dataset");
    out
}

/// Parse and profile CSV text in one step.
pub fn profile_csv(text: &str) -> plotgraph_core::Result<DatasetProfile> {
    Ok(profile(&Dataset::from_csv(text)?))
}

fn classify(raw: &str) -> Observed {
    if parse_number(raw).is_some() {
        Observed::Number
    } else if is_date_like(raw) {
        Observed::Date
    } else {
        Observed::Text
    }
}

pub fn is_date_like(raw: &str) -> bool {
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return true;
    }
    DATETIME_FORMATS
        .iter()
        .any(|f| NaiveDateTime::parse_from_str(raw, f).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(raw, f).is_ok())
}
