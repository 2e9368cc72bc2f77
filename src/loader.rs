use std::collections::BTreeSet;
use std::io::Read;
use std::path::Path;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{value_counts, StatusBuckets};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::models::{
    Dataset, FrequencyEntry, OptionalColumn, RawTable, RosterRecord, SchemaKind, COLLEGE,
    CURRENT_POSITION, CURRENT_STATUS, CURRENT_WORKPLACE, GENDER, GRADUATION_TERM, MAJOR,
    STUDENT_ID, STUDENT_NAME,
};
use crate::normalize::canonicalize_status;

const ROW_SAMPLE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermRange {
    pub min: String,
    pub max: String,
}

/// Headline numbers returned alongside a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub source_name: String,
    pub kind: SchemaKind,
    pub record_count: usize,
    pub unique_colleges: usize,
    pub college_distribution: Vec<FrequencyEntry>,
    pub gender_distribution: Vec<FrequencyEntry>,
    pub term_range: Option<TermRange>,
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub dataset: Dataset,
    pub summary: LoadSummary,
    pub warnings: Vec<String>,
}

pub fn read_csv<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();
    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

pub fn read_csv_path(path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(path)?;
    read_csv(file)
}

pub fn detect_schema(headers: &[String]) -> SchemaKind {
    let has = |name: &str| headers.iter().any(|header| header == name);
    if has(GRADUATION_TERM) && has(STUDENT_NAME) {
        SchemaKind::Banner
    } else {
        SchemaKind::Alumni
    }
}

fn row_sample(rows: &[usize]) -> String {
    let shown: Vec<String> = rows.iter().take(ROW_SAMPLE).map(usize::to_string).collect();
    let more = if rows.len() > ROW_SAMPLE { "..." } else { "" };
    format!("[{}{}]", shown.join(", "), more)
}

fn quoted_list<'a>(values: impl IntoIterator<Item = &'a String>) -> String {
    let quoted: Vec<String> = values.into_iter().map(|value| format!("'{value}'")).collect();
    format!("[{}]", quoted.join(", "))
}

/// Validates a raw table and turns it into a `Dataset`.
///
/// Missing required columns reject the upload. Everything else that looks
/// wrong (unknown colleges, terms, statuses, odd identifiers) is reported as a
/// warning and the raw values are kept.
pub fn load(
    table: RawTable,
    hint: Option<SchemaKind>,
    source_name: &str,
    config: &EngineConfig,
) -> Result<Loaded> {
    let RawTable { headers, rows } = table;
    let headers: Vec<String> = headers.iter().map(|header| header.trim().to_string()).collect();
    if headers.iter().all(String::is_empty) {
        return Err(EngineError::UnrecognizedSchema(
            "the upload has no header row".to_string(),
        ));
    }

    let kind = hint.unwrap_or_else(|| detect_schema(&headers));
    let position = |name: &str| headers.iter().position(|header| header == name);
    let missing: Vec<String> = kind
        .required_columns()
        .iter()
        .filter(|column| position(column).is_none())
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EngineError::MissingColumns(missing));
    }

    let mut warnings = Vec::new();
    let missing_optional: Vec<&str> = OptionalColumn::ALL
        .iter()
        .map(|column| column.header())
        .filter(|header| position(header).is_none())
        .collect();
    if !missing_optional.is_empty() {
        warnings.push(format!(
            "The following optional columns are missing: {}",
            missing_optional.join(", ")
        ));
    }

    let column = |name: &str| position(name);
    let id_col = column(STUDENT_ID);
    let college_col = column(COLLEGE);
    let term_col = column(kind.term_column());
    let gender_col = column(GENDER);
    let major_col = column(MAJOR);
    let status_col = column(CURRENT_STATUS);
    let workplace_col = column(CURRENT_WORKPLACE);
    let position_col = column(CURRENT_POSITION);
    let cell = |row: &[String], index: Option<usize>| -> String {
        index
            .and_then(|index| row.get(index))
            .map(|value| value.trim().to_string())
            .unwrap_or_default()
    };

    let records: Vec<RosterRecord> = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| {
            let mut values: Vec<String> =
                row.iter().map(|value| value.trim().to_string()).collect();
            values.resize(headers.len(), String::new());
            RosterRecord {
                row: index + 1,
                student_id: cell(&values, id_col),
                college: cell(&values, college_col),
                term: cell(&values, term_col),
                gender: cell(&values, gender_col),
                major: cell(&values, major_col),
                status: match (kind, status_col) {
                    (SchemaKind::Alumni, Some(index)) => canonicalize_status(&values[index]),
                    _ => String::new(),
                },
                workplace: cell(&values, workplace_col),
                position: cell(&values, position_col),
                values,
            }
        })
        .collect();

    let id_pattern = Regex::new(&format!(
        "^[0-9{}][0-9]*$",
        regex::escape(&config.graduate_marker.to_string())
    ))?;
    let invalid_ids = records
        .iter()
        .filter(|record| !record.student_id.is_empty() && !id_pattern.is_match(&record.student_id))
        .count();
    if invalid_ids > 0 {
        warnings.push(format!("Found {invalid_ids} invalid Student IDs"));
    }

    let graduation_terms = discover_terms(kind, &records, config, &mut warnings);
    let invalid_terms: Vec<&RosterRecord> = records
        .iter()
        .filter(|record| !graduation_terms.contains(&record.term))
        .collect();
    if !invalid_terms.is_empty() {
        let distinct: BTreeSet<&String> = invalid_terms.iter().map(|record| &record.term).collect();
        let rows: Vec<usize> = invalid_terms.iter().map(|record| record.row).collect();
        warnings.push(format!(
            "Found {} records with invalid graduation years: {} (at rows: {})",
            invalid_terms.len(),
            quoted_list(distinct),
            row_sample(&rows)
        ));
    }

    let known_colleges = config.college_names();
    let invalid_colleges = records
        .iter()
        .filter(|record| !known_colleges.contains(&record.college))
        .count();
    if invalid_colleges > 0 {
        warnings.push(format!("Found {invalid_colleges} records with invalid colleges"));
    }

    if kind == SchemaKind::Alumni {
        let buckets = StatusBuckets::new(&config.statuses);
        let unexpected: BTreeSet<&String> = records
            .iter()
            .filter(|record| !buckets.is_canonical(&record.status))
            .map(|record| &record.status)
            .collect();
        if !unexpected.is_empty() {
            warnings.push(format!(
                "Found unexpected 'Current Status' values: {}",
                quoted_list(unexpected)
            ));
        }
    }

    let summary = summarize(source_name, kind, &records);
    for warning in &warnings {
        warn!(source = source_name, "{warning}");
    }
    info!(
        source = source_name,
        %kind,
        records = records.len(),
        warnings = warnings.len(),
        "roster loaded"
    );

    let dataset = Dataset::new(kind, source_name, headers, records, graduation_terms);
    Ok(Loaded {
        dataset,
        summary,
        warnings,
    })
}

/// Term allow-list for an upload: the Alumni roster's own terms, otherwise
/// the configured defaults.
fn discover_terms(
    kind: SchemaKind,
    records: &[RosterRecord],
    config: &EngineConfig,
    warnings: &mut Vec<String>,
) -> Vec<String> {
    if kind == SchemaKind::Alumni {
        let discovered: BTreeSet<&str> = records
            .iter()
            .map(|record| record.term.as_str())
            .filter(|term| !term.is_empty())
            .collect();
        if !discovered.is_empty() {
            debug!(terms = discovered.len(), "graduation terms discovered from upload");
            return discovered.into_iter().map(str::to_string).collect();
        }
        warnings.push(
            "No graduation terms found in the upload, using the default term list".to_string(),
        );
    }
    config.default_graduation_terms.clone()
}

fn summarize(source_name: &str, kind: SchemaKind, records: &[RosterRecord]) -> LoadSummary {
    let college_distribution = value_counts(records.iter().map(|record| &record.college));
    let gender_distribution = value_counts(records.iter().map(|record| &record.gender));
    let term_range = match (
        records.iter().map(|record| &record.term).min(),
        records.iter().map(|record| &record.term).max(),
    ) {
        (Some(min), Some(max)) => Some(TermRange {
            min: min.clone(),
            max: max.clone(),
        }),
        _ => None,
    };

    LoadSummary {
        source_name: source_name.to_string(),
        kind,
        record_count: records.len(),
        unique_colleges: college_distribution.len(),
        college_distribution,
        gender_distribution,
        term_range,
    }
}
