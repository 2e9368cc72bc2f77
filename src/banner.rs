use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::config::FieldMapping;
use crate::error::{EngineError, Result};
use crate::models::{Dataset, RawTable, SchemaKind, COMMENTS, CURRENT_STATUS, STUDENT_NAME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiffCounts {
    pub banner_records: usize,
    pub alumni_records: usize,
    pub new_records: usize,
    pub combined_records: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewGraduate {
    pub student_id: String,
    pub student_name: String,
}

/// Graduates present in the registrar roster but missing from the alumni
/// roster, already reshaped into alumni rows.
#[derive(Debug, Clone, Serialize)]
pub struct BannerDiff {
    /// Column order of the alumni roster.
    pub columns: Vec<String>,
    pub new_records: Vec<Vec<String>>,
    pub new_students: Vec<NewGraduate>,
    pub counts: DiffCounts,
}

impl BannerDiff {
    /// Existing alumni rows followed by the new ones.
    pub fn merged_with(&self, alumni: &Dataset) -> RawTable {
        let rows = alumni
            .records
            .iter()
            .map(|record| record.values.clone())
            .chain(self.new_records.iter().cloned())
            .collect();
        RawTable {
            headers: alumni.headers.clone(),
            rows,
        }
    }
}

fn expect_kind(dataset: &Dataset, expected: SchemaKind) -> Result<()> {
    if dataset.kind == expected {
        Ok(())
    } else {
        Err(EngineError::WrongSchema {
            expected,
            found: dataset.kind,
        })
    }
}

pub fn diff_rosters(
    banner: &Dataset,
    alumni: &Dataset,
    field_map: &[FieldMapping],
    new_graduate_status: &str,
    today: NaiveDate,
) -> Result<BannerDiff> {
    expect_kind(banner, SchemaKind::Banner)?;
    expect_kind(alumni, SchemaKind::Alumni)?;

    let known: HashSet<&str> = alumni
        .records
        .iter()
        .map(|record| record.student_id.trim())
        .filter(|id| !id.is_empty())
        .collect();

    let alumni_position = |name: &str| alumni.headers.iter().position(|header| header == name);
    let mappings: Vec<(usize, usize)> = field_map
        .iter()
        .filter_map(|mapping| {
            let source = banner.headers.iter().position(|header| *header == mapping.banner)?;
            let target = alumni_position(&mapping.alumni)?;
            Some((source, target))
        })
        .collect();
    let status_col = alumni_position(CURRENT_STATUS);
    let comments_col = alumni_position(COMMENTS);
    let name_col = banner.column(STUDENT_NAME);
    let comment = format!("Added from Banner on {}", today.format("%Y-%m-%d"));

    let mut seen: HashSet<&str> = HashSet::new();
    let mut new_records = Vec::new();
    let mut new_students = Vec::new();
    for record in &banner.records {
        let id = record.student_id.trim();
        if id.is_empty() || known.contains(id) || !seen.insert(id) {
            continue;
        }

        let mut row = vec![String::new(); alumni.headers.len()];
        for &(source, target) in &mappings {
            if let Some(value) = record.values.get(source) {
                row[target] = value.clone();
            }
        }
        if let Some(index) = status_col {
            row[index] = new_graduate_status.to_string();
        }
        if let Some(index) = comments_col {
            row[index] = comment.clone();
        }

        new_students.push(NewGraduate {
            student_id: id.to_string(),
            student_name: name_col
                .map(|column| column.get(record).to_string())
                .unwrap_or_default(),
        });
        new_records.push(row);
    }

    let counts = DiffCounts {
        banner_records: banner.len(),
        alumni_records: alumni.len(),
        new_records: new_records.len(),
        combined_records: alumni.len() + new_records.len(),
    };
    info!(
        banner = counts.banner_records,
        alumni = counts.alumni_records,
        new = counts.new_records,
        "compared Banner roster against alumni roster"
    );

    Ok(BannerDiff {
        columns: alumni.headers.clone(),
        new_records,
        new_students,
        counts,
    })
}
