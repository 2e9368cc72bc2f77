use serde::Serialize;
use tracing::debug;

use crate::aggregate::{top, value_counts};
use crate::config::ReportLimits;
use crate::models::{ColumnRef, FrequencyEntry, RosterRecord};
use crate::normalize::{is_empty_marker, CompanyNormalizer};
use crate::positions::TitleClassifier;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkplaceStatistics {
    pub top_employers: Vec<FrequencyEntry>,
    pub empty_stats: Vec<FrequencyEntry>,
    pub top_positions: Vec<FrequencyEntry>,
    pub high_positions: Vec<FrequencyEntry>,
    pub nationality_dist: Vec<FrequencyEntry>,
    pub industry_dist: Vec<FrequencyEntry>,
    pub employment_type_dist: Vec<FrequencyEntry>,
    pub total_alumni: usize,
    pub valid_entries: usize,
    pub empty_entries: usize,
    pub high_positions_count: usize,
}

impl WorkplaceStatistics {
    pub fn high_position_percentage(&self) -> f64 {
        if self.total_alumni == 0 {
            0.0
        } else {
            self.high_positions_count as f64 / self.total_alumni as f64 * 100.0
        }
    }
}

/// The optional columns workplace statistics can draw on.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkplaceColumns {
    pub nationality: Option<ColumnRef>,
    pub industry: Option<ColumnRef>,
    pub employment_type: Option<ColumnRef>,
}

/// Frequency table of a column that may be missing; absent means empty.
fn distribution(
    records: &[&RosterRecord],
    column: Option<ColumnRef>,
    limit: Option<usize>,
) -> Vec<FrequencyEntry> {
    let Some(column) = column else {
        return Vec::new();
    };
    let counts = value_counts(
        records
            .iter()
            .map(|record| column.get(record).trim())
            .filter(|value| !value.is_empty()),
    );
    match limit {
        Some(limit) => top(counts, limit),
        None => counts,
    }
}

pub fn workplace_statistics(
    records: &[&RosterRecord],
    companies: &CompanyNormalizer,
    titles: &TitleClassifier,
    columns: WorkplaceColumns,
    limits: &ReportLimits,
) -> WorkplaceStatistics {
    let workplaces: Vec<String> = records
        .iter()
        .map(|record| companies.normalize(Some(&record.workplace)))
        .collect();
    let (empty, valid): (Vec<&String>, Vec<&String>) =
        workplaces.iter().partition(|name| is_empty_marker(name));

    let high: Vec<String> = records
        .iter()
        .filter_map(|record| titles.classify(Some(&record.position)))
        .collect();

    let raw_positions = records
        .iter()
        .map(|record| record.position.trim())
        .filter(|position| !position.is_empty());

    let stats = WorkplaceStatistics {
        top_employers: top(value_counts(&valid), limits.top_employers),
        empty_stats: value_counts(&empty),
        top_positions: top(value_counts(raw_positions), limits.top_positions),
        high_positions: top(value_counts(&high), limits.top_high_positions),
        nationality_dist: distribution(
            records,
            columns.nationality,
            Some(limits.top_nationalities),
        ),
        industry_dist: distribution(records, columns.industry, Some(limits.top_industries)),
        employment_type_dist: distribution(records, columns.employment_type, None),
        total_alumni: records.len(),
        valid_entries: valid.len(),
        empty_entries: empty.len(),
        high_positions_count: high.len(),
    };
    debug!(
        total = stats.total_alumni,
        valid = stats.valid_entries,
        high = stats.high_positions_count,
        "computed workplace statistics"
    );
    stats
}
