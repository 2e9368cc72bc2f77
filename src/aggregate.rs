use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::config::StatusConfig;
use crate::models::{ColumnRef, FrequencyEntry, RosterRecord};
use crate::normalize::{canonicalize_status, extract_academic_year, UNKNOWN_YEAR};

pub const OVERALL_TOTAL: &str = "Overall Total";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Employed,
    Unemployed,
    Studying,
}

/// Canonical statuses and the employment bucket each one rolls up into.
#[derive(Debug, Clone)]
pub struct StatusBuckets {
    canonical: Vec<String>,
    employed: HashSet<String>,
    unemployed: String,
    studying: String,
}

impl StatusBuckets {
    pub fn new(config: &StatusConfig) -> Self {
        Self {
            canonical: config.canonical.iter().map(|s| canonicalize_status(s)).collect(),
            employed: config.employed.iter().map(|s| canonicalize_status(s)).collect(),
            unemployed: canonicalize_status(&config.unemployed),
            studying: canonicalize_status(&config.studying),
        }
    }

    pub fn canonical(&self) -> &[String] {
        &self.canonical
    }

    pub fn is_canonical(&self, status: &str) -> bool {
        self.canonical.iter().any(|known| known == status)
    }

    pub fn bucket(&self, status: &str) -> Option<Bucket> {
        if self.employed.contains(status) {
            Some(Bucket::Employed)
        } else if status == self.unemployed {
            Some(Bucket::Unemployed)
        } else if status == self.studying {
            Some(Bucket::Studying)
        } else {
            None
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// `part / whole * 100` rounded to two decimals; zero when `whole` is zero.
pub fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round2(part as f64 / whole as f64 * 100.0)
    }
}

/// Descending frequency table; ties keep first-seen order.
pub fn value_counts<I, S>(values: I) -> Vec<FrequencyEntry>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut entries: Vec<FrequencyEntry> = Vec::new();
    for value in values {
        let value = value.as_ref();
        match index.get(value) {
            Some(&position) => entries[position].count += 1,
            None => {
                index.insert(value.to_string(), entries.len());
                entries.push(FrequencyEntry {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries
}

pub fn top(mut entries: Vec<FrequencyEntry>, limit: usize) -> Vec<FrequencyEntry> {
    entries.truncate(limit);
    entries
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTabRow {
    pub key: String,
    /// Aligned with `CrossTab::status_columns`.
    pub counts: Vec<u64>,
    pub total: u64,
    pub employed: u64,
    pub unemployed: u64,
    pub studying: u64,
    pub employed_pct: f64,
    pub unemployed_pct: f64,
    pub studying_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossTab {
    pub status_columns: Vec<String>,
    pub rows: Vec<CrossTabRow>,
    pub overall: CrossTabRow,
}

impl CrossTab {
    pub fn grand_total(&self) -> u64 {
        self.overall.total
    }
}

fn bucket_sums(columns: &[String], counts: &[u64], buckets: &StatusBuckets) -> (u64, u64, u64) {
    let mut sums = (0, 0, 0);
    for (status, count) in columns.iter().zip(counts) {
        match buckets.bucket(status) {
            Some(Bucket::Employed) => sums.0 += count,
            Some(Bucket::Unemployed) => sums.1 += count,
            Some(Bucket::Studying) => sums.2 += count,
            None => {}
        }
    }
    sums
}

fn build_row(
    key: String,
    counts: Vec<u64>,
    columns: &[String],
    buckets: &StatusBuckets,
    grand_total: u64,
) -> CrossTabRow {
    let total = counts.iter().sum();
    let (employed, unemployed, studying) = bucket_sums(columns, &counts, buckets);
    CrossTabRow {
        key,
        counts,
        total,
        employed,
        unemployed,
        studying,
        employed_pct: percent(employed, grand_total),
        unemployed_pct: percent(unemployed, grand_total),
        studying_pct: percent(studying, grand_total),
    }
}

/// Status counts per grouping key, with employment rollups.
///
/// Percentages are taken against the grand total of the whole table, not the
/// row's own total, so a row's percentages do not sum to 100.
pub fn cross_tab<F>(records: &[&RosterRecord], buckets: &StatusBuckets, key: F) -> CrossTab
where
    F: Fn(&RosterRecord) -> String,
{
    let mut groups: BTreeMap<String, HashMap<&str, u64>> = BTreeMap::new();
    let mut extra_statuses: BTreeSet<&str> = BTreeSet::new();
    for record in records {
        let status = record.status.as_str();
        if !buckets.is_canonical(status) {
            extra_statuses.insert(status);
        }
        *groups.entry(key(*record)).or_default().entry(status).or_insert(0) += 1;
    }

    let status_columns: Vec<String> = buckets
        .canonical()
        .iter()
        .cloned()
        .chain(extra_statuses.iter().map(|status| status.to_string()))
        .collect();
    let grand_total = records.len() as u64;

    let rows: Vec<CrossTabRow> = groups
        .into_iter()
        .map(|(key, counts)| {
            let aligned = status_columns
                .iter()
                .map(|status| counts.get(status.as_str()).copied().unwrap_or(0))
                .collect();
            build_row(key, aligned, &status_columns, buckets, grand_total)
        })
        .collect();

    let column_sums = (0..status_columns.len())
        .map(|index| rows.iter().map(|row| row.counts[index]).sum())
        .collect();
    let overall = build_row(
        OVERALL_TOTAL.to_string(),
        column_sums,
        &status_columns,
        buckets,
        grand_total,
    );

    debug!(groups = rows.len(), grand_total, "built status cross-tab");
    CrossTab {
        status_columns,
        rows,
        overall,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenderCounts {
    pub college: String,
    pub total: u64,
    pub gentlemen: u64,
    pub ladies: u64,
}

impl GenderCounts {
    fn new(college: &str) -> Self {
        Self {
            college: college.to_string(),
            total: 0,
            gentlemen: 0,
            ladies: 0,
        }
    }

    fn add(&mut self, gender: &str) {
        self.total += 1;
        match gender.trim().to_uppercase().as_str() {
            "MALE" => self.gentlemen += 1,
            "FEMALE" => self.ladies += 1,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearSummary {
    pub academic_year: String,
    pub colleges: Vec<GenderCounts>,
    pub total: GenderCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollegeRollup {
    pub college: String,
    pub total: u64,
    pub ladies: u64,
    pub gentlemen: u64,
    pub saudi: u64,
    pub non_saudi: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimpleSummary {
    pub years: Vec<YearSummary>,
    pub all_years: Vec<CollegeRollup>,
    pub all_years_total: CollegeRollup,
    pub unknown_year_records: usize,
    pub unknown_terms: Vec<String>,
}

/// Colleges in the order they first appear, with their records.
fn group_by_college<'a>(records: &[&'a RosterRecord]) -> Vec<(String, Vec<&'a RosterRecord>)> {
    let mut groups: Vec<(String, Vec<&'a RosterRecord>)> = Vec::new();
    for record in records {
        let college = record.college.trim();
        match groups.iter_mut().find(|(name, _)| name.as_str() == college) {
            Some((_, members)) => members.push(*record),
            None => groups.push((college.to_string(), vec![*record])),
        }
    }
    groups
}

/// Graduate counts per academic year and college, plus an all-years rollup.
pub fn simple_summary(
    records: &[&RosterRecord],
    nationality: Option<ColumnRef>,
    saudi_value: &str,
) -> SimpleSummary {
    let mut by_year: BTreeMap<String, Vec<&RosterRecord>> = BTreeMap::new();
    let mut unknown_terms = BTreeSet::new();
    let mut unknown_year_records = 0;
    for record in records {
        let year = extract_academic_year(&record.term);
        if year == UNKNOWN_YEAR {
            unknown_year_records += 1;
            unknown_terms.insert(record.term.clone());
            continue;
        }
        by_year.entry(year).or_default().push(*record);
    }

    let years = by_year
        .into_iter()
        .map(|(academic_year, members)| {
            let mut total = GenderCounts::new("TOTAL");
            let colleges = group_by_college(&members)
                .into_iter()
                .map(|(college, members)| {
                    let mut counts = GenderCounts::new(&college);
                    for record in members {
                        counts.add(&record.gender);
                        total.add(&record.gender);
                    }
                    counts
                })
                .collect();
            YearSummary {
                academic_year,
                colleges,
                total,
            }
        })
        .collect();

    let all_years: Vec<CollegeRollup> = group_by_college(records)
        .into_iter()
        .map(|(college, members)| {
            let mut counts = GenderCounts::new(&college);
            let mut saudi = 0;
            for record in &members {
                counts.add(&record.gender);
                if nationality.is_some_and(|column| column.get(record).trim() == saudi_value) {
                    saudi += 1;
                }
            }
            CollegeRollup {
                college,
                total: counts.total,
                ladies: counts.ladies,
                gentlemen: counts.gentlemen,
                saudi,
                non_saudi: counts.total - saudi,
            }
        })
        .collect();

    let all_years_total = all_years.iter().fold(
        CollegeRollup {
            college: "Total of Graduates".to_string(),
            total: 0,
            ladies: 0,
            gentlemen: 0,
            saudi: 0,
            non_saudi: 0,
        },
        |mut acc, row| {
            acc.total += row.total;
            acc.ladies += row.ladies;
            acc.gentlemen += row.gentlemen;
            acc.saudi += row.saudi;
            acc.non_saudi += row.non_saudi;
            acc
        },
    );

    SimpleSummary {
        years,
        all_years,
        all_years_total,
        unknown_year_records,
        unknown_terms: unknown_terms.into_iter().collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownRow {
    pub college: String,
    pub gender: String,
    pub nationality: String,
    pub employed: u64,
    pub unemployed: u64,
    pub studying: u64,
    pub total: u64,
    pub employed_pct: f64,
    pub unemployed_pct: f64,
    pub studying_pct: f64,
}

/// Employment buckets per college, gender and Saudi/Non-Saudi split.
///
/// Statuses outside the three buckets are left out, and percentages are
/// against each row's own total.
pub fn gender_nationality_breakdown(
    records: &[&RosterRecord],
    colleges: &[String],
    nationality: ColumnRef,
    saudi_value: &str,
    buckets: &StatusBuckets,
) -> Vec<BreakdownRow> {
    let mut rows = Vec::new();
    for college in colleges {
        let college = college.trim();
        let mut groups: BTreeMap<(String, &'static str), [u64; 3]> = BTreeMap::new();
        for record in records.iter().filter(|record| record.college.trim() == college) {
            let Some(bucket) = buckets.bucket(&record.status) else {
                continue;
            };
            let category = if nationality.get(record).trim() == saudi_value {
                "Saudi"
            } else {
                "Non-Saudi"
            };
            let slot = match bucket {
                Bucket::Employed => 0,
                Bucket::Unemployed => 1,
                Bucket::Studying => 2,
            };
            groups
                .entry((record.gender.clone(), category))
                .or_insert([0; 3])[slot] += 1;
        }

        for ((gender, category), [employed, unemployed, studying]) in groups {
            let total = employed + unemployed + studying;
            rows.push(BreakdownRow {
                college: college.to_string(),
                gender,
                nationality: category.to_string(),
                employed,
                unemployed,
                studying,
                total,
                employed_pct: percent(employed, total),
                unemployed_pct: percent(unemployed, total),
                studying_pct: percent(studying, total),
            });
        }
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dataset, SchemaKind};

    const COB: &str = "College of Business";
    const COM: &str = "College of Medicine";
    const KSA: &str = "Saudi Arabia";

    fn record(
        row: usize,
        college: &str,
        term: &str,
        gender: &str,
        major: &str,
        status: &str,
        nationality: &str,
    ) -> RosterRecord {
        RosterRecord {
            row,
            student_id: format!("2014{row:05}"),
            college: college.to_string(),
            term: term.to_string(),
            gender: gender.to_string(),
            major: major.to_string(),
            status: status.to_string(),
            workplace: String::new(),
            position: String::new(),
            values: vec![nationality.to_string()],
        }
    }

    fn buckets() -> StatusBuckets {
        StatusBuckets::new(&StatusConfig::default())
    }

    fn sample() -> Vec<RosterRecord> {
        vec![
            record(1, COB, "2014-2015 FALL", "Male", "Finance", "Employed", KSA),
            record(2, COB, "2014-2015 FALL", "Female", "Finance", "Unemployed", "Egypt"),
            record(3, COB, "2014-2015 Spring", "Male", "Marketing", "Studying", KSA),
            record(4, COB, "2014-2015 Spring", "Male", "Finance", "Business owner", KSA),
            record(5, COM, "2015-16", "Female", "Surgery", "Passed away", "Jordan"),
            record(6, COM, "2016", "female", "Surgery", "Retired", KSA),
            record(7, COM, "TBD", "Male", "Surgery", "Employed", KSA),
        ]
    }

    #[test]
    fn value_counts_break_ties_by_first_seen() {
        let counts = value_counts(["B", "A", "A", "C", "B", "D"]);
        let values: Vec<&str> = counts.iter().map(|entry| entry.value.as_str()).collect();
        assert_eq!(values, vec!["B", "A", "C", "D"]);
        assert_eq!(counts[0].count, 2);
        assert_eq!(top(counts, 2).len(), 2);
    }

    #[test]
    fn percent_handles_zero_denominator() {
        assert_eq!(percent(3, 0), 0.0);
        assert_eq!(percent(1, 3), 33.33);
        assert_eq!(percent(2, 3), 66.67);
    }

    #[test]
    fn cross_tab_counts_every_canonical_status() {
        let records = sample();
        let refs: Vec<&RosterRecord> = records.iter().collect();
        let table = cross_tab(&refs, &buckets(), |record| record.major.clone());

        assert_eq!(table.status_columns.len(), 12);
        assert_eq!(table.status_columns.last().map(String::as_str), Some("Retired"));
        let keys: Vec<&str> = table.rows.iter().map(|row| row.key.as_str()).collect();
        assert_eq!(keys, vec!["Finance", "Marketing", "Surgery"]);

        let finance = &table.rows[0];
        assert_eq!(finance.total, 3);
        assert_eq!(finance.employed, 2);
        assert_eq!(finance.unemployed, 1);
        assert_eq!(finance.employed_pct, 28.57);

        let surgery = &table.rows[2];
        assert_eq!(surgery.total, 3);
        assert_eq!(surgery.employed, 2);
        assert!(surgery.employed + surgery.unemployed + surgery.studying < surgery.total);
    }

    #[test]
    fn cross_tab_rows_never_exceed_their_total() {
        let records = sample();
        let refs: Vec<&RosterRecord> = records.iter().collect();
        let table = cross_tab(&refs, &buckets(), |record| record.college.clone());
        for row in table.rows.iter().chain(std::iter::once(&table.overall)) {
            assert!(row.employed + row.unemployed + row.studying <= row.total);
            assert_eq!(row.total, row.counts.iter().sum::<u64>());
        }
    }

    #[test]
    fn overall_row_sums_columns_and_percentages_match() {
        let records = sample();
        let refs: Vec<&RosterRecord> = records.iter().collect();
        let table = cross_tab(&refs, &buckets(), |record| record.major.clone());
        let overall = &table.overall;

        assert_eq!(overall.key, OVERALL_TOTAL);
        assert_eq!(overall.total, 7);
        assert_eq!(overall.total, table.rows.iter().map(|row| row.total).sum::<u64>());
        assert_eq!(overall.employed, 4);

        let pct_sum = overall.employed_pct + overall.unemployed_pct + overall.studying_pct;
        let expected = (overall.employed + overall.unemployed + overall.studying) as f64
            / overall.total as f64
            * 100.0;
        assert!((pct_sum - expected).abs() <= 0.015);
    }

    #[test]
    fn single_group_overall_is_one_hundred_percent() {
        let records = vec![
            record(1, "College of Business", "2014-2015 FALL", "Male", "Finance", "Employed", ""),
            record(2, "College of Business", "2014-2015 FALL", "Male", "Finance", "Training", ""),
        ];
        let refs: Vec<&RosterRecord> = records.iter().collect();
        let table = cross_tab(&refs, &buckets(), |record| record.major.clone());
        assert_eq!(table.overall.employed_pct, 100.0);
        assert_eq!(table.rows[0].employed_pct, 100.0);
    }

    #[test]
    fn simple_summary_groups_by_academic_year() {
        let records = sample();
        let refs: Vec<&RosterRecord> = records.iter().collect();
        let dataset = Dataset::new(
            SchemaKind::Alumni,
            "sample.csv",
            vec!["Nationality".to_string()],
            Vec::new(),
            Vec::new(),
        );
        let summary = simple_summary(&refs, dataset.column("Nationality"), "Saudi Arabia");

        let years: Vec<&str> = summary.years.iter().map(|y| y.academic_year.as_str()).collect();
        assert_eq!(years, vec!["2014-2015", "2015-2016"]);
        assert_eq!(summary.unknown_year_records, 1);
        assert_eq!(summary.unknown_terms, vec!["TBD".to_string()]);

        let first = &summary.years[0];
        assert_eq!(first.total.total, 4);
        assert_eq!(first.total.gentlemen, 3);
        assert_eq!(first.total.ladies, 1);
        for year in &summary.years {
            let sum: u64 = year.colleges.iter().map(|c| c.total).sum();
            assert_eq!(sum, year.total.total);
        }

        let medicine = &summary.years[1].colleges[0];
        assert_eq!(medicine.college, "College of Medicine");
        assert_eq!(medicine.ladies, 2);

        assert_eq!(summary.all_years.len(), 2);
        assert_eq!(summary.all_years[1].total, 3);
        assert_eq!(summary.all_years[1].saudi, 2);
        assert_eq!(summary.all_years[1].non_saudi, 1);
        assert_eq!(summary.all_years_total.total, 7);
    }

    #[test]
    fn simple_summary_without_nationality_counts_everyone_non_saudi() {
        let records = sample();
        let refs: Vec<&RosterRecord> = records.iter().collect();
        let summary = simple_summary(&refs, None, "Saudi Arabia");
        assert_eq!(summary.all_years_total.saudi, 0);
        assert_eq!(summary.all_years_total.non_saudi, 7);
    }

    #[test]
    fn breakdown_drops_statuses_outside_buckets() {
        let records = sample();
        let refs: Vec<&RosterRecord> = records.iter().collect();
        let dataset = Dataset::new(
            SchemaKind::Alumni,
            "sample.csv",
            vec!["Nationality".to_string()],
            Vec::new(),
            Vec::new(),
        );
        let nationality = dataset.column("Nationality").unwrap();
        let rows = gender_nationality_breakdown(
            &refs,
            &["College of Medicine".to_string(), "College of Business".to_string()],
            nationality,
            "Saudi Arabia",
            &buckets(),
        );

        let medicine: Vec<&BreakdownRow> =
            rows.iter().filter(|row| row.college == "College of Medicine").collect();
        assert_eq!(medicine.len(), 2);
        assert_eq!(medicine.iter().map(|row| row.total).sum::<u64>(), 2);

        let business_male_saudi = rows
            .iter()
            .find(|row| {
                row.college == "College of Business"
                    && row.gender == "Male"
                    && row.nationality == "Saudi"
            })
            .unwrap();
        assert_eq!(business_male_saudi.employed, 2);
        assert_eq!(business_male_saudi.studying, 1);
        assert_eq!(business_male_saudi.total, 3);
        assert_eq!(business_male_saudi.employed_pct, 66.67);
        assert_eq!(rows[0].college, "College of Medicine");
    }
}
