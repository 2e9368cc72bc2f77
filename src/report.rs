use std::collections::{BTreeSet, HashSet};
use std::fmt::Write;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{
    cross_tab, gender_nationality_breakdown, simple_summary, top, value_counts, CrossTab,
    CrossTabRow,
};
use crate::banner::BannerDiff;
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::filter::{self, Selection};
use crate::models::{
    cell_or_blank, Cell, Dataset, DegreeLevel, FilterParams, FrequencyEntry, OptionalColumn,
    QaaOptions, Report, ReportMode, RosterRecord, SchemaKind, Sheet, ALUMNI_TERM, MAJOR,
    STUDENT_NAME,
};
use crate::workplace::{workplace_statistics, WorkplaceColumns};

const SHEET_NAME_LIMIT: usize = 31;
const COMBINED_SHEET: &str = "Combined_Report";
const BREAKDOWN_SHEET: &str = "Gender_Nationality_Breakdown";
const ALL_YEARS_SHEET: &str = "All years summary";

const ALUMNI_LIST_COLUMNS: [&str; 11] = [
    "Student Name",
    "Gender",
    "College Degree",
    "Major",
    "Minor",
    "Concentration",
    "Personal Email",
    "Phone Number",
    "Nationality",
    "GPA",
    "Year/Semester of Graduation",
];

fn truncate(value: &str, max_len: usize) -> String {
    value.chars().take(max_len).collect()
}

/// Sheet names already handed out in one workbook.
#[derive(Default)]
struct SheetNames {
    used: HashSet<String>,
}

impl SheetNames {
    /// Cuts `name` to the sheet-name limit and numbers repeats `(2)`, `(3)`, ...
    fn claim(&mut self, name: &str) -> String {
        let mut candidate = truncate(name, SHEET_NAME_LIMIT);
        let mut n = 2;
        while self.used.contains(&candidate) {
            let suffix = format!(" ({n})");
            candidate = format!(
                "{}{}",
                truncate(name, SHEET_NAME_LIMIT - suffix.len()),
                suffix
            );
            n += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

fn require_alumni(dataset: &Dataset) -> Result<()> {
    if dataset.kind == SchemaKind::Alumni {
        Ok(())
    } else {
        Err(EngineError::WrongSchema {
            expected: SchemaKind::Alumni,
            found: dataset.kind,
        })
    }
}

fn academic_terms(records: &[&RosterRecord]) -> String {
    let terms: BTreeSet<&str> = records
        .iter()
        .map(|record| record.term.trim())
        .filter(|term| !term.is_empty())
        .collect();
    terms.into_iter().collect::<Vec<_>>().join(", ")
}

fn of_college<'a>(records: &[&'a RosterRecord], college: &str) -> Vec<&'a RosterRecord> {
    let college = college.trim();
    records
        .iter()
        .filter(|record| record.college.trim() == college)
        .copied()
        .collect()
}

fn major_key(record: &RosterRecord, composite: bool, marker: char) -> String {
    if composite {
        format!(
            "{} - {} - {}",
            record.major.trim(),
            record.degree_label(marker),
            record.college.trim()
        )
    } else {
        record.major.trim().to_string()
    }
}

fn cross_tab_cells(row: &CrossTabRow) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(row.counts.len() + 10);
    cells.push(Cell::text(&row.key));
    cells.extend(row.counts.iter().map(|&count| Cell::Count(count)));
    cells.push(Cell::Count(row.total));
    cells.push(Cell::Blank);
    cells.push(Cell::Blank);
    cells.push(Cell::Count(row.employed));
    cells.push(Cell::Count(row.unemployed));
    cells.push(Cell::Count(row.studying));
    cells.push(Cell::Number(row.employed_pct));
    cells.push(Cell::Number(row.unemployed_pct));
    cells.push(Cell::Number(row.studying_pct));
    cells
}

fn cross_tab_sheet(name: String, table: &CrossTab) -> Sheet {
    let mut columns = vec![MAJOR.to_string()];
    columns.extend(table.status_columns.iter().cloned());
    columns.extend(
        [
            "Total",
            "",
            " ",
            "Employed",
            "Unemployed",
            "Studying",
            "Employed Percentage",
            "Unemployed Percentage",
            "Studying Percentage",
        ]
        .iter()
        .map(|column| column.to_string()),
    );

    let mut sheet = Sheet::with_columns(name, columns);
    sheet.rows = table
        .rows
        .iter()
        .chain(std::iter::once(&table.overall))
        .map(cross_tab_cells)
        .collect();
    sheet
}

/// Employment-outcome report for quality assurance.
///
/// Detailed mode needs an Alumni roster. Simple mode only counts graduates, so
/// it also runs against a Banner roster and ignores the degree, gender and
/// nationality filters.
pub fn qaa_report(
    engine: &Engine,
    dataset: &Dataset,
    params: &FilterParams,
    options: QaaOptions,
) -> Result<Report> {
    let report = match options.mode {
        ReportMode::Simple => simple_qaa_report(engine, dataset, params)?,
        ReportMode::Detailed => detailed_qaa_report(engine, dataset, params, options)?,
    };
    info!(
        source = %dataset.source_name,
        sheets = report.sheets.len(),
        warnings = report.warnings.len(),
        "generated QAA report"
    );
    Ok(report)
}

fn detailed_qaa_report(
    engine: &Engine,
    dataset: &Dataset,
    params: &FilterParams,
    options: QaaOptions,
) -> Result<Report> {
    require_alumni(dataset)?;
    let config = engine.config();
    let marker = config.graduate_marker;

    // Breakdown population: college, term and degree only.
    let base = filter::by_degree(
        filter::by_college_and_term(dataset, params),
        params.degree,
        marker,
    );
    let selection = filter::by_gender(base.clone(), params.gender);
    let selection =
        filter::by_nationality(dataset, selection, params.nationality, &config.saudi_nationality);
    if selection.is_empty() {
        return Err(EngineError::NoMatchingData);
    }

    let composite = options.combine_all || params.degree == DegreeLevel::All;
    let key = |record: &RosterRecord| major_key(record, composite, marker);
    let buckets = engine.buckets();
    let mut names = SheetNames::default();
    let mut sheets = Vec::new();

    if options.combine_all {
        let table = cross_tab(&selection.records, buckets, &key);
        let mut sheet = cross_tab_sheet(names.claim(COMBINED_SHEET), &table);
        sheet.note("Academic Years:", academic_terms(&selection.records));
        sheets.push(sheet);
    } else if options.combine_years {
        for college in &params.colleges {
            let records = of_college(&selection.records, college);
            if records.is_empty() {
                continue;
            }
            let table = cross_tab(&records, buckets, &key);
            let name = names.claim(&config.college_label(college, 25));
            let mut sheet = cross_tab_sheet(name, &table);
            sheet.note("Academic Years:", academic_terms(&records));
            sheets.push(sheet);
        }
    } else {
        for college in &params.colleges {
            let records = of_college(&selection.records, college);
            if records.is_empty() {
                continue;
            }
            for term in &params.terms {
                let term = term.trim();
                let term_records: Vec<&RosterRecord> = records
                    .iter()
                    .filter(|record| record.term == term)
                    .copied()
                    .collect();
                if term_records.is_empty() {
                    continue;
                }
                let table = cross_tab(&term_records, buckets, &key);
                let name =
                    names.claim(&format!("{} - {}", config.college_label(college, 15), term));
                let mut sheet = cross_tab_sheet(name, &table);
                sheet.note("Academic Year:", term);
                sheets.push(sheet);
            }
        }
    }

    let mut warnings = selection.warnings;
    match breakdown_sheet(engine, dataset, &base, params) {
        Some(sheet) => sheets.push(sheet),
        None if dataset.optional(OptionalColumn::Nationality).is_none() => {
            warn!("nationality column missing, breakdown sheet skipped");
            warnings.push(
                "Nationality column not found, gender/nationality breakdown skipped".to_string(),
            );
        }
        None => {}
    }

    Ok(Report { sheets, warnings })
}

fn breakdown_sheet(
    engine: &Engine,
    dataset: &Dataset,
    base: &Selection<'_>,
    params: &FilterParams,
) -> Option<Sheet> {
    let nationality = dataset.optional(OptionalColumn::Nationality)?;
    let colleges: Vec<String> = params
        .colleges
        .iter()
        .map(|college| college.trim().to_string())
        .collect();
    let rows = gender_nationality_breakdown(
        &base.records,
        &colleges,
        nationality,
        &engine.config().saudi_nationality,
        engine.buckets(),
    );
    if rows.is_empty() {
        return None;
    }

    let mut sheet = Sheet::new(
        BREAKDOWN_SHEET,
        &[
            "College",
            "Gender",
            "Nationality Category",
            "Employed",
            "Unemployed",
            "Studying",
            "Total",
            "Employed %",
            "Unemployed %",
            "Studying %",
        ],
    );
    sheet.rows = rows
        .iter()
        .map(|row| {
            vec![
                Cell::text(&row.college),
                Cell::text(&row.gender),
                Cell::text(&row.nationality),
                Cell::Count(row.employed),
                Cell::Count(row.unemployed),
                Cell::Count(row.studying),
                Cell::Count(row.total),
                Cell::Number(row.employed_pct),
                Cell::Number(row.unemployed_pct),
                Cell::Number(row.studying_pct),
            ]
        })
        .collect();
    sheet.note("Gender and Nationality Employment Breakdown", "");
    sheet.note(
        "Note:",
        "This breakdown shows employed vs. unemployed alumni by gender and nationality.",
    );
    Some(sheet)
}

fn simple_qaa_report(engine: &Engine, dataset: &Dataset, params: &FilterParams) -> Result<Report> {
    let config = engine.config();
    let selection = filter::by_college_and_term(dataset, params);
    if selection.is_empty() {
        return Err(EngineError::NoMatchingData);
    }

    let nationality = dataset.optional(OptionalColumn::Nationality);
    let summary = simple_summary(&selection.records, nationality, &config.saudi_nationality);
    let mut names = SheetNames::default();
    let mut sheets = Vec::new();
    let mut warnings = Vec::new();

    for year in &summary.years {
        let name = names.claim(&year.academic_year.replace('-', "_"));
        let mut sheet = Sheet::new(name, &["College", "Total Graduates", "Gentlemen", "Ladies"]);
        sheet.rows = year
            .colleges
            .iter()
            .chain(std::iter::once(&year.total))
            .map(|counts| {
                vec![
                    Cell::text(&counts.college),
                    Cell::Count(counts.total),
                    Cell::Count(counts.gentlemen),
                    Cell::Count(counts.ladies),
                ]
            })
            .collect();
        sheets.push(sheet);
    }

    let mut all_years = Sheet::new(
        names.claim(ALL_YEARS_SHEET),
        &["College", "Total Graduates", "Ladies", "Gentlemen", "Saudi", "Non-Saudi"],
    );
    all_years.rows = summary
        .all_years
        .iter()
        .chain(std::iter::once(&summary.all_years_total))
        .map(|rollup| {
            vec![
                Cell::text(&rollup.college),
                Cell::Count(rollup.total),
                Cell::Count(rollup.ladies),
                Cell::Count(rollup.gentlemen),
                Cell::Count(rollup.saudi),
                Cell::Count(rollup.non_saudi),
            ]
        })
        .collect();
    sheets.push(all_years);

    if summary.unknown_year_records > 0 {
        warnings.push(format!(
            "{} records with an unrecognized graduation term were left out of the per-year sheets: {}",
            summary.unknown_year_records,
            summary.unknown_terms.join(", ")
        ));
    }
    if nationality.is_none() {
        warnings.push(
            "Nationality column not found, every graduate is counted as Non-Saudi".to_string(),
        );
    }

    Ok(Report { sheets, warnings })
}

/// Contact list of alumni whose status is in `allowed_statuses`, one sheet
/// per requested college.
pub fn alumni_list(
    engine: &Engine,
    dataset: &Dataset,
    params: &FilterParams,
    allowed_statuses: &[String],
) -> Result<Report> {
    require_alumni(dataset)?;
    let config = engine.config();
    let selection = filter::apply(
        dataset,
        params,
        config.graduate_marker,
        &config.saudi_nationality,
    );
    let selection = filter::by_status(selection, allowed_statuses);
    if selection.is_empty() {
        return Err(EngineError::NoMatchingData);
    }

    let column = |name: &str| dataset.column(name);
    let degree = dataset.optional(OptionalColumn::Degree);
    let sources = [
        column(STUDENT_NAME),
        column("Gender"),
        None,
        column(MAJOR),
        dataset.optional(OptionalColumn::Minor),
        dataset.optional(OptionalColumn::Concentration),
        dataset.optional(OptionalColumn::PersonalEmail),
        dataset.optional(OptionalColumn::PhoneNumber),
        dataset.optional(OptionalColumn::Nationality),
        dataset.optional(OptionalColumn::Gpa),
        column(ALUMNI_TERM),
    ];

    let mut names = SheetNames::default();
    let mut sheets = Vec::new();
    for college in &params.colleges {
        let records = of_college(&selection.records, college);
        if records.is_empty() {
            continue;
        }
        let mut sheet = Sheet::new(
            names.claim(&config.college_label(college, 25)),
            &ALUMNI_LIST_COLUMNS,
        );
        sheet.rows = records
            .iter()
            .map(|record| {
                sources
                    .iter()
                    .enumerate()
                    .map(|(index, source)| {
                        if index == 2 {
                            let college_degree = format!(
                                "{} {}",
                                record.college.trim(),
                                cell_or_blank(degree, record).trim()
                            );
                            Cell::text(college_degree.trim_end())
                        } else {
                            Cell::text(cell_or_blank(*source, record))
                        }
                    })
                    .collect()
            })
            .collect();
        sheets.push(sheet);
    }

    info!(
        source = %dataset.source_name,
        alumni = selection.len(),
        sheets = sheets.len(),
        "generated alumni list"
    );
    Ok(Report {
        sheets,
        warnings: selection.warnings,
    })
}

fn workplace_columns(dataset: &Dataset) -> WorkplaceColumns {
    WorkplaceColumns {
        nationality: dataset.optional(OptionalColumn::Nationality),
        industry: dataset.optional(OptionalColumn::Industry),
        employment_type: dataset.optional(OptionalColumn::EmploymentType),
    }
}

fn frequency_sheet(name: &str, label: &str, entries: &[FrequencyEntry]) -> Sheet {
    let mut sheet = Sheet::new(name, &[label, "Count"]);
    sheet.rows = entries
        .iter()
        .map(|entry| vec![Cell::text(&entry.value), Cell::Count(entry.count)])
        .collect();
    sheet
}

/// Employer and position statistics for the filtered alumni.
pub fn workplace_report(
    engine: &Engine,
    dataset: &Dataset,
    params: &FilterParams,
) -> Result<Report> {
    require_alumni(dataset)?;
    let config = engine.config();
    let selection = filter::apply(
        dataset,
        params,
        config.graduate_marker,
        &config.saudi_nationality,
    );
    if selection.is_empty() {
        return Err(EngineError::NoMatchingData);
    }

    let columns = workplace_columns(dataset);
    let stats = workplace_statistics(
        &selection.records,
        engine.companies(),
        engine.titles(),
        columns,
        &config.limits,
    );

    let mut warnings = selection.warnings;
    for (column, present) in [
        (OptionalColumn::Industry, columns.industry.is_some()),
        (OptionalColumn::Nationality, columns.nationality.is_some()),
        (OptionalColumn::EmploymentType, columns.employment_type.is_some()),
    ] {
        if !present {
            warnings.push(format!(
                "{} column not found, its distribution is left empty",
                column.header()
            ));
        }
    }

    let mut summary = Sheet::new("Summary", &["Metric", "Value"]);
    summary.rows = vec![
        vec![Cell::text("Total Alumni"), Cell::Count(stats.total_alumni as u64)],
        vec![Cell::text("Valid Workplace Entries"), Cell::Count(stats.valid_entries as u64)],
        vec![Cell::text("Empty/Unknown Entries"), Cell::Count(stats.empty_entries as u64)],
        vec![Cell::text("Number of Colleges"), Cell::Count(params.colleges.len() as u64)],
        vec![Cell::text("Years Covered"), Cell::text(format!("{} years", params.terms.len()))],
        vec![Cell::text("Degree Level"), Cell::text(params.degree.to_string())],
    ];

    let mut positions = frequency_sheet("Top Positions", "High Position", &stats.high_positions);
    positions.note(
        "Total Alumni with High Positions:",
        stats.high_positions_count.to_string(),
    );
    positions.note(
        "% of Alumni with High Positions:",
        format!("{:.2}%", stats.high_position_percentage()),
    );

    let sheets = vec![
        summary,
        frequency_sheet("Empty Analysis", "Category", &stats.empty_stats),
        frequency_sheet("Top Employers", "Employer", &stats.top_employers),
        positions,
        frequency_sheet("Industry Distribution", "Industry", &stats.industry_dist),
        frequency_sheet("Nationality Distribution", "Nationality", &stats.nationality_dist),
        frequency_sheet("Employment Type", "Employment Type", &stats.employment_type_dist),
    ];

    info!(
        source = %dataset.source_name,
        alumni = stats.total_alumni,
        high_positions = stats.high_positions_count,
        "generated workplace report"
    );
    Ok(Report { sheets, warnings })
}

/// The combined alumni roster plus the list of graduates that were added.
pub fn banner_report(diff: &BannerDiff, alumni: &Dataset) -> Report {
    let merged = diff.merged_with(alumni);
    let mut combined = Sheet::with_columns("Updated Alumni List", merged.headers);
    combined.rows = merged
        .rows
        .into_iter()
        .map(|row| row.into_iter().map(Cell::Text).collect())
        .collect();

    let mut added = Sheet::new("New Graduates", &["Student ID", "Student Name"]);
    added.rows = diff
        .new_students
        .iter()
        .map(|student| vec![Cell::text(&student.student_id), Cell::text(&student.student_name)])
        .collect();
    added.note("Banner records:", diff.counts.banner_records.to_string());
    added.note("Alumni records:", diff.counts.alumni_records.to_string());
    added.note("New records:", diff.counts.new_records.to_string());
    added.note("Combined records:", diff.counts.combined_records.to_string());

    let mut warnings = Vec::new();
    if diff.new_records.is_empty() {
        warnings.push(
            "No new graduates found in Banner that are not already in the Alumni List."
                .to_string(),
        );
    }
    Report {
        sheets: vec![combined, added],
        warnings,
    }
}

/// Headline counts for a filter, without building any sheets.
#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub mode: ReportMode,
    pub total_records: usize,
    pub college_counts: Vec<FrequencyEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_counts: Option<Vec<FrequencyEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_counts: Option<Vec<FrequencyEntry>>,
    pub warnings: Vec<String>,
}

pub fn preview(
    engine: &Engine,
    dataset: &Dataset,
    params: &FilterParams,
    mode: ReportMode,
) -> Preview {
    let config = engine.config();
    let selection = filter::apply(
        dataset,
        params,
        config.graduate_marker,
        &config.saudi_nationality,
    );
    let college_counts = value_counts(selection.records.iter().map(|record| record.college.trim()));
    let (gender_counts, status_counts) = match mode {
        ReportMode::Simple => (
            Some(value_counts(selection.records.iter().map(|record| &record.gender))),
            None,
        ),
        ReportMode::Detailed => (
            None,
            Some(top(
                value_counts(selection.records.iter().map(|record| &record.status)),
                config.limits.preview_statuses,
            )),
        ),
    };

    Preview {
        mode,
        total_records: selection.len(),
        college_counts,
        gender_counts,
        status_counts,
        warnings: selection.warnings,
    }
}

/// Headline counts of the alumni list a filter and status set would produce.
#[derive(Debug, Clone, Serialize)]
pub struct AlumniListPreview {
    pub total_alumni: usize,
    pub college_counts: Vec<FrequencyEntry>,
    pub gender_counts: Vec<FrequencyEntry>,
    pub warnings: Vec<String>,
}

pub fn alumni_list_preview(
    engine: &Engine,
    dataset: &Dataset,
    params: &FilterParams,
    allowed_statuses: &[String],
) -> Result<AlumniListPreview> {
    require_alumni(dataset)?;
    let config = engine.config();
    let selection = filter::apply(
        dataset,
        params,
        config.graduate_marker,
        &config.saudi_nationality,
    );
    let selection = filter::by_status(selection, allowed_statuses);

    Ok(AlumniListPreview {
        total_alumni: selection.len(),
        college_counts: value_counts(selection.records.iter().map(|record| record.college.trim())),
        gender_counts: value_counts(selection.records.iter().map(|record| record.gender.trim())),
        warnings: selection.warnings,
    })
}

/// The leading rows of each workplace table.
#[derive(Debug, Clone, Serialize)]
pub struct WorkplacePreview {
    pub total_alumni: usize,
    pub valid_entries: usize,
    pub empty_entries: usize,
    pub empty_stats: Vec<FrequencyEntry>,
    pub top_employers: Vec<FrequencyEntry>,
    pub top_positions: Vec<FrequencyEntry>,
    pub industry_dist: Vec<FrequencyEntry>,
    pub warnings: Vec<String>,
}

const PREVIEW_ROWS: usize = 5;
const PREVIEW_INDUSTRIES: usize = 3;

pub fn workplace_preview(
    engine: &Engine,
    dataset: &Dataset,
    params: &FilterParams,
) -> Result<WorkplacePreview> {
    require_alumni(dataset)?;
    let config = engine.config();
    let selection = filter::apply(
        dataset,
        params,
        config.graduate_marker,
        &config.saudi_nationality,
    );
    let stats = workplace_statistics(
        &selection.records,
        engine.companies(),
        engine.titles(),
        workplace_columns(dataset),
        &config.limits,
    );

    Ok(WorkplacePreview {
        total_alumni: stats.total_alumni,
        valid_entries: stats.valid_entries,
        empty_entries: stats.empty_entries,
        empty_stats: top(stats.empty_stats, PREVIEW_ROWS),
        top_employers: top(stats.top_employers, PREVIEW_ROWS),
        top_positions: top(stats.high_positions, PREVIEW_ROWS),
        industry_dist: top(stats.industry_dist, PREVIEW_INDUSTRIES),
        warnings: selection.warnings,
    })
}

/// Plain-text rendering of a report for the terminal.
pub fn render_text(title: &str, report: &Report) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {title}");
    for sheet in &report.sheets {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {}", sheet.name);
        let _ = writeln!(output, "{}", sheet.columns.join(" | "));
        if sheet.rows.is_empty() {
            let _ = writeln!(output, "(no rows)");
        }
        for row in &sheet.rows {
            let cells: Vec<String> = row.iter().map(Cell::render).collect();
            let _ = writeln!(output, "{}", cells.join(" | "));
        }
        for note in &sheet.notes {
            let _ = writeln!(output, "{} {}", note.label, note.value);
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Warnings");
        for warning in &report.warnings {
            let _ = writeln!(output, "- {warning}");
        }
    }

    output
}
