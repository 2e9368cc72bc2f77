use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const STUDENT_ID: &str = "Student ID";
pub const STUDENT_NAME: &str = "Student Name";
pub const COLLEGE: &str = "College";
pub const MAJOR: &str = "Major";
pub const GENDER: &str = "Gender";
pub const GRADUATION_TERM: &str = "Graduation Term";
pub const ALUMNI_TERM: &str = "Year/Semester of Graduation";
pub const CURRENT_STATUS: &str = "Current Status";
pub const CURRENT_WORKPLACE: &str = "Current Workplace";
pub const CURRENT_POSITION: &str = "Current Position";
pub const COMMENTS: &str = "Comments";

/// A spreadsheet as the I/O layer hands it over: one header row plus string cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Banner,
    Alumni,
}

impl SchemaKind {
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            SchemaKind::Banner => &[
                STUDENT_ID,
                STUDENT_NAME,
                COLLEGE,
                GRADUATION_TERM,
                MAJOR,
                GENDER,
            ],
            SchemaKind::Alumni => &[
                COLLEGE,
                ALUMNI_TERM,
                CURRENT_STATUS,
                STUDENT_ID,
                GENDER,
                MAJOR,
                CURRENT_WORKPLACE,
                CURRENT_POSITION,
            ],
        }
    }

    pub fn term_column(self) -> &'static str {
        match self {
            SchemaKind::Banner => GRADUATION_TERM,
            SchemaKind::Alumni => ALUMNI_TERM,
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Banner => write!(f, "Banner"),
            SchemaKind::Alumni => write!(f, "Alumni"),
        }
    }
}

impl FromStr for SchemaKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "banner" => Ok(SchemaKind::Banner),
            "alumni" => Ok(SchemaKind::Alumni),
            other => Err(format!("unknown roster kind '{other}' (expected banner or alumni)")),
        }
    }
}

/// Columns that may be absent from an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionalColumn {
    Nationality,
    Industry,
    EmploymentType,
    Degree,
    PersonalEmail,
    PhoneNumber,
    Minor,
    Concentration,
    Gpa,
}

impl OptionalColumn {
    pub const ALL: [OptionalColumn; 9] = [
        OptionalColumn::Nationality,
        OptionalColumn::Industry,
        OptionalColumn::EmploymentType,
        OptionalColumn::Degree,
        OptionalColumn::PersonalEmail,
        OptionalColumn::PhoneNumber,
        OptionalColumn::Minor,
        OptionalColumn::Concentration,
        OptionalColumn::Gpa,
    ];

    pub fn header(self) -> &'static str {
        match self {
            OptionalColumn::Nationality => "Nationality",
            OptionalColumn::Industry => "Industry",
            OptionalColumn::EmploymentType => "Full Time or Part Time",
            OptionalColumn::Degree => "Degree",
            OptionalColumn::PersonalEmail => "Personal Email",
            OptionalColumn::PhoneNumber => "Phone Number",
            OptionalColumn::Minor => "Minor",
            OptionalColumn::Concentration => "Concentration",
            OptionalColumn::Gpa => "GPA",
        }
    }
}

/// Position of a column inside every record's `values`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef(usize);

impl ColumnRef {
    pub fn get<'a>(&self, record: &'a RosterRecord) -> &'a str {
        record.values.get(self.0).map(String::as_str).unwrap_or("")
    }
}

/// Reads an optional column, treating an absent column as blank cells.
pub fn cell_or_blank<'a>(column: Option<ColumnRef>, record: &'a RosterRecord) -> &'a str {
    column.map(|column| column.get(record)).unwrap_or("")
}

#[derive(Debug, Clone, PartialEq)]
pub struct RosterRecord {
    /// 1-based data row (the header is row 0).
    pub row: usize,
    pub student_id: String,
    pub college: String,
    pub term: String,
    pub gender: String,
    pub major: String,
    /// Canonical status; blank on Banner rosters.
    pub status: String,
    pub workplace: String,
    pub position: String,
    /// Every cell of the row, aligned with `Dataset::headers`.
    pub values: Vec<String>,
}

impl RosterRecord {
    pub fn is_graduate(&self, marker: char) -> bool {
        self.student_id.starts_with(marker)
    }

    pub fn degree_label(&self, marker: char) -> &'static str {
        if self.is_graduate(marker) {
            "Masters"
        } else {
            "Bachelors"
        }
    }
}

/// A validated upload. Never mutated once stored.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub kind: SchemaKind,
    pub source_name: String,
    pub headers: Vec<String>,
    pub records: Vec<RosterRecord>,
    /// Allow-list the upload's terms were validated against.
    pub graduation_terms: Vec<String>,
    pub loaded_at: DateTime<Utc>,
    columns: HashMap<String, usize>,
}

impl Dataset {
    pub fn new(
        kind: SchemaKind,
        source_name: impl Into<String>,
        headers: Vec<String>,
        records: Vec<RosterRecord>,
        graduation_terms: Vec<String>,
    ) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(index, header)| (header.clone(), index))
            .collect();
        Self {
            kind,
            source_name: source_name.into(),
            headers,
            records,
            graduation_terms,
            loaded_at: Utc::now(),
            columns,
        }
    }

    pub fn column(&self, name: &str) -> Option<ColumnRef> {
        self.columns.get(name).copied().map(ColumnRef)
    }

    pub fn optional(&self, column: OptionalColumn) -> Option<ColumnRef> {
        self.column(column.header())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeLevel {
    #[default]
    All,
    Bachelor,
    Master,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderFilter {
    #[default]
    All,
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NationalityFilter {
    #[default]
    All,
    Saudi,
    NonSaudi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportMode {
    #[default]
    Detailed,
    Simple,
}

impl FromStr for DegreeLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(DegreeLevel::All),
            "bachelor" => Ok(DegreeLevel::Bachelor),
            "master" => Ok(DegreeLevel::Master),
            other => Err(format!("unknown degree level '{other}'")),
        }
    }
}

impl fmt::Display for DegreeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegreeLevel::All => write!(f, "All"),
            DegreeLevel::Bachelor => write!(f, "Bachelor"),
            DegreeLevel::Master => write!(f, "Master"),
        }
    }
}

impl FromStr for GenderFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(GenderFilter::All),
            "male" => Ok(GenderFilter::Male),
            "female" => Ok(GenderFilter::Female),
            other => Err(format!("unknown gender option '{other}'")),
        }
    }
}

impl FromStr for NationalityFilter {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "all" => Ok(NationalityFilter::All),
            "saudi" => Ok(NationalityFilter::Saudi),
            "non-saudi" => Ok(NationalityFilter::NonSaudi),
            other => Err(format!("unknown nationality option '{other}'")),
        }
    }
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "detailed" => Ok(ReportMode::Detailed),
            "simple" => Ok(ReportMode::Simple),
            other => Err(format!("unknown report mode '{other}'")),
        }
    }
}

/// Conjunction of record predicates. Colleges and terms behave as sets; an
/// empty list matches nothing. Their order decides sheet order in reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterParams {
    pub colleges: Vec<String>,
    pub terms: Vec<String>,
    #[serde(default)]
    pub degree: DegreeLevel,
    #[serde(default)]
    pub gender: GenderFilter,
    #[serde(default)]
    pub nationality: NationalityFilter,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QaaOptions {
    pub combine_all: bool,
    pub combine_years: bool,
    pub mode: ReportMode,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Count(u64),
    Number(f64),
    Blank,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn render(&self) -> String {
        match self {
            Cell::Text(value) => value.clone(),
            Cell::Count(value) => value.to_string(),
            Cell::Number(value) => format!("{value:.2}"),
            Cell::Blank => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetNote {
    pub label: String,
    pub value: String,
}

/// One named output table handed to the workbook writer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub notes: Vec<SheetNote>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_columns(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn note(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.notes.push(SheetNote {
            label: label.into(),
            value: value.into(),
        });
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// First row whose leading cell is the given label.
    pub fn row_labelled(&self, label: &str) -> Option<&Vec<Cell>> {
        self.rows
            .iter()
            .find(|row| matches!(row.first(), Some(Cell::Text(value)) if value == label))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub sheets: Vec<Sheet>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|sheet| sheet.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FrequencyEntry {
    pub value: String,
    pub count: u64,
}
