use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use alumni_outcomes::loader::read_csv_path;
use alumni_outcomes::models::{Cell, OptionalColumn};
use alumni_outcomes::{
    EngineConfig, EngineError, FilterParams, QaaOptions, ReportMode, ReportService, SchemaKind,
    SessionId,
};
use chrono::NaiveDate;
use tempfile::TempDir;

const TERMS: [&str; 3] = ["2014-2015 FALL", "2014-2015 Spring", "2014-2015 Summer"];
const STATUSES: [&str; 4] = ["Employed", "Unemployed", "Studying", "Business owner"];

const COLLEGES: [(&str, usize, usize); 5] = [
    ("College of Engineering & Advan", 45, 25),
    ("College of Business", 40, 35),
    ("College of Science & General S", 37, 23),
    ("College of Medicine", 25, 5),
    ("College of Pharmacy", 15, 1),
];

/// 251 alumni of the 2014-2015 academic year: 162 gentlemen and 89 ladies.
fn cohort_csv() -> String {
    let mut csv = String::from(
        "Student ID,Student Name,College,Year/Semester of Graduation,Current Status,Gender,Major,Current Workplace,Current Position,Nationality\n",
    );
    let mut n = 0;
    for (college, male, female) in COLLEGES {
        for index in 0..male + female {
            n += 1;
            let gender = if index < male { "Male" } else { "Female" };
            let nationality = if n % 3 == 0 { "Egypt" } else { "Saudi Arabia" };
            let id = if n % 10 == 0 {
                format!("G2014{n:05}")
            } else {
                format!("2014{n:05}")
            };
            let _ = writeln!(
                csv,
                "{id},Graduate {n},{college},{},{},{gender},Major {},SNB,Analyst,{nationality}",
                TERMS[n % 3],
                STATUSES[n % 4],
                n % 2
            );
        }
    }
    csv
}

fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn upload(service: &mut ReportService, path: &Path) -> SessionId {
    let table = read_csv_path(path).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    service.upload(table, None, &name).unwrap().session
}

fn all_of(service: &ReportService) -> FilterParams {
    FilterParams {
        colleges: service.engine().config().college_names(),
        terms: TERMS.iter().map(|term| term.to_string()).collect(),
        ..FilterParams::default()
    }
}

fn count(cell: &Cell) -> u64 {
    match cell {
        Cell::Count(value) => *value,
        other => panic!("expected a count, got {other:?}"),
    }
}

#[test]
fn simple_mode_counts_the_whole_cohort() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "alumni.csv", &cohort_csv());
    let mut service = ReportService::in_memory(EngineConfig::default()).unwrap();
    let session = upload(&mut service, &path);

    let options = QaaOptions {
        mode: ReportMode::Simple,
        ..QaaOptions::default()
    };
    let params = all_of(&service);
    let report = service
        .generate_qaa_report(&session, &params, options)
        .unwrap();

    let year = report.sheet("2014_2015").unwrap();
    assert_eq!(year.rows.len(), 6);
    let total = year.row_labelled("TOTAL").unwrap();
    assert_eq!(count(&total[1]), 251);
    assert_eq!(count(&total[2]), 162);
    assert_eq!(count(&total[3]), 89);

    let medicine = year.row_labelled("College of Medicine").unwrap();
    assert_eq!(count(&medicine[1]), 30);
    assert_eq!(count(&medicine[3]), 5);

    let all_years = report.sheet("All years summary").unwrap();
    let graduates = all_years.row_labelled("Total of Graduates").unwrap();
    assert_eq!(count(&graduates[1]), 251);
    assert_eq!(count(&graduates[4]) + count(&graduates[5]), 251);
    assert!(report.warnings.is_empty());
}

#[test]
fn detailed_report_covers_every_record_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "alumni.csv", &cohort_csv());
    let mut service = ReportService::in_memory(EngineConfig::default()).unwrap();
    let session = upload(&mut service, &path);

    let params = all_of(&service);
    let combined = service
        .generate_qaa_report(
            &session,
            &params,
            QaaOptions {
                combine_all: true,
                ..QaaOptions::default()
            },
        )
        .unwrap();
    let sheet = combined.sheet("Combined_Report").unwrap();
    let total = sheet.column_index("Total").unwrap();
    let overall = sheet.row_labelled("Overall Total").unwrap();
    assert_eq!(count(&overall[total]), 251);

    let per_term = service
        .generate_qaa_report(&session, &params, QaaOptions::default())
        .unwrap();
    let term_sheets: Vec<_> = per_term
        .sheets
        .iter()
        .filter(|sheet| sheet.name != "Gender_Nationality_Breakdown")
        .collect();
    assert_eq!(term_sheets.len(), 15);
    let sum: u64 = term_sheets
        .iter()
        .map(|sheet| {
            let total = sheet.column_index("Total").unwrap();
            count(&sheet.row_labelled("Overall Total").unwrap()[total])
        })
        .sum();
    assert_eq!(sum, 251);
    assert!(term_sheets.iter().all(|sheet| sheet.name.chars().count() <= 31));
}

#[test]
fn workplace_report_normalizes_employers() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(&dir, "alumni.csv", &cohort_csv());
    let mut service = ReportService::in_memory(EngineConfig::default()).unwrap();
    let session = upload(&mut service, &path);

    let params = all_of(&service);
    let report = service.generate_workplace_report(&session, &params).unwrap();
    let employers = report.sheet("Top Employers").unwrap();
    assert_eq!(employers.rows.len(), 1);
    assert_eq!(employers.rows[0][0].render(), "SAUDI NATIONAL BANK");
    assert_eq!(count(&employers.rows[0][1]), 251);
    assert!(report.sheet("Top Positions").unwrap().rows.is_empty());
}

#[test]
fn banner_graduates_are_merged_into_the_alumni_roster() {
    let dir = tempfile::tempdir().unwrap();
    let alumni = write(
        &dir,
        "alumni.csv",
        "\
Student ID,Student Name,College,Year/Semester of Graduation,Current Status,Gender,Major,Current Workplace,Current Position,GPA,Comments
201400001,Avery Lee,College of Business,2014-2015 FALL,Employed,Male,Finance,SNB,Analyst,3.4,
201400002,Kiara Patel,College of Medicine,2014-2015 FALL,Studying,Female,Surgery,,,3.8,
",
    );
    let banner = write(
        &dir,
        "banner.csv",
        "\
Student ID,Student Name,College,Graduation Term,Major,Gender,CGPA
201400001,Avery Lee,College of Business,2014-2015 FALL,Finance,Male,3.4
201400003,Jules Moreno,College of Pharmacy,2014-2015 Spring,Pharmacy,Male,3.1
201400004,Rana Saleh,College of Medicine,2014-2015 Summer,Surgery,Female,3.6
",
    );

    let mut service = ReportService::in_memory(EngineConfig::default()).unwrap();
    let alumni_session = upload(&mut service, &alumni);
    let banner_session = upload(&mut service, &banner);
    let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

    let report = service
        .generate_banner_diff_on(&banner_session, &alumni_session, today)
        .unwrap();
    let merged = report.sheet("Updated Alumni List").unwrap();
    assert_eq!(merged.rows.len(), 4);
    let status = merged.column_index("Current Status").unwrap();
    let gpa = merged.column_index("GPA").unwrap();
    let comments = merged.column_index("Comments").unwrap();
    assert_eq!(merged.rows[2][0].render(), "201400003");
    assert_eq!(merged.rows[2][status].render(), "New graduate");
    assert_eq!(merged.rows[2][gpa].render(), "3.1");
    assert_eq!(merged.rows[3][comments].render(), "Added from Banner on 2026-10-16");

    let added = report.sheet("New Graduates").unwrap();
    let names: Vec<String> = added.rows.iter().map(|row| row[1].render()).collect();
    assert_eq!(names, vec!["Jules Moreno", "Rana Saleh"]);

    let err = service
        .generate_banner_diff_on(&alumni_session, &banner_session, today)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::WrongSchema {
            expected: SchemaKind::Banner,
            ..
        }
    ));
}

#[test]
fn invalid_uploads_are_rejected_with_the_missing_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        &dir,
        "partial.csv",
        "Student ID,College,Gender\n201400001,College of Business,Male\n",
    );
    let mut service = ReportService::in_memory(EngineConfig::default()).unwrap();
    let table = read_csv_path(&path).unwrap();
    let err = service.upload(table, None, "partial.csv").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("Missing required columns: "));
    assert!(message.contains("Year/Semester of Graduation"));
}

#[test]
fn configuration_file_overrides_the_distinguished_nationality() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("engine.toml");
    fs::write(&config_path, "saudi_nationality = \"Egypt\"\n").unwrap();
    let config = EngineConfig::load_from_file(&config_path).unwrap();

    let path = write(&dir, "alumni.csv", &cohort_csv());
    let mut service = ReportService::in_memory(config).unwrap();
    let session = upload(&mut service, &path);
    assert!(service
        .dataset(&session)
        .unwrap()
        .optional(OptionalColumn::Nationality)
        .is_some());

    let params = all_of(&service);
    let report = service
        .generate_qaa_report(
            &session,
            &params,
            QaaOptions {
                mode: ReportMode::Simple,
                ..QaaOptions::default()
            },
        )
        .unwrap();
    let graduates = report
        .sheet("All years summary")
        .unwrap()
        .row_labelled("Total of Graduates")
        .unwrap();
    // every third graduate is Egyptian
    assert_eq!(count(&graduates[4]), 83);
}
