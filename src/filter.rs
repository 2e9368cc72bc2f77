use std::collections::HashSet;

use tracing::{debug, warn};

use crate::models::{
    Dataset, DegreeLevel, FilterParams, GenderFilter, NationalityFilter, OptionalColumn,
    RosterRecord,
};
use crate::normalize::canonicalize_status;

/// Records that passed a filter, borrowed from the stored dataset.
#[derive(Debug, Clone)]
pub struct Selection<'a> {
    pub records: Vec<&'a RosterRecord>,
    pub warnings: Vec<String>,
}

impl Selection<'_> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Records whose trimmed college and term are both requested.
pub fn by_college_and_term<'a>(dataset: &'a Dataset, params: &FilterParams) -> Selection<'a> {
    let colleges: HashSet<&str> = params.colleges.iter().map(|c| c.trim()).collect();
    let terms: HashSet<&str> = params.terms.iter().map(|t| t.trim()).collect();

    let records = dataset
        .records
        .iter()
        .filter(|record| colleges.contains(record.college.as_str()))
        .filter(|record| terms.contains(record.term.as_str()))
        .collect();

    Selection {
        records,
        warnings: Vec::new(),
    }
}

pub fn by_degree(mut selection: Selection<'_>, degree: DegreeLevel, marker: char) -> Selection<'_> {
    match degree {
        DegreeLevel::All => {}
        DegreeLevel::Bachelor => selection.records.retain(|record| !record.is_graduate(marker)),
        DegreeLevel::Master => selection.records.retain(|record| record.is_graduate(marker)),
    }
    selection
}

pub fn by_gender(mut selection: Selection<'_>, gender: GenderFilter) -> Selection<'_> {
    let wanted = match gender {
        GenderFilter::All => return selection,
        GenderFilter::Male => "male",
        GenderFilter::Female => "female",
    };
    selection
        .records
        .retain(|record| record.gender.trim().to_lowercase() == wanted);
    selection
}

/// Keeps Saudi or non-Saudi records. Without a nationality column the filter
/// is skipped and a warning is attached instead.
pub fn by_nationality<'a>(
    dataset: &'a Dataset,
    mut selection: Selection<'a>,
    nationality: NationalityFilter,
    saudi_value: &str,
) -> Selection<'a> {
    if nationality == NationalityFilter::All {
        return selection;
    }
    let Some(column) = dataset.optional(OptionalColumn::Nationality) else {
        warn!("nationality column missing, nationality filter ignored");
        selection
            .warnings
            .push("Nationality column not found, nationality filter ignored".to_string());
        return selection;
    };
    let keep_saudi = nationality == NationalityFilter::Saudi;
    selection
        .records
        .retain(|record| (column.get(record).trim() == saudi_value) == keep_saudi);
    selection
}

/// Full conjunction of the record predicates.
pub fn apply<'a>(
    dataset: &'a Dataset,
    params: &FilterParams,
    marker: char,
    saudi_value: &str,
) -> Selection<'a> {
    let selection = by_college_and_term(dataset, params);
    let selection = by_degree(selection, params.degree, marker);
    let selection = by_gender(selection, params.gender);
    let selection = by_nationality(dataset, selection, params.nationality, saudi_value);
    debug!(
        matched = selection.len(),
        total = dataset.len(),
        "filtered roster records"
    );
    selection
}

/// Keeps records whose canonical status is one of `allowed` (canonicalized too).
pub fn by_status<'a>(mut selection: Selection<'a>, allowed: &[String]) -> Selection<'a> {
    let allowed: HashSet<String> = allowed.iter().map(|s| canonicalize_status(s)).collect();
    selection
        .records
        .retain(|record| allowed.contains(&record.status));
    selection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SchemaKind;

    const COB: &str = "College of Business";
    const COM: &str = "College of Medicine";
    const KSA: &str = "Saudi Arabia";

    fn record(
        row: usize,
        id: &str,
        college: &str,
        term: &str,
        gender: &str,
        status: &str,
        nationality: &str,
    ) -> RosterRecord {
        RosterRecord {
            row,
            student_id: id.to_string(),
            college: college.to_string(),
            term: term.to_string(),
            gender: gender.to_string(),
            major: "Finance".to_string(),
            status: status.to_string(),
            workplace: String::new(),
            position: String::new(),
            values: vec![id.to_string(), nationality.to_string()],
        }
    }

    fn dataset(with_nationality: bool) -> Dataset {
        let headers = if with_nationality {
            vec!["Student ID".to_string(), "Nationality".to_string()]
        } else {
            vec!["Student ID".to_string(), "Passport".to_string()]
        };
        let records = vec![
            record(1, "201400001", COB, "2014-2015 FALL", "Male", "Employed", KSA),
            record(2, "G201400002", COB, "2014-2015 FALL", " female ", "Studying", "Egypt"),
            record(3, "201400003", COM, "2014-2015 Spring", "MALE", "Unemployed", KSA),
            record(4, "G201400004", COM, "2015-2016 FALL", "Female", "Employed", " Saudi Arabia "),
        ];
        Dataset::new(SchemaKind::Alumni, "test.csv", headers, records, Vec::new())
    }

    fn params(colleges: &[&str], terms: &[&str]) -> FilterParams {
        FilterParams {
            colleges: colleges.iter().map(|c| c.to_string()).collect(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
            ..FilterParams::default()
        }
    }

    fn rows(selection: &Selection<'_>) -> Vec<usize> {
        selection.records.iter().map(|record| record.row).collect()
    }

    #[test]
    fn empty_college_or_term_sets_match_nothing() {
        let data = dataset(true);
        assert!(apply(&data, &params(&[], &["2014-2015 FALL"]), 'G', "Saudi Arabia").is_empty());
        assert!(apply(&data, &params(&[COB], &[]), 'G', KSA).is_empty());
    }

    #[test]
    fn college_and_term_are_set_membership() {
        let data = dataset(true);
        let selection = apply(
            &data,
            &params(&[COM, COB], &["2014-2015 FALL", "2014-2015 Spring"]),
            'G',
            "Saudi Arabia",
        );
        assert_eq!(rows(&selection), vec![1, 2, 3]);
    }

    #[test]
    fn degree_level_uses_the_graduate_marker() {
        let data = dataset(true);
        let mut filter = params(&[COM, COB], &["2014-2015 FALL", "2015-2016 FALL"]);
        filter.degree = DegreeLevel::Master;
        assert_eq!(rows(&apply(&data, &filter, 'G', "Saudi Arabia")), vec![2, 4]);
        filter.degree = DegreeLevel::Bachelor;
        assert_eq!(rows(&apply(&data, &filter, 'G', "Saudi Arabia")), vec![1]);
    }

    #[test]
    fn gender_is_case_insensitive_after_trimming() {
        let data = dataset(true);
        let mut filter = params(
            &["College of Medicine", "College of Business"],
            &["2014-2015 FALL", "2014-2015 Spring", "2015-2016 FALL"],
        );
        filter.gender = GenderFilter::Female;
        assert_eq!(rows(&apply(&data, &filter, 'G', "Saudi Arabia")), vec![2, 4]);
        filter.gender = GenderFilter::Male;
        assert_eq!(rows(&apply(&data, &filter, 'G', "Saudi Arabia")), vec![1, 3]);
    }

    #[test]
    fn nationality_splits_saudi_and_complement() {
        let data = dataset(true);
        let mut filter = params(
            &["College of Medicine", "College of Business"],
            &["2014-2015 FALL", "2014-2015 Spring", "2015-2016 FALL"],
        );
        filter.nationality = NationalityFilter::Saudi;
        assert_eq!(rows(&apply(&data, &filter, 'G', "Saudi Arabia")), vec![1, 3, 4]);
        filter.nationality = NationalityFilter::NonSaudi;
        assert_eq!(rows(&apply(&data, &filter, 'G', "Saudi Arabia")), vec![2]);
    }

    #[test]
    fn missing_nationality_column_is_a_warning() {
        let data = dataset(false);
        let mut filter = params(&["College of Business"], &["2014-2015 FALL"]);
        filter.nationality = NationalityFilter::Saudi;
        let selection = apply(&data, &filter, 'G', "Saudi Arabia");
        assert_eq!(selection.len(), 2);
        assert_eq!(selection.warnings.len(), 1);
    }

    #[test]
    fn status_filter_canonicalizes_requested_values() {
        let data = dataset(true);
        let selection = apply(
            &data,
            &params(&[COM, COB], &["2014-2015 FALL", "2014-2015 Spring"]),
            'G',
            "Saudi Arabia",
        );
        let selection = by_status(selection, &["  EMPLOYED".to_string(), "studying".to_string()]);
        assert_eq!(rows(&selection), vec![1, 2]);
    }
}
