//! Canonical forms for the free-text roster fields: status labels, employer
//! names and graduation terms.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{CompanyTables, ContainsRule};

pub const UNKNOWN_STATUS: &str = "Unknown";
pub const UNKNOWN_YEAR: &str = "Unknown";
pub const EMPTY_PREFIX: &str = "EMPTY";

/// Trim, lowercase, then uppercase the first character only.
pub fn canonicalize_status(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut chars = lowered.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Status of a cell that may be missing altogether.
pub fn status_or_unknown(raw: Option<&str>) -> String {
    raw.map(canonicalize_status)
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string())
}

static FULL_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})-([0-9]{4})").expect("static pattern"));
static SHORT_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})-([0-9]{2})").expect("static pattern"));
static SINGLE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([0-9]{4})").expect("static pattern"));

/// Academic year ("2013-2014") a graduation term belongs to.
///
/// A lone year is read as the year the academic year ends in.
pub fn extract_academic_year(term: &str) -> String {
    if let Some(caps) = FULL_YEAR.captures(term) {
        return format!("{}-{}", &caps[1], &caps[2]);
    }
    if let Some(caps) = SHORT_YEAR.captures(term) {
        return format!("{}-20{}", &caps[1], &caps[2]);
    }
    if let Some(caps) = SINGLE_YEAR.captures(term) {
        if let Ok(year) = caps[1].parse::<i32>() {
            return format!("{}-{}", year - 1, year);
        }
    }
    UNKNOWN_YEAR.to_string()
}

/// True for the `EMPTY (...)` sentinels only; employers whose name merely
/// starts with "EMPTY" stay valid.
pub fn is_empty_marker(normalized: &str) -> bool {
    normalized == EMPTY_PREFIX
        || normalized
            .strip_prefix(EMPTY_PREFIX)
            .is_some_and(|rest| rest.starts_with(" ("))
}

/// Maps noisy employer names onto one spelling per organisation.
///
/// Results are fixed points: feeding a normalized name back in returns it
/// unchanged.
#[derive(Debug, Clone)]
pub struct CompanyNormalizer {
    empty_values: HashMap<String, String>,
    aliases: HashMap<String, String>,
    strip_words: Vec<Vec<String>>,
    contains_rules: Vec<ContainsRule>,
}

impl CompanyNormalizer {
    pub fn new(tables: &CompanyTables) -> Self {
        let mut empty_values = HashMap::new();
        for category in &tables.empty_categories {
            for value in &category.values {
                empty_values
                    .entry(value.to_uppercase())
                    .or_insert_with(|| format!("{EMPTY_PREFIX} ({})", category.category));
            }
        }

        let mut aliases: HashMap<String, String> = tables
            .aliases
            .iter()
            .map(|alias| (alias.alias.trim().to_uppercase(), alias.canonical.clone()))
            .collect();
        let canonical_names = tables
            .aliases
            .iter()
            .map(|alias| alias.canonical.clone())
            .chain(tables.contains_rules.iter().map(|rule| rule.canonical.clone()));
        for canonical in canonical_names {
            aliases.entry(canonical.clone()).or_insert(canonical);
        }

        let strip_words = tables
            .strip_words
            .iter()
            .map(|word| {
                word.split_whitespace()
                    .map(str::to_uppercase)
                    .collect::<Vec<_>>()
            })
            .filter(|tokens| !tokens.is_empty())
            .collect();

        Self {
            empty_values,
            aliases,
            strip_words,
            contains_rules: tables.contains_rules.clone(),
        }
    }

    pub fn normalize(&self, raw: Option<&str>) -> String {
        let Some(raw) = raw else {
            return format!("{EMPTY_PREFIX} (NULL)");
        };
        let name = raw.trim().to_uppercase();
        if let Some(known) = self.lookup(&name) {
            return known;
        }

        let stripped = self.strip_generic_words(&name);
        if let Some(rule) = self.contains_rules.iter().find(|rule| {
            rule.all_of
                .iter()
                .all(|needle| stripped.contains(needle.as_str()))
        }) {
            return rule.canonical.clone();
        }
        if let Some(known) = self.lookup(&stripped) {
            return known;
        }
        stripped
    }

    fn lookup(&self, name: &str) -> Option<String> {
        self.empty_values
            .get(name)
            .or_else(|| self.aliases.get(name))
            .cloned()
    }

    /// Drops generic corporate words wherever they follow another token.
    fn strip_generic_words(&self, name: &str) -> String {
        let mut tokens: Vec<&str> = name.split_whitespace().collect();
        loop {
            let before = tokens.len();
            for phrase in &self.strip_words {
                let mut index = 1;
                while index + phrase.len() <= tokens.len() {
                    let window = &tokens[index..index + phrase.len()];
                    if window.iter().zip(phrase).all(|(token, word)| *token == word) {
                        tokens.drain(index..index + phrase.len());
                    } else {
                        index += 1;
                    }
                }
            }
            if tokens.len() == before {
                break;
            }
        }
        tokens.join(" ")
    }
}
