use std::collections::HashMap;

use regex::Regex;

use crate::config::TitleTables;

struct TitlePattern {
    pattern: Regex,
    canonical: String,
    needs_context: bool,
}

/// Flags leadership job titles and maps them to one canonical spelling.
pub struct TitleClassifier {
    placeholders: Vec<String>,
    exact: HashMap<String, String>,
    patterns: Vec<TitlePattern>,
    /// Matched as plain substrings of the uppercased title.
    context: Vec<String>,
}

impl TitleClassifier {
    pub fn new(tables: &TitleTables) -> Result<Self, regex::Error> {
        let mut exact = HashMap::new();
        let mut patterns = Vec::with_capacity(tables.rules.len());
        for rule in &tables.rules {
            let keyword = rule.keyword.trim().to_uppercase();
            exact
                .entry(keyword.clone())
                .or_insert_with(|| rule.canonical.clone());
            patterns.push(TitlePattern {
                pattern: Regex::new(&format!(r"\b{}\b", regex::escape(&keyword)))?,
                canonical: rule.canonical.clone(),
                needs_context: tables
                    .contextual_keywords
                    .iter()
                    .any(|word| word.eq_ignore_ascii_case(&keyword)),
            });
        }

        let context = tables
            .context_words
            .iter()
            .map(|word| word.trim().to_uppercase())
            .filter(|word| !word.is_empty())
            .collect();

        Ok(Self {
            placeholders: tables
                .placeholders
                .iter()
                .map(|value| value.to_uppercase())
                .collect(),
            exact,
            patterns,
            context,
        })
    }

    /// Canonical leadership title, or `None` when the title is not senior.
    pub fn classify(&self, raw: Option<&str>) -> Option<String> {
        let title = raw?.trim().to_uppercase();
        if title.is_empty() || self.placeholders.contains(&title) {
            return None;
        }
        if let Some(canonical) = self.exact.get(&title) {
            return Some(canonical.clone());
        }

        let has_context = self.context.iter().any(|word| title.contains(word.as_str()));
        self.patterns
            .iter()
            .filter(|entry| entry.pattern.is_match(&title))
            .find(|entry| !entry.needs_context || has_context)
            .map(|entry| entry.canonical.clone())
    }
}
