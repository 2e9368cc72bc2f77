use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Every lookup table and constant the engine depends on.
///
/// `Default` carries the built-in tables; a TOML file only needs to list the
/// sections it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub default_graduation_terms: Vec<String>,
    /// Leading character of a graduate-degree student identifier.
    pub graduate_marker: char,
    pub saudi_nationality: String,
    pub retention_hours: i64,
    pub colleges: Vec<CollegeConfig>,
    pub statuses: StatusConfig,
    pub companies: CompanyTables,
    pub titles: TitleTables,
    pub banner_field_map: Vec<FieldMapping>,
    pub limits: ReportLimits,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollegeConfig {
    pub name: String,
    pub abbreviation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub canonical: Vec<String>,
    pub employed: Vec<String>,
    pub unemployed: String,
    pub studying: String,
    pub new_graduate: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmptyCategory {
    pub category: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyAlias {
    pub alias: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainsRule {
    pub all_of: Vec<String>,
    pub canonical: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyTables {
    pub strip_words: Vec<String>,
    pub empty_categories: Vec<EmptyCategory>,
    pub aliases: Vec<CompanyAlias>,
    pub contains_rules: Vec<ContainsRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TitleRule {
    pub keyword: String,
    pub canonical: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleTables {
    pub placeholders: Vec<String>,
    /// Keywords that only count when a context word is also present.
    pub contextual_keywords: Vec<String>,
    pub context_words: Vec<String>,
    /// Scanned in order; the first matching keyword wins.
    pub rules: Vec<TitleRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub banner: String,
    pub alumni: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLimits {
    pub top_employers: usize,
    pub top_high_positions: usize,
    pub top_positions: usize,
    pub top_nationalities: usize,
    pub top_industries: usize,
    pub preview_statuses: usize,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        let colleges = [
            ("College of Engineering & Advan", "CoE"),
            ("College of Business", "CoB"),
            ("College of Science & General S", "CoS"),
            ("College of Medicine", "CoM"),
            ("College of Pharmacy", "CoP"),
        ]
        .iter()
        .map(|(name, abbreviation)| CollegeConfig {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
        })
        .collect();

        Self {
            colleges,
            statuses: StatusConfig::default(),
            default_graduation_terms: default_graduation_terms(),
            graduate_marker: 'G',
            saudi_nationality: "Saudi Arabia".to_string(),
            retention_hours: 24,
            companies: CompanyTables::default(),
            titles: TitleTables::default(),
            banner_field_map: default_banner_field_map(),
            limits: ReportLimits::default(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            canonical: strings(&[
                "Employed",
                "Employed - add to list",
                "Business owner",
                "Training",
                "Do not contact",
                "Others",
                "Left the country",
                "Passed away",
                "Unemployed",
                "Studying",
                "New graduate",
            ]),
            employed: strings(&[
                "Employed",
                "Employed - add to list",
                "Business owner",
                "Training",
                "Do not contact",
                "Others",
                "Left the country",
                "Passed away",
                "New graduate",
            ]),
            unemployed: "Unemployed".to_string(),
            studying: "Studying".to_string(),
            new_graduate: "New graduate".to_string(),
        }
    }
}

impl Default for CompanyTables {
    fn default() -> Self {
        let empty_categories = vec![
            EmptyCategory {
                category: "COMPLETELY EMPTY".to_string(),
                values: strings(&["", "-", ".", " ", "...", "*", "#", "//"]),
            },
            EmptyCategory {
                category: "PLACEHOLDER".to_string(),
                values: strings(&[
                    "#N/A",
                    "N/A",
                    "NA",
                    "N.A.",
                    "N/A.",
                    "NONE",
                    "NIL",
                    "NOT APPLICABLE",
                    "NOT AVAILABLE",
                    "UNKNOWN",
                ]),
            },
            EmptyCategory {
                category: "CONFIDENTIAL".to_string(),
                values: strings(&[
                    "CONFIDENTIAL",
                    "CONFIDENTIAL GOVERNMENT",
                    "GOVERNMENT",
                    "GOVERNMENT SECTOR",
                    "CONFIDENTIAL (STEALTH MODE)",
                    "CONFIDENTIAL ( STEALTH MODE )",
                    "CONFIDENTIAL COMPANY",
                    "CANNOT DISCLOSE",
                    "UNDISCLOSED",
                ]),
            },
            EmptyCategory {
                category: "OTHERS".to_string(),
                values: strings(&[
                    "OTHERS",
                    "OTHER",
                    "MISC",
                    "MISCELLANEOUS",
                    "TBD",
                    "TO BE DETERMINED",
                    "PENDING",
                ]),
            },
            EmptyCategory {
                category: "NOT WORKING".to_string(),
                values: strings(&[
                    "NOT WORKING",
                    "UNEMPLOYED",
                    "NO JOB",
                    "NO WORK",
                    "LOOKING FOR JOB",
                    "SEEKING EMPLOYMENT",
                ]),
            },
        ];

        let aliases = [
            // Banks
            ("SNB", "SAUDI NATIONAL BANK"),
            ("SNB CAPITAL", "SAUDI NATIONAL BANK"),
            ("THE SAUDI NATIONAL BANK", "SAUDI NATIONAL BANK"),
            ("NCB", "SAUDI NATIONAL BANK"),
            ("BSF", "BANQUE SAUDI FRANSI"),
            ("BANQUE SAUDI FRANSI CAPITAL", "BANQUE SAUDI FRANSI"),
            ("FRANSI CAPITAL", "BANQUE SAUDI FRANSI"),
            ("SAB", "SAUDI BRITISH BANK"),
            ("SABB", "SAUDI BRITISH BANK"),
            ("BANK SAB", "SAUDI BRITISH BANK"),
            // Government and PIF entities
            ("PIF", "PUBLIC INVESTMENT FUND"),
            ("PUBLIC INVESTMENT FUND - PIF", "PUBLIC INVESTMENT FUND"),
            ("SAMA", "SAUDI CENTRAL BANK"),
            ("SAUDI CENTRAL BANK - SAMA", "SAUDI CENTRAL BANK"),
            ("SIDF", "SAUDI INDUSTRIAL DEVELOPMENT FUND"),
            (
                "SAUDI INDUSTRIAL DEVELOPMENT FUND - SIDF",
                "SAUDI INDUSTRIAL DEVELOPMENT FUND",
            ),
            // Consulting
            ("BCG", "BOSTON CONSULTING GROUP"),
            ("BOSTON CONSULTING GROUP (BCG)", "BOSTON CONSULTING GROUP"),
            ("EY", "ERNST & YOUNG"),
            ("ERNST & YOUNG (EY)", "ERNST & YOUNG"),
            ("PWC", "PRICEWATERHOUSECOOPERS"),
            // Healthcare
            ("KFSH&RC", "KING FAISAL SPECIALIST HOSPITAL & RESEARCH CENTER"),
            ("KFSHRC", "KING FAISAL SPECIALIST HOSPITAL & RESEARCH CENTER"),
            ("KFSH", "KING FAISAL SPECIALIST HOSPITAL & RESEARCH CENTER"),
            (
                "KING FAISAL SPECIALIST HOSPITAL",
                "KING FAISAL SPECIALIST HOSPITAL & RESEARCH CENTER",
            ),
            ("HABIB", "DR. SULAIMAN AL HABIB MEDICAL GROUP"),
            ("DR. SULAIMAN AL HABIB", "DR. SULAIMAN AL HABIB MEDICAL GROUP"),
            // Technology
            ("STC", "SAUDI TELECOM COMPANY"),
            ("SAUDI TELECOM", "SAUDI TELECOM COMPANY"),
            ("HPE", "HEWLETT PACKARD ENTERPRISE"),
            ("HEWLETT PACKARD ENTERPRISE - HPE", "HEWLETT PACKARD ENTERPRISE"),
            // Common variations
            ("ARAMCO", "SAUDI ARAMCO"),
            ("SABIC", "SAUDI BASIC INDUSTRIES CORPORATION"),
            ("MINISTRY OF HEALTH", "MINISTRY OF HEALTH"),
        ]
        .iter()
        .map(|(alias, canonical)| CompanyAlias {
            alias: alias.to_string(),
            canonical: canonical.to_string(),
        })
        .collect();

        Self {
            empty_categories,
            aliases,
            strip_words: strings(&[
                "LTD",
                "LIMITED",
                "CORPORATION",
                "CORP",
                "INC",
                "LLC",
                "CO",
                "COMPANY",
                "GROUP",
                "HOLDING",
                "HOLDINGS",
                "INTERNATIONAL",
                "SAUDI ARABIA",
                "KSA",
                "MIDDLE EAST",
            ]),
            contains_rules: vec![
                ContainsRule {
                    all_of: strings(&["NATIONAL GUARD", "HEALTH"]),
                    canonical: "MINISTRY OF NATIONAL GUARD HEALTH AFFAIRS".to_string(),
                },
                ContainsRule {
                    all_of: strings(&["KING FAHAD MEDICAL"]),
                    canonical: "KING FAHAD MEDICAL CITY".to_string(),
                },
            ],
        }
    }
}

impl Default for TitleTables {
    fn default() -> Self {
        let rules = [
            // C-suite
            ("CEO", "CHIEF EXECUTIVE OFFICER"),
            ("CHIEF EXECUTIVE OFFICER", "CHIEF EXECUTIVE OFFICER"),
            ("PRESIDENT", "PRESIDENT"),
            ("CFO", "CHIEF FINANCIAL OFFICER"),
            ("CHIEF FINANCIAL OFFICER", "CHIEF FINANCIAL OFFICER"),
            ("CTO", "CHIEF TECHNOLOGY OFFICER"),
            ("CHIEF TECHNOLOGY OFFICER", "CHIEF TECHNOLOGY OFFICER"),
            ("CIO", "CHIEF INFORMATION OFFICER"),
            ("CHIEF INFORMATION OFFICER", "CHIEF INFORMATION OFFICER"),
            ("COO", "CHIEF OPERATING OFFICER"),
            ("CHIEF OPERATING OFFICER", "CHIEF OPERATING OFFICER"),
            ("CMO", "CHIEF MARKETING OFFICER"),
            ("CHIEF MARKETING OFFICER", "CHIEF MARKETING OFFICER"),
            ("CHIEF", "CHIEF"),
            // Directors
            ("DIRECTOR", "DIRECTOR"),
            ("EXECUTIVE DIRECTOR", "EXECUTIVE DIRECTOR"),
            ("MANAGING DIRECTOR", "MANAGING DIRECTOR"),
            ("BOARD MEMBER", "BOARD MEMBER"),
            // Vice presidents
            ("VP", "VICE PRESIDENT"),
            ("VICE PRESIDENT", "VICE PRESIDENT"),
            ("SVP", "SENIOR VICE PRESIDENT"),
            ("SENIOR VICE PRESIDENT", "SENIOR VICE PRESIDENT"),
            ("EVP", "EXECUTIVE VICE PRESIDENT"),
            ("EXECUTIVE VICE PRESIDENT", "EXECUTIVE VICE PRESIDENT"),
            // Heads
            ("HEAD", "HEAD"),
            ("DEPARTMENT HEAD", "DEPARTMENT HEAD"),
            ("DIVISION HEAD", "DIVISION HEAD"),
            // Senior management
            ("GENERAL MANAGER", "GENERAL MANAGER"),
            ("PARTNER", "PARTNER"),
            ("SENIOR MANAGER", "SENIOR MANAGER"),
            ("PRINCIPAL", "PRINCIPAL"),
            // Founders
            ("FOUNDER", "FOUNDER"),
            ("CO-FOUNDER", "CO-FOUNDER"),
            ("OWNER", "OWNER"),
        ]
        .iter()
        .map(|(keyword, canonical)| TitleRule {
            keyword: keyword.to_string(),
            canonical: canonical.to_string(),
        })
        .collect();

        Self {
            placeholders: strings(&["-", "N/A", "NA", "NONE", "NOT APPLICABLE", "UNKNOWN"]),
            rules,
            contextual_keywords: strings(&["HEAD", "CHIEF", "OWNER"]),
            context_words: strings(&["OF", "DEPARTMENT", "DIVISION", "TEAM"]),
        }
    }
}

impl Default for ReportLimits {
    fn default() -> Self {
        Self {
            top_employers: 10,
            top_high_positions: 20,
            top_positions: 10,
            top_nationalities: 5,
            top_industries: 5,
            preview_statuses: 10,
        }
    }
}

fn default_graduation_terms() -> Vec<String> {
    let mut terms = Vec::new();
    for start in 2010..2024 {
        let year = format!("{}-{}", start, start + 1);
        if start >= 2012 {
            terms.push(format!("{year} FALL"));
        }
        terms.push(format!("{year} Spring"));
        terms.push(format!("{year} Summer"));
    }
    terms.push("2024-2025 FALL".to_string());
    terms
}

fn default_banner_field_map() -> Vec<FieldMapping> {
    [
        ("Graduation Term", "Year/Semester of Graduation"),
        ("Student ID", "Student ID"),
        ("Student Name", "Student Name"),
        ("College", "College"),
        ("Degree", "Degree"),
        ("Major", "Major"),
        ("Minor", "Minor"),
        ("Concentration", "Concentration"),
        ("Nationality", "Nationality"),
        ("SSN", "SSN"),
        ("Gender", "Gender"),
        ("Alfaisal Email", "Alfaisal Email"),
        ("Personal Email", "Personal Email"),
        ("Phone Number", "Phone Number"),
        ("Joined AU", "Joining date"),
        ("CGPA", "GPA"),
    ]
    .iter()
    .map(|(banner, alumni)| FieldMapping {
        banner: banner.to_string(),
        alumni: alumni.to_string(),
    })
    .collect()
}

impl EngineConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn college_names(&self) -> Vec<String> {
        self.colleges.iter().map(|college| college.name.clone()).collect()
    }

    /// Sheet label for a college: its abbreviation, or the name cut to `max_len`.
    pub fn college_label(&self, college: &str, max_len: usize) -> String {
        self.colleges
            .iter()
            .find(|entry| entry.name == college.trim())
            .map(|entry| entry.abbreviation.clone())
            .unwrap_or_else(|| college.chars().take(max_len).collect())
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::hours(self.retention_hours.max(0))
    }
}
