//! Subject groups: a read-only lookup from two-digit CIP series to a
//! human-readable category.

use std::collections::BTreeMap;

use crate::cip::series_prefix;

/// Name of the catch-all group for series absent from the table.
pub const OTHER_GROUP: &str = "Other";

/// Built-in series table.
pub static CIP_GROUPS: &[(&str, &str)] = &[
    ("01", "Agriculture"),
    ("03", "Natural Resources"),
    ("04", "Architecture"),
    ("05", "Area/Ethnic/Gender Studies"),
    ("09", "Communication/Journalism"),
    ("10", "Communications Technologies"),
    ("11", "Computer Sciences"),
    ("12", "Personal/Culinary Services"),
    ("13", "Education"),
    ("14", "Engineering"),
    ("15", "Engineering Technologies"),
    ("16", "Foreign Languages"),
    ("19", "Family/Consumer Sciences"),
    ("22", "Legal Professions"),
    ("23", "English Language/Literature"),
    ("24", "Liberal Arts/Humanities"),
    ("25", "Library Science"),
    ("26", "Biological/Biomedical Sciences"),
    ("27", "Mathematics/Statistics"),
    ("28", "Military Science"),
    ("29", "Military Technologies"),
    ("30", "Multi/Interdisciplinary Studies"),
    ("31", "Parks/Recreation/Leisure/Fitness"),
    ("38", "Philosophy/Religion"),
    ("39", "Theology/Religious Vocations"),
    ("40", "Physical Sciences"),
    ("41", "Science Technologies"),
    ("42", "Psychology"),
    ("43", "Homeland Security/Law Enforcement"),
    ("44", "Public Administration/Social Service"),
    ("45", "Social Sciences"),
    ("46", "Construction Trades"),
    ("47", "Mechanic/Repair Technologies"),
    ("48", "Precision Production"),
    ("49", "Transportation/Materials Moving"),
    ("50", "Visual and Performing Arts"),
    ("51", "Health Professions"),
    ("52", "Business/Marketing"),
    ("54", "History"),
    ("60", "Residency Programs"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectGroups {
    entries: BTreeMap<String, String>,
}

impl Default for SubjectGroups {
    fn default() -> Self {
        Self::from_entries(
            CIP_GROUPS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        )
    }
}

impl SubjectGroups {
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Group name for a two-digit series, or [`OTHER_GROUP`].
    pub fn name(&self, series: &str) -> &str {
        self.entries
            .get(series)
            .map(String::as_str)
            .unwrap_or(OTHER_GROUP)
    }

    /// Group name for a normalized CIP code. Codes that are missing or not
    /// integers fall into [`OTHER_GROUP`].
    pub fn for_cip(&self, code: Option<&str>) -> &str {
        match code.and_then(series_prefix) {
            Some(series) => self.name(&series),
            None => OTHER_GROUP,
        }
    }
}
