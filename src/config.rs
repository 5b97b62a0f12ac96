//! Run configuration for the aggregation stage.
//!
//! Values come from three layers, highest precedence first: CLI overrides, an
//! optional JSON file, built-in defaults. The JSON file is a plain object
//! where every key is optional:
//!
//! ```json
//! {
//!   "bins": 40,
//!   "policy": "any-primary",
//!   "earnings": "4yr",
//!   "selected_majors": ["Psychology, General."],
//!   "subject_groups": { "42": "Psychology", "52": "Business" }
//! }
//! ```

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::analyzers::groups::SubjectGroups;
use crate::analyzers::payload::{DEFAULT_BINS, PayloadOptions, PayloadPolicy};
use crate::analyzers::rollup::MajorSelection;
use crate::analyzers::types::EarningsColumn;

/// Allow-list used in restricted mode unless the config file names its own.
pub const DEFAULT_SELECTED_MAJORS: &[&str] = &[
    "Computer and Information Sciences, General.",
    "Registered Nursing, Nursing Administration, Nursing Research and Clinical Nursing.",
    "Business Administration, Management and Operations.",
    "Psychology, General.",
    "Biological and Biomedical Sciences, Other.",
];

/// Horizon of the primary earnings column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum EarningsHorizon {
    #[default]
    #[serde(rename = "1yr")]
    #[value(name = "1yr")]
    OneYear,
    #[serde(rename = "4yr")]
    #[value(name = "4yr")]
    FourYear,
    #[serde(rename = "5yr")]
    #[value(name = "5yr")]
    FiveYear,
}

impl From<EarningsHorizon> for EarningsColumn {
    fn from(h: EarningsHorizon) -> Self {
        match h {
            EarningsHorizon::OneYear => EarningsColumn::OneYear,
            EarningsHorizon::FourYear => EarningsColumn::FourYear,
            EarningsHorizon::FiveYear => EarningsColumn::FiveYear,
        }
    }
}

/// Contents of the optional JSON config file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub bins: Option<usize>,
    pub policy: Option<PayloadPolicy>,
    pub earnings: Option<EarningsHorizon>,
    pub selected_majors: Option<Vec<String>>,
    pub subject_groups: Option<BTreeMap<String, String>>,
}

impl ConfigFile {
    /// Loads the config from a JSON file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid config
    /// object (unknown keys included).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(file)
    }
}

/// Settings given on the command line; `None` defers to lower layers.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bins: Option<usize>,
    pub policy: Option<PayloadPolicy>,
    pub earnings: Option<EarningsHorizon>,
    pub full: bool,
}

/// Fully resolved, read-only configuration for one run.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub options: PayloadOptions,
    pub selection: MajorSelection,
    pub groups: SubjectGroups,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            options: PayloadOptions::default(),
            selection: MajorSelection::Restricted(default_selected_majors()),
            groups: SubjectGroups::default(),
        }
    }
}

fn default_selected_majors() -> Vec<String> {
    DEFAULT_SELECTED_MAJORS.iter().map(|m| m.to_string()).collect()
}

impl SiteConfig {
    /// Merges `overrides` over `file` over the built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the resolved bin count is zero.
    pub fn resolve(file: ConfigFile, overrides: Overrides) -> Result<Self> {
        let bins = overrides.bins.or(file.bins).unwrap_or(DEFAULT_BINS);
        if bins == 0 {
            bail!("bin count must be at least 1");
        }

        let earnings = overrides.earnings.or(file.earnings).unwrap_or_default();
        let options = PayloadOptions {
            bins,
            policy: overrides.policy.or(file.policy).unwrap_or_default(),
            earnings: earnings.into(),
        };

        let selection = if overrides.full {
            MajorSelection::Full
        } else {
            MajorSelection::Restricted(
                file.selected_majors
                    .unwrap_or_else(default_selected_majors),
            )
        };

        let groups = match file.subject_groups {
            Some(entries) => SubjectGroups::from_entries(entries),
            None => SubjectGroups::default(),
        };

        Ok(Self {
            options,
            selection,
            groups,
        })
    }

    /// Loads `path` if given and resolves it against `overrides`.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let file = match path {
            Some(p) => ConfigFile::load(p)?,
            None => ConfigFile::default(),
        };
        Self::resolve(file, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = SiteConfig::default();
        assert_eq!(config.options.bins, 50);
        assert_eq!(config.options.policy, PayloadPolicy::AnyField);
        assert_eq!(config.options.earnings, EarningsColumn::OneYear);
        match config.selection {
            MajorSelection::Restricted(majors) => assert_eq!(majors.len(), 5),
            MajorSelection::Full => panic!("restricted mode is the default"),
        }
    }

    #[test]
    fn test_overrides_beat_file() {
        let file = ConfigFile {
            bins: Some(20),
            policy: Some(PayloadPolicy::AllPrimary),
            ..Default::default()
        };
        let overrides = Overrides {
            bins: Some(10),
            full: true,
            ..Default::default()
        };

        let config = SiteConfig::resolve(file, overrides).unwrap();
        assert_eq!(config.options.bins, 10);
        assert_eq!(config.options.policy, PayloadPolicy::AllPrimary);
        assert_eq!(config.selection, MajorSelection::Full);
    }

    #[test]
    fn test_zero_bins_rejected() {
        let overrides = Overrides {
            bins: Some(0),
            ..Default::default()
        };
        assert!(SiteConfig::resolve(ConfigFile::default(), overrides).is_err());
    }

    #[test]
    fn test_load_json_file() {
        let path = env::temp_dir().join(format!("outcomes_rollup_config_{}.json", std::process::id()));
        fs::write(
            &path,
            r#"{"earnings": "5yr", "policy": "any-primary", "selected_majors": ["Accounting."], "subject_groups": {"52": "Business"}}"#,
        )
        .unwrap();

        let config = SiteConfig::load(Some(&path), Overrides::default()).unwrap();
        assert_eq!(config.options.earnings, EarningsColumn::FiveYear);
        assert_eq!(config.options.policy, PayloadPolicy::AnyPrimary);
        assert_eq!(
            config.selection,
            MajorSelection::Restricted(vec!["Accounting.".to_string()])
        );
        assert_eq!(config.groups.name("52"), "Business");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_unknown_key_rejected() {
        let path = env::temp_dir().join(format!("outcomes_rollup_badconfig_{}.json", std::process::id()));
        fs::write(&path, r#"{"binz": 3}"#).unwrap();

        assert!(SiteConfig::load(Some(&path), Overrides::default()).is_err());

        fs::remove_file(&path).unwrap();
    }
}
