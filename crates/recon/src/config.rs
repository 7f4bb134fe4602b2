use std::collections::HashSet;
use std::path::Path;

use modeldiff_core::Parameter;
use serde::{Deserialize, Serialize};

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiffConfig {
    #[serde(default)]
    pub strategy: Strategy,
    #[serde(default)]
    pub parameters: ParameterConfig,
    #[serde(default)]
    pub categories: CategoryConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
}

// ---------------------------------------------------------------------------
// Strategy
// ---------------------------------------------------------------------------

/// Classification algorithm.
///
/// `HashedContentQuick` trusts fingerprint equality without confirming it
/// structurally: a fingerprint collision yields a false Unchanged or rename
/// verdict. It is the fastest mode and the default; pick `HashedContent` or
/// `Content` when an exact answer matters more than throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum Strategy {
    /// Merge-join on ids. Cannot detect renames.
    #[serde(rename = "m")]
    Merge,
    /// Content comparison, no fingerprints.
    #[serde(rename = "c")]
    Content,
    /// Fingerprint filter confirmed by structural equality.
    #[serde(rename = "chc")]
    HashedContent,
    /// Fingerprint equality accepted as proof.
    #[default]
    #[serde(rename = "chc_quick")]
    HashedContentQuick,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Merge,
        Strategy::Content,
        Strategy::HashedContent,
        Strategy::HashedContentQuick,
    ];

    pub fn uses_fingerprints(&self) -> bool {
        matches!(self, Self::HashedContent | Self::HashedContentQuick)
    }

    /// False only for the mode whose verdicts rest on fingerprints alone.
    pub fn is_exact(&self) -> bool {
        !matches!(self, Self::HashedContentQuick)
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Merge => write!(f, "m"),
            Self::Content => write!(f, "c"),
            Self::HashedContent => write!(f, "chc"),
            Self::HashedContentQuick => write!(f, "chc_quick"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterConfig {
    /// Definition names whose values never register as changes.
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            excluded: default_excluded(),
        }
    }
}

fn default_excluded() -> Vec<String> {
    ["Mark", "File Path", "标记", "文件路径"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Decides which parameters take part in hashing and equality by value.
#[derive(Debug, Clone)]
pub struct ParameterPolicy {
    excluded: HashSet<String>,
}

impl ParameterPolicy {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_meaningful(&self, p: &Parameter) -> bool {
        !self.excluded.contains(&p.definition_name)
    }
}

impl Default for ParameterPolicy {
    fn default() -> Self {
        Self::new(default_excluded())
    }
}

impl From<&ParameterConfig> for ParameterPolicy {
    fn from(c: &ParameterConfig) -> Self {
        Self::new(c.excluded.iter().cloned())
    }
}

// ---------------------------------------------------------------------------
// Categories, report, diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryConfig {
    /// Category display names left out of the meaningful change count.
    #[serde(default = "default_ignored")]
    pub ignored: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            ignored: default_ignored(),
        }
    }
}

fn default_ignored() -> Vec<String> {
    ["WeakDims", "SketchLines", "Views", "Cameras"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_true")]
    pub include_unchanged: bool,
    #[serde(default = "default_separator")]
    pub separator: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_unchanged: true,
            separator: default_separator(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_separator() -> String {
    "\n".into()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsConfig {
    /// Count fingerprint collisions after hash-based runs.
    #[serde(default)]
    pub collision_check: bool,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl DiffConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: DiffConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let data = std::fs::read_to_string(path)
            .map_err(|e| ReconError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&data)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if let Some(blank) = self.parameters.excluded.iter().find(|n| n.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(format!(
                "parameters.excluded contains a blank name: {blank:?}"
            )));
        }

        if let Some(blank) = self.categories.ignored.iter().find(|n| n.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(format!(
                "categories.ignored contains a blank name: {blank:?}"
            )));
        }

        if self.report.separator.is_empty() {
            return Err(ReconError::ConfigValidation(
                "report.separator must not be empty".into(),
            ));
        }

        Ok(())
    }

    pub fn parameter_policy(&self) -> ParameterPolicy {
        ParameterPolicy::from(&self.parameters)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use modeldiff_core::Storage;

    const FULL: &str = r#"
strategy = "chc"

[parameters]
excluded = ["Mark", "Comments"]

[categories]
ignored = ["Views"]

[report]
include_unchanged = false
separator = " | "

[diagnostics]
collision_check = true
"#;

    #[test]
    fn parse_full() {
        let config = DiffConfig::from_toml(FULL).unwrap();
        assert_eq!(config.strategy, Strategy::HashedContent);
        assert_eq!(config.parameters.excluded, vec!["Mark", "Comments"]);
        assert_eq!(config.categories.ignored, vec!["Views"]);
        assert!(!config.report.include_unchanged);
        assert_eq!(config.report.separator, " | ");
        assert!(config.diagnostics.collision_check);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = DiffConfig::from_toml("").unwrap();
        assert_eq!(config.strategy, Strategy::HashedContentQuick);
        assert!(config.parameters.excluded.iter().any(|n| n == "File Path"));
        assert_eq!(config.categories.ignored.len(), 4);
        assert!(config.report.include_unchanged);
        assert_eq!(config.report.separator, "\n");
        assert!(!config.diagnostics.collision_check);
    }

    #[test]
    fn strategy_names() {
        for (name, expected) in [
            ("m", Strategy::Merge),
            ("c", Strategy::Content),
            ("chc", Strategy::HashedContent),
            ("chc_quick", Strategy::HashedContentQuick),
        ] {
            let config = DiffConfig::from_toml(&format!("strategy = \"{name}\"")).unwrap();
            assert_eq!(config.strategy, expected);
            assert_eq!(expected.to_string(), name);
        }
    }

    #[test]
    fn reject_unknown_strategy() {
        let err = DiffConfig::from_toml("strategy = \"fastest\"").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_unknown_section() {
        let err = DiffConfig::from_toml("[geometry]\nprecision = 6").unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_blank_excluded_name() {
        let err = DiffConfig::from_toml("[parameters]\nexcluded = [\"Mark\", \"  \"]").unwrap_err();
        assert!(err.to_string().contains("parameters.excluded"));
    }

    #[test]
    fn reject_empty_separator() {
        let err = DiffConfig::from_toml("[report]\nseparator = \"\"").unwrap_err();
        assert!(err.to_string().contains("report.separator"));
    }

    #[test]
    fn policy_follows_config() {
        let config = DiffConfig::from_toml(FULL).unwrap();
        let policy = config.parameter_policy();
        assert!(!policy.is_meaningful(&Parameter::new(1, "Comments", Storage::None)));
        assert!(policy.is_meaningful(&Parameter::new(2, "File Path", Storage::None)));

        let default = ParameterPolicy::default();
        assert!(!default.is_meaningful(&Parameter::new(2, "File Path", Storage::None)));
        assert!(default.is_meaningful(&Parameter::new(3, "Length", Storage::Double(1.0))));
    }

    #[test]
    fn load_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();
        let config = DiffConfig::load(file.path()).unwrap();
        assert_eq!(config.strategy, Strategy::HashedContent);

        let dir = tempfile::tempdir().unwrap();
        let err = DiffConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ReconError::Io(_)));
    }

    #[test]
    fn strategy_flags() {
        assert!(!Strategy::Merge.uses_fingerprints());
        assert!(!Strategy::Content.uses_fingerprints());
        assert!(Strategy::HashedContent.uses_fingerprints());
        assert!(Strategy::HashedContentQuick.uses_fingerprints());
        assert!(Strategy::HashedContent.is_exact());
        assert!(!Strategy::HashedContentQuick.is_exact());
    }
}
