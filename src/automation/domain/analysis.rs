//! Change analysis: file classification and generated impact assessment.

use super::FileDelta;
use serde::{Deserialize, Serialize};
use std::fmt;

const CODE_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "java", "cpp", "c", "rs", "go", "rb", "kt", "swift",
];
const DOCUMENTATION_EXTENSIONS: &[&str] = &["md", "txt", "rst"];
const CONFIGURATION_EXTENSIONS: &[&str] = &["yml", "yaml", "json", "toml"];
const TEST_SUFFIXES: &[&str] = &[".test", ".spec", "_test"];

/// Broad category of a changed file, derived from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Source code.
    Code,
    /// Prose documentation.
    Documentation,
    /// Configuration and data files.
    Configuration,
    /// Test sources.
    Test,
    /// Anything else.
    Other,
}

impl FileKind {
    /// Classifies `filename`.
    ///
    /// Test markers win over the extension, so `parser_test.go` and
    /// `app.spec.ts` are tests rather than code. Extensions compare
    /// case-insensitively.
    ///
    /// ```
    /// use prflow::automation::domain::FileKind;
    ///
    /// assert_eq!(FileKind::classify("src/lib.rs"), FileKind::Code);
    /// assert_eq!(FileKind::classify("docs/GUIDE.MD"), FileKind::Documentation);
    /// assert_eq!(FileKind::classify("web/app.spec.ts"), FileKind::Test);
    /// assert_eq!(FileKind::classify("Makefile"), FileKind::Other);
    /// ```
    #[must_use]
    pub fn classify(filename: &str) -> Self {
        let name = filename
            .rsplit('/')
            .next()
            .unwrap_or(filename)
            .to_ascii_lowercase();
        let (stem, extension) = name.rsplit_once('.').unwrap_or((name.as_str(), ""));

        let is_test = TEST_SUFFIXES
            .iter()
            .any(|suffix| stem.ends_with(suffix) || name.ends_with(suffix));
        if is_test {
            Self::Test
        } else if CODE_EXTENSIONS.contains(&extension) {
            Self::Code
        } else if DOCUMENTATION_EXTENSIONS.contains(&extension) {
            Self::Documentation
        } else if CONFIGURATION_EXTENSIONS.contains(&extension) {
            Self::Configuration
        } else {
            Self::Other
        }
    }

    /// Returns the label used in prompts and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Documentation => "documentation",
            Self::Configuration => "configuration",
            Self::Test => "test",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A changed file together with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedFile {
    /// Repository-relative path.
    pub filename: String,
    /// Derived category.
    pub kind: FileKind,
    /// Added lines.
    pub additions: u64,
    /// Removed lines.
    pub deletions: u64,
}

impl From<&FileDelta> for ClassifiedFile {
    fn from(file: &FileDelta) -> Self {
        Self {
            filename: file.filename.clone(),
            kind: FileKind::classify(&file.filename),
            additions: file.additions,
            deletions: file.deletions,
        }
    }
}

/// Assessed impact of a change set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeImpact {
    /// Wide-reaching or risky change.
    High,
    /// Ordinary change.
    #[default]
    Medium,
    /// Cosmetic or isolated change.
    Low,
}

impl ChangeImpact {
    /// Reads a generated impact level, ignoring case and surrounding text.
    /// Unrecognised input yields [`ChangeImpact::Medium`].
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let lowered = label.trim().to_ascii_lowercase();
        if lowered.starts_with("high") {
            Self::High
        } else if lowered.starts_with("low") {
            Self::Low
        } else {
            Self::Medium
        }
    }

    /// Returns the canonical label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for ChangeImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generated assessment of a pull request's changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeAnalysis {
    /// Recurring change patterns.
    pub patterns: Vec<String>,
    /// Overall impact.
    pub impact: ChangeImpact,
    /// Risk factors.
    pub risks: Vec<String>,
    /// Recommended testing.
    pub testing_needs: Vec<String>,
    /// Performance considerations.
    pub performance_notes: Option<String>,
}

impl ChangeAnalysis {
    /// Builds the neutral analysis used when generation fails.
    #[must_use]
    pub fn fallback() -> Self {
        Self::default()
    }
}
