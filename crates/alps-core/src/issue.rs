//! Validation findings.
//!
//! Issue codes are stable, documentation-facing identifiers; renaming one is a
//! breaking change for anything that filters on them.

use serde::{Deserialize, Serialize};

/// Severity of a validation finding. Only errors affect validity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Suggestion,
    Warning,
    Error,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Suggestion => "suggestion",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum IssueCode {
    E001,
    E002,
    E003,
    E004,
    E005,
    E008,
    E009,
    E011,
    W001,
    W002,
    W003,
    S001,
}

impl IssueCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E001 => "E001",
            Self::E002 => "E002",
            Self::E003 => "E003",
            Self::E004 => "E004",
            Self::E005 => "E005",
            Self::E008 => "E008",
            Self::E009 => "E009",
            Self::E011 => "E011",
            Self::W001 => "W001",
            Self::W002 => "W002",
            Self::W003 => "W003",
            Self::S001 => "S001",
        }
    }

    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::E001
            | Self::E002
            | Self::E003
            | Self::E004
            | Self::E005
            | Self::E008
            | Self::E009
            | Self::E011 => Severity::Error,
            Self::W001 | Self::W002 | Self::W003 => Severity::Warning,
            Self::S001 => Severity::Suggestion,
        }
    }

    #[must_use]
    pub const fn summary(self) -> &'static str {
        match self {
            Self::E001 => "descriptor needs an id or an href",
            Self::E002 => "transition descriptor needs an rt",
            Self::E003 => "type must be semantic, safe, unsafe or idempotent",
            Self::E004 => "reference does not match any descriptor id",
            Self::E005 => "duplicate id among sibling descriptors",
            Self::E008 => "document has no top-level alps element",
            Self::E009 => "alps.descriptor must be an array",
            Self::E011 => "tag must be a space-separated string, not an array",
            Self::W001 => "profile has no title",
            Self::W002 => "safe transition ids should start with \"go\"",
            Self::W003 => "unsafe/idempotent transition ids should start with \"do\"",
            Self::S001 => "transition descriptor has no doc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
    /// Bracket-indexed dotted path, e.g. `alps.descriptor[2].descriptor[0]`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ValidationIssue {
    #[must_use]
    pub fn new(code: IssueCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            path: path.into(),
            id: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: Option<&str>) -> Self {
        self.id = id.map(str::to_string);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueCounts {
    pub errors: usize,
    pub warnings: usize,
    pub suggestions: usize,
}

impl IssueCounts {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.errors + self.warnings + self.suggestions
    }
}

/// Severity-partitioned outcome of one validation pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub suggestions: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Partition issues by severity, preserving discovery order within each list.
    #[must_use]
    pub fn from_issues(issues: impl IntoIterator<Item = ValidationIssue>) -> Self {
        let mut result = Self::default();
        for issue in issues {
            match issue.severity {
                Severity::Error => result.errors.push(issue),
                Severity::Warning => result.warnings.push(issue),
                Severity::Suggestion => result.suggestions.push(issue),
            }
        }
        result.is_valid = result.errors.is_empty();
        result
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors
            .iter()
            .chain(&self.warnings)
            .chain(&self.suggestions)
    }

    #[must_use]
    pub fn counts(&self) -> IssueCounts {
        IssueCounts {
            errors: self.errors.len(),
            warnings: self.warnings.len(),
            suggestions: self.suggestions.len(),
        }
    }

    #[must_use]
    pub fn count_code(&self, code: IssueCode) -> usize {
        self.issues().filter(|issue| issue.code == code).count()
    }
}
