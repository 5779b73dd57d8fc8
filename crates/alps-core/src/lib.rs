#![forbid(unsafe_code)]

mod graph;
mod issue;
mod merge;
mod resolved;
mod symbols;

pub use graph::{InternalLink, InternalModel, InternalNode};
pub use issue::{IssueCode, IssueCounts, Severity, ValidationIssue, ValidationResult};
pub use merge::{MergeConflict, MergeResult, MergeStats, canonicalize, merge_documents};
pub use resolved::{ReferenceKind, ResolvedDescriptor, ResolvedDocument};
pub use symbols::{AncestorIndex, SymbolTable};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Input syntax of an ALPS profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SourceFormat {
    #[default]
    Json,
    Xml,
}

impl SourceFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Xml => "xml",
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown source format '{0}' (expected json or xml)")]
pub struct ParseSourceFormatError(pub String);

impl FromStr for SourceFormat {
    type Err = ParseSourceFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "xml" => Ok(Self::Xml),
            _ => Err(ParseSourceFormatError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum AlpsErrorCode {
    #[default]
    EmptyInput,
    Syntax,
    MissingAlps,
    InvalidDescriptors,
}

impl AlpsErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyInput => "alps/error/empty-input",
            Self::Syntax => "alps/error/syntax",
            Self::MissingAlps => "alps/error/missing-alps",
            Self::InvalidDescriptors => "alps/error/invalid-descriptors",
        }
    }
}

/// Fatal parse or structural error. Anything recoverable is reported as a
/// validation issue or a warning instead.
#[derive(Debug, Clone, Serialize, Deserialize, Error, PartialEq, Eq)]
pub enum AlpsError {
    #[error("input was empty")]
    EmptyInput,
    #[error("invalid {format} input: {message}")]
    Syntax {
        format: SourceFormat,
        message: String,
    },
    #[error("document has no top-level `alps` element")]
    MissingAlps,
    #[error("`{path}` {message}")]
    InvalidDescriptors { path: String, message: String },
}

impl AlpsError {
    #[must_use]
    pub fn code(&self) -> AlpsErrorCode {
        match self {
            Self::EmptyInput => AlpsErrorCode::EmptyInput,
            Self::Syntax { .. } => AlpsErrorCode::Syntax,
            Self::MissingAlps => AlpsErrorCode::MissingAlps,
            Self::InvalidDescriptors { .. } => AlpsErrorCode::InvalidDescriptors,
        }
    }

    #[must_use]
    pub fn syntax(format: SourceFormat, message: impl Into<String>) -> Self {
        Self::Syntax {
            format,
            message: message.into(),
        }
    }
}

/// The four legal descriptor types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorType {
    #[default]
    Semantic,
    Safe,
    Unsafe,
    Idempotent,
}

impl DescriptorType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
            Self::Idempotent => "idempotent",
        }
    }

    /// Strict parse: only the exact lowercase ALPS spellings are legal.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "semantic" => Some(Self::Semantic),
            "safe" => Some(Self::Safe),
            "unsafe" => Some(Self::Unsafe),
            "idempotent" => Some(Self::Idempotent),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_transition(self) -> bool {
        matches!(self, Self::Safe | Self::Unsafe | Self::Idempotent)
    }
}

/// Returns true when `kind` names one of the transition types.
#[must_use]
pub fn is_transition_type(kind: &str) -> bool {
    DescriptorType::parse(kind).is_some_and(DescriptorType::is_transition)
}

/// Human-readable documentation attached to a profile or descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Doc {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

impl Doc {
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Link {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Raw descriptor as authored. Immutable once parsed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Descriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Doc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub def: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub descriptor: Vec<Descriptor>,
}

impl Descriptor {
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_href(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::default()
        }
    }

    /// Parsed type, `None` when absent or not one of the legal values.
    #[must_use]
    pub fn descriptor_type(&self) -> Option<DescriptorType> {
        self.kind.as_deref().and_then(DescriptorType::parse)
    }

    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.descriptor_type()
            .is_some_and(DescriptorType::is_transition)
    }

    /// Walks this descriptor and all nested descriptors depth-first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Descriptor)) {
        visit(self);
        for child in &self.descriptor {
            child.walk(visit);
        }
    }
}

/// Body of the `alps` element.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Alps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<Doc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub link: Vec<Link>,
    #[serde(default)]
    pub descriptor: Vec<Descriptor>,
}

/// A parsed ALPS profile. Built once per conversion, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AlpsDocument {
    pub alps: Alps,
}

impl AlpsDocument {
    #[must_use]
    pub fn new(descriptor: Vec<Descriptor>) -> Self {
        Self {
            alps: Alps {
                descriptor,
                ..Alps::default()
            },
        }
    }

    /// Profile-level `alps.title`, if present.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.alps.title.as_deref()
    }

    /// Walks every descriptor in document order.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a Descriptor)) {
        for descriptor in &self.alps.descriptor {
            descriptor.walk(&mut visit);
        }
    }

    #[must_use]
    pub fn descriptor_count(&self) -> usize {
        let mut count = 0;
        self.walk(|_| count += 1);
        count
    }

    /// Serialize back to `{"alps": {...}}` JSON.
    pub fn to_json_string(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Splits `path#fragment` into its parts. The fragment is `None` when there
/// is no `#` or nothing follows it.
#[must_use]
pub fn split_reference(reference: &str) -> (&str, Option<&str>) {
    match reference.split_once('#') {
        Some((path, fragment)) if !fragment.is_empty() => (path, Some(fragment)),
        Some((path, _)) => (path, None),
        None => (reference, None),
    }
}

/// Target id named by an `rt` value: the fragment of `#id` or `doc.json#id`,
/// otherwise the value itself.
#[must_use]
pub fn rt_target(rt: &str) -> &str {
    match split_reference(rt) {
        (_, Some(fragment)) => fragment,
        (path, None) => path,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AlpsDocument, AlpsError, AlpsErrorCode, Descriptor, DescriptorType, Doc, SourceFormat,
        is_transition_type, rt_target, split_reference,
    };

    #[test]
    fn descriptor_type_parse_is_strict() {
        assert_eq!(DescriptorType::parse("safe"), Some(DescriptorType::Safe));
        assert_eq!(DescriptorType::parse("Safe"), None);
        assert_eq!(DescriptorType::parse("query"), None);
        assert!(is_transition_type("idempotent"));
        assert!(!is_transition_type("semantic"));
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            AlpsError::MissingAlps.code().as_str(),
            "alps/error/missing-alps"
        );
        assert_eq!(
            AlpsError::syntax(SourceFormat::Xml, "bad").code(),
            AlpsErrorCode::Syntax
        );
        assert_eq!(
            AlpsError::syntax(SourceFormat::Xml, "bad").to_string(),
            "invalid xml input: bad"
        );
    }

    #[test]
    fn source_format_from_str() {
        assert_eq!("JSON".parse::<SourceFormat>(), Ok(SourceFormat::Json));
        assert_eq!(" xml ".parse::<SourceFormat>(), Ok(SourceFormat::Xml));
        assert!("yaml".parse::<SourceFormat>().is_err());
    }

    #[test]
    fn splits_references() {
        assert_eq!(split_reference("#Home"), ("", Some("Home")));
        assert_eq!(
            split_reference("common.json#goHome"),
            ("common.json", Some("goHome"))
        );
        assert_eq!(split_reference("common.json"), ("common.json", None));
        assert_eq!(split_reference("common.json#"), ("common.json", None));
        assert_eq!(rt_target("#Home"), "Home");
        assert_eq!(rt_target("https://example.com/p.json#Blog"), "Blog");
        assert_eq!(rt_target("Home"), "Home");
    }

    #[test]
    fn serializes_without_absent_fields() {
        let mut home = Descriptor::with_id("Home");
        home.doc = Some(Doc::text("Landing page"));
        let document = AlpsDocument::new(vec![home]);
        let json = document.to_json_string(false).expect("serialize");
        assert_eq!(
            json,
            r#"{"alps":{"descriptor":[{"id":"Home","doc":{"value":"Landing page"}}]}}"#
        );
    }

    #[test]
    fn walk_visits_nested_descriptors_in_order() {
        let mut parent = Descriptor::with_id("Parent");
        parent.descriptor.push(Descriptor::with_id("a"));
        parent.descriptor.push(Descriptor::with_href("#b"));
        let document = AlpsDocument::new(vec![parent, Descriptor::with_id("c")]);

        let mut seen = Vec::new();
        document.walk(|d| seen.push(d.id.clone().or_else(|| d.href.clone())));
        assert_eq!(
            seen,
            vec![
                Some("Parent".to_string()),
                Some("a".to_string()),
                Some("#b".to_string()),
                Some("c".to_string())
            ]
        );
        assert_eq!(document.descriptor_count(), 4);
    }
}
