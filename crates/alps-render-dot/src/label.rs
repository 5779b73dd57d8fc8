//! Label strategies. Labels are returned as plain text; the generator
//! escapes them for whichever syntax they land in.

use std::fmt;
use std::str::FromStr;

use alps_core::InternalNode;
use thiserror::Error;

pub trait LabelStrategy {
    fn label_for_node(&self, node: &InternalNode) -> String;
    fn label_for_link(&self, transition_id: &str, transition_title: Option<&str>) -> String;
}

/// Raw ids everywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdLabels;

impl LabelStrategy for IdLabels {
    fn label_for_node(&self, node: &InternalNode) -> String {
        node.id.clone()
    }

    fn label_for_link(&self, transition_id: &str, _transition_title: Option<&str>) -> String {
        transition_id.to_string()
    }
}

/// Human titles, falling back to the id. Spaces become non-breaking so a
/// title stays on one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleLabels;

impl TitleLabels {
    fn title_or_id(title: Option<&str>, id: &str) -> String {
        title
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .unwrap_or(id)
            .replace(' ', "\u{00A0}")
    }
}

impl LabelStrategy for TitleLabels {
    fn label_for_node(&self, node: &InternalNode) -> String {
        Self::title_or_id(node.title.as_deref(), &node.id)
    }

    fn label_for_link(&self, transition_id: &str, transition_title: Option<&str>) -> String {
        Self::title_or_id(transition_title, transition_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelMode {
    #[default]
    Id,
    Title,
}

impl LabelMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
        }
    }
}

impl fmt::Display for LabelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown label mode: {0} (expected id or title)")]
pub struct ParseLabelModeError(String);

impl FromStr for LabelMode {
    type Err = ParseLabelModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "title" => Ok(Self::Title),
            _ => Err(ParseLabelModeError(s.to_string())),
        }
    }
}

impl LabelStrategy for LabelMode {
    fn label_for_node(&self, node: &InternalNode) -> String {
        match self {
            Self::Id => IdLabels.label_for_node(node),
            Self::Title => TitleLabels.label_for_node(node),
        }
    }

    fn label_for_link(&self, transition_id: &str, transition_title: Option<&str>) -> String {
        match self {
            Self::Id => IdLabels.label_for_link(transition_id, transition_title),
            Self::Title => TitleLabels.label_for_link(transition_id, transition_title),
        }
    }
}
