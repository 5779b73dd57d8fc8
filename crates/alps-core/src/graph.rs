use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::is_transition_type;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InternalNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_transition: bool,
    /// Resolved ids of semantic children, in document order.
    pub semantic_fields: Vec<String>,
}

impl InternalNode {
    #[must_use]
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self {
            id: id.into(),
            is_transition: is_transition_type(&kind),
            kind,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InternalLink {
    pub from: String,
    pub to: String,
    pub relation: Option<String>,
    pub transition_id: String,
    pub transition_type: String,
    pub transition_title: Option<String>,
}

/// Flat graph derived from a resolved profile. Node ids are unique; link order
/// is first-discovery traversal order.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InternalModel {
    pub title: Option<String>,
    pub description: Option<String>,
    pub nodes: Vec<InternalNode>,
    pub links: Vec<InternalLink>,
    #[serde(skip)]
    node_index_by_id: BTreeMap<String, usize>,
}

impl PartialEq for InternalModel {
    fn eq(&self, other: &Self) -> bool {
        self.title == other.title
            && self.description == other.description
            && self.nodes == other.nodes
            && self.links == other.links
    }
}

impl Eq for InternalModel {}

impl InternalModel {
    #[must_use]
    pub fn new(title: Option<String>, description: Option<String>) -> Self {
        Self {
            title,
            description,
            ..Self::default()
        }
    }

    /// Inserts `node` unless its id is already present. Returns whether it was added.
    pub fn insert_node(&mut self, node: InternalNode) -> bool {
        if self.contains_node(&node.id) {
            return false;
        }
        self.node_index_by_id
            .insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Replaces the node with the same id in place, keeping its position, or
    /// appends it when the id is new.
    pub fn replace_node(&mut self, node: InternalNode) {
        match self.node_index(&node.id) {
            Some(index) => self.nodes[index] = node,
            None => {
                self.insert_node(node);
            }
        }
    }

    pub fn push_link(&mut self, link: InternalLink) {
        self.links.push(link);
    }

    #[must_use]
    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index(id).is_some()
    }

    /// Find a node by id, returning its index.
    #[must_use]
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_index_by_id
            .get(id)
            .copied()
            .or_else(|| self.nodes.iter().position(|node| node.id == id))
    }

    /// Find a node by id.
    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<&InternalNode> {
        self.node_index(id).and_then(|index| self.nodes.get(index))
    }

    pub fn links_from<'s>(&'s self, id: &'s str) -> impl Iterator<Item = &'s InternalLink> {
        self.links.iter().filter(move |link| link.from == id)
    }
}
