#![forbid(unsafe_code)]

//! DOT diagram-source generator for ALPS graph models.
//!
//! Only nodes taking part in at least one link are declared. A node that is
//! the target of some link is an application state and is always declared;
//! a node that only ever appears as a link source is a data node and is
//! declared only when it has semantic fields. Links sharing a `(from, to)`
//! pair are drawn as one edge with a multi-row label. Output is
//! deterministic for a given model and configuration.

mod attributes;
mod document;
mod label;
mod palette;

pub use attributes::{AttributeValue, Attributes, dot_id, escape_dot_string, escape_html};
pub use document::DotDocument;
pub use label::{IdLabels, LabelMode, LabelStrategy, ParseLabelModeError, TitleLabels};
pub use palette::{TRANSITION_GLYPH, TransitionPalette};

use std::collections::{BTreeMap, BTreeSet};

use alps_core::{InternalLink, InternalModel, InternalNode};
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct DotRenderConfig {
    pub label_mode: LabelMode,
    pub graph_name: String,
    pub font_name: String,
    pub font_size: f32,
    /// Emit the profile title as the graph label.
    pub include_title: bool,
    /// Emit `URL="#id"` on declared nodes.
    pub link_nodes: bool,
}

impl Default for DotRenderConfig {
    fn default() -> Self {
        Self {
            label_mode: LabelMode::Id,
            graph_name: "application_state".to_string(),
            font_name: "Helvetica".to_string(),
            font_size: 12.0,
            include_title: true,
            link_nodes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DotStats {
    pub declared_nodes: usize,
    /// Linked data nodes left undeclared for lack of semantic fields.
    pub hidden_nodes: usize,
    pub edges: usize,
    /// Edges carrying more than one transition.
    pub grouped_edges: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotOutput {
    pub source: String,
    pub stats: DotStats,
}

#[must_use]
pub fn render_dot(model: &InternalModel) -> String {
    render_dot_with_config(model, &DotRenderConfig::default())
}

#[must_use]
pub fn render_dot_with_config(model: &InternalModel, config: &DotRenderConfig) -> String {
    render_dot_with_stats(model, config).source
}

#[must_use]
pub fn render_dot_with_stats(model: &InternalModel, config: &DotRenderConfig) -> DotOutput {
    DotGenerator {
        model,
        config,
        labels: &config.label_mode,
        palette: TransitionPalette::default(),
    }
    .generate()
}

/// Same as [`render_dot_with_config`] with a caller-supplied label strategy.
#[must_use]
pub fn render_dot_with_labels(
    model: &InternalModel,
    config: &DotRenderConfig,
    labels: &dyn LabelStrategy,
) -> String {
    DotGenerator {
        model,
        config,
        labels,
        palette: TransitionPalette::default(),
    }
    .generate()
    .source
}

struct EdgeGroup<'m> {
    from: &'m str,
    to: &'m str,
    links: Vec<&'m InternalLink>,
}

struct DotGenerator<'m, 'c> {
    model: &'m InternalModel,
    config: &'c DotRenderConfig,
    labels: &'c dyn LabelStrategy,
    palette: TransitionPalette,
}

impl<'m> DotGenerator<'m, '_> {
    fn generate(&self) -> DotOutput {
        let mut stats = DotStats::default();
        let mut document = DotDocument::new(&self.config.graph_name)
            .graph_attrs(self.graph_attributes())
            .node_defaults(
                Attributes::new()
                    .keyword("shape", "box")
                    .set("style", "rounded")
                    .set("fontname", self.config.font_name.as_str())
                    .set("fontsize", self.config.font_size),
            )
            .edge_defaults(
                Attributes::new()
                    .set("fontname", self.config.font_name.as_str())
                    .set("fontsize", self.config.font_size),
            );

        for id in self.linked_node_ids() {
            let node = self.model.find_node(id);
            let is_state = self.model.links.iter().any(|link| link.to == id);
            let has_fields = node.is_some_and(|node| !node.semantic_fields.is_empty());
            if !is_state && !has_fields {
                stats.hidden_nodes += 1;
                continue;
            }
            let fallback;
            let node = match node {
                Some(node) => node,
                None => {
                    fallback = InternalNode::new(id, "semantic");
                    &fallback
                }
            };
            document.node(id, self.node_attributes(node));
            stats.declared_nodes += 1;
        }

        let groups = self.edge_groups();
        if !groups.is_empty() {
            document.blank();
        }
        for group in &groups {
            if group.links.len() > 1 {
                stats.grouped_edges += 1;
            }
            document.edge(group.from, group.to, self.edge_attributes(group));
            stats.edges += 1;
        }

        debug!(
            declared = stats.declared_nodes,
            hidden = stats.hidden_nodes,
            edges = stats.edges,
            grouped = stats.grouped_edges,
            "rendered dot"
        );
        DotOutput {
            source: document.render(),
            stats,
        }
    }

    fn graph_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new().keyword("rankdir", "LR");
        if self.config.include_title
            && let Some(title) = self.model.title.as_deref().filter(|t| !t.trim().is_empty())
        {
            attrs = attrs
                .set("label", title)
                .keyword("labelloc", "t")
                .set("fontname", self.config.font_name.as_str())
                .set("fontsize", self.config.font_size + 4.0);
        }
        attrs
    }

    /// Ids appearing in links, in first-appearance order (source before target).
    fn linked_node_ids(&self) -> Vec<&'m str> {
        let mut seen = BTreeSet::new();
        let mut ids = Vec::new();
        for link in &self.model.links {
            for id in [link.from.as_str(), link.to.as_str()] {
                if seen.insert(id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    fn edge_groups(&self) -> Vec<EdgeGroup<'m>> {
        let mut index_by_pair: BTreeMap<(&str, &str), usize> = BTreeMap::new();
        let mut groups: Vec<EdgeGroup<'m>> = Vec::new();
        for link in &self.model.links {
            let key = (link.from.as_str(), link.to.as_str());
            match index_by_pair.get(&key) {
                Some(&index) => {
                    let group = &mut groups[index];
                    if !group
                        .links
                        .iter()
                        .any(|existing| existing.transition_id == link.transition_id)
                    {
                        group.links.push(link);
                    }
                }
                None => {
                    index_by_pair.insert(key, groups.len());
                    groups.push(EdgeGroup {
                        from: key.0,
                        to: key.1,
                        links: vec![link],
                    });
                }
            }
        }
        groups
    }

    fn node_attributes(&self, node: &InternalNode) -> Attributes {
        let label = self.labels.label_for_node(node);
        let mut attrs = if node.semantic_fields.is_empty() {
            Attributes::new().set("label", label)
        } else {
            let mut table = format!(
                "<table border=\"0\" cellborder=\"1\" cellspacing=\"0\" cellpadding=\"4\">\
                 <tr><td><b>{}</b></td></tr>",
                escape_html(&label)
            );
            for field in &node.semantic_fields {
                let field_label = match self.model.find_node(field) {
                    Some(field_node) => self.labels.label_for_node(field_node),
                    None => self
                        .labels
                        .label_for_node(&InternalNode::new(field.as_str(), "semantic")),
                };
                table.push_str(&format!(
                    "<tr><td align=\"left\">{}</td></tr>",
                    escape_html(&field_label)
                ));
            }
            table.push_str("</table>");
            Attributes::new()
                .keyword("shape", "plain")
                .html("label", table)
        };

        if let Some(description) = node.description.as_deref().filter(|d| !d.is_empty()) {
            attrs = attrs.set("tooltip", description);
        }
        if self.config.link_nodes {
            attrs = attrs.set("URL", format!("#{}", node.id));
        }
        attrs
    }

    fn edge_attributes(&self, group: &EdgeGroup<'m>) -> Attributes {
        let rows: Vec<String> = group
            .links
            .iter()
            .map(|link| {
                format!(
                    "<font color=\"{}\">{TRANSITION_GLYPH}</font> {}",
                    self.palette.color_for(&link.transition_type),
                    escape_html(
                        &self
                            .labels
                            .label_for_link(&link.transition_id, link.transition_title.as_deref())
                    )
                )
            })
            .collect();

        let label = match rows.as_slice() {
            [single] => single.clone(),
            _ => {
                let mut table =
                    String::from("<table border=\"0\" cellborder=\"0\" cellspacing=\"0\">");
                for row in &rows {
                    table.push_str(&format!("<tr><td align=\"left\">{row}</td></tr>"));
                }
                table.push_str("</table>");
                table
            }
        };
        Attributes::new().html("label", label)
    }
}
