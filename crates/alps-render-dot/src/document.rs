//! DOT document builder.

use std::fmt::Write;

use crate::attributes::{Attributes, dot_id};

#[derive(Debug, Clone)]
enum Statement {
    Node { id: String, attrs: Attributes },
    Edge { from: String, to: String, attrs: Attributes },
    Blank,
}

/// A `digraph` with default attribute blocks followed by node and edge
/// statements in insertion order.
#[derive(Debug, Clone)]
pub struct DotDocument {
    name: String,
    graph: Attributes,
    node_defaults: Attributes,
    edge_defaults: Attributes,
    statements: Vec<Statement>,
}

impl DotDocument {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            graph: Attributes::new(),
            node_defaults: Attributes::new(),
            edge_defaults: Attributes::new(),
            statements: Vec::new(),
        }
    }

    #[must_use]
    pub fn graph_attrs(mut self, attrs: Attributes) -> Self {
        self.graph = attrs;
        self
    }

    #[must_use]
    pub fn node_defaults(mut self, attrs: Attributes) -> Self {
        self.node_defaults = attrs;
        self
    }

    #[must_use]
    pub fn edge_defaults(mut self, attrs: Attributes) -> Self {
        self.edge_defaults = attrs;
        self
    }

    /// Adds a node statement; `id` is quoted on render when needed.
    pub fn node(&mut self, id: &str, attrs: Attributes) {
        self.statements.push(Statement::Node {
            id: id.to_string(),
            attrs,
        });
    }

    /// Adds a `from -> to` edge statement.
    pub fn edge(&mut self, from: &str, to: &str, attrs: Attributes) {
        self.statements.push(Statement::Edge {
            from: from.to_string(),
            to: to.to_string(),
            attrs,
        });
    }

    /// Visual separator between statement groups.
    pub fn blank(&mut self) {
        self.statements.push(Statement::Blank);
    }

    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", dot_id(&self.name));
        for (keyword, attrs) in [
            ("graph", &self.graph),
            ("node", &self.node_defaults),
            ("edge", &self.edge_defaults),
        ] {
            if !attrs.is_empty() {
                let _ = writeln!(out, "    {keyword}{};", attrs.render());
            }
        }

        for statement in &self.statements {
            match statement {
                Statement::Node { id, attrs } => {
                    let _ = writeln!(out, "    {}{};", dot_id(id), attrs.render());
                }
                Statement::Edge { from, to, attrs } => {
                    let _ = writeln!(
                        out,
                        "    {} -> {}{};",
                        dot_id(from),
                        dot_id(to),
                        attrs.render()
                    );
                }
                Statement::Blank => out.push('\n'),
            }
        }
        out.push_str("}\n");
        out
    }
}
