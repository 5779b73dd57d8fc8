use alps_core::{
    Descriptor, InternalLink, InternalModel, InternalNode, ReferenceKind, ResolvedDescriptor,
    ResolvedDocument, rt_target,
};
use rustc_hash::FxHashSet;

/// The transition a link is built from, whichever way it was written.
struct Transition<'r> {
    id: &'r str,
    kind: &'r str,
    title: Option<&'r str>,
    rt: Option<&'r str>,
    rel: Option<&'r str>,
}

impl<'r> Transition<'r> {
    fn from_descriptor(descriptor: &'r Descriptor) -> Option<Self> {
        if !descriptor.is_transition() {
            return None;
        }
        Some(Self {
            id: descriptor.id.as_deref()?,
            kind: descriptor.kind.as_deref()?,
            title: descriptor.title.as_deref(),
            rt: descriptor.rt.as_deref(),
            rel: descriptor.rel.as_deref(),
        })
    }

    fn from_resolved(resolved: &'r ResolvedDescriptor<'_>) -> Option<Self> {
        if !resolved.is_resolved || !resolved.is_transition() {
            return None;
        }
        Some(Self {
            id: &resolved.resolved_id,
            kind: resolved.kind.as_deref()?,
            title: resolved.title.as_deref(),
            rt: resolved.rt.as_deref(),
            rel: resolved.source.rel.as_deref(),
        })
    }

    fn into_link(self, from: &str) -> InternalLink {
        let to = self.rt.map_or(self.id, rt_target);
        InternalLink {
            from: from.to_string(),
            to: to.to_string(),
            relation: self.rel.map(str::to_string),
            transition_id: self.id.to_string(),
            transition_type: self.kind.to_string(),
            transition_title: self.title.map(str::to_string),
        }
    }
}

pub(crate) struct GraphBuilder<'d, 'a> {
    resolved: &'d ResolvedDocument<'a>,
    model: InternalModel,
    /// Ids whose node was built from the defining descriptor.
    defined: FxHashSet<String>,
}

impl<'d, 'a> GraphBuilder<'d, 'a> {
    pub(crate) fn new(resolved: &'d ResolvedDocument<'a>) -> Self {
        Self {
            resolved,
            model: InternalModel::new(
                resolved.title().map(str::to_string),
                resolved.description().map(str::to_string),
            ),
            defined: FxHashSet::default(),
        }
    }

    pub(crate) fn finish(self) -> InternalModel {
        self.model
    }

    pub(crate) fn visit(&mut self, descriptor: &ResolvedDescriptor<'a>) {
        self.intern_node(descriptor);
        if descriptor.is_resolved && !descriptor.resolved_id.is_empty() {
            for child in &descriptor.descriptor {
                if let Some(link) = self.link_for_child(child, &descriptor.resolved_id) {
                    self.model.push_link(link);
                }
            }
        }
        for child in &descriptor.descriptor {
            self.visit(child);
        }
    }

    /// A definition (a descriptor with its own id) replaces a node first
    /// created from a reference to it; otherwise the first occurrence wins.
    fn intern_node(&mut self, descriptor: &ResolvedDescriptor<'a>) {
        if !descriptor.is_resolved {
            return;
        }
        let id = descriptor.resolved_id.as_str();
        let is_definition = descriptor.reference == ReferenceKind::Local;
        if self.model.contains_node(id) && (!is_definition || self.defined.contains(id)) {
            return;
        }

        let kind = descriptor
            .kind
            .clone()
            .unwrap_or_else(|| "semantic".to_string());
        let mut node = InternalNode::new(id, kind);
        node.title = descriptor.title.clone();
        node.description = descriptor.doc.as_ref().map(|doc| doc.value.clone());
        for child in &descriptor.descriptor {
            if is_semantic_field(child) && !node.semantic_fields.contains(&child.resolved_id) {
                node.semantic_fields.push(child.resolved_id.clone());
            }
        }
        if is_definition {
            self.defined.insert(id.to_string());
        }
        self.model.replace_node(node);
    }

    /// Both ways of attaching a transition to a state yield the same link:
    /// a `#X` reference to a transition, or a nested transition with its own id.
    fn link_for_child(&self, child: &ResolvedDescriptor<'a>, from: &str) -> Option<InternalLink> {
        let transition = match child.reference {
            ReferenceKind::Local => Transition::from_descriptor(child.source),
            ReferenceKind::Fragment => child
                .source
                .href
                .as_deref()
                .and_then(|href| self.resolved.symbols.lookup_fragment(href))
                .and_then(Transition::from_descriptor),
            ReferenceKind::External => Transition::from_resolved(child),
            ReferenceKind::Anonymous => None,
        }?;
        Some(transition.into_link(from))
    }
}

/// Explicitly semantic children, plus references whose resolved type is
/// semantic or absent (unresolved references included).
fn is_semantic_field(child: &ResolvedDescriptor<'_>) -> bool {
    if child.source.kind.as_deref() == Some("semantic") {
        return true;
    }
    child.is_reference() && matches!(child.kind.as_deref(), None | Some("semantic"))
}
