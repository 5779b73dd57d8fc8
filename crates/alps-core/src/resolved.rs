use serde::Serialize;

use crate::{AlpsDocument, AncestorIndex, Descriptor, DescriptorType, Doc, SymbolTable};

/// How a descriptor obtained its identity.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ReferenceKind {
    /// Has its own `id`.
    Local,
    /// `href="#id"` within the same document.
    Fragment,
    /// `href` naming another document, optionally with a fragment.
    External,
    /// Neither `id` nor `href`.
    Anonymous,
}

/// A descriptor after reference resolution. Borrows the original descriptor;
/// effective fields combine local values with the referent's (local wins).
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedDescriptor<'a> {
    #[serde(skip)]
    pub source: &'a Descriptor,
    pub resolved_id: String,
    pub is_resolved: bool,
    pub reference: ReferenceKind,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<Doc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rt: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub descriptor: Vec<ResolvedDescriptor<'a>>,
}

impl ResolvedDescriptor<'_> {
    /// Effective type, `None` when absent or illegal.
    #[must_use]
    pub fn descriptor_type(&self) -> Option<DescriptorType> {
        self.kind.as_deref().and_then(DescriptorType::parse)
    }

    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.descriptor_type()
            .is_some_and(DescriptorType::is_transition)
    }

    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(
            self.reference,
            ReferenceKind::Fragment | ReferenceKind::External
        )
    }

    pub fn walk<'s>(&'s self, visit: &mut impl FnMut(&'s Self)) {
        visit(self);
        for child in &self.descriptor {
            child.walk(visit);
        }
    }
}

/// Output of the resolver: the resolved tree plus the per-conversion tables
/// that later phases reuse.
#[derive(Debug, Clone)]
pub struct ResolvedDocument<'a> {
    pub document: &'a AlpsDocument,
    pub descriptors: Vec<ResolvedDescriptor<'a>>,
    pub symbols: SymbolTable<'a>,
    pub ancestors: AncestorIndex,
}

impl<'a> ResolvedDocument<'a> {
    #[must_use]
    pub fn title(&self) -> Option<&'a str> {
        self.document.alps.title.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&'a str> {
        self.document.alps.doc.as_ref().map(|doc| doc.value.as_str())
    }

    #[must_use]
    pub fn ancestors(&self, resolved_id: &str) -> Option<&[String]> {
        self.ancestors.ancestors(resolved_id)
    }

    pub fn walk<'s>(&'s self, mut visit: impl FnMut(&'s ResolvedDescriptor<'a>)) {
        for descriptor in &self.descriptors {
            descriptor.walk(&mut visit);
        }
    }

    #[must_use]
    pub fn unresolved_count(&self) -> usize {
        let mut count = 0;
        self.walk(|descriptor| {
            if !descriptor.is_resolved {
                count += 1;
            }
        });
        count
    }
}
