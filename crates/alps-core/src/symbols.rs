use rustc_hash::FxHashMap;

use crate::{AlpsDocument, Descriptor};

/// Document-wide id → descriptor table. Built once per conversion and shared
/// by reference resolution and link construction so both agree on what a
/// dangling reference is. The first occurrence of a duplicated id wins.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable<'a> {
    by_id: FxHashMap<&'a str, &'a Descriptor>,
    order: Vec<&'a str>,
}

impl<'a> SymbolTable<'a> {
    #[must_use]
    pub fn build(document: &'a AlpsDocument) -> Self {
        let mut table = Self::default();
        document.walk(|descriptor| {
            if let Some(id) = descriptor.id.as_deref() {
                table.insert(id, descriptor);
            }
        });
        table
    }

    fn insert(&mut self, id: &'a str, descriptor: &'a Descriptor) {
        if !self.by_id.contains_key(id) {
            self.by_id.insert(id, descriptor);
            self.order.push(id);
        }
    }

    /// Descriptor defined under `id`, without a leading `#`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&'a Descriptor> {
        self.by_id.get(id).copied()
    }

    /// Looks up the target of a `#fragment` reference.
    #[must_use]
    pub fn lookup_fragment(&self, href: &str) -> Option<&'a Descriptor> {
        href.strip_prefix('#').and_then(|id| self.get(id))
    }

    /// Whether any descriptor in the document defines `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Ids in first-occurrence document order.
    pub fn ids(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.order.iter().copied()
    }
}

/// Resolved id → chain of ancestor resolved ids (outermost first). Replaces
/// parent back-pointers; lookups only, built once per conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorIndex {
    chains: FxHashMap<String, Vec<String>>,
}

impl AncestorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the chain for `id` unless one is already known.
    pub fn record(&mut self, id: &str, ancestors: &[String]) {
        if !self.chains.contains_key(id) {
            self.chains.insert(id.to_string(), ancestors.to_vec());
        }
    }

    #[must_use]
    pub fn ancestors(&self, id: &str) -> Option<&[String]> {
        self.chains.get(id).map(Vec::as_slice)
    }

    #[must_use]
    pub fn parent(&self, id: &str) -> Option<&str> {
        self.ancestors(id)
            .and_then(|chain| chain.last())
            .map(String::as_str)
    }

    /// `Outer > Inner > id`, or just `id` at top level.
    #[must_use]
    pub fn describe(&self, id: &str) -> String {
        match self.ancestors(id) {
            Some(chain) if !chain.is_empty() => format!("{} > {id}", chain.join(" > ")),
            _ => id.to_string(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{AncestorIndex, SymbolTable};
    use crate::{AlpsDocument, Descriptor};

    fn sample() -> AlpsDocument {
        let mut first = Descriptor::with_id("dup");
        first.title = Some("first".to_string());
        let mut second = Descriptor::with_id("dup");
        second.title = Some("second".to_string());
        let mut parent = Descriptor::with_id("Parent");
        parent.descriptor.push(second);
        AlpsDocument::new(vec![first, parent])
    }

    #[test]
    fn first_occurrence_wins() {
        let document = sample();
        let table = SymbolTable::build(&document);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.get("dup").and_then(|d| d.title.as_deref()),
            Some("first")
        );
        assert!(table.lookup_fragment("#Parent").is_some());
        assert!(table.lookup_fragment("Parent").is_none());
        assert_eq!(table.ids().collect::<Vec<_>>(), vec!["dup", "Parent"]);
    }

    #[test]
    fn ancestor_chains_describe_nesting() {
        let mut index = AncestorIndex::new();
        index.record("Blog", &[]);
        index.record("goPost", &["Blog".to_string(), "Post".to_string()]);
        index.record("goPost", &["Other".to_string()]);

        assert_eq!(index.parent("goPost"), Some("Post"));
        assert_eq!(index.parent("Blog"), None);
        assert_eq!(index.describe("goPost"), "Blog > Post > goPost");
        assert_eq!(index.describe("Blog"), "Blog");
        assert_eq!(index.describe("missing"), "missing");
    }
}
