//! Synchronous depth-first pass that turns the raw descriptor tree into the
//! resolved tree. External documents must already be loaded.

use std::path::Path;

use alps_core::{
    AlpsDocument, AncestorIndex, Descriptor, ReferenceKind, ResolvedDescriptor, ResolvedDocument,
    SymbolTable, split_reference,
};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::cache::LoadOutcome;
use crate::loader::locate;

pub(crate) struct TreeBuilder<'a, 'x> {
    symbols: SymbolTable<'a>,
    externals: Option<&'x FxHashMap<String, LoadOutcome>>,
    /// One table per successfully loaded location, shared by every
    /// reference into it.
    external_symbols: FxHashMap<&'x str, SymbolTable<'x>>,
    base_dir: Option<&'x Path>,
    ancestors: AncestorIndex,
    chain: Vec<String>,
}

impl<'a, 'x> TreeBuilder<'a, 'x> {
    /// `externals == None` means no I/O happened and every external reference
    /// stays unresolved.
    pub(crate) fn new(
        document: &'a AlpsDocument,
        externals: Option<&'x FxHashMap<String, LoadOutcome>>,
        base_dir: Option<&'x Path>,
    ) -> Self {
        let external_symbols = externals
            .into_iter()
            .flatten()
            .filter_map(|(location, outcome)| {
                let loaded = outcome.as_ref().ok()?;
                Some((location.as_str(), SymbolTable::build(loaded)))
            })
            .collect();
        Self {
            symbols: SymbolTable::build(document),
            externals,
            external_symbols,
            base_dir,
            ancestors: AncestorIndex::new(),
            chain: Vec::new(),
        }
    }

    pub(crate) fn build(mut self, document: &'a AlpsDocument) -> ResolvedDocument<'a> {
        let descriptors = document
            .alps
            .descriptor
            .iter()
            .map(|descriptor| self.resolve(descriptor))
            .collect();

        ResolvedDocument {
            document,
            descriptors,
            symbols: self.symbols,
            ancestors: self.ancestors,
        }
    }

    fn resolve(&mut self, descriptor: &'a Descriptor) -> ResolvedDescriptor<'a> {
        let mut resolved = self.identify(descriptor);
        self.ancestors.record(&resolved.resolved_id, &self.chain);

        self.chain.push(resolved.resolved_id.clone());
        resolved.descriptor = descriptor
            .descriptor
            .iter()
            .map(|child| self.resolve(child))
            .collect();
        self.chain.pop();

        resolved
    }

    fn identify(&self, descriptor: &'a Descriptor) -> ResolvedDescriptor<'a> {
        let mut resolved = ResolvedDescriptor {
            source: descriptor,
            resolved_id: String::new(),
            is_resolved: false,
            reference: ReferenceKind::Anonymous,
            kind: descriptor.kind.clone(),
            title: descriptor.title.clone(),
            doc: descriptor.doc.clone(),
            rt: descriptor.rt.clone(),
            descriptor: Vec::new(),
        };

        if let Some(id) = descriptor.id.as_deref() {
            resolved.resolved_id = id.to_string();
            resolved.is_resolved = true;
            resolved.reference = ReferenceKind::Local;
            return resolved;
        }

        let Some(href) = descriptor.href.as_deref() else {
            return resolved;
        };
        resolved.resolved_id = href.to_string();

        if href.starts_with('#') {
            resolved.reference = ReferenceKind::Fragment;
            match self.symbols.lookup_fragment(href) {
                Some(referent) => {
                    resolved.resolved_id = referent.id.clone().unwrap_or_default();
                    resolved.is_resolved = true;
                    fill_missing(&mut resolved.kind, referent.kind.as_ref());
                    fill_missing(&mut resolved.title, referent.title.as_ref());
                    fill_missing(&mut resolved.doc, referent.doc.as_ref());
                }
                None => {
                    debug!(href, context = %self.context(), "dangling fragment reference");
                }
            }
            return resolved;
        }

        resolved.reference = ReferenceKind::External;
        if let Some(referent) = self.external_referent(href) {
            resolved.is_resolved = true;
            resolved.resolved_id = referent.id.clone().unwrap_or_default();
            fill_missing(&mut resolved.kind, referent.kind.as_ref());
            fill_missing(&mut resolved.title, referent.title.as_ref());
            fill_missing(&mut resolved.doc, referent.doc.as_ref());
            fill_missing(&mut resolved.rt, referent.rt.as_ref());
        }
        resolved
    }

    fn external_referent(&self, href: &str) -> Option<&'x Descriptor> {
        let (path, fragment) = split_reference(href);
        let context = self.context();

        let Some(externals) = self.externals else {
            warn!(href, context = %context, "external reference left unresolved: loading disabled");
            return None;
        };
        let location = locate(self.base_dir, path);
        let table = match externals.get(&location) {
            Some(Ok(_)) => self.external_symbols.get(location.as_str())?,
            Some(Err(err)) => {
                warn!(href, context = %context, error = %err, "external reference left unresolved");
                return None;
            }
            None => {
                warn!(href, context = %context, "external reference was never loaded");
                return None;
            }
        };

        let Some(fragment) = fragment else {
            warn!(href, context = %context, "external reference names no descriptor");
            return None;
        };
        let referent = table.get(fragment);
        if referent.is_none() {
            warn!(href, context = %context, "external document has no descriptor `{fragment}`");
        }
        referent
    }

    fn context(&self) -> String {
        if self.chain.is_empty() {
            "alps".to_string()
        } else {
            self.chain.join(" > ")
        }
    }
}

fn fill_missing<T: Clone>(local: &mut Option<T>, referent: Option<&T>) {
    if local.is_none() {
        *local = referent.cloned();
    }
}
