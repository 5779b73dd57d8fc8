//! Conflict-aware merging of two profiles.
//!
//! Only top-level descriptors take part: each source descriptor is appended,
//! skipped as a duplicate, or reported as a conflict. Neither input is mutated.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{AlpsDocument, Descriptor};

/// Same id, different content. The base entry is kept untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MergeConflict {
    pub id: String,
    pub base: Descriptor,
    pub source: Descriptor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MergeStats {
    pub added: usize,
    pub skipped: usize,
    pub conflicts: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct MergeResult {
    pub merged: AlpsDocument,
    pub conflicts: Vec<MergeConflict>,
    pub stats: MergeStats,
}

impl MergeResult {
    #[must_use]
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Merge `source` into a copy of `base`.
#[must_use]
pub fn merge_documents(base: &AlpsDocument, source: &AlpsDocument) -> MergeResult {
    let mut merged = base.clone();
    let mut stats = MergeStats::default();
    let mut conflicts = Vec::new();

    let mut index_by_id: FxHashMap<String, usize> = FxHashMap::default();
    for (position, descriptor) in merged.alps.descriptor.iter().enumerate() {
        if let Some(id) = descriptor.id.as_deref() {
            index_by_id.entry(id.to_string()).or_insert(position);
        }
    }

    for incoming in &source.alps.descriptor {
        let Some(id) = incoming.id.as_deref() else {
            merged.alps.descriptor.push(incoming.clone());
            continue;
        };

        match index_by_id.get(id).copied() {
            None => {
                index_by_id.insert(id.to_string(), merged.alps.descriptor.len());
                merged.alps.descriptor.push(incoming.clone());
                stats.added += 1;
            }
            Some(position) => {
                let existing = &merged.alps.descriptor[position];
                if descriptors_equal(existing, incoming) {
                    stats.skipped += 1;
                } else {
                    conflicts.push(MergeConflict {
                        id: id.to_string(),
                        base: existing.clone(),
                        source: incoming.clone(),
                    });
                    stats.conflicts += 1;
                }
            }
        }
    }

    MergeResult {
        merged,
        conflicts,
        stats,
    }
}

fn descriptors_equal(left: &Descriptor, right: &Descriptor) -> bool {
    match (serde_json::to_value(left), serde_json::to_value(right)) {
        (Ok(left), Ok(right)) => canonicalize(&left) == canonicalize(&right),
        _ => left == right,
    }
}

/// Sorted keys, null-valued fields dropped, nested values normalized recursively.
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> = map
                .iter()
                .filter(|(_, entry)| !entry.is_null())
                .map(|(key, entry)| (key, canonicalize(entry)))
                .collect();
            let mut out = Map::new();
            for (key, entry) in sorted {
                out.insert(key.clone(), entry);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
