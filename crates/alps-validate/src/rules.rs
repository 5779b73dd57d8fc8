//! Per-descriptor rules. Every rule runs on every descriptor; nothing here
//! short-circuits.

use alps_core::{DescriptorType, IssueCode, ValidationIssue};
use rustc_hash::FxHashSet;
use serde_json::{Map, Value};

pub(crate) struct RuleContext<'v> {
    /// Every string id in the document, collected before any rule runs so
    /// forward references are legal.
    ids: FxHashSet<&'v str>,
    pub(crate) issues: Vec<ValidationIssue>,
}

impl<'v> RuleContext<'v> {
    pub(crate) fn new(descriptors: &'v [Value]) -> Self {
        let mut ids = FxHashSet::default();
        collect_ids(descriptors, &mut ids);
        Self {
            ids,
            issues: Vec::new(),
        }
    }

    pub(crate) fn check_list(&mut self, descriptors: &'v [Value], path: &str) {
        let mut sibling_ids: FxHashSet<&str> = FxHashSet::default();

        for (index, entry) in descriptors.iter().enumerate() {
            let entry_path = format!("{path}[{index}]");
            let Some(descriptor) = entry.as_object() else {
                self.push(IssueCode::E001, "descriptor must be an object", &entry_path, None);
                continue;
            };

            let id = descriptor.get("id").and_then(Value::as_str);
            if let Some(id) = id {
                if !sibling_ids.insert(id) {
                    self.push(
                        IssueCode::E005,
                        format!("id `{id}` is already used by a sibling descriptor"),
                        &entry_path,
                        Some(id),
                    );
                }
            }

            self.check_descriptor(descriptor, id, &entry_path);

            if let Some(Value::Array(children)) = descriptor.get("descriptor") {
                self.check_list(children, &format!("{entry_path}.descriptor"));
            }
        }
    }

    fn check_descriptor(&mut self, descriptor: &Map<String, Value>, id: Option<&str>, path: &str) {
        let href = descriptor.get("href").and_then(Value::as_str);
        if id.is_none() && href.is_none() {
            self.push(
                IssueCode::E001,
                "descriptor has neither `id` nor `href`",
                path,
                None,
            );
        }

        let kind = match descriptor.get("type") {
            None => None,
            Some(Value::String(kind)) => match DescriptorType::parse(kind) {
                Some(kind) => Some(kind),
                None => {
                    self.push(
                        IssueCode::E003,
                        format!("unknown type `{kind}`"),
                        &format!("{path}.type"),
                        id,
                    );
                    None
                }
            },
            Some(other) => {
                self.push(
                    IssueCode::E003,
                    format!("type must be a string, found {other}"),
                    &format!("{path}.type"),
                    id,
                );
                None
            }
        };

        if let Some(kind) = kind.filter(|kind| kind.is_transition()) {
            self.check_transition(descriptor, kind, id, path);
        }

        if let Some(href) = href {
            self.check_fragment("href", href, id, path);
        }
        if let Some(rt) = descriptor.get("rt").and_then(Value::as_str) {
            self.check_fragment("rt", rt, id, path);
        }

        if let Some(Value::Array(_)) = descriptor.get("tag") {
            self.push(
                IssueCode::E011,
                "tag is an array; use a space-separated string",
                &format!("{path}.tag"),
                id,
            );
        }
    }

    fn check_transition(
        &mut self,
        descriptor: &Map<String, Value>,
        kind: DescriptorType,
        id: Option<&str>,
        path: &str,
    ) {
        let label = id.unwrap_or("(anonymous)");
        if descriptor.get("rt").is_none_or(Value::is_null) {
            self.push(
                IssueCode::E002,
                format!("{} transition `{label}` has no `rt`", kind.as_str()),
                path,
                id,
            );
        }

        if let Some(id) = id {
            match kind {
                DescriptorType::Safe if !has_prefix(id, "go") => self.push(
                    IssueCode::W002,
                    format!("safe transition `{id}` should be named go{}", capitalize(id)),
                    path,
                    Some(id),
                ),
                DescriptorType::Unsafe | DescriptorType::Idempotent if !has_prefix(id, "do") => {
                    self.push(
                        IssueCode::W003,
                        format!(
                            "{} transition `{id}` should be named do{}",
                            kind.as_str(),
                            capitalize(id)
                        ),
                        path,
                        Some(id),
                    );
                }
                _ => {}
            }
        }

        if !descriptor.contains_key("doc") {
            self.push(
                IssueCode::S001,
                format!("transition `{label}` has no doc"),
                path,
                id,
            );
        }
    }

    fn check_fragment(&mut self, field: &str, value: &str, id: Option<&str>, path: &str) {
        let Some(target) = value.strip_prefix('#') else {
            return;
        };
        if !self.ids.contains(target) {
            self.push(
                IssueCode::E004,
                format!("{field} `{value}` does not match any descriptor id"),
                &format!("{path}.{field}"),
                id,
            );
        }
    }

    fn push(&mut self, code: IssueCode, message: impl Into<String>, path: &str, id: Option<&str>) {
        self.issues
            .push(ValidationIssue::new(code, message, path).with_id(id));
    }
}

fn collect_ids<'v>(descriptors: &'v [Value], ids: &mut FxHashSet<&'v str>) {
    for descriptor in descriptors.iter().filter_map(Value::as_object) {
        if let Some(id) = descriptor.get("id").and_then(Value::as_str) {
            ids.insert(id);
        }
        if let Some(Value::Array(children)) = descriptor.get("descriptor") {
            collect_ids(children, ids);
        }
    }
}

/// `goHome` and `go_home` follow the convention; `google` does not.
fn has_prefix(id: &str, prefix: &str) -> bool {
    match id.strip_prefix(prefix) {
        Some(rest) => rest
            .chars()
            .next()
            .is_none_or(|next| next.is_uppercase() || next.is_ascii_digit() || next == '_'),
        None => false,
    }
}

fn capitalize(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
