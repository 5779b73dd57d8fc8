use alps_core::{Alps, AlpsDocument, AlpsError, Descriptor, Doc, Link};
use serde_json::{Map, Value};

/// Normalize a syntax-level value into a typed document.
///
/// Returns the document plus warnings for every shape problem that was
/// smoothed over. Only a missing `alps` root or an unusable `descriptor`
/// collection is fatal.
pub fn build_document(value: &Value) -> Result<(AlpsDocument, Vec<String>), AlpsError> {
    let Some(root) = value.as_object().and_then(|map| map.get("alps")) else {
        return Err(AlpsError::MissingAlps);
    };
    let Some(root) = root.as_object() else {
        return Err(AlpsError::InvalidDescriptors {
            path: "alps".to_string(),
            message: "must be an object".to_string(),
        });
    };

    let mut warnings = Vec::new();
    let alps = Alps {
        version: scalar_string(root.get("version"), "alps.version", &mut warnings),
        title: text_field(root.get("title"), "alps.title", &mut warnings),
        doc: doc_field(root.get("doc"), "alps.doc", &mut warnings),
        link: links(root.get("link"), "alps.link", &mut warnings),
        descriptor: descriptors(root.get("descriptor"), "alps.descriptor", &mut warnings)?,
    };

    Ok((AlpsDocument { alps }, warnings))
}

fn descriptors(
    value: Option<&Value>,
    path: &str,
    warnings: &mut Vec<String>,
) -> Result<Vec<Descriptor>, AlpsError> {
    let entries: Vec<&Value> = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => {
            warnings.push(format!("{path} is a single object; treated as a one-element list"));
            vec![single]
        }
        Some(_) => {
            return Err(AlpsError::InvalidDescriptors {
                path: path.to_string(),
                message: "must be an array of descriptor objects".to_string(),
            });
        }
    };

    let mut out = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let entry_path = format!("{path}[{index}]");
        match entry.as_object() {
            Some(object) => out.push(descriptor(object, &entry_path, warnings)?),
            None => warnings.push(format!("{entry_path} is not an object; skipped")),
        }
    }
    Ok(out)
}

fn descriptor(
    object: &Map<String, Value>,
    path: &str,
    warnings: &mut Vec<String>,
) -> Result<Descriptor, AlpsError> {
    let field = |key: &str, warnings: &mut Vec<String>| {
        text_field(object.get(key), &format!("{path}.{key}"), warnings)
    };

    Ok(Descriptor {
        id: field("id", warnings),
        href: field("href", warnings),
        kind: field("type", warnings),
        name: field("name", warnings),
        title: field("title", warnings),
        doc: doc_field(object.get("doc"), &format!("{path}.doc"), warnings),
        rt: field("rt", warnings),
        rel: field("rel", warnings),
        tag: tag_field(object.get("tag"), &format!("{path}.tag"), warnings),
        def: field("def", warnings),
        descriptor: descriptors(
            object.get("descriptor"),
            &format!("{path}.descriptor"),
            warnings,
        )?,
    })
}

/// Strings pass through; an XML element carrying attributes contributes its
/// text `value`. Anything else is dropped with a warning.
fn text_field(value: Option<&Value>, path: &str, warnings: &mut Vec<String>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Null => None,
        Value::Object(object) => match object.get("value") {
            Some(Value::String(text)) => Some(text.clone()),
            _ => {
                warnings.push(format!("{path} is an object without text; ignored"));
                None
            }
        },
        other => {
            warnings.push(format!(
                "{path} must be a string, found {}; ignored",
                kind_name(other)
            ));
            None
        }
    }
}

/// Like [`text_field`] but numbers are accepted, e.g. `"version": 1.0`.
fn scalar_string(value: Option<&Value>, path: &str, warnings: &mut Vec<String>) -> Option<String> {
    match value {
        Some(Value::Number(number)) => Some(number.to_string()),
        other => text_field(other, path, warnings),
    }
}

fn tag_field(value: Option<&Value>, path: &str, warnings: &mut Vec<String>) -> Option<String> {
    match value {
        Some(Value::Array(items)) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            warnings.push(format!("{path} is an array; joined into a space-separated string"));
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(" "))
            }
        }
        other => text_field(other, path, warnings),
    }
}

fn doc_field(value: Option<&Value>, path: &str, warnings: &mut Vec<String>) -> Option<Doc> {
    match value? {
        Value::String(text) => Some(Doc::text(text.clone())),
        Value::Null => None,
        Value::Object(object) => {
            let value = match object.get("value") {
                Some(Value::String(text)) => text.clone(),
                Some(other) => {
                    warnings.push(format!(
                        "{path}.value must be a string, found {}; ignored",
                        kind_name(other)
                    ));
                    String::new()
                }
                None => String::new(),
            };
            Some(Doc {
                value,
                format: text_field(object.get("format"), &format!("{path}.format"), warnings),
                href: text_field(object.get("href"), &format!("{path}.href"), warnings),
            })
        }
        other => {
            warnings.push(format!(
                "{path} must be a string or object, found {}; ignored",
                kind_name(other)
            ));
            None
        }
    }
}

fn links(value: Option<&Value>, path: &str, warnings: &mut Vec<String>) -> Vec<Link> {
    let entries: Vec<&Value> = match value {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        Some(other) => {
            warnings.push(format!(
                "{path} must be an array, found {}; ignored",
                kind_name(other)
            ));
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let entry_path = format!("{path}[{index}]");
            let Some(object) = entry.as_object() else {
                warnings.push(format!("{entry_path} is not an object; skipped"));
                return None;
            };
            Some(Link {
                rel: text_field(object.get("rel"), &format!("{entry_path}.rel"), warnings),
                href: text_field(object.get("href"), &format!("{entry_path}.href"), warnings),
                title: text_field(object.get("title"), &format!("{entry_path}.title"), warnings),
            })
        })
        .collect()
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use alps_core::{AlpsError, Doc};
    use serde_json::json;

    use super::build_document;

    #[test]
    fn missing_alps_is_fatal() {
        assert_eq!(build_document(&json!({})), Err(AlpsError::MissingAlps));
        assert_eq!(build_document(&json!([1, 2])), Err(AlpsError::MissingAlps));
    }

    #[test]
    fn missing_descriptor_becomes_empty_list() {
        let (document, warnings) = build_document(&json!({"alps": {"title": "T"}})).expect("ok");
        assert!(document.alps.descriptor.is_empty());
        assert_eq!(document.title(), Some("T"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn scalar_descriptor_collection_is_fatal() {
        let err = build_document(&json!({"alps": {"descriptor": "oops"}})).expect_err("fatal");
        assert!(matches!(err, AlpsError::InvalidDescriptors { ref path, .. } if path == "alps.descriptor"));

        let nested = json!({"alps": {"descriptor": [{"id": "a", "descriptor": 3}]}});
        let err = build_document(&nested).expect_err("fatal");
        assert!(
            matches!(err, AlpsError::InvalidDescriptors { ref path, .. } if path == "alps.descriptor[0].descriptor")
        );
    }

    #[test]
    fn single_object_is_wrapped() {
        let (document, warnings) =
            build_document(&json!({"alps": {"descriptor": {"id": "Home"}}})).expect("ok");
        assert_eq!(document.alps.descriptor.len(), 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn doc_strings_are_normalized() {
        let value = json!({"alps": {
            "doc": {"format": "html", "value": "<b>hi</b>"},
            "descriptor": [{"id": "Home", "doc": "Landing"}]
        }});
        let (document, _) = build_document(&value).expect("ok");
        assert_eq!(document.alps.descriptor[0].doc, Some(Doc::text("Landing")));
        let top = document.alps.doc.expect("top doc");
        assert_eq!(top.format.as_deref(), Some("html"));
        assert_eq!(top.value, "<b>hi</b>");
    }

    #[test]
    fn shape_problems_warn_instead_of_failing() {
        let value = json!({"alps": {
            "version": 1.0,
            "descriptor": [
                {"id": "a", "tag": ["x", "y"], "title": 7},
                "not-an-object"
            ]
        }});
        let (document, warnings) = build_document(&value).expect("ok");
        assert_eq!(document.alps.version.as_deref(), Some("1.0"));
        assert_eq!(document.alps.descriptor.len(), 1);
        assert_eq!(document.alps.descriptor[0].tag.as_deref(), Some("x y"));
        assert!(document.alps.descriptor[0].title.is_none());
        assert_eq!(warnings.len(), 3, "{warnings:?}");
    }

    #[test]
    fn links_are_collected() {
        let value = json!({"alps": {"link": {"rel": "help", "href": "https://example.com"}}});
        let (document, _) = build_document(&value).expect("ok");
        assert_eq!(document.alps.link.len(), 1);
        assert_eq!(document.alps.link[0].rel.as_deref(), Some("help"));
    }
}
