//! Generic element-to-object mapping for ALPS XML.
//!
//! Attributes become string keys, `descriptor` and `link` children are always
//! collected into arrays (even a single one), `doc` becomes `{"value": ...}`,
//! and text-only elements such as `<title>` become plain strings.

use alps_core::{AlpsError, SourceFormat};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};

/// Child element names that are always materialized as arrays.
const ARRAY_ELEMENTS: &[&str] = &["descriptor", "link"];

/// Elements that are always objects, even when empty.
const OBJECT_ELEMENTS: &[&str] = &["alps", "descriptor", "link", "doc"];

#[derive(Debug)]
struct Frame {
    name: String,
    attributes: Map<String, Value>,
    children: Vec<(String, Value)>,
    text: String,
}

/// Parse XML text into the same JSON shape the JSON front end produces.
pub fn parse_xml_value(input: &str) -> Result<Value, AlpsError> {
    let mut reader = Reader::from_str(input.trim_start_matches('\u{feff}'));
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|err| syntax_error(&reader, &err.to_string()))?;

        match event {
            Event::Start(start) => {
                ensure_single_root(&reader, root.is_some())?;
                stack.push(open_frame(&reader, &start)?);
            }
            Event::Empty(start) => {
                ensure_single_root(&reader, root.is_some())?;
                let frame = open_frame(&reader, &start)?;
                close_frame(frame, &mut stack, &mut root);
            }
            Event::End(_) => {
                let Some(frame) = stack.pop() else {
                    return Err(syntax_error(&reader, "unexpected closing tag"));
                };
                close_frame(frame, &mut stack, &mut root);
            }
            Event::Text(text) => {
                let raw = String::from_utf8_lossy(text.as_ref());
                let decoded = unescape(&raw)
                    .map_err(|err| syntax_error(&reader, &err.to_string()))?;
                append_text(&reader, &mut stack, &decoded)?;
            }
            Event::CData(data) => {
                let raw = String::from_utf8_lossy(data.as_ref()).into_owned();
                append_text(&reader, &mut stack, &raw)?;
            }
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(syntax_error(
            &reader,
            &format!("unexpected end of input inside <{}>", open.name),
        ));
    }

    root.ok_or_else(|| syntax_error(&reader, "no root element found"))
}

fn open_frame(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Result<Frame, AlpsError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = Map::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|err| syntax_error(reader, &err.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|err| syntax_error(reader, &err.to_string()))?
            .into_owned();
        attributes.insert(key, Value::String(value));
    }

    Ok(Frame {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn close_frame(frame: Frame, stack: &mut Vec<Frame>, root: &mut Option<Value>) {
    let name = frame.name.clone();
    let value = frame_to_value(frame);
    match stack.last_mut() {
        Some(parent) => parent.children.push((name, value)),
        None => {
            let mut wrapper = Map::new();
            wrapper.insert(name, value);
            *root = Some(Value::Object(wrapper));
        }
    }
}

fn frame_to_value(frame: Frame) -> Value {
    let Frame {
        name,
        attributes,
        children,
        text,
    } = frame;

    let always_object = OBJECT_ELEMENTS.contains(&name.as_str());
    if !always_object && attributes.is_empty() && children.is_empty() {
        return Value::String(text);
    }

    let mut object = attributes;
    if name == "doc" || !text.is_empty() {
        object.insert("value".to_string(), Value::String(text));
    }

    for (child_name, child_value) in children {
        if ARRAY_ELEMENTS.contains(&child_name.as_str()) {
            let slot = object
                .entry(child_name)
                .or_insert_with(|| Value::Array(Vec::new()));
            match slot {
                Value::Array(items) => items.push(child_value),
                // An attribute with the same name was already there; keep both.
                other => {
                    let previous = other.take();
                    *other = Value::Array(vec![previous, child_value]);
                }
            }
            continue;
        }

        match object.get_mut(&child_name) {
            None => {
                object.insert(child_name, child_value);
            }
            Some(Value::Array(items)) => items.push(child_value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, child_value]);
            }
        }
    }

    Value::Object(object)
}

fn append_text(
    reader: &Reader<&[u8]>,
    stack: &mut [Frame],
    text: &str,
) -> Result<(), AlpsError> {
    match stack.last_mut() {
        Some(frame) => {
            if !frame.text.is_empty() {
                frame.text.push(' ');
            }
            frame.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(syntax_error(reader, "text outside of the root element")),
    }
}

fn ensure_single_root(reader: &Reader<&[u8]>, root_closed: bool) -> Result<(), AlpsError> {
    if root_closed {
        return Err(syntax_error(reader, "multiple root elements"));
    }
    Ok(())
}

fn syntax_error(reader: &Reader<&[u8]>, message: &str) -> AlpsError {
    AlpsError::syntax(
        SourceFormat::Xml,
        format!("{message} (byte {})", reader.buffer_position()),
    )
}
