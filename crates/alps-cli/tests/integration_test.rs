//! Integration tests for the alps2dot pipeline.
//!
//! These tests drive profile text through parse, validation, resolution,
//! graph building and DOT rendering, and check the merge interface.

use std::fs;

use alps_cli::{ConvertOptions, convert};
use alps_core::{AlpsDocument, Descriptor, IssueCode, SourceFormat, merge_documents};
use alps_graph::build_model;
use alps_parser::parse;
use alps_resolver::{ResolverConfig, resolve_local};
use alps_validate::validate_source;
use proptest::prelude::*;
use serde_json::{Value, json};
use tempfile::tempdir;

const PARENT_HOME: &str = r##"{
    "alps": {
        "title": "Parent and home",
        "descriptor": [
            {"id": "Home"},
            {"id": "Parent", "descriptor": [{"id": "goHome", "type": "safe", "rt": "#Home"}]}
        ]
    }
}"##;

fn local_options() -> ConvertOptions {
    ConvertOptions {
        resolve_external: false,
        ..ConvertOptions::default()
    }
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(future)
}

fn edge_statements<'a>(dot: &'a str, from: &str, to: &str) -> Vec<&'a str> {
    let prefix = format!("{from} -> {to}");
    dot.lines()
        .map(str::trim)
        .filter(|line| line.starts_with(&prefix))
        .collect()
}

/// A safe transition nested in a state produces a colored edge to its target.
#[tokio::test]
async fn nested_transition_renders_colored_edge() {
    let conversion = convert(PARENT_HOME, None, &local_options())
        .await
        .expect("convert");

    assert!(conversion.validation.is_valid);
    let edges = edge_statements(&conversion.dot, "Parent", "Home");
    assert_eq!(edges.len(), 1, "dot:\n{}", conversion.dot);
    assert!(edges[0].contains("#00A86B"));
    assert!(edges[0].contains("goHome"));
    assert!(conversion.dot.contains("label=\"Parent and home\""));
}

/// Two transitions between the same pair of nodes share one edge statement.
#[tokio::test]
async fn parallel_transitions_are_grouped() {
    let input = r##"{"alps": {"title": "Posts", "descriptor": [
        {"id": "Home"},
        {"id": "Parent", "descriptor": [
            {"id": "goHome", "type": "safe", "rt": "#Home"},
            {"id": "doReset", "type": "unsafe", "rt": "#Home"}
        ]}
    ]}}"##;
    let conversion = convert(input, None, &local_options())
        .await
        .expect("convert");

    let edges = edge_statements(&conversion.dot, "Parent", "Home");
    assert_eq!(edges.len(), 1, "dot:\n{}", conversion.dot);
    assert!(edges[0].contains("<table"));
    assert!(edges[0].contains("#00A86B"));
    assert!(edges[0].contains("#FF4136"));
    assert!(edges[0].find("goHome") < edges[0].find("doReset"));
    assert_eq!(conversion.stats.edges, 1);
    assert_eq!(conversion.stats.grouped_edges, 1);
}

/// Referencing a transition and nesting it yield the same link.
#[tokio::test]
async fn reference_and_nested_transition_agree() {
    let referenced = r##"{"alps": {"descriptor": [
        {"id": "Home"},
        {"id": "goHome", "type": "safe", "rt": "#Home", "title": "Go home"},
        {"id": "Parent", "descriptor": [{"href": "#goHome"}]}
    ]}}"##;
    let nested = r##"{"alps": {"descriptor": [
        {"id": "Home"},
        {"id": "Parent", "descriptor": [{"id": "goHome", "type": "safe", "rt": "#Home", "title": "Go home"}]}
    ]}}"##;

    let by_reference = convert(referenced, None, &local_options())
        .await
        .expect("convert referenced");
    let by_nesting = convert(nested, None, &local_options())
        .await
        .expect("convert nested");

    assert_eq!(by_reference.model.links, by_nesting.model.links);
    assert_eq!(
        edge_statements(&by_reference.dot, "Parent", "Home"),
        edge_statements(&by_nesting.dot, "Parent", "Home")
    );
}

#[tokio::test]
async fn xml_and_json_profiles_render_identically() {
    let xml = r##"<?xml version="1.0" encoding="UTF-8"?>
<alps version="1.0">
  <title>Parent and home</title>
  <descriptor id="Home"/>
  <descriptor id="Parent">
    <descriptor id="goHome" type="safe" rt="#Home"/>
  </descriptor>
</alps>"##;

    let from_xml = convert(xml, None, &local_options())
        .await
        .expect("convert xml");
    let from_json = convert(PARENT_HOME, None, &local_options())
        .await
        .expect("convert json");

    assert_eq!(from_xml.format, SourceFormat::Xml);
    assert_eq!(from_xml.model, from_json.model);
    assert_eq!(from_xml.dot, from_json.dot);
}

/// A dangling fragment is reported once, at the referencing descriptor.
#[test]
fn dangling_reference_reports_one_e004() {
    let input = r##"{"alps": {"title": "t", "descriptor": [
        {"id": "Home", "descriptor": [{"href": "#Nowhere"}]}
    ]}}"##;
    let result = validate_source(input, None).expect("parse");

    let e004: Vec<_> = result
        .errors
        .iter()
        .filter(|issue| issue.code == IssueCode::E004)
        .collect();
    assert_eq!(e004.len(), 1);
    assert!(e004[0].path.starts_with("alps.descriptor[0].descriptor[0]"));
    assert!(!result.is_valid);
}

/// An array tag is a single finding, never a failure.
#[tokio::test]
async fn array_tag_is_one_e011() {
    let input = r#"{"alps": {"title": "t", "descriptor": [{"id": "Home", "tag": ["a", "b"]}]}}"#;
    let result = validate_source(input, None).expect("parse");
    assert_eq!(result.count_code(IssueCode::E011), 1);
    assert_eq!(result.errors.len(), 1);

    let conversion = convert(input, None, &local_options())
        .await
        .expect("convert");
    assert_eq!(conversion.validation.count_code(IssueCode::E011), 1);
    assert!(!conversion.warnings.is_empty());
}

/// A missing descriptor list stops validation after the fatal finding.
#[test]
fn missing_descriptor_list_is_single_e009() {
    let result = validate_source(r#"{"alps": {}}"#, None).expect("parse");
    assert!(!result.is_valid);
    assert_eq!(result.counts().total(), 1);
    assert_eq!(result.errors[0].code, IssueCode::E009);
}

fn sample_document() -> AlpsDocument {
    parse(
        r##"{"alps": {"title": "Blog", "descriptor": [
            {"id": "Home", "descriptor": [{"href": "#goBlog"}]},
            {"id": "goBlog", "type": "safe", "rt": "#Blog"},
            {"id": "Blog", "descriptor": [{"id": "body", "type": "semantic"}]},
            {"href": "#body"}
        ]}}"##,
        None,
    )
    .expect("parse")
    .document
}

#[test]
fn merging_with_empty_profile_changes_nothing() {
    let base = sample_document();
    let empty = AlpsDocument::new(Vec::new());

    let result = merge_documents(&base, &empty);
    assert_eq!(result.merged, base);
    assert_eq!(result.stats.added, 0);
    assert_eq!(result.stats.skipped, 0);
    assert_eq!(result.stats.conflicts, 0);
    assert!(result.conflicts.is_empty());
}

#[test]
fn merging_profile_with_itself_skips_every_id() {
    let base = sample_document();
    let id_bearing = base
        .alps
        .descriptor
        .iter()
        .filter(|descriptor| descriptor.id.is_some())
        .count();

    let result = merge_documents(&base, &base);
    assert_eq!(result.stats.added, 0);
    assert_eq!(result.stats.conflicts, 0);
    assert_eq!(result.stats.skipped, id_bearing);
}

#[test]
fn merge_reports_conflicts_and_keeps_base() {
    let base = sample_document();
    let mut changed = Descriptor::with_id("Blog");
    changed.title = Some("Changed".to_string());
    let source = AlpsDocument::new(vec![changed, Descriptor::with_id("About")]);

    let result = merge_documents(&base, &source);
    assert_eq!(result.stats.added, 1);
    assert_eq!(result.stats.conflicts, 1);
    assert_eq!(result.conflicts[0].id, "Blog");
    let kept = result
        .merged
        .alps
        .descriptor
        .iter()
        .find(|descriptor| descriptor.id.as_deref() == Some("Blog"))
        .expect("base Blog kept");
    assert_eq!(kept.title, None);
}

/// External references load from disk relative to the base directory.
#[tokio::test]
async fn resolves_external_file_reference() {
    let dir = tempdir().expect("tempdir");
    fs::write(
        dir.path().join("shared.json"),
        r##"{"alps": {"descriptor": [
            {"id": "goShared", "type": "safe", "rt": "#Shared", "title": "Shared"}
        ]}}"##,
    )
    .expect("write shared profile");

    let input = r##"{"alps": {"title": "Main", "descriptor": [
        {"id": "Home", "descriptor": [
            {"href": "shared.json#goShared"},
            {"href": "shared.json#goShared"}
        ]},
        {"id": "Shared"}
    ]}}"##;
    let options = ConvertOptions {
        resolver: ResolverConfig {
            base_dir: Some(dir.path().to_path_buf()),
            ..ResolverConfig::default()
        },
        ..ConvertOptions::default()
    };

    let conversion = convert(input, None, &options).await.expect("convert");
    assert_eq!(conversion.report.loaded, 1);
    assert_eq!(conversion.report.failed, 0);
    assert_eq!(conversion.report.unresolved, 0);
    assert_eq!(edge_statements(&conversion.dot, "Home", "Shared").len(), 1);
}

/// One unreadable external profile leaves the rest of the diagram intact.
#[tokio::test]
async fn failed_external_load_keeps_siblings() {
    let dir = tempdir().expect("tempdir");
    let input = r##"{"alps": {"title": "Main", "descriptor": [
        {"id": "Home", "descriptor": [
            {"href": "missing.json#goAway"},
            {"id": "goAbout", "type": "safe", "rt": "#About"}
        ]},
        {"id": "About"}
    ]}}"##;
    let options = ConvertOptions {
        resolver: ResolverConfig {
            base_dir: Some(dir.path().to_path_buf()),
            ..ResolverConfig::default()
        },
        ..ConvertOptions::default()
    };

    let conversion = convert(input, None, &options).await.expect("convert");
    assert_eq!(conversion.report.failed, 1);
    assert_eq!(conversion.report.unresolved, 1);
    assert_eq!(edge_statements(&conversion.dot, "Home", "About").len(), 1);
}

/// A state referenced before its definition still renders its data fields.
#[tokio::test]
async fn forward_reference_keeps_definition_fields() {
    let input = r##"{"alps": {"title": "Blog", "descriptor": [
        {"id": "Index", "descriptor": [{"href": "#BlogPosting"}, {"href": "#goBlog"}]},
        {"id": "BlogPosting", "descriptor": [
            {"href": "#articleBody"},
            {"href": "#dateCreated"},
            {"id": "goIndex", "type": "safe", "rt": "#Index"}
        ]},
        {"id": "goBlog", "type": "safe", "rt": "#BlogPosting"},
        {"id": "articleBody"},
        {"id": "dateCreated"}
    ]}}"##;
    let conversion = convert(input, None, &local_options())
        .await
        .expect("convert");

    let declaration = conversion
        .dot
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("BlogPosting ["))
        .expect("BlogPosting declared");
    assert!(declaration.contains("shape=plain"), "dot:\n{}", conversion.dot);
    assert!(declaration.contains(">articleBody<"));
    assert!(declaration.contains(">dateCreated<"));
}

#[test]
fn rendering_is_deterministic() {
    let first = block_on(convert(PARENT_HOME, None, &local_options())).expect("first");
    let second = block_on(convert(PARENT_HOME, None, &local_options())).expect("second");
    assert_eq!(first.dot, second.dot);
}

/// Nested profile whose descriptors all carry distinct ids.
fn unique_id_profile() -> impl Strategy<Value = Value> {
    prop::collection::vec(prop::collection::vec(any::<bool>(), 0..4), 1..6).prop_map(|shape| {
        let mut counter = 0;
        let descriptors: Vec<Value> = shape
            .into_iter()
            .map(|children| {
                counter += 1;
                let parent = format!("state{counter}");
                let nested: Vec<Value> = children
                    .into_iter()
                    .map(|is_field| {
                        counter += 1;
                        if is_field {
                            json!({"id": format!("field{counter}"), "type": "semantic"})
                        } else {
                            json!({"id": format!("goStep{counter}"), "type": "safe", "rt": "#state1"})
                        }
                    })
                    .collect();
                json!({"id": parent, "descriptor": nested})
            })
            .collect();
        json!({"alps": {"title": "Generated", "descriptor": descriptors}})
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn unique_ids_yield_one_node_each(profile in unique_id_profile()) {
        let text = profile.to_string();
        let parsed = parse(&text, None).expect("parse");
        let model = build_model(&resolve_local(&parsed.document));
        prop_assert_eq!(model.nodes.len(), parsed.document.descriptor_count());
    }

    #[test]
    fn arbitrary_text_never_panics(text in "\\PC{0,64}") {
        let _ = parse(&text, None);
        let _ = validate_source(&text, None);
    }
}
