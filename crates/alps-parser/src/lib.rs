#![forbid(unsafe_code)]

mod doc_builder;
mod json_parser;
mod xml_parser;

use alps_core::{AlpsDocument, AlpsError, SourceFormat};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::debug;

pub use doc_builder::build_document;
pub use json_parser::parse_json_value;
pub use xml_parser::parse_xml_value;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub document: AlpsDocument,
    pub format: SourceFormat,
    /// Method used to pick the front end
    pub detection_method: DetectionMethod,
    /// Recoverable shape problems smoothed over during normalization
    pub warnings: Vec<String>,
}

/// Method used to detect the input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DetectionMethod {
    /// Caller supplied the format
    Hint,
    /// First non-whitespace character was `{`, `[` or `<`
    LeadingCharacter,
    /// Unrecognised leading character; assumed JSON
    Fallback,
}

impl DetectionMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Hint => "format hint",
            Self::LeadingCharacter => "leading character",
            Self::Fallback => "fallback to json",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DetectedFormat {
    pub format: SourceFormat,
    pub method: DetectionMethod,
}

/// Pick a front end from the first non-whitespace character, or honor `hint`.
pub fn detect_format(
    input: &str,
    hint: Option<SourceFormat>,
) -> Result<DetectedFormat, AlpsError> {
    let trimmed = input.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.is_empty() {
        return Err(AlpsError::EmptyInput);
    }

    if let Some(format) = hint {
        return Ok(DetectedFormat {
            format,
            method: DetectionMethod::Hint,
        });
    }

    let detected = match trimmed.chars().next() {
        Some('{' | '[') => DetectedFormat {
            format: SourceFormat::Json,
            method: DetectionMethod::LeadingCharacter,
        },
        Some('<') => DetectedFormat {
            format: SourceFormat::Xml,
            method: DetectionMethod::LeadingCharacter,
        },
        _ => DetectedFormat {
            format: SourceFormat::Json,
            method: DetectionMethod::Fallback,
        },
    };
    Ok(detected)
}

/// Syntax-level parse into the JSON shape shared by both formats.
///
/// Does not require an `alps` root; this is the input the validator inspects.
pub fn parse_value(input: &str, hint: Option<SourceFormat>) -> Result<Value, AlpsError> {
    let detected = detect_format(input, hint)?;
    match detected.format {
        SourceFormat::Json => parse_json_value(input),
        SourceFormat::Xml => parse_xml_value(input),
    }
}

/// Parse and normalize into a typed document.
///
/// Fails with [`AlpsError::MissingAlps`] when the input has no `alps` root.
pub fn parse(input: &str, hint: Option<SourceFormat>) -> Result<ParseResult, AlpsError> {
    let detected = detect_format(input, hint)?;
    let value = match detected.format {
        SourceFormat::Json => parse_json_value(input)?,
        SourceFormat::Xml => parse_xml_value(input)?,
    };

    let (document, warnings) = build_document(&value)?;
    debug!(
        format = detected.format.as_str(),
        method = detected.method.as_str(),
        descriptors = document.descriptor_count(),
        warnings = warnings.len(),
        "parsed ALPS profile"
    );

    Ok(ParseResult {
        document,
        format: detected.format,
        detection_method: detected.method,
        warnings,
    })
}

#[must_use]
pub fn parse_evidence_json(parsed: &ParseResult) -> String {
    json!({
        "format": parsed.format.as_str(),
        "detection_method": parsed.detection_method.as_str(),
        "title": parsed.document.title(),
        "top_level_descriptor_count": parsed.document.alps.descriptor.len(),
        "descriptor_count": parsed.document.descriptor_count(),
        "link_count": parsed.document.alps.link.len(),
        "warning_count": parsed.warnings.len(),
        "warnings": parsed.warnings.clone(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use alps_core::{AlpsError, SourceFormat};
    use proptest::prelude::*;

    use super::{DetectionMethod, detect_format, parse, parse_evidence_json, parse_value};

    const JSON_PROFILE: &str = r##"{
        "alps": {
            "title": "Blog",
            "descriptor": [
                {"id": "Home", "descriptor": [{"href": "#goBlog"}]},
                {"id": "goBlog", "type": "safe", "rt": "#Blog"},
                {"id": "Blog"}
            ]
        }
    }"##;

    const XML_PROFILE: &str = r##"<?xml version="1.0"?>
<alps version="1.0">
  <title>Blog</title>
  <descriptor id="Home">
    <descriptor href="#goBlog"/>
  </descriptor>
  <descriptor id="goBlog" type="safe" rt="#Blog"/>
  <descriptor id="Blog"/>
</alps>"##;

    #[test]
    fn detects_format_from_leading_character() {
        let json = detect_format("  {\"alps\":{}}", None).expect("detect");
        assert_eq!(json.format, SourceFormat::Json);
        assert_eq!(json.method, DetectionMethod::LeadingCharacter);

        let xml = detect_format("\n<alps/>", None).expect("detect");
        assert_eq!(xml.format, SourceFormat::Xml);

        let array = detect_format("[1]", None).expect("detect");
        assert_eq!(array.format, SourceFormat::Json);
    }

    #[test]
    fn hint_overrides_detection() {
        let detected = detect_format("{}", Some(SourceFormat::Xml)).expect("detect");
        assert_eq!(detected.format, SourceFormat::Xml);
        assert_eq!(detected.method, DetectionMethod::Hint);
    }

    #[test]
    fn empty_input_is_a_typed_error() {
        assert_eq!(detect_format("   \n", None), Err(AlpsError::EmptyInput));
        assert_eq!(parse("", None), Err(AlpsError::EmptyInput));
    }

    #[test]
    fn json_and_xml_produce_the_same_document() {
        let from_json = parse(JSON_PROFILE, None).expect("json parses");
        let from_xml = parse(XML_PROFILE, None).expect("xml parses");

        assert_eq!(from_json.format, SourceFormat::Json);
        assert_eq!(from_xml.format, SourceFormat::Xml);
        assert_eq!(
            from_json.document.alps.descriptor,
            from_xml.document.alps.descriptor
        );
        assert_eq!(from_xml.document.title(), Some("Blog"));
        assert_eq!(from_xml.document.alps.version.as_deref(), Some("1.0"));
    }

    #[test]
    fn missing_alps_root_fails() {
        assert_eq!(parse(r#"{"profile": {}}"#, None), Err(AlpsError::MissingAlps));
        assert_eq!(parse("<profile/>", None), Err(AlpsError::MissingAlps));
    }

    #[test]
    fn parse_value_does_not_require_alps() {
        let value = parse_value(r#"{"profile": {}}"#, None).expect("syntax is fine");
        assert!(value.get("alps").is_none());
    }

    #[test]
    fn syntax_errors_are_typed() {
        let err = parse("{\"alps\": ", None).expect_err("truncated json");
        assert!(matches!(
            err,
            AlpsError::Syntax {
                format: SourceFormat::Json,
                ..
            }
        ));

        let err = parse("<alps><descriptor></alps>", None).expect_err("mismatched xml");
        assert!(matches!(
            err,
            AlpsError::Syntax {
                format: SourceFormat::Xml,
                ..
            }
        ));
    }

    #[test]
    fn evidence_json_contains_counts_and_format() {
        let parsed = parse(JSON_PROFILE, None).expect("parse");
        let evidence = parse_evidence_json(&parsed);
        assert!(evidence.contains("\"format\":\"json\""));
        assert!(evidence.contains("\"descriptor_count\":4"));
        assert!(evidence.contains("\"top_level_descriptor_count\":3"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_parse_is_total(input in ".{0,256}") {
            // Any input yields a document or a typed error; never a panic.
            let _ = parse(&input, None);
            let _ = parse(&input, Some(SourceFormat::Xml));
        }

        #[test]
        fn prop_detection_is_deterministic(input in ".{0,64}") {
            let first = detect_format(&input, None);
            let second = detect_format(&input, None);
            prop_assert_eq!(first, second);
        }
    }
}
