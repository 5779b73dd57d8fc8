#![forbid(unsafe_code)]

//! Rule engine for ALPS profiles.
//!
//! Works on the syntax-level value so shapes the typed document normalizes
//! away (array tags, missing roots) are still visible. Only a missing `alps`
//! root (E008) or a missing/non-array `alps.descriptor` (E009) stops
//! evaluation; everything else is collected in one pass.

mod rules;

use alps_core::{
    AlpsDocument, AlpsError, IssueCode, SourceFormat, ValidationIssue, ValidationResult,
};
use serde_json::Value;
use tracing::debug;

use crate::rules::RuleContext;

#[must_use]
pub fn validate(value: &Value) -> ValidationResult {
    let Some(alps) = value.as_object().and_then(|root| root.get("alps")) else {
        return fatal(IssueCode::E008, "document has no top-level `alps`", "alps");
    };
    let Some(alps) = alps.as_object() else {
        return fatal(IssueCode::E008, "`alps` must be an object", "alps");
    };
    let Some(descriptors) = alps.get("descriptor").and_then(Value::as_array) else {
        let message = if alps.contains_key("descriptor") {
            "`alps.descriptor` must be an array"
        } else {
            "`alps.descriptor` is missing"
        };
        return fatal(IssueCode::E009, message, "alps.descriptor");
    };

    let mut context = RuleContext::new(descriptors);
    if !alps
        .get("title")
        .and_then(Value::as_str)
        .is_some_and(|title| !title.trim().is_empty())
    {
        context.issues.push(ValidationIssue::new(
            IssueCode::W001,
            "profile has no title",
            "alps.title",
        ));
    }
    context.check_list(descriptors, "alps.descriptor");

    let result = ValidationResult::from_issues(context.issues);
    let counts = result.counts();
    debug!(
        errors = counts.errors,
        warnings = counts.warnings,
        suggestions = counts.suggestions,
        "validated profile"
    );
    result
}

/// Parse `input` at syntax level and validate it. Only unparsable syntax is
/// an `Err`; a missing `alps` root is reported as E008.
pub fn validate_source(
    input: &str,
    hint: Option<SourceFormat>,
) -> Result<ValidationResult, AlpsError> {
    let value = alps_parser::parse_value(input, hint)?;
    Ok(validate(&value))
}

/// Validate an already typed document. Shapes removed by normalization
/// cannot be reported from here.
#[must_use]
pub fn validate_document(document: &AlpsDocument) -> ValidationResult {
    match serde_json::to_value(document) {
        Ok(value) => validate(&value),
        Err(err) => fatal(IssueCode::E008, err.to_string(), "alps"),
    }
}

fn fatal(code: IssueCode, message: impl Into<String>, path: &str) -> ValidationResult {
    ValidationResult::from_issues([ValidationIssue::new(code, message, path)])
}
