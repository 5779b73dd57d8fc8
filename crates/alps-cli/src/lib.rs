#![forbid(unsafe_code)]

//! End-to-end conversion from ALPS profile text to DOT source.
//!
//! [`convert`] runs the whole pipeline: detect, parse, validate, resolve,
//! transform, render. Validation findings are returned alongside the
//! diagram; only structural faults abort.

pub mod config;

use alps_core::{
    AlpsDocument, AlpsError, InternalModel, IssueCode, ResolvedDocument, SourceFormat,
    ValidationResult,
};
use alps_graph::build_model;
use alps_parser::{build_document, detect_format, parse_json_value, parse_xml_value};
use alps_render_dot::{DotRenderConfig, DotStats, render_dot_with_stats};
use alps_resolver::{ResolveReport, ResolveSession, ResolverConfig, resolve_local};
use alps_validate::validate;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct ConvertOptions {
    pub render: DotRenderConfig,
    pub resolver: ResolverConfig,
    /// Load documents named by external references. When off, those
    /// references stay unresolved and no I/O happens.
    pub resolve_external: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            render: DotRenderConfig::default(),
            resolver: ResolverConfig::default(),
            resolve_external: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub dot: String,
    pub model: InternalModel,
    pub validation: ValidationResult,
    pub report: ResolveReport,
    pub stats: DotStats,
    pub format: SourceFormat,
    /// Shape problems the parser smoothed over.
    pub warnings: Vec<String>,
}

/// Convert one profile to DOT source.
///
/// # Errors
///
/// Empty input, unparsable syntax, a missing `alps` root, or a missing or
/// non-array `alps.descriptor`.
pub async fn convert(
    input: &str,
    hint: Option<SourceFormat>,
    options: &ConvertOptions,
) -> Result<Conversion, AlpsError> {
    let detected = detect_format(input, hint)?;
    let value = match detected.format {
        SourceFormat::Json => parse_json_value(input)?,
        SourceFormat::Xml => parse_xml_value(input)?,
    };

    let validation = validate(&value);
    fatal_structure(&validation)?;

    let (document, warnings) = build_document(&value)?;

    let (resolved, report) = if options.resolve_external {
        match ResolveSession::new(options.resolver.clone()) {
            Ok(session) => {
                let resolved = session.resolve(&document).await;
                (resolved, session.report())
            }
            Err(err) => {
                warn!(error = %err, "external loading unavailable, resolving locally");
                local_resolution(&document)
            }
        }
    } else {
        local_resolution(&document)
    };

    let model = build_model(&resolved);
    let output = render_dot_with_stats(&model, &options.render);
    debug!(
        format = detected.format.as_str(),
        nodes = model.nodes.len(),
        links = model.links.len(),
        errors = validation.errors.len(),
        "converted profile"
    );

    Ok(Conversion {
        dot: output.source,
        model,
        validation,
        report,
        stats: output.stats,
        format: detected.format,
        warnings,
    })
}

fn local_resolution(document: &AlpsDocument) -> (ResolvedDocument<'_>, ResolveReport) {
    let resolved = resolve_local(document);
    let report = ResolveReport {
        unresolved: resolved.unresolved_count(),
        ..ResolveReport::default()
    };
    (resolved, report)
}

/// Promote the two fatal validator findings to errors.
fn fatal_structure(validation: &ValidationResult) -> Result<(), AlpsError> {
    for issue in &validation.errors {
        match issue.code {
            IssueCode::E008 => return Err(AlpsError::MissingAlps),
            IssueCode::E009 => {
                return Err(AlpsError::InvalidDescriptors {
                    path: issue.path.clone(),
                    message: issue.message.clone(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}
