#![forbid(unsafe_code)]

//! Flattens a resolved descriptor tree into the node/link graph the DOT
//! generator renders.
//!
//! Nodes are emitted for every resolved descriptor. A defining descriptor
//! wins over references to it wherever they appear; between duplicate
//! definitions the first one wins.
//! Links come from transitions attached to a parent, either by reference
//! (`{"href": "#goHome"}`) or nested inline (`{"id": "goHome", "type": "safe"}`).
//! Which nodes are drawn is decided by the generator, not here.

mod builder;

use alps_core::{InternalModel, ResolvedDocument};
use tracing::debug;

use crate::builder::GraphBuilder;

/// Pure function of the resolved document; no state survives between calls.
#[must_use]
pub fn build_model(resolved: &ResolvedDocument<'_>) -> InternalModel {
    let mut builder = GraphBuilder::new(resolved);
    for descriptor in &resolved.descriptors {
        builder.visit(descriptor);
    }
    let model = builder.finish();
    debug!(
        nodes = model.nodes.len(),
        links = model.links.len(),
        "built graph model"
    );
    model
}
