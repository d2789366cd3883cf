//! Entry point tying the flow analyses together for one method body.

use sable_hir::body::Body;
use sable_types::Diagnostic;

use crate::cfg::Cfg;
use crate::dead_store::find_dead_stores;
use crate::diagnostics::FlowConfig;
use crate::error::FlowError;
use crate::liveness::LiveVariables;

#[derive(Debug)]
pub struct FlowAnalysisResult {
    pub cfg: Cfg,
    pub live_variables: LiveVariables,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs the full pipeline: CFG construction, live-variable dataflow, and the
/// reports enabled in `config`.
///
/// A driver analyzing many methods should skip the method on errors where
/// [`FlowError::is_internal`] is false and escalate the rest.
pub fn analyze(body: &Body, config: FlowConfig) -> Result<FlowAnalysisResult, FlowError> {
    let cfg = Cfg::build(body)?;
    let live_variables = LiveVariables::analyze(body, &cfg)?;

    let mut diagnostics = Vec::new();
    if config.report_dead_stores {
        diagnostics.extend(find_dead_stores(body, &cfg, &live_variables));
    }

    Ok(FlowAnalysisResult {
        cfg,
        live_variables,
        diagnostics,
    })
}
