use sable_types::{Diagnostic, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDiagnosticKind {
    DeadStore,
}

#[derive(Debug, Clone, Copy)]
pub struct FlowConfig {
    /// Report assignments and initialized declarations whose value is never
    /// read.
    pub report_dead_stores: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            report_dead_stores: true,
        }
    }
}

pub(crate) fn diagnostic(kind: FlowDiagnosticKind, span: Option<Span>, message: String) -> Diagnostic {
    match kind {
        FlowDiagnosticKind::DeadStore => Diagnostic::warning("FLOW_DEAD_STORE", message, span),
    }
}
