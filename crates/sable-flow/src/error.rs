use sable_types::Span;
use thiserror::Error;

/// Failure modes of the flow analyses.
///
/// Precondition violations mean the analyzed method cannot be handled; a
/// driver skips that method and moves on. Internal violations mean the graph
/// or its symbol information is inconsistent, so no result derived from it
/// can be trusted; a driver must surface those instead of swallowing them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// The method has no body to analyze (abstract or native declaration).
    #[error("cannot build a control-flow graph for a method without a body")]
    MissingBody,

    /// A `break` statement appeared with no enclosing break target.
    #[error("`break` statement outside of a switch")]
    BreakOutsideTarget { span: Span },

    /// An identifier with method-local scope carries a placeholder symbol,
    /// i.e. the tree and its symbol table disagree.
    #[error("local variable `{name}` is unknown")]
    UnknownSymbol { name: String, span: Span },

    /// The exit block's live-out set was not empty after convergence.
    #[error("live-out of the exit block is not empty after convergence")]
    ExitLiveOut,
}

impl FlowError {
    /// True for defects in this core or its collaborators, false for
    /// per-method precondition violations.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        match self {
            FlowError::MissingBody | FlowError::BreakOutsideTarget { .. } => false,
            FlowError::UnknownSymbol { .. } | FlowError::ExitLiveOut => true,
        }
    }
}
