//! Flow analysis for method bodies: control-flow graph construction,
//! live-variable dataflow, and dead-store detection.

mod cfg;
mod dead_store;
mod diagnostics;
mod error;
mod flow;
mod liveness;

pub use crate::cfg::{Block, BlockId, Cfg};
pub use crate::dead_store::find_dead_stores;
pub use crate::diagnostics::{FlowConfig, FlowDiagnosticKind};
pub use crate::error::FlowError;
pub use crate::flow::{analyze, FlowAnalysisResult};
pub use crate::liveness::LiveVariables;
