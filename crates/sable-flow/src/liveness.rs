//! Backward may-be-live analysis over a control-flow graph.
//!
//! A variable is live at a point when some path from that point reads it
//! before writing it. Each block gets a `gen` set (read before any write
//! inside the block) and a `kill` set (written inside the block); the
//! worklist then solves
//!
//! ```text
//! out[B] = union of in[S] over the successors S of B
//! in[B]  = gen[B] ∪ (out[B] − kill[B])
//! ```
//!
//! to a fixpoint. Termination follows from `in` sets growing monotonically
//! inside a finite symbol universe.

use std::collections::{HashSet, VecDeque};
use std::fmt::Write as _;

use sable_hir::body::{Body, ExprId, ExprKind, NodeRef, StmtKind, VarId};
use tracing::{debug, trace};

use crate::cfg::{BlockId, Cfg};
use crate::error::FlowError;

/// Converged per-block live-variable sets, tied to the [`Cfg`] they were
/// computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveVariables {
    live_in: Vec<HashSet<VarId>>,
    live_out: Vec<HashSet<VarId>>,
}

impl LiveVariables {
    pub fn analyze(body: &Body, cfg: &Cfg) -> Result<LiveVariables, FlowError> {
        let block_count = cfg.blocks().len();
        let mut gen_sets: Vec<HashSet<VarId>> = vec![HashSet::new(); block_count];
        let mut kill_sets: Vec<HashSet<VarId>> = vec![HashSet::new(); block_count];

        for block in cfg.blocks() {
            let index = block.id().idx();
            // Assignment targets already seen; the target identifier of an
            // assignment is not a read of the variable.
            let mut assignment_targets: HashSet<ExprId> = HashSet::new();
            for &element in block.elements().iter().rev() {
                match element {
                    NodeRef::Expr(expr) => match &body.expr(expr).kind {
                        ExprKind::Assign { target, .. } => {
                            if let ExprKind::Ident(var) = &body.expr(*target).kind {
                                if let Some(var) = tracked_local(body, *var, *target)? {
                                    assignment_targets.insert(*target);
                                    gen_sets[index].remove(&var);
                                    kill_sets[index].insert(var);
                                }
                            }
                        }
                        ExprKind::Ident(var) => {
                            if !assignment_targets.contains(&expr) {
                                if let Some(var) = tracked_local(body, *var, expr)? {
                                    gen_sets[index].insert(var);
                                }
                            }
                        }
                        _ => {}
                    },
                    NodeRef::Stmt(stmt) => {
                        if let StmtKind::VarDecl { var, initializer } = &body.stmt(stmt).kind {
                            gen_sets[index].remove(var);
                            if initializer.is_some() {
                                kill_sets[index].insert(*var);
                            }
                        }
                    }
                }
            }
        }

        let mut live_in: Vec<HashSet<VarId>> = vec![HashSet::new(); block_count];
        let mut live_out: Vec<HashSet<VarId>> = vec![HashSet::new(); block_count];
        let mut worklist: VecDeque<BlockId> = cfg.blocks().iter().map(|block| block.id()).collect();
        let mut iterations = 0usize;

        while let Some(id) = worklist.pop_front() {
            iterations += 1;
            let index = id.idx();
            let block = cfg.block(id);

            let mut out: HashSet<VarId> = HashSet::new();
            for &successor in block.successors() {
                out.extend(live_in[successor.idx()].iter().copied());
            }

            let mut new_in: HashSet<VarId> = gen_sets[index].clone();
            new_in.extend(out.difference(&kill_sets[index]).copied());
            live_out[index] = out;

            if new_in != live_in[index] {
                live_in[index] = new_in;
                worklist.extend(block.predecessors().iter().copied());
            }
        }
        trace!(blocks = block_count, iterations, "live-variable fixpoint converged");

        // The exit block has no successors, so anything live there means the
        // graph is malformed.
        if !live_out[cfg.exit().idx()].is_empty() {
            return Err(FlowError::ExitLiveOut);
        }
        if !live_in[cfg.entry().idx()].is_empty() {
            // Happens on a parameter read with no prior write; noted for
            // clients interested in first-use information.
            debug!(
                count = live_in[cfg.entry().idx()].len(),
                "entry block live-in is not empty"
            );
        }

        Ok(LiveVariables { live_in, live_out })
    }

    /// Variables that may be read before their next write, seen from the
    /// start of `block`.
    #[must_use]
    pub fn live_in(&self, block: BlockId) -> &HashSet<VarId> {
        &self.live_in[block.idx()]
    }

    /// Same, seen from the end of `block`.
    #[must_use]
    pub fn live_out(&self, block: BlockId) -> &HashSet<VarId> {
        &self.live_out[block.idx()]
    }

    /// Per-block live-out names for debugging; the format is not a
    /// compatibility surface.
    #[must_use]
    pub fn debug_dump(&self, body: &Body, cfg: &Cfg) -> String {
        let mut out = String::new();
        for block in cfg.blocks() {
            let mut names: Vec<&str> = self.live_out[block.id().idx()]
                .iter()
                .map(|&var| body.var(var).name.as_str())
                .collect();
            names.sort_unstable();
            let _ = writeln!(out, "B{} live-out: {}", block.id().idx(), names.join(" "));
        }
        out
    }
}

/// Filters to variables owned by the analyzed method; fields, statics, and
/// captures are never tracked. Errs when a method-local identifier carries a
/// placeholder symbol, since the tree and the symbol table then disagree.
fn tracked_local(body: &Body, var: VarId, at: ExprId) -> Result<Option<VarId>, FlowError> {
    let data = body.var(var);
    if !data.scope.is_method_local() {
        return Ok(None);
    }
    if data.unresolved {
        return Err(FlowError::UnknownSymbol {
            name: data.name.clone(),
            span: body.expr(at).span,
        });
    }
    Ok(Some(var))
}
