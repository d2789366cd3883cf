//! Dead-store detection: assignments and initialized declarations whose
//! value can never be observed.
//!
//! Each block is rescanned independently, last-executed element first,
//! starting from the block's converged live-out set. Scanning in the same
//! direction as the solver keeps "read afterwards, inside or beyond this
//! block" a single set-membership question.

use std::collections::HashSet;

use sable_hir::body::{Body, ExprId, ExprKind, NodeRef, StmtKind, VarId};
use sable_types::{Diagnostic, Span};

use crate::cfg::Cfg;
use crate::diagnostics::{diagnostic, FlowDiagnosticKind};
use crate::liveness::LiveVariables;

/// Reports every dead store in `cfg`, each block's findings in execution
/// order.
#[must_use]
pub fn find_dead_stores(body: &Body, cfg: &Cfg, live: &LiveVariables) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for block in cfg.blocks() {
        let mut live_now: HashSet<VarId> = live.live_out(block.id()).clone();
        let mut assignment_targets: HashSet<ExprId> = HashSet::new();
        let mut findings: Vec<Diagnostic> = Vec::new();

        for &element in block.elements().iter().rev() {
            match element {
                NodeRef::Expr(expr) => match &body.expr(expr).kind {
                    ExprKind::Assign { target, .. } => {
                        if let ExprKind::Ident(var) = &body.expr(*target).kind {
                            let data = body.var(*var);
                            if data.scope.is_method_local() && !live_now.contains(var) {
                                findings.push(dead_store(element.span(body), &data.name));
                            }
                            assignment_targets.insert(*target);
                            live_now.remove(var);
                        }
                    }
                    ExprKind::Ident(var) => {
                        if !assignment_targets.contains(&expr)
                            && body.var(*var).scope.is_method_local()
                        {
                            live_now.insert(*var);
                        }
                    }
                    _ => {}
                },
                NodeRef::Stmt(stmt) => {
                    if let StmtKind::VarDecl { var, initializer } = &body.stmt(stmt).kind {
                        if initializer.is_some() && !live_now.contains(var) {
                            findings.push(dead_store(element.span(body), &body.var(*var).name));
                        }
                        live_now.remove(var);
                    }
                }
            }
        }

        // Collected while scanning backward; emit in execution order.
        findings.reverse();
        diagnostics.extend(findings);
    }

    diagnostics
}

fn dead_store(span: Span, name: &str) -> Diagnostic {
    diagnostic(
        FlowDiagnosticKind::DeadStore,
        Some(span),
        format!("Remove this useless assignment to local variable \"{name}\"."),
    )
}
