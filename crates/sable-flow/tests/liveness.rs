//! Solver-level properties: convergence, idempotence, the set equations
//! themselves, and scope filtering across branchy graphs.

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use sable_flow::{Cfg, LiveVariables};
use sable_hir::body::{Body, BodyBuilder, ExprId, ExprKind, StmtId, StmtKind, VarId, VarScope};

fn call_stmt(b: &mut BodyBuilder, callee: VarId, args: Vec<ExprId>) -> StmtId {
    let name = b.expr(ExprKind::Ident(callee));
    let call = b.expr(ExprKind::Call { callee: name, args });
    b.stmt(StmtKind::Expr(call))
}

fn assign_stmt(b: &mut BodyBuilder, var: VarId, value: ExprKind) -> StmtId {
    let target = b.expr(ExprKind::Ident(var));
    let value = b.expr(value);
    let assign = b.expr(ExprKind::Assign { target, value });
    b.stmt(StmtKind::Expr(assign))
}

// int i; if (c) { i = 1; } else { i = 2; } use(i);
fn branchy_body() -> (Body, VarId, VarId) {
    let mut b = BodyBuilder::new();
    let c = b.var("c", VarScope::Param);
    let i = b.var("i", VarScope::Local);
    let use_fn = b.var("use", VarScope::Static);

    let decl = b.stmt(StmtKind::VarDecl {
        var: i,
        initializer: None,
    });
    let cond = b.expr(ExprKind::Ident(c));
    let assign_then = assign_stmt(&mut b, i, ExprKind::Int(1));
    let then_block = b.stmt(StmtKind::Block(vec![assign_then]));
    let assign_else = assign_stmt(&mut b, i, ExprKind::Int(2));
    let else_block = b.stmt(StmtKind::Block(vec![assign_else]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: Some(else_block),
    });
    let read = b.expr(ExprKind::Ident(i));
    let use_call = call_stmt(&mut b, use_fn, vec![read]);
    let root = b.stmt(StmtKind::Block(vec![decl, if_stmt, use_call]));
    (b.finish(root), c, i)
}

/// `out[B]` must equal the union of `in[S]` over successors after
/// convergence.
fn assert_out_equation(cfg: &Cfg, live: &LiveVariables) {
    for block in cfg.blocks() {
        let mut expected: HashSet<VarId> = HashSet::new();
        for &successor in block.successors() {
            expected.extend(live.live_in(successor).iter().copied());
        }
        assert_eq!(
            live.live_out(block.id()),
            &expected,
            "out equation violated for B{}",
            block.id().idx()
        );
    }
}

#[test]
fn both_branches_keep_the_merged_read_alive() {
    let (body, c, i) = branchy_body();
    let cfg = Cfg::build(&body).unwrap();
    let live = LiveVariables::analyze(&body, &cfg).unwrap();

    // Both branch blocks feed the read after the merge.
    let entry = cfg.block(cfg.entry());
    for &branch in entry.successors() {
        assert_eq!(live.live_out(branch), &HashSet::from([i]));
        assert_eq!(live.live_in(branch), &HashSet::new());
    }

    // The condition read makes the parameter live on entry.
    assert_eq!(live.live_in(cfg.entry()), &HashSet::from([c]));
    assert_eq!(live.live_out(cfg.exit()), &HashSet::new());
    assert_out_equation(&cfg, &live);
}

#[test]
fn reanalyzing_a_converged_graph_changes_nothing() {
    let (body, _, _) = branchy_body();
    let cfg = Cfg::build(&body).unwrap();
    let first = LiveVariables::analyze(&body, &cfg).unwrap();
    let second = LiveVariables::analyze(&body, &cfg).unwrap();
    assert_eq!(first, second);
    assert_out_equation(&cfg, &first);
}

#[test]
fn statics_and_enclosing_variables_are_invisible_to_the_solver() {
    // counter = 1; if (c) { use(counter); } use(captured);
    let mut b = BodyBuilder::new();
    let c = b.var("c", VarScope::Param);
    let counter = b.var("counter", VarScope::Static);
    let captured = b.var("captured", VarScope::Enclosing);
    let use_fn = b.var("use", VarScope::Static);

    let assign = assign_stmt(&mut b, counter, ExprKind::Int(1));
    let cond = b.expr(ExprKind::Ident(c));
    let read_counter = b.expr(ExprKind::Ident(counter));
    let use_counter = call_stmt(&mut b, use_fn, vec![read_counter]);
    let then_block = b.stmt(StmtKind::Block(vec![use_counter]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: cond,
        then_branch: then_block,
        else_branch: None,
    });
    let read_captured = b.expr(ExprKind::Ident(captured));
    let use_captured = call_stmt(&mut b, use_fn, vec![read_captured]);
    let root = b.stmt(StmtKind::Block(vec![assign, if_stmt, use_captured]));
    let body = b.finish(root);

    let cfg = Cfg::build(&body).unwrap();
    let live = LiveVariables::analyze(&body, &cfg).unwrap();
    for block in cfg.blocks() {
        assert!(!live.live_in(block.id()).contains(&counter));
        assert!(!live.live_out(block.id()).contains(&counter));
        assert!(!live.live_in(block.id()).contains(&captured));
        assert!(!live.live_out(block.id()).contains(&captured));
    }
}

#[test]
fn liveness_propagates_through_short_circuit_operands() {
    // int i = 0; if (c && use(i)) { use(i); }
    let mut b = BodyBuilder::new();
    let c = b.var("c", VarScope::Param);
    let i = b.var("i", VarScope::Local);
    let use_fn = b.var("use", VarScope::Static);

    let zero = b.expr(ExprKind::Int(0));
    let decl = b.stmt(StmtKind::VarDecl {
        var: i,
        initializer: Some(zero),
    });

    let lhs = b.expr(ExprKind::Ident(c));
    let rhs_callee = b.expr(ExprKind::Ident(use_fn));
    let rhs_arg = b.expr(ExprKind::Ident(i));
    let rhs = b.expr(ExprKind::Call {
        callee: rhs_callee,
        args: vec![rhs_arg],
    });
    let and = b.expr(ExprKind::Binary {
        op: sable_hir::body::BinaryOp::AndAnd,
        lhs,
        rhs,
    });

    let then_read = b.expr(ExprKind::Ident(i));
    let then_call = call_stmt(&mut b, use_fn, vec![then_read]);
    let then_block = b.stmt(StmtKind::Block(vec![then_call]));
    let if_stmt = b.stmt(StmtKind::If {
        condition: and,
        then_branch: then_block,
        else_branch: None,
    });
    let root = b.stmt(StmtKind::Block(vec![decl, if_stmt]));
    let body = b.finish(root);

    let cfg = Cfg::build(&body).unwrap();
    let live = LiveVariables::analyze(&body, &cfg).unwrap();

    // The initializer's value is read on the right-operand path, so `i` is
    // live out of the declaration block.
    assert!(live.live_out(cfg.entry()).contains(&i));
    assert_out_equation(&cfg, &live);
}
