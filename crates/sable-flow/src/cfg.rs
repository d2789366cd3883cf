//! Control-flow graph of basic blocks over one method body.
//!
//! The graph is an arena of blocks addressed by dense ids; successor and
//! predecessor lists store ids rather than references, so shared merge
//! points (and loops, once supported) cannot form ownership cycles. The
//! builder walks statements in reverse source order, threading the
//! "where does control go next" block through the recursion: every new block
//! can be wired to its already-built successor immediately, and no second
//! backward pass is needed.

use std::fmt;
use std::fmt::Write as _;

use sable_hir::body::{BinaryOp, Body, CaseGroup, ExprId, ExprKind, NodeRef, StmtId, StmtKind};
use tracing::trace;

use crate::error::FlowError;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);

impl BlockId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        BlockId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlockId({})", self.0)
    }
}

/// A basic block: a straight-line run of tree nodes with no internal
/// branching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    id: BlockId,
    elements: Vec<NodeRef>,
    terminator: Option<NodeRef>,
    successors: Vec<BlockId>,
    predecessors: Vec<BlockId>,
}

impl Block {
    #[must_use]
    pub fn id(&self) -> BlockId {
        self.id
    }

    /// Nodes executed inside this block, in forward execution order.
    #[must_use]
    pub fn elements(&self) -> &[NodeRef] {
        &self.elements
    }

    /// The node that decides how control leaves this block, when the exit is
    /// not an unconditional fall-through.
    #[must_use]
    pub fn terminator(&self) -> Option<NodeRef> {
        self.terminator
    }

    /// Successor order is semantic: for a conditional branch, index 0 is the
    /// true/taken edge and index 1 the false/fall-through edge; for a switch
    /// head, one edge per case group in source order.
    #[must_use]
    pub fn successors(&self) -> &[BlockId] {
        &self.successors
    }

    #[must_use]
    pub fn predecessors(&self) -> &[BlockId] {
        &self.predecessors
    }
}

/// The block graph of one method body, immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cfg {
    blocks: Vec<Block>,
    entry: BlockId,
}

impl Cfg {
    /// Builds the graph for `body`.
    ///
    /// Fails with [`FlowError::MissingBody`] for abstract/native declarations
    /// and with [`FlowError::BreakOutsideTarget`] when a `break` has no
    /// enclosing target.
    pub fn build(body: &Body) -> Result<Cfg, FlowError> {
        let root = body.root().ok_or(FlowError::MissingBody)?;
        let mut builder = CfgBuilder::new(body);
        builder.build_stmt(root)?;
        Ok(builder.finish())
    }

    /// The block control enters first.
    #[must_use]
    pub fn entry(&self) -> BlockId {
        self.entry
    }

    /// The method-exit block. Always id 0, always without successors.
    #[must_use]
    pub fn exit(&self) -> BlockId {
        BlockId::from_raw(0)
    }

    #[must_use]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.idx()]
    }

    /// All blocks, in creation order. Consumers should address blocks by id
    /// and edges, not by position in this slice.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Multi-line textual rendering for debugging; the format is not a
    /// compatibility surface.
    #[must_use]
    pub fn debug_dump(&self, body: &Body) -> String {
        let mut out = String::new();
        for block in self.blocks.iter().rev() {
            if block.id == self.exit() {
                let _ = writeln!(out, "B{} (Exit):", block.id.idx());
            } else if block.id == self.entry {
                let _ = writeln!(out, "B{} (Entry):", block.id.idx());
            } else {
                let _ = writeln!(out, "B{}:", block.id.idx());
            }
            for (i, &element) in block.elements.iter().enumerate() {
                let _ = writeln!(out, "  {i}: {}", node_label(body, element));
            }
            if let Some(terminator) = block.terminator {
                let _ = writeln!(out, "  T: {}", node_label(body, terminator));
            }
            if !block.successors.is_empty() {
                let _ = write!(out, "  Successors:");
                for successor in &block.successors {
                    let _ = write!(out, " B{}", successor.idx());
                }
                let _ = writeln!(out);
            }
        }
        out
    }
}

fn node_label(body: &Body, node: NodeRef) -> String {
    match node {
        NodeRef::Stmt(stmt) => match &body.stmt(stmt).kind {
            StmtKind::VarDecl { var, .. } => format!("VarDecl {}", body.var(*var).name),
            StmtKind::If { .. } => "If".to_string(),
            StmtKind::Switch { .. } => "Switch".to_string(),
            StmtKind::Break => "Break".to_string(),
            StmtKind::Return(_) => "Return".to_string(),
            StmtKind::Block(_) | StmtKind::Expr(_) | StmtKind::Empty | StmtKind::Other => {
                "Stmt".to_string()
            }
        },
        NodeRef::Expr(expr) => match &body.expr(expr).kind {
            ExprKind::Ident(var) => format!("Ident {}", body.var(*var).name),
            ExprKind::Assign { .. } => "Assign".to_string(),
            ExprKind::Binary { op, .. } => format!("{op:?}"),
            ExprKind::Conditional { .. } => "Conditional".to_string(),
            ExprKind::Call { .. } => "Call".to_string(),
            ExprKind::FieldAccess { name, .. } => format!("FieldAccess {name}"),
            ExprKind::Paren(_) => "Paren".to_string(),
            ExprKind::Null => "Null".to_string(),
            ExprKind::Bool(value) => format!("Bool {value}"),
            ExprKind::Int(value) => format!("Int {value}"),
            ExprKind::String(_) => "String".to_string(),
            ExprKind::Other => "Expr".to_string(),
        },
    }
}

/// Block under construction: elements accumulate in reverse execution order
/// and are flipped once at [`CfgBuilder::finish`].
#[derive(Debug, Default)]
struct BlockData {
    elements: Vec<NodeRef>,
    terminator: Option<NodeRef>,
    successors: Vec<BlockId>,
}

struct CfgBuilder<'a> {
    body: &'a Body,
    blocks: Vec<BlockData>,
    /// The block statements currently under construction prepend into; also
    /// the "successor so far" for everything built earlier in source order.
    current: BlockId,
    break_targets: Vec<BlockId>,
}

impl<'a> CfgBuilder<'a> {
    fn new(body: &'a Body) -> Self {
        let mut builder = CfgBuilder {
            body,
            blocks: Vec::new(),
            current: BlockId::from_raw(0),
            break_targets: Vec::new(),
        };
        let exit = builder.new_block();
        builder.current = builder.new_block_to(exit);
        builder
    }

    fn exit(&self) -> BlockId {
        BlockId::from_raw(0)
    }

    fn new_block(&mut self) -> BlockId {
        let id = BlockId::from_raw(self.blocks.len() as u32);
        self.blocks.push(BlockData::default());
        id
    }

    fn new_block_to(&mut self, successor: BlockId) -> BlockId {
        let id = self.new_block();
        self.blocks[id.idx()].successors.push(successor);
        id
    }

    fn jump_to(&mut self, terminator: NodeRef, target: BlockId) -> BlockId {
        let id = self.new_block();
        self.blocks[id.idx()].terminator = Some(terminator);
        self.blocks[id.idx()].successors.push(target);
        id
    }

    fn branch_to(&mut self, terminator: NodeRef, true_block: BlockId, false_block: BlockId) -> BlockId {
        let id = self.new_block();
        self.blocks[id.idx()].terminator = Some(terminator);
        self.blocks[id.idx()].successors.push(true_block);
        self.blocks[id.idx()].successors.push(false_block);
        id
    }

    fn push_element(&mut self, node: NodeRef) {
        self.blocks[self.current.idx()].elements.push(node);
    }

    fn build_stmt(&mut self, stmt: StmtId) -> Result<(), FlowError> {
        match &self.body.stmt(stmt).kind {
            StmtKind::Block(stmts) => {
                for &inner in stmts.iter().rev() {
                    self.build_stmt(inner)?;
                }
            }

            StmtKind::Expr(expr) => self.build_expr(*expr)?,

            StmtKind::VarDecl { initializer, .. } => {
                self.push_element(NodeRef::Stmt(stmt));
                if let Some(initializer) = initializer {
                    self.build_expr(*initializer)?;
                }
            }

            StmtKind::Return(value) => {
                self.current = self.jump_to(NodeRef::Stmt(stmt), self.exit());
                if let Some(value) = value {
                    self.build_expr(*value)?;
                }
            }

            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let next = self.current;
                let mut else_block = next;
                if let Some(else_stmt) = else_branch {
                    // An else-if wires its own branch block in directly.
                    if !matches!(self.body.stmt(*else_stmt).kind, StmtKind::If { .. }) {
                        self.current = self.new_block_to(next);
                    }
                    self.build_stmt(*else_stmt)?;
                    else_block = self.current;
                }
                self.current = self.new_block_to(next);
                self.build_stmt(*then_branch)?;
                let then_block = self.current;
                self.current = self.branch_to(NodeRef::Stmt(stmt), then_block, else_block);
                self.build_condition(*condition, then_block, else_block)?;
            }

            StmtKind::Switch { scrutinee, cases } => {
                self.build_switch(stmt, *scrutinee, cases)?;
            }

            StmtKind::Break => {
                let target = self.break_targets.last().copied().ok_or_else(|| {
                    FlowError::BreakOutsideTarget {
                        span: self.body.stmt(stmt).span,
                    }
                })?;
                self.current = self.jump_to(NodeRef::Stmt(stmt), target);
            }

            StmtKind::Empty | StmtKind::Other => {}
        }
        Ok(())
    }

    fn build_switch(
        &mut self,
        stmt: StmtId,
        scrutinee: ExprId,
        cases: &[CaseGroup],
    ) -> Result<(), FlowError> {
        let switch_successor = self.current;
        let head = self.new_block();
        self.blocks[head.idx()].terminator = Some(NodeRef::Stmt(stmt));
        self.current = head;
        self.build_expr(scrutinee)?;

        self.current = self.new_block_to(switch_successor);
        self.break_targets.push(switch_successor);
        for (index, case) in cases.iter().enumerate() {
            for &inner in case.body.iter().rev() {
                self.build_stmt(inner)?;
            }
            let case_entry = self.current;
            self.blocks[head.idx()].successors.push(case_entry);
            // The first case group keeps falling through from the switch head
            // directly; every later one gets its own predecessor block.
            if index != 0 {
                self.current = self.new_block_to(case_entry);
            }
        }
        self.break_targets.pop();

        self.current = head;
        Ok(())
    }

    fn build_expr(&mut self, expr: ExprId) -> Result<(), FlowError> {
        match &self.body.expr(expr).kind {
            ExprKind::Ident(_) => self.push_element(NodeRef::Expr(expr)),

            ExprKind::Assign { value, .. } => {
                self.push_element(NodeRef::Expr(expr));
                self.build_expr(*value)?;
            }

            ExprKind::Binary {
                op: BinaryOp::EqEq | BinaryOp::NotEq,
                lhs,
                rhs,
            } => {
                self.push_element(NodeRef::Expr(expr));
                self.build_expr(*rhs)?;
                self.build_expr(*lhs)?;
            }

            // In value position a short-circuit operator still branches: the
            // right operand is only on the path its truth value selects.
            ExprKind::Binary {
                op: BinaryOp::AndAnd,
                lhs,
                rhs,
            } => {
                let false_block = self.current;
                self.current = self.new_block_to(false_block);
                self.build_expr(*rhs)?;
                let true_block = self.current;
                self.current = self.branch_to(NodeRef::Expr(expr), true_block, false_block);
                self.build_expr(*lhs)?;
            }

            ExprKind::Binary {
                op: BinaryOp::OrOr,
                lhs,
                rhs,
            } => {
                let true_block = self.current;
                self.current = self.new_block_to(true_block);
                self.build_expr(*rhs)?;
                let false_block = self.current;
                self.current = self.branch_to(NodeRef::Expr(expr), true_block, false_block);
                self.build_expr(*lhs)?;
            }

            ExprKind::Conditional {
                condition,
                then_expr,
                else_expr,
            } => {
                let next = self.current;
                self.current = self.new_block_to(next);
                self.build_expr(*else_expr)?;
                let else_block = self.current;
                self.current = self.new_block_to(next);
                self.build_expr(*then_expr)?;
                let then_block = self.current;
                self.current = self.branch_to(NodeRef::Expr(expr), then_block, else_block);
                self.build_condition(*condition, then_block, else_block)?;
            }

            ExprKind::Call { callee, args } => {
                self.push_element(NodeRef::Expr(expr));
                self.build_expr(*callee)?;
                for &arg in args.iter().rev() {
                    self.build_expr(arg)?;
                }
            }

            ExprKind::FieldAccess { receiver, .. } => {
                self.push_element(NodeRef::Expr(expr));
                self.build_expr(*receiver)?;
            }

            ExprKind::Paren(inner) => self.build_expr(*inner)?,

            ExprKind::Null
            | ExprKind::Bool(_)
            | ExprKind::Int(_)
            | ExprKind::String(_)
            | ExprKind::Other => {}
        }
        Ok(())
    }

    /// Condition position: short-circuit operators split into nested
    /// branches whose edges land on `true_block`/`false_block` instead of
    /// producing a value.
    fn build_condition(
        &mut self,
        condition: ExprId,
        true_block: BlockId,
        false_block: BlockId,
    ) -> Result<(), FlowError> {
        match &self.body.expr(condition).kind {
            ExprKind::Binary {
                op: BinaryOp::OrOr,
                lhs,
                rhs,
            } => {
                self.build_condition(*rhs, true_block, false_block)?;
                let false_block = self.current;
                self.current = self.branch_to(NodeRef::Expr(condition), true_block, false_block);
                self.build_condition(*lhs, true_block, false_block)?;
            }

            ExprKind::Binary {
                op: BinaryOp::AndAnd,
                lhs,
                rhs,
            } => {
                self.build_condition(*rhs, true_block, false_block)?;
                let true_block = self.current;
                self.current = self.branch_to(NodeRef::Expr(condition), true_block, false_block);
                self.build_condition(*lhs, true_block, false_block)?;
            }

            ExprKind::Paren(inner) => self.build_condition(*inner, true_block, false_block)?,

            _ => self.build_expr(condition)?,
        }
        Ok(())
    }

    fn finish(self) -> Cfg {
        let entry = self.current;
        let mut blocks: Vec<Block> = self
            .blocks
            .into_iter()
            .enumerate()
            .map(|(index, mut data)| {
                data.elements.reverse();
                Block {
                    id: BlockId::from_raw(index as u32),
                    elements: data.elements,
                    terminator: data.terminator,
                    successors: data.successors,
                    predecessors: Vec::new(),
                }
            })
            .collect();

        for index in 0..blocks.len() {
            let from = BlockId::from_raw(index as u32);
            let successors = blocks[index].successors.clone();
            for successor in successors {
                blocks[successor.idx()].predecessors.push(from);
            }
        }

        trace!(blocks = blocks.len(), entry = entry.idx(), "built control-flow graph");
        Cfg { blocks, entry }
    }
}
