//! Flow-oriented method-body IR.
//!
//! A [`Body`] is an arena of statements and expressions plus the symbol table
//! of every variable-like name the body mentions. Nodes reference each other
//! through copyable ids, so graphs layered on top (like a control-flow graph)
//! can point back into the tree without ownership cycles.

use std::fmt;

use sable_types::Span;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl StmtId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        StmtId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(u32);

impl VarId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        VarId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VarId({})", self.0)
    }
}

/// A handle to either kind of tree node.
///
/// Basic-block element lists and terminators mix statements (a variable
/// declaration, a `return`) with expressions (an identifier, a call), so
/// consumers address them through this common reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Stmt(StmtId),
    Expr(ExprId),
}

impl NodeRef {
    /// Span of the referenced node.
    #[must_use]
    pub fn span(self, body: &Body) -> Span {
        match self {
            NodeRef::Stmt(stmt) => body.stmt(stmt).span,
            NodeRef::Expr(expr) => body.expr(expr).span,
        }
    }
}

/// Owning scope of a symbol referenced from a method body, as classified by
/// the upstream resolver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VarScope {
    /// Parameter of the enclosing method.
    Param,
    /// Local declared inside the method body.
    Local,
    /// Instance member of the enclosing class.
    Field,
    /// Static member.
    Static,
    /// Captured from an enclosing scope (e.g. by a nested class body).
    Enclosing,
}

impl VarScope {
    /// Parameters and body-locals belong to a single invocation of the
    /// method; everything else outlives it.
    #[must_use]
    pub fn is_method_local(self) -> bool {
        matches!(self, VarScope::Param | VarScope::Local)
    }
}

/// Symbol-table entry for one variable-like name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VarData {
    pub name: String,
    pub scope: VarScope,
    /// True when resolution failed upstream and this entry is a placeholder.
    pub unresolved: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExprKind {
    /// A resolved name: a variable read, an assignment target, a callee.
    Ident(VarId),
    /// Simple assignment `target = value`. Compound operators are not
    /// modeled.
    Assign { target: ExprId, value: ExprId },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },
    /// `condition ? then_expr : else_expr`
    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
    },
    Call { callee: ExprId, args: Vec<ExprId> },
    FieldAccess { receiver: ExprId, name: String },
    Paren(ExprId),
    Null,
    Bool(bool),
    Int(i64),
    String(String),
    /// Expression kind the flow core does not model; analyses treat it as an
    /// opaque no-op.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// One `case`/`default` group of a switch: the labels are not modeled, only
/// the statements the group executes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseGroup {
    pub body: Vec<StmtId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StmtKind {
    Block(Vec<StmtId>),
    Expr(ExprId),
    /// Declaration of a body-local, optionally with an initializer.
    VarDecl {
        var: VarId,
        initializer: Option<ExprId>,
    },
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    Switch {
        scrutinee: ExprId,
        cases: Vec<CaseGroup>,
    },
    Break,
    Return(Option<ExprId>),
    /// The empty statement `;`.
    Empty,
    /// Statement kind the flow core does not model (loops, try/catch, ...);
    /// analyses treat it as an opaque no-op.
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// One lowered method/constructor body.
///
/// `root` is `None` for abstract and native declarations, which carry a
/// signature but nothing to analyze.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Body {
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    vars: Vec<VarData>,
    root: Option<StmtId>,
}

impl Body {
    #[must_use]
    pub fn root(&self) -> Option<StmtId> {
        self.root
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.idx()]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.idx()]
    }

    #[must_use]
    pub fn var(&self, id: VarId) -> &VarData {
        &self.vars[id.idx()]
    }

    #[must_use]
    pub fn vars(&self) -> &[VarData] {
        &self.vars
    }
}

/// Incremental constructor for a [`Body`].
///
/// Front ends (and tests) allocate leaves first and wire them into parents,
/// finishing with the root statement.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    stmts: Vec<Stmt>,
    exprs: Vec<Expr>,
    vars: Vec<VarData>,
}

impl BodyBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolved symbol and returns its id.
    pub fn var(&mut self, name: impl Into<String>, scope: VarScope) -> VarId {
        self.push_var(name.into(), scope, false)
    }

    /// Registers a placeholder for a symbol the resolver could not bind.
    pub fn unresolved_var(&mut self, name: impl Into<String>, scope: VarScope) -> VarId {
        self.push_var(name.into(), scope, true)
    }

    fn push_var(&mut self, name: String, scope: VarScope, unresolved: bool) -> VarId {
        let id = VarId::from_raw(self.vars.len() as u32);
        self.vars.push(VarData {
            name,
            scope,
            unresolved,
        });
        id
    }

    pub fn expr(&mut self, kind: ExprKind) -> ExprId {
        self.expr_at(kind, Span::new(0, 0))
    }

    pub fn expr_at(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = ExprId::from_raw(self.exprs.len() as u32);
        self.exprs.push(Expr { kind, span });
        id
    }

    pub fn stmt(&mut self, kind: StmtKind) -> StmtId {
        self.stmt_at(kind, Span::new(0, 0))
    }

    pub fn stmt_at(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let id = StmtId::from_raw(self.stmts.len() as u32);
        self.stmts.push(Stmt { kind, span });
        id
    }

    #[must_use]
    pub fn finish(self, root: StmtId) -> Body {
        Body {
            stmts: self.stmts,
            exprs: self.exprs,
            vars: self.vars,
            root: Some(root),
        }
    }

    /// Finishes a body-less declaration (abstract or native method).
    #[must_use]
    pub fn finish_bodyless(self) -> Body {
        Body {
            stmts: self.stmts,
            exprs: self.exprs,
            vars: self.vars,
            root: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builder_allocates_dense_ids() {
        let mut b = BodyBuilder::new();
        let x = b.var("x", VarScope::Local);
        let lit = b.expr(ExprKind::Int(1));
        let decl = b.stmt(StmtKind::VarDecl {
            var: x,
            initializer: Some(lit),
        });
        let root = b.stmt(StmtKind::Block(vec![decl]));
        let body = b.finish(root);

        assert_eq!(body.root(), Some(root));
        assert_eq!(x.idx(), 0);
        assert_eq!(lit.idx(), 0);
        assert_eq!(decl.idx(), 0);
        assert_eq!(root.idx(), 1);
        assert_eq!(body.var(x).name, "x");
        assert!(body.var(x).scope.is_method_local());
    }

    #[test]
    fn bodyless_declaration_has_no_root() {
        let body = BodyBuilder::new().finish_bodyless();
        assert_eq!(body.root(), None);
    }

    #[test]
    fn node_ref_resolves_spans() {
        let mut b = BodyBuilder::new();
        let x = b.var("x", VarScope::Param);
        let read = b.expr_at(ExprKind::Ident(x), Span::new(7, 8));
        let stmt = b.stmt_at(StmtKind::Expr(read), Span::new(7, 9));
        let body = b.finish(stmt);

        assert_eq!(NodeRef::Expr(read).span(&body), Span::new(7, 8));
        assert_eq!(NodeRef::Stmt(stmt).span(&body), Span::new(7, 9));
    }

    #[test]
    fn scope_classification() {
        assert!(VarScope::Param.is_method_local());
        assert!(VarScope::Local.is_method_local());
        assert!(!VarScope::Field.is_method_local());
        assert!(!VarScope::Static.is_method_local());
        assert!(!VarScope::Enclosing.is_method_local());
    }
}
