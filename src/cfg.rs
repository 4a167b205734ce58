//! Method bodies as control-flow graphs of three-address statements.
//!
//! Statement and value grammars are closed sum types. Control flow is explicit:
//! every statement carries its successor list, computed when the body is built.
//! Exceptional control flow is described by traps: a trap covers a half-open
//! range of statements and routes exceptions of a given class to a handler whose
//! first statement binds the caught exception.

use crate::error::{Error, Result};
use crate::program::{ClassId, FieldId, MethodRef, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Local(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(pub u32);

impl StmtId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for StmtId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constant {
    Int(i64),
    Null,
    Str(String),
}

/// An immediate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Local(Local),
    Const(Constant),
}

impl Operand {
    pub fn int(value: i64) -> Self {
        Operand::Const(Constant::Int(value))
    }

    pub fn str(value: &str) -> Self {
        Operand::Const(Constant::Str(value.to_string()))
    }

    pub fn null() -> Self {
        Operand::Const(Constant::Null)
    }
}

impl From<Local> for Operand {
    fn from(l: Local) -> Self {
        Operand::Local(l)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeKind {
    Virtual(Local),
    Interface(Local),
    Special(Local),
    Static,
    /// Call target computed at runtime. Not supported by the analysis.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeExpr {
    pub kind: InvokeKind,
    pub method: MethodRef,
    pub args: Vec<Operand>,
}

impl InvokeExpr {
    pub fn virtual_call(receiver: Local, method: MethodRef, args: Vec<Operand>) -> Self {
        Self {
            kind: InvokeKind::Virtual(receiver),
            method,
            args,
        }
    }

    pub fn special_call(receiver: Local, method: MethodRef, args: Vec<Operand>) -> Self {
        Self {
            kind: InvokeKind::Special(receiver),
            method,
            args,
        }
    }

    pub fn interface_call(receiver: Local, method: MethodRef, args: Vec<Operand>) -> Self {
        Self {
            kind: InvokeKind::Interface(receiver),
            method,
            args,
        }
    }

    pub fn static_call(method: MethodRef, args: Vec<Operand>) -> Self {
        Self {
            kind: InvokeKind::Static,
            method,
            args,
        }
    }

    pub fn receiver(&self) -> Option<Local> {
        match self.kind {
            InvokeKind::Virtual(l) | InvokeKind::Interface(l) | InvokeKind::Special(l) => Some(l),
            InvokeKind::Static | InvokeKind::Dynamic => None,
        }
    }
}

/// Right-hand sides of assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Use(Operand),
    InstanceField { base: Local, field: FieldId },
    StaticField(FieldId),
    ArrayElem { base: Local, index: Operand },
    New(ClassId),
    NewArray { elem: Type, dims: Vec<Operand> },
    Cast { op: Operand, ty: Type },
    InstanceOf { op: Operand, ty: Type },
    Length(Local),
    Neg(Operand),
    BinOp(Operand, Operand),
    Invoke(InvokeExpr),
}

/// Left-hand sides of assignments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Place {
    Local(Local),
    InstanceField { base: Local, field: FieldId },
    StaticField(FieldId),
    ArrayElem { base: Local, index: Operand },
}

/// Right-hand sides of identity statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityRef {
    This,
    Parameter(usize),
    CaughtException,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Identity { local: Local, value: IdentityRef },
    Assign { place: Place, value: Expr },
    Invoke(InvokeExpr),
    Return(Option<Operand>),
    Throw(Operand),
    If { cond: Operand, target: StmtId },
    Goto(StmtId),
    Switch { key: Operand, targets: Vec<StmtId>, default: StmtId },
    Nop,
}

impl Stmt {
    /// The invocation performed by this statement, if any.
    pub fn invoke_expr(&self) -> Option<&InvokeExpr> {
        match self {
            Stmt::Invoke(e) => Some(e),
            Stmt::Assign {
                value: Expr::Invoke(e),
                ..
            } => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trap {
    /// First covered statement.
    pub begin: StmtId,
    /// First statement after the covered range.
    pub end: StmtId,
    pub handler: StmtId,
    pub exception: ClassId,
}

impl Trap {
    pub fn covers(&self, s: StmtId) -> bool {
        self.begin <= s && s < self.end
    }
}

#[derive(Debug, Clone)]
pub struct LocalDecl {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone)]
pub struct Body {
    locals: Vec<LocalDecl>,
    stmts: Vec<Stmt>,
    lines: Vec<Option<u32>>,
    succs: Vec<Vec<StmtId>>,
    traps: Vec<Trap>,
}

impl Body {
    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }

    pub fn stmt(&self, s: StmtId) -> &Stmt {
        &self.stmts[s.index()]
    }

    pub fn stmts(&self) -> impl Iterator<Item = (StmtId, &Stmt)> + '_ {
        self.stmts
            .iter()
            .enumerate()
            .map(|(i, s)| (StmtId(i as u32), s))
    }

    pub fn line(&self, s: StmtId) -> Option<u32> {
        self.lines[s.index()]
    }

    pub fn local(&self, l: Local) -> &LocalDecl {
        &self.locals[l.0 as usize]
    }

    pub fn locals(&self) -> &[LocalDecl] {
        &self.locals
    }

    /// Entry points of the graph: the first statement.
    pub fn heads(&self) -> Vec<StmtId> {
        if self.stmts.is_empty() {
            Vec::new()
        } else {
            vec![StmtId(0)]
        }
    }

    /// Normal successors. Handlers are only reached through [`traps_at`][Self::traps_at].
    pub fn succs(&self, s: StmtId) -> &[StmtId] {
        &self.succs[s.index()]
    }

    pub fn traps(&self) -> &[Trap] {
        &self.traps
    }

    /// Traps covering a statement, in declaration order.
    pub fn traps_at(&self, s: StmtId) -> impl Iterator<Item = &Trap> + '_ {
        self.traps.iter().filter(move |t| t.covers(s))
    }
}

/// A jump target whose statement may not be known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label(usize);

enum Pending {
    Stmt(Stmt),
    If(Operand, Label),
    Goto(Label),
    Switch(Operand, Vec<Label>, Label),
}

/// Builds a [`Body`] statement by statement.
///
/// Statements fall through to the next one unless they are `goto`, `return`,
/// `throw` or `switch`. Jumps name [`Label`]s that are placed before the target
/// statement is pushed.
///
/// ```
/// use effects_rs::cfg::{BodyBuilder, Operand};
///
/// let mut b = BodyBuilder::new();
/// let head = b.new_label();
/// b.place(head);
/// b.if_(Operand::int(1), head);
/// b.ret(None);
/// let body = b.build().unwrap();
/// assert_eq!(body.len(), 2);
/// ```
#[derive(Default)]
pub struct BodyBuilder {
    locals: Vec<LocalDecl>,
    stmts: Vec<Pending>,
    lines: Vec<Option<u32>>,
    labels: Vec<Option<StmtId>>,
    traps: Vec<(Label, Label, Label, ClassId)>,
    line: Option<u32>,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local(&mut self, name: &str, ty: Type) -> Local {
        self.locals.push(LocalDecl {
            name: name.to_string(),
            ty,
        });
        Local(self.locals.len() as u32 - 1)
    }

    /// Sets the source line attached to subsequently pushed statements.
    pub fn line(&mut self, line: u32) -> &mut Self {
        self.line = Some(line);
        self
    }

    pub fn new_label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Binds the label to the next pushed statement.
    pub fn place(&mut self, label: Label) {
        self.labels[label.0] = Some(StmtId(self.stmts.len() as u32));
    }

    /// A fresh label bound to the next pushed statement.
    pub fn here(&mut self) -> Label {
        let l = self.new_label();
        self.place(l);
        l
    }

    fn push(&mut self, p: Pending) -> StmtId {
        self.stmts.push(p);
        self.lines.push(self.line);
        StmtId(self.stmts.len() as u32 - 1)
    }

    pub fn stmt(&mut self, s: Stmt) -> StmtId {
        self.push(Pending::Stmt(s))
    }

    pub fn identity(&mut self, local: Local, value: IdentityRef) -> StmtId {
        self.stmt(Stmt::Identity { local, value })
    }

    pub fn assign(&mut self, place: Place, value: Expr) -> StmtId {
        self.stmt(Stmt::Assign { place, value })
    }

    pub fn assign_local(&mut self, local: Local, value: Expr) -> StmtId {
        self.assign(Place::Local(local), value)
    }

    pub fn invoke(&mut self, e: InvokeExpr) -> StmtId {
        self.stmt(Stmt::Invoke(e))
    }

    pub fn ret(&mut self, value: Option<Operand>) -> StmtId {
        self.stmt(Stmt::Return(value))
    }

    pub fn throw(&mut self, value: Operand) -> StmtId {
        self.stmt(Stmt::Throw(value))
    }

    pub fn nop(&mut self) -> StmtId {
        self.stmt(Stmt::Nop)
    }

    pub fn if_(&mut self, cond: Operand, target: Label) -> StmtId {
        self.push(Pending::If(cond, target))
    }

    pub fn goto(&mut self, target: Label) -> StmtId {
        self.push(Pending::Goto(target))
    }

    pub fn switch(&mut self, key: Operand, targets: Vec<Label>, default: Label) -> StmtId {
        self.push(Pending::Switch(key, targets, default))
    }

    /// Routes exceptions of class `exception` thrown in `[begin, end)` to `handler`.
    pub fn trap(&mut self, begin: Label, end: Label, handler: Label, exception: ClassId) {
        self.traps.push((begin, end, handler, exception));
    }

    fn resolve(&self, label: Label) -> Result<StmtId> {
        self.labels[label.0].ok_or(Error::UnboundLabel(label.0))
    }

    pub fn build(self) -> Result<Body> {
        let n = self.stmts.len();
        let mut stmts = Vec::with_capacity(n);
        for p in &self.stmts {
            let s = match p {
                Pending::Stmt(s) => s.clone(),
                Pending::If(cond, l) => Stmt::If {
                    cond: cond.clone(),
                    target: self.resolve(*l)?,
                },
                Pending::Goto(l) => Stmt::Goto(self.resolve(*l)?),
                Pending::Switch(key, ls, d) => Stmt::Switch {
                    key: key.clone(),
                    targets: ls.iter().map(|l| self.resolve(*l)).collect::<Result<_>>()?,
                    default: self.resolve(*d)?,
                },
            };
            stmts.push(s);
        }

        let succs = stmts
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let next = StmtId(i as u32 + 1);
                let fallthrough = if i + 1 < n { vec![next] } else { Vec::new() };
                let mut out = match s {
                    Stmt::Goto(t) => vec![*t],
                    Stmt::Return(_) | Stmt::Throw(_) => Vec::new(),
                    Stmt::If { target, .. } => {
                        let mut v = fallthrough;
                        v.push(*target);
                        v
                    }
                    Stmt::Switch {
                        targets, default, ..
                    } => {
                        let mut v = targets.clone();
                        v.push(*default);
                        v
                    }
                    _ => fallthrough,
                };
                out.sort();
                out.dedup();
                out
            })
            .collect();

        let traps = self
            .traps
            .iter()
            .map(|&(b, e, h, exception)| {
                Ok(Trap {
                    begin: self.resolve(b)?,
                    end: self.resolve(e)?,
                    handler: self.resolve(h)?,
                    exception,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Body {
            locals: self.locals,
            stmts,
            lines: self.lines,
            succs,
            traps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_successors() {
        let mut b = BodyBuilder::new();
        let exit = b.new_label();
        let head = b.here();
        b.if_(Operand::int(0), exit); // 0
        b.nop(); // 1
        b.goto(head); // 2
        b.place(exit);
        b.ret(None); // 3
        let body = b.build().unwrap();

        assert_eq!(body.succs(StmtId(0)), &[StmtId(1), StmtId(3)]);
        assert_eq!(body.succs(StmtId(1)), &[StmtId(2)]);
        assert_eq!(body.succs(StmtId(2)), &[StmtId(0)]);
        assert!(body.succs(StmtId(3)).is_empty());
        assert_eq!(body.heads(), vec![StmtId(0)]);
    }

    #[test]
    fn test_unbound_label() {
        let mut b = BodyBuilder::new();
        let nowhere = b.new_label();
        b.goto(nowhere);
        assert!(matches!(b.build(), Err(Error::UnboundLabel(0))));
    }

    #[test]
    fn test_traps_and_lines() {
        let mut b = BodyBuilder::new();
        let e = b.local("e", Type::Ref(ClassId(0)));
        let begin = b.here();
        b.line(10).nop(); // 0
        let end = b.here();
        b.line(11).ret(None); // 1
        let handler = b.here();
        b.line(12).identity(e, IdentityRef::CaughtException); // 2
        b.ret(None); // 3
        b.trap(begin, end, handler, ClassId(0));
        let body = b.build().unwrap();

        assert_eq!(body.traps_at(StmtId(0)).count(), 1);
        assert_eq!(body.traps_at(StmtId(1)).count(), 0);
        assert_eq!(body.line(StmtId(0)), Some(10));
        assert_eq!(body.line(StmtId(3)), Some(12));
        assert_eq!(body.local(e).name, "e");
    }

    #[test]
    fn test_invoke_expr_of_assignment() {
        let mref = MethodRef::new(ClassId(0), crate::program::SigId(0), true);
        let mut b = BodyBuilder::new();
        let x = b.local("x", Type::Ref(ClassId(0)));
        b.assign_local(x, Expr::Invoke(InvokeExpr::static_call(mref, vec![])));
        let body = b.build().unwrap();
        let e = body.stmt(StmtId(0)).invoke_expr().unwrap();
        assert_eq!(e.method, mref);
        assert_eq!(e.receiver(), None);
    }
}
