//! Intraprocedural analysis of terminating behaviour.
//!
//! The fact before a statement is a [`Monad`] of [environments](Environment):
//! every binding of locals to regions that may hold there, weighted by the
//! traces from the method entry that lead to it. Executing a statement in one
//! environment yields an [`Outcome`]: the environments afterwards and what the
//! statement returns or throws, each weighted by the effects of the statement
//! itself. Callees are looked up in the [`ClassTable`], so the results of one
//! pass feed the next round of the interprocedural fixpoint.
//!
//! Exceptions are routed to the handlers of the traps covering the throwing
//! statement. An exception whose class is known is caught by a trap for a
//! superclass and does not escape past it. An exception of unknown class
//! reaches every handler and also escapes.

use std::collections::BTreeMap;

use log::{trace, warn};

use crate::calling_context::Location;
use crate::cfg::{Body, Constant, Expr, IdentityRef, InvokeExpr, InvokeKind, Local, Operand, Place, Stmt, StmtId, Trap};
use crate::class_table::{ClassTable, MethodKind};
use crate::context::AnalysisContext;
use crate::domain::AbstractDomain;
use crate::effect::EffectType;
use crate::error::{Error, Result};
use crate::flow::{solve_forward, ForwardFlow};
use crate::monad::Monad;
use crate::program::{ClassId, MethodRef, Type};
use crate::region::Region;
use crate::tables::{ArrayKey, FieldKey, MethodKey};

/// Regions of the locals at a program point.
pub type Environment = BTreeMap<Local, Region>;

/// Result of executing a statement in one environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Environments after the statement, if it completes normally.
    pub out: Monad<Environment>,
    pub ret: Monad<Region>,
    pub thrown: Monad<Region>,
}

/// Facts leaving a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    /// Environments entering each successor, including exception handlers.
    pub outs: BTreeMap<StmtId, Monad<Environment>>,
    pub ret: Monad<Region>,
    /// Exceptions escaping the method.
    pub thrown: Monad<Region>,
}

pub struct FinitaryAnalysis<'a, 'c> {
    ctx: &'c AnalysisContext<'a>,
    key: MethodKey,
    method: MethodRef,
    body: &'a Body,
    flow_before: Vec<Monad<Environment>>,
}

impl<'a, 'c> FinitaryAnalysis<'a, 'c> {
    /// Analysis of `body`, the body of `method`, for the method table entry `key`.
    ///
    /// `method` differs from `key.method` when the body is inherited or mocked.
    pub fn new(ctx: &'c AnalysisContext<'a>, key: MethodKey, method: MethodRef, body: &'a Body) -> Self {
        Self {
            ctx,
            key,
            method,
            body,
            flow_before: Vec::new(),
        }
    }

    pub fn key(&self) -> &MethodKey {
        &self.key
    }

    pub fn method(&self) -> MethodRef {
        self.method
    }

    pub fn body(&self) -> &'a Body {
        self.body
    }

    /// Environments before `stmt`, as computed by the last [`run`][Self::run].
    pub fn flow_before(&self, stmt: StmtId) -> Monad<Environment> {
        self.flow_before.get(stmt.index()).cloned().unwrap_or_default()
    }

    /// Environments at method entry: nothing is bound.
    pub fn entry_flow(&self) -> Monad<Environment> {
        Monad::pure(self.ctx.domain(), Environment::new())
    }

    /// Runs the dataflow to a fixpoint, joining what the method returns and
    /// throws into the entry of its key.
    pub fn run(&mut self, tables: &mut ClassTable) -> Result<()> {
        let before = {
            let mut flow = Flow {
                analysis: &*self,
                tables,
            };
            solve_forward(&mut flow, self.body)?
        };
        self.flow_before = before;
        Ok(())
    }

    /// [`transition`][Self::transition] followed by joining the returned and
    /// escaping regions into the entry of the key.
    pub fn flow_through(
        &self,
        tables: &mut ClassTable,
        stmt: StmtId,
        input: &Monad<Environment>,
    ) -> Result<Transition> {
        let t = self.transition(tables, stmt, input)?;
        tables.ensure_present(self.ctx, &self.key);
        let effect = EffectType::new(t.ret.clone(), t.thrown.clone());
        tables.join_if_present(self.ctx.program, &self.key, &effect);
        Ok(t)
    }

    /// Executes `stmt` in every environment of `input` and routes the results.
    pub fn transition(
        &self,
        tables: &mut ClassTable,
        stmt: StmtId,
        input: &Monad<Environment>,
    ) -> Result<Transition> {
        let dom = self.domain();
        let mut out = Monad::empty();
        let mut ret = Monad::empty();
        let mut thrown = Monad::empty();
        for (env, w) in input.iter() {
            let o = self.exec(tables, stmt, env)?;
            out.join_scaled(dom, w, &o.out);
            ret.join_scaled(dom, w, &o.ret);
            thrown.join_scaled(dom, w, &o.thrown);
        }

        let mut outs: BTreeMap<StmtId, Monad<Environment>> = BTreeMap::new();
        for &succ in self.body.succs(stmt) {
            outs.entry(succ).or_default().join_assign(&out);
        }

        for trap in self.body.traps_at(stmt) {
            let Stmt::Identity {
                local,
                value: IdentityRef::CaughtException,
            } = self.body.stmt(trap.handler)
            else {
                return Err(Error::MalformedHandler {
                    method: self.ctx.program.signature(self.method),
                    stmt: trap.handler.index(),
                });
            };

            let caught: Vec<(Region, bool)> = thrown
                .support()
                .filter_map(|r| self.catches(trap, r).map(|removable| (r.clone(), removable)))
                .collect();
            for (r, removable) in caught {
                let Some(w) = thrown.get(&r).cloned() else {
                    continue;
                };
                let mut handled = Monad::empty();
                for env in input.support() {
                    let mut env = env.clone();
                    env.insert(*local, r.clone());
                    handled.insert(env, w.clone());
                }
                for &succ in self.body.succs(trap.handler) {
                    outs.entry(succ).or_default().join_assign(&handled);
                }
                if removable {
                    trace!("{} caught at {}", r, trap.handler);
                    thrown.remove(&r);
                }
            }
        }

        Ok(Transition { outs, ret, thrown })
    }

    /// Whether `trap` catches exceptions of region `r`, and if so whether they
    /// are certainly caught.
    fn catches(&self, trap: &Trap, r: &Region) -> Option<bool> {
        let class = match r {
            Region::Allocation(site) => site.class,
            Region::ExceptionClass(c) => Some(*c),
            _ => None,
        };
        match class {
            Some(c) if self.ctx.program.is_subclass(c, trap.exception) => Some(true),
            Some(_) => None,
            None => Some(false),
        }
    }

    pub fn domain(&self) -> &'a AbstractDomain {
        self.ctx.domain()
    }

    fn location(&self, stmt: StmtId) -> Location {
        Location::new(self.method, stmt)
    }

    fn lookup(&self, env: &Environment, l: Local) -> Region {
        match env.get(&l) {
            Some(r) => r.clone(),
            None => {
                warn!(
                    "local {} read before assignment in {}",
                    self.body.local(l).name,
                    self.ctx.program.signature(self.method)
                );
                Region::Unknown
            }
        }
    }

    fn operand(&self, env: &Environment, stmt: StmtId, op: &Operand) -> Region {
        match op {
            Operand::Local(l) => self.lookup(env, *l),
            Operand::Const(Constant::Int(_)) => Region::BaseType,
            Operand::Const(Constant::Null) => Region::Null,
            Operand::Const(Constant::Str(_)) => {
                self.ctx
                    .policy
                    .region_for_string(self.ctx.program, &self.key.context, self.location(stmt))
            }
        }
    }

    /// Region leaving the method through `return` or `throw`. Constants and
    /// `void` are base values.
    fn returned(&self, env: &Environment, value: Option<&Operand>) -> Region {
        match value {
            Some(Operand::Local(l)) => self.lookup(env, *l),
            _ => Region::BaseType,
        }
    }

    /// Executes one statement in one environment.
    pub fn exec(&self, tables: &mut ClassTable, stmt: StmtId, env: &Environment) -> Result<Outcome> {
        let dom = self.domain();
        let put = |l: Local, t: &Monad<Region>| {
            t.map(|r| {
                let mut env = env.clone();
                env.insert(l, r.clone());
                env
            })
        };
        let mut o = Outcome {
            out: Monad::pure(dom, env.clone()),
            ..Outcome::default()
        };

        match self.body.stmt(stmt) {
            Stmt::Identity { local, value } => {
                let t = match value {
                    IdentityRef::This => Monad::pure(dom, self.key.region.clone()),
                    IdentityRef::Parameter(i) => match self.key.args.get(*i) {
                        Some(r) => Monad::pure(dom, r.clone()),
                        None => {
                            warn!("parameter {} out of range at {}", i, stmt);
                            Monad::pure(dom, Region::Unknown)
                        }
                    },
                    // Bound when the exception is routed to the handler.
                    IdentityRef::CaughtException => Monad::empty(),
                };
                o.out = put(*local, &t);
            }

            Stmt::Assign { place, value } => {
                let (t, thrown) = match value {
                    Expr::Invoke(e) => self.invoke(tables, stmt, env, e)?,
                    _ => (self.value(tables, stmt, env, value), Monad::empty()),
                };
                o.thrown = thrown;
                match place {
                    Place::Local(l) => o.out = put(*l, &t),
                    Place::InstanceField { base, field } => {
                        let key = FieldKey::new(self.lookup(env, *base), *field);
                        tables.store_field(key, t.support().cloned().collect());
                        o.out = t.map(|_| env.clone());
                    }
                    Place::StaticField(field) => {
                        let key = FieldKey::new(Region::Static, *field);
                        tables.store_field(key, t.support().cloned().collect());
                        o.out = t.map(|_| env.clone());
                    }
                    Place::ArrayElem { base, .. } => {
                        let key = ArrayKey::new(self.lookup(env, *base));
                        tables.store_array(key, t.support().cloned().collect());
                        o.out = t.map(|_| env.clone());
                    }
                }
            }

            Stmt::Invoke(e) => {
                if self.is_intrinsic_constructor(e) {
                    return self.exec_intrinsic_constructor(tables, stmt, env, e);
                }
                let (ret, thrown) = self.invoke(tables, stmt, env, e)?;
                o.out = o.out.then_effect(dom, &ret.aggregate());
                o.thrown = thrown;
            }

            Stmt::Return(value) => {
                o.ret = Monad::pure(dom, self.returned(env, value.as_ref()));
            }

            Stmt::Throw(op) => {
                o.thrown = Monad::pure(dom, self.returned(env, Some(op)));
            }

            Stmt::If { .. } | Stmt::Goto(_) | Stmt::Switch { .. } | Stmt::Nop => {}
        }
        Ok(o)
    }

    fn is_intrinsic_constructor(&self, e: &InvokeExpr) -> bool {
        matches!(e.kind, InvokeKind::Special(_))
            && self.ctx.program.is_constructor(e.method)
            && matches!(MethodKind::of(self.ctx, e.method), MethodKind::Intrinsic(_))
    }

    /// A constructor with an intrinsic typing rebinds its receiver to the
    /// region the intrinsic returns.
    fn exec_intrinsic_constructor(
        &self,
        tables: &mut ClassTable,
        stmt: StmtId,
        env: &Environment,
        e: &InvokeExpr,
    ) -> Result<Outcome> {
        let dom = self.domain();
        let MethodKind::Intrinsic(intrinsic) = MethodKind::of(self.ctx, e.method) else {
            return Err(Error::Unsupported(format!(
                "{} is not intrinsic",
                self.ctx.program.signature(e.method)
            )));
        };
        let Some(this) = e.receiver() else {
            return Err(Error::Unsupported(format!(
                "constructor call without receiver at {}",
                stmt
            )));
        };

        let receiver = self.lookup(env, this);
        let args: Vec<Monad<Region>> = e
            .args
            .iter()
            .map(|a| Monad::pure(dom, self.operand(env, stmt, a)))
            .collect();
        let context = self.key.context.push(self.location(stmt));
        let t = Monad::sequence(dom, &args).bind(dom, |args| {
            let key = MethodKey::new(e.method, context.clone(), receiver.clone(), args.clone());
            tables.ensure_present(self.ctx, &key);
            intrinsic.return_type(dom, &receiver, args)
        });

        let out = t.map(|r| {
            let mut env = env.clone();
            env.insert(this, r.clone());
            env
        });
        Ok(Outcome {
            out,
            ..Outcome::default()
        })
    }

    /// Returned and thrown regions of a call, over all combinations of
    /// receiver and argument regions.
    fn invoke(
        &self,
        tables: &mut ClassTable,
        stmt: StmtId,
        env: &Environment,
        e: &InvokeExpr,
    ) -> Result<(Monad<Region>, Monad<Region>)> {
        let dom = self.domain();
        let mut ret = Monad::empty();
        let mut thrown = Monad::empty();
        for (key, w) in self.call_keys(env, stmt, e)?.iter() {
            tables.ensure_present(self.ctx, key);
            if let Some(t) = tables.get(key) {
                ret.join_scaled(dom, w, &t.ret);
                thrown.join_scaled(dom, w, &t.thrown);
            }
        }
        Ok((ret, thrown))
    }

    /// Method table entries a call may use, weighted by the effect of
    /// evaluating receiver and arguments.
    pub fn call_keys(&self, env: &Environment, stmt: StmtId, e: &InvokeExpr) -> Result<Monad<MethodKey>> {
        let dom = self.domain();
        if matches!(e.kind, InvokeKind::Dynamic) {
            return Err(Error::Unsupported(format!(
                "dynamic invocation of {}",
                self.ctx.program.signature(e.method)
            )));
        }
        let receiver = match e.receiver() {
            Some(l) => self.lookup(env, l),
            None => Region::Static,
        };
        let mut regions = vec![Monad::pure(dom, receiver)];
        for a in &e.args {
            regions.push(Monad::pure(dom, self.operand(env, stmt, a)));
        }
        let context = self.key.context.push(self.location(stmt));
        Ok(Monad::sequence(dom, &regions).map(|rs| {
            MethodKey::new(e.method, context.clone(), rs[0].clone(), rs[1..].to_vec())
        }))
    }

    fn value(&self, tables: &ClassTable, stmt: StmtId, env: &Environment, expr: &Expr) -> Monad<Region> {
        let dom = self.domain();
        let program = self.ctx.program;
        match expr {
            Expr::Use(op) => Monad::pure(dom, self.operand(env, stmt, op)),
            Expr::InstanceField { base, field } => {
                let key = FieldKey::new(self.lookup(env, *base), *field);
                Monad::cases(dom, tables.field(program, &key))
            }
            Expr::StaticField(field) => {
                let key = FieldKey::new(Region::Static, *field);
                Monad::cases(dom, tables.field(program, &key))
            }
            Expr::ArrayElem { base, .. } => {
                let elem = match &self.body.local(*base).ty {
                    Type::Array(elem) => elem.as_ref().clone(),
                    _ => Type::Ref(program.object()),
                };
                let key = ArrayKey::new(self.lookup(env, *base));
                Monad::cases(dom, tables.array(&key, &elem))
            }
            Expr::New(class) => Monad::pure(
                dom,
                self.ctx
                    .policy
                    .region_for_new(&self.key.context, self.location(stmt), Some(*class)),
            ),
            Expr::NewArray { .. } => Monad::pure(
                dom,
                self.ctx
                    .policy
                    .region_for_new(&self.key.context, self.location(stmt), None),
            ),
            Expr::Cast { op, ty } => {
                if !ty.is_reference() {
                    return Monad::pure(dom, Region::BaseType);
                }
                if let (Operand::Local(l), Some(target)) = (op, ty.class()) {
                    if let Some(declared) = self.body.local(*l).ty.class() {
                        if !self.comparable(declared, target) {
                            trace!("cast at {} cannot succeed", stmt);
                            return Monad::empty();
                        }
                    }
                }
                Monad::pure(dom, self.operand(env, stmt, op))
            }
            Expr::InstanceOf { .. } | Expr::Length(_) | Expr::Neg(_) | Expr::BinOp(..) => {
                Monad::pure(dom, Region::BaseType)
            }
            // Calls are handled by the caller, which needs their exceptions too.
            Expr::Invoke(_) => Monad::empty(),
        }
    }

    fn comparable(&self, a: ClassId, b: ClassId) -> bool {
        let program = self.ctx.program;
        a == b
            || a == program.object()
            || b == program.object()
            || program.can_store(a, b)
            || program.can_store(b, a)
    }
}

struct Flow<'f, 'a, 'c> {
    analysis: &'f FinitaryAnalysis<'a, 'c>,
    tables: &'f mut ClassTable,
}

impl ForwardFlow for Flow<'_, '_, '_> {
    type Fact = Monad<Environment>;

    fn entry_fact(&self) -> Self::Fact {
        self.analysis.entry_flow()
    }

    fn bottom(&self) -> Self::Fact {
        Monad::empty()
    }

    fn join(&self, a: &Self::Fact, b: &Self::Fact) -> Self::Fact {
        a.join(b)
    }

    fn flow_through(&mut self, stmt: StmtId, before: &Self::Fact) -> Result<Vec<(StmtId, Self::Fact)>> {
        let t = self.analysis.flow_through(self.tables, stmt, before)?;
        Ok(t.outs.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use std::rc::Rc;

    use crate::calling_context::CallingContext;
    use crate::cfg::BodyBuilder;
    use crate::policies::{AbcPolicy, TAINT_API};
    use crate::policy::Policy;
    use crate::program::{ClassId, Origin, Program, ProgramBuilder};
    use crate::type_pool::TypePool;

    struct Fixture {
        program: Program,
        main: MethodRef,
    }

    /// Static `Main.run()` with the body built by `f`, which gets `TaintAPI.emitA`,
    /// `TaintAPI.emitB` and a library exception class.
    fn fixture(f: impl FnOnce(&mut ProgramBuilder, &mut BodyBuilder, [MethodRef; 2], ClassId)) -> Fixture {
        let mut b = ProgramBuilder::new();
        let api = b.add_class(TAINT_API, Origin::Library);
        let error = b.add_class("Error", Origin::Library);
        let emit_a = b.sig("emitA", vec![], Type::Void);
        let emit_b = b.sig("emitB", vec![], Type::Void);
        let emit_a = b.add_method(api, emit_a, true);
        let emit_b = b.add_method(api, emit_b, true);
        let main = b.add_class("Main", Origin::Application);
        let run = b.sig("run", vec![], Type::Void);
        let main = b.add_method(main, run, true);
        let mut body = BodyBuilder::new();
        f(&mut b, &mut body, [emit_a, emit_b], error);
        b.set_body(main, body.build().unwrap());
        Fixture {
            program: b.build(),
            main,
        }
    }

    fn analyse(fx: &Fixture, policy: &AbcPolicy) -> Result<EffectType> {
        let ctx = AnalysisContext::new(&fx.program, policy, 1);
        let mut tables = ClassTable::new(Rc::new(TypePool::with_classes(fx.program.classes())));
        let key = MethodKey::new(fx.main, CallingContext::empty(1), Region::Static, vec![]);
        tables.ensure_present(&ctx, &key);
        let body = fx.program.body(fx.main).unwrap();
        let mut analysis = FinitaryAnalysis::new(&ctx, key.clone(), fx.main, body);
        analysis.run(&mut tables)?;
        Ok(tables.get(&key).unwrap().clone())
    }

    #[test]
    fn test_sequence_of_calls() {
        let fx = fixture(|_, body, [emit_a, _], _| {
            body.invoke(InvokeExpr::static_call(emit_a, vec![]));
            body.invoke(InvokeExpr::static_call(emit_a, vec![]));
            body.ret(None);
        });
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let effect = analyse(&fx, &policy).unwrap();
        let a = dom.read_symbol("A").unwrap();
        assert_eq!(effect.ret, Monad::weighted(Region::BaseType, dom.multiply(&a, &a)));
        assert!(effect.thrown.is_empty());
    }

    #[test]
    fn test_branches_join() {
        let fx = fixture(|_, body, [emit_a, emit_b], _| {
            let else_ = body.new_label();
            let end = body.new_label();
            body.if_(Operand::int(0), else_);
            body.invoke(InvokeExpr::static_call(emit_a, vec![]));
            body.goto(end);
            body.place(else_);
            body.invoke(InvokeExpr::static_call(emit_b, vec![]));
            body.place(end);
            body.ret(None);
        });
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let effect = analyse(&fx, &policy).unwrap();
        let a_or_b = dom.read_symbol("A").unwrap().join(&dom.read_symbol("B").unwrap());
        assert_eq!(effect.ret.get(&Region::BaseType), Some(&a_or_b));
    }

    #[test]
    fn test_caught_exception_reaches_handler() {
        let fx = fixture(|b, body, [_, emit_b], error| {
            let e = body.local("e", Type::Ref(error));
            let caught = body.local("caught", Type::Ref(error));
            let begin = body.here();
            body.assign_local(e, Expr::New(error));
            body.throw(e.into());
            let handler = body.here();
            body.identity(caught, IdentityRef::CaughtException);
            body.invoke(InvokeExpr::static_call(emit_b, vec![]));
            body.ret(None);
            body.trap(begin, handler, handler, b.object());
        });
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let effect = analyse(&fx, &policy).unwrap();
        assert_eq!(
            effect.ret,
            Monad::weighted(Region::BaseType, dom.read_symbol("B").unwrap())
        );
        assert!(effect.thrown.is_empty());
    }

    #[test]
    fn test_uncaught_exception_escapes() {
        let fx = fixture(|_, body, [emit_a, _], error| {
            let e = body.local("e", Type::Ref(error));
            body.invoke(InvokeExpr::static_call(emit_a, vec![]));
            body.assign_local(e, Expr::New(error));
            body.throw(e.into());
        });
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let effect = analyse(&fx, &policy).unwrap();
        assert!(effect.ret.is_empty());
        assert_eq!(effect.thrown.aggregate(), dom.read_symbol("A").unwrap());
    }

    #[test]
    fn test_malformed_handler() {
        let fx = fixture(|b, body, _, error| {
            let e = body.local("e", Type::Ref(error));
            let begin = body.here();
            body.assign_local(e, Expr::New(error));
            body.throw(e.into());
            let end = body.here();
            body.ret(None);
            body.trap(begin, end, end, b.object());
        });
        let policy = AbcPolicy::new().unwrap();
        assert!(matches!(
            analyse(&fx, &policy),
            Err(Error::MalformedHandler { .. })
        ));
    }

    #[test]
    fn test_field_store_and_load() {
        let mut b = ProgramBuilder::new();
        let cell = b.add_class("Cell", Origin::Application);
        let object = b.object();
        let value = b.add_field(cell, "value", Type::Ref(object), false);
        let get = b.sig("get", vec![], Type::Ref(object));
        let get = b.add_method(cell, get, false);
        let mut body = BodyBuilder::new();
        let this = body.local("this", Type::Ref(cell));
        let fresh = body.local("fresh", Type::Ref(object));
        let out = body.local("out", Type::Ref(object));
        body.identity(this, IdentityRef::This);
        body.assign_local(fresh, Expr::New(object));
        body.assign(
            Place::InstanceField { base: this, field: value },
            Expr::Use(fresh.into()),
        );
        body.assign_local(out, Expr::InstanceField { base: this, field: value });
        body.ret(Some(out.into()));
        b.set_body(get, body.build().unwrap());
        let program = b.build();

        let policy = AbcPolicy::new().unwrap();
        let ctx = AnalysisContext::new(&program, &policy, 1);
        let mut tables = ClassTable::new(Rc::new(TypePool::with_classes(program.classes())));
        let key = MethodKey::new(get, CallingContext::empty(1), Region::EntryPoint, vec![]);
        tables.ensure_present(&ctx, &key);
        let mut analysis = FinitaryAnalysis::new(&ctx, key.clone(), get, program.body(get).unwrap());
        analysis.run(&mut tables).unwrap();

        let stored = tables.field(&program, &FieldKey::new(Region::EntryPoint, value));
        assert_eq!(stored.len(), 1);
        let ret: Vec<&Region> = tables.get(&key).unwrap().ret.support().collect();
        assert_eq!(ret.len(), 1);
        assert!(matches!(ret[0], Region::Allocation(site) if site.class == Some(object)));
        assert!(!analysis.flow_before(StmtId(4)).is_empty());
    }
}
