//! Classes that are relevant for the analysis of an entry method.
//!
//! The pool contains every class that may be instantiated by code reachable
//! from the entry method, and is closed under superclasses and implemented
//! interfaces. Reachability is computed over `(calling context, method)`
//! frames: every statement of the entry method is reachable, and a call through
//! `C.m` makes the body of `m` reachable in `C` and in every pooled class that
//! can be stored in a variable of type `C`.
//!
//! Method tables are only closed over classes in the pool, which keeps the
//! closure from visiting the whole hierarchy below `Object`.

use std::collections::{BTreeSet, VecDeque};

use log::debug;

use crate::calling_context::{CallingContext, Location};
use crate::cfg::{Expr, InvokeKind, Stmt};
use crate::context::AnalysisContext;
use crate::error::{Error, Result};
use crate::program::{ClassId, MethodRef, Type};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypePool {
    classes: BTreeSet<ClassId>,
}

impl TypePool {
    /// Computes the pool for `entry`.
    ///
    /// Fails with [`Error::Unsupported`] on dynamic invocations.
    pub fn new(ctx: &AnalysisContext, entry: MethodRef) -> Result<Self> {
        let mut pool = Self {
            classes: BTreeSet::new(),
        };
        loop {
            let size = pool.classes.len();
            pool.fill(ctx, entry)?;
            pool.include_mocks(ctx);
            pool.upward_closure(ctx);
            if pool.classes.len() == size {
                break;
            }
        }
        debug!("type pool: {} classes", pool.classes.len());
        Ok(pool)
    }

    /// A pool of exactly the given classes.
    pub fn with_classes(classes: impl IntoIterator<Item = ClassId>) -> Self {
        Self {
            classes: classes.into_iter().collect(),
        }
    }

    pub fn contains(&self, class: ClassId) -> bool {
        self.classes.contains(&class)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClassId> + '_ {
        self.classes.iter().copied()
    }

    fn fill(&mut self, ctx: &AnalysisContext, entry: MethodRef) -> Result<()> {
        let program = ctx.program;

        self.classes.insert(entry.class);
        for ty in &program.sig(entry.sig).params {
            if let Type::Ref(c) = ty {
                self.classes.extend(program.leaf_classes(*c));
            }
        }

        let mut done = BTreeSet::new();
        let mut todo = VecDeque::from([(CallingContext::empty(ctx.k), entry)]);
        while let Some(frame) = todo.pop_front() {
            if !done.insert(frame.clone()) {
                continue;
            }
            let (calling_context, m) = frame;
            let Some((method, body)) = ctx.body_of(m) else {
                continue;
            };

            for (s, stmt) in body.stmts() {
                if let Stmt::Assign {
                    value: Expr::New(class),
                    ..
                } = stmt
                {
                    self.classes.insert(*class);
                }

                let Some(e) = stmt.invoke_expr() else {
                    continue;
                };
                match e.kind {
                    InvokeKind::Dynamic => {
                        return Err(Error::Unsupported(format!(
                            "dynamic invocation of {}",
                            program.signature(e.method)
                        )));
                    }
                    InvokeKind::Static => {
                        self.classes.insert(e.method.class);
                    }
                    InvokeKind::Virtual(_) | InvokeKind::Interface(_) | InvokeKind::Special(_) => {}
                }

                let callee_context = calling_context.push(Location::new(method, s));
                for &c in &self.classes {
                    if program.can_store(c, e.method.class) {
                        todo.push_front((callee_context.clone(), e.method.with_class(c)));
                    }
                }
                todo.push_front((callee_context, e.method));
            }
        }
        Ok(())
    }

    fn include_mocks(&mut self, ctx: &AnalysisContext) {
        let mocks: Vec<ClassId> = self
            .classes
            .iter()
            .filter_map(|&c| ctx.mocks.mock_of(c))
            .collect();
        self.classes.extend(mocks);
    }

    fn upward_closure(&mut self, ctx: &AnalysisContext) {
        let program = ctx.program;
        let mut queue: VecDeque<ClassId> = self.classes.iter().copied().collect();
        while let Some(c) = queue.pop_front() {
            if c == program.object() {
                continue;
            }
            let decl = program.class(c);
            let supers = decl
                .superclass
                .filter(|_| !decl.is_interface)
                .into_iter()
                .chain(decl.interfaces.iter().copied());
            for d in supers {
                if self.classes.insert(d) {
                    queue.push_back(d);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::cfg::{BodyBuilder, InvokeExpr};
    use crate::policies::AbcPolicy;
    use crate::program::{Origin, ProgramBuilder};

    #[test]
    fn test_pool_follows_calls() {
        let mut b = ProgramBuilder::new();
        let main = b.add_class("Main", Origin::Application);
        let shape = b.add_interface("Shape", Origin::Application);
        let circle = b.add_class("Circle", Origin::Application);
        b.implements(circle, shape);
        let square = b.add_class("Square", Origin::Application);
        b.implements(square, shape);
        let helper = b.add_class("Helper", Origin::Application);

        let run = b.sig("run", vec![], Type::Void);
        let make = b.sig("make", vec![], Type::Ref(shape));
        let main_run = b.add_method(main, run, true);
        let helper_make = b.add_method(helper, make, true);

        let mut body = BodyBuilder::new();
        let s = body.local("s", Type::Ref(shape));
        body.assign_local(s, Expr::Invoke(InvokeExpr::static_call(helper_make, vec![])));
        body.ret(None);
        b.set_body(main_run, body.build().unwrap());

        let mut body = BodyBuilder::new();
        let c = body.local("c", Type::Ref(circle));
        body.assign_local(c, Expr::New(circle));
        body.ret(Some(c.into()));
        b.set_body(helper_make, body.build().unwrap());

        let program = b.build();
        let policy = AbcPolicy::new().unwrap();
        let ctx = AnalysisContext::new(&program, &policy, 1);
        let pool = TypePool::new(&ctx, main_run).unwrap();

        assert!(pool.contains(main));
        assert!(pool.contains(helper));
        assert!(pool.contains(circle));
        assert!(pool.contains(shape));
        assert!(pool.contains(program.object()));
        assert!(!pool.contains(square));
    }

    #[test]
    fn test_leaf_classes_of_parameters() {
        let mut b = ProgramBuilder::new();
        let main = b.add_class("Main", Origin::Application);
        let base = b.add_class("Base", Origin::Application);
        let leaf = b.add_subclass("Leaf", Origin::Application, base);
        let run = b.sig("run", vec![Type::Ref(base)], Type::Void);
        let main_run = b.add_method(main, run, false);
        let program = b.build();

        let policy = AbcPolicy::new().unwrap();
        let ctx = AnalysisContext::new(&program, &policy, 1);
        let pool = TypePool::new(&ctx, main_run).unwrap();
        assert!(pool.contains(leaf));
        // Added by the upward closure.
        assert!(pool.contains(base));
    }

    #[test]
    fn test_dynamic_invocation_is_unsupported() {
        let mut b = ProgramBuilder::new();
        let main = b.add_class("Main", Origin::Application);
        let run = b.sig("run", vec![], Type::Void);
        let main_run = b.add_method(main, run, true);
        let mut body = BodyBuilder::new();
        body.invoke(InvokeExpr {
            kind: InvokeKind::Dynamic,
            method: main_run,
            args: vec![],
        });
        body.ret(None);
        b.set_body(main_run, body.build().unwrap());
        let program = b.build();

        let policy = AbcPolicy::new().unwrap();
        let ctx = AnalysisContext::new(&program, &policy, 1);
        assert!(matches!(TypePool::new(&ctx, main_run), Err(Error::Unsupported(_))));
    }
}
