//! The interprocedural driver.
//!
//! # Phases
//!
//! 1. The [type pool](crate::type_pool::TypePool) is computed and the entry
//!    method is entered into the method table.
//! 2. **Finitary phase.** Every table entry with a body is analysed with
//!    [`FinitaryAnalysis`], joining into the table, until a full pass leaves
//!    the table unchanged. Analysing a body may add entries for its callees,
//!    which are picked up by the next pass. If no fixpoint is reached within
//!    [`AnalysisConfig::max_iterations`] passes the result is
//!    [`Verdict::Inconclusive`].
//! 3. **Infinitary phase.** The unit equations of every analysed body are
//!    solved and the result joined into the table. The resulting per-method
//!    terms form one more equation system over [`Variable::Method`], whose
//!    solution gives the infinite behaviour of every entry.
//! 4. **Verdict.** The entry method follows the policy iff its terminating
//!    traces and its infinite traces are both accepted. Otherwise a
//!    [counterexample](crate::counterexample) is searched for.
//!
//! Static initializers (`<clinit>`) are never analysed: only methods reached
//! through invocations from the entry method enter the method table.

use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, info, warn};

use crate::calling_context::CallingContext;
use crate::class_table::ClassTable;
use crate::context::AnalysisContext;
use crate::counterexample::{find_finite, find_infinite, Counterexample};
use crate::domain::Infinitary;
use crate::effect::EffectType;
use crate::equations::{EquationSystem, Variable};
use crate::error::Result;
use crate::finitary::FinitaryAnalysis;
use crate::infinitary::InfinitaryAnalysis;
use crate::policy::Policy;
use crate::program::{MethodRef, Program};
use crate::region::Region;
use crate::tables::MethodKey;
use crate::type_pool::TypePool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Length of calling contexts.
    pub k: usize,
    /// Bound on the passes of the finitary phase.
    pub max_iterations: usize,
    /// Search for a counterexample when the verdict is negative.
    pub counterexamples: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            k: 1,
            max_iterations: 40,
            counterexamples: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
    /// The finitary phase did not converge; nothing is known.
    Inconclusive,
}

/// Outcome of [`InterProcAnalysis::run`].
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub verdict: Verdict,
    pub entry: MethodKey,
    /// Final method, field and array tables.
    pub tables: ClassTable,
    /// Solved infinite behaviour of every method table entry.
    pub infinitary: BTreeMap<MethodKey, Infinitary>,
    /// Passes of the finitary phase.
    pub iterations: usize,
    pub counterexample: Counterexample,
}

impl AnalysisResult {
    pub fn entry_effect(&self) -> EffectType {
        self.tables.get(&self.entry).cloned().unwrap_or_default()
    }

    pub fn entry_infinitary(&self) -> Infinitary {
        self.infinitary.get(&self.entry).cloned().unwrap_or_default()
    }
}

pub struct InterProcAnalysis<'a> {
    ctx: AnalysisContext<'a>,
    config: AnalysisConfig,
    entry: MethodRef,
}

impl<'a> InterProcAnalysis<'a> {
    pub fn new(program: &'a Program, policy: &'a dyn Policy, entry: MethodRef, config: AnalysisConfig) -> Self {
        Self {
            ctx: AnalysisContext::new(program, policy, config.k),
            config,
            entry,
        }
    }

    pub fn context(&self) -> &AnalysisContext<'a> {
        &self.ctx
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Key of the entry method: receiver [`Region::EntryPoint`] (or
    /// [`Region::Static`]) and argument `i` in [`Region::Input(i)`](Region::Input).
    pub fn entry_key(&self) -> MethodKey {
        let region = if self.entry.is_static {
            Region::Static
        } else {
            Region::EntryPoint
        };
        let args = (0..self.ctx.program.sig(self.entry.sig).params.len())
            .map(Region::Input)
            .collect();
        MethodKey::new(self.entry, CallingContext::empty(self.config.k), region, args)
    }

    /// Tables over the type pool, holding only the entry method.
    fn initial_tables(&self) -> Result<(ClassTable, MethodKey)> {
        let pool = Rc::new(TypePool::new(&self.ctx, self.entry)?);
        let mut state = ClassTable::new(pool);
        let entry = self.entry_key();
        state.ensure_present(&self.ctx, &entry);
        Ok((state, entry))
    }

    /// Analyses every table entry that has a body once, joining into `state`.
    fn finitary_pass<'c>(
        &'c self,
        state: &mut ClassTable,
        analyses: &mut BTreeMap<MethodKey, FinitaryAnalysis<'a, 'c>>,
    ) -> Result<()> {
        let ctx = &self.ctx;
        let program = ctx.program;
        for key in state.keys() {
            let Some((method, body)) = state.body(ctx, &key) else {
                continue;
            };
            if key.region.impossible(key.method, program) {
                continue;
            }
            debug!("analysing {}", key.describe(program));
            let mut analysis = FinitaryAnalysis::new(ctx, key.clone(), method, body);
            analysis.run(state)?;
            analyses.insert(key, analysis);
        }
        Ok(())
    }

    pub fn run(&self) -> Result<AnalysisResult> {
        let ctx = &self.ctx;
        let program = ctx.program;
        let dom = ctx.domain();
        info!(
            "analysing {} against policy {}",
            program.signature(self.entry),
            ctx.policy.name()
        );

        let (mut state, entry) = self.initial_tables()?;

        info!("finitary phase");
        let mut analyses = BTreeMap::new();
        let mut iterations = 0;
        loop {
            let old = state.clone();
            self.finitary_pass(&mut state, &mut analyses)?;
            iterations += 1;
            if state == old {
                break;
            }
            if iterations > self.config.max_iterations {
                warn!(
                    "no fixpoint after {} iterations, giving up",
                    self.config.max_iterations
                );
                return Ok(AnalysisResult {
                    verdict: Verdict::Inconclusive,
                    entry,
                    tables: state,
                    infinitary: BTreeMap::new(),
                    iterations,
                    counterexample: Counterexample::NotFound,
                });
            }
        }
        info!(
            "finitary phase converged after {} iterations, {} method entries",
            iterations,
            state.methods().len()
        );

        info!("infinitary phase");
        for (key, analysis) in &analyses {
            let infinitary = InfinitaryAnalysis::new(analysis, &mut state)?;
            let effect = EffectType::bottom().with_infinitary(infinitary.result());
            state.join_if_present(program, key, &effect);
        }
        let mut system = EquationSystem::new();
        for (key, effect) in state.methods() {
            system.put(Variable::Method(key.clone()), effect.infinitary.clone());
        }
        system.solve(dom);
        let infinitary: BTreeMap<MethodKey, Infinitary> = system
            .iter()
            .filter_map(|(x, p)| match x {
                Variable::Method(key) => Some((key.clone(), p.constant().clone())),
                Variable::Unit { .. } => None,
            })
            .collect();

        let finite_ok = state
            .get(&entry)
            .is_some_and(|effect| dom.accepted(&effect.aggregate()));
        let infinite_ok = infinitary
            .get(&entry)
            .map_or(true, |inf| dom.accepted_inf(inf));
        let verdict = if finite_ok && infinite_ok {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        };
        info!("verdict: {:?}", verdict);

        let mut counterexample = Counterexample::NotFound;
        if verdict == Verdict::Rejected && self.config.counterexamples {
            if let Some(analysis) = analyses.get(&entry) {
                let mut scratch = state.clone();
                counterexample = if !finite_ok {
                    find_finite(analysis, &mut scratch)?
                } else {
                    find_infinite(analysis, &mut scratch)?
                };
            }
            if !counterexample.is_found() {
                warn!("could not localize a counterexample");
            }
        }

        Ok(AnalysisResult {
            verdict,
            entry,
            tables: state,
            infinitary,
            iterations,
            counterexample,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::cfg::{BodyBuilder, Expr, InvokeExpr, InvokeKind};
    use crate::domain::Finitary;
    use crate::error::Error;
    use crate::monad::Monad;
    use crate::policies::{AStarBStar, AbcPolicy, BinaryPolicy, LoggedAccessPolicy, TAINT_API};
    use crate::program::{Origin, ProgramBuilder, Type};
    use crate::samples::{self, Sample};

    fn run(sample: &Sample, policy: &dyn Policy) -> AnalysisResult {
        InterProcAnalysis::new(&sample.program, policy, sample.entry, AnalysisConfig::default())
            .run()
            .unwrap()
    }

    #[test]
    fn test_straight_line() {
        let sample = samples::straight_line().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        let a = dom.read_symbol("A").unwrap();
        let effect = result.entry_effect();
        assert_eq!(effect.ret, Monad::weighted(Region::BaseType, dom.multiply(&a, &a)));
        assert!(effect.thrown.is_empty());
        assert!(result.entry_infinitary().is_zero());
        assert_eq!(result.verdict, Verdict::Accepted);
        assert_eq!(result.counterexample, Counterexample::NotFound);
    }

    #[test]
    fn test_recursion_diverges() {
        let sample = samples::recursion().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        let a = dom.read_symbol("A").unwrap();
        assert!(result.entry_effect().ret.is_empty());
        assert_eq!(result.entry_infinitary(), dom.multiply_inf(&a, &dom.omega(&a)));
        assert_eq!(result.verdict, Verdict::Accepted);
    }

    #[test]
    fn test_endless_loop() {
        let sample = samples::endless_loop().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        let a = dom.read_symbol("A").unwrap();
        let bc = dom.multiply(&dom.read_symbol("B").unwrap(), &dom.read_symbol("C").unwrap());
        assert!(result.entry_effect().ret.is_empty());
        assert_eq!(result.entry_infinitary(), dom.multiply_inf(&a, &dom.omega(&bc)));
    }

    #[test]
    fn test_caught_exception() {
        let sample = samples::caught_exception().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        let effect = result.entry_effect();
        assert_eq!(
            effect.ret,
            Monad::weighted(Region::BaseType, dom.read_symbol("B").unwrap())
        );
        assert!(effect.thrown.is_empty());
        assert!(result.iterations > 1);
    }

    #[test]
    fn test_sibling_overrides() {
        let sample = samples::sibling_overrides().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        let a_or_b = dom.read_symbol("A").unwrap().join(&dom.read_symbol("B").unwrap());
        assert_eq!(result.entry_effect().ret.get(&Region::BaseType), Some(&a_or_b));
        // Both overrides are in the table, each analysed for its own receiver.
        let overrides = result
            .tables
            .methods()
            .keys()
            .filter(|k| sample.program.method_name(k.method) == "f")
            .count();
        assert!(overrides >= 4);
    }

    #[test]
    fn test_mocked_library() {
        let sample = samples::mocked_library().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        assert_eq!(
            result.entry_effect().ret,
            Monad::weighted(Region::BaseType, dom.read_symbol("C").unwrap())
        );
    }

    #[test]
    fn test_finite_counterexample() {
        let sample = samples::b_then_a().unwrap();
        let policy = AStarBStar::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        assert_eq!(result.verdict, Verdict::Rejected);
        let Counterexample::Finite(path) = &result.counterexample else {
            panic!("expected a finite counterexample, got {:?}", result.counterexample);
        };
        let b = dom.read_symbol("B").unwrap();
        let ba = dom.multiply(&b, &dom.read_symbol("A").unwrap());
        let effects: Vec<&Finitary> = path.iter().map(|s| &s.effect).collect();
        assert_eq!(effects, vec![&b, &ba, &ba]);
    }

    #[test]
    fn test_finite_counterexample_uncaught_exception() {
        // run() { emitB(); fail(); }  fail() { emitA(); throw new Error(); }
        let mut b = ProgramBuilder::new();
        let api = b.add_class(TAINT_API, Origin::Library);
        let [emit_a, emit_b] = ["emitA", "emitB"].map(|name| {
            let sig = b.sig(name, vec![], Type::Void);
            b.add_method(api, sig, true)
        });
        let error = b.add_class("Error", Origin::Library);
        let main = b.add_class("Main", Origin::Application);
        let run = b.sig("run", vec![], Type::Void);
        let run = b.add_method(main, run, true);
        let fail = b.sig("fail", vec![], Type::Void);
        let fail = b.add_method(main, fail, true);

        let mut body = BodyBuilder::new();
        let e = body.local("e", Type::Ref(error));
        body.invoke(InvokeExpr::static_call(emit_a, vec![]));
        body.assign_local(e, Expr::New(error));
        body.throw(e.into());
        b.set_body(fail, body.build().unwrap());

        let mut body = BodyBuilder::new();
        body.invoke(InvokeExpr::static_call(emit_b, vec![]));
        body.invoke(InvokeExpr::static_call(fail, vec![]));
        body.ret(None);
        b.set_body(run, body.build().unwrap());
        let program = b.build();

        let policy = AStarBStar::new().unwrap();
        let dom = policy.domain();
        let result = InterProcAnalysis::new(&program, &policy, run, AnalysisConfig::default())
            .run()
            .unwrap();

        assert_eq!(result.verdict, Verdict::Rejected);
        let Counterexample::Finite(path) = &result.counterexample else {
            panic!("expected a finite counterexample, got {:?}", result.counterexample);
        };
        let b = dom.read_symbol("B").unwrap();
        let ba = dom.multiply(&b, &dom.read_symbol("A").unwrap());
        let effects: Vec<&Finitary> = path.iter().map(|s| &s.effect).collect();
        assert_eq!(effects, vec![&b, &ba]);
    }

    #[test]
    fn test_infinite_counterexample() {
        let sample = samples::alternating_loop().unwrap();
        let policy = AStarBStar::new().unwrap();
        let dom = policy.domain();
        let result = run(&sample, &policy);

        assert_eq!(result.verdict, Verdict::Rejected);
        assert!(dom.accepted(&result.entry_effect().aggregate()));
        let Counterexample::Infinite { path, cycle } = &result.counterexample else {
            panic!("expected an infinite counterexample, got {:?}", result.counterexample);
        };
        assert!(!path.is_empty());
        assert!(!dom.accepted_inf(cycle));
    }

    #[test]
    fn test_counterexamples_disabled() {
        let sample = samples::b_then_a().unwrap();
        let policy = AStarBStar::new().unwrap();
        let config = AnalysisConfig {
            counterexamples: false,
            ..AnalysisConfig::default()
        };
        let result = InterProcAnalysis::new(&sample.program, &policy, sample.entry, config)
            .run()
            .unwrap();
        assert_eq!(result.verdict, Verdict::Rejected);
        assert!(!result.counterexample.is_found());
    }

    #[test]
    fn test_logged_access() {
        let policy = LoggedAccessPolicy::new().unwrap();
        let logged = samples::server_access(true).unwrap();
        assert_eq!(run(&logged, &policy).verdict, Verdict::Accepted);
        let unlogged = samples::server_access(false).unwrap();
        let result = run(&unlogged, &policy);
        assert_eq!(result.verdict, Verdict::Rejected);
        assert!(result.counterexample.is_found());
    }

    #[test]
    fn test_tainted_output() {
        let sample = samples::tainted_output().unwrap();
        let policy = BinaryPolicy::new().unwrap();
        assert_eq!(run(&sample, &policy).verdict, Verdict::Rejected);
    }

    #[test]
    fn test_iteration_bound() {
        let sample = samples::straight_line().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let config = AnalysisConfig {
            max_iterations: 0,
            ..AnalysisConfig::default()
        };
        let result = InterProcAnalysis::new(&sample.program, &policy, sample.entry, config)
            .run()
            .unwrap();
        assert_eq!(result.verdict, Verdict::Inconclusive);
        assert!(result.infinitary.is_empty());
    }

    /// Runs finitary passes by hand, checking after each one that no method
    /// table entry shrank. Returns the number of passes up to the fixpoint.
    fn passes_until_fixpoint(analysis: &InterProcAnalysis) -> usize {
        let (mut state, entry) = analysis.initial_tables().unwrap();
        let mut analyses = BTreeMap::new();
        let mut passes = 0;
        loop {
            let prev = state.clone();
            analysis.finitary_pass(&mut state, &mut analyses).unwrap();
            passes += 1;
            for (key, before) in prev.methods() {
                let after = state.get(key).unwrap();
                assert!(before.leq(after), "{} shrank in pass {}", key.describe(analysis.context().program), passes);
            }
            if state == prev {
                assert!(state.get(&entry).is_some());
                return passes;
            }
            assert!(passes <= analysis.config().max_iterations, "no fixpoint");
        }
    }

    #[test]
    fn test_method_table_grows_monotonically() {
        let policy = AbcPolicy::new().unwrap();
        let cases = [
            samples::recursion().unwrap(),
            samples::endless_loop().unwrap(),
            samples::caught_exception().unwrap(),
        ];
        for sample in cases {
            let analysis = InterProcAnalysis::new(&sample.program, &policy, sample.entry, AnalysisConfig::default());
            let passes = passes_until_fixpoint(&analysis);
            assert_eq!(passes, analysis.run().unwrap().iterations, "{}", sample.name);
        }
    }

    #[test]
    fn test_dynamic_invocation_unsupported() {
        let mut b = ProgramBuilder::new();
        let api = b.add_class(TAINT_API, Origin::Library);
        let emit_a = b.sig("emitA", vec![], Type::Void);
        let emit_a = b.add_method(api, emit_a, true);
        let main = b.add_class("Main", Origin::Application);
        let run = b.sig("run", vec![], Type::Void);
        let run = b.add_method(main, run, true);
        let mut body = BodyBuilder::new();
        body.invoke(InvokeExpr {
            kind: InvokeKind::Dynamic,
            method: emit_a,
            args: vec![],
        });
        body.ret(None);
        b.set_body(run, body.build().unwrap());
        let program = b.build();

        let policy = AbcPolicy::new().unwrap();
        let analysis = InterProcAnalysis::new(&program, &policy, run, AnalysisConfig::default());
        assert!(matches!(analysis.run(), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_entry_key() {
        let sample = samples::sibling_overrides().unwrap();
        let policy = AbcPolicy::new().unwrap();
        let analysis = InterProcAnalysis::new(&sample.program, &policy, sample.entry, AnalysisConfig::default());
        let key = analysis.entry_key();
        assert_eq!(key.region, Region::Static);
        assert!(key.args.is_empty());
        assert_eq!(analysis.config().k, 1);
    }
}
