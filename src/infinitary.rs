//! Intraprocedural analysis of non-terminating behaviour.
//!
//! Every reachable pair of statement and environment becomes a variable
//! [`Variable::Unit`] describing the infinite traces from that point on:
//!
//! ```text
//! Unit(s, env) = Σ w·Unit(s', env')  +  Σ v·Method(callee)
//! ```
//!
//! The first sum ranges over the successors (including handlers) that
//! executing `s` in `env` reaches with weight `w`. The second ranges over the
//! method table entries a call at `s` may use: a callee that diverges makes
//! the caller diverge. Solving the system leaves the entry unit expressed in
//! terms of [`Variable::Method`] only, which the interprocedural analysis
//! solves globally.

use log::debug;

use crate::class_table::ClassTable;
use crate::equations::{EquationSystem, Variable};
use crate::error::Result;
use crate::finitary::{Environment, FinitaryAnalysis};
use crate::monad::Monad;
use crate::term::EffectTerm;

pub struct InfinitaryAnalysis {
    system: EquationSystem<Variable>,
    entry: Option<Variable>,
}

impl InfinitaryAnalysis {
    /// Builds and solves the unit equations of a method whose finitary
    /// analysis has run.
    pub fn new(finitary: &FinitaryAnalysis, tables: &mut ClassTable) -> Result<Self> {
        let body = finitary.body();
        let mut system = EquationSystem::new();

        for (stmt, s) in body.stmts() {
            for env in finitary.flow_before(stmt).support() {
                let input = Monad::pure(finitary.domain(), env.clone());
                let t = finitary.transition(tables, stmt, &input)?;

                let mut rhs = EffectTerm::zero();
                for (succ, after) in &t.outs {
                    for (env, w) in after.iter() {
                        rhs.add_monomial(
                            Variable::Unit {
                                stmt: *succ,
                                env: env.clone(),
                            },
                            w.clone(),
                        );
                    }
                }
                if let Some(e) = s.invoke_expr() {
                    for (key, w) in finitary.call_keys(env, stmt, e)?.iter() {
                        rhs.add_monomial(Variable::Method(key.clone()), w.clone());
                    }
                }

                system.put(
                    Variable::Unit {
                        stmt,
                        env: env.clone(),
                    },
                    rhs,
                );
            }
        }

        debug!("{}: {} unit equations", finitary.key(), system.len());
        system.solve(finitary.domain());

        let entry = body.heads().first().map(|&stmt| Variable::Unit {
            stmt,
            env: Environment::new(),
        });
        Ok(Self { system, entry })
    }

    pub fn system(&self) -> &EquationSystem<Variable> {
        &self.system
    }

    /// Infinite behaviour from the method entry, in terms of callees' behaviour.
    pub fn result(&self) -> EffectTerm<Variable> {
        self.entry
            .as_ref()
            .and_then(|x| self.system.get(x))
            .cloned()
            .unwrap_or_default()
    }
}
