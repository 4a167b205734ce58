//! Systems of linear equations `x = a·y + b·z + c` over effect terms.
//!
//! Each variable has at most one equation. Solving eliminates variables one at a
//! time in the style of Gaussian elimination, using the Kleene-algebra identity
//! for a self-referencing equation:
//!
//! ```text
//! x = a·x + p    ~~>    x = a*·p + a^ω
//! ```
//!
//! where `a*` is the [star][crate::domain::AbstractDomain::star] of the loop
//! coefficient and `a^ω` its [omega][crate::domain::AbstractDomain::omega]
//! iteration. Variables without an equation stay free in the solution.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use log::debug;

use crate::cfg::StmtId;
use crate::domain::{AbstractDomain, Render};
use crate::finitary::Environment;
use crate::tables::MethodKey;
use crate::term::EffectTerm;

/// Unknowns of the infinitary analysis.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Variable {
    /// Behaviour from a statement onwards, entered with the given environment.
    Unit { stmt: StmtId, env: Environment },
    /// Behaviour of a whole method table entry.
    Method(MethodKey),
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::Unit { stmt, env } => {
                let bindings: Vec<String> = env
                    .iter()
                    .map(|(l, r)| format!("l{}: {}", l.0, r))
                    .collect();
                write!(f, "{}{{{}}}", stmt, bindings.join(", "))
            }
            Variable::Method(key) => write!(f, "{}", key),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EquationSystem<K: Ord> {
    equations: BTreeMap<K, EffectTerm<K>>,
}

impl<K: Ord> Default for EquationSystem<K> {
    fn default() -> Self {
        Self {
            equations: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone> EquationSystem<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.equations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equations.is_empty()
    }

    /// Adds `x = p`, replacing any existing equation for `x`.
    pub fn put(&mut self, x: K, p: EffectTerm<K>) {
        self.equations.insert(x, p);
    }

    /// Right-hand side of the equation for `x`.
    pub fn get(&self, x: &K) -> Option<&EffectTerm<K>> {
        self.equations.get(x)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &EffectTerm<K>)> + '_ {
        self.equations.iter()
    }

    /// For each variable, the left-hand sides of the equations that mention it.
    fn uses(&self) -> BTreeMap<K, BTreeSet<K>> {
        let mut uses: BTreeMap<K, BTreeSet<K>> = BTreeMap::new();
        for (x, p) in &self.equations {
            uses.entry(x.clone()).or_default();
            for y in p.variables() {
                uses.entry(y.clone()).or_default().insert(x.clone());
            }
        }
        uses
    }

    /// Rewrites every right-hand side so that it mentions no variable that has an equation.
    pub fn solve(&mut self, dom: &AbstractDomain) {
        let mut uses = self.uses();
        let vars: Vec<K> = self.equations.keys().cloned().collect();

        for x in vars {
            let Some(mut solution) = self.equations.remove(&x) else {
                continue;
            };

            if let Some(a) = solution.remove_monomial(&x) {
                if let Some(users) = uses.get_mut(&x) {
                    users.remove(&x);
                }
                solution.multiply_left(dom, &dom.star(&a));
                solution.add_constant(&dom.omega(&a));
            }

            let users: Vec<K> = uses
                .get(&x)
                .map(|u| u.iter().cloned().collect())
                .unwrap_or_default();
            for y in users {
                if let Some(rhs) = self.equations.get_mut(&y) {
                    rhs.substitute(dom, &x, &solution);
                }
                for z in solution.variables() {
                    uses.entry(z.clone()).or_default().insert(y.clone());
                }
            }

            self.equations.insert(x, solution);
        }

        debug!("solved {} equations", self.equations.len());
    }
}

impl<K: Ord + Clone + fmt::Display> Render for EquationSystem<K> {
    fn render(&self, dom: &AbstractDomain) -> String {
        self.equations
            .iter()
            .map(|(x, p)| format!("{} = {}\n", x, p.render(dom)))
            .collect()
    }
}
