//! Types with effects: what a method returns, what it throws, and how it may diverge.

use crate::domain::{AbstractDomain, Finitary, Render};
use crate::equations::Variable;
use crate::monad::Monad;
use crate::region::Region;
use crate::term::EffectTerm;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectType {
    /// Regions of normally returned values, weighted by the traces that produce them.
    pub ret: Monad<Region>,
    /// Regions of thrown exceptions, weighted likewise.
    pub thrown: Monad<Region>,
    /// Non-terminating behaviour, possibly in terms of other methods' behaviour.
    pub infinitary: EffectTerm<Variable>,
}

impl EffectType {
    /// Terminating behaviour only.
    pub fn new(ret: Monad<Region>, thrown: Monad<Region>) -> Self {
        Self {
            ret,
            thrown,
            infinitary: EffectTerm::zero(),
        }
    }

    /// Nothing is returned, nothing is thrown, no divergence: unreachable code.
    pub fn bottom() -> Self {
        Self::default()
    }

    pub fn with_infinitary(&self, infinitary: EffectTerm<Variable>) -> Self {
        Self {
            ret: self.ret.clone(),
            thrown: self.thrown.clone(),
            infinitary,
        }
    }

    pub fn join(&self, other: &EffectType) -> EffectType {
        EffectType {
            ret: self.ret.join(&other.ret),
            thrown: self.thrown.join(&other.thrown),
            infinitary: self.infinitary.join(&other.infinitary),
        }
    }

    pub fn join_assign(&mut self, other: &EffectType) {
        self.ret.join_assign(&other.ret);
        self.thrown.join_assign(&other.thrown);
        self.infinitary.add(&other.infinitary);
    }

    pub fn leq(&self, other: &EffectType) -> bool {
        self.ret.leq(&other.ret)
            && self.thrown.leq(&other.thrown)
            && self.infinitary.leq(&other.infinitary)
    }

    /// All terminating traces, whether they return or throw.
    pub fn aggregate(&self) -> Finitary {
        self.ret.aggregate().join(&self.thrown.aggregate())
    }
}

impl Render for Monad<Region> {
    fn render(&self, dom: &AbstractDomain) -> String {
        let choices: Vec<String> = self
            .iter()
            .map(|(r, w)| format!("{} & {}", r, w.render(dom)))
            .collect();
        format!("[{}]", choices.join(", "))
    }
}

impl Render for EffectType {
    fn render(&self, dom: &AbstractDomain) -> String {
        format!(
            "{} throws {}",
            self.ret.render(dom),
            self.thrown.render(dom)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::policies::abc_automaton;

    #[test]
    fn test_join_laws() {
        let dom = AbstractDomain::new(abc_automaton().unwrap()).unwrap();
        let a = dom.read_symbol("A").unwrap();
        let b = dom.read_symbol("B").unwrap();

        let t1 = EffectType::new(
            Monad::weighted(Region::BaseType, a.clone()),
            Monad::weighted(Region::Exception, b.clone()),
        );
        let mut infinitary = EffectTerm::constant_term(dom.omega(&a));
        infinitary.add_monomial(
            Variable::Unit {
                stmt: crate::cfg::StmtId(0),
                env: Default::default(),
            },
            b.clone(),
        );
        let t2 = EffectType::new(Monad::weighted(Region::Null, b.clone()), Monad::empty())
            .with_infinitary(infinitary);

        assert_eq!(t1.join(&t2), t2.join(&t1));
        assert_eq!(t1.join(&t1), t1);
        assert!(t1.leq(&t1.join(&t2)));
        assert!(EffectType::bottom().leq(&t1));
    }

    #[test]
    fn test_aggregate_includes_exceptions() {
        let dom = AbstractDomain::new(abc_automaton().unwrap()).unwrap();
        let a = dom.read_symbol("A").unwrap();
        let b = dom.read_symbol("B").unwrap();
        let t = EffectType::new(
            Monad::weighted(Region::BaseType, a.clone()),
            Monad::weighted(Region::Exception, b.clone()),
        );
        assert_eq!(t.aggregate(), a.join(&b));
        assert!(EffectType::bottom().aggregate().is_zero());
    }
}
