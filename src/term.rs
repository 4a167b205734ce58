//! Linear effect terms `a·x + b·y + c`.
//!
//! Variables `x, y` are of an arbitrary ordered type `K`, coefficients `a, b` are
//! [`Finitary`] values, and the constant `c` is an [`Infinitary`] value. All
//! arithmetic that needs the monoid is done through the [`AbstractDomain`].

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::{AbstractDomain, Finitary, Infinitary, Render};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectTerm<K: Ord> {
    coefficients: BTreeMap<K, Finitary>,
    constant: Infinitary,
}

impl<K: Ord> Default for EffectTerm<K> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<K: Ord> EffectTerm<K> {
    /// The zero term: no monomials, empty constant.
    pub fn zero() -> Self {
        Self {
            coefficients: BTreeMap::new(),
            constant: Infinitary::default(),
        }
    }

    pub fn constant_term(constant: Infinitary) -> Self {
        Self {
            coefficients: BTreeMap::new(),
            constant,
        }
    }

    pub fn constant(&self) -> &Infinitary {
        &self.constant
    }

    pub fn coefficients(&self) -> &BTreeMap<K, Finitary> {
        &self.coefficients
    }

    pub fn coefficient(&self, k: &K) -> Option<&Finitary> {
        self.coefficients.get(k)
    }

    pub fn variables(&self) -> impl Iterator<Item = &K> + '_ {
        self.coefficients.keys()
    }

    pub fn add_constant(&mut self, c: &Infinitary) {
        self.constant.join_assign(c);
    }

    /// Adds `a·k`, joining with an existing coefficient of `k`.
    pub fn add_monomial(&mut self, k: K, a: Finitary) {
        match self.coefficients.entry(k) {
            Entry::Occupied(mut e) => {
                e.get_mut().join_assign(&a);
            }
            Entry::Vacant(e) => {
                e.insert(a);
            }
        }
    }

    pub fn remove_monomial(&mut self, k: &K) -> Option<Finitary> {
        self.coefficients.remove(k)
    }

    /// Returns true if the term is below `other` in the join order.
    pub fn leq(&self, other: &EffectTerm<K>) -> bool {
        self.constant.leq(&other.constant)
            && self
                .coefficients
                .iter()
                .all(|(k, a)| other.coefficients.get(k).is_some_and(|b| a.leq(b)))
    }
}

impl<K: Ord + Clone> EffectTerm<K> {
    /// Adds another term.
    pub fn add(&mut self, other: &EffectTerm<K>) {
        for (k, a) in &other.coefficients {
            self.add_monomial(k.clone(), a.clone());
        }
        self.constant.join_assign(&other.constant);
    }

    pub fn join(&self, other: &EffectTerm<K>) -> EffectTerm<K> {
        let mut out = self.clone();
        out.add(other);
        out
    }

    /// Multiplies every monomial and the constant from the left: `b·x + d` becomes `a·b·x + a·d`.
    pub fn multiply_left(&mut self, dom: &AbstractDomain, a: &Finitary) {
        for b in self.coefficients.values_mut() {
            *b = dom.multiply(a, b);
        }
        self.constant = dom.multiply_inf(a, &self.constant);
    }

    /// Replaces the variable `k` by the term `p`.
    pub fn substitute(&mut self, dom: &AbstractDomain, k: &K, p: &EffectTerm<K>) {
        let Some(a) = self.remove_monomial(k) else {
            return;
        };
        let mut pk = p.clone();
        pk.multiply_left(dom, &a);
        self.add(&pk);
    }
}

impl<K: Ord + fmt::Display> Render for EffectTerm<K> {
    fn render(&self, dom: &AbstractDomain) -> String {
        let mut parts: Vec<String> = self
            .coefficients
            .iter()
            .map(|(k, a)| format!("{}.{}", a.render(dom), k))
            .collect();
        parts.push(self.constant.render(dom));
        parts.join(" + ")
    }
}
