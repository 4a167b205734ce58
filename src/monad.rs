//! Weighted nondeterministic choice.
//!
//! A [`Monad<A>`] maps each possible value to the finitary effect (a set of monoid
//! classes) of the traces along which that value arises. `pure(a)` is `a` reached
//! by the empty trace. Binding multiplies the weight of a choice with the weights
//! of the choices it leads to, and choices that meet are joined.
//!
//! Choices are kept in a `BTreeMap` so that iteration, and therefore every
//! downstream fixpoint computation, is deterministic.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::domain::{AbstractDomain, Finitary};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monad<A: Ord> {
    choices: BTreeMap<A, Finitary>,
}

impl<A: Ord + Clone> Default for Monad<A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<A: Ord + Clone> Monad<A> {
    /// No choices: an unreachable value.
    pub fn empty() -> Self {
        Self {
            choices: BTreeMap::new(),
        }
    }

    pub fn pure(dom: &AbstractDomain, value: A) -> Self {
        Self::weighted(value, dom.one())
    }

    pub fn weighted(value: A, weight: Finitary) -> Self {
        Self {
            choices: BTreeMap::from([(value, weight)]),
        }
    }

    /// Each value reached by the empty trace.
    pub fn cases(dom: &AbstractDomain, values: impl IntoIterator<Item = A>) -> Self {
        let one = dom.one();
        Self {
            choices: values.into_iter().map(|v| (v, one.clone())).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn get(&self, value: &A) -> Option<&Finitary> {
        self.choices.get(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&A, &Finitary)> + '_ {
        self.choices.iter()
    }

    pub fn support(&self) -> impl Iterator<Item = &A> + '_ {
        self.choices.keys()
    }

    /// Adds one choice, joining its weight with an existing one.
    pub fn insert(&mut self, value: A, weight: Finitary) {
        match self.choices.entry(value) {
            Entry::Occupied(mut e) => {
                e.get_mut().join_assign(&weight);
            }
            Entry::Vacant(e) => {
                e.insert(weight);
            }
        }
    }

    pub fn join(&self, other: &Monad<A>) -> Monad<A> {
        let mut out = self.clone();
        out.join_assign(other);
        out
    }

    pub fn join_assign(&mut self, other: &Monad<A>) {
        for (v, w) in &other.choices {
            self.insert(v.clone(), w.clone());
        }
    }

    /// Joins `weight · w` into `self` for every choice `(v, w)` of `other`.
    pub fn join_scaled(&mut self, dom: &AbstractDomain, weight: &Finitary, other: &Monad<A>) {
        for (v, w) in &other.choices {
            self.insert(v.clone(), dom.multiply(weight, w));
        }
    }

    /// Appends an effect to every choice.
    pub fn then_effect(&self, dom: &AbstractDomain, effect: &Finitary) -> Monad<A> {
        Monad {
            choices: self
                .choices
                .iter()
                .map(|(v, w)| (v.clone(), dom.multiply(w, effect)))
                .collect(),
        }
    }

    /// Monadic bind.
    pub fn bind<B: Ord + Clone>(
        &self,
        dom: &AbstractDomain,
        mut f: impl FnMut(&A) -> Monad<B>,
    ) -> Monad<B> {
        let mut out = Monad::empty();
        for (v, w) in &self.choices {
            out.join_scaled(dom, w, &f(v));
        }
        out
    }

    /// Applies `f` to every value. Values that collide have their weights joined.
    pub fn map<B: Ord + Clone>(&self, mut f: impl FnMut(&A) -> B) -> Monad<B> {
        let mut out = Monad::empty();
        for (v, w) in &self.choices {
            out.insert(f(v), w.clone());
        }
        out
    }

    pub fn remove(&mut self, value: &A) -> Option<Finitary> {
        self.choices.remove(value)
    }

    /// Join of all weights: every trace along which some value arises.
    pub fn aggregate(&self) -> Finitary {
        self.choices
            .values()
            .fold(Finitary::default(), |acc, w| acc.join(w))
    }

    /// Returns true if every choice of `self` is in `other` with a larger weight.
    pub fn leq(&self, other: &Monad<A>) -> bool {
        self.choices
            .iter()
            .all(|(v, w)| other.choices.get(v).is_some_and(|o| w.leq(o)))
    }

    /// All combinations of one choice from each monad, weights multiplied left to right.
    pub fn sequence(dom: &AbstractDomain, monads: &[Monad<A>]) -> Monad<Vec<A>> {
        let mut acc: Monad<Vec<A>> = Monad::pure(dom, Vec::new());
        for m in monads {
            acc = acc.bind(dom, |prefix| {
                m.map(|v| {
                    let mut next = prefix.clone();
                    next.push(v.clone());
                    next
                })
            });
        }
        acc
    }
}

impl<A: Ord> FromIterator<(A, Finitary)> for Monad<A> {
    fn from_iter<T: IntoIterator<Item = (A, Finitary)>>(iter: T) -> Self {
        let mut choices: BTreeMap<A, Finitary> = BTreeMap::new();
        for (v, w) in iter {
            match choices.entry(v) {
                Entry::Occupied(mut e) => {
                    e.get_mut().join_assign(&w);
                }
                Entry::Vacant(e) => {
                    e.insert(w);
                }
            }
        }
        Self { choices }
    }
}
