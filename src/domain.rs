//! Abstract domain derived from a Büchi automaton.
//!
//! The [`AbstractDomain`] is a manager: every operation on [`Finitary`] and
//! [`Infinitary`] values that needs the monoid goes through it, in the same way
//! that all node operations in a decision-diagram library go through its manager.
//!
//! - A [`Finitary`] value is a set of monoid classes and abstracts a language of
//!   finite words: "any finite word whose class is in this set".
//! - An [`Infinitary`] value is a set of *stable pairs* `(C, D)` with `C·D = C` and
//!   `D·D = D`. A pair abstracts the words with a finite prefix of class `C`
//!   followed by an infinite repetition of words of class `D`. Pairs with `D = 1`
//!   stand for a finite prefix followed by silent divergence.
//!
//! Acceptance of both kinds of values is decided against the automaton that the
//! domain was built from. A set is accepted iff every element is accepted.
//!
//! # Example
//!
//! ```
//! use effects_rs::automaton::Automaton;
//! use effects_rs::domain::AbstractDomain;
//!
//! let mut a = Automaton::new();
//! a.add_symbol("A");
//! a.add_symbol("B");
//! a.add_state("0");
//! a.add_state("1");
//! a.add_edge("0", "0", "A").unwrap();
//! a.add_edge("0", "1", "B").unwrap();
//! a.add_edge("1", "1", "B").unwrap();
//! a.set_initial("0").unwrap();
//! a.add_final("0").unwrap();
//! a.add_final("1").unwrap();
//!
//! let dom = AbstractDomain::new(a).unwrap();
//! let ab = dom.multiply(&dom.read_token(0), &dom.read_token(1));
//! let ba = dom.multiply(&dom.read_token(1), &dom.read_token(0));
//! assert!(dom.accepted(&ab));
//! assert!(!dom.accepted(&ba));
//! ```

use std::cell::RefCell;
use std::collections::HashMap;

use log::debug;

use crate::automaton::{Automaton, Nba};
use crate::bitset::BitSet;
use crate::cache::Cache;
use crate::error::Result;
use crate::monoid::SyntacticMonoid;
use crate::utils::{pairing_symmetric, MyHash};

/// Abstraction of a language of finite words: a set of monoid classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Finitary(BitSet);

impl Finitary {
    pub fn classes(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter()
    }

    pub fn contains(&self, class: usize) -> bool {
        self.0.contains(class)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    /// Union of the abstracted languages.
    pub fn join(&self, other: &Finitary) -> Finitary {
        let mut classes = self.0.clone();
        classes.union_with(&other.0);
        Finitary(classes)
    }

    /// In-place union. Returns true if `self` grew.
    pub fn join_assign(&mut self, other: &Finitary) -> bool {
        self.0.union_with(&other.0)
    }

    /// Returns true if the abstracted language is contained in the other one.
    pub fn leq(&self, other: &Finitary) -> bool {
        self.0.is_subset(&other.0)
    }
}

/// Abstraction of a language of finite-or-infinite words: a set of stable pairs.
///
/// The pairs are referred to by their index in the domain's pair table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Infinitary(BitSet);

impl Infinitary {
    pub fn is_zero(&self) -> bool {
        self.0.is_empty()
    }

    pub fn join(&self, other: &Infinitary) -> Infinitary {
        let mut tuples = self.0.clone();
        tuples.union_with(&other.0);
        Infinitary(tuples)
    }

    pub fn join_assign(&mut self, other: &Infinitary) -> bool {
        self.0.union_with(&other.0)
    }

    pub fn leq(&self, other: &Infinitary) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Indices of the stable pairs in this set.
    pub fn tuples(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter()
    }
}

/// Unordered pair of tuple indices, hashed symmetrically.
#[derive(Debug, Clone, Copy)]
struct TuplePair(usize, usize);

impl MyHash for TuplePair {
    fn hash(&self) -> u64 {
        pairing_symmetric(self.0 as u64, self.1 as u64)
    }
}

#[derive(Default)]
struct Memo {
    intersections: Cache<TuplePair, bool>,
    closures: Cache<usize, BitSet>,
    omegas: HashMap<BitSet, BitSet>,
}

/// The abstract domain of an automaton.
pub struct AbstractDomain {
    automaton: Automaton,
    nba: Nba,
    monoid: SyntacticMonoid,
    accepted_finitary: BitSet,
    /// Stable pairs `(C, D)`.
    tuples: Vec<(usize, usize)>,
    tuple_index: HashMap<(usize, usize), usize>,
    accepted_infinitary: BitSet,
    memo: RefCell<Memo>,
}

impl AbstractDomain {
    pub fn new(automaton: Automaton) -> Result<Self> {
        let nba = automaton.to_nba()?;
        let monoid = SyntacticMonoid::new(&automaton);
        let n = monoid.len();

        let accepted_finitary: BitSet = (0..n)
            .filter(|&x| automaton.accepts_word(monoid.representative(x)))
            .collect();

        let mut tuples = Vec::new();
        let mut tuple_index = HashMap::new();
        for c in 0..n {
            for d in 0..n {
                if monoid.multiply(c, d) == c && monoid.multiply(d, d) == d {
                    tuple_index.insert((c, d), tuples.len());
                    tuples.push((c, d));
                }
            }
        }

        let mut dom = AbstractDomain {
            automaton,
            nba,
            monoid,
            accepted_finitary,
            tuples,
            tuple_index,
            accepted_infinitary: BitSet::empty(),
            memo: RefCell::new(Memo::default()),
        };

        let mut accepted_infinitary = BitSet::new(dom.tuples.len());
        for (i, &(c, d)) in dom.tuples.iter().enumerate() {
            let accepted = if d == dom.monoid.neutral() {
                dom.automaton.accepts_word(dom.monoid.representative(c))
            } else {
                !Nba::intersection_empty(&dom.concretize(c, d), &dom.nba)
            };
            if accepted {
                accepted_infinitary.insert(i);
            }
        }
        dom.accepted_infinitary = accepted_infinitary;

        debug!(
            "abstract domain: {} classes ({} accepted), {} stable pairs ({} accepted)",
            n,
            dom.accepted_finitary.len(),
            dom.tuples.len(),
            dom.accepted_infinitary.len()
        );

        Ok(dom)
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn monoid(&self) -> &SyntacticMonoid {
        &self.monoid
    }

    /// Number of monoid classes.
    pub fn num_classes(&self) -> usize {
        self.monoid.len()
    }

    pub fn neutral(&self) -> usize {
        self.monoid.neutral()
    }

    /// Product of two monoid classes.
    pub fn multiply_classes(&self, x: usize, y: usize) -> usize {
        self.monoid.multiply(x, y)
    }

    /// Class of a single token.
    pub fn read(&self, token: usize) -> usize {
        self.monoid.read(token)
    }

    /// Token index of a named alphabet symbol.
    pub fn token(&self, symbol: &str) -> Result<usize> {
        self.automaton.symbol(symbol)
    }

    /// The stable pair with the given index.
    pub fn tuple(&self, index: usize) -> (usize, usize) {
        self.tuples[index]
    }

    fn tuple_id(&self, c: usize, d: usize) -> usize {
        // Every (x·C, D) with (C, D) stable is stable, as is every (C, 1).
        self.tuple_index[&(c, d)]
    }

    // Finitary operations

    /// Bottom element: the empty language.
    pub fn zero(&self) -> Finitary {
        Finitary::default()
    }

    /// Multiplicative unit: the language of the empty word.
    pub fn one(&self) -> Finitary {
        Finitary(BitSet::singleton(self.neutral()))
    }

    pub fn make(&self, classes: &[usize]) -> Finitary {
        Finitary(classes.iter().copied().collect())
    }

    /// Singleton of the class of one token.
    pub fn read_token(&self, token: usize) -> Finitary {
        Finitary(BitSet::singleton(self.read(token)))
    }

    /// Singleton of the class of a named symbol.
    pub fn read_symbol(&self, symbol: &str) -> Result<Finitary> {
        Ok(self.read_token(self.token(symbol)?))
    }

    /// Pointwise product.
    pub fn multiply(&self, x: &Finitary, y: &Finitary) -> Finitary {
        let mut out = BitSet::new(self.num_classes());
        for a in x.0.iter() {
            for b in y.0.iter() {
                out.insert(self.multiply_classes(a, b));
            }
        }
        Finitary(out)
    }

    /// Kleene star: the smallest superset closed under products that contains `1`.
    pub fn star(&self, x: &Finitary) -> Finitary {
        Finitary(self.star_classes(&x.0))
    }

    fn star_classes(&self, x: &BitSet) -> BitSet {
        let mut output = x.clone();
        loop {
            let before = output.clone();
            output.insert(self.neutral());
            for a in before.iter() {
                for b in before.iter() {
                    output.insert(self.multiply_classes(a, b));
                }
            }
            if output == before {
                return output;
            }
        }
    }

    /// Omega iteration: the abstraction of `L^ω`.
    pub fn omega(&self, x: &Finitary) -> Infinitary {
        if let Some(cached) = self.memo.borrow().omegas.get(&x.0) {
            return Infinitary(cached.clone());
        }
        let result = self.omega_classes(&x.0);
        self.memo
            .borrow_mut()
            .omegas
            .insert(x.0.clone(), result.clone());
        Infinitary(result)
    }

    fn omega_classes(&self, x: &BitSet) -> BitSet {
        let neutral = self.neutral();
        let mut non_neutral = x.clone();
        non_neutral.remove(neutral);

        let classes_automaton = Nba::omega(&self.classes_automaton(&non_neutral));

        let mut abstraction = BitSet::new(self.tuples.len());
        for (i, &(c, d)) in self.tuples.iter().enumerate() {
            if d == neutral {
                continue;
            }
            if !Nba::intersection_empty(&classes_automaton, &self.concretize(c, d)) {
                abstraction.insert(i);
            }
        }

        if x.contains(neutral) {
            for c in self.star_classes(x).iter() {
                abstraction.insert(self.tuple_id(c, neutral));
            }
        }

        self.closure(&abstraction)
    }

    /// Returns true if every class of `x` is accepted.
    pub fn accepted(&self, x: &Finitary) -> bool {
        x.0.is_subset(&self.accepted_finitary)
    }

    /// The greatest accepted finitary value.
    pub fn accepted_finitary(&self) -> Finitary {
        Finitary(self.accepted_finitary.clone())
    }

    // Infinitary operations

    pub fn zero_inf(&self) -> Infinitary {
        Infinitary::default()
    }

    /// `{(x·C, D) | x ∈ X, (C, D) ∈ Y}`
    pub fn multiply_inf(&self, x: &Finitary, y: &Infinitary) -> Infinitary {
        let mut out = BitSet::new(self.tuples.len());
        for a in x.0.iter() {
            for t in y.0.iter() {
                let (c, d) = self.tuples[t];
                out.insert(self.tuple_id(self.multiply_classes(a, c), d));
            }
        }
        Infinitary(out)
    }

    /// Finite words followed by silent divergence: `x · {(1, 1)}`.
    pub fn as_infinitary(&self, x: &Finitary) -> Infinitary {
        let neutral = self.neutral();
        let unit = Infinitary(BitSet::singleton(self.tuple_id(neutral, neutral)));
        self.multiply_inf(x, &unit)
    }

    pub fn accepted_inf(&self, x: &Infinitary) -> bool {
        x.0.is_subset(&self.accepted_infinitary)
    }

    /// The greatest accepted infinitary value.
    pub fn accepted_infinitary(&self) -> Infinitary {
        Infinitary(self.accepted_infinitary.clone())
    }

    // Automata of classes

    /// Automaton over monoid classes accepting the words whose class is in `accepting`.
    fn classes_automaton(&self, accepting: &BitSet) -> Nba {
        Nba::from_classes(
            self.num_classes(),
            self.neutral(),
            self.monoid.token_classes(),
            |x, y| self.multiply_classes(x, y),
            accepting,
        )
    }

    /// Büchi automaton of `C · D^ω`. Requires `D ≠ 1`.
    fn concretize(&self, c: usize, d: usize) -> Nba {
        debug_assert_ne!(d, self.neutral());
        let prefix = self.classes_automaton(&BitSet::singleton(c));
        let repeat = self.classes_automaton(&BitSet::singleton(d));
        Nba::concat(&prefix, &Nba::omega(&repeat))
    }

    fn tuples_intersect(&self, t: usize, u: usize) -> bool {
        let key = TuplePair(t, u);
        if let Some(&empty) = self.memo.borrow().intersections.get(&key) {
            return !empty;
        }
        let (c1, d1) = self.tuples[t];
        let (c2, d2) = self.tuples[u];
        let empty = Nba::intersection_empty(&self.concretize(c1, d1), &self.concretize(c2, d2));
        self.memo.borrow_mut().intersections.insert(&key, empty);
        !empty
    }

    /// All pairs whose concretizations are transitively linked to `t` by a non-empty intersection.
    fn tuple_closure(&self, t: usize) -> BitSet {
        if let Some(cached) = self.memo.borrow().closures.get(&t) {
            return cached.clone();
        }

        let neutral = self.neutral();
        let mut closure = BitSet::singleton(t);
        if self.tuples[t].1 != neutral {
            loop {
                let mut changed = false;
                for u in 0..self.tuples.len() {
                    if closure.contains(u) || self.tuples[u].1 == neutral {
                        continue;
                    }
                    let linked = closure.iter().any(|v| self.tuples_intersect(u, v));
                    if linked {
                        closure.insert(u);
                        changed = true;
                    }
                }
                if !changed {
                    break;
                }
            }
        }

        self.memo.borrow_mut().closures.insert(&t, closure.clone());
        closure
    }

    fn closure(&self, set: &BitSet) -> BitSet {
        let mut out = BitSet::new(self.tuples.len());
        for t in set.iter() {
            out.union_with(&self.tuple_closure(t));
        }
        out
    }

    /// Hit/miss counters of the intersection memo table.
    pub fn cache_stats(&self) -> (usize, usize) {
        let memo = self.memo.borrow();
        (memo.intersections.hits(), memo.intersections.misses())
    }

    // Rendering

    /// A word of the class, tokens separated by `·`, or `ε` for the empty word.
    pub fn class_to_string(&self, x: usize) -> String {
        let word = self.monoid.representative(x);
        if word.is_empty() {
            return "ε".to_string();
        }
        let symbols = self.automaton.symbols();
        word.iter()
            .map(|&t| symbols[t].as_str())
            .collect::<Vec<_>>()
            .join("·")
    }
}

impl std::fmt::Debug for AbstractDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbstractDomain")
            .field("classes", &self.num_classes())
            .field("tuples", &self.tuples.len())
            .finish()
    }
}

/// Rendering of values that only make sense relative to a domain.
pub trait Render {
    fn render(&self, dom: &AbstractDomain) -> String;
}

impl Render for Finitary {
    fn render(&self, dom: &AbstractDomain) -> String {
        let classes: Vec<String> = self.classes().map(|x| dom.class_to_string(x)).collect();
        format!("{{{}}}", classes.join(", "))
    }
}

impl Render for Infinitary {
    fn render(&self, dom: &AbstractDomain) -> String {
        let tuples: Vec<String> = self
            .tuples()
            .map(|t| {
                let (c, d) = dom.tuple(t);
                format!("({}, {})", dom.class_to_string(c), dom.class_to_string(d))
            })
            .collect();
        format!("{{{}}}", tuples.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::error::Error;
    use crate::policies::abc_automaton;

    fn abc() -> AbstractDomain {
        AbstractDomain::new(abc_automaton().unwrap()).unwrap()
    }

    fn word(dom: &AbstractDomain, w: &str) -> Finitary {
        w.chars().fold(dom.one(), |acc, ch| {
            let token = dom.read_symbol(&ch.to_string()).unwrap();
            dom.multiply(&acc, &token)
        })
    }

    #[test]
    fn test_missing_initial_state() {
        let mut a = Automaton::new();
        a.add_symbol("A");
        a.add_state("s");
        assert!(matches!(AbstractDomain::new(a), Err(Error::MissingInitialState)));
    }

    #[test]
    fn test_accepted_finitary_is_accepted() {
        let dom = abc();
        assert!(dom.accepted(&dom.accepted_finitary()));
        assert!(dom.accepted_inf(&dom.accepted_infinitary()));
        // The ABC automaton accepts everything.
        assert!(dom.accepted(&dom.one()));
        assert!(dom.accepted(&dom.zero()));
    }

    #[test]
    fn test_zero_not_accepted_by_rejecting_initial_state() {
        let mut a = Automaton::new();
        a.add_symbol("A");
        a.add_state("s0");
        a.add_state("s1");
        a.add_edge("s0", "s1", "A").unwrap();
        a.set_initial("s0").unwrap();
        a.add_final("s1").unwrap();
        let dom = AbstractDomain::new(a).unwrap();
        // The empty set is vacuously accepted, the empty word is not.
        assert!(dom.accepted(&dom.zero()));
        assert!(!dom.accepted(&dom.one()));
        assert!(dom.accepted(&dom.read_token(0)));
    }

    #[test]
    fn test_join_laws() {
        let dom = abc();
        let a = word(&dom, "A");
        let bc = word(&dom, "BC");
        assert_eq!(a.join(&bc), bc.join(&a));
        assert_eq!(a.join(&a), a);

        let ia = dom.omega(&a);
        let ib = dom.omega(&bc);
        assert_eq!(ia.join(&ib), ib.join(&ia));
        assert_eq!(ia.join(&ia), ia);
    }

    #[test]
    fn test_distinct_lengths_are_distinct_classes() {
        let dom = abc();
        let a = word(&dom, "A");
        let aa = word(&dom, "AA");
        let aaa = word(&dom, "AAA");
        let aaaa = word(&dom, "AAAA");
        assert_ne!(a, aa);
        assert_ne!(aa, aaa);
        assert_eq!(aaa, aaaa);
        assert_eq!(a.join(&aa).classes().count(), 2);
    }

    #[test]
    fn test_star() {
        let dom = abc();
        let a = word(&dom, "A");
        let star = dom.star(&a);
        assert!(star.contains(dom.neutral()));
        assert!(a.leq(&star));
        assert!(word(&dom, "AAA").leq(&star));
        assert!(!word(&dom, "B").leq(&star));
        assert_eq!(dom.star(&star), star);
    }

    #[test]
    fn test_omega_and_as_infinitary() {
        let dom = abc();
        let a = word(&dom, "A");
        let omega = dom.omega(&a);
        assert!(!omega.is_zero());
        // Every pair in A^ω repeats a non-empty class.
        for t in omega.tuples() {
            assert_ne!(dom.tuple(t).1, dom.neutral());
        }

        let silent = dom.as_infinitary(&a);
        assert_eq!(silent.tuples().count(), 1);
        let (c, d) = dom.tuple(silent.tuples().next().unwrap());
        assert_eq!((c, d), (a.classes().next().unwrap(), dom.neutral()));

        // Omega of the empty word only diverges silently.
        let one = dom.omega(&dom.one());
        assert_eq!(one, dom.as_infinitary(&dom.one()));
    }

    #[test]
    fn test_multiply_inf() {
        let dom = abc();
        let a = word(&dom, "A");
        let bc = word(&dom, "BC");
        let left = dom.multiply_inf(&a, &dom.omega(&bc));
        assert!(!left.is_zero());
        assert_eq!(dom.multiply_inf(&dom.one(), &left), left);
        assert!(dom.multiply_inf(&dom.zero(), &left).is_zero());
    }

    #[test]
    fn test_render() {
        let dom = abc();
        assert_eq!(dom.one().render(&dom), "{ε}");
        assert_eq!(word(&dom, "AB").render(&dom), "{A·B}");
        assert_eq!(dom.as_infinitary(&dom.one()).render(&dom), "{(ε, ε)}");
    }

    #[test]
    fn test_a_star_b_star_infinite() {
        let mut a = Automaton::new();
        a.add_symbol("A");
        a.add_symbol("B");
        a.add_state("0");
        a.add_state("1");
        a.add_edge("0", "0", "A").unwrap();
        a.add_edge("0", "1", "B").unwrap();
        a.add_edge("1", "1", "B").unwrap();
        a.set_initial("0").unwrap();
        a.add_final("0").unwrap();
        a.add_final("1").unwrap();
        let dom = AbstractDomain::new(a).unwrap();

        let ta = dom.read_symbol("A").unwrap();
        let tb = dom.read_symbol("B").unwrap();
        assert!(dom.accepted_inf(&dom.omega(&ta)));
        assert!(dom.accepted_inf(&dom.multiply_inf(&ta, &dom.omega(&tb))));
        let ba = dom.multiply(&tb, &ta);
        assert!(!dom.accepted_inf(&dom.omega(&ba)));
    }
}
