//! Finite automata over a symbolic token alphabet.
//!
//! [`Automaton`] is the hand-authored description a policy writes: named states,
//! named alphabet symbols, labelled edges, one initial state and a set of final
//! states. The same automaton is read both as an NFA over finite words (final
//! states accept) and as a Büchi automaton over infinite words (final states must
//! be visited infinitely often).
//!
//! [`Nba`] is the index-only form used internally by the abstract domain to
//! build automata from monoid classes, concatenate them, take their omega
//! closure and test Büchi intersections for emptiness.

use crate::bitset::BitSet;
use crate::error::{Error, Result};
use crate::monoid::{Behaviour, TransitionBox};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Edge {
    from: usize,
    to: usize,
    token: usize,
}

/// A user-authored automaton.
///
/// ```
/// use effects_rs::automaton::Automaton;
///
/// let mut a = Automaton::new();
/// a.add_symbol("A");
/// a.add_state("s0");
/// a.add_edge("s0", "s0", "A").unwrap();
/// a.set_initial("s0").unwrap();
/// a.add_final("s0").unwrap();
///
/// assert!(a.accepts_word(&[0, 0]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Automaton {
    symbols: Vec<String>,
    states: Vec<String>,
    initial: Option<usize>,
    finals: BitSet,
    edges: Vec<Edge>,
}

impl Automaton {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an alphabet symbol and returns its token index.
    /// Adding an existing symbol returns the existing index.
    pub fn add_symbol(&mut self, name: &str) -> usize {
        if let Some(i) = self.symbols.iter().position(|s| s == name) {
            return i;
        }
        self.symbols.push(name.to_string());
        self.symbols.len() - 1
    }

    /// Adds a state and returns its index.
    pub fn add_state(&mut self, name: &str) -> usize {
        if let Some(i) = self.states.iter().position(|s| s == name) {
            return i;
        }
        self.states.push(name.to_string());
        self.states.len() - 1
    }

    pub fn state(&self, name: &str) -> Result<usize> {
        self.states
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| Error::UnknownState(name.to_string()))
    }

    pub fn symbol(&self, name: &str) -> Result<usize> {
        self.symbols
            .iter()
            .position(|s| s == name)
            .ok_or_else(|| Error::UnknownSymbol(name.to_string()))
    }

    pub fn add_edge(&mut self, from: &str, to: &str, symbol: &str) -> Result<()> {
        let edge = Edge {
            from: self.state(from)?,
            to: self.state(to)?,
            token: self.symbol(symbol)?,
        };
        self.edges.push(edge);
        Ok(())
    }

    pub fn set_initial(&mut self, name: &str) -> Result<()> {
        self.initial = Some(self.state(name)?);
        Ok(())
    }

    pub fn add_final(&mut self, name: &str) -> Result<()> {
        let s = self.state(name)?;
        self.finals.insert(s);
        Ok(())
    }

    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn states(&self) -> &[String] {
        &self.states
    }

    pub fn initial(&self) -> Option<usize> {
        self.initial
    }

    pub fn is_final(&self, state: usize) -> bool {
        self.finals.contains(state)
    }

    /// Iterates over `(from, to, token)` triples.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.edges.iter().map(|e| (e.from, e.to, e.token))
    }

    /// Returns true if the finite word (a sequence of token indices) ends in a final state.
    pub fn accepts_word(&self, word: &[usize]) -> bool {
        let Some(initial) = self.initial else {
            return false;
        };
        let mut current = BitSet::singleton(initial);
        for &token in word {
            let mut next = BitSet::new(self.states.len());
            for e in &self.edges {
                if e.token == token && current.contains(e.from) {
                    next.insert(e.to);
                }
            }
            if next.is_empty() {
                return false;
            }
            current = next;
        }
        current.iter().any(|s| self.finals.contains(s))
    }

    /// Transition box of every single-token word, indexed by token.
    ///
    /// An edge is marked as passing through a final state if either of its
    /// endpoints is final.
    pub(crate) fn alphabet_boxes(&self) -> Vec<TransitionBox> {
        let n = self.states.len();
        (0..self.symbols.len())
            .map(|token| {
                let mut b = TransitionBox::empty(n);
                for e in self.edges.iter().filter(|e| e.token == token) {
                    if self.finals.contains(e.from) || self.finals.contains(e.to) {
                        b.set(e.from, e.to, Behaviour::ReachableThroughFinal);
                    } else if b.get(e.from, e.to) == Behaviour::NotReachable {
                        b.set(e.from, e.to, Behaviour::Reachable);
                    }
                }
                b
            })
            .collect()
    }

    /// Converts to the index-only representation.
    pub(crate) fn to_nba(&self) -> Result<Nba> {
        let initial = self.initial.ok_or(Error::MissingInitialState)?;
        Ok(Nba {
            num_states: self.states.len(),
            initial,
            finals: self.finals.clone(),
            edges: self.edges.iter().map(|e| (e.from, e.to, e.token)).collect(),
        })
    }
}

/// A nondeterministic Büchi automaton over token indices.
#[derive(Debug, Clone)]
pub(crate) struct Nba {
    pub num_states: usize,
    pub initial: usize,
    pub finals: BitSet,
    /// `(from, to, token)`
    pub edges: Vec<(usize, usize, usize)>,
}

impl Nba {
    /// Automaton whose states are the monoid classes: reading token `t` in class `x`
    /// moves to `x · read(t)`. The neutral class is initial.
    pub fn from_classes(
        num_classes: usize,
        neutral: usize,
        token_classes: &[usize],
        multiply: impl Fn(usize, usize) -> usize,
        accepting: &BitSet,
    ) -> Self {
        let mut edges = Vec::with_capacity(num_classes * token_classes.len());
        for x in 0..num_classes {
            for (token, &cls) in token_classes.iter().enumerate() {
                edges.push((x, multiply(x, cls), token));
            }
        }
        Nba {
            num_states: num_classes,
            initial: neutral,
            finals: accepting.clone(),
            edges,
        }
    }

    /// Language concatenation `L(a) · L(b)`.
    pub fn concat(a: &Nba, b: &Nba) -> Nba {
        let off = a.num_states;
        let mut edges = a.edges.clone();
        edges.extend(b.edges.iter().map(|&(s, t, l)| (s + off, t + off, l)));
        for &(s, t, l) in &a.edges {
            if a.finals.contains(t) {
                edges.push((s, b.initial + off, l));
            }
        }
        if a.finals.contains(a.initial) {
            for &(s, t, l) in &b.edges {
                if s == b.initial {
                    edges.push((a.initial, t + off, l));
                }
            }
        }
        Nba {
            num_states: a.num_states + b.num_states,
            initial: a.initial,
            finals: b.finals.iter().map(|f| f + off).collect(),
            edges,
        }
    }

    /// Omega iteration `L(a)^ω` through a fresh initial state that is the only final one.
    pub fn omega(a: &Nba) -> Nba {
        let init = a.num_states;
        let mut edges = a.edges.clone();
        for &(s, t, l) in &a.edges {
            if s == a.initial {
                edges.push((init, t, l));
            }
            if a.finals.contains(t) {
                edges.push((s, init, l));
                if s == a.initial {
                    edges.push((init, init, l));
                }
            }
        }
        Nba {
            num_states: a.num_states + 1,
            initial: init,
            finals: BitSet::singleton(init),
            edges,
        }
    }

    /// Returns true if no infinite word is accepted by both automata.
    ///
    /// The product carries a copy bit: copy 0 waits for a final state of `a`,
    /// copy 1 waits for a final state of `b`. A product state in copy 1 sitting on
    /// a final state of `b` is accepting. The intersection is non-empty iff such
    /// a state is reachable from the initial state and lies on a cycle.
    pub fn intersection_empty(a: &Nba, b: &Nba) -> bool {
        let nb = b.num_states;
        let index = |sa: usize, sb: usize, copy: usize| (sa * nb + sb) * 2 + copy;
        let size = a.num_states * nb * 2;

        let num_tokens = b.edges.iter().map(|&(_, _, l)| l + 1).max().unwrap_or(0);
        let mut b_by_token: Vec<Vec<(usize, usize)>> = vec![Vec::new(); num_tokens];
        for &(sb, tb, lb) in &b.edges {
            b_by_token[lb].push((sb, tb));
        }

        let mut succ: Vec<BitSet> = vec![BitSet::empty(); size];
        for &(sa, ta, la) in &a.edges {
            let Some(matching) = b_by_token.get(la) else {
                continue;
            };
            for &(sb, tb) in matching {
                let next0 = if a.finals.contains(sa) { 1 } else { 0 };
                succ[index(sa, sb, 0)].insert(index(ta, tb, next0));
                let next1 = if b.finals.contains(sb) { 0 } else { 1 };
                succ[index(sa, sb, 1)].insert(index(ta, tb, next1));
            }
        }

        let init = index(a.initial, b.initial, 0);
        let reachable = reachable_in_one_or_more(&succ, init);
        for sa in 0..a.num_states {
            for fb in b.finals.iter() {
                let f = index(sa, fb, 1);
                if reachable.contains(f) && reachable_in_one_or_more(&succ, f).contains(f) {
                    return false;
                }
            }
        }
        true
    }
}

/// States reachable from `source` by a path of at least one edge.
fn reachable_in_one_or_more(succ: &[BitSet], source: usize) -> BitSet {
    let mut visited = BitSet::new(succ.len());
    let mut stack: Vec<usize> = succ[source].iter().collect();
    while let Some(s) = stack.pop() {
        if visited.insert(s) {
            stack.extend(succ[s].iter().filter(|t| !visited.contains(*t)));
        }
    }
    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn a_star_b_star() -> Automaton {
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
        a
    }

    #[test]
    fn test_unknown_names() {
        let mut a = a_star_b_star();
        assert!(matches!(a.add_edge("0", "9", "A"), Err(Error::UnknownState(s)) if s == "9"));
        assert!(matches!(a.add_edge("0", "1", "C"), Err(Error::UnknownSymbol(s)) if s == "C"));
        assert!(matches!(Automaton::new().to_nba(), Err(Error::MissingInitialState)));
    }

    #[test]
    fn test_accepts_word() {
        let a = a_star_b_star();
        assert!(a.accepts_word(&[]));
        assert!(a.accepts_word(&[0, 0, 1, 1]));
        assert!(!a.accepts_word(&[1, 0]));
    }

    #[test]
    fn test_symbol_dedup() {
        let mut a = Automaton::new();
        assert_eq!(a.add_symbol("x"), 0);
        assert_eq!(a.add_symbol("y"), 1);
        assert_eq!(a.add_symbol("x"), 0);
        assert_eq!(a.num_symbols(), 2);
    }

    #[test]
    fn test_buchi_intersection() {
        let a = a_star_b_star().to_nba().unwrap();

        // Only `A^ω`.
        let mut only_a = Automaton::new();
        only_a.add_symbol("A");
        only_a.add_symbol("B");
        only_a.add_state("q");
        only_a.add_edge("q", "q", "A").unwrap();
        only_a.set_initial("q").unwrap();
        only_a.add_final("q").unwrap();
        let only_a = only_a.to_nba().unwrap();
        assert!(!Nba::intersection_empty(&a, &only_a));

        // Only `(BA)^ω`, which `a*b*` never allows.
        let mut ba = Automaton::new();
        ba.add_symbol("A");
        ba.add_symbol("B");
        ba.add_state("p");
        ba.add_state("q");
        ba.add_edge("p", "q", "B").unwrap();
        ba.add_edge("q", "p", "A").unwrap();
        ba.set_initial("p").unwrap();
        ba.add_final("p").unwrap();
        let ba = ba.to_nba().unwrap();
        assert!(Nba::intersection_empty(&a, &ba));
    }

    #[test]
    fn test_concat_and_omega() {
        let a = a_star_b_star().to_nba().unwrap();
        let c = Nba::concat(&a, &a);
        assert_eq!(c.num_states, 4);
        assert_eq!(c.initial, a.initial);
        assert_eq!(c.finals.iter().collect::<Vec<_>>(), vec![2, 3]);

        let w = Nba::omega(&a);
        assert_eq!(w.num_states, 3);
        assert_eq!(w.initial, 2);
        assert!(w.finals.contains(2));
        assert!(!Nba::intersection_empty(&w, &a));
    }
}
