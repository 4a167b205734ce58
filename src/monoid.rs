//! Syntactic monoid of an automaton.
//!
//! A [`TransitionBox`] records, for every ordered pair of states `(p, q)`, whether
//! some word of the class leads from `p` to `q`, and whether such a path visits a
//! final state. Boxes compose by relational product. The set of boxes of all
//! non-empty words, plus the box of the empty word, forms a finite monoid; its
//! elements are numbered `0..n` and their product is precomputed into a table.

use std::collections::HashMap;
use std::collections::VecDeque;

use log::debug;

use crate::automaton::Automaton;

/// How a word relates two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Behaviour {
    NotReachable,
    Reachable,
    ReachableThroughFinal,
}

impl Behaviour {
    /// Behaviour of a path `p → q → r` given the behaviours of its two halves.
    fn then(self, other: Behaviour) -> Behaviour {
        if self == Behaviour::NotReachable || other == Behaviour::NotReachable {
            Behaviour::NotReachable
        } else {
            self.max(other)
        }
    }
}

/// An `n × n` matrix of [`Behaviour`]s, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransitionBox {
    n: usize,
    actions: Vec<Behaviour>,
}

impl TransitionBox {
    pub fn empty(n: usize) -> Self {
        Self {
            n,
            actions: vec![Behaviour::NotReachable; n * n],
        }
    }

    /// Box of the empty word: every state reaches itself, through a final state iff it is final.
    pub fn neutral(n: usize, is_final: impl Fn(usize) -> bool) -> Self {
        let mut b = Self::empty(n);
        for s in 0..n {
            let behaviour = if is_final(s) {
                Behaviour::ReachableThroughFinal
            } else {
                Behaviour::Reachable
            };
            b.set(s, s, behaviour);
        }
        b
    }

    pub fn get(&self, from: usize, to: usize) -> Behaviour {
        self.actions[from * self.n + to]
    }

    pub fn set(&mut self, from: usize, to: usize, behaviour: Behaviour) {
        self.actions[from * self.n + to] = behaviour;
    }

    /// Box of the concatenation of a word of class `self` with a word of class `other`.
    pub fn concat(&self, other: &TransitionBox) -> TransitionBox {
        let n = self.n;
        let mut c = TransitionBox::empty(n);
        for s1 in 0..n {
            for s3 in 0..n {
                let mut best = Behaviour::NotReachable;
                for s2 in 0..n {
                    best = best.max(self.get(s1, s2).then(other.get(s2, s3)));
                    if best == Behaviour::ReachableThroughFinal {
                        break;
                    }
                }
                c.set(s1, s3, best);
            }
        }
        c
    }
}

/// The syntactic monoid of an [`Automaton`].
#[derive(Debug, Clone)]
pub struct SyntacticMonoid {
    boxes: Vec<TransitionBox>,
    /// A representative word (token indices) for each class.
    words: Vec<Vec<usize>>,
    neutral: usize,
    /// Class of each single-token word, indexed by token.
    token_classes: Vec<usize>,
    /// `table[x * n + y] = x · y`
    table: Vec<usize>,
}

impl SyntacticMonoid {
    pub fn new(automaton: &Automaton) -> Self {
        let alphabet = automaton.alphabet_boxes();

        let mut boxes: Vec<TransitionBox> = Vec::new();
        let mut words: Vec<Vec<usize>> = Vec::new();
        let mut index: HashMap<TransitionBox, usize> = HashMap::new();

        let mut token_classes = Vec::with_capacity(alphabet.len());
        let mut queue = VecDeque::new();
        for (token, b) in alphabet.iter().enumerate() {
            let cls = match index.get(b) {
                Some(&cls) => cls,
                None => {
                    let cls = boxes.len();
                    index.insert(b.clone(), cls);
                    boxes.push(b.clone());
                    words.push(vec![token]);
                    queue.push_back(cls);
                    cls
                }
            };
            token_classes.push(cls);
        }

        // Close under right multiplication by single tokens.
        let mut right: Vec<Vec<usize>> = vec![Vec::new(); boxes.len()];
        while let Some(cls) = queue.pop_front() {
            let mut row = Vec::with_capacity(alphabet.len());
            for (token, b) in alphabet.iter().enumerate() {
                let product = boxes[cls].concat(b);
                let target = match index.get(&product) {
                    Some(&target) => target,
                    None => {
                        let target = boxes.len();
                        let mut word = words[cls].clone();
                        word.push(token);
                        index.insert(product.clone(), target);
                        boxes.push(product);
                        words.push(word);
                        right.push(Vec::new());
                        queue.push_back(target);
                        target
                    }
                };
                row.push(target);
            }
            right[cls] = row;
        }

        let id = TransitionBox::neutral(automaton.num_states(), |s| automaton.is_final(s));
        let neutral = match index.get(&id) {
            Some(&cls) => cls,
            None => {
                boxes.push(id);
                words.push(Vec::new());
                right.push(token_classes.clone());
                boxes.len() - 1
            }
        };

        let n = boxes.len();
        let mut table = vec![0; n * n];
        for x in 0..n {
            for y in 0..n {
                table[x * n + y] = words[y].iter().fold(x, |acc, &t| right[acc][t]);
            }
        }

        debug!(
            "syntactic monoid: {} classes over {} tokens, neutral = {}",
            n,
            alphabet.len(),
            neutral
        );

        Self {
            boxes,
            words,
            neutral,
            token_classes,
            table,
        }
    }

    /// Number of classes.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    pub fn neutral(&self) -> usize {
        self.neutral
    }

    pub fn multiply(&self, x: usize, y: usize) -> usize {
        self.table[x * self.len() + y]
    }

    /// Class of a single token.
    pub fn read(&self, token: usize) -> usize {
        self.token_classes[token]
    }

    /// Class of a word.
    pub fn read_word(&self, word: &[usize]) -> usize {
        word.iter()
            .fold(self.neutral, |acc, &t| self.multiply(acc, self.read(t)))
    }

    pub fn token_classes(&self) -> &[usize] {
        &self.token_classes
    }

    /// A shortest-found word of the given class.
    pub fn representative(&self, x: usize) -> &[usize] {
        &self.words[x]
    }
}
