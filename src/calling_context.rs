//! Program points and bounded call strings.

use std::fmt;
use std::rc::Rc;

use crate::cfg::StmtId;
use crate::program::{MethodRef, Program};

/// A statement within a method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub method: MethodRef,
    pub stmt: StmtId,
}

impl Location {
    pub fn new(method: MethodRef, stmt: StmtId) -> Self {
        Self { method, stmt }
    }

    /// `Class.method(line)` if the statement has a line, else `Class.method#index`.
    pub fn describe(&self, program: &Program) -> String {
        let class = &program.class(self.method.class).name;
        let name = program.method_name(self.method);
        let line = program
            .body(self.method)
            .filter(|b| self.stmt.index() < b.len())
            .and_then(|b| b.line(self.stmt));
        match line {
            Some(line) => format!("{}.{}({})", class, name, line),
            None => format!("{}.{}{}", class, name, self.stmt),
        }
    }
}

/// The last `k` call sites on the way to the current method.
///
/// Pushing onto a full context drops the oldest call site, so contexts are
/// approximate beyond depth `k`. With `k = 0` every context is empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallingContext {
    k: usize,
    calls: Rc<[Location]>,
}

impl CallingContext {
    pub fn empty(k: usize) -> Self {
        Self {
            k,
            calls: Rc::from(Vec::new()),
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }

    pub fn calls(&self) -> &[Location] {
        &self.calls
    }

    pub fn push(&self, location: Location) -> Self {
        if self.k == 0 {
            return self.clone();
        }
        let skip = (self.calls.len() + 1).saturating_sub(self.k);
        let calls: Vec<Location> = self
            .calls
            .iter()
            .copied()
            .chain(std::iter::once(location))
            .skip(skip)
            .collect();
        Self {
            k: self.k,
            calls: Rc::from(calls),
        }
    }

    pub fn describe(&self, program: &Program) -> String {
        self.calls
            .iter()
            .map(|l| format!("in call from {}", l.describe(program)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for CallingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let calls: Vec<String> = self
            .calls
            .iter()
            .map(|l| format!("{}:{}", l.method.sig.0, l.stmt))
            .collect();
        write!(f, "[{}]", calls.join(", "))
    }
}
