//! Forward dataflow over the statements of a [`Body`].

use log::trace;

use crate::bitset::BitSet;
use crate::cfg::{Body, StmtId};
use crate::error::Result;

/// A forward dataflow problem.
pub trait ForwardFlow {
    type Fact: Clone + PartialEq;

    /// Fact at the heads of the body.
    fn entry_fact(&self) -> Self::Fact;

    /// Fact of statements not reached yet.
    fn bottom(&self) -> Self::Fact;

    fn join(&self, a: &Self::Fact, b: &Self::Fact) -> Self::Fact;

    /// Facts flowing from `stmt` into each of its successors, given the fact before it.
    fn flow_through(&mut self, stmt: StmtId, before: &Self::Fact) -> Result<Vec<(StmtId, Self::Fact)>>;
}

/// Computes the fact before every statement.
///
/// Statements are visited in index order. Whenever the fact before a statement
/// grows, the statement is revisited before any statement after it.
pub fn solve_forward<F: ForwardFlow>(flow: &mut F, body: &Body) -> Result<Vec<F::Fact>> {
    let n = body.len();
    let mut before = vec![flow.bottom(); n];
    for head in body.heads() {
        before[head.index()] = flow.entry_fact();
    }

    let mut work = BitSet::full(n);
    let mut cursor = 0;
    let mut steps = 0usize;
    while let Some(i) = work.next_set_bit(cursor) {
        work.remove(i);
        cursor = i + 1;
        steps += 1;

        let fact = before[i].clone();
        for (to, flowed) in flow.flow_through(StmtId(i as u32), &fact)? {
            let j = to.index();
            let merged = flow.join(&before[j], &flowed);
            if merged != before[j] {
                before[j] = merged;
                work.insert(j);
                cursor = cursor.min(j);
            }
        }
    }
    trace!("dataflow stabilised after {} steps over {} statements", steps, n);

    Ok(before)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    use crate::cfg::{BodyBuilder, Operand};

    /// Distance from the entry, saturating at a bound. Flows nowhere on its own.
    struct Distance {
        bound: u32,
    }

    impl ForwardFlow for Distance {
        type Fact = Option<u32>;

        fn entry_fact(&self) -> Self::Fact {
            Some(0)
        }

        fn bottom(&self) -> Self::Fact {
            None
        }

        fn join(&self, a: &Self::Fact, b: &Self::Fact) -> Self::Fact {
            match (a, b) {
                (Some(x), Some(y)) => Some(*x.max(y)),
                (x, None) => *x,
                (None, y) => *y,
            }
        }

        fn flow_through(&mut self, _stmt: StmtId, _before: &Self::Fact) -> Result<Vec<(StmtId, Self::Fact)>> {
            Ok(Vec::new())
        }
    }

    /// Propagates along the real successors of a body.
    struct Along<'b> {
        body: &'b Body,
        inner: Distance,
    }

    impl ForwardFlow for Along<'_> {
        type Fact = Option<u32>;

        fn entry_fact(&self) -> Self::Fact {
            self.inner.entry_fact()
        }

        fn bottom(&self) -> Self::Fact {
            self.inner.bottom()
        }

        fn join(&self, a: &Self::Fact, b: &Self::Fact) -> Self::Fact {
            self.inner.join(a, b)
        }

        fn flow_through(&mut self, stmt: StmtId, before: &Self::Fact) -> Result<Vec<(StmtId, Self::Fact)>> {
            let next = before.map(|d| (d + 1).min(self.inner.bound));
            Ok(self.body.succs(stmt).iter().map(|&s| (s, next)).collect())
        }
    }

    #[test]
    fn test_straight_line() {
        let mut b = BodyBuilder::new();
        b.nop();
        b.nop();
        b.ret(None);
        let body = b.build().unwrap();
        let mut flow = Along {
            body: &body,
            inner: Distance { bound: 10 },
        };
        let before = solve_forward(&mut flow, &body).unwrap();
        assert_eq!(before, vec![Some(0), Some(1), Some(2)]);
    }

    #[test]
    fn test_loop_reaches_fixpoint() {
        let mut b = BodyBuilder::new();
        let head = b.here();
        b.nop();
        b.if_(Operand::int(0), head);
        b.ret(None);
        let body = b.build().unwrap();
        let mut flow = Along {
            body: &body,
            inner: Distance { bound: 5 },
        };
        let before = solve_forward(&mut flow, &body).unwrap();
        assert_eq!(before, vec![Some(5), Some(5), Some(5)]);
    }

    #[test]
    fn test_unreachable_stays_bottom() {
        let mut b = BodyBuilder::new();
        b.ret(None);
        b.nop();
        let body = b.build().unwrap();
        let mut flow = Distance { bound: 1 };
        let before = solve_forward(&mut flow, &body).unwrap();
        assert_eq!(before, vec![Some(0), None]);
    }
}
