//! Search for a trace of the entry method that violates the policy.
//!
//! The search replays the finitary transfer function depth first from the
//! method entry, recording each visited statement together with the effect of
//! the flow leaving it. A finite witness is a path ending in a statement
//! without successors whose effect is rejected. An infinite witness is a path
//! that revisits a `(statement, effect)` pair whose omega iteration is
//! rejected.
//!
//! Both searches are incomplete: a rejected verdict may come without a
//! witness, which is reported as [`Counterexample::NotFound`].

use log::debug;

use crate::cfg::StmtId;
use crate::class_table::ClassTable;
use crate::domain::{Finitary, Infinitary};
use crate::error::Result;
use crate::finitary::{Environment, FinitaryAnalysis};
use crate::monad::Monad;

/// A visited statement and the effect accumulated when leaving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub stmt: StmtId,
    pub effect: Finitary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Counterexample {
    /// A terminating trace whose effect is rejected.
    Finite(Vec<Step>),
    /// A path into a loop whose repetition is rejected; `cycle` is the
    /// effect of repeating it forever.
    Infinite { path: Vec<Step>, cycle: Infinitary },
    NotFound,
}

impl Counterexample {
    pub fn is_found(&self) -> bool {
        !matches!(self, Counterexample::NotFound)
    }

    pub fn path(&self) -> &[Step] {
        match self {
            Counterexample::Finite(path) | Counterexample::Infinite { path, .. } => path,
            Counterexample::NotFound => &[],
        }
    }
}

/// Looks for a terminating trace with a rejected effect.
///
/// `tables` is a scratch copy: replaying the transfer function joins into it.
pub fn find_finite(analysis: &FinitaryAnalysis, tables: &mut ClassTable) -> Result<Counterexample> {
    let Some(&head) = analysis.body().heads().first() else {
        return Ok(Counterexample::NotFound);
    };
    let mut search = Search {
        analysis,
        tables,
        path: Vec::new(),
    };
    let found = search.finite(head, &analysis.entry_flow())?;
    debug!("finite counterexample search: found = {}", found);
    Ok(if found {
        Counterexample::Finite(search.path)
    } else {
        Counterexample::NotFound
    })
}

/// Looks for a path into a loop whose infinite repetition is rejected.
pub fn find_infinite(analysis: &FinitaryAnalysis, tables: &mut ClassTable) -> Result<Counterexample> {
    let Some(&head) = analysis.body().heads().first() else {
        return Ok(Counterexample::NotFound);
    };
    let mut search = Search {
        analysis,
        tables,
        path: Vec::new(),
    };
    let cycle = search.infinite(head, &analysis.entry_flow())?;
    debug!("infinite counterexample search: found = {}", cycle.is_some());
    Ok(match cycle {
        Some(cycle) => Counterexample::Infinite {
            path: search.path,
            cycle,
        },
        None => Counterexample::NotFound,
    })
}

struct Search<'s, 'a, 'c> {
    analysis: &'s FinitaryAnalysis<'a, 'c>,
    tables: &'s mut ClassTable,
    path: Vec<Step>,
}

impl Search<'_, '_, '_> {
    /// Non-empty successor flows of `stmt` and the effect leaving it.
    ///
    /// Without successor flows the effect is that of the traces ending at
    /// `stmt`, returning or escaping with an exception.
    fn step(&mut self, stmt: StmtId, input: &Monad<Environment>) -> Result<(Vec<(StmtId, Monad<Environment>)>, Finitary)> {
        let t = self.analysis.flow_through(self.tables, stmt, input)?;
        let outs: Vec<_> = t.outs.into_iter().filter(|(_, flow)| !flow.is_empty()).collect();
        let effect = if outs.is_empty() {
            t.ret.aggregate().join(&t.thrown.aggregate())
        } else {
            outs.iter()
                .fold(Finitary::default(), |acc, (_, flow)| acc.join(&flow.aggregate()))
        };
        Ok((outs, effect))
    }

    fn visited(&self, stmt: StmtId, effect: &Finitary) -> bool {
        self.path
            .iter()
            .any(|s| s.stmt == stmt && s.effect == *effect)
    }

    fn finite(&mut self, stmt: StmtId, input: &Monad<Environment>) -> Result<bool> {
        let dom = self.analysis.domain();
        let (outs, effect) = self.step(stmt, input)?;

        // Unproductive loop.
        if self.visited(stmt, &effect) {
            return Ok(false);
        }
        let dead_end = outs.is_empty();
        let rejected = !dom.accepted(&effect);
        self.path.push(Step { stmt, effect });
        if dead_end && rejected {
            return Ok(true);
        }

        for (succ, flow) in &outs {
            if self.finite(*succ, flow)? {
                return Ok(true);
            }
        }
        self.path.pop();
        Ok(false)
    }

    fn infinite(&mut self, stmt: StmtId, input: &Monad<Environment>) -> Result<Option<Infinitary>> {
        let dom = self.analysis.domain();
        let (outs, effect) = self.step(stmt, input)?;
        if outs.is_empty() {
            return Ok(None);
        }

        if self.visited(stmt, &effect) {
            let cycle = dom.omega(&effect);
            return Ok(if dom.accepted_inf(&cycle) {
                None
            } else {
                Some(cycle)
            });
        }

        self.path.push(Step { stmt, effect });
        for (succ, flow) in &outs {
            if let Some(cycle) = self.infinite(*succ, flow)? {
                return Ok(Some(cycle));
            }
        }
        self.path.pop();
        Ok(None)
    }
}
