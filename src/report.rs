//! Human-readable summary of an analysis run.

use std::fmt;

use crate::calling_context::Location;
use crate::context::AnalysisContext;
use crate::counterexample::Counterexample;
use crate::domain::Render;
use crate::interproc::{AnalysisResult, Verdict};
use crate::monad::Monad;
use crate::region::Region;

/// Displays an [`AnalysisResult`] the way it is shown to users.
pub struct Report<'r, 'a> {
    result: &'r AnalysisResult,
    ctx: &'r AnalysisContext<'a>,
    /// List every method table entry, not just the entry method.
    pub show_methods: bool,
}

impl<'r, 'a> Report<'r, 'a> {
    pub fn new(result: &'r AnalysisResult, ctx: &'r AnalysisContext<'a>) -> Self {
        Self {
            result,
            ctx,
            show_methods: true,
        }
    }

    fn regions(&self, m: &Monad<Region>) -> String {
        let dom = self.ctx.domain();
        let choices: Vec<String> = m
            .iter()
            .map(|(r, w)| format!("{} & {}", r.describe(self.ctx.program, dom), w.render(dom)))
            .collect();
        format!("[{}]", choices.join(", "))
    }

    fn verdict_line(&self) -> String {
        match self.result.verdict {
            Verdict::Accepted => "This method follows the guideline.".to_string(),
            Verdict::Rejected => "This method may NOT follow the guideline.".to_string(),
            Verdict::Inconclusive => format!(
                "Analysis inconclusive: no fixpoint after {} iterations.",
                self.result.iterations
            ),
        }
    }
}

fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    let line = "-".repeat(title.chars().count());
    writeln!(f, "{}", line)?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", line)
}

impl fmt::Display for Report<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let program = self.ctx.program;
        let dom = self.ctx.domain();
        let entry = &self.result.entry;
        let effect = self.result.entry_effect();

        heading(f, &format!("Analysed method: {}", program.signature(entry.method)))?;
        writeln!(f, "* policy: {}", self.ctx.policy.name())?;
        writeln!(f, "* region: '{}'", entry.region)?;
        writeln!(f, "* return type: {}", self.regions(&effect.ret))?;
        writeln!(f, "* exceptional type: {}", self.regions(&effect.thrown))?;
        writeln!(
            f,
            "* nonterminating effect: {}",
            self.result.entry_infinitary().render(dom)
        )?;
        writeln!(f, "* {}", self.verdict_line())?;
        writeln!(f)?;

        heading(f, "Acceptable effects")?;
        writeln!(f, "{}", dom.accepted_infinitary().render(dom))?;
        writeln!(f)?;

        if self.show_methods {
            heading(f, "Method types")?;
            for (key, effect) in self.result.tables.methods() {
                let args: Vec<String> = key.args.iter().map(|r| r.describe(program, dom)).collect();
                writeln!(f, "- method: {}", program.signature(key.method))?;
                writeln!(f, "  region: '{}'", key.region.describe(program, dom))?;
                writeln!(f, "  calling context: {}", key.context.describe(program))?;
                writeln!(f, "  argument types: [{}]", args.join(", "))?;
                writeln!(f, "  return type: {}", self.regions(&effect.ret))?;
                writeln!(f, "  exceptional type: {}", self.regions(&effect.thrown))?;
                if let Some(inf) = self.result.infinitary.get(key) {
                    writeln!(f, "  nonterminating effect: {}", inf.render(dom))?;
                }
                writeln!(f)?;
            }
        }

        if self.result.verdict != Verdict::Rejected {
            return Ok(());
        }
        heading(f, "Counterexample")?;
        let method = self
            .ctx
            .body_of(entry.method)
            .map_or(entry.method, |(m, _)| m);
        for step in self.result.counterexample.path() {
            writeln!(
                f,
                ".({}): {}",
                Location::new(method, step.stmt).describe(program),
                step.effect.render(dom)
            )?;
        }
        match &self.result.counterexample {
            Counterexample::Infinite { cycle, .. } => writeln!(f, "loop... {}", cycle.render(dom)),
            Counterexample::Finite(_) => Ok(()),
            Counterexample::NotFound => writeln!(f, "could not localize a counterexample"),
        }
    }
}
