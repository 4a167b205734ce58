//! Graphviz (DOT) export of method bodies and policy automata.
//!
//! # DOT Format
//!
//! - **Control flow graphs**: statements are boxes labelled with their index
//!   and kind. Solid edges are normal control flow, dashed edges lead from a
//!   covered statement to an exception handler.
//! - **Automata**: states are circles, final states double circles. An
//!   invisible source node points at the initial state. Parallel edges are
//!   merged into one edge labelled with all their symbols.
//!
//! # Examples
//!
//! ```
//! use effects_rs::policies::abc_automaton;
//!
//! let automaton = abc_automaton().unwrap();
//! let dot = automaton.to_dot().unwrap();
//! assert!(dot.starts_with("digraph {"));
//! // Render with: dot -Tpng policy.dot -o policy.png
//! ```

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::automaton::Automaton;
use crate::cfg::{Body, Stmt};

/// Configuration options for DOT output generation.
///
/// ```
/// use effects_rs::dot::DotConfig;
///
/// let config = DotConfig {
///     trap_edge_style: "dotted",
///     ..DotConfig::default()
/// };
/// assert_eq!(config.normal_edge_style, "solid");
/// ```
#[derive(Debug, Clone)]
pub struct DotConfig {
    /// Shape for statements (default: "box")
    pub stmt_shape: &'static str,
    /// Shape for automaton states (default: "circle")
    pub state_shape: &'static str,
    /// Shape for final automaton states (default: "doublecircle")
    pub final_shape: &'static str,
    /// Style for normal control flow edges (default: "solid")
    pub normal_edge_style: &'static str,
    /// Style for edges into exception handlers (default: "dashed")
    pub trap_edge_style: &'static str,
    /// Whether statement labels carry source line numbers (default: true)
    pub show_lines: bool,
}

impl Default for DotConfig {
    fn default() -> Self {
        Self {
            stmt_shape: "box",
            state_shape: "circle",
            final_shape: "doublecircle",
            normal_edge_style: "solid",
            trap_edge_style: "dashed",
            show_lines: true,
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn kind(stmt: &Stmt) -> &'static str {
    match stmt {
        Stmt::Identity { .. } => "identity",
        Stmt::Assign { .. } if stmt.invoke_expr().is_some() => "assign-invoke",
        Stmt::Assign { .. } => "assign",
        Stmt::Invoke(_) => "invoke",
        Stmt::Return(_) => "return",
        Stmt::Throw(_) => "throw",
        Stmt::If { .. } => "if",
        Stmt::Goto(_) => "goto",
        Stmt::Switch { .. } => "switch",
        Stmt::Nop => "nop",
    }
}

impl Body {
    /// Converts the control flow graph to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "node [shape={}];", config.stmt_shape)?;

        for (s, stmt) in self.stmts() {
            let label = match self.line(s) {
                Some(line) if config.show_lines => format!("{}: {} (line {})", s, kind(stmt), line),
                _ => format!("{}: {}", s, kind(stmt)),
            };
            writeln!(dot, "n{} [label=\"{}\"];", s.index(), escape(&label))?;
        }

        for (s, _) in self.stmts() {
            for succ in self.succs(s) {
                writeln!(dot, "n{} -> n{} [style={}];", s.index(), succ.index(), config.normal_edge_style)?;
            }
            for trap in self.traps_at(s) {
                writeln!(dot, "n{} -> n{} [style={}];", s.index(), trap.handler.index(), config.trap_edge_style)?;
            }
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}

impl Automaton {
    /// Converts the automaton to DOT format.
    pub fn to_dot(&self) -> Result<String, std::fmt::Error> {
        self.to_dot_with_config(&DotConfig::default())
    }

    pub fn to_dot_with_config(&self, config: &DotConfig) -> Result<String, std::fmt::Error> {
        let mut dot = String::new();
        writeln!(dot, "digraph {{")?;
        writeln!(dot, "rankdir=LR;")?;

        for (i, name) in self.states().iter().enumerate() {
            let shape = if self.is_final(i) {
                config.final_shape
            } else {
                config.state_shape
            };
            writeln!(dot, "q{} [shape={}, label=\"{}\"];", i, shape, escape(name))?;
        }

        if let Some(initial) = self.initial() {
            writeln!(dot, "start [shape=point, style=invis];")?;
            writeln!(dot, "start -> q{};", initial)?;
        }

        let mut merged = BTreeMap::<(usize, usize), Vec<&str>>::new();
        for (from, to, token) in self.edges() {
            merged
                .entry((from, to))
                .or_default()
                .push(&self.symbols()[token]);
        }
        for ((from, to), symbols) in merged {
            writeln!(dot, "q{} -> q{} [label=\"{}\"];", from, to, escape(&symbols.join(", ")))?;
        }

        writeln!(dot, "}}")?;
        Ok(dot)
    }
}
