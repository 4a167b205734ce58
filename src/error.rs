use thiserror::Error;

/// Errors raised while building automata, programs, or running the analysis.
///
/// Non-convergence of the fixpoint is not an error: it is reported as
/// [`Verdict::Inconclusive`][crate::interproc::Verdict::Inconclusive].
#[derive(Debug, Error)]
pub enum Error {
    #[error("unknown automaton state `{0}`")]
    UnknownState(String),

    #[error("unknown alphabet symbol `{0}`")]
    UnknownSymbol(String),

    #[error("automaton has no initial state")]
    MissingInitialState,

    #[error("construct not supported: {0}")]
    Unsupported(String),

    #[error("unknown class `{0}`")]
    UnknownClass(String),

    #[error("label {0} was never placed")]
    UnboundLabel(usize),

    #[error("handler at statement {stmt} of {method} does not bind the caught exception")]
    MalformedHandler { method: String, stmt: usize },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
