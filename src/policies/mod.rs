//! Ready-made policies.
//!
//! Each policy builds its automaton by hand, wraps it in an
//! [`AbstractDomain`][crate::domain::AbstractDomain] and registers its intrinsic
//! methods by signature.
//!
//! | Policy | Tokens | Accepts |
//! |--------|--------|---------|
//! | [`AbcPolicy`] | `A`, `B`, `C` | everything, but distinguishes short words |
//! | [`AStarBStar`] | `A`, `B` | `a*b*` and `a^ω`, `a*b^ω` |
//! | [`BinaryPolicy`] | `U`, `T` | traces that never output tainted data |
//! | [`LoggedAccessPolicy`] | `auth`, `access`, `log` | every access is eventually logged |

mod abc;
mod astar_bstar;
mod binary;
mod logged_access;

pub use abc::{abc_automaton, AbcPolicy};
pub use astar_bstar::{astar_bstar_automaton, AStarBStar};
pub use binary::{binary_automaton, BinaryPolicy};
pub use logged_access::{logged_access_automaton, LoggedAccessPolicy, SERVER};

/// Class declaring the emitting intrinsics of the bundled policies.
pub const TAINT_API: &str = "TaintAPI";
