use crate::automaton::Automaton;
use crate::domain::AbstractDomain;
use crate::error::Result;
use crate::policy::{Emit, Intrinsic, IntrinsicTable, Policy};
use crate::program::{MethodRef, Program};

/// `a*b*`: once a `B` is emitted, no further `A` may follow.
pub fn astar_bstar_automaton() -> Result<Automaton> {
    let mut a = Automaton::new();
    a.add_symbol("A");
    a.add_symbol("B");
    a.add_state("0");
    a.add_state("1");
    a.add_edge("0", "0", "A")?;
    a.add_edge("0", "1", "B")?;
    a.add_edge("1", "1", "B")?;
    a.set_initial("0")?;
    a.add_final("0")?;
    a.add_final("1")?;
    Ok(a)
}

/// Policy for [`astar_bstar_automaton`] with intrinsics `TaintAPI.emitA()` and `emitB()`.
pub struct AStarBStar {
    domain: AbstractDomain,
    intrinsics: IntrinsicTable,
}

impl AStarBStar {
    pub fn new() -> Result<Self> {
        let domain = AbstractDomain::new(astar_bstar_automaton()?)?;
        let mut intrinsics = IntrinsicTable::new();
        for t in ["A", "B"] {
            let signature = format!("<{}: void emit{}()>", super::TAINT_API, t);
            intrinsics.insert(&signature, Emit::new(domain.read_symbol(t)?));
        }
        Ok(Self { domain, intrinsics })
    }
}

impl Policy for AStarBStar {
    fn name(&self) -> &str {
        "astar-bstar"
    }

    fn domain(&self) -> &AbstractDomain {
        &self.domain
    }

    fn intrinsic(&self, program: &Program, method: MethodRef) -> Option<&dyn Intrinsic> {
        self.intrinsics.lookup(program, method)
    }
}
