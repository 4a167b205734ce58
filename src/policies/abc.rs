use crate::automaton::Automaton;
use crate::domain::AbstractDomain;
use crate::error::Result;
use crate::policy::{Emit, Intrinsic, IntrinsicTable, Policy};
use crate::program::{MethodRef, Program};

const TOKENS: [&str; 3] = ["A", "B", "C"];

/// Automaton over `{A, B, C}` whose syntactic monoid tells apart all words of
/// length at most two, and the words `AAA…`, `BBB…`, `CCC…` from everything
/// else. Every state is final, so every trace is accepted.
pub fn abc_automaton() -> Result<Automaton> {
    let mut a = Automaton::new();
    for t in TOKENS {
        a.add_symbol(t);
    }

    let lower = |t: &str| t.to_lowercase();
    let mut states = vec!["s0".to_string()];
    for x in TOKENS {
        states.push(format!("s{}", lower(x)));
        for y in TOKENS {
            states.push(format!("s{}{}", lower(x), lower(y)));
        }
    }
    for x in TOKENS {
        states.push(format!("s{}", lower(x).repeat(3)));
    }
    states.push("s1".to_string());
    for s in &states {
        a.add_state(s);
    }

    for x in TOKENS {
        let sx = format!("s{}", lower(x));
        a.add_edge("s0", &sx, x)?;
        for y in TOKENS {
            a.add_edge(&sx, &format!("{}{}", sx, lower(y)), y)?;
        }
    }

    // From length two onwards only runs of a single token are remembered.
    for x in TOKENS {
        for y in TOKENS {
            let sxy = format!("s{}{}", lower(x), lower(y));
            for z in TOKENS {
                if x == y && y == z {
                    a.add_edge(&sxy, &format!("s{}", lower(x).repeat(3)), z)?;
                } else {
                    a.add_edge(&sxy, "s1", z)?;
                }
            }
        }
        let run = format!("s{}", lower(x).repeat(3));
        for z in TOKENS {
            let to = if z == x { run.as_str() } else { "s1" };
            a.add_edge(&run, to, z)?;
        }
    }
    for z in TOKENS {
        a.add_edge("s1", "s1", z)?;
    }

    a.set_initial("s0")?;
    for s in &states {
        a.add_final(s)?;
    }
    Ok(a)
}

/// Policy over `{A, B, C}` with intrinsics `TaintAPI.emitA()`, `emitB()` and `emitC()`.
pub struct AbcPolicy {
    domain: AbstractDomain,
    intrinsics: IntrinsicTable,
}

impl AbcPolicy {
    pub fn new() -> Result<Self> {
        let domain = AbstractDomain::new(abc_automaton()?)?;
        let mut intrinsics = IntrinsicTable::new();
        for t in TOKENS {
            let signature = format!("<{}: void emit{}()>", super::TAINT_API, t);
            intrinsics.insert(&signature, Emit::new(domain.read_symbol(t)?));
        }
        Ok(Self { domain, intrinsics })
    }
}

impl Policy for AbcPolicy {
    fn name(&self) -> &str {
        "abc"
    }

    fn domain(&self) -> &AbstractDomain {
        &self.domain
    }

    fn intrinsic(&self, program: &Program, method: MethodRef) -> Option<&dyn Intrinsic> {
        self.intrinsics.lookup(program, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_automaton_shape() {
        let a = abc_automaton().unwrap();
        assert_eq!(a.num_states(), 17);
        assert_eq!(a.num_symbols(), 3);
        // Deterministic and complete.
        assert_eq!(a.edges().count(), 17 * 3);
        assert!((0..a.num_states()).all(|s| a.is_final(s)));
        assert_eq!(a.initial(), Some(a.state("s0").unwrap()));
        assert!(a.edges().any(|(from, to, token)| {
            from == a.state("sbb").unwrap() && to == a.state("sbbb").unwrap() && token == 1
        }));
    }

    #[test]
    fn test_policy_accepts_everything() {
        let policy = AbcPolicy::new().unwrap();
        let dom = policy.domain();
        let a = dom.read_symbol("A").unwrap();
        let b = dom.read_symbol("B").unwrap();
        assert!(dom.accepted(&dom.multiply(&a, &b)));
        assert!(dom.accepted_inf(&dom.omega(&a)));
        assert_eq!(policy.name(), "abc");
    }
}
